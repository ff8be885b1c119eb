//! CLI integration tests

use std::io::Write;
use std::process::{Command, Output};
use tempfile::NamedTempFile;

const COST_DATA: &str = r#"{
    "web/web-1": {
        "name": "web-1",
        "podName": "web-1",
        "namespace": "web",
        "clusterId": "c1",
        "nodeData": {"vcpuCost": "0.5"},
        "cpuAllocation": [{"timestamp": 10, "value": 2}, {"timestamp": 20, "value": 2}]
    },
    "api/api-1": {
        "name": "api-1",
        "podName": "api-1",
        "namespace": "api",
        "clusterId": "c1",
        "nodeData": {"vcpuCost": "0.5"},
        "cpuAllocation": [{"timestamp": 10, "value": 4}]
    },
    "kube-system/dns": {
        "name": "dns",
        "podName": "dns",
        "namespace": "kube-system",
        "clusterId": "c1",
        "networkCost": [{"timestamp": 10, "value": 6}]
    }
}"#;

fn temp_file(suffix: &str, contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

/// Run kcost against an empty config file so the user's config is ignored
fn kcost(args: &[&str]) -> Output {
    let config = temp_file(".toml", "");
    Command::new(env!("CARGO_BIN_EXE_kcost"))
        .arg("--config")
        .arg(config.path())
        .args(args)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute command")
}

fn json_stdout(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).expect("stdout should be JSON")
}

fn approx_eq(value: &serde_json::Value, expected: f64) -> bool {
    value
        .as_f64()
        .is_some_and(|v| (v - expected).abs() < 1e-9)
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = kcost(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("Cluster Cost Model"), "Should show app name");
    assert!(stdout.contains("aggregate"), "Should show aggregate command");
    assert!(stdout.contains("idle"), "Should show idle command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = kcost(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("kcost"), "Should show binary name");
}

#[test]
fn test_aggregate_help() {
    let output = kcost(&["aggregate", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("--field"), "Should show field option");
    assert!(stdout.contains("--rate"), "Should show rate option");
    assert!(stdout.contains("--billing"), "Should show billing option");
}

#[test]
fn test_aggregate_by_namespace_json() {
    let input = temp_file(".json", COST_DATA);
    let output = kcost(&[
        "--format",
        "json",
        "aggregate",
        "--input",
        input.path().to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let report = json_stdout(&output);
    let buckets = report.as_object().unwrap();
    assert_eq!(buckets.len(), 3);
    assert!(approx_eq(&report["web"]["cpuCost"], 2.0));
    assert!(approx_eq(&report["api"]["totalCost"], 2.0));
    assert!(approx_eq(&report["kube-system"]["networkCost"], 6.0));
    assert_eq!(report["web"]["aggregation"], "namespace");
    assert_eq!(report["web"]["cluster"], "c1");
    assert!(report["web"].get("cpuCostVector").is_none());
}

#[test]
fn test_aggregate_shares_system_namespace() {
    let input = temp_file(".json", COST_DATA);
    let output = kcost(&[
        "--format",
        "json",
        "aggregate",
        "--input",
        input.path().to_str().unwrap(),
        "--share",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let report = json_stdout(&output);
    assert!(report.get("kube-system").is_none());
    assert!(approx_eq(&report["web"]["sharedCost"], 3.0));
    assert!(approx_eq(&report["web"]["totalCost"], 5.0));
    assert!(approx_eq(&report["api"]["totalCost"], 5.0));
}

#[test]
fn test_aggregate_daily_rate_normalizes() {
    let input = temp_file(".json", COST_DATA);
    let output = kcost(&[
        "--format",
        "json",
        "aggregate",
        "--input",
        input.path().to_str().unwrap(),
        "--rate",
        "daily",
        "--time-series",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    // Two samples of 1.0/h each, scaled to 24/day and averaged over 2 points
    let report = json_stdout(&output);
    assert!(approx_eq(&report["web"]["cpuCost"], 24.0));
    assert_eq!(report["web"]["cpuCostVector"].as_array().unwrap().len(), 2);
}

#[test]
fn test_aggregate_table_output() {
    let input = temp_file(".json", COST_DATA);
    let output = kcost(&["aggregate", "--input", input.path().to_str().unwrap()]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("Cost by namespace"));
    assert!(stdout.contains("web"));
    assert!(stdout.contains("cumulative"));
}

#[test]
fn test_aggregate_rejects_unknown_field() {
    let input = temp_file(".json", COST_DATA);
    let output = kcost(&[
        "aggregate",
        "--input",
        input.path().to_str().unwrap(),
        "--field",
        "region",
    ]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("Invalid aggregation field"));
}

#[test]
fn test_aggregate_rejects_bad_discount() {
    let input = temp_file(".json", COST_DATA);
    let output = kcost(&[
        "aggregate",
        "--input",
        input.path().to_str().unwrap(),
        "--discount",
        "1.2",
    ]);
    assert!(!output.status.success());
}

#[test]
fn test_idle_without_billing_defaults_to_one() {
    let input = temp_file(".json", COST_DATA);
    let billing = temp_file(".json", "{}");
    let output = kcost(&[
        "--format",
        "json",
        "idle",
        "--input",
        input.path().to_str().unwrap(),
        "--billing",
        billing.path().to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let coefficients = json_stdout(&output);
    assert!(approx_eq(&coefficients["c1"], 1.0));
}

#[test]
fn test_idle_malformed_billing_fails() {
    let input = temp_file(".json", COST_DATA);
    let billing = temp_file(
        ".json",
        r#"{"c1": {"cpuCost": [["0", "abc"]], "memCost": [["0", "1"]], "storageCost": [["0", "1"]]}}"#,
    );
    let output = kcost(&[
        "idle",
        "--input",
        input.path().to_str().unwrap(),
        "--billing",
        billing.path().to_str().unwrap(),
    ]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("Failed to compute idle coefficients"));
}

#[test]
fn test_idle_coefficient_from_billing() {
    let input = temp_file(".json", COST_DATA);
    let billing = temp_file(
        ".json",
        r#"{"c1": {"cpuCost": [["0", "730"]], "memCost": [["0", "0"]], "storageCost": [["0", "0"]]}}"#,
    );
    let output = kcost(&[
        "--format",
        "json",
        "idle",
        "--input",
        input.path().to_str().unwrap(),
        "--billing",
        billing.path().to_str().unwrap(),
        "--window",
        "1h",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    // 4.0 observed against 730/month over one hour
    let coefficients = json_stdout(&output);
    assert!(approx_eq(&coefficients["c1"], 4.0));
}

#[test]
fn test_metrics_dumped_to_stderr() {
    let input = temp_file(".json", COST_DATA);
    let output = kcost(&[
        "--format",
        "json",
        "--metrics",
        "aggregate",
        "--input",
        input.path().to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("costmodel_workloads_aggregated_total 3"));
    assert!(stderr.contains("costmodel_buckets_produced 3"));
    // Report on stdout stays valid JSON
    let report = json_stdout(&output);
    assert_eq!(report.as_object().unwrap().len(), 3);
}

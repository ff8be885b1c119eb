//! Time series alignment
//!
//! Independently sampled series rarely share exact timestamps, so every merge
//! first quantizes timestamps to a fixed bucket width and then outer-joins the
//! two series, summing values that land in the same bucket.
//!
//! A sample stamped exactly `0` carries no time information and is treated as
//! "no data": it is dropped whenever two non-empty series are merged, and only
//! survives when the other side is empty.

use crate::models::Vector;
use std::cmp::Ordering;

/// Bucket width used to align timestamps
pub const TIMESTAMP_PRECISION: f64 = 10.0;

/// Round a timestamp to the nearest multiple of `precision`
///
/// Ties round away from zero, so with precision 10, 24 goes to 20 and 25 goes
/// to 30.
pub fn round_timestamp(ts: f64, precision: f64) -> f64 {
    (ts / precision).round() * precision
}

/// Merge two series, summing samples that fall into the same timestamp bucket
///
/// Neither input is modified. The result is ordered by ascending timestamp,
/// except on the early-exit path where one side is empty and the other is
/// returned as-is apart from rounding.
pub fn add_vectors(xs: &[Vector], ys: &[Vector]) -> Vec<Vector> {
    if xs.is_empty() {
        return round_all(ys);
    }
    if ys.is_empty() {
        return round_all(xs);
    }

    let xs = coalesce(xs);
    let ys = coalesce(ys);

    let mut sum = Vec::with_capacity(xs.len().max(ys.len()));
    let (mut i, mut j) = (0, 0);
    while i < xs.len() && j < ys.len() {
        let (x, y) = (xs[i], ys[j]);
        match x.timestamp.partial_cmp(&y.timestamp).unwrap_or(Ordering::Equal) {
            Ordering::Less => {
                sum.push(x);
                i += 1;
            }
            Ordering::Greater => {
                sum.push(y);
                j += 1;
            }
            Ordering::Equal => {
                sum.push(Vector::new(x.timestamp, x.value + y.value));
                i += 1;
                j += 1;
            }
        }
    }
    sum.extend_from_slice(&xs[i..]);
    sum.extend_from_slice(&ys[j..]);

    sum
}

/// Sum of all values in a series
pub fn total_vectors(vectors: &[Vector]) -> f64 {
    vectors.iter().map(|v| v.value).sum()
}

/// Mean of all values in a series, 0 for an empty series
pub fn average_vectors(vectors: &[Vector]) -> f64 {
    if vectors.is_empty() {
        return 0.0;
    }
    total_vectors(vectors) / vectors.len() as f64
}

fn round_all(vectors: &[Vector]) -> Vec<Vector> {
    vectors
        .iter()
        .map(|v| {
            if v.timestamp == 0.0 {
                *v
            } else {
                Vector::new(round_timestamp(v.timestamp, TIMESTAMP_PRECISION), v.value)
            }
        })
        .collect()
}

/// Round, sort and collapse one side of a merge into one sample per bucket.
/// Zero-stamped and NaN-stamped samples are dropped.
fn coalesce(vectors: &[Vector]) -> Vec<Vector> {
    let mut rounded: Vec<Vector> = vectors
        .iter()
        .filter(|v| v.timestamp != 0.0 && !v.timestamp.is_nan())
        .map(|v| Vector::new(round_timestamp(v.timestamp, TIMESTAMP_PRECISION), v.value))
        .collect();
    rounded.sort_by(|a, b| {
        a.timestamp
            .partial_cmp(&b.timestamp)
            .unwrap_or(Ordering::Equal)
    });

    let mut out: Vec<Vector> = Vec::with_capacity(rounded.len());
    for v in rounded {
        match out.last_mut() {
            Some(last) if last.timestamp == v.timestamp => last.value += v.value,
            _ => out.push(v),
        }
    }
    out
}

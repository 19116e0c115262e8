//! Feature matrix builder
//!
//! Per column: clamp to the [p2, p98] percentile band, then z-score with
//! the sample standard deviation of the clamped column. Row order follows
//! the input.

use crate::models::{AudioFeatures, FeatureKey, FeatureVector, FEATURE_COUNT};

/// Tempo is divided by this before standardization
pub const TEMPO_SCALE: f64 = 220.0;

const LOW_PERCENTILE: f64 = 0.02;
const HIGH_PERCENTILE: f64 = 0.98;

/// Raw value of `key` as it enters the matrix
pub fn column_value(key: FeatureKey, features: &AudioFeatures) -> f64 {
    match key {
        FeatureKey::Tempo => features.tempo / TEMPO_SCALE,
        other => other.raw_value(features),
    }
}

/// Linear-interpolated percentile of an ascending slice, `p` in [0, 1]
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = p.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
        }
    }
}

/// Clamp then z-score one column in place
fn standardize_column(values: &mut [f64]) {
    let n = values.len();
    if n == 0 {
        return;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let lo = percentile(&sorted, LOW_PERCENTILE);
    let hi = percentile(&sorted, HIGH_PERCENTILE);

    // Every value clamps to the same point: nothing to scale
    if lo == hi {
        values.iter_mut().for_each(|v| *v = 0.0);
        return;
    }

    for v in values.iter_mut() {
        *v = v.clamp(lo, hi);
    }

    let mean = values.iter().sum::<f64>() / n as f64;
    let denom = if n > 1 { (n - 1) as f64 } else { 1.0 };
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / denom;
    let stdev = variance.sqrt();
    let stdev = if stdev == 0.0 { 1.0 } else { stdev };

    for v in values.iter_mut() {
        *v = (*v - mean) / stdev;
    }
}

/// Standardized feature rows, one per input record
pub fn standardize(features: &[AudioFeatures]) -> Vec<FeatureVector> {
    let mut rows = vec![[0.0; FEATURE_COUNT]; features.len()];

    for (col, key) in FeatureKey::ALL.iter().enumerate() {
        let mut column: Vec<f64> = features.iter().map(|f| column_value(*key, f)).collect();
        standardize_column(&mut column);
        for (row, value) in rows.iter_mut().zip(column) {
            row[col] = value;
        }
    }

    rows
}

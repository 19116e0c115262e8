//! Semantic axes
//!
//! For each semantic feature, the Pearson correlation of its raw values
//! with each spatial coordinate, taken separately and normalized to unit
//! length. Display hints only; positions do not depend on them.

use crate::models::{AudioFeatures, FeatureKey, Position3, SemanticAxes};

/// Pearson correlation, 0 when either side has no variance
pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return 0.0;
    }
    let mean_x = xs[..n].iter().sum::<f64>() / n as f64;
    let mean_y = ys[..n].iter().sum::<f64>() / n as f64;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in xs[..n].iter().zip(&ys[..n]) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return 0.0;
    }
    let r = cov / (var_x.sqrt() * var_y.sqrt());
    if r.is_finite() {
        r.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

fn normalize(v: Position3) -> Position3 {
    let m = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if m == 0.0 || !m.is_finite() {
        return [0.0; 3];
    }
    [v[0] / m, v[1] / m, v[2] / m]
}

/// Axes for `positions`, index-aligned with `features`
pub fn semantic_axes(positions: &[Position3], features: &[AudioFeatures]) -> SemanticAxes {
    let mut axes = SemanticAxes::zero();
    let coords: [Vec<f64>; 3] = [0, 1, 2].map(|c| positions.iter().map(|p| p[c]).collect());

    for key in FeatureKey::SEMANTIC {
        let values: Vec<f64> = features.iter().map(|f| key.raw_value(f)).collect();
        let axis = [
            pearson(&values, &coords[0]),
            pearson(&values, &coords[1]),
            pearson(&values, &coords[2]),
        ];
        axes.set(key, normalize(axis));
    }

    axes
}

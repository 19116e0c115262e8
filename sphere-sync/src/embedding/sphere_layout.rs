//! Unit-sphere layout
//!
//! Normalizes projected points onto the unit sphere and falls back to an
//! even Fibonacci-sphere distribution when the projection is degenerate.
//! Never fails: every input yields one unit-length position per track.

use std::f64::consts::PI;

use crate::models::{LayoutOrigin, Position3};

/// Thresholds deciding when the PCA layout is discarded
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutPolicy {
    /// Fraction of collapsed points above which all points use the fallback
    pub collapsed_ratio: f64,
    /// Mean distance from the centroid below which all points use the fallback
    pub min_spread: f64,
    /// Magnitude below which a projected point counts as collapsed
    pub degenerate_epsilon: f64,
}

impl Default for LayoutPolicy {
    fn default() -> Self {
        Self {
            collapsed_ratio: 0.3,
            min_spread: 0.22,
            degenerate_epsilon: 1e-6,
        }
    }
}

/// Point `i` of `n` on the Fibonacci sphere
pub fn fibonacci_point(i: usize, n: usize) -> Position3 {
    let n = n.max(1) as f64;
    let k = i as f64 + 0.5;
    let phi = (1.0 - 2.0 * k / n).clamp(-1.0, 1.0).acos();
    let theta = PI * (1.0 + 5f64.sqrt()) * k;
    [theta.cos() * phi.sin(), theta.sin() * phi.sin(), phi.cos()]
}

fn fibonacci_layout(n: usize) -> Vec<Position3> {
    (0..n).map(|i| fibonacci_point(i, n)).collect()
}

fn magnitude(p: &Position3) -> f64 {
    (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt()
}

fn is_degenerate(p: &Position3, epsilon: f64) -> bool {
    let m = magnitude(p);
    !m.is_finite() || m < epsilon
}

/// Mean distance of `points` from their centroid
pub fn mean_spread(points: &[Position3]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    let n = points.len() as f64;
    let mut centroid = [0.0; 3];
    for p in points {
        for (c, v) in centroid.iter_mut().zip(p) {
            *c += v / n;
        }
    }
    points
        .iter()
        .map(|p| magnitude(&[p[0] - centroid[0], p[1] - centroid[1], p[2] - centroid[2]]))
        .sum::<f64>()
        / n
}

/// Place raw projected points on the unit sphere
pub fn place(raw: &[Position3], policy: &LayoutPolicy) -> (Vec<Position3>, LayoutOrigin) {
    let n = raw.len();
    if n == 0 {
        return (Vec::new(), LayoutOrigin::Fibonacci);
    }

    let collapsed = raw
        .iter()
        .filter(|p| is_degenerate(p, policy.degenerate_epsilon))
        .count();
    if collapsed as f64 / n as f64 > policy.collapsed_ratio {
        tracing::info!(
            collapsed,
            total = n,
            "Projection mostly collapsed, using Fibonacci layout"
        );
        return (fibonacci_layout(n), LayoutOrigin::Fibonacci);
    }

    let positions: Vec<Position3> = raw
        .iter()
        .enumerate()
        .map(|(i, p)| {
            if is_degenerate(p, policy.degenerate_epsilon) {
                fibonacci_point(i, n)
            } else {
                let m = magnitude(p);
                [p[0] / m, p[1] / m, p[2] / m]
            }
        })
        .collect();

    let spread = mean_spread(&positions);
    if spread < policy.min_spread {
        tracing::info!(
            spread,
            min_spread = policy.min_spread,
            "Projection too clustered, using Fibonacci layout"
        );
        return (fibonacci_layout(n), LayoutOrigin::Fibonacci);
    }

    let origin = if collapsed > 0 {
        LayoutOrigin::Mixed
    } else {
        LayoutOrigin::Pca
    };
    (positions, origin)
}

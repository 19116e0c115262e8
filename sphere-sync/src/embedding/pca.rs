//! PCA by power iteration
//!
//! Covariance of the standardized rows, then three rounds of power
//! iteration with deflation. Starting vectors are random, so output is only
//! reproducible with a seeded generator.

use rand::Rng;

use crate::models::{FeatureVector, Position3, FEATURE_COUNT};

pub type Matrix = [[f64; FEATURE_COUNT]; FEATURE_COUNT];

/// Norm below which an iterate is treated as collapsed
const COLLAPSE_EPSILON: f64 = 1e-12;

/// Principal directions and their eigenvalues, strongest first
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Components {
    pub vectors: [FeatureVector; 3],
    pub eigenvalues: [f64; 3],
}

/// Sample covariance (denominator n-1) of the rows' columns
pub fn covariance(rows: &[FeatureVector]) -> Matrix {
    let mut cov = [[0.0; FEATURE_COUNT]; FEATURE_COUNT];
    let n = rows.len();
    if n == 0 {
        return cov;
    }

    let mut means = [0.0; FEATURE_COUNT];
    for row in rows {
        for (m, v) in means.iter_mut().zip(row) {
            *m += v;
        }
    }
    for m in means.iter_mut() {
        *m /= n as f64;
    }

    for row in rows {
        for i in 0..FEATURE_COUNT {
            let di = row[i] - means[i];
            for j in i..FEATURE_COUNT {
                cov[i][j] += di * (row[j] - means[j]);
            }
        }
    }

    let denom = if n > 1 { (n - 1) as f64 } else { 1.0 };
    for i in 0..FEATURE_COUNT {
        for j in i..FEATURE_COUNT {
            cov[i][j] /= denom;
            cov[j][i] = cov[i][j];
        }
    }
    cov
}

fn mat_vec(m: &Matrix, v: &FeatureVector) -> FeatureVector {
    let mut out = [0.0; FEATURE_COUNT];
    for (o, row) in out.iter_mut().zip(m) {
        *o = dot(row, v);
    }
    out
}

pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm(v: &[f64]) -> f64 {
    dot(v, v).sqrt()
}

/// Dominant eigenvector of `m`
///
/// Returns the zero vector when the iterate collapses (e.g. `m` is zero).
pub fn power_iteration<R: Rng + ?Sized>(m: &Matrix, iterations: usize, rng: &mut R) -> FeatureVector {
    let mut v = [0.0; FEATURE_COUNT];
    for x in v.iter_mut() {
        *x = rng.gen_range(-1.0..1.0);
    }
    let n = norm(&v);
    if n < COLLAPSE_EPSILON {
        v = [0.0; FEATURE_COUNT];
        v[0] = 1.0;
    } else {
        v.iter_mut().for_each(|x| *x /= n);
    }

    for _ in 0..iterations {
        let w = mat_vec(m, &v);
        let n = norm(&w);
        if n < COLLAPSE_EPSILON || !n.is_finite() {
            return [0.0; FEATURE_COUNT];
        }
        for (x, y) in v.iter_mut().zip(w) {
            *x = y / n;
        }
    }
    v
}

/// Rayleigh quotient `vᵀMv / vᵀv`, zero for the zero vector
pub fn rayleigh_quotient(m: &Matrix, v: &FeatureVector) -> f64 {
    let denom = dot(v, v);
    if denom < COLLAPSE_EPSILON {
        return 0.0;
    }
    dot(v, &mat_vec(m, v)) / denom
}

/// `m - λ·v·vᵀ`
pub fn deflate(m: &Matrix, eigenvalue: f64, v: &FeatureVector) -> Matrix {
    let mut out = *m;
    for i in 0..FEATURE_COUNT {
        for j in 0..FEATURE_COUNT {
            out[i][j] -= eigenvalue * v[i] * v[j];
        }
    }
    out
}

/// Top three principal components of `rows`
pub fn principal_components<R: Rng + ?Sized>(
    rows: &[FeatureVector],
    iterations: usize,
    rng: &mut R,
) -> Components {
    let mut working = covariance(rows);
    let mut vectors = [[0.0; FEATURE_COUNT]; 3];
    let mut eigenvalues = [0.0; 3];

    for k in 0..3 {
        let v = power_iteration(&working, iterations, rng);
        let lambda = rayleigh_quotient(&working, &v);
        working = deflate(&working, lambda, &v);
        vectors[k] = v;
        eigenvalues[k] = lambda;
    }

    Components {
        vectors,
        eigenvalues,
    }
}

/// Project each row onto the three components
pub fn project(rows: &[FeatureVector], components: &Components) -> Vec<Position3> {
    rows.iter()
        .map(|row| {
            [
                dot(row, &components.vectors[0]),
                dot(row, &components.vectors[1]),
                dot(row, &components.vectors[2]),
            ]
        })
        .collect()
}

/// Raw 3D coordinates for each standardized row
pub fn embed<R: Rng + ?Sized>(rows: &[FeatureVector], iterations: usize, rng: &mut R) -> Vec<Position3> {
    let components = principal_components(rows, iterations, rng);
    tracing::debug!(
        rows = rows.len(),
        eigenvalues = ?components.eigenvalues,
        "Principal components extracted"
    );
    project(rows, &components)
}

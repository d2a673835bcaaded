#![allow(non_snake_case, dead_code)]

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use stratpd::Dataset;

/// `y = a x1 + b x2 + c` with independent uniform(0, 1) columns, plus
/// `n_noise` unrelated uniform columns.
pub fn linear(n: usize, a: f64, b: f64, c: f64, n_noise: usize, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let p = 2 + n_noise;
    let X = Array2::from_shape_fn((n, p), |_| rng.gen::<f64>());
    let y = Array1::from_shape_fn(n, |i| a * X[[i, 0]] + b * X[[i, 1]] + c);

    let mut names = vec!["x1".to_string(), "x2".to_string()];
    names.extend((1..=n_noise).map(|k| format!("noise{k}")));
    Dataset::new(X, y).unwrap().with_colnames(names).unwrap()
}

/// `y = x1^2 + 5 x2` with integer columns `x1` in 0..=20 and `x2` in 0..=9.
pub fn discrete_quadratic(n: usize, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let X = Array2::from_shape_fn((n, 2), |(_, j)| {
        if j == 0 {
            rng.gen_range(0..=20) as f64
        } else {
            rng.gen_range(0..=9) as f64
        }
    });
    let y = Array1::from_shape_fn(n, |i| X[[i, 0]] * X[[i, 0]] + 5.0 * X[[i, 1]]);
    Dataset::new(X, y).unwrap()
}

pub fn assert_sums_to_one(table: &stratpd::ImportanceTable) {
    let total: f64 = table.iter().filter_map(|e| e.importance).sum();
    assert!((total - 1.0).abs() < 1e-6, "importances sum to {total}");
    assert!(table
        .iter()
        .filter_map(|e| e.importance)
        .all(|v| v.is_finite() && v >= 0.0));
}

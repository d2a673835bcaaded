#![allow(non_snake_case)]

mod common;

use std::time::Duration;

use approx::assert_abs_diff_eq;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use stratpd::{
    cat_partial_dependence, partial_dependence, sweep_min_samples_leaf, Anchor, Dataset,
    InputError, Sampling, StratConfig, StratError, TabularData,
};

#[test]
fn test_linear_curves_recover_coefficients() {
    let data = common::linear(1000, 1.0, 3.0, 10.0, 0, 7);
    let config = StratConfig::default().with_min_samples_leaf(5);

    for (name, coef) in [("x1", 1.0), ("x2", 3.0)] {
        let pd = partial_dependence(&data, name, &config).unwrap();

        assert_eq!(pd.pdpy[0], 0.0);
        assert!(pd.pdpx.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(pd.pdpx.len(), pd.pdpy.len());
        assert_eq!(pd.slopes.len(), pd.pdpx.len() - 1);

        let span = pd.pdpx[pd.pdpx.len() - 1] - pd.pdpx[0];
        let rise = pd.pdpy[pd.pdpy.len() - 1] - pd.pdpy[0];
        assert!(
            (rise - coef * span).abs() < 0.1 * coef,
            "{name}: rise {rise} over span {span}"
        );
        assert!(pd.pdpy.windows(2).all(|w| w[1] >= w[0] - 0.02));
        assert_eq!(pd.ignored_leaves, 0);
        assert_eq!(pd.n_trials, 1);
    }
}

#[test]
fn test_discrete_strata_give_exact_slopes() {
    let data = common::discrete_quadratic(1000, 11);
    let config = StratConfig::default().with_min_samples_leaf(5);

    // Every leaf holds a single x1 level, so y moves by exactly 5 per unit.
    let pd = partial_dependence(&data, "x2", &config).unwrap();
    assert_eq!(pd.pdpx, (0..=9).map(f64::from).collect::<Vec<_>>());
    assert!(pd.slopes.iter().all(|&s| s == 5.0));
    for (x, y) in pd.points() {
        assert_eq!(y, 5.0 * x);
    }

    // x1 enters quadratically; the curve is strictly increasing.
    let pd = partial_dependence(&data, "x1", &config).unwrap();
    assert!(pd.pdpy.windows(2).all(|w| w[1] > w[0]));
    assert!(pd.slopes.iter().all(|&s| s > 0.0));
    let last = pd.pdpx[pd.pdpx.len() - 1];
    let first = pd.pdpx[0];
    let expected = last * last - first * first;
    let rise = pd.pdpy[pd.pdpy.len() - 1];
    assert!((rise - expected).abs() < 0.05 * expected, "rise {rise}");
}

#[test]
fn test_anchor_choices() {
    let data = common::linear(300, 1.0, 3.0, 10.0, 0, 5);
    let config = StratConfig::default().with_min_samples_leaf(5);

    let target_min = data.y().iter().copied().fold(f64::INFINITY, f64::min);
    let pd = partial_dependence(&data, "x1", &config.clone().with_anchor(Anchor::LeftTargetMin))
        .unwrap();
    assert_abs_diff_eq!(pd.pdpy[0], target_min, epsilon = 1e-12);

    let pd = partial_dependence(&data, "x1", &config.with_anchor(Anchor::CurveMinZero)).unwrap();
    let lowest = pd.pdpy.iter().copied().fold(f64::INFINITY, f64::min);
    assert_eq!(lowest, 0.0);
}

#[test]
fn test_runs_are_reproducible() {
    let data = common::linear(400, 1.0, 3.0, 10.0, 1, 3);
    let config = StratConfig::default()
        .with_min_samples_leaf(5)
        .with_trials(3)
        .with_sampling(Sampling::Bootstrap, None)
        .with_seed(42);

    let first = partial_dependence(&data, "x1", &config).unwrap();
    let second = partial_dependence(&data, "x1", &config).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.n_trials, 3);
}

#[test]
fn test_subsampled_trials_pool_slopes() {
    let data = common::linear(1000, 1.0, 3.0, 10.0, 0, 17);
    let config = StratConfig::default()
        .with_min_samples_leaf(5)
        .with_trials(4)
        .with_sampling(Sampling::Subsample, Some(500));

    let pd = partial_dependence(&data, "x2", &config).unwrap();
    assert_eq!(pd.n_trials, 4);
    assert!(pd.n_leaves >= 4 * 500 / 9);

    let span = pd.pdpx[pd.pdpx.len() - 1] - pd.pdpx[0];
    let rise = pd.pdpy[pd.pdpy.len() - 1];
    assert!((rise - 3.0 * span).abs() < 0.3, "rise {rise}");
}

#[test]
fn test_time_budget_stops_after_first_wave() {
    let data = common::linear(200, 1.0, 3.0, 10.0, 0, 23);
    let config = StratConfig::default()
        .with_min_samples_leaf(5)
        .with_trials(64)
        .with_sampling(Sampling::Bootstrap, None)
        .with_time_budget(Duration::ZERO);

    // Only the first wave, one trial per pool thread, starts.
    let pd = partial_dependence(&data, "x1", &config).unwrap();
    assert_eq!(pd.n_trials, rayon::current_num_threads().min(64));

    let unbounded = partial_dependence(&data, "x1", &config.with_time_budget(Duration::MAX))
        .unwrap();
    assert_eq!(unbounded.n_trials, 64);
}

#[test]
fn test_missing_values_are_excluded() {
    let mut rng = StdRng::seed_from_u64(29);
    let mut X = Array2::from_shape_fn((300, 2), |_| rng.gen::<f64>());
    let y = Array1::from_shape_fn(300, |i| 2.0 * X[[i, 0]] + X[[i, 1]]);
    for i in 0..10 {
        X[[i, 0]] = f64::NAN;
    }
    let data = Dataset::new(X, y).unwrap();
    let config = StratConfig::default().with_min_samples_leaf(5);

    let pd = partial_dependence(&data, "x1", &config).unwrap();
    assert_eq!(pd.excluded_rows, 10);
    assert!(pd.pdpx.iter().all(|x| x.is_finite()));

    let pd = partial_dependence(&data, "x2", &config).unwrap();
    assert_eq!(pd.excluded_rows, 0);
}

#[test]
fn test_missing_values_in_other_columns_keep_leaf_size() {
    let X = Array2::from_shape_fn((40, 2), |(i, j)| {
        if j == 1 && i < 6 {
            -f64::NAN
        } else {
            i as f64
        }
    });
    let y = Array1::from_shape_fn(40, |i| i as f64);
    let data = Dataset::new(X, y).unwrap();
    let config = StratConfig::default().with_min_samples_leaf(5);

    let pd = partial_dependence(&data, "x1", &config).unwrap();
    assert!(pd.n_leaves > 1);
    assert_eq!(pd.ignored_leaves, 0);
    assert_eq!(pd.ignored_rows, 0);
}

#[test]
fn test_collinear_column_has_no_support() {
    // x1 is constant inside every stratum of x2.
    let X = Array2::from_shape_fn((200, 2), |(i, _)| (i % 10) as f64);
    let y = Array1::from_shape_fn(200, |i| 2.0 * (i % 10) as f64);
    let data = Dataset::new(X, y).unwrap();
    let config = StratConfig::default().with_min_samples_leaf(5);

    let err = partial_dependence(&data, "x1", &config).unwrap_err();
    assert_eq!(
        err,
        StratError::NoSupport {
            colname: "x1".to_string()
        }
    );
}

#[test]
fn test_insufficient_rows() {
    let data = common::linear(8, 1.0, 1.0, 0.0, 0, 31);
    let config = StratConfig::default().with_min_samples_leaf(10);

    let err = partial_dependence(&data, "x1", &config).unwrap_err();
    assert!(matches!(
        err,
        StratError::InsufficientData {
            rows: 8,
            min_samples_leaf: 10,
            ..
        }
    ));
}

#[test]
fn test_unknown_column_and_bad_config() {
    let data = common::linear(50, 1.0, 1.0, 0.0, 0, 37);

    let err = partial_dependence(&data, "nope", &StratConfig::default()).unwrap_err();
    assert_eq!(err, StratError::Input(InputError::UnknownColumn("nope".into())));

    let err = partial_dependence(&data, "x1", &StratConfig::default().with_trials(0));
    assert!(matches!(err, Err(StratError::Config(_))));
}

/// Thirty rows; categorical `x2` has levels of 3, 6, 9 and 12 rows and
/// `x1` counts rows.
fn uneven_levels() -> Dataset {
    let mut codes: Vec<f64> = [(0.0, 3), (1.0, 6), (2.0, 9), (3.0, 12)]
        .iter()
        .flat_map(|&(code, n)| std::iter::repeat(code).take(n))
        .collect();
    let mut rng = StdRng::seed_from_u64(41);
    codes.shuffle(&mut rng);

    let n = codes.len();
    let X = Array2::from_shape_fn((n, 2), |(i, j)| if j == 0 { i as f64 } else { codes[i] });
    let y = Array1::from_shape_fn(n, |i| X[[i, 0]] + 2.0 * X[[i, 1]]);
    Dataset::new(X, y)
        .unwrap()
        .with_categorical(["x2"])
        .unwrap()
}

#[test]
fn test_sweep_ignores_more_leaves_as_min_samples_leaf_grows() {
    let data = uneven_levels();
    let sweep =
        sweep_min_samples_leaf(&data, "x1", &StratConfig::default(), &[2, 4, 7, 10]).unwrap();

    let ignored: Vec<usize> = sweep.iter().map(|(_, pd)| pd.ignored_leaves).collect();
    assert_eq!(ignored, vec![0, 1, 2, 3]);
    assert_eq!(sweep[3].1.ignored_rows, 3 + 6 + 9);

    // x1 is a row counter and every stratum shares its slope
    for (_, pd) in &sweep {
        assert_eq!(pd.n_leaves, 4);
        assert!(pd.slopes.iter().all(|&s| (s - 1.0).abs() < 1e-12));
    }
}

/// `y = effect[x1] + 2 x2` with categorical `x1` in {0, 1, 2}.
fn categorical_effect(n: usize, seed: u64) -> Dataset {
    let effect = [0.0, 10.0, 5.0];
    let mut rng = StdRng::seed_from_u64(seed);
    let X = Array2::from_shape_fn((n, 2), |(_, j)| {
        if j == 0 {
            rng.gen_range(0..3) as f64
        } else {
            rng.gen::<f64>()
        }
    });
    let y = Array1::from_shape_fn(n, |i| effect[X[[i, 0]] as usize] + 2.0 * X[[i, 1]]);
    Dataset::new(X, y)
        .unwrap()
        .with_categorical(["x1"])
        .unwrap()
}

#[test]
fn test_categorical_effects() {
    let data = categorical_effect(1000, 43);
    let config = StratConfig::default().with_min_samples_leaf(20);

    let pd = cat_partial_dependence(&data, "x1", &config).unwrap();
    assert_eq!(pd.categories, vec![0, 1, 2]);

    let values: Vec<f64> = pd.values.iter().map(|v| v.unwrap()).collect();
    assert_eq!(values[0], 0.0);
    assert_abs_diff_eq!(values[1], 10.0, epsilon = 0.3);
    assert_abs_diff_eq!(values[2], 5.0, epsilon = 0.3);
    assert!(pd.counts.iter().all(|&c| c > 0));
    assert_eq!(pd.excluded_rows, 0);
}

#[test]
fn test_numeric_column_against_categorical_strata() {
    // The only other column is categorical, so strata are its levels.
    let data = categorical_effect(600, 47);
    let pd = partial_dependence(&data, "x2", &StratConfig::default()).unwrap();

    assert_eq!(pd.n_leaves, 3);
    assert!(pd.slopes.iter().all(|&s| (s - 2.0).abs() < 1e-6));
}

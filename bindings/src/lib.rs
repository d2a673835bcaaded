mod data;

extern crate stratpd;

use crate::data::{dataset_from_numpy, to_py_err};

use numpy::{PyArray1, PyReadonlyArray1, PyReadonlyArray2};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use stratpd::{Anchor, Sampling, StratConfig};

#[allow(clippy::too_many_arguments)]
fn build_config(
    min_samples_leaf: usize,
    min_slopes_per_x: usize,
    n_trials: usize,
    sampling: &str,
    n_samples: Option<usize>,
    max_features: f64,
    seed: u64,
    anchor: &str,
) -> PyResult<StratConfig> {
    let sampling = match sampling {
        "all" => Sampling::All,
        "bootstrap" => Sampling::Bootstrap,
        "subsample" => Sampling::Subsample,
        other => {
            return Err(PyValueError::new_err(format!(
                "Unknown sampling strategy: {other}"
            )))
        }
    };
    let anchor = match anchor {
        "left_zero" => Anchor::LeftZero,
        "left_target_min" => Anchor::LeftTargetMin,
        "curve_min_zero" => Anchor::CurveMinZero,
        other => return Err(PyValueError::new_err(format!("Unknown anchor: {other}"))),
    };

    Ok(StratConfig::default()
        .with_min_samples_leaf(min_samples_leaf)
        .with_min_slopes_per_x(min_slopes_per_x)
        .with_trials(n_trials)
        .with_sampling(sampling, n_samples)
        .with_max_features(max_features)
        .with_seed(seed)
        .with_anchor(anchor))
}

/// Returns `(pdpx, pdpy, slopes, ignored_leaves)` for a numeric column.
#[pyfunction]
#[pyo3(signature = (
    X, y, colname, colnames=None, catcolnames=Vec::new(), min_samples_leaf=10,
    min_slopes_per_x=1, n_trials=1, sampling=String::from("all"), n_samples=None,
    max_features=1.0, seed=0, anchor=String::from("left_zero")
))]
#[allow(clippy::too_many_arguments, non_snake_case)]
fn partial_dependence<'py>(
    py: Python<'py>,
    X: PyReadonlyArray2<f64>,
    y: PyReadonlyArray1<f64>,
    colname: String,
    colnames: Option<Vec<String>>,
    catcolnames: Vec<String>,
    min_samples_leaf: usize,
    min_slopes_per_x: usize,
    n_trials: usize,
    sampling: String,
    n_samples: Option<usize>,
    max_features: f64,
    seed: u64,
    anchor: String,
) -> PyResult<(
    Bound<'py, PyArray1<f64>>,
    Bound<'py, PyArray1<f64>>,
    Bound<'py, PyArray1<f64>>,
    usize,
)> {
    let data = dataset_from_numpy(X, y, colnames, catcolnames)?;
    let config = build_config(
        min_samples_leaf,
        min_slopes_per_x,
        n_trials,
        &sampling,
        n_samples,
        max_features,
        seed,
        &anchor,
    )?;

    let pd = py
        .allow_threads(|| stratpd::partial_dependence(&data, &colname, &config))
        .map_err(to_py_err)?;

    Ok((
        PyArray1::from_vec_bound(py, pd.pdpx),
        PyArray1::from_vec_bound(py, pd.pdpy),
        PyArray1::from_vec_bound(py, pd.slopes),
        pd.ignored_leaves,
    ))
}

/// Returns `(categories, values, ignored_leaves)` for a categorical column;
/// categories without support get NaN.
#[pyfunction]
#[pyo3(signature = (
    X, y, colname, colnames=None, catcolnames=Vec::new(), min_samples_leaf=10,
    n_trials=1, seed=0, anchor=String::from("left_zero")
))]
#[allow(clippy::too_many_arguments, non_snake_case)]
fn cat_partial_dependence<'py>(
    py: Python<'py>,
    X: PyReadonlyArray2<f64>,
    y: PyReadonlyArray1<f64>,
    colname: String,
    colnames: Option<Vec<String>>,
    catcolnames: Vec<String>,
    min_samples_leaf: usize,
    n_trials: usize,
    seed: u64,
    anchor: String,
) -> PyResult<(Vec<i64>, Bound<'py, PyArray1<f64>>, usize)> {
    let data = dataset_from_numpy(X, y, colnames, catcolnames)?;
    let config = build_config(min_samples_leaf, 1, n_trials, "all", None, 1.0, seed, &anchor)?;

    let pd = py
        .allow_threads(|| stratpd::cat_partial_dependence(&data, &colname, &config))
        .map_err(to_py_err)?;

    let values: Vec<f64> = pd.values.iter().map(|v| v.unwrap_or(f64::NAN)).collect();
    Ok((
        pd.categories,
        PyArray1::from_vec_bound(py, values),
        pd.ignored_leaves,
    ))
}

/// Returns `[(name, importance)]` sorted descending; undefined scores are
/// NaN.
#[pyfunction]
#[pyo3(signature = (
    X, y, colnames=None, catcolnames=Vec::new(), min_samples_leaf=10,
    n_trials=1, seed=0, normalize=true
))]
#[allow(clippy::too_many_arguments, non_snake_case)]
fn importances(
    py: Python<'_>,
    X: PyReadonlyArray2<f64>,
    y: PyReadonlyArray1<f64>,
    colnames: Option<Vec<String>>,
    catcolnames: Vec<String>,
    min_samples_leaf: usize,
    n_trials: usize,
    seed: u64,
    normalize: bool,
) -> PyResult<Vec<(String, f64)>> {
    let data = dataset_from_numpy(X, y, colnames, catcolnames)?;
    let config = build_config(min_samples_leaf, 1, n_trials, "all", None, 1.0, seed, "left_zero")?
        .with_normalize(normalize);

    let table = py
        .allow_threads(|| stratpd::importances(&data, &config))
        .map_err(to_py_err)?;

    Ok(table
        .iter()
        .map(|e| (e.name.clone(), e.importance.unwrap_or(f64::NAN)))
        .collect())
}

/// A Python module implemented in Rust.
#[pymodule]
fn stratpd_py(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(partial_dependence, m)?)?;
    m.add_function(wrap_pyfunction!(cat_partial_dependence, m)?)?;
    m.add_function(wrap_pyfunction!(importances, m)?)?;
    Ok(())
}

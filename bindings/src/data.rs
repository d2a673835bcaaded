#![allow(non_snake_case)]

use numpy::{PyReadonlyArray1, PyReadonlyArray2};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use stratpd::{Dataset, StratError};

/// Converts a StratPD error into a Python `ValueError`.
pub fn to_py_err(err: StratError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

/// Copies the numpy arrays passed by the Python user into a `Dataset`.
pub fn dataset_from_numpy(
    X: PyReadonlyArray2<f64>,
    y: PyReadonlyArray1<f64>,
    colnames: Option<Vec<String>>,
    catcolnames: Vec<String>,
) -> PyResult<Dataset> {
    let X = X.as_array().as_standard_layout().into_owned();
    let y = y.as_array().to_owned();

    let mut data = Dataset::new(X, y).map_err(to_py_err)?;
    if let Some(colnames) = colnames {
        data = data.with_colnames(colnames).map_err(to_py_err)?;
    }
    data.with_categorical(catcolnames).map_err(to_py_err)
}

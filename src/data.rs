//   Copyright 2024 The PyMC Developers
//
//   Licensed under the Apache License, Version 2.0 (the "License");
//   you may not use this file except in compliance with the License.
//   You may obtain a copy of the License at
//
//       http://www.apache.org/licenses/LICENSE-2.0
//
//   Unless required by applicable law or agreed to in writing, software
//   distributed under the License is distributed on an "AS IS" BASIS,
//   WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//   See the License for the specific language governing permissions and
//   limitations under the License.
//! Tabular data handed to the StratPD pipeline.
#![allow(non_snake_case)]

use std::collections::HashSet;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::error::{InputError, Result};

/// Interface for reading the explanatory matrix and the target.
///
/// Categorical columns carry integer codes stored as `f64`.
pub trait TabularData: Sync {
    /// Covariate matrix
    fn X(&self) -> ArrayView2<'_, f64>;
    /// Response (target) vector
    fn y(&self) -> ArrayView1<'_, f64>;
    /// Column names, one per column of `X`.
    fn colnames(&self) -> &[String];
    /// Whether column `j` holds category codes.
    fn is_categorical(&self, j: usize) -> bool;

    /// Number of rows.
    fn n_rows(&self) -> usize {
        self.y().len()
    }

    /// Number of explanatory columns.
    fn n_cols(&self) -> usize {
        self.colnames().len()
    }

    /// Position of `colname` among the columns.
    fn column_index(&self, colname: &str) -> Result<usize> {
        self.colnames()
            .iter()
            .position(|c| c == colname)
            .ok_or_else(|| InputError::UnknownColumn(colname.to_string()).into())
    }
}

/// Row-aligned explanatory matrix and target.
///
/// The dataset is immutable once built; every run reads it concurrently.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    X: Array2<f64>,
    y: Array1<f64>,
    colnames: Vec<String>,
    categorical: Vec<bool>,
}

impl Dataset {
    /// Creates a dataset with default column names `x1..xp`.
    ///
    /// Fails when `X` and `y` disagree on the number of rows, when there are
    /// no rows, or when the target holds a non-finite value.
    pub fn new(X: Array2<f64>, y: Array1<f64>) -> Result<Self> {
        if X.nrows() != y.len() {
            return Err(InputError::TargetLenMismatch {
                rows: X.nrows(),
                targets: y.len(),
            }
            .into());
        }
        if y.is_empty() {
            return Err(InputError::Empty.into());
        }
        if let Some(row) = y.iter().position(|v| !v.is_finite()) {
            return Err(InputError::NonFiniteTarget { row }.into());
        }

        let colnames = (1..=X.ncols()).map(|j| format!("x{j}")).collect();
        let categorical = vec![false; X.ncols()];

        Ok(Self {
            X,
            y,
            colnames,
            categorical,
        })
    }

    /// Replaces the column names.
    pub fn with_colnames<S: Into<String>>(
        mut self,
        colnames: impl IntoIterator<Item = S>,
    ) -> Result<Self> {
        let colnames: Vec<String> = colnames.into_iter().map(Into::into).collect();
        if colnames.len() != self.X.ncols() {
            return Err(InputError::ColumnNameCount {
                expected: self.X.ncols(),
                got: colnames.len(),
            }
            .into());
        }

        let mut seen = HashSet::new();
        for name in &colnames {
            if !seen.insert(name.as_str()) {
                return Err(InputError::DuplicateColumn(name.clone()).into());
            }
        }

        self.colnames = colnames;
        Ok(self)
    }

    /// Flags the named columns as categorical.
    ///
    /// Their values must be integral codes; NaN marks a missing value.
    pub fn with_categorical<S: AsRef<str>>(
        mut self,
        catcolnames: impl IntoIterator<Item = S>,
    ) -> Result<Self> {
        for name in catcolnames {
            let j = self.column_index(name.as_ref())?;
            if let Some((row, &value)) = self
                .X
                .column(j)
                .iter()
                .enumerate()
                .find(|(_, v)| !v.is_nan() && v.fract() != 0.0)
            {
                return Err(InputError::NonIntegralCategory {
                    colname: self.colnames[j].clone(),
                    row,
                    value,
                }
                .into());
            }
            self.categorical[j] = true;
        }
        Ok(self)
    }

    /// Values of column `j`.
    pub fn column(&self, j: usize) -> ArrayView1<'_, f64> {
        self.X.column(j)
    }
}

impl TabularData for Dataset {
    fn X(&self) -> ArrayView2<'_, f64> {
        self.X.view()
    }

    fn y(&self) -> ArrayView1<'_, f64> {
        self.y.view()
    }

    fn colnames(&self) -> &[String] {
        &self.colnames
    }

    fn is_categorical(&self, j: usize) -> bool {
        self.categorical[j]
    }
}

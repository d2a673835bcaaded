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
//! Error types returned by the StratPD pipeline.
//!
//! Degenerate leaves and grid cells without supporting slopes are not
//! errors: they are excluded locally and surfaced as diagnostic counts on
//! the returned curves.

use crate::tree::TreeError;

/// Problems with the dataset handed to the pipeline.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputError {
    /// The dataset has no rows.
    #[error("dataset has no rows")]
    Empty,

    /// `X` and `y` disagree on the number of rows.
    #[error("number of targets ({targets}) does not match number of rows ({rows})")]
    TargetLenMismatch {
        /// Rows of `X`.
        rows: usize,
        /// Length of `y`.
        targets: usize,
    },

    /// The target holds NaN or an infinity.
    #[error("target value at row {row} is not finite")]
    NonFiniteTarget {
        /// First offending row.
        row: usize,
    },

    /// The number of column names differs from the number of columns.
    #[error("expected {expected} column names, got {got}")]
    ColumnNameCount {
        /// Columns of `X`.
        expected: usize,
        /// Names supplied.
        got: usize,
    },

    /// Two columns share a name.
    #[error("duplicate column name `{0}`")]
    DuplicateColumn(String),

    /// No column has this name.
    #[error("unknown column `{0}`")]
    UnknownColumn(String),

    /// A column flagged categorical holds a fractional value.
    #[error("categorical column `{colname}` holds non-integral value {value} at row {row}")]
    NonIntegralCategory {
        /// Column name.
        colname: String,
        /// First offending row.
        row: usize,
        /// Offending value.
        value: f64,
    },
}

/// Invalid pipeline settings.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// `min_samples_leaf` below 2.
    #[error("min_samples_leaf must be at least 2, got {0}")]
    MinSamplesLeaf(usize),

    /// `n_trials` is zero.
    #[error("n_trials must be at least 1")]
    NoTrials,

    /// `max_features` outside (0, 1].
    #[error("max_features must lie in (0, 1], got {0}")]
    MaxFeatures(f64),

    /// `n_samples` is zero.
    #[error("n_samples must be at least 1")]
    NoSamples,
}

/// Top-level error of the crate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StratError {
    /// Invalid dataset.
    #[error(transparent)]
    Input(#[from] InputError),

    /// Invalid settings.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Broken tree invariant.
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// Every variable has zero variation, so importances cannot be normalized.
    #[error("every variable has zero variation; importances cannot be normalized")]
    ZeroVariation,

    /// Too few usable rows, or fewer than two distinct values, for the column.
    #[error(
        "column `{colname}` has {rows} usable rows, not enough to stratify with \
         min_samples_leaf={min_samples_leaf}"
    )]
    InsufficientData {
        /// Column name.
        colname: String,
        /// Rows available to each trial.
        rows: usize,
        /// Configured leaf size.
        min_samples_leaf: usize,
    },

    /// No grid cell or category received a usable estimate.
    #[error("no leaf produced a usable slope or category delta for column `{colname}`")]
    NoSupport {
        /// Column name.
        colname: String,
    },
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, StratError>;

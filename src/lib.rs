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
#![warn(missing_docs)]
#![allow(non_snake_case)]

//! stratpd provides a model-free estimator of partial dependence and of
//! variation-based feature importance. The rows of a dataset are
//! stratified by a regression tree fitted on every column except the column
//! of interest, so that within each leaf the other columns are roughly held
//! constant. Per-leaf finite-difference slopes of the target with respect to
//! the column of interest are then averaged across leaves and integrated
//! into a partial-dependence curve. The mean magnitude of each column's
//! effect, normalized across columns, gives its importance.
//!
//! ```no_run
//! use ndarray::{Array1, Array2};
//! use stratpd::{importances, partial_dependence, Dataset, StratConfig};
//!
//! # fn main() -> stratpd::Result<()> {
//! let X = Array2::<f64>::zeros((100, 2));
//! let y = Array1::<f64>::zeros(100);
//! let data = Dataset::new(X, y)?.with_colnames(["size", "age"])?;
//!
//! let config = StratConfig::default().with_min_samples_leaf(5).with_seed(7);
//! let pd = partial_dependence(&data, "size", &config)?;
//! let table = importances(&data, &config)?;
//! # Ok(())
//! # }
//! ```

pub mod catpd;
pub mod config;
pub mod curve;
pub mod data;
pub mod error;
pub mod importance;
pub(crate) mod math;
pub mod partition;
pub mod sampling;
pub mod slopes;
pub mod split_rules;
pub mod stratpd;
pub mod tree;

pub use crate::catpd::CategoricalDependence;
pub use crate::config::{Anchor, Sampling, StratConfig, VariationMetric};
pub use crate::curve::PartialDependence;
pub use crate::data::{Dataset, TabularData};
pub use crate::error::{ConfigError, InputError, Result, StratError};
pub use crate::importance::{importances, importances_for, FeatureImportance, ImportanceTable};
pub use crate::slopes::SlopeSegment;
pub use crate::stratpd::{cat_partial_dependence, partial_dependence, sweep_min_samples_leaf};

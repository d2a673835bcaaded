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
//! Variation-based feature importance.
//!
//! Every candidate column runs through the StratPD pipeline independently
//! (in parallel); its curve is reduced to a scalar variation and the
//! variations are normalized to sum to one.

use std::cmp::Ordering;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::StratConfig;
use crate::data::TabularData;
use crate::error::{Result, StratError};
use crate::stratpd::{categorical_dependence, numeric_dependence};

/// Importance of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    /// Column name.
    pub name: String,
    /// Normalized (or raw, see [`ImportanceTable::is_normalized`]) score;
    /// `None` when the column could not be stratified.
    pub importance: Option<f64>,
    /// Variation before normalization.
    pub variation: Option<f64>,
    /// Leaves ignored while estimating the column's curve.
    pub ignored_leaves: usize,
    /// Why the importance is undefined.
    pub note: Option<String>,
}

/// Importances sorted descending; ties keep column order and undefined
/// entries come last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportanceTable {
    entries: Vec<FeatureImportance>,
    normalized: bool,
}

impl ImportanceTable {
    /// Entries in ranking order.
    pub fn entries(&self) -> &[FeatureImportance] {
        &self.entries
    }

    /// Iterates over the entries in ranking order.
    pub fn iter(&self) -> impl Iterator<Item = &FeatureImportance> {
        self.entries.iter()
    }

    /// Number of columns ranked.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no column was ranked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether scores were divided by the total variation.
    pub fn is_normalized(&self) -> bool {
        self.normalized
    }

    /// Entry for column `name`.
    pub fn get(&self, name: &str) -> Option<&FeatureImportance> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Score of `name`, if the column exists and its score is defined.
    pub fn importance(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(|e| e.importance)
    }

    /// Column names in ranking order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }
}

/// Ranks every column of `data`.
pub fn importances<D: TabularData + ?Sized>(data: &D, config: &StratConfig) -> Result<ImportanceTable> {
    let colnames: Vec<&str> = data.colnames().iter().map(String::as_str).collect();
    importances_for(data, &colnames, config)
}

/// Ranks the candidate columns `colnames`.
///
/// Columns flagged categorical use the categorical pipeline. A column
/// without enough data or without any usable leaf is reported with an
/// undefined importance; the run fails only when no column produces a
/// variation, or, when normalizing, every variation is zero.
pub fn importances_for<D: TabularData + ?Sized>(
    data: &D,
    colnames: &[&str],
    config: &StratConfig,
) -> Result<ImportanceTable> {
    config.validate()?;
    let columns: Vec<usize> = colnames
        .iter()
        .map(|name| data.column_index(name))
        .collect::<Result<_>>()?;
    if columns.is_empty() {
        return Ok(ImportanceTable {
            entries: Vec::new(),
            normalized: config.normalize,
        });
    }

    let outcomes: Vec<Result<(f64, usize)>> = columns
        .par_iter()
        .map(|&j| {
            if data.is_categorical(j) {
                categorical_dependence(data, j, config).map(|pd| (pd.variation(), pd.ignored_leaves))
            } else {
                numeric_dependence(data, j, config)
                    .map(|pd| (pd.variation(config.variation), pd.ignored_leaves))
            }
        })
        .collect();

    let mut entries = Vec::with_capacity(columns.len());
    let mut first_failure = None;
    for (&j, outcome) in columns.iter().zip(outcomes) {
        let name = data.colnames()[j].clone();
        match outcome {
            Ok((variation, ignored_leaves)) => entries.push(FeatureImportance {
                name,
                importance: Some(variation),
                variation: Some(variation),
                ignored_leaves,
                note: None,
            }),
            Err(err @ (StratError::InsufficientData { .. } | StratError::NoSupport { .. })) => {
                warn!(colname = %name, error = %err, "importance undefined");
                entries.push(FeatureImportance {
                    name,
                    importance: None,
                    variation: None,
                    ignored_leaves: 0,
                    note: Some(err.to_string()),
                });
                first_failure.get_or_insert(err);
            }
            Err(err) => return Err(err),
        }
    }

    if entries.iter().all(|e| e.variation.is_none()) {
        if let Some(err) = first_failure {
            return Err(err);
        }
    }

    if config.normalize {
        let total: f64 = entries.iter().filter_map(|e| e.variation).sum();
        if !(total > 0.0) {
            return Err(StratError::ZeroVariation);
        }
        for entry in &mut entries {
            entry.importance = entry.variation.map(|v| v / total);
        }
    }

    // Stable: equal scores keep column order.
    entries.sort_by(|a, b| match (a.importance, b.importance) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    info!(
        columns = entries.len(),
        top = entries.first().map(|e| e.name.as_str()).unwrap_or(""),
        "importances ranked"
    );

    Ok(ImportanceTable {
        entries,
        normalized: config.normalize,
    })
}

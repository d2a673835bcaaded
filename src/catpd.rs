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
//! Partial dependence of the target on a categorical column.
//!
//! Categories have no order, so slopes make no sense. Instead each leaf
//! reports, per category present in it, how far that category's mean
//! target sits from the mean over the leaf's categories. Those deltas are
//! averaged across leaves (and trials), weighted by leaf size.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::math::mean_abs_deviation;
use crate::slopes::IgnoredLeaf;

/// Weighted category deltas accumulated over leaves.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryGrid {
    categories: Vec<i64>,
    weighted_sum: Vec<f64>,
    weight: Vec<f64>,
    count: Vec<usize>,
}

impl CategoryGrid {
    /// Creates an empty grid over the distinct codes in `codes`; NaN codes
    /// are skipped.
    pub fn from_codes(codes: impl IntoIterator<Item = f64>) -> Self {
        let mut categories: Vec<i64> = codes
            .into_iter()
            .filter(|c| !c.is_nan())
            .map(|c| c as i64)
            .collect();
        categories.sort_unstable();
        categories.dedup();

        let n = categories.len();
        Self {
            categories,
            weighted_sum: vec![0.0; n],
            weight: vec![0.0; n],
            count: vec![0; n],
        }
    }

    /// Distinct category codes, ascending.
    pub fn categories(&self) -> &[i64] {
        &self.categories
    }

    /// Adds one leaf's per-category deltas.
    pub fn accumulate_leaf(
        &mut self,
        codes: &[f64],
        targets: &[f64],
        min_samples_leaf: usize,
    ) -> Result<(), IgnoredLeaf> {
        if codes.len() < min_samples_leaf {
            return Err(IgnoredLeaf::TooFewRows);
        }

        let mut groups: BTreeMap<i64, (f64, usize)> = BTreeMap::new();
        for (&code, &target) in codes.iter().zip(targets) {
            let entry = groups.entry(code as i64).or_insert((0.0, 0));
            entry.0 += target;
            entry.1 += 1;
        }
        if groups.len() < 2 {
            return Err(IgnoredLeaf::ConstantX);
        }

        let means: Vec<(i64, f64)> = groups
            .into_iter()
            .map(|(code, (sum, n))| (code, sum / n as f64))
            .collect();
        let center = means.iter().map(|&(_, m)| m).sum::<f64>() / means.len() as f64;
        let weight = codes.len() as f64;

        for (code, m) in means {
            if let Ok(i) = self.categories.binary_search(&code) {
                self.weighted_sum[i] += weight * (m - center);
                self.weight[i] += weight;
                self.count[i] += 1;
            }
        }
        Ok(())
    }

    /// Adds the sums of another grid over the same categories.
    pub fn merge(&mut self, other: &CategoryGrid) {
        debug_assert_eq!(self.categories, other.categories);
        for i in 0..self.categories.len() {
            self.weighted_sum[i] += other.weighted_sum[i];
            self.weight[i] += other.weight[i];
            self.count[i] += other.count[i];
        }
    }

    /// Averaged delta of category `i`, if any leaf observed it.
    pub fn value(&self, i: usize) -> Option<f64> {
        (self.count[i] > 0 && self.weight[i] > 0.0).then(|| self.weighted_sum[i] / self.weight[i])
    }

    /// Leaves that observed category `i`.
    pub fn support(&self, i: usize) -> usize {
        self.count[i]
    }
}

/// Partial dependence of the target on one categorical column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalDependence {
    /// Name of the column of interest.
    pub colname: String,
    /// Distinct category codes, ascending.
    pub categories: Vec<i64>,
    /// Averaged effect per category; `None` when no usable leaf held it.
    pub values: Vec<Option<f64>>,
    /// Leaves contributing to each category.
    pub counts: Vec<usize>,
    /// Leaves produced across all trials.
    pub n_leaves: usize,
    /// Leaves holding a single category or too few rows.
    pub ignored_leaves: usize,
    /// Rows held by ignored leaves.
    pub ignored_rows: usize,
    /// Rows dropped because the code was missing.
    pub excluded_rows: usize,
    /// Trials actually run.
    pub n_trials: usize,
}

impl CategoricalDependence {
    /// Categories with a defined effect.
    pub fn defined(&self) -> impl Iterator<Item = (i64, f64)> + '_ {
        self.categories
            .iter()
            .zip(&self.values)
            .filter_map(|(&c, v)| v.map(|v| (c, v)))
    }

    /// Mean absolute deviation of the defined effects.
    pub fn variation(&self) -> f64 {
        let values: Vec<f64> = self.defined().map(|(_, v)| v).collect();
        mean_abs_deviation(&values).unwrap_or(0.0)
    }
}

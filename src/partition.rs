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
//! Leaf partitioner: stratifies rows into groups that are similar in every
//! column except the column of interest.
//!
//! Two strategies are available:
//! - a least-squares regression tree on the other columns (`DecisionTree`);
//! - an exact grid over category codes, used when every other column is
//!   categorical.
#![allow(non_snake_case)]

use std::collections::BTreeMap;

use rand::Rng;

use crate::config::StratConfig;
use crate::data::TabularData;
use crate::error::Result;
use crate::tree::{DecisionTree, TreeSettings};

/// A terminal group of rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    /// Row indices into the dataset; repeated when bootstrapping.
    pub rows: Vec<usize>,
    /// Mean target of the rows in this leaf.
    pub value: f64,
}

impl Leaf {
    /// Number of rows, repeats included.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the leaf holds no row.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Strategy used to stratify one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stratifier {
    /// Regression tree over the other columns.
    Tree,
    /// Exact grouping by the tuple of the other columns' category codes.
    Grid,
}

impl Stratifier {
    /// Picks the grid when there are other columns and all are categorical.
    pub fn for_column<D: TabularData + ?Sized>(data: &D, colidx: usize) -> Self {
        let mut others = (0..data.n_cols()).filter(|&j| j != colidx).peekable();
        if others.peek().is_some() && others.all(|j| data.is_categorical(j)) {
            Stratifier::Grid
        } else {
            Stratifier::Tree
        }
    }
}

/// Partitions `rows` into leaves using every column but `colidx`.
///
/// The returned leaves are disjoint and together hold exactly `rows`.
pub fn stratify<D, R>(
    data: &D,
    colidx: usize,
    rows: Vec<usize>,
    config: &StratConfig,
    rng: &mut R,
) -> Result<Vec<Leaf>>
where
    D: TabularData + ?Sized,
    R: Rng + ?Sized,
{
    match Stratifier::for_column(data, colidx) {
        Stratifier::Tree => tree_leaves(data, colidx, rows, config, rng),
        Stratifier::Grid => Ok(grid_leaves(data, colidx, rows)),
    }
}

fn tree_leaves<D, R>(
    data: &D,
    colidx: usize,
    rows: Vec<usize>,
    config: &StratConfig,
    rng: &mut R,
) -> Result<Vec<Leaf>>
where
    D: TabularData + ?Sized,
    R: Rng + ?Sized,
{
    let features: Vec<usize> = (0..data.n_cols()).filter(|&j| j != colidx).collect();
    let categorical: Vec<bool> = features.iter().map(|&j| data.is_categorical(j)).collect();
    let settings = TreeSettings {
        min_samples_leaf: config.min_samples_leaf,
        max_features: config.max_features,
    };

    let tree = DecisionTree::fit(
        data.X(),
        data.y(),
        &features,
        &categorical,
        rows,
        &settings,
        rng,
    )?;

    Ok(tree
        .leaf_nodes()
        .into_iter()
        .map(|node| Leaf {
            rows: tree.leaf_rows(node).to_vec(),
            value: tree.value[node],
        })
        .collect())
}

fn grid_leaves<D: TabularData + ?Sized>(data: &D, colidx: usize, rows: Vec<usize>) -> Vec<Leaf> {
    let X = data.X();
    let y = data.y();

    // Codes are integral; NaN (missing) becomes its own group.
    let mut groups: BTreeMap<Vec<Option<i64>>, Vec<usize>> = BTreeMap::new();
    for row in rows {
        let key = (0..data.n_cols())
            .filter(|&j| j != colidx)
            .map(|j| {
                let code = X[[row, j]];
                (!code.is_nan()).then_some(code as i64)
            })
            .collect();
        groups.entry(key).or_default().push(row);
    }

    groups
        .into_values()
        .map(|rows| {
            let value = rows.iter().map(|&r| y[r]).sum::<f64>() / rows.len() as f64;
            Leaf { rows, value }
        })
        .collect()
}

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
//! Leaf slope estimator.
//!
//! Within one leaf the other columns are roughly constant, so the change of
//! the target between consecutive distinct values of the column of interest
//! estimates the local derivative. Rows sharing an x value are collapsed to
//! their mean target first, which keeps duplicate x values from producing
//! infinite slopes.
#![allow(non_snake_case)]

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::TabularData;
use crate::partition::Leaf;

/// Estimated derivative of the target over `[x_start, x_end]` in one leaf.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlopeSegment {
    /// Smaller x of the two consecutive distinct values.
    pub x_start: f64,
    /// Larger x of the two consecutive distinct values.
    pub x_end: f64,
    /// Change of the mean target per unit of x.
    pub slope: f64,
    /// Rows in the leaf that produced this segment.
    pub leaf_size: usize,
}

/// Why a leaf contributed no segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoredLeaf {
    /// Fewer rows than `min_samples_leaf`.
    TooFewRows,
    /// Every row shares one x value.
    ConstantX,
}

/// Sorts `(x, y)` pairs by x and averages y over identical x values.
pub fn collapse_duplicates(points: &mut [(f64, f64)]) -> (Vec<f64>, Vec<f64>) {
    points.sort_by(|a, b| a.0.total_cmp(&b.0));

    // (x, sum of y, count)
    let mut groups: Vec<(f64, f64, usize)> = Vec::new();
    for &(x, y) in points.iter() {
        let last = groups.len();
        if last > 0 && groups[last - 1].0 == x {
            groups[last - 1].1 += y;
            groups[last - 1].2 += 1;
        } else {
            groups.push((x, y, 1));
        }
    }

    groups
        .into_iter()
        .map(|(x, sum, count)| (x, sum / count as f64))
        .unzip()
}

/// Computes the slope segments of a single leaf.
pub fn leaf_slopes(
    x: &[f64],
    y: &[f64],
    min_samples_leaf: usize,
) -> Result<Vec<SlopeSegment>, IgnoredLeaf> {
    if x.len() < min_samples_leaf {
        return Err(IgnoredLeaf::TooFewRows);
    }

    let mut points: Vec<(f64, f64)> = x.iter().copied().zip(y.iter().copied()).collect();
    let (uniq_x, avg_y) = collapse_duplicates(&mut points);
    if uniq_x.len() < 2 {
        return Err(IgnoredLeaf::ConstantX);
    }

    let leaf_size = x.len();
    Ok(uniq_x
        .windows(2)
        .zip(avg_y.windows(2))
        .map(|(xs, ys)| SlopeSegment {
            x_start: xs[0],
            x_end: xs[1],
            slope: (ys[1] - ys[0]) / (xs[1] - xs[0]),
            leaf_size,
        })
        .collect())
}

/// Slope segments pooled over the leaves of one partition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeafSlopes {
    /// Segments of every usable leaf, in leaf order.
    pub segments: Vec<SlopeSegment>,
    /// Leaves examined.
    pub n_leaves: usize,
    /// Leaves that produced no segment.
    pub ignored_leaves: usize,
    /// Rows held by ignored leaves.
    pub ignored_rows: usize,
}

impl LeafSlopes {
    /// Appends another partition's results.
    pub fn extend(&mut self, other: LeafSlopes) {
        self.segments.extend(other.segments);
        self.n_leaves += other.n_leaves;
        self.ignored_leaves += other.ignored_leaves;
        self.ignored_rows += other.ignored_rows;
    }
}

/// Computes slope segments for every leaf in parallel; segments keep the
/// leaves' order.
pub fn collect_slopes<D: TabularData + ?Sized>(
    data: &D,
    colidx: usize,
    leaves: &[Leaf],
    min_samples_leaf: usize,
) -> LeafSlopes {
    let X = data.X();
    let y = data.y();

    let outcomes: Vec<Result<Vec<SlopeSegment>, IgnoredLeaf>> = leaves
        .par_iter()
        .map(|leaf| {
            let leaf_x: Vec<f64> = leaf.rows.iter().map(|&r| X[[r, colidx]]).collect();
            let leaf_y: Vec<f64> = leaf.rows.iter().map(|&r| y[r]).collect();
            leaf_slopes(&leaf_x, &leaf_y, min_samples_leaf)
        })
        .collect();

    let mut result = LeafSlopes {
        n_leaves: leaves.len(),
        ..LeafSlopes::default()
    };
    for (leaf, outcome) in leaves.iter().zip(outcomes) {
        match outcome {
            Ok(segments) => result.segments.extend(segments),
            Err(reason) => {
                result.ignored_leaves += 1;
                result.ignored_rows += leaf.len();
                debug!(rows = leaf.len(), ?reason, "ignoring leaf");
            }
        }
    }

    result
}

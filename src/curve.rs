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
//! Curve aggregator.
//!
//! Slope segments from every leaf and every trial are pooled on a grid whose
//! cells lie between consecutive distinct observed values of the column of
//! interest. Each cell averages the slopes of the segments covering it,
//! weighted by the size of the segment's leaf; the averaged slopes are then
//! integrated left to right into the partial-dependence curve.

use serde::{Deserialize, Serialize};

use crate::config::{Anchor, VariationMetric};
use crate::math::{mean_abs, mean_abs_deviation, CompensatedSum};
use crate::slopes::SlopeSegment;

/// Weighted slope sums over the cells of one column's domain.
///
/// Cell `i` spans `[xs[i], xs[i + 1])`. Grids built by separate trials over
/// the same domain are combined with [`SlopeGrid::merge`].
#[derive(Debug, Clone, PartialEq)]
pub struct SlopeGrid {
    xs: Vec<f64>,
    weighted_sum: Vec<f64>,
    weight: Vec<f64>,
    count: Vec<usize>,
}

impl SlopeGrid {
    /// Creates an empty grid over the distinct finite values in `values`.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let mut xs: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
        xs.sort_by(f64::total_cmp);
        xs.dedup();

        let n_cells = xs.len().saturating_sub(1);
        Self {
            xs,
            weighted_sum: vec![0.0; n_cells],
            weight: vec![0.0; n_cells],
            count: vec![0; n_cells],
        }
    }

    /// Grid edges (the distinct observed values).
    pub fn xs(&self) -> &[f64] {
        &self.xs
    }

    /// Number of cells between consecutive edges.
    pub fn n_cells(&self) -> usize {
        self.count.len()
    }

    /// Adds every segment to the cells it covers.
    ///
    /// Segment endpoints are observed values, so they coincide with grid
    /// edges; a segment covers cell `i` when
    /// `x_start <= xs[i]` and `xs[i + 1] <= x_end`.
    pub fn accumulate(&mut self, segments: &[SlopeSegment]) {
        for segment in segments {
            let weight = segment.leaf_size as f64;
            let mut i = self.xs.partition_point(|&v| v < segment.x_start);
            while i + 1 < self.xs.len() && self.xs[i + 1] <= segment.x_end {
                self.weighted_sum[i] += weight * segment.slope;
                self.weight[i] += weight;
                self.count[i] += 1;
                i += 1;
            }
        }
    }

    /// Adds the sums of another grid over the same domain.
    pub fn merge(&mut self, other: &SlopeGrid) {
        debug_assert_eq!(self.xs, other.xs, "grids must share their domain");
        for i in 0..self.n_cells() {
            self.weighted_sum[i] += other.weighted_sum[i];
            self.weight[i] += other.weight[i];
            self.count[i] += other.count[i];
        }
    }

    /// Number of segments covering cell `i`.
    pub fn support(&self, i: usize) -> usize {
        self.count[i]
    }

    /// Weighted average slope of cell `i`, if any segment covers it.
    pub fn slope(&self, i: usize) -> Option<f64> {
        (self.count[i] > 0 && self.weight[i] > 0.0).then(|| self.weighted_sum[i] / self.weight[i])
    }

    /// Integrates the cells with at least `min_support` covering segments.
    ///
    /// Returns `None` when no cell qualifies. The curve starts at zero;
    /// use [`anchor_curve`] to move it.
    pub fn integrate(&self, min_support: usize) -> Option<Curve> {
        let defined: Vec<(usize, f64)> = (0..self.n_cells())
            .filter(|&i| self.count[i] >= min_support)
            .filter_map(|i| self.slope(i).map(|s| (i, s)))
            .collect();
        let &(last, _) = defined.last()?;

        let mut pdpx: Vec<f64> = defined.iter().map(|&(i, _)| self.xs[i]).collect();
        pdpx.push(self.xs[last + 1]);

        // A defined cell's slope also spans any undefined cells up to the
        // next defined one.
        let dx: Vec<f64> = pdpx.windows(2).map(|w| w[1] - w[0]).collect();
        let slopes: Vec<f64> = defined.iter().map(|&(_, s)| s).collect();
        let slope_counts: Vec<usize> = defined.iter().map(|&(i, _)| self.count[i]).collect();

        let mut pdpy = Vec::with_capacity(pdpx.len());
        let mut total = CompensatedSum::new();
        pdpy.push(0.0);
        for (slope, width) in slopes.iter().zip(&dx) {
            total.add(slope * width);
            pdpy.push(total.value());
        }

        Some(Curve {
            pdpx,
            pdpy,
            slopes,
            slope_counts,
            dx,
        })
    }
}

/// Integrated curve before diagnostics are attached.
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    /// Left edge of each defined cell, then the right edge of the last one.
    pub pdpx: Vec<f64>,
    /// Integrated values at `pdpx`, starting at zero.
    pub pdpy: Vec<f64>,
    /// Slope over `[pdpx[k], pdpx[k + 1]]`.
    pub slopes: Vec<f64>,
    /// Segments averaged into each slope.
    pub slope_counts: Vec<usize>,
    /// Width spanned by each slope.
    pub dx: Vec<f64>,
}

/// Shifts `values` according to `anchor`.
///
/// `values[0]` belongs to the smallest x (or category).
pub fn anchor_curve(values: &mut [f64], anchor: Anchor, target_min: f64) {
    let Some(&first) = values.first() else {
        return;
    };
    let shift = match anchor {
        Anchor::LeftZero => -first,
        Anchor::LeftTargetMin => target_min - first,
        Anchor::CurveMinZero => -values.iter().copied().fold(f64::INFINITY, f64::min),
    };
    values.iter_mut().for_each(|v| *v += shift);
}

/// Partial dependence of the target on one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialDependence {
    /// Name of the column of interest.
    pub colname: String,
    /// Strictly increasing x positions of the curve.
    pub pdpx: Vec<f64>,
    /// Curve values at `pdpx`.
    pub pdpy: Vec<f64>,
    /// Averaged slope over `[pdpx[k], pdpx[k + 1]]` (dy/dx).
    pub slopes: Vec<f64>,
    /// Segments averaged into each slope.
    pub slope_counts: Vec<usize>,
    /// Width spanned by each slope (`pdpx[k + 1] - pdpx[k]`).
    pub dx: Vec<f64>,
    /// Every segment that went into the grid, across trials.
    pub segments: Vec<SlopeSegment>,
    /// Leaves produced across all trials.
    pub n_leaves: usize,
    /// Leaves with too few rows or a constant x.
    pub ignored_leaves: usize,
    /// Rows held by ignored leaves.
    pub ignored_rows: usize,
    /// Rows dropped because the column value was missing.
    pub excluded_rows: usize,
    /// Trials actually run.
    pub n_trials: usize,
}

impl PartialDependence {
    /// `(x, y)` points of the curve.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.pdpx.iter().copied().zip(self.pdpy.iter().copied())
    }

    /// Scalar summary of how much the column moves the target.
    pub fn variation(&self, metric: VariationMetric) -> f64 {
        let value = match metric {
            VariationMetric::MeanAbsSlope => mean_abs(&self.slopes),
            VariationMetric::MeanAbsDeviation => mean_abs_deviation(&self.pdpy),
        };
        value.unwrap_or(0.0)
    }
}

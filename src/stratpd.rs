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
//! Functions that run the StratPD pipeline for one column: sample rows,
//! stratify them on the other columns, estimate per-leaf slopes (or
//! category deltas), and aggregate everything into a single curve.
//!
//! Trials are independent and run in parallel. Each trial owns its RNG,
//! leaves and grid; the grids are merged in trial order once every trial
//! has finished, so a fixed seed always yields the same result.
#![allow(non_snake_case)]

use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::catpd::{CategoricalDependence, CategoryGrid};
use crate::config::{Sampling, StratConfig};
use crate::curve::{anchor_curve, PartialDependence, SlopeGrid};
use crate::data::TabularData;
use crate::error::{Result, StratError};
use crate::partition::{stratify, Leaf};
use crate::sampling::{sample_rows, trial_rng};
use crate::slopes::{collect_slopes, LeafSlopes};

/// Rows whose value in `colidx` is present, and how many were dropped.
fn usable_rows<D: TabularData + ?Sized>(data: &D, colidx: usize) -> (Vec<usize>, usize) {
    let rows: Vec<usize> = data
        .X()
        .column(colidx)
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .map(|(i, _)| i)
        .collect();
    let excluded = data.n_rows() - rows.len();
    (rows, excluded)
}

/// Fails with `InsufficientData` when a trial cannot hold a single leaf or
/// the column has fewer than two distinct values.
fn check_support<D: TabularData + ?Sized>(
    data: &D,
    colidx: usize,
    rows: &[usize],
    config: &StratConfig,
) -> Result<()> {
    let per_trial = match config.sampling {
        Sampling::All => rows.len(),
        Sampling::Bootstrap => config.n_samples.unwrap_or(rows.len()),
        Sampling::Subsample => {
            config.n_samples.unwrap_or(rows.len()).min(rows.len())
        }
    };

    let X = data.X();
    let column = X.column(colidx);
    let distinct = rows
        .first()
        .map_or(false, |&r0| rows.iter().any(|&r| column[r] != column[r0]));

    if per_trial < config.min_samples_leaf || !distinct {
        return Err(StratError::InsufficientData {
            colname: data.colnames()[colidx].clone(),
            rows: per_trial,
            min_samples_leaf: config.min_samples_leaf,
        });
    }
    Ok(())
}

/// Runs every trial for one column and returns the per-trial results in
/// trial order.
///
/// Trials run in waves of one trial per pool thread. The time budget is
/// checked before each wave after the first, so once it has elapsed no
/// further trial starts; trials already running are not interrupted.
fn run_trials<D, T, F>(
    data: &D,
    colidx: usize,
    rows: &[usize],
    config: &StratConfig,
    per_trial: F,
) -> Result<Vec<T>>
where
    D: TabularData + ?Sized,
    T: Send,
    F: Fn(Vec<Leaf>) -> T + Sync,
{
    let started = Instant::now();
    let wave = rayon::current_num_threads().max(1);

    let mut outcomes: Vec<Result<T>> = Vec::with_capacity(config.n_trials);
    let mut start = 0;
    while start < config.n_trials {
        if start > 0 && config.time_budget.is_some_and(|b| started.elapsed() >= b) {
            debug!(
                trials_run = start,
                n_trials = config.n_trials,
                "time budget exhausted"
            );
            break;
        }
        let end = (start + wave).min(config.n_trials);
        let batch: Vec<Result<T>> = (start..end)
            .into_par_iter()
            .map(|trial| {
                let mut rng = trial_rng(config.seed, colidx, trial);
                let sample = sample_rows(rows, config.sampling, config.n_samples, &mut rng);
                stratify(data, colidx, sample, config, &mut rng).map(&per_trial)
            })
            .collect();
        outcomes.extend(batch);
        start = end;
    }

    outcomes.into_iter().collect()
}

fn target_min<D: TabularData + ?Sized>(data: &D, rows: &[usize]) -> f64 {
    let y = data.y();
    rows.iter().map(|&r| y[r]).fold(f64::INFINITY, f64::min)
}

/// Estimates the partial dependence of the target on the numeric column
/// `colname`.
///
/// # Errors
///
/// - `Input` when `colname` is unknown;
/// - `Config` when `config` is invalid;
/// - `InsufficientData` when the column has too few usable rows or a
///   single distinct value;
/// - `NoSupport` when every leaf was degenerate.
pub fn partial_dependence<D: TabularData + ?Sized>(
    data: &D,
    colname: &str,
    config: &StratConfig,
) -> Result<PartialDependence> {
    config.validate()?;
    let colidx = data.column_index(colname)?;
    numeric_dependence(data, colidx, config)
}

pub(crate) fn numeric_dependence<D: TabularData + ?Sized>(
    data: &D,
    colidx: usize,
    config: &StratConfig,
) -> Result<PartialDependence> {
    let colname = &data.colnames()[colidx];
    let (rows, excluded_rows) = usable_rows(data, colidx);
    check_support(data, colidx, &rows, config)?;

    let X = data.X();
    let template = SlopeGrid::from_values(rows.iter().map(|&r| X[[r, colidx]]));

    let trials = run_trials(data, colidx, &rows, config, |leaves| {
        let slopes = collect_slopes(data, colidx, &leaves, config.min_samples_leaf);
        let mut grid = template.clone();
        grid.accumulate(&slopes.segments);
        (grid, slopes)
    })?;

    let n_trials = trials.len();
    let mut grid = template;
    let mut pooled = LeafSlopes::default();
    for (trial_grid, slopes) in trials {
        grid.merge(&trial_grid);
        pooled.extend(slopes);
    }

    let mut curve = grid
        .integrate(config.min_support())
        .ok_or_else(|| StratError::NoSupport {
            colname: colname.clone(),
        })?;
    anchor_curve(&mut curve.pdpy, config.anchor, target_min(data, &rows));

    debug!(
        colname = %colname,
        n_trials,
        leaves = pooled.n_leaves,
        ignored_leaves = pooled.ignored_leaves,
        segments = pooled.segments.len(),
        "partial dependence"
    );

    Ok(PartialDependence {
        colname: colname.clone(),
        pdpx: curve.pdpx,
        pdpy: curve.pdpy,
        slopes: curve.slopes,
        slope_counts: curve.slope_counts,
        dx: curve.dx,
        segments: pooled.segments,
        n_leaves: pooled.n_leaves,
        ignored_leaves: pooled.ignored_leaves,
        ignored_rows: pooled.ignored_rows,
        excluded_rows,
        n_trials,
    })
}

/// Estimates the partial dependence of the target on the categorical
/// column `colname`.
///
/// Errors as for [`partial_dependence`].
pub fn cat_partial_dependence<D: TabularData + ?Sized>(
    data: &D,
    colname: &str,
    config: &StratConfig,
) -> Result<CategoricalDependence> {
    config.validate()?;
    let colidx = data.column_index(colname)?;
    categorical_dependence(data, colidx, config)
}

pub(crate) fn categorical_dependence<D: TabularData + ?Sized>(
    data: &D,
    colidx: usize,
    config: &StratConfig,
) -> Result<CategoricalDependence> {
    let colname = &data.colnames()[colidx];
    let (rows, excluded_rows) = usable_rows(data, colidx);
    check_support(data, colidx, &rows, config)?;

    let X = data.X();
    let y = data.y();
    let template = CategoryGrid::from_codes(rows.iter().map(|&r| X[[r, colidx]]));

    let trials = run_trials(data, colidx, &rows, config, |leaves| {
        let mut grid = template.clone();
        let mut ignored_leaves = 0;
        let mut ignored_rows = 0;
        for leaf in &leaves {
            let codes: Vec<f64> = leaf.rows.iter().map(|&r| X[[r, colidx]]).collect();
            let targets: Vec<f64> = leaf.rows.iter().map(|&r| y[r]).collect();
            if let Err(reason) = grid.accumulate_leaf(&codes, &targets, config.min_samples_leaf) {
                debug!(rows = leaf.len(), ?reason, "ignoring leaf");
                ignored_leaves += 1;
                ignored_rows += leaf.len();
            }
        }
        (grid, leaves.len(), ignored_leaves, ignored_rows)
    })?;

    let n_trials = trials.len();
    let mut grid = template;
    let (mut n_leaves, mut ignored_leaves, mut ignored_rows) = (0, 0, 0);
    for (trial_grid, leaves, ignored, ignored_r) in trials {
        grid.merge(&trial_grid);
        n_leaves += leaves;
        ignored_leaves += ignored;
        ignored_rows += ignored_r;
    }

    let categories = grid.categories().to_vec();
    let mut values: Vec<Option<f64>> = (0..categories.len()).map(|i| grid.value(i)).collect();
    let counts: Vec<usize> = (0..categories.len()).map(|i| grid.support(i)).collect();

    let mut defined: Vec<f64> = values.iter().flatten().copied().collect();
    if defined.is_empty() {
        return Err(StratError::NoSupport {
            colname: colname.clone(),
        });
    }
    anchor_curve(&mut defined, config.anchor, target_min(data, &rows));
    let mut anchored = defined.into_iter();
    for value in values.iter_mut().flatten() {
        if let Some(shifted) = anchored.next() {
            *value = shifted;
        }
    }

    debug!(
        colname = %colname,
        n_trials,
        leaves = n_leaves,
        ignored_leaves,
        "categorical partial dependence"
    );

    Ok(CategoricalDependence {
        colname: colname.clone(),
        categories,
        values,
        counts,
        n_leaves,
        ignored_leaves,
        ignored_rows,
        excluded_rows,
        n_trials,
    })
}

/// Runs the numeric pipeline once per `min_samples_leaf` setting.
///
/// Smaller leaves stratify more finely but average fewer rows per slope;
/// comparing the curves shows where that trade-off settles for a column.
pub fn sweep_min_samples_leaf<D: TabularData + ?Sized>(
    data: &D,
    colname: &str,
    config: &StratConfig,
    settings: &[usize],
) -> Result<Vec<(usize, PartialDependence)>> {
    let colidx = data.column_index(colname)?;
    settings
        .iter()
        .map(|&min_samples_leaf| {
            let config = config.clone().with_min_samples_leaf(min_samples_leaf);
            config.validate()?;
            let pd = numeric_dependence(data, colidx, &config)?;
            info!(
                colname,
                min_samples_leaf,
                ignored_leaves = pd.ignored_leaves,
                "sweep step"
            );
            Ok((min_samples_leaf, pd))
        })
        .collect()
}

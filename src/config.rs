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
//! Settings for a StratPD run.
//!
//! Every knob that influences a result, including the random seed, lives in
//! [`StratConfig`]; a run is a pure function of the dataset and its config.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// How rows are drawn for each trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Sampling {
    /// Every usable row, every trial.
    #[default]
    All,
    /// `n_samples` rows drawn with replacement.
    Bootstrap,
    /// `n_samples` rows drawn without replacement.
    Subsample,
}

/// Fixes the integration constant of a partial-dependence curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Anchor {
    /// Value at the minimum x is zero.
    #[default]
    LeftZero,
    /// Value at the minimum x is the minimum of the target.
    LeftTargetMin,
    /// Curve shifted so its lowest point is zero.
    CurveMinZero,
}

/// Reduction from a curve to the scalar variation behind an importance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VariationMetric {
    /// Mean absolute slope over grid cells with a defined slope.
    #[default]
    MeanAbsSlope,
    /// Mean absolute deviation of the curve from its own mean.
    MeanAbsDeviation,
}

/// StratConfig holds the parameters shared by every stage of the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StratConfig {
    /// Smallest leaf the partitioner may produce; also the smallest leaf
    /// the slope estimator will use.
    pub min_samples_leaf: usize,
    /// Grid cells supported by fewer slopes are left undefined.
    pub min_slopes_per_x: usize,
    /// Number of independent partitions whose slopes are pooled.
    pub n_trials: usize,
    /// Row sampling strategy applied to each trial.
    pub sampling: Sampling,
    /// Rows drawn per trial; `None` draws as many rows as are usable.
    pub n_samples: Option<usize>,
    /// Fraction of the other columns considered at each tree node.
    pub max_features: f64,
    /// Base seed; every column and trial derives its own stream from it.
    pub seed: u64,
    /// Integration constant of the returned curves.
    pub anchor: Anchor,
    /// Curve summary used for importances.
    pub variation: VariationMetric,
    /// Divide variations by their sum when building an importance table.
    pub normalize: bool,
    /// Trials that would start after this much wall-clock time are skipped.
    pub time_budget: Option<Duration>,
}

impl Default for StratConfig {
    fn default() -> Self {
        Self {
            min_samples_leaf: 10,
            min_slopes_per_x: 1,
            n_trials: 1,
            sampling: Sampling::All,
            n_samples: None,
            max_features: 1.0,
            seed: 0,
            anchor: Anchor::LeftZero,
            variation: VariationMetric::MeanAbsSlope,
            normalize: true,
            time_budget: None,
        }
    }
}

impl StratConfig {
    /// Sets [`StratConfig::min_samples_leaf`].
    pub fn with_min_samples_leaf(mut self, n: usize) -> Self {
        self.min_samples_leaf = n;
        self
    }

    /// Sets [`StratConfig::min_slopes_per_x`].
    pub fn with_min_slopes_per_x(mut self, n: usize) -> Self {
        self.min_slopes_per_x = n;
        self
    }

    /// Sets the number of trials.
    pub fn with_trials(mut self, n_trials: usize) -> Self {
        self.n_trials = n_trials;
        self
    }

    /// Sets the per-trial row sampling strategy and sample size.
    pub fn with_sampling(mut self, sampling: Sampling, n_samples: Option<usize>) -> Self {
        self.sampling = sampling;
        self.n_samples = n_samples;
        self
    }

    /// Sets the fraction of columns searched per tree node.
    pub fn with_max_features(mut self, fraction: f64) -> Self {
        self.max_features = fraction;
        self
    }

    /// Sets the base seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the anchoring of the curves.
    pub fn with_anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = anchor;
        self
    }

    /// Sets the variation metric.
    pub fn with_variation(mut self, variation: VariationMetric) -> Self {
        self.variation = variation;
        self
    }

    /// Turns normalization of importances on or off.
    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    /// Skips trials that would start after `budget` has elapsed.
    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }

    /// Checks the settings before any work is scheduled.
    pub fn validate(&self) -> Result<()> {
        if self.min_samples_leaf < 2 {
            return Err(ConfigError::MinSamplesLeaf(self.min_samples_leaf).into());
        }
        if self.n_trials == 0 {
            return Err(ConfigError::NoTrials.into());
        }
        if !(self.max_features > 0.0 && self.max_features <= 1.0) {
            return Err(ConfigError::MaxFeatures(self.max_features).into());
        }
        if self.n_samples == Some(0) {
            return Err(ConfigError::NoSamples.into());
        }
        Ok(())
    }

    /// Support a grid cell needs; zero behaves as one.
    pub(crate) fn min_support(&self) -> usize {
        self.min_slopes_per_x.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StratError;

    #[test]
    fn default_config_is_valid() {
        assert!(StratConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_bad_settings() {
        let err = StratConfig::default()
            .with_min_samples_leaf(1)
            .validate()
            .unwrap_err();
        assert_eq!(err, StratError::Config(ConfigError::MinSamplesLeaf(1)));

        assert!(StratConfig::default().with_trials(0).validate().is_err());
        assert!(StratConfig::default().with_max_features(0.0).validate().is_err());
        assert!(StratConfig::default().with_max_features(1.5).validate().is_err());
        assert!(StratConfig::default()
            .with_sampling(Sampling::Bootstrap, Some(0))
            .validate()
            .is_err());
    }

    #[test]
    fn zero_support_behaves_as_one() {
        assert_eq!(StratConfig::default().with_min_slopes_per_x(0).min_support(), 1);
        assert_eq!(StratConfig::default().with_min_slopes_per_x(5).min_support(), 5);
    }
}

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
//! Split rule trait definitions and implementations for the stratifying
//! regression tree. A rule searches one column of a node for the split that
//! most reduces the squared error of the target, and divides the node's rows
//! by a chosen split value.
//!
//! Includes:
//! - `SplitRule`: Trait defining the interface for split rules.
//! - `ContinuousSplit`: Threshold splits for numeric columns.
//! - `OneHotSplit`: One-category-versus-rest splits for categorical columns.
//! - `SplitRuleType`: Enum encapsulating the different split rule types.

use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A candidate split of one node on one column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitCandidate<V> {
    /// Value passed to [`SplitRule::divide`].
    pub value: V,
    /// Reduction of the node's sum of squared errors.
    pub gain: f64,
}

/// Split rule interface for defining split rule strategies.
pub trait SplitRule {
    /// The data type associated with the split rule strategy.
    type Value;

    /// Finds the split with the largest squared-error reduction that leaves
    /// at least `min_samples_leaf` rows on each side.
    fn best_split(
        &self,
        candidates: &[Self::Value],
        targets: &[f64],
        min_samples_leaf: usize,
    ) -> Option<SplitCandidate<Self::Value>>;

    /// Divides the candidates left and right according to the split value.
    fn divide(
        &self,
        candidates: &[Self::Value],
        split_value: &Self::Value,
    ) -> (Vec<usize>, Vec<usize>);
}

/// `sum^2 / n` summed over both children, minus the same for the parent.
/// Maximizing it minimizes the children's total squared error.
#[inline]
fn sse_gain(left_sum: f64, left_n: usize, total_sum: f64, total_n: usize) -> f64 {
    let right_sum = total_sum - left_sum;
    let right_n = total_n - left_n;
    left_sum * left_sum / left_n as f64 + right_sum * right_sum / right_n as f64
        - total_sum * total_sum / total_n as f64
}

/// Standard continuous split rule. Rows with a value smaller than or equal
/// to the threshold go left; NaN always goes right.
pub struct ContinuousSplit;

impl SplitRule for ContinuousSplit {
    type Value = f64;

    fn best_split(
        &self,
        candidates: &[f64],
        targets: &[f64],
        min_samples_leaf: usize,
    ) -> Option<SplitCandidate<f64>> {
        let n = candidates.len();
        if n < 2 * min_samples_leaf {
            return None;
        }

        // NaN of either sign sorts last so the scan matches `divide`.
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| {
            let (a, b) = (candidates[a], candidates[b]);
            a.is_nan().cmp(&b.is_nan()).then(a.total_cmp(&b))
        });

        let total_sum: f64 = targets.iter().sum();
        let mut left_sum = 0.0;
        let mut best: Option<SplitCandidate<f64>> = None;

        for i in 1..n {
            left_sum += targets[order[i - 1]];
            if i < min_samples_leaf || n - i < min_samples_leaf {
                continue;
            }

            let lo = candidates[order[i - 1]];
            let hi = candidates[order[i]];
            if !(lo.is_finite() && hi.is_finite()) || lo >= hi {
                continue;
            }

            let gain = sse_gain(left_sum, i, total_sum, n);
            if best.map_or(true, |b| gain > b.gain) {
                let mid = lo + (hi - lo) / 2.0;
                let value = if mid < hi { mid } else { lo };
                best = Some(SplitCandidate { value, gain });
            }
        }

        best
    }

    fn divide(&self, candidates: &[f64], split_value: &f64) -> (Vec<usize>, Vec<usize>) {
        let (left, right): (Vec<usize>, Vec<usize>) =
            (0..candidates.len()).partition(|&idx| candidates[idx] <= *split_value);
        (left, right)
    }
}

/// Choose a single categorical value and branch on it if the variable is
/// that value or not. Missing codes (NaN) never match.
pub struct OneHotSplit;

impl SplitRule for OneHotSplit {
    type Value = f64;

    fn best_split(
        &self,
        candidates: &[f64],
        targets: &[f64],
        min_samples_leaf: usize,
    ) -> Option<SplitCandidate<f64>> {
        let n = candidates.len();
        if n < 2 * min_samples_leaf {
            return None;
        }

        // code -> (sum of targets, count)
        let mut groups: BTreeMap<i64, (f64, usize)> = BTreeMap::new();
        for (&code, &target) in candidates.iter().zip(targets) {
            if code.is_nan() {
                continue;
            }
            let entry = groups.entry(code as i64).or_insert((0.0, 0));
            entry.0 += target;
            entry.1 += 1;
        }

        let total_sum: f64 = targets.iter().sum();
        groups
            .into_iter()
            .filter(|&(_, (_, count))| count >= min_samples_leaf && n - count >= min_samples_leaf)
            .map(|(code, (sum, count))| SplitCandidate {
                value: code as f64,
                gain: sse_gain(sum, count, total_sum, n),
            })
            .fold(None, |best: Option<SplitCandidate<f64>>, cand| match best {
                Some(b) if b.gain.partial_cmp(&cand.gain) != Some(Ordering::Less) => Some(b),
                _ => Some(cand),
            })
    }

    fn divide(&self, candidates: &[f64], split_value: &f64) -> (Vec<usize>, Vec<usize>) {
        let (left, right): (Vec<usize>, Vec<usize>) =
            (0..candidates.len()).partition(|&idx| candidates[idx] == *split_value);
        (left, right)
    }
}

/// Holds the split rule strategies as enum variants.
pub enum SplitRuleType {
    /// Continuous implements the `ContinuousSplit` strategy.
    Continuous(ContinuousSplit),
    /// OneHot implements the `OneHotSplit` strategy.
    OneHot(OneHotSplit),
}

impl SplitRuleType {
    /// Rule matching a column's declared kind.
    pub fn for_column(categorical: bool) -> Self {
        if categorical {
            SplitRuleType::OneHot(OneHotSplit)
        } else {
            SplitRuleType::Continuous(ContinuousSplit)
        }
    }

    /// Dispatches [`SplitRule::best_split`] to the wrapped rule.
    pub fn best_split(
        &self,
        candidates: &[f64],
        targets: &[f64],
        min_samples_leaf: usize,
    ) -> Option<SplitCandidate<f64>> {
        match self {
            SplitRuleType::Continuous(rule) => {
                rule.best_split(candidates, targets, min_samples_leaf)
            }
            SplitRuleType::OneHot(rule) => rule.best_split(candidates, targets, min_samples_leaf),
        }
    }

    /// Dispatches [`SplitRule::divide`] to the wrapped rule.
    pub fn divide(&self, candidates: &[f64], split_value: &f64) -> (Vec<usize>, Vec<usize>) {
        match self {
            SplitRuleType::Continuous(rule) => rule.divide(candidates, split_value),
            SplitRuleType::OneHot(rule) => rule.divide(candidates, split_value),
        }
    }
}

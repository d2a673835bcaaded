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
//! Per-trial row selection and deterministic seeding.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Uniform};

use crate::config::Sampling;

/// Builds the RNG of one trial of one column.
///
/// Seeds are mixed with SplitMix64 so neighbouring columns and trials get
/// unrelated streams while the whole run stays reproducible.
pub fn trial_rng(seed: u64, column: usize, trial: usize) -> StdRng {
    let mut z = seed
        ^ (column as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (trial as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    StdRng::seed_from_u64(z ^ (z >> 31))
}

/// Draws the rows used by one trial from `rows`.
///
/// `n_samples` defaults to `rows.len()`; a subsample never exceeds it.
pub fn sample_rows<R: Rng + ?Sized>(
    rows: &[usize],
    sampling: Sampling,
    n_samples: Option<usize>,
    rng: &mut R,
) -> Vec<usize> {
    let n = n_samples.unwrap_or(rows.len());
    match sampling {
        Sampling::All => rows.to_vec(),
        Sampling::Bootstrap => {
            if rows.is_empty() {
                return Vec::new();
            }
            let draw = Uniform::new(0, rows.len());
            let mut picked: Vec<usize> = (0..n).map(|_| rows[draw.sample(rng)]).collect();
            picked.sort_unstable();
            picked
        }
        Sampling::Subsample => {
            let amount = n.min(rows.len());
            let mut picked: Vec<usize> = index::sample(rng, rows.len(), amount)
                .into_iter()
                .map(|i| rows[i])
                .collect();
            picked.sort_unstable();
            picked
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_keeps_every_row() {
        let rows: Vec<usize> = (0..20).collect();
        let mut rng = trial_rng(1, 0, 0);
        assert_eq!(sample_rows(&rows, Sampling::All, Some(5), &mut rng), rows);
    }

    #[test]
    fn subsample_draws_distinct_rows() {
        let rows: Vec<usize> = (100..200).collect();
        let mut rng = trial_rng(7, 2, 3);
        let picked = sample_rows(&rows, Sampling::Subsample, Some(30), &mut rng);

        assert_eq!(picked.len(), 30);
        assert!(picked.windows(2).all(|w| w[0] < w[1]));
        assert!(picked.iter().all(|r| rows.contains(r)));

        let capped = sample_rows(&rows, Sampling::Subsample, Some(1000), &mut rng);
        assert_eq!(capped.len(), rows.len());
    }

    #[test]
    fn bootstrap_draws_with_replacement() {
        let rows: Vec<usize> = (0..10).collect();
        let mut rng = trial_rng(3, 0, 0);
        let picked = sample_rows(&rows, Sampling::Bootstrap, Some(200), &mut rng);

        assert_eq!(picked.len(), 200);
        assert!(picked.iter().all(|r| *r < 10));
        assert!(picked.windows(2).any(|w| w[0] == w[1]));
    }

    #[test]
    fn trial_streams_are_reproducible() {
        let a: u64 = trial_rng(42, 1, 2).gen();
        let b: u64 = trial_rng(42, 1, 2).gen();
        let c: u64 = trial_rng(42, 2, 1).gen();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}

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
//! Small numeric helpers shared by the aggregators.

/// Compensated (Neumaier) running sum.
///
/// Integrating many narrow grid cells adds many small terms to a large
/// total; the compensation term keeps the result from drifting.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CompensatedSum {
    sum: f64,
    compensation: f64,
}

impl CompensatedSum {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: f64) {
        let t = self.sum + value;
        if self.sum.abs() >= value.abs() {
            self.compensation += (self.sum - t) + value;
        } else {
            self.compensation += (value - t) + self.sum;
        }
        self.sum = t;
    }

    pub fn value(&self) -> f64 {
        self.sum + self.compensation
    }
}

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut total = CompensatedSum::new();
    values.iter().for_each(|&v| total.add(v));
    Some(total.value() / values.len() as f64)
}

/// Mean absolute value; `None` for an empty slice.
pub fn mean_abs(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut total = CompensatedSum::new();
    values.iter().for_each(|&v| total.add(v.abs()));
    Some(total.value() / values.len() as f64)
}

/// Mean absolute deviation from the mean; `None` for an empty slice.
pub fn mean_abs_deviation(values: &[f64]) -> Option<f64> {
    let center = mean(values)?;
    let deviations: Vec<f64> = values.iter().map(|v| v - center).collect();
    mean_abs(&deviations)
}

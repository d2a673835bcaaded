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
//! Runs StratPD on a synthetic dataset `y = x1 + 3 x2 + 10` with an extra
//! noise column and prints the curves' endpoints and the importance table.
#![allow(non_snake_case)]

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use stratpd::{importances, partial_dependence, Dataset, StratConfig};

fn main() -> stratpd::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stratpd=info".into()),
        )
        .init();

    let n = 1000;
    let mut rng = StdRng::seed_from_u64(999);
    let X = Array2::from_shape_fn((n, 3), |_| rng.gen::<f64>());
    let y = Array1::from_shape_fn(n, |i| X[[i, 0]] + 3.0 * X[[i, 1]] + 10.0);

    let data = Dataset::new(X, y)?.with_colnames(["x1", "x2", "noise"])?;
    let config = StratConfig::default().with_min_samples_leaf(5);

    for colname in ["x1", "x2", "noise"] {
        let pd = partial_dependence(&data, colname, &config)?;
        let (x0, y0) = pd.points().next().unwrap_or_default();
        let (x1, y1) = pd.points().last().unwrap_or_default();
        println!(
            "{colname:>6}: pd({x0:.3}) = {y0:.3}, pd({x1:.3}) = {y1:.3}, ignored leaves {}/{}",
            pd.ignored_leaves, pd.n_leaves
        );
    }

    let table = importances(&data, &config)?;
    println!("{:>8}  importance", "feature");
    for entry in table.iter() {
        match entry.importance {
            Some(importance) => println!("{:>8}  {importance:.3}", entry.name),
            None => println!("{:>8}  undefined", entry.name),
        }
    }

    Ok(())
}

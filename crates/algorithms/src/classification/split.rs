//! Random train/test partitioning
//!
//! Every sample draws one uniform value in [0, 1) and goes to the training
//! subset when the value is below `train_fraction`. Subset sizes are
//! therefore only approximately `train_fraction * n`, and class proportions
//! are not preserved (no stratification).

use covermap_core::{Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Parameters for [`random_split`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitParams {
    /// Training threshold in (0, 1]. Default: 0.6
    pub train_fraction: f64,
    /// Seed for a reproducible split; `None` draws from OS entropy
    pub seed: Option<u64>,
}

impl Default for SplitParams {
    fn default() -> Self {
        Self {
            train_fraction: 0.6,
            seed: None,
        }
    }
}

/// Disjoint training and test subsets
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSplit<T> {
    pub training: Vec<T>,
    pub testing: Vec<T>,
}

impl<T> DatasetSplit<T> {
    pub fn len(&self) -> usize {
        self.training.len() + self.testing.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Partition `samples` by one independent uniform draw per sample.
///
/// Relative order is kept within each subset.
///
/// # Errors
/// `InvalidParameter` if `train_fraction` is not in (0, 1].
pub fn random_split<T>(samples: Vec<T>, params: &SplitParams) -> Result<DatasetSplit<T>> {
    let fraction = params.train_fraction;
    if !(fraction > 0.0 && fraction <= 1.0) {
        return Err(Error::InvalidParameter {
            name: "train_fraction",
            value: fraction.to_string(),
            reason: "must be in (0, 1]".into(),
        });
    }

    let mut rng = match params.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut split = DatasetSplit {
        training: Vec::with_capacity((samples.len() as f64 * fraction).ceil() as usize),
        testing: Vec::new(),
    };
    for sample in samples {
        let draw: f64 = rng.gen();
        if draw < fraction {
            split.training.push(sample);
        } else {
            split.testing.push(sample);
        }
    }

    Ok(split)
}

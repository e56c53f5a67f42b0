//! Fixed-seed train/test partition.

use rand::prelude::*;
use rand::rngs::StdRng;

use crate::error::PipelineError;

pub const DEFAULT_SPLIT_SEED: u64 = 42;
pub const DEFAULT_TEST_FRACTION: f64 = 0.2;

/// Row indices of the two partitions, each sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..n` with a seeded RNG and hold out `ceil(n * test_fraction)` rows.
///
/// Both partitions must be non-empty, so `n >= 2` is required.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> Result<Split, PipelineError> {
    if !(test_fraction.is_finite() && test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(PipelineError::InvalidInput {
            field: "test_fraction".to_string(),
            reason: format!("{test_fraction} is not in (0, 1)"),
        });
    }
    if n < 2 {
        return Err(PipelineError::InsufficientData(format!(
            "{n} record(s) cannot be split into non-empty train and test partitions"
        )));
    }

    let n_test = ((n as f64 * test_fraction).ceil() as usize).clamp(1, n - 1);

    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let mut test = order[..n_test].to_vec();
    let mut train = order[n_test..].to_vec();
    test.sort_unstable();
    train.sort_unstable();
    Ok(Split { train, test })
}

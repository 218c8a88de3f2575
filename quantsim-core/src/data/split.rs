//! Chronological train / test / validation split.

use super::provider::DataError;
use crate::domain::Bar;

/// Three contiguous, non-overlapping views of a bar sequence.
#[derive(Debug, Clone, Copy)]
pub struct DataSplit<'a> {
    pub train: &'a [Bar],
    pub test: &'a [Bar],
    pub validation: &'a [Bar],
}

/// Split at `floor(n·train)` and `floor(n·(train+test))`; validation gets the
/// remainder.
pub fn split_by_ratio(bars: &[Bar], train: f64, test: f64) -> Result<DataSplit<'_>, DataError> {
    let valid = train.is_finite()
        && test.is_finite()
        && train > 0.0
        && test >= 0.0
        && train + test <= 1.0;
    if !valid {
        return Err(DataError::InvalidSplit { train, test });
    }

    let n = bars.len();
    let i_train = ((n as f64 * train).floor() as usize).min(n);
    let i_test = ((n as f64 * (train + test)).floor() as usize).clamp(i_train, n);

    Ok(DataSplit {
        train: &bars[..i_train],
        test: &bars[i_train..i_test],
        validation: &bars[i_test..],
    })
}

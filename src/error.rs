use thiserror::Error;

use crate::value::{Addr, Word};

pub type TbResult<T> = Result<T, TbError>;

#[derive(Debug, Error)]
pub enum TbError {
    /// Observed register content differs from the expected value.
    #[error("register x{address} has wrong value {actual}, it should be {expected}")]
    Mismatch {
        address: Addr,
        expected: Word,
        actual: Word,
    },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("no signal named `{0}`")]
    UnknownSignal(String),
    #[error("invalid signal or callback handle {0}")]
    InvalidHandle(usize),
    #[error("unknown time unit `{0}`")]
    TimeUnit(String),
    #[error("can't convert {time} {unit} to simulation steps without rounding")]
    TimeRounding { time: f64, unit: String },
    #[error("test did not finish within {limit} simulation steps")]
    Timeout { limit: u64 },
    #[error("simulation ran out of events before the test finished")]
    Stalled,
    #[error("task was cancelled")]
    Cancelled,
    #[error("failed to write report: {0}")]
    Report(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TbError {
    pub fn mismatch(address: Addr, expected: Word, actual: Word) -> Self {
        TbError::Mismatch {
            address,
            expected,
            actual,
        }
    }

    pub fn is_mismatch(&self) -> bool {
        matches!(self, TbError::Mismatch { .. })
    }
}

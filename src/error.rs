use thiserror::Error;

use crate::core::Ticks;

/// Invalid workload, detected before the simulation starts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkloadError {
    #[error("workload must contain at least one process")]
    Empty,

    #[error("process {index}: arrival time {value} is negative")]
    NegativeArrival { index: usize, value: i64 },

    #[error("process {index}: burst time must be positive, got {value}")]
    NonPositiveBurst { index: usize, value: i64 },

    #[error("process {index}: priority {value} is negative")]
    NegativePriority { index: usize, value: i64 },

    #[error("process {index}: period must be positive, got {value}")]
    NonPositivePeriod { index: usize, value: i64 },

    #[error("process {index}: deadline must be positive, got {value}")]
    NonPositiveDeadline { index: usize, value: i64 },

    #[error("horizon {horizon} ends before periodic process {index} is first released")]
    HorizonTooShort { index: usize, horizon: Ticks },

    #[error("invalid {field} range {min}..={max}")]
    InvalidRange {
        field: &'static str,
        min: Ticks,
        max: Ticks,
    },

    #[error("malformed process `{input}`: {reason}")]
    Malformed { input: String, reason: String },
}

/// Policy misconfiguration, surfaced before any partial run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown policy `{0}` (expected one of fcfs, sjf, priority, rr, mlq, edf)")]
    UnknownPolicy(String),

    #[error("policy `{0}` requires a time quantum")]
    MissingQuantum(&'static str),

    #[error("time quantum must be positive, got {0}")]
    NonPositiveQuantum(Ticks),

    #[error("multi-level queue needs at least one level")]
    NoLevels,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Workload(#[from] WorkloadError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

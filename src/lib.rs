pub mod config;
pub mod core;
pub mod error;
pub mod scheduler;
pub mod sim;
pub mod telemetry;

pub use config::{PolicyKind, SchedConfig};
pub use crate::core::{SimEvent, TimedEvent};
pub use error::{ConfigError, Error, Result, WorkloadError};
pub use scheduler::{AnyScheduler, Scheduler};
pub use sim::{Metrics, Process, ProcessSpec, RandomWorkload, Sim, SimOutcome, Workload, simulate};

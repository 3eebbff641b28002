pub mod driver;
pub mod metrics;
pub mod report;
pub mod workload;

pub use driver::{Sim, SimOutcome, simulate};
pub use metrics::{Metrics, ProcessRecord, Summary};
pub use workload::{Pid, Process, ProcessSpec, RandomWorkload, Workload};

pub mod driver;
pub mod event;
pub mod observer;
pub mod state;

pub use driver::SchedCore;
pub use event::{PreemptReason, SimEvent, TimedEvent};
pub use state::{Dsq, DsqId, Rank, SimCtx, Task, TaskId, TaskState, Ticks};

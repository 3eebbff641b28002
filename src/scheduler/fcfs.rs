use super::{Decision, EnqueueFlags, Scheduler, SimCtx, TaskId};
use crate::{config::SchedConfig, core::DsqId, error::ConfigError};

/// First come, first served. Arrivals are admitted in (arrival, id) order, so a
/// single FIFO is already sorted by the tie-break rule.
#[derive(Debug)]
pub struct FcfsScheduler {
    queue: DsqId,
}

impl Scheduler for FcfsScheduler {
    fn init(ctx: &mut SimCtx, _config: &SchedConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            queue: ctx.create_dsq_fifo(),
        })
    }

    fn name(&self) -> &'static str {
        "fcfs"
    }

    fn enqueue(&mut self, ctx: &mut SimCtx, task: TaskId, _flags: EnqueueFlags) {
        ctx.dsq_push_fifo(self.queue, task);
    }

    fn dispatch(&mut self, ctx: &mut SimCtx) -> Option<Decision> {
        ctx.dsq_pop(self.queue).map(Decision::run_to_completion)
    }
}

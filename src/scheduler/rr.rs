use super::{Decision, EnqueueFlags, Scheduler, SimCtx, TaskId};
use crate::{
    config::SchedConfig,
    core::{DsqId, Ticks},
    error::ConfigError,
};

/// Round-robin over one FIFO. The executor admits a tick's arrivals before it
/// requeues the task whose quantum ran out, so newcomers go ahead of it.
#[derive(Debug)]
pub struct RoundRobinScheduler {
    queue: DsqId,
    quantum: Ticks,
}

impl RoundRobinScheduler {
    pub fn quantum(&self) -> Ticks {
        self.quantum
    }
}

impl Scheduler for RoundRobinScheduler {
    fn init(ctx: &mut SimCtx, config: &SchedConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            queue: ctx.create_dsq_fifo(),
            quantum: config.require_quantum()?,
        })
    }

    fn name(&self) -> &'static str {
        "rr"
    }

    fn enqueue(&mut self, ctx: &mut SimCtx, task: TaskId, _flags: EnqueueFlags) {
        ctx.dsq_push_fifo(self.queue, task);
    }

    fn dispatch(&mut self, ctx: &mut SimCtx) -> Option<Decision> {
        ctx.dsq_pop(self.queue)
            .map(|task| Decision::slice(task, self.quantum))
    }
}

use super::{Decision, EnqueueFlags, Scheduler, SimCtx, TaskId};
use crate::{
    config::SchedConfig,
    core::{DsqId, Rank},
    error::ConfigError,
};

/// Shortest remaining time first. Remaining time only changes while a task
/// is on the CPU, so a rank computed at enqueue stays valid while queued.
#[derive(Debug)]
pub struct SjfScheduler {
    queue: DsqId,
}

fn rank(ctx: &SimCtx, task: TaskId) -> Rank {
    let task = ctx.task(task);
    Rank::new(task.remaining, task.process.id, 0)
}

impl Scheduler for SjfScheduler {
    fn init(ctx: &mut SimCtx, _config: &SchedConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            queue: ctx.create_dsq_priq(),
        })
    }

    fn name(&self) -> &'static str {
        "sjf"
    }

    fn enqueue(&mut self, ctx: &mut SimCtx, task: TaskId, _flags: EnqueueFlags) {
        let rank = rank(ctx, task);
        ctx.dsq_push_priq(self.queue, task, rank);
    }

    fn dispatch(&mut self, ctx: &mut SimCtx) -> Option<Decision> {
        ctx.dsq_pop(self.queue).map(Decision::run_to_completion)
    }

    // Strictly shorter only; an equal remaining time keeps the running task.
    fn should_preempt(&mut self, ctx: &SimCtx, running: TaskId) -> bool {
        ctx.dsq_peek_rank(self.queue)
            .is_some_and(|best| best.0[0] < ctx.task(running).remaining)
    }
}

use super::{Decision, EnqueueFlags, Scheduler, SimCtx, TaskId};
use crate::{
    config::SchedConfig,
    core::{DsqId, Rank, Ticks},
    error::ConfigError,
};

/// Earliest deadline first. Tasks without a deadline rank behind every task
/// that has one.
#[derive(Debug)]
pub struct EdfScheduler {
    queue: DsqId,
}

fn deadline(ctx: &SimCtx, task: TaskId) -> Ticks {
    ctx.task(task).process.deadline.unwrap_or(Ticks::MAX)
}

impl Scheduler for EdfScheduler {
    fn init(ctx: &mut SimCtx, _config: &SchedConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            queue: ctx.create_dsq_priq(),
        })
    }

    fn name(&self) -> &'static str {
        "edf"
    }

    fn enqueue(&mut self, ctx: &mut SimCtx, task: TaskId, _flags: EnqueueFlags) {
        let rank = Rank::new(deadline(ctx, task), ctx.task(task).process.id, 0);
        ctx.dsq_push_priq(self.queue, task, rank);
    }

    fn dispatch(&mut self, ctx: &mut SimCtx) -> Option<Decision> {
        ctx.dsq_pop(self.queue).map(Decision::run_to_completion)
    }

    fn should_preempt(&mut self, ctx: &SimCtx, running: TaskId) -> bool {
        ctx.dsq_peek_rank(self.queue)
            .is_some_and(|best| best.0[0] < deadline(ctx, running))
    }
}

use super::{Decision, EnqueueFlags, Scheduler, SimCtx, TaskId};
use crate::{
    config::SchedConfig,
    core::{DsqId, Rank},
    error::ConfigError,
};

#[derive(Debug)]
pub struct PriorityScheduler {
    queue: DsqId,
    preemptive: bool,
}

fn rank(ctx: &SimCtx, task: TaskId) -> Rank {
    let process = &ctx.task(task).process;
    Rank::new(u64::from(process.priority), process.arrival, process.id)
}

impl Scheduler for PriorityScheduler {
    fn init(ctx: &mut SimCtx, config: &SchedConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            queue: ctx.create_dsq_priq(),
            preemptive: config.preemptive,
        })
    }

    fn name(&self) -> &'static str {
        if self.preemptive {
            "priority (preemptive)"
        } else {
            "priority"
        }
    }

    fn enqueue(&mut self, ctx: &mut SimCtx, task: TaskId, _flags: EnqueueFlags) {
        let rank = rank(ctx, task);
        ctx.dsq_push_priq(self.queue, task, rank);
    }

    fn dispatch(&mut self, ctx: &mut SimCtx) -> Option<Decision> {
        ctx.dsq_pop(self.queue).map(Decision::run_to_completion)
    }

    fn should_preempt(&mut self, ctx: &SimCtx, running: TaskId) -> bool {
        self.preemptive
            && ctx
                .dsq_peek_rank(self.queue)
                .is_some_and(|best| best.0[0] < u64::from(ctx.task(running).process.priority))
    }
}

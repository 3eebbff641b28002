use rustc_hash::FxHashMap;
use tracing::trace;

use super::{ENQ_ARRIVAL, ENQ_SLICE_EXPIRED, Decision, EnqueueFlags, Scheduler, SimCtx, TaskId};
use crate::{
    config::SchedConfig,
    core::{DsqId, Ticks},
    error::ConfigError,
};

/// Multi-level feedback queue. Level 0 is served first; level `n` runs for
/// `quantum * 2^n` ticks. A task that uses up its slice drops one level.
#[derive(Debug)]
pub struct MlqScheduler {
    levels: Vec<DsqId>,
    quantum: Ticks,
    task_level: FxHashMap<TaskId, usize>,
}

impl MlqScheduler {
    pub fn level_of(&self, task: TaskId) -> Option<usize> {
        self.task_level.get(&task).copied()
    }

    pub fn slice_for(&self, level: usize) -> Ticks {
        let scale = u32::try_from(level)
            .ok()
            .and_then(|shift| 1u64.checked_shl(shift))
            .unwrap_or(Ticks::MAX);
        self.quantum.saturating_mul(scale)
    }

    fn lowest(&self) -> usize {
        self.levels.len() - 1
    }

    fn highest_ready_level(&self, ctx: &SimCtx) -> Option<usize> {
        self.levels.iter().position(|&dsq| !ctx.dsq_is_empty(dsq))
    }
}

impl Scheduler for MlqScheduler {
    fn init(ctx: &mut SimCtx, config: &SchedConfig) -> Result<Self, ConfigError> {
        let quantum = config.require_quantum()?;
        if config.levels == 0 {
            return Err(ConfigError::NoLevels);
        }

        Ok(Self {
            levels: (0..config.levels).map(|_| ctx.create_dsq_fifo()).collect(),
            quantum,
            task_level: FxHashMap::default(),
        })
    }

    fn name(&self) -> &'static str {
        "mlq"
    }

    fn enqueue(&mut self, ctx: &mut SimCtx, task: TaskId, flags: EnqueueFlags) {
        let lowest = self.lowest();
        let level = if flags & ENQ_ARRIVAL != 0 {
            (ctx.task(task).process.priority as usize).min(lowest)
        } else {
            let current = self.level_of(task).unwrap_or(0);
            if flags & ENQ_SLICE_EXPIRED != 0 {
                (current + 1).min(lowest)
            } else {
                current
            }
        };

        if self.task_level.insert(task, level) != Some(level) && flags & ENQ_ARRIVAL == 0 {
            trace!(task = task, level = level, "mlq demotion");
        }
        ctx.dsq_push_fifo(self.levels[level], task);
    }

    fn dispatch(&mut self, ctx: &mut SimCtx) -> Option<Decision> {
        let level = self.highest_ready_level(ctx)?;
        let task = ctx.dsq_pop(self.levels[level])?;
        Some(Decision::slice(task, self.slice_for(level)))
    }

    fn should_preempt(&mut self, ctx: &SimCtx, running: TaskId) -> bool {
        let running_level = self.level_of(running).unwrap_or(0);
        self.highest_ready_level(ctx)
            .is_some_and(|level| level < running_level)
    }
}

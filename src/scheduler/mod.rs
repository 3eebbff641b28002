pub mod edf;
pub mod fcfs;
pub mod mlq;
pub mod priority;
pub mod rr;
pub mod sjf;

use crate::{
    config::{PolicyKind, SchedConfig},
    core::{
        Ticks,
        state::{SimCtx, TaskId},
    },
    error::ConfigError,
};
pub use edf::EdfScheduler;
pub use fcfs::FcfsScheduler;
pub use mlq::MlqScheduler;
pub use priority::PriorityScheduler;
pub use rr::RoundRobinScheduler;
pub use sjf::SjfScheduler;

pub type EnqueueFlags = u64;

pub const ENQ_ARRIVAL: EnqueueFlags = 1 << 0;
pub const ENQ_PREEMPT: EnqueueFlags = 1 << 1;
pub const ENQ_SLICE_EXPIRED: EnqueueFlags = 1 << 2;

/// Slice of a dispatch that runs until completion or policy preemption.
pub const SLICE_INF: Ticks = Ticks::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub task: TaskId,
    pub slice: Ticks,
}

impl Decision {
    pub fn run_to_completion(task: TaskId) -> Self {
        Self {
            task,
            slice: SLICE_INF,
        }
    }

    pub fn slice(task: TaskId, slice: Ticks) -> Self {
        Self { task, slice }
    }
}

pub trait Scheduler {
    fn init(ctx: &mut SimCtx, config: &SchedConfig) -> Result<Self, ConfigError>
    where
        Self: Sized;

    fn name(&self) -> &'static str;

    /// `task` became ready: it just arrived or was taken off the CPU.
    fn enqueue(&mut self, ctx: &mut SimCtx, task: TaskId, flags: EnqueueFlags);

    /// Pick the next task to run, or None to leave the CPU idle.
    fn dispatch(&mut self, ctx: &mut SimCtx) -> Option<Decision>;

    /// Asked every tick while `running` holds the CPU.
    fn should_preempt(&mut self, _ctx: &SimCtx, _running: TaskId) -> bool {
        false
    }
}

/// The closed set of policies behind one `Scheduler`, selected at runtime.
#[derive(Debug)]
pub enum AnyScheduler {
    Fcfs(FcfsScheduler),
    Sjf(SjfScheduler),
    Priority(PriorityScheduler),
    Rr(RoundRobinScheduler),
    Mlq(MlqScheduler),
    Edf(EdfScheduler),
}

macro_rules! delegate {
    ($self:ident, $s:ident => $body:expr) => {
        match $self {
            AnyScheduler::Fcfs($s) => $body,
            AnyScheduler::Sjf($s) => $body,
            AnyScheduler::Priority($s) => $body,
            AnyScheduler::Rr($s) => $body,
            AnyScheduler::Mlq($s) => $body,
            AnyScheduler::Edf($s) => $body,
        }
    };
}

impl Scheduler for AnyScheduler {
    fn init(ctx: &mut SimCtx, config: &SchedConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(match config.policy {
            PolicyKind::Fcfs => Self::Fcfs(FcfsScheduler::init(ctx, config)?),
            PolicyKind::Sjf => Self::Sjf(SjfScheduler::init(ctx, config)?),
            PolicyKind::Priority => Self::Priority(PriorityScheduler::init(ctx, config)?),
            PolicyKind::Rr => Self::Rr(RoundRobinScheduler::init(ctx, config)?),
            PolicyKind::Mlq => Self::Mlq(MlqScheduler::init(ctx, config)?),
            PolicyKind::Edf => Self::Edf(EdfScheduler::init(ctx, config)?),
        })
    }

    fn name(&self) -> &'static str {
        delegate!(self, s => s.name())
    }

    fn enqueue(&mut self, ctx: &mut SimCtx, task: TaskId, flags: EnqueueFlags) {
        delegate!(self, s => s.enqueue(ctx, task, flags))
    }

    fn dispatch(&mut self, ctx: &mut SimCtx) -> Option<Decision> {
        delegate!(self, s => s.dispatch(ctx))
    }

    fn should_preempt(&mut self, ctx: &SimCtx, running: TaskId) -> bool {
        delegate!(self, s => s.should_preempt(ctx, running))
    }
}

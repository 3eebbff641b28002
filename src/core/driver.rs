use tracing::{debug, trace};

use super::{
    event::{PreemptReason, SimEvent, TimedEvent},
    observer::Observer,
    state::{SimCtx, TaskId, TaskState, Ticks},
};
use crate::{
    config::SchedConfig,
    error::ConfigError,
    scheduler::{ENQ_ARRIVAL, ENQ_PREEMPT, ENQ_SLICE_EXPIRED, SLICE_INF, Scheduler},
};

/// The single simulated CPU and its clock.
pub struct SchedCore<S: Scheduler> {
    pub ctx: SimCtx,
    pub scheduler: S,
    observer: Observer,
    idle_ticks: Ticks,
    context_switches: u64,
}

impl<S: Scheduler> SchedCore<S> {
    pub fn new(config: &SchedConfig) -> Result<Self, ConfigError> {
        let mut ctx = SimCtx::new();
        let scheduler = S::init(&mut ctx, config)?;
        Ok(Self {
            ctx,
            scheduler,
            observer: Observer::new(),
            idle_ticks: 0,
            context_switches: 0,
        })
    }

    /// NotArrived -> Ready, handing the task to the policy.
    pub fn wake_task(&mut self, task: TaskId, events: &mut Vec<TimedEvent>) {
        debug_assert_eq!(self.ctx.task(task).state, TaskState::NotArrived);
        self.ctx.mark_ready(task);
        self.scheduler.enqueue(&mut self.ctx, task, ENQ_ARRIVAL);
        self.emit(
            events,
            SimEvent::Arrived {
                pid: self.ctx.task(task).process.id,
            },
        );
    }

    /// Advance the clock by one tick, or, when nothing is ready, straight to
    /// `next_arrival`.
    pub fn tick(&mut self, events: &mut Vec<TimedEvent>, next_arrival: Option<Ticks>) {
        self.check_current(events);

        if self.ctx.cpu_is_idle() {
            self.try_schedule_cpu(events);
        }

        self.check_deadlines(events);

        match self.ctx.current {
            Some(task) => self.run_current(task, events),
            None => self.idle(events, next_arrival),
        }

        self.observer.observe(&self.ctx);
    }

    // Take the running task off the CPU if its slice ran out or the policy
    // wants the CPU for someone else.
    fn check_current(&mut self, events: &mut Vec<TimedEvent>) {
        let Some(task) = self.ctx.current else {
            return;
        };

        let (reason, flags) = if self.ctx.task(task).slice_expired() {
            (PreemptReason::SliceExpired, ENQ_SLICE_EXPIRED)
        } else if self.scheduler.should_preempt(&self.ctx, task) {
            (PreemptReason::Preempted, ENQ_PREEMPT)
        } else {
            return;
        };

        let pid = self.ctx.task(task).process.id;
        debug!(now = self.ctx.now, pid, ?reason, "preempt");

        self.ctx.clear_cpu();
        self.ctx.mark_ready(task);
        self.scheduler.enqueue(&mut self.ctx, task, flags);
        self.emit(events, SimEvent::Preempted { pid, reason });
    }

    fn try_schedule_cpu(&mut self, events: &mut Vec<TimedEvent>) {
        let Some(decision) = self.scheduler.dispatch(&mut self.ctx) else {
            return;
        };
        debug_assert!(decision.slice > 0, "Dispatch with an empty slice");

        if self.ctx.set_running(decision.task, decision.slice) {
            self.context_switches += 1;
        }

        let pid = self.ctx.task(decision.task).process.id;
        let slice = (decision.slice != SLICE_INF).then_some(decision.slice);
        debug!(now = self.ctx.now, pid, ?slice, "dispatch");
        self.emit(events, SimEvent::Dispatched { pid, slice });
    }

    // Flag, once, every queued or running task that can no longer finish by
    // its deadline even with the CPU to itself.
    fn check_deadlines(&mut self, events: &mut Vec<TimedEvent>) {
        let now = self.ctx.now;
        for task in &mut self.ctx.tasks {
            if task.missed_deadline
                || !matches!(task.state, TaskState::Ready | TaskState::Running)
            {
                continue;
            }
            let Some(deadline) = task.process.deadline else {
                continue;
            };

            if now.saturating_add(task.remaining) > deadline {
                task.missed_deadline = true;
                debug!(now, pid = task.process.id, deadline, "deadline miss");
                events.push(TimedEvent {
                    at: now,
                    event: SimEvent::DeadlineMiss {
                        pid: task.process.id,
                        deadline,
                        remaining: task.remaining,
                    },
                });
            }
        }
    }

    fn run_current(&mut self, task_id: TaskId, events: &mut Vec<TimedEvent>) {
        let task = self.ctx.task_mut(task_id);
        debug_assert!(task.remaining > 0, "Running task {task_id} has no work left");
        task.remaining -= 1;
        task.consumed_slice += 1;
        let completed = task.remaining == 0;

        trace!(now = self.ctx.now, task = task_id, "run");
        self.ctx.advance_time(1);

        if completed {
            let now = self.ctx.now;
            let pid = self.ctx.task(task_id).process.id;
            self.ctx.clear_cpu();
            self.ctx.mark_completed(task_id, now);
            debug!(now, pid, "complete");
            self.emit(events, SimEvent::Completed { pid });
        }
    }

    fn idle(&mut self, events: &mut Vec<TimedEvent>, next_arrival: Option<Ticks>) {
        let now = self.ctx.now;
        // A policy may hold back queued work; only an empty system can skip ahead
        let ticks = match next_arrival {
            Some(at) if at > now && self.ctx.task_to_dsq.is_empty() => at - now,
            _ => 1,
        };

        trace!(now, ticks, "cpu idle");
        self.emit(events, SimEvent::CpuIdle { ticks });
        self.idle_ticks += ticks;
        self.ctx.advance_time(ticks);
    }

    fn emit(&self, events: &mut Vec<TimedEvent>, event: SimEvent) {
        events.push(TimedEvent {
            at: self.ctx.now,
            event,
        });
    }

    pub fn now(&self) -> Ticks {
        self.ctx.now
    }

    pub fn idle_ticks(&self) -> Ticks {
        self.idle_ticks
    }

    pub fn context_switches(&self) -> u64 {
        self.context_switches
    }

    pub fn observer(&self) -> &Observer {
        &self.observer
    }
}

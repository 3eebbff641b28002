use tracing::{info, instrument};

use super::workload::{Process, Workload};
use crate::{
    config::SchedConfig,
    core::{
        driver::SchedCore,
        event::TimedEvent,
        state::{Task, Ticks},
    },
    error::{ConfigError, Result},
    scheduler::{AnyScheduler, Scheduler},
};

pub struct Sim<S: Scheduler> {
    pub core: SchedCore<S>,
    // Task indices sorted by (arrival, id); admitted front to back
    arrival_order: Vec<usize>,
    arrival_cursor: usize,
    trace: Vec<TimedEvent>,
}

/// Everything a finished run leaves behind.
#[derive(Debug, Clone)]
pub struct SimOutcome {
    pub policy: &'static str,
    pub tasks: Vec<Task>,
    pub total_time: Ticks,
    pub idle_ticks: Ticks,
    pub context_switches: u64,
    pub trace: Vec<TimedEvent>,
}

impl<S: Scheduler> Sim<S> {
    pub fn new(workload: &Workload, config: &SchedConfig) -> Result<Self, ConfigError> {
        let mut core = SchedCore::<S>::new(config)?;
        for process in workload.processes() {
            core.ctx.create_task(process.clone());
        }

        let mut arrival_order: Vec<usize> = (0..core.ctx.tasks.len()).collect();
        arrival_order.sort_by_key(|&task| {
            let process: &Process = &core.ctx.task(task).process;
            (process.arrival, process.id)
        });

        Ok(Self {
            core,
            arrival_order,
            arrival_cursor: 0,
            trace: Vec::new(),
        })
    }

    /// Run one tick (or one idle gap) and return the events it produced.
    pub fn step(&mut self) -> Vec<TimedEvent> {
        let mut events = Vec::new();
        self.handle_arrivals(&mut events);
        let next_arrival = self
            .arrival_order
            .get(self.arrival_cursor)
            .map(|&task| self.core.ctx.task(task).process.arrival);
        self.core.tick(&mut events, next_arrival);
        self.trace.extend(events.iter().cloned());
        events
    }

    fn handle_arrivals(&mut self, events: &mut Vec<TimedEvent>) {
        let now = self.core.now();
        while let Some(&task) = self.arrival_order.get(self.arrival_cursor) {
            // Contiguous, since arrival_order is sorted
            if self.core.ctx.task(task).process.arrival > now {
                break;
            }
            self.core.wake_task(task, events);
            self.arrival_cursor += 1;
        }
    }

    pub fn all_tasks_completed(&self) -> bool {
        self.core.ctx.all_completed()
    }

    pub fn trace(&self) -> &[TimedEvent] {
        &self.trace
    }

    /// Step until every process has completed.
    #[instrument(level = "debug", skip_all)]
    pub fn run(mut self) -> SimOutcome {
        while !self.all_tasks_completed() {
            self.step();
        }

        let outcome = SimOutcome {
            policy: self.core.scheduler.name(),
            total_time: self.core.now(),
            idle_ticks: self.core.idle_ticks(),
            context_switches: self.core.context_switches(),
            tasks: self.core.ctx.tasks,
            trace: self.trace,
        };
        info!(
            policy = outcome.policy,
            processes = outcome.tasks.len(),
            total_time = outcome.total_time,
            idle = outcome.idle_ticks,
            "simulation complete"
        );
        outcome
    }
}

/// Run `config.policy` over a private copy of `workload`.
pub fn simulate(workload: &Workload, config: &SchedConfig) -> Result<SimOutcome> {
    Ok(Sim::<AnyScheduler>::new(workload, config)?.run())
}

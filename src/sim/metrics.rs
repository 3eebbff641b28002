use average::{Estimate, Mean};
use serde::Serialize;

use super::{driver::SimOutcome, workload::Pid};
use crate::core::{Ticks, state::Task};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessRecord {
    pub id: Pid,
    pub task: usize,
    pub instance: u32,
    pub arrival: Ticks,
    pub burst: Ticks,
    pub priority: u32,
    pub deadline: Option<Ticks>,
    pub start: Ticks,
    pub completion: Ticks,
    pub turnaround: Ticks,
    pub waiting: Ticks,
    pub response: Ticks,
    pub missed_deadline: bool,
}

impl ProcessRecord {
    /// None until the task has completed. All derived times come from the
    /// recorded completion instant, never from the remaining-time counter.
    pub fn from_task(task: &Task) -> Option<Self> {
        let completion = task.completion_time?;
        let start = task.first_run?;
        let process = &task.process;

        debug_assert!(completion >= process.arrival + process.burst);
        let turnaround = completion.saturating_sub(process.arrival);
        let waiting = turnaround.saturating_sub(process.burst);

        Some(Self {
            id: process.id,
            task: process.task,
            instance: process.instance,
            arrival: process.arrival,
            burst: process.burst,
            priority: process.priority,
            deadline: process.deadline,
            start,
            completion,
            turnaround,
            waiting,
            response: start.saturating_sub(process.arrival),
            missed_deadline: task.missed_deadline,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub processes: usize,
    pub avg_waiting: f64,
    pub avg_turnaround: f64,
    pub avg_response: f64,
    pub total_time: Ticks,
    pub idle_time: Ticks,
    pub utilization: f64,
    pub throughput: f64,
    pub context_switches: u64,
    pub deadline_misses: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub policy: String,
    pub records: Vec<ProcessRecord>,
    pub summary: Summary,
}

impl Metrics {
    pub fn from_outcome(outcome: &SimOutcome) -> Self {
        let mut records: Vec<ProcessRecord> =
            outcome.tasks.iter().filter_map(ProcessRecord::from_task).collect();
        debug_assert_eq!(records.len(), outcome.tasks.len(), "Run ended with unfinished tasks");
        records.sort_by_key(|r| r.id);

        let total_time = outcome.total_time;
        let busy = total_time.saturating_sub(outcome.idle_ticks);
        let (utilization, throughput) = if total_time == 0 {
            (0.0, 0.0)
        } else {
            (
                busy as f64 / total_time as f64,
                records.len() as f64 / total_time as f64,
            )
        };

        let summary = Summary {
            processes: records.len(),
            avg_waiting: avg(records.iter().map(|r| r.waiting as f64)),
            avg_turnaround: avg(records.iter().map(|r| r.turnaround as f64)),
            avg_response: avg(records.iter().map(|r| r.response as f64)),
            total_time,
            idle_time: outcome.idle_ticks,
            utilization,
            throughput,
            context_switches: outcome.context_switches,
            deadline_misses: records.iter().filter(|r| r.missed_deadline).count(),
        };

        Self {
            policy: outcome.policy.to_string(),
            records,
            summary,
        }
    }

    pub fn record(&self, id: Pid) -> Option<&ProcessRecord> {
        self.records.iter().find(|r| r.id == id)
    }
}

fn avg(iter: impl Iterator<Item = f64>) -> f64 {
    iter.collect::<Mean>().estimate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{PolicyKind, SchedConfig},
        sim::{Process, Workload, driver::simulate},
    };

    fn outcome(processes: Vec<Process>, policy: PolicyKind) -> SimOutcome {
        let workload = Workload::from_processes(processes).unwrap();
        simulate(&workload, &SchedConfig::new(policy).with_quantum(2)).unwrap()
    }

    #[test]
    fn idle_gap_lowers_utilization() {
        let out = outcome(
            vec![Process::new(1, 0, 2), Process::new(2, 5, 3)],
            PolicyKind::Fcfs,
        );
        let metrics = Metrics::from_outcome(&out);

        assert_eq!(metrics.summary.total_time, 8);
        assert_eq!(metrics.summary.idle_time, 3);
        assert!((metrics.summary.utilization - 5.0 / 8.0).abs() < 1e-9);
        assert!((metrics.summary.throughput - 2.0 / 8.0).abs() < 1e-9);
        assert_eq!(metrics.summary.avg_waiting, 0.0);
    }

    #[test]
    fn response_is_first_dispatch_minus_arrival() {
        let out = outcome(
            vec![Process::new(1, 0, 4), Process::new(2, 0, 4)],
            PolicyKind::Rr,
        );
        let metrics = Metrics::from_outcome(&out);

        assert_eq!(metrics.record(1).map(|r| r.response), Some(0));
        assert_eq!(metrics.record(2).map(|r| r.response), Some(2));
        assert_eq!(metrics.summary.context_switches, 3);
    }

    #[test]
    fn metrics_do_not_touch_the_outcome() {
        let out = outcome(vec![Process::new(1, 0, 3)], PolicyKind::Sjf);
        let before = out.tasks.clone();
        let a = Metrics::from_outcome(&out);
        let b = Metrics::from_outcome(&out);
        assert_eq!(a, b);
        assert_eq!(out.tasks.len(), before.len());
        assert_eq!(out.tasks[0].completion_time, before[0].completion_time);
    }
}

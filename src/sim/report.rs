use serde::Serialize;
use std::fmt;

use super::{metrics::Metrics, workload::Pid};
use crate::core::{
    Ticks,
    event::{SimEvent, TimedEvent},
};

/// Serializable form of one run for `--json`.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport<'a> {
    #[serde(flatten)]
    pub metrics: &'a Metrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gantt: Option<Vec<Segment>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<&'a [TimedEvent]>,
}

/// Per-process table, in the column layout of the classic worked examples.
pub struct ProcessTable<'a>(pub &'a Metrics);

impl fmt::Display for ProcessTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<9}{:<9}{:<7}{:<9}Turnaround",
            "Process", "Arrival", "Burst", "Waiting"
        )?;
        for r in &self.0.records {
            writeln!(
                f,
                "{:<9}{:<9}{:<7}{:<9}{}",
                r.id, r.arrival, r.burst, r.waiting, r.turnaround
            )?;
        }
        Ok(())
    }
}

pub struct SummaryView<'a>(pub &'a Metrics);

impl fmt::Display for SummaryView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.0.summary;
        writeln!(f, "Average Waiting Time: {:.2}", s.avg_waiting)?;
        writeln!(f, "Average Turnaround Time: {:.2}", s.avg_turnaround)?;
        writeln!(f, "CPU Utilization: {:.2}%", s.utilization * 100.0)?;
        writeln!(f, "Throughput: {:.4} processes/unit time", s.throughput)?;

        if self.0.records.iter().any(|r| r.deadline.is_some()) {
            let missed: Vec<String> = self
                .0
                .records
                .iter()
                .filter(|r| r.missed_deadline)
                .map(|r| format!("P{}", r.id))
                .collect();
            if missed.is_empty() {
                writeln!(f, "Deadline Misses: 0")?;
            } else {
                writeln!(f, "Deadline Misses: {} ({})", missed.len(), missed.join(", "))?;
            }
        }
        Ok(())
    }
}

/// Side-by-side summary of several runs over the same workload.
pub struct Comparison<'a>(pub &'a [Metrics]);

impl fmt::Display for Comparison<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<23}{:>12}{:>16}{:>13}{:>12}{:>10}{:>8}",
            "Policy", "Avg Waiting", "Avg Turnaround", "Utilization", "Throughput", "Switches", "Misses"
        )?;
        for m in self.0 {
            let s = &m.summary;
            writeln!(
                f,
                "{:<23}{:>12.2}{:>16.2}{:>12.2}%{:>12.4}{:>10}{:>8}",
                m.policy,
                s.avg_waiting,
                s.avg_turnaround,
                s.utilization * 100.0,
                s.throughput,
                s.context_switches,
                s.deadline_misses
            )?;
        }
        Ok(())
    }
}

/// Contiguous stretch of CPU time; `pid` is None while idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub pid: Option<Pid>,
    pub start: Ticks,
    pub end: Ticks,
}

pub fn gantt_segments(trace: &[TimedEvent]) -> Vec<Segment> {
    let mut segments: Vec<Segment> = Vec::new();
    let mut open: Option<(Pid, Ticks)> = None;

    let push = |segments: &mut Vec<Segment>, seg: Segment| {
        match segments.last_mut() {
            Some(last) if last.pid == seg.pid && last.end == seg.start => last.end = seg.end,
            _ => segments.push(seg),
        }
    };

    for TimedEvent { at, event } in trace {
        match *event {
            SimEvent::Dispatched { pid, .. } => open = Some((pid, *at)),
            SimEvent::Preempted { pid, .. } | SimEvent::Completed { pid } => {
                if let Some((running, start)) = open.take() {
                    debug_assert_eq!(running, pid, "Trace closes a segment it never opened");
                    push(&mut segments, Segment { pid: Some(pid), start, end: *at });
                }
            }
            SimEvent::CpuIdle { ticks } => push(
                &mut segments,
                Segment {
                    pid: None,
                    start: *at,
                    end: at + ticks,
                },
            ),
            SimEvent::Arrived { .. } | SimEvent::DeadlineMiss { .. } => {}
        }
    }

    segments
}

pub struct Gantt<'a>(pub &'a [Segment]);

impl fmt::Display for Gantt<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<String> = self
            .0
            .iter()
            .map(|seg| seg.pid.map_or_else(|| "idle".to_string(), |pid| format!("P{pid}")))
            .collect();

        let mut bar = String::new();
        let mut axis = String::new();
        for (seg, label) in self.0.iter().zip(&labels) {
            let width = label.len().max(seg.start.to_string().len()) + 2;
            bar.push('|');
            bar.push_str(&format!("{label:^width$}"));
            axis.push_str(&format!("{:<w$}", seg.start, w = width + 1));
        }

        if let Some(last) = self.0.last() {
            bar.push('|');
            axis.push_str(&last.end.to_string());
        }

        writeln!(f, "{bar}")?;
        writeln!(f, "{axis}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event::PreemptReason;
    use pretty_assertions::assert_eq;

    fn at(at: Ticks, event: SimEvent) -> TimedEvent {
        TimedEvent { at, event }
    }

    #[test]
    fn segments_merge_redispatch_and_idle_runs() {
        let trace = vec![
            at(0, SimEvent::Arrived { pid: 1 }),
            at(0, SimEvent::Dispatched { pid: 1, slice: Some(2) }),
            at(2, SimEvent::Preempted { pid: 1, reason: PreemptReason::SliceExpired }),
            at(2, SimEvent::Dispatched { pid: 1, slice: Some(2) }),
            at(3, SimEvent::Completed { pid: 1 }),
            at(3, SimEvent::CpuIdle { ticks: 1 }),
            at(4, SimEvent::CpuIdle { ticks: 1 }),
            at(5, SimEvent::Arrived { pid: 2 }),
            at(5, SimEvent::Dispatched { pid: 2, slice: None }),
            at(6, SimEvent::Completed { pid: 2 }),
        ];

        assert_eq!(
            gantt_segments(&trace),
            vec![
                Segment { pid: Some(1), start: 0, end: 3 },
                Segment { pid: None, start: 3, end: 5 },
                Segment { pid: Some(2), start: 5, end: 6 },
            ]
        );
    }

    #[test]
    fn gantt_renders_boundaries() {
        let segments = [
            Segment { pid: Some(1), start: 0, end: 10 },
            Segment { pid: Some(2), start: 10, end: 15 },
        ];
        assert_eq!(
            Gantt(&segments).to_string(),
            "| P1 | P2 |\n0    10   15\n"
        );
    }
}

use serde::Serialize;

use crate::{core::Ticks, sim::Pid};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PreemptReason {
    // Slice used up with work left
    SliceExpired,
    // Policy asked for the CPU back
    Preempted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SimEvent {
    Arrived {
        pid: Pid,
    },
    Dispatched {
        pid: Pid,
        // None when the task may run to completion
        slice: Option<Ticks>,
    },
    Preempted {
        pid: Pid,
        reason: PreemptReason,
    },
    Completed {
        pid: Pid,
    },
    DeadlineMiss {
        pid: Pid,
        deadline: Ticks,
        remaining: Ticks,
    },
    // Nothing ready from `at` for `ticks` ticks
    CpuIdle {
        ticks: Ticks,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimedEvent {
    pub at: Ticks,
    #[serde(flatten)]
    pub event: SimEvent,
}

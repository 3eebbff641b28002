use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::{ops::RangeInclusive, str::FromStr};

use crate::{core::Ticks, error::WorkloadError};

pub type Pid = u64;

/// One schedulable unit of work. Immutable once built; the executor keeps
/// remaining time and completion in its own task records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
    pub id: Pid,
    pub arrival: Ticks,
    pub burst: Ticks,
    pub priority: u32,
    /// Absolute deadline of this release.
    pub deadline: Option<Ticks>,
    pub period: Option<Ticks>,
    /// 1-based index of the input entry that produced this process.
    pub task: usize,
    /// Release number for periodic tasks, 0 otherwise.
    pub instance: u32,
}

impl Process {
    pub fn new(id: Pid, arrival: Ticks, burst: Ticks) -> Self {
        Self {
            id,
            arrival,
            burst,
            priority: 0,
            deadline: None,
            period: None,
            task: id as usize,
            instance: 0,
        }
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_deadline(mut self, deadline: Ticks) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Raw, unvalidated process tuple as a user writes it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSpec {
    pub arrival: i64,
    pub burst: i64,
    pub priority: Option<i64>,
    pub period: Option<i64>,
    /// Relative to each release. Defaults to the period for periodic tasks.
    pub deadline: Option<i64>,
}

impl ProcessSpec {
    pub fn new(arrival: i64, burst: i64) -> Self {
        Self {
            arrival,
            burst,
            ..Self::default()
        }
    }

    pub fn priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn period(mut self, period: i64) -> Self {
        self.period = Some(period);
        self
    }

    pub fn deadline(mut self, deadline: i64) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// `ARRIVAL:BURST[:PRIORITY][:key=value...]` with keys `priority` (or `prio`),
/// `period` and `deadline`.
impl FromStr for ProcessSpec {
    type Err = WorkloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = |reason: &str| WorkloadError::Malformed {
            input: s.to_string(),
            reason: reason.to_string(),
        };
        let number = |field: &str, value: &str| {
            value
                .trim()
                .parse::<i64>()
                .map_err(|_| malformed(&format!("{field} `{value}` is not an integer")))
        };

        let mut parts = s.split(':');
        let arrival = number("arrival", parts.next().unwrap_or_default())?;
        let burst = number(
            "burst",
            parts.next().ok_or_else(|| malformed("missing burst time"))?,
        )?;
        let mut spec = ProcessSpec::new(arrival, burst);

        for part in parts {
            match part.split_once('=') {
                None => spec.priority = Some(number("priority", part)?),
                Some((key, value)) => match key.trim() {
                    "priority" | "prio" => spec.priority = Some(number(key, value)?),
                    "period" => spec.period = Some(number(key, value)?),
                    "deadline" => spec.deadline = Some(number(key, value)?),
                    other => return Err(malformed(&format!("unknown field `{other}`"))),
                },
            }
        }

        Ok(spec)
    }
}

/// Uniform random workload parameters. All ranges are inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomWorkload {
    pub arrival: RangeInclusive<Ticks>,
    pub burst: RangeInclusive<Ticks>,
    pub priority: Option<RangeInclusive<u32>>,
    pub seed: u64,
}

impl Default for RandomWorkload {
    fn default() -> Self {
        Self {
            arrival: 0..=10,
            burst: 1..=10,
            priority: None,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workload {
    processes: Vec<Process>,
}

impl Workload {
    /// Validate `specs` and assign ids `1..`. Periodic entries are expanded
    /// into one process per release before `horizon`.
    pub fn from_specs(specs: &[ProcessSpec], horizon: Option<Ticks>) -> Result<Self, WorkloadError> {
        if specs.is_empty() {
            return Err(WorkloadError::Empty);
        }

        let validated = specs
            .iter()
            .enumerate()
            .map(|(i, spec)| validate(i + 1, spec))
            .collect::<Result<Vec<_>, _>>()?;

        let horizon = horizon.or_else(|| default_horizon(&validated));
        let mut processes = Vec::with_capacity(validated.len());

        for entry in validated {
            match entry.period {
                None => {
                    let id = processes.len() as Pid + 1;
                    processes.push(Process {
                        id,
                        arrival: entry.arrival,
                        burst: entry.burst,
                        priority: entry.priority,
                        deadline: entry.deadline.map(|d| entry.arrival.saturating_add(d)),
                        period: None,
                        task: entry.index,
                        instance: 0,
                    });
                }
                Some(period) => {
                    // default_horizon always yields a value when a period exists
                    let horizon = horizon.unwrap_or(entry.arrival.saturating_add(period));
                    if horizon <= entry.arrival {
                        return Err(WorkloadError::HorizonTooShort {
                            index: entry.index,
                            horizon,
                        });
                    }
                    let relative = entry.deadline.unwrap_or(period);
                    let mut release = entry.arrival;
                    let mut instance = 0;
                    while release < horizon {
                        let id = processes.len() as Pid + 1;
                        processes.push(Process {
                            id,
                            arrival: release,
                            burst: entry.burst,
                            priority: entry.priority,
                            deadline: Some(release.saturating_add(relative)),
                            period: Some(period),
                            task: entry.index,
                            instance,
                        });
                        instance += 1;
                        release = release.saturating_add(period);
                    }
                }
            }
        }

        Ok(Self { processes })
    }

    /// `count` processes with uniformly drawn timings, deterministic in `params.seed`.
    pub fn random(count: usize, params: &RandomWorkload) -> Result<Self, WorkloadError> {
        if count == 0 {
            return Err(WorkloadError::Empty);
        }
        check_range("arrival", &params.arrival, 0)?;
        check_range("burst", &params.burst, 1)?;
        if let Some(priority) = &params.priority {
            let widened = u64::from(*priority.start())..=u64::from(*priority.end());
            check_range("priority", &widened, 0)?;
        }

        let mut rng = StdRng::seed_from_u64(params.seed);
        let processes = (1..=count as Pid)
            .map(|id| {
                let arrival = rng.random_range(params.arrival.clone());
                let burst = rng.random_range(params.burst.clone());
                let priority = params
                    .priority
                    .clone()
                    .map_or(0, |range| rng.random_range(range));
                Process::new(id, arrival, burst).with_priority(priority)
            })
            .collect();

        Ok(Self { processes })
    }

    /// Wrap already-built processes, checking the invariants `from_specs`
    /// would have enforced.
    pub fn from_processes(processes: Vec<Process>) -> Result<Self, WorkloadError> {
        if processes.is_empty() {
            return Err(WorkloadError::Empty);
        }
        for (i, process) in processes.iter().enumerate() {
            if process.burst == 0 {
                return Err(WorkloadError::NonPositiveBurst { index: i + 1, value: 0 });
            }
        }
        let mut ids: Vec<Pid> = processes.iter().map(|p| p.id).collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.len() != processes.len() {
            return Err(WorkloadError::Malformed {
                input: format!("{} processes", processes.len()),
                reason: "process ids must be unique".to_string(),
            });
        }

        Ok(Self { processes })
    }

    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    pub fn total_burst(&self) -> Ticks {
        self.processes.iter().map(|p| p.burst).sum()
    }
}

struct Validated {
    index: usize,
    arrival: Ticks,
    burst: Ticks,
    priority: u32,
    period: Option<Ticks>,
    deadline: Option<Ticks>,
}

fn validate(index: usize, spec: &ProcessSpec) -> Result<Validated, WorkloadError> {
    let arrival = u64::try_from(spec.arrival).map_err(|_| WorkloadError::NegativeArrival {
        index,
        value: spec.arrival,
    })?;
    let burst = positive(spec.burst)
        .ok_or(WorkloadError::NonPositiveBurst { index, value: spec.burst })?;
    let priority = match spec.priority {
        None => 0,
        Some(value) => u32::try_from(value)
            .map_err(|_| WorkloadError::NegativePriority { index, value })?,
    };
    let period = spec
        .period
        .map(|value| positive(value).ok_or(WorkloadError::NonPositivePeriod { index, value }))
        .transpose()?;
    let deadline = spec
        .deadline
        .map(|value| positive(value).ok_or(WorkloadError::NonPositiveDeadline { index, value }))
        .transpose()?;

    Ok(Validated {
        index,
        arrival,
        burst,
        priority,
        period,
        deadline,
    })
}

fn positive(value: i64) -> Option<Ticks> {
    u64::try_from(value).ok().filter(|v| *v > 0)
}

fn check_range(
    field: &'static str,
    range: &RangeInclusive<Ticks>,
    min_start: Ticks,
) -> Result<(), WorkloadError> {
    if range.start() > range.end() || *range.start() < min_start {
        return Err(WorkloadError::InvalidRange {
            field,
            min: *range.start(),
            max: *range.end(),
        });
    }
    Ok(())
}

// Hyperperiod of all periodic entries, counted from the latest first release.
fn default_horizon(entries: &[Validated]) -> Option<Ticks> {
    let hyperperiod = entries
        .iter()
        .filter_map(|e| e.period)
        .reduce(lcm)?;
    let offset = entries
        .iter()
        .filter(|e| e.period.is_some())
        .map(|e| e.arrival)
        .max()
        .unwrap_or(0);
    Some(offset.saturating_add(hyperperiod))
}

fn gcd(a: Ticks, b: Ticks) -> Ticks {
    if b == 0 { a } else { gcd(b, a % b) }
}

fn lcm(a: Ticks, b: Ticks) -> Ticks {
    (a / gcd(a, b)).saturating_mul(b)
}

use proptest::prelude::*;
use rustc_hash::FxHashMap;
use sched_model::{
    Metrics, PolicyKind, Process, ProcessSpec, SchedConfig, SimEvent, SimOutcome, Workload,
    core::TaskState, simulate,
};

const QUANTUM: u64 = 2;

fn workload() -> impl Strategy<Value = Workload> {
    prop::collection::vec((0u64..20, 1u64..8, 0u32..4), 1..8).prop_map(|entries| {
        let processes = entries
            .into_iter()
            .enumerate()
            .map(|(i, (arrival, burst, priority))| {
                Process::new(i as u64 + 1, arrival, burst).with_priority(priority)
            })
            .collect();
        Workload::from_processes(processes).unwrap()
    })
}

fn config(policy: PolicyKind) -> SchedConfig {
    SchedConfig::new(policy).with_quantum(QUANTUM)
}

fn run(workload: &Workload, policy: PolicyKind) -> SimOutcome {
    simulate(workload, &config(policy)).unwrap()
}

proptest! {
    #[test]
    fn every_process_completes_exactly_once(workload in workload()) {
        for policy in PolicyKind::ALL {
            let outcome = run(&workload, policy);

            let mut completions: FxHashMap<u64, usize> = FxHashMap::default();
            for event in &outcome.trace {
                if let SimEvent::Completed { pid } = event.event {
                    *completions.entry(pid).or_default() += 1;
                }
            }

            for task in &outcome.tasks {
                prop_assert_eq!(task.state, TaskState::Completed);
                prop_assert_eq!(task.remaining, 0);
                prop_assert_eq!(completions.get(&task.process.id), Some(&1));
            }

            let metrics = Metrics::from_outcome(&outcome);
            prop_assert_eq!(metrics.records.len(), workload.len());
            for r in &metrics.records {
                prop_assert_eq!(r.turnaround, r.completion - r.arrival);
                prop_assert_eq!(r.waiting, r.turnaround - r.burst);
                prop_assert!(r.completion >= r.arrival + r.burst);
                prop_assert!(r.start >= r.arrival);
            }

            let busy = outcome.total_time - outcome.idle_ticks;
            prop_assert_eq!(busy, workload.total_burst());
        }
    }

    #[test]
    fn fcfs_starts_in_arrival_order(workload in workload()) {
        let metrics = Metrics::from_outcome(&run(&workload, PolicyKind::Fcfs));
        for a in &metrics.records {
            for b in &metrics.records {
                if a.arrival < b.arrival {
                    prop_assert!(a.start <= b.start, "P{} arrived before P{}", a.id, b.id);
                }
            }
        }
    }

    #[test]
    fn round_robin_wait_is_bounded(workload in workload()) {
        let outcome = run(&workload, PolicyKind::Rr);
        let bound = (workload.len() as u64 - 1) * QUANTUM;

        let mut ready_since: FxHashMap<u64, u64> = FxHashMap::default();
        for event in &outcome.trace {
            match event.event {
                SimEvent::Arrived { pid } | SimEvent::Preempted { pid, .. } => {
                    ready_since.insert(pid, event.at);
                }
                SimEvent::Dispatched { pid, .. } => {
                    let since = ready_since.remove(&pid).unwrap_or(event.at);
                    prop_assert!(
                        event.at - since <= bound,
                        "P{} waited {} > {}", pid, event.at - since, bound
                    );
                }
                _ => {}
            }
        }
    }

    #[test]
    fn sjf_never_waits_longer_than_fcfs(workload in workload()) {
        let sjf = Metrics::from_outcome(&run(&workload, PolicyKind::Sjf));
        let fcfs = Metrics::from_outcome(&run(&workload, PolicyKind::Fcfs));
        prop_assert!(sjf.summary.avg_waiting <= fcfs.summary.avg_waiting + 1e-9);
    }

    #[test]
    fn reruns_are_identical(workload in workload()) {
        for policy in PolicyKind::ALL {
            let a = Metrics::from_outcome(&run(&workload, policy));
            let b = Metrics::from_outcome(&run(&workload, policy));
            prop_assert_eq!(a, b);
        }
    }

    #[test]
    fn edf_meets_deadlines_when_utilization_fits(
        tasks in prop::collection::vec(
            (prop::sample::select(vec![2u64, 3, 4, 6, 12]), 1u64..=12),
            1..4,
        )
    ) {
        // Every period divides 12, so utilization <= 1 iff sum(e * 12 / p) <= 12.
        // Keep tasks while they still fit.
        let mut demand = 0;
        let tasks: Vec<_> = tasks
            .into_iter()
            .map(|(p, e)| (p, e.min(p)))
            .filter(|&(p, e)| {
                let fits = demand + e * (12 / p) <= 12;
                if fits {
                    demand += e * (12 / p);
                }
                fits
            })
            .collect();

        let specs: Vec<_> = tasks
            .iter()
            .map(|&(p, e)| ProcessSpec::new(0, e as i64).period(p as i64))
            .collect();
        let workload = Workload::from_specs(&specs, None).unwrap();
        let metrics = Metrics::from_outcome(&run(&workload, PolicyKind::Edf));

        prop_assert_eq!(metrics.summary.deadline_misses, 0);
        for r in &metrics.records {
            prop_assert!(r.completion <= r.deadline.unwrap());
        }
    }
}

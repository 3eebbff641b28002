use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use std::thread;
use tracing::info;

use sched_model::{
    Metrics, PolicyKind, ProcessSpec, RandomWorkload, SchedConfig, SimOutcome, Workload,
    WorkloadError, config::DEFAULT_MLQ_LEVELS, core::Ticks, simulate,
    sim::report::{Comparison, Gantt, ProcessTable, RunReport, SummaryView, gantt_segments},
    telemetry::init_tracing,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PolicyArg {
    Fcfs,
    Sjf,
    Priority,
    Rr,
    Mlq,
    Edf,
    /// Run every policy on the same workload and compare them
    All,
}

impl PolicyArg {
    fn kinds(self) -> Vec<PolicyKind> {
        match self {
            PolicyArg::Fcfs => vec![PolicyKind::Fcfs],
            PolicyArg::Sjf => vec![PolicyKind::Sjf],
            PolicyArg::Priority => vec![PolicyKind::Priority],
            PolicyArg::Rr => vec![PolicyKind::Rr],
            PolicyArg::Mlq => vec![PolicyKind::Mlq],
            PolicyArg::Edf => vec![PolicyKind::Edf],
            PolicyArg::All => PolicyKind::ALL.to_vec(),
        }
    }
}

/// Discrete-event CPU scheduling simulator
#[derive(Parser, Debug)]
#[command(name = "sched_model", version)]
#[command(about = "Simulate FCFS, SJF, Priority, RR, MLQ and EDF scheduling", long_about = None)]
struct Args {
    #[arg(short = 'P', long, value_enum, ignore_case = true, default_value_t = PolicyArg::Fcfs)]
    policy: PolicyArg,

    /// Time quantum for rr, and the level-0 quantum for mlq
    #[arg(short, long)]
    quantum: Option<Ticks>,

    /// Let a higher-priority arrival preempt under `priority`
    #[arg(long, default_value_t = false)]
    preemptive: bool,

    /// Number of mlq levels
    #[arg(long, default_value_t = DEFAULT_MLQ_LEVELS)]
    levels: usize,

    /// Explicit process, ARRIVAL:BURST[:PRIORITY][:period=N][:deadline=N]; repeatable
    #[arg(short, long = "process", allow_hyphen_values = true)]
    processes: Vec<ProcessSpec>,

    /// Generate this many random processes instead of an explicit list
    #[arg(short = 'n', long, conflicts_with = "processes")]
    count: Option<usize>,

    /// Seed for the random workload
    #[arg(long, default_value_t = 0)]
    seed: u64,

    #[arg(long, default_value_t = 10)]
    arrival_max: Ticks,

    #[arg(long, default_value_t = 1)]
    burst_min: Ticks,

    #[arg(long, default_value_t = 10)]
    burst_max: Ticks,

    /// Draw random priorities from 0..=N
    #[arg(long)]
    priority_max: Option<u32>,

    /// Release periodic processes until this time (default: hyperperiod)
    #[arg(long)]
    horizon: Option<Ticks>,

    /// Print a Gantt chart of the run
    #[arg(long, default_value_t = false)]
    gantt: bool,

    /// Print the event trace
    #[arg(long, default_value_t = false)]
    trace: bool,

    /// Emit JSON instead of tables
    #[arg(long, default_value_t = false)]
    json: bool,
}

impl Args {
    fn workload(&self) -> Result<Workload, WorkloadError> {
        if !self.processes.is_empty() {
            return Workload::from_specs(&self.processes, self.horizon);
        }

        match self.count {
            Some(count) => Workload::random(
                count,
                &RandomWorkload {
                    arrival: 0..=self.arrival_max,
                    burst: self.burst_min..=self.burst_max,
                    priority: self.priority_max.map(|max| 0..=max),
                    seed: self.seed,
                },
            ),
            None => Err(WorkloadError::Empty),
        }
    }

    fn config(&self, policy: PolicyKind) -> SchedConfig {
        SchedConfig {
            policy,
            quantum: self.quantum,
            preemptive: self.preemptive,
            levels: self.levels,
        }
    }

    /// Everything a run needs, checked up front so a bad argument never
    /// produces a partial run.
    fn plan(&self) -> anyhow::Result<(Workload, Vec<SchedConfig>)> {
        let configs: Vec<SchedConfig> = self
            .policy
            .kinds()
            .into_iter()
            .map(|kind| self.config(kind))
            .collect();
        for config in &configs {
            config
                .validate()
                .with_context(|| format!("invalid configuration for `{}`", config.policy))?;
        }

        let workload = self.workload().context("invalid workload")?;
        Ok((workload, configs))
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let (workload, configs) = args.plan()?;
    info!(processes = workload.len(), policies = configs.len(), "workload ready");

    // Each run gets its own copy of the workload; nothing is shared mutably.
    let outcomes: Vec<SimOutcome> = thread::scope(|scope| {
        let handles: Vec<_> = configs
            .iter()
            .map(|config| {
                let workload = workload.clone();
                scope.spawn(move || simulate(&workload, config))
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(result) => result.map_err(anyhow::Error::from),
                Err(_) => bail!("simulation thread panicked"),
            })
            .collect::<anyhow::Result<_>>()
    })?;

    let metrics: Vec<Metrics> = outcomes.iter().map(Metrics::from_outcome).collect();

    if args.json {
        let reports: Vec<RunReport<'_>> = outcomes
            .iter()
            .zip(&metrics)
            .map(|(outcome, metrics)| RunReport {
                metrics,
                gantt: args.gantt.then(|| gantt_segments(&outcome.trace)),
                trace: args.trace.then_some(outcome.trace.as_slice()),
            })
            .collect();
        let json = match reports.as_slice() {
            [single] => serde_json::to_string_pretty(single)?,
            all => serde_json::to_string_pretty(all)?,
        };
        println!("{json}");
        return Ok(());
    }

    if metrics.len() > 1 {
        print!("{}", Comparison(&metrics));
    }

    let compared = metrics.len() > 1;
    if compared && !args.gantt && !args.trace {
        return Ok(());
    }

    for (outcome, metrics) in outcomes.iter().zip(&metrics) {
        if compared {
            println!();
        }
        println!("Policy: {}", metrics.policy);
        print!("{}", ProcessTable(metrics));
        println!();
        print!("{}", SummaryView(metrics));

        if args.gantt {
            println!();
            print!("{}", Gantt(&gantt_segments(&outcome.trace)));
        }

        if args.trace {
            println!();
            for event in &outcome.trace {
                println!("t={} {:?}", event.at, event.event);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use pretty_assertions::assert_eq;
    use sched_model::{ConfigError, Metrics};

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("sched_model").chain(args.iter().copied()))
    }

    fn plan_error<E>(args: &[&str]) -> E
    where
        E: std::error::Error + Clone + Send + Sync + 'static,
    {
        let err = parse(args).unwrap().plan().unwrap_err();
        err.downcast_ref::<E>()
            .cloned()
            .unwrap_or_else(|| panic!("unexpected error: {err:#}"))
    }

    #[test]
    fn count_and_explicit_processes_conflict() {
        let err = parse(&["-p", "0:3", "-n", "5", "-P", "rr", "-q", "2"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn unknown_policy_is_a_usage_error() {
        let err = parse(&["-P", "lottery", "-p", "0:3"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
    }

    #[test]
    fn quantum_policies_fail_before_running() {
        assert_eq!(
            plan_error::<ConfigError>(&["-P", "rr", "-p", "0:3"]),
            ConfigError::MissingQuantum("rr")
        );
        assert_eq!(
            plan_error::<ConfigError>(&["-P", "all", "-p", "0:3"]),
            ConfigError::MissingQuantum("rr")
        );
        assert_eq!(
            plan_error::<ConfigError>(&["-P", "mlq", "-q", "0", "-p", "0:3"]),
            ConfigError::NonPositiveQuantum(0)
        );
    }

    #[test]
    fn bad_workloads_are_rejected() {
        assert_eq!(plan_error::<WorkloadError>(&[]), WorkloadError::Empty);
        assert_eq!(
            plan_error::<WorkloadError>(&["--process=-1:3"]),
            WorkloadError::NegativeArrival { index: 1, value: -1 }
        );
        assert_eq!(
            plan_error::<WorkloadError>(&["-p", "0:0"]),
            WorkloadError::NonPositiveBurst { index: 1, value: 0 }
        );
    }

    #[test]
    fn plan_expands_all_policies() {
        let (workload, configs) = parse(&["-P", "ALL", "-q", "2", "-n", "4", "--seed", "7"])
            .unwrap()
            .plan()
            .unwrap();

        assert_eq!(workload.len(), 4);
        let policies: Vec<_> = configs.iter().map(|c| c.policy).collect();
        assert_eq!(policies, PolicyKind::ALL.to_vec());
    }

    #[test]
    fn explicit_processes_run_to_completion() {
        let (workload, configs) = parse(&["-p", "0:10", "-p", "1:5", "-p", "3:8"])
            .unwrap()
            .plan()
            .unwrap();
        let metrics = Metrics::from_outcome(&simulate(&workload, &configs[0]).unwrap());

        assert_eq!(metrics.policy, "fcfs");
        assert_eq!(format!("{:.2}", metrics.summary.avg_waiting), "7.00");
    }
}

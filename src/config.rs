use serde::Serialize;
use std::{fmt, str::FromStr};

use crate::{core::Ticks, error::ConfigError};

pub const DEFAULT_MLQ_LEVELS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    Fcfs,
    Sjf,
    Priority,
    Rr,
    Mlq,
    Edf,
}

impl PolicyKind {
    pub const ALL: [PolicyKind; 6] = [
        PolicyKind::Fcfs,
        PolicyKind::Sjf,
        PolicyKind::Priority,
        PolicyKind::Rr,
        PolicyKind::Mlq,
        PolicyKind::Edf,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PolicyKind::Fcfs => "fcfs",
            PolicyKind::Sjf => "sjf",
            PolicyKind::Priority => "priority",
            PolicyKind::Rr => "rr",
            PolicyKind::Mlq => "mlq",
            PolicyKind::Edf => "edf",
        }
    }

    pub fn needs_quantum(self) -> bool {
        matches!(self, PolicyKind::Rr | PolicyKind::Mlq)
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        PolicyKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| ConfigError::UnknownPolicy(s.to_string()))
    }
}

/// Policy selection plus the knobs the policies read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchedConfig {
    pub policy: PolicyKind,
    pub quantum: Option<Ticks>,
    /// Only read by `priority`; the other policies have a fixed preemption mode.
    pub preemptive: bool,
    /// Number of `mlq` levels.
    pub levels: usize,
}

impl SchedConfig {
    pub fn new(policy: PolicyKind) -> Self {
        Self {
            policy,
            quantum: None,
            preemptive: false,
            levels: DEFAULT_MLQ_LEVELS,
        }
    }

    pub fn with_quantum(mut self, quantum: Ticks) -> Self {
        self.quantum = Some(quantum);
        self
    }

    pub fn with_preemption(mut self, preemptive: bool) -> Self {
        self.preemptive = preemptive;
        self
    }

    pub fn with_levels(mut self, levels: usize) -> Self {
        self.levels = levels;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(quantum) = self.quantum {
            if quantum == 0 {
                return Err(ConfigError::NonPositiveQuantum(quantum));
            }
        } else if self.policy.needs_quantum() {
            return Err(ConfigError::MissingQuantum(self.policy.as_str()));
        }

        if self.policy == PolicyKind::Mlq && self.levels == 0 {
            return Err(ConfigError::NoLevels);
        }

        Ok(())
    }

    /// Quantum of a validated config for a policy that needs one.
    pub(crate) fn require_quantum(&self) -> Result<Ticks, ConfigError> {
        self.validate()?;
        self.quantum
            .ok_or(ConfigError::MissingQuantum(self.policy.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_policy_names() {
        assert_eq!("rr".parse::<PolicyKind>(), Ok(PolicyKind::Rr));
        assert_eq!(" EDF ".parse::<PolicyKind>(), Ok(PolicyKind::Edf));
        assert_eq!(
            "lottery".parse::<PolicyKind>(),
            Err(ConfigError::UnknownPolicy("lottery".to_string()))
        );
    }

    #[test]
    fn round_robin_requires_positive_quantum() {
        assert_eq!(
            SchedConfig::new(PolicyKind::Rr).validate(),
            Err(ConfigError::MissingQuantum("rr"))
        );
        assert_eq!(
            SchedConfig::new(PolicyKind::Mlq).with_quantum(0).validate(),
            Err(ConfigError::NonPositiveQuantum(0))
        );
        assert!(SchedConfig::new(PolicyKind::Rr).with_quantum(2).validate().is_ok());
    }

    #[test]
    fn non_quantum_policies_ignore_missing_quantum() {
        for kind in [PolicyKind::Fcfs, PolicyKind::Sjf, PolicyKind::Priority, PolicyKind::Edf] {
            assert!(SchedConfig::new(kind).validate().is_ok());
        }
    }

    #[test]
    fn mlq_needs_a_level() {
        assert_eq!(
            SchedConfig::new(PolicyKind::Mlq)
                .with_quantum(1)
                .with_levels(0)
                .validate(),
            Err(ConfigError::NoLevels)
        );
    }
}

// ABOUTME: Container restart policy for declared services.
// ABOUTME: Parses no, always, unless-stopped, and on-failure[:max-retries] into --restart.

use serde::de::{self, Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;

/// Value of the runtime's `--restart` flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartPolicy {
    No,
    Always,
    UnlessStopped,
    OnFailure { max_retries: Option<u32> },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseRestartPolicyError {
    #[error("unknown restart policy: {0}")]
    Unknown(String),

    #[error("invalid on-failure retry count: {0}")]
    Retries(String),
}

impl FromStr for RestartPolicy {
    type Err = ParseRestartPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, retries) = match s.split_once(':') {
            Some((name, retries)) => (name, Some(retries)),
            None => (s, None),
        };
        match (name, retries) {
            ("no", None) => Ok(Self::No),
            ("always", None) => Ok(Self::Always),
            ("unless-stopped", None) => Ok(Self::UnlessStopped),
            ("on-failure", None) => Ok(Self::OnFailure { max_retries: None }),
            ("on-failure", Some(retries)) => retries
                .parse()
                .map(|n| Self::OnFailure { max_retries: Some(n) })
                .map_err(|_| ParseRestartPolicyError::Retries(retries.to_string())),
            _ => Err(ParseRestartPolicyError::Unknown(s.to_string())),
        }
    }
}

impl fmt::Display for RestartPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::No => "no",
            Self::Always => "always",
            Self::UnlessStopped => "unless-stopped",
            Self::OnFailure { .. } => "on-failure",
        };
        f.write_str(name)?;
        if let Self::OnFailure { max_retries: Some(n) } = self {
            write!(f, ":{n}")?;
        }
        Ok(())
    }
}

impl RestartPolicy {
    /// The `--restart` argument pair for `run`/`create`.
    pub fn to_args(&self) -> [String; 2] {
        ["--restart".to_string(), self.to_string()]
    }
}

impl<'de> Deserialize<'de> for RestartPolicy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer)?
            .parse()
            .map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_forms() {
        assert_eq!("no".parse::<RestartPolicy>().unwrap(), RestartPolicy::No);
        assert_eq!(
            "on-failure:3".parse::<RestartPolicy>().unwrap(),
            RestartPolicy::OnFailure {
                max_retries: Some(3)
            }
        );
        assert_eq!(
            "sometimes".parse::<RestartPolicy>(),
            Err(ParseRestartPolicyError::Unknown("sometimes".to_string()))
        );
        assert_eq!(
            "on-failure:x".parse::<RestartPolicy>(),
            Err(ParseRestartPolicyError::Retries("x".to_string()))
        );
        assert!("always:2".parse::<RestartPolicy>().is_err());
    }

    #[test]
    fn renders_run_arguments() {
        assert_eq!(
            RestartPolicy::UnlessStopped.to_args(),
            ["--restart".to_string(), "unless-stopped".to_string()]
        );
        assert_eq!(
            RestartPolicy::OnFailure { max_retries: Some(5) }.to_string(),
            "on-failure:5"
        );
    }
}

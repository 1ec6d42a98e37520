// ABOUTME: Start-confirmation settings for attached launches and blue-green swaps.
// ABOUTME: Number of polls and the pause between them.

use crate::execute::ConfirmPolicy;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfirmConfig {
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,
}

fn default_attempts() -> u32 {
    10
}

fn default_interval() -> Duration {
    Duration::from_millis(200)
}

impl Default for ConfirmConfig {
    fn default() -> Self {
        ConfirmConfig {
            attempts: default_attempts(),
            interval: default_interval(),
        }
    }
}

impl ConfirmConfig {
    pub fn policy(&self) -> ConfirmPolicy {
        ConfirmPolicy {
            attempts: self.attempts.max(1),
            interval: self.interval,
        }
    }
}

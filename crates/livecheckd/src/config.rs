use std::time::Duration;

use livecheck_core::{EvaluatorConfig, SessionPolicy, DEFAULT_SMILE_THRESHOLD};

/// Daemon configuration, loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Smile probability above which the smile step succeeds.
    pub smile_threshold: f32,
    /// Keep checklist progress across sessions instead of starting fresh.
    pub carry_over: bool,
    /// Delay between challenge completion and the capture being handed to
    /// the sink. The engine never waits on it.
    pub capture_delay_ms: u64,
    /// Start a session as soon as the daemon is up, without a `start` event.
    pub auto_start: bool,
    /// Bound of the request queue between the event reader and the engine.
    pub channel_capacity: usize,
}

impl Config {
    /// Load configuration from `LIVECHECK_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup. Missing or
    /// unparsable values fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            smile_threshold: parse_or(&lookup, "LIVECHECK_SMILE_THRESHOLD", DEFAULT_SMILE_THRESHOLD),
            carry_over: flag(&lookup, "LIVECHECK_CARRY_OVER", false),
            capture_delay_ms: parse_or(&lookup, "LIVECHECK_CAPTURE_DELAY_MS", 1),
            auto_start: flag(&lookup, "LIVECHECK_AUTO_START", false),
            channel_capacity: parse_or(&lookup, "LIVECHECK_CHANNEL_CAPACITY", 16usize).max(1),
        }
    }

    pub fn evaluator(&self) -> EvaluatorConfig {
        EvaluatorConfig {
            smile_threshold: self.smile_threshold,
            session_policy: if self.carry_over {
                SessionPolicy::CarryOver
            } else {
                SessionPolicy::Fresh
            },
        }
    }

    pub fn capture_delay(&self) -> Duration {
        Duration::from_millis(self.capture_delay_ms)
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn flag(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    lookup(key).map(|v| v != "0").unwrap_or(default)
}

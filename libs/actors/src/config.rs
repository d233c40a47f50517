//! Runtime configuration for an actor system.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tuning knobs for one [`ActorSystem`](crate::ActorSystem).
///
/// The defaults reproduce the reference constants: a worker per available
/// core, 100 ms mailbox polls, 50 ms predatory claim backoff, and an idle
/// dispatcher sleep of 100 ms after 10 consecutive empty passes.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ActorSystemConfig {
    /// Worker threads executing message-consumption turns.
    pub workers: usize,

    /// How long a worker waits on an empty mailbox before giving the turn
    /// back.
    pub poll_timeout_ms: u64,

    /// Sleep between claim attempts of a predatory synchronous send.
    pub claim_backoff_ms: u64,

    /// Consecutive empty dispatcher passes before the idle sleep kicks in.
    pub idle_threshold: u32,

    /// Dispatcher sleep once the idle threshold is exceeded.
    pub idle_sleep_ms: u64,
}

impl Default for ActorSystemConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(usize::from)
                .unwrap_or(4),
            poll_timeout_ms: 100,
            claim_backoff_ms: 50,
            idle_threshold: 10,
            idle_sleep_ms: 100,
        }
    }
}

impl ActorSystemConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn claim_backoff(&self) -> Duration {
        Duration::from_millis(self.claim_backoff_ms)
    }

    pub fn idle_sleep(&self) -> Duration {
        Duration::from_millis(self.idle_sleep_ms)
    }
}

/// Mailbox poll window used by actors that are not (yet) bound to a system.
pub(crate) const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(100);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_constants() {
        let config = ActorSystemConfig::default();
        assert!(config.workers >= 1);
        assert_eq!(config.poll_timeout(), Duration::from_millis(100));
        assert_eq!(config.claim_backoff(), Duration::from_millis(50));
        assert_eq!(config.idle_threshold, 10);
        assert_eq!(config.idle_sleep(), Duration::from_millis(100));
    }

    #[test]
    fn partial_config_fills_in_defaults() {
        let config: ActorSystemConfig = serde_json::from_str(r#"{"workers": 2}"#).unwrap();
        assert_eq!(config.workers, 2);
        assert_eq!(config.poll_timeout_ms, 100);
    }
}

//! Protocol-level timing parameters shared by the session state machine and
//! the demo binary, following the teacher's profile-with-defaults pattern.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing parameters governing dispute escalation and cooperative shutdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// On-chain challenge window, in seconds.
    #[serde(default = "default_challenge_duration_secs")]
    pub challenge_duration_secs: u64,

    /// Tick used by `WaitConcludable`'s poll loop.
    #[serde(default = "default_poll_tick", with = "millis")]
    pub poll_tick: Duration,

    /// Number of attempts `TryClose` makes before giving up.
    #[serde(default = "default_close_attempts")]
    pub close_attempts: u32,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            challenge_duration_secs: default_challenge_duration_secs(),
            poll_tick: default_poll_tick(),
            close_attempts: default_close_attempts(),
        }
    }
}

fn default_challenge_duration_secs() -> u64 {
    60
}

fn default_poll_tick_millis() -> u64 {
    500
}

fn default_poll_tick() -> Duration {
    Duration::from_millis(default_poll_tick_millis())
}

fn default_close_attempts() -> u32 {
    3
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = ProtocolConfig::default();
        assert_eq!(cfg.challenge_duration_secs, 60);
        assert_eq!(cfg.poll_tick, Duration::from_millis(500));
        assert_eq!(cfg.close_attempts, 3);
    }
}

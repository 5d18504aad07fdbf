//! Client configuration, loaded from the environment the way the teacher's
//! `main.rs` loads its RPC/contract configuration.

use credswap_core::{Address, ProtocolConfig};

use crate::error::{ClientError, ClientResult};

/// Environment variable names this crate reads.
pub mod env {
    pub const PRIVATE_KEY: &str = "CREDSWAP_PRIVATE_KEY";
    pub const PEER_ADDRESS: &str = "CREDSWAP_PEER_ADDRESS";
    pub const CHALLENGE_DURATION_SECS: &str = "CREDSWAP_CHALLENGE_DURATION_SECS";
}

/// Resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub private_key: String,
    pub peer: Address,
    pub protocol: ProtocolConfig,
}

impl ClientConfig {
    /// Loads configuration from environment variables, falling back to
    /// [`ProtocolConfig::default`] timing where unset.
    pub fn from_env() -> ClientResult<Self> {
        let get = |name: &str| -> ClientResult<String> {
            std::env::var(name).map_err(|_| ClientError::MissingEnv(name.to_string()))
        };

        let private_key = get(env::PRIVATE_KEY)?;
        let peer: Address = get(env::PEER_ADDRESS)?.parse().map_err(|e: <Address as std::str::FromStr>::Err| {
            ClientError::InvalidEnv {
                name: env::PEER_ADDRESS.to_string(),
                reason: e.to_string(),
            }
        })?;

        let mut protocol = ProtocolConfig::default();
        if let Ok(raw) = std::env::var(env::CHALLENGE_DURATION_SECS) {
            protocol.challenge_duration_secs = raw.parse().map_err(|e: std::num::ParseIntError| {
                ClientError::InvalidEnv {
                    name: env::CHALLENGE_DURATION_SECS.to_string(),
                    reason: e.to_string(),
                }
            })?;
        }

        Ok(Self {
            private_key,
            peer,
            protocol,
        })
    }
}

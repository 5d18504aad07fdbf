//! Error taxonomy for the session layer: signature-registry conflicts,
//! channel-runtime failures, and cancellation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Core(#[from] credswap_core::CoreError),

    #[error("a credential request for this (issuer, document) pair is already pending")]
    AlreadyRegistered,

    #[error("updating channel off-chain: {0}")]
    UpdateRejected(String),

    #[error("forcing update on-chain: {0}")]
    ForceUpdateFailed(String),

    #[error("settling channel: {0}")]
    SettleFailed(String),

    #[error("unknown channel id")]
    UnknownChannel,

    #[error("wait cancelled")]
    Cancelled,

    #[error("failed to close channel in {attempts} attempts: {last_error}")]
    CloseExhausted { attempts: u32, last_error: String },
}

pub type SessionResult<T> = Result<T, SessionError>;

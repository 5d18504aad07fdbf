//! Error taxonomy shared by the crypto, codec and predicate layers.

use thiserror::Error;

/// Errors produced by [`crate::crypto`], [`crate::codec`] and [`crate::predicate`].
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("signing hash: {0}")]
    Sign(String),

    #[error("malformed signature: {0}")]
    MalformedSig(String),

    #[error("invalid signer")]
    InvalidSigner,

    #[error("truncated or malformed frame: {0}")]
    BadFrame(String),

    #[error("unknown app-data mode: {0}")]
    UnknownMode(u8),

    #[error("wrong number of assets in {0} state")]
    WrongAssetCount(&'static str),

    #[error("asset mismatch between current and next state")]
    AssetMismatch,

    #[error("participant count changed: current has {current}, next has {next}")]
    ParticipantCountMismatch { current: usize, next: usize },

    #[error("expected Cert data in next state")]
    InvalidNextData,

    #[error("unequal balances outside of an offer transition")]
    UnequalBalances,

    #[error("insufficient balance for offer of {needed} against balance {have}")]
    InsufficientFunds { needed: String, have: String },

    #[error("wrong balance for participant {index}: expected {expected}, got {got}")]
    BalanceMismatch {
        index: u16,
        expected: String,
        got: String,
    },

    #[error("verifying signature: {0}")]
    SignatureVerification(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

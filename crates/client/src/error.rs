//! Error taxonomy for the dispatcher layer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Session(#[from] credswap_channel::SessionError),

    #[error("missing required environment variable: {0}")]
    MissingEnv(String),

    #[error("invalid value for environment variable {name}: {reason}")]
    InvalidEnv { name: String, reason: String },

    #[error("proposal channel closed")]
    ProposalChannelClosed,
}

pub type ClientResult<T> = Result<T, ClientError>;

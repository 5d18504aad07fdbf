//! Credential-swap client dispatcher.
//!
//! This crate provides:
//! - The client dispatcher (C7), routing inbound channel proposals and
//!   updates from the external runtime to the right session
//! - Client configuration, loaded from the environment

pub mod config;
pub mod dispatcher;
pub mod error;

pub use config::ClientConfig;
pub use dispatcher::{ChannelProposalRequest, Client, ProposalAcceptor};
pub use error::{ClientError, ClientResult};

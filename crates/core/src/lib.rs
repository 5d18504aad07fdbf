//! Credential-swap protocol core.
//!
//! This crate provides the chain-agnostic building blocks shared by every
//! channel participant and by the on-chain arbiter:
//! - Document hashing and recoverable-signature sign/verify
//! - The tagged-union app-data wire codec
//! - The deterministic state-transition predicate
//! - A typed ABI mirror of the on-chain `validTransition` interface
//! - Shared channel data types and protocol timing configuration

pub mod chain_abi;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod data;
pub mod error;
pub mod predicate;

pub use alloy::primitives::{Address, U256};
pub use config::ProtocolConfig;
pub use crypto::{compute_document_hash, verify_sig, CredentialSigner};
pub use data::{
    Allocation, AppData, ChannelId, ChannelParams, ChannelState, DocHash, LockedAllocation,
    ParticipantIdx,
};
pub use error::{CoreError, CoreResult};
pub use predicate::valid_transition;

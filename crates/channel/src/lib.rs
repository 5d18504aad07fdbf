//! Credential-swap session layer.
//!
//! This crate provides:
//! - The signature registry, rendezvousing a buyer's credential request
//!   with the issuer's eventual certificate
//! - The per-channel session state machine driving offers, certificates,
//!   dispute escalation and settlement
//! - The session registry used to route inbound updates by channel id
//! - The `ChannelHandle` trait boundary to an external payment-channel
//!   runtime, plus an in-memory test double for this crate's own tests

pub mod error;
pub mod mock;
pub mod registry;
pub mod runtime;
pub mod session;
pub mod sigreg;

pub use error::{SessionError, SessionResult};
pub use registry::SessionRegistry;
pub use runtime::{AdjudicatorEvent, ChannelHandle, StateMutation, UpdateResponder};
pub use session::{AsyncCredential, CredentialRequest, Session};
pub use sigreg::{CredentialProposal, SignatureRegistry};

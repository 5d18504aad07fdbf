//! The external channel-runtime boundary.
//!
//! [`ChannelHandle`] captures exactly the surface the session state machine
//! consumes from a real payment-channel client: proposing off-chain updates,
//! escalating to an on-chain forced update, settling, and observing
//! adjudicator events. Production implementations (transport, ledger
//! funding, the adjudicator protocol itself) are out of scope for this
//! crate; [`crate::mock::PairedMockChannel`] is the only implementation
//! shipped here, and it exists purely to drive this crate's own tests.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use credswap_core::{ChannelId, ChannelParams, ChannelState, ParticipantIdx};
use tokio::sync::broadcast;

use crate::error::SessionResult;

/// A mutation applied to a channel state as part of a proposed update.
pub type StateMutation = Box<dyn FnOnce(&mut ChannelState) -> credswap_core::CoreResult<()> + Send>;

/// Events the adjudicator (on-chain watcher) reports for a channel.
#[derive(Debug, Clone)]
pub enum AdjudicatorEvent {
    /// A state was registered on-chain, opening a dispute.
    Registered,
    /// A forced progression was accepted; finalizes after `timeout`.
    Progressed { timeout: Duration },
    /// The channel concluded on-chain.
    Concluded,
}

/// Lets an inbound update be accepted or rejected by the application layer,
/// independently of when the decision is made.
#[async_trait]
pub trait UpdateResponder: Debug + Send + Sync {
    async fn accept(&self) -> SessionResult<()>;
    async fn reject(&self, reason: String) -> SessionResult<()>;
}

/// The session state machine's view of a single open channel.
#[async_trait]
pub trait ChannelHandle: Debug + Send + Sync {
    fn id(&self) -> ChannelId;
    fn index(&self) -> ParticipantIdx;
    fn params(&self) -> &ChannelParams;

    /// A snapshot of the current agreed state.
    fn state(&self) -> ChannelState;

    /// Proposes an update built by mutating a clone of the current state,
    /// and waits for the peer to agree off-chain.
    async fn update_by(&self, mutate: StateMutation) -> SessionResult<()>;

    /// Escalates the same mutation on-chain after off-chain cooperation
    /// failed. `mutate`'s errors are logged, not propagated: a forced
    /// update commits whatever end state the closure manages to produce.
    async fn force_update(&self, mutate: StateMutation) -> SessionResult<()>;

    /// Cooperatively or forcibly settles the channel, releasing funds.
    async fn settle(&self) -> SessionResult<()>;

    /// Subscribes to this channel's adjudicator events.
    fn subscribe(&self) -> broadcast::Receiver<AdjudicatorEvent>;
}

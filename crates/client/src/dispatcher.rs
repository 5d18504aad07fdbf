//! The client dispatcher (C7): routes inbound channel proposals and updates
//! from the external runtime to the right session, and creates sessions for
//! accepted proposals.

use std::sync::Arc;

use async_trait::async_trait;
use credswap_channel::{ChannelHandle, Session, SessionRegistry, SessionResult, UpdateResponder};
use credswap_core::{Address, ChannelId, ChannelState};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::{ClientError, ClientResult};

/// Accepts or rejects a pending channel proposal by talking to the external
/// runtime; returned as part of a [`ChannelProposalRequest`].
#[async_trait]
pub trait ProposalAcceptor: Send {
    async fn accept(self: Box<Self>) -> SessionResult<Arc<dyn ChannelHandle>>;
    async fn reject(self: Box<Self>, reason: String) -> SessionResult<()>;
}

/// An inbound channel proposal, queued for the application to accept or
/// reject.
pub struct ChannelProposalRequest {
    peer: Address,
    acceptor: Box<dyn ProposalAcceptor>,
}

impl ChannelProposalRequest {
    pub fn new(peer: Address, acceptor: Box<dyn ProposalAcceptor>) -> Self {
        Self { peer, acceptor }
    }

    pub fn peer(&self) -> Address {
        self.peer
    }

    /// Accepts the proposal, opens the session, and registers it so future
    /// updates on this channel route correctly.
    pub async fn accept(self, registry: &SessionRegistry) -> ClientResult<Arc<Session>> {
        self.accept_with_config(registry, credswap_core::ProtocolConfig::default())
            .await
    }

    /// Like [`accept`](Self::accept), but with protocol timing overrides
    /// (e.g. loaded from [`ClientConfig`](crate::ClientConfig)).
    pub async fn accept_with_config(
        self,
        registry: &SessionRegistry,
        config: credswap_core::ProtocolConfig,
    ) -> ClientResult<Arc<Session>> {
        let handle = self.acceptor.accept().await?;
        let session = Session::with_config(handle, config);
        registry.add(session.clone());
        Ok(session)
    }

    pub async fn reject(self, reason: String) -> ClientResult<()> {
        self.acceptor.reject(reason).await?;
        Ok(())
    }
}

/// Dispatches inbound proposals and updates from the external runtime.
pub struct Client {
    registry: Arc<SessionRegistry>,
    proposals_tx: mpsc::UnboundedSender<ChannelProposalRequest>,
    proposals_rx: parking_lot::Mutex<mpsc::UnboundedReceiver<ChannelProposalRequest>>,
}

impl Client {
    pub fn new() -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            registry: Arc::new(SessionRegistry::new()),
            proposals_tx: tx,
            proposals_rx: parking_lot::Mutex::new(rx),
        })
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Called by the runtime's proposal handler for every inbound proposal.
    pub fn dispatch_proposal(&self, proposal: ChannelProposalRequest) {
        if self.proposals_tx.send(proposal).is_err() {
            warn!("no listener for inbound channel proposals");
        }
    }

    /// Blocks until an inbound channel proposal arrives, or `cancel` fires.
    pub async fn next_channel_request(
        &self,
        cancel: &CancellationToken,
    ) -> ClientResult<ChannelProposalRequest> {
        let mut rx = self.proposals_rx.lock();
        tokio::select! {
            req = rx.recv() => req.ok_or(ClientError::ProposalChannelClosed),
            _ = cancel.cancelled() => Err(ClientError::ProposalChannelClosed),
        }
    }

    /// Called by the runtime's update handler for every inbound update.
    /// A channel id unknown to the registry is logged and dropped: the race
    /// between `accept` and the first update is benign, the runtime will
    /// retry or fail the update on its own.
    pub fn dispatch_update(
        &self,
        channel_id: ChannelId,
        cur: ChannelState,
        next: ChannelState,
        responder: Arc<dyn UpdateResponder>,
    ) {
        match self.registry.for_id(channel_id) {
            Some(session) => session.handle_update(&cur, &next, responder),
            None => warn!(channel = %channel_id, "update on unknown channel"),
        }
    }
}

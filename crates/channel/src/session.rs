//! The credential-swap session state machine (C5): the per-channel object
//! mediating offer proposals, certificate issuance, dispute escalation and
//! settlement over a [`ChannelHandle`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use credswap_core::{
    compute_document_hash, Address, AppData, ChannelId, CredentialSigner, DocHash, ProtocolConfig,
    U256,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

use crate::error::{SessionError, SessionResult};
use crate::runtime::{AdjudicatorEvent, ChannelHandle, UpdateResponder};
use crate::sigreg::{Awaitable, CredentialProposal, SignatureRegistry};

const ASSET_IDX: usize = 0;

/// A pending Offer observed on an inbound update, awaiting the application
/// layer's decision to issue the credential or not.
#[derive(Debug)]
pub struct CredentialRequest {
    pub doc_hash: DocHash,
    pub price: U256,
    pub issuer: Address,
    pub buyer: u16,
    responder: Arc<dyn UpdateResponder>,
    session: Arc<Session>,
}

impl CredentialRequest {
    pub fn check_doc(&self, doc: &[u8]) -> SessionResult<()> {
        if compute_document_hash(doc) != self.doc_hash {
            return Err(SessionError::UpdateRejected("wrong document".into()));
        }
        Ok(())
    }

    pub fn check_price(&self, price: U256) -> SessionResult<()> {
        if price != self.price {
            return Err(SessionError::UpdateRejected("wrong price".into()));
        }
        Ok(())
    }

    /// Accepts the pending offer, signs it, and proposes the settling Cert
    /// update. Falls back to a forced on-chain update if the peer rejects.
    #[instrument(skip(self, signer), fields(channel = %self.session.id()))]
    pub async fn issue_credential(self, signer: &CredentialSigner) -> SessionResult<()> {
        self.responder.accept().await?;
        self.session
            .issue_credential(self.doc_hash, self.price, self.buyer, signer)
            .await
    }
}

/// A buyer's outstanding request for a credential, awaiting the issuer's
/// signed certificate.
#[derive(Debug)]
pub struct AsyncCredential {
    awaitable: Awaitable,
}

impl AsyncCredential {
    pub async fn r#await(self, cancel: &CancellationToken) -> SessionResult<CredentialProposal> {
        self.awaitable.r#await(cancel).await
    }
}

/// Per-channel credential-swap session.
#[derive(Debug)]
pub struct Session {
    handle: Arc<dyn ChannelHandle>,
    sig_reg: SignatureRegistry,
    cred_requests_tx: mpsc::UnboundedSender<CredentialRequest>,
    cred_requests_rx: parking_lot::Mutex<mpsc::UnboundedReceiver<CredentialRequest>>,
    disputed: AtomicBool,
    concludable: AtomicBool,
    concluded: AtomicBool,
    poll_tick: Duration,
}

impl Session {
    /// Builds a session with default protocol timing.
    pub fn new(handle: Arc<dyn ChannelHandle>) -> Arc<Self> {
        Self::with_config(handle, ProtocolConfig::default())
    }

    /// Builds a session, overriding [`WaitConcludable`]'s poll tick with
    /// `config.poll_tick`.
    ///
    /// [`WaitConcludable`]: Session::wait_concludable
    pub fn with_config(handle: Arc<dyn ChannelHandle>, config: ProtocolConfig) -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Arc::new(Self {
            handle,
            sig_reg: SignatureRegistry::new(),
            cred_requests_tx: tx,
            cred_requests_rx: parking_lot::Mutex::new(rx),
            disputed: AtomicBool::new(false),
            concludable: AtomicBool::new(false),
            concluded: AtomicBool::new(false),
            poll_tick: config.poll_tick,
        });
        session.clone().spawn_watcher();
        session
    }

    pub fn id(&self) -> ChannelId {
        self.handle.id()
    }

    pub fn disputed(&self) -> bool {
        self.disputed.load(Ordering::Acquire)
    }

    pub fn concluded(&self) -> bool {
        self.concluded.load(Ordering::Acquire)
    }

    pub fn state(&self) -> credswap_core::ChannelState {
        self.handle.state()
    }

    fn spawn_watcher(self: Arc<Self>) {
        let mut events = self.handle.subscribe();
        tokio::spawn(async move {
            while let Ok(event) = events.recv().await {
                self.handle_adjudicator_event(event);
            }
        });
    }

    fn handle_adjudicator_event(self: &Arc<Self>, event: AdjudicatorEvent) {
        match event {
            AdjudicatorEvent::Registered => {
                self.disputed.store(true, Ordering::Release);
            }
            AdjudicatorEvent::Progressed { timeout } => {
                let this = self.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(timeout).await;
                    this.concludable.store(true, Ordering::Release);
                });
            }
            AdjudicatorEvent::Concluded => {
                self.concluded.store(true, Ordering::Release);
            }
        }
    }

    /// Opens an offer for `doc` at `price`, to be issued by `issuer`.
    #[instrument(skip(self, doc), fields(channel = %self.id()))]
    pub async fn request_credential(
        self: &Arc<Self>,
        doc: &[u8],
        price: U256,
        issuer: Address,
    ) -> SessionResult<AsyncCredential> {
        let doc_hash = compute_document_hash(doc);
        let awaitable = self.sig_reg.register(doc_hash, issuer)?;

        let buyer = self.handle.index();
        let result = self
            .handle
            .update_by(Box::new(move |s| {
                s.data = AppData::Offer {
                    issuer,
                    data_hash: doc_hash,
                    price,
                    buyer,
                };
                Ok(())
            }))
            .await;

        if let Err(e) = result {
            self.sig_reg.unregister(doc_hash, issuer);
            return Err(e);
        }

        Ok(AsyncCredential { awaitable })
    }

    /// Blocks until an inbound Offer update produces a [`CredentialRequest`].
    pub async fn next_credential_request(
        self: &Arc<Self>,
        cancel: &CancellationToken,
    ) -> SessionResult<CredentialRequest> {
        let mut rx = self.cred_requests_rx.lock();
        tokio::select! {
            req = rx.recv() => req.ok_or(SessionError::Cancelled),
            _ = cancel.cancelled() => Err(SessionError::Cancelled),
        }
    }

    async fn issue_credential(
        self: &Arc<Self>,
        doc_hash: DocHash,
        price: U256,
        buyer: u16,
        signer: &CredentialSigner,
    ) -> SessionResult<()> {
        let actor = self.handle.index();
        let signature = signer.sign(doc_hash).await?;

        fn apply(
            s: &mut credswap_core::ChannelState,
            signature: [u8; 65],
            buyer: u16,
            actor: u16,
            price: U256,
        ) -> credswap_core::CoreResult<()> {
            s.data = AppData::Cert { signature };
            s.outcome.balances[ASSET_IDX][buyer as usize] -= price;
            s.outcome.balances[ASSET_IDX][actor as usize] += price;
            Ok(())
        }

        let result = self
            .handle
            .update_by(Box::new(move |s| apply(s, signature, buyer, actor, price)))
            .await;

        if let Err(e) = result {
            warn!(error = %e, "cooperative Cert update rejected, forcing on-chain progress");
            self.disputed.store(true, Ordering::Release);

            self.handle
                .force_update(Box::new(move |s| apply(s, signature, buyer, actor, price)))
                .await
                .map_err(|e| SessionError::ForceUpdateFailed(e.to_string()))?;
        }

        Ok(())
    }

    /// Routes an inbound update, called by the dispatcher.
    #[instrument(skip(self, responder), fields(channel = %self.id()))]
    pub fn handle_update(
        self: &Arc<Self>,
        cur: &credswap_core::ChannelState,
        next: &credswap_core::ChannelState,
        responder: Arc<dyn UpdateResponder>,
    ) {
        match &next.data {
            AppData::Offer {
                issuer,
                data_hash,
                price,
                buyer,
            } => {
                let req = CredentialRequest {
                    doc_hash: *data_hash,
                    price: *price,
                    issuer: *issuer,
                    buyer: *buyer,
                    responder,
                    session: self.clone(),
                };
                if self.cred_requests_tx.send(req).is_err() {
                    warn!("no listener for inbound credential request");
                }
            }
            AppData::Cert { signature } => {
                let Some((issuer, data_hash, _, _)) = cur.data.as_offer() else {
                    warn!("Cert update without a preceding Offer; rejecting");
                    let responder = responder.clone();
                    tokio::spawn(async move {
                        let _ = responder.reject("no pending offer".into()).await;
                    });
                    return;
                };
                self.sig_reg.push(
                    data_hash,
                    issuer,
                    CredentialProposal {
                        signature: *signature,
                        responder,
                    },
                );
            }
            AppData::Default => {
                let responder = responder.clone();
                tokio::spawn(async move {
                    let _ = responder.accept().await;
                });
            }
        }
    }

    #[instrument(skip(self), fields(channel = %self.id()))]
    pub async fn close(self: &Arc<Self>, cancel: &CancellationToken) -> SessionResult<()> {
        if self.disputed() {
            self.wait_concludable(cancel).await?;
        } else if !self.handle.state().is_final {
            let result = self
                .handle
                .update_by(Box::new(|s| {
                    s.data = AppData::Default;
                    s.is_final = true;
                    Ok(())
                }))
                .await;
            if let Err(e) = result {
                warn!(error = %e, "failed to finalize channel off-chain, settling anyway");
            }
        }

        self.handle
            .settle()
            .await
            .map_err(|e| SessionError::SettleFailed(e.to_string()))
    }

    pub async fn try_close(
        self: &Arc<Self>,
        cancel: &CancellationToken,
        attempts: u32,
    ) -> SessionResult<()> {
        let mut last_error = None;
        for attempt in 1..=attempts {
            match self.close(cancel).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(attempt, error = %e, "close attempt failed");
                    last_error = Some(e.to_string());
                }
            }
        }
        Err(SessionError::CloseExhausted {
            attempts,
            last_error: last_error.unwrap_or_default(),
        })
    }

    async fn wait_concludable(&self, cancel: &CancellationToken) -> SessionResult<()> {
        loop {
            if self.handle.state().is_final || self.concludable.load(Ordering::Acquire) {
                return Ok(());
            }
            tokio::select! {
                _ = tokio::time::sleep(self.poll_tick) => {}
                _ = cancel.cancelled() => return Err(SessionError::Cancelled),
            }
        }
    }
}

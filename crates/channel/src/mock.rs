//! An in-memory, two-party implementation of [`ChannelHandle`] used only by
//! this crate's own test suite to drive the end-to-end scenarios without a
//! real payment-channel runtime or blockchain node.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use credswap_core::{
    valid_transition, Address, ChannelId, ChannelParams, ChannelState, U256,
};
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::error::{SessionError, SessionResult};
use crate::runtime::{AdjudicatorEvent, ChannelHandle, StateMutation, UpdateResponder};

/// How long a forced update's challenge period lasts in the mock. Kept far
/// shorter than any real chain's so tests finish quickly.
const MOCK_CHALLENGE_PERIOD: Duration = Duration::from_millis(50);

struct Inner {
    params: ChannelParams,
    state: Mutex<ChannelState>,
    events: broadcast::Sender<AdjudicatorEvent>,
    reject_next_cert: AtomicBool,
    settled: AtomicBool,
}

/// One participant's handle onto a shared in-memory channel.
#[derive(Clone)]
pub struct PairedMockChannel {
    inner: Arc<Inner>,
    index: u16,
}

impl std::fmt::Debug for PairedMockChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PairedMockChannel")
            .field("index", &self.index)
            .finish()
    }
}

impl PairedMockChannel {
    /// Builds both participants' handles onto one shared channel with the
    /// given starting balances (indexed by participant).
    pub fn pair(params: ChannelParams, balances: Vec<U256>) -> (Self, Self) {
        let asset = Address::repeat_byte(0xAA);
        let id = ChannelId::repeat_byte(0x01);
        let state = ChannelState::new(id, credswap_core::Allocation::single_asset(asset, balances));

        let (tx, _rx) = broadcast::channel(16);
        let inner = Arc::new(Inner {
            params,
            state: Mutex::new(state),
            events: tx,
            reject_next_cert: AtomicBool::new(false),
            settled: AtomicBool::new(false),
        });

        (
            Self {
                inner: inner.clone(),
                index: 0,
            },
            Self { inner, index: 1 },
        )
    }

    /// Makes the next Cert update proposed by either party fail
    /// cooperatively, as if the buyer had refused to countersign.
    pub fn reject_next_cert(&self) {
        self.inner.reject_next_cert.store(true, Ordering::SeqCst);
    }

    pub fn is_settled(&self) -> bool {
        self.inner.settled.load(Ordering::SeqCst)
    }

    fn apply(&self, mutate: StateMutation, actor: u16, bypass_reject: bool) -> SessionResult<()> {
        if !bypass_reject && self.inner.reject_next_cert.swap(false, Ordering::SeqCst) {
            return Err(SessionError::UpdateRejected(
                "peer declined to countersign".into(),
            ));
        }

        let mut guard = self.inner.state.lock();
        let mut next = guard.clone();
        next.version += 1;
        mutate(&mut next).map_err(SessionError::from)?;

        valid_transition(&self.inner.params, &guard, &next, actor).map_err(SessionError::from)?;

        *guard = next;
        Ok(())
    }
}

#[async_trait]
impl ChannelHandle for PairedMockChannel {
    fn id(&self) -> ChannelId {
        self.inner.state.lock().id
    }

    fn index(&self) -> u16 {
        self.index
    }

    fn params(&self) -> &ChannelParams {
        &self.inner.params
    }

    fn state(&self) -> ChannelState {
        self.inner.state.lock().clone()
    }

    async fn update_by(&self, mutate: StateMutation) -> SessionResult<()> {
        self.apply(mutate, self.index, false)
    }

    async fn force_update(&self, mutate: StateMutation) -> SessionResult<()> {
        let _ = self.inner.events.send(AdjudicatorEvent::Registered);
        self.apply(mutate, self.index, true)?;
        let _ = self.inner.events.send(AdjudicatorEvent::Progressed {
            timeout: MOCK_CHALLENGE_PERIOD,
        });
        Ok(())
    }

    async fn settle(&self) -> SessionResult<()> {
        self.inner.settled.store(true, Ordering::SeqCst);
        let _ = self.inner.events.send(AdjudicatorEvent::Concluded);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AdjudicatorEvent> {
        self.inner.events.subscribe()
    }
}

/// An [`UpdateResponder`] for the mock runtime: accept/reject just records
/// the decision, since there's no real peer transport to notify.
#[derive(Debug)]
pub struct MockResponder {
    accepted: Arc<Mutex<Option<bool>>>,
}

impl Default for MockResponder {
    fn default() -> Self {
        Self {
            accepted: Arc::new(Mutex::new(None)),
        }
    }
}

impl MockResponder {
    pub fn decision(&self) -> Option<bool> {
        *self.accepted.lock()
    }
}

#[async_trait]
impl UpdateResponder for MockResponder {
    async fn accept(&self) -> SessionResult<()> {
        *self.accepted.lock() = Some(true);
        Ok(())
    }

    async fn reject(&self, _reason: String) -> SessionResult<()> {
        *self.accepted.lock() = Some(false);
        Ok(())
    }
}

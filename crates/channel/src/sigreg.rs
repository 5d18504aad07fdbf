//! The signature registry (C4): an in-process rendezvous point matching a
//! buyer awaiting a credential against the issuer's eventual Cert update.

use std::sync::Arc;

use credswap_core::{Address, DocHash};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::error::{SessionError, SessionResult};
use crate::runtime::UpdateResponder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Key {
    issuer: Address,
    doc_hash: DocHash,
}

/// What a buyer receives once the issuer's Cert update arrives: the
/// signature itself, and the exact update responder the buyer must
/// accept or reject.
#[derive(Debug)]
pub struct CredentialProposal {
    pub signature: [u8; 65],
    pub responder: Arc<dyn UpdateResponder>,
}

/// The awaitable handle returned by [`SignatureRegistry::register`].
#[derive(Debug)]
pub struct Awaitable {
    rx: oneshot::Receiver<CredentialProposal>,
}

impl Awaitable {
    /// Waits for delivery, or for `cancel` to fire.
    pub async fn r#await(self, cancel: &CancellationToken) -> SessionResult<CredentialProposal> {
        tokio::select! {
            result = self.rx => result.map_err(|_| SessionError::Cancelled),
            _ = cancel.cancelled() => Err(SessionError::Cancelled),
        }
    }
}

/// Rendezvous map keyed by `(issuer, docHash)`, with a capacity-one slot
/// per key.
#[derive(Debug, Default)]
pub struct SignatureRegistry {
    slots: DashMap<Key, oneshot::Sender<CredentialProposal>>,
}

impl SignatureRegistry {
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    /// Registers a fresh slot for `(issuer, doc_hash)`. Fails if one is
    /// already live.
    pub fn register(&self, doc_hash: DocHash, issuer: Address) -> SessionResult<Awaitable> {
        let key = Key { issuer, doc_hash };
        match self.slots.entry(key) {
            Entry::Occupied(_) => Err(SessionError::AlreadyRegistered),
            Entry::Vacant(v) => {
                let (tx, rx) = oneshot::channel();
                v.insert(tx);
                Ok(Awaitable { rx })
            }
        }
    }

    /// Delivers `proposal` to the awaiter for `(issuer, doc_hash)`, if any.
    /// A no-op if nobody is waiting.
    pub fn push(&self, doc_hash: DocHash, issuer: Address, proposal: CredentialProposal) {
        let key = Key { issuer, doc_hash };
        if let Some((_, tx)) = self.slots.remove(&key) {
            // Dropping the result is intentional: the awaiter may have been
            // cancelled and dropped its receiver between registration and
            // delivery, which is not an error for the pusher.
            let _ = tx.send(proposal);
        }
    }

    /// Explicitly frees a slot the caller no longer intends to await.
    /// A no-op if already absent or delivered.
    pub fn unregister(&self, doc_hash: DocHash, issuer: Address) {
        let key = Key { issuer, doc_hash };
        self.slots.remove(&key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credswap_core::compute_document_hash;

    #[derive(Debug)]
    struct NullResponder;

    #[async_trait::async_trait]
    impl UpdateResponder for NullResponder {
        async fn accept(&self) -> SessionResult<()> {
            Ok(())
        }
        async fn reject(&self, _reason: String) -> SessionResult<()> {
            Ok(())
        }
    }

    fn key_parts() -> (DocHash, Address) {
        (compute_document_hash(b"doc"), Address::repeat_byte(1))
    }

    #[tokio::test]
    async fn register_push_await_round_trips() {
        let reg = SignatureRegistry::new();
        let (hash, issuer) = key_parts();
        let awaitable = reg.register(hash, issuer).unwrap();

        reg.push(
            hash,
            issuer,
            CredentialProposal {
                signature: [9u8; 65],
                responder: Arc::new(NullResponder),
            },
        );

        let cancel = CancellationToken::new();
        let delivered = awaitable.r#await(&cancel).await.unwrap();
        assert_eq!(delivered.signature, [9u8; 65]);
    }

    #[test]
    fn double_register_is_rejected() {
        let reg = SignatureRegistry::new();
        let (hash, issuer) = key_parts();
        let _first = reg.register(hash, issuer).unwrap();
        assert!(matches!(
            reg.register(hash, issuer),
            Err(SessionError::AlreadyRegistered)
        ));
    }

    #[test]
    fn push_without_register_is_noop() {
        let reg = SignatureRegistry::new();
        let (hash, issuer) = key_parts();
        reg.push(
            hash,
            issuer,
            CredentialProposal {
                signature: [1u8; 65],
                responder: Arc::new(NullResponder),
            },
        );
        // No panic, no residual slot.
        assert!(reg.register(hash, issuer).is_ok());
    }

    #[tokio::test]
    async fn cancelled_await_frees_via_unregister() {
        let reg = SignatureRegistry::new();
        let (hash, issuer) = key_parts();
        let awaitable = reg.register(hash, issuer).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(matches!(
            awaitable.r#await(&cancel).await,
            Err(SessionError::Cancelled)
        ));

        reg.unregister(hash, issuer);
        assert!(reg.register(hash, issuer).is_ok());
    }
}

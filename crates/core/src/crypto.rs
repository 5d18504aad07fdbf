//! Recoverable-signature primitives: document hashing, signing, and
//! signer-recovery verification.
//!
//! The wire format is the 65-byte `r || s || v` layout with `v` in the
//! legacy `{27, 28}` range, matching what the on-chain arbiter recovers
//! against.

use alloy::primitives::{keccak256, Address, Signature, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer as _;
use tracing::{debug, warn};

use crate::error::{CoreError, CoreResult};

const SIG_LEN: usize = 65;
const V_OFFSET: usize = 64;

/// secp256k1 group order / 2, used to reject non-canonical (high-`s`) signatures.
const SECP256K1_HALF_ORDER: [u8; 32] = [
    0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0x5d, 0x57, 0x6e, 0x73, 0x57, 0xa4, 0x50, 0x1d, 0xdf, 0xe9, 0x2f, 0x46, 0x68, 0x1b,
    0x20, 0xa0,
];

/// keccak256 of an arbitrary document.
pub fn compute_document_hash(doc: &[u8]) -> B256 {
    keccak256(doc)
}

/// A local signer wrapping a private key, used by an issuer to sign
/// credential documents.
#[derive(Debug, Clone)]
pub struct CredentialSigner {
    inner: PrivateKeySigner,
}

impl CredentialSigner {
    pub fn new(signer: PrivateKeySigner) -> Self {
        Self { inner: signer }
    }

    pub fn address(&self) -> Address {
        self.inner.address()
    }

    /// Signs `hash` and returns the 65-byte wire-format signature.
    pub async fn sign(&self, hash: B256) -> CoreResult<[u8; SIG_LEN]> {
        let sig = self.inner.sign_hash(&hash).await.map_err(|e| {
            warn!(error = %e, %hash, "signing document hash failed");
            CoreError::Sign(e.to_string())
        })?;
        debug!(address = %self.address(), %hash, "signed document hash");
        Ok(sig.as_bytes())
    }
}

fn validate_wire_shape(sig: &[u8]) -> CoreResult<()> {
    if sig.len() != SIG_LEN {
        return Err(CoreError::MalformedSig(format!(
            "expected {SIG_LEN} bytes, got {}",
            sig.len()
        )));
    }
    let v = sig[V_OFFSET];
    if v != 27 && v != 28 {
        return Err(CoreError::MalformedSig(format!(
            "recovery byte {v} not in {{27,28}}"
        )));
    }
    let s = &sig[32..64];
    if s > &SECP256K1_HALF_ORDER[..] {
        return Err(CoreError::MalformedSig(
            "s is above the secp256k1 half order".into(),
        ));
    }
    Ok(())
}

/// Recovers the signer of `(hash, sig)` and checks it matches `expected`.
pub fn verify_sig(sig: &[u8], hash: B256, expected: Address) -> CoreResult<()> {
    validate_wire_shape(sig)?;

    let mut raw = [0u8; SIG_LEN];
    raw.copy_from_slice(sig);
    let parity = raw[V_OFFSET] != 27;
    let signature = Signature::from_bytes_and_parity(&raw[..64], parity)
        .map_err(|e| CoreError::MalformedSig(e.to_string()))?;

    let recovered = signature
        .recover_address_from_prehash(&hash)
        .map_err(|e| CoreError::SignatureVerification(e.to_string()))?;

    if recovered != expected {
        warn!(%recovered, %expected, "signature recovered to an unexpected signer");
        return Err(CoreError::InvalidSigner);
    }
    Ok(())
}

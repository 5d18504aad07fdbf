//! Wire codec for [`AppData`](crate::data::AppData).
//!
//! Every state's app data is framed as `(mode: u8, data: bytes)`, ABI-tuple
//! encoded and prefixed with a 2-byte big-endian length. The inner `data`
//! is itself ABI-tuple encoded for `Offer`, or the raw 65-byte signature for
//! `Cert`. This exactly mirrors the layout the on-chain arbiter decodes.

use alloy::primitives::{Address, Bytes, FixedBytes, U256};
use alloy::sol_types::{sol_data, SolType, SolValue};
use tracing::warn;

use crate::data::AppData;
use crate::error::{CoreError, CoreResult};

const MODE_DEFAULT: u8 = 0;
const MODE_OFFER: u8 = 1;
const MODE_CERT: u8 = 2;

const SIG_LEN: usize = 65;

type OfferTuple = (Address, FixedBytes<32>, U256, u16);
// `u8` has no direct `SolValue` impl (ambiguous with `bytes1`), so the frame's
// leading mode byte is encoded via the underlying `SolType` (`uint8`) instead.
type FrameTuple = (sol_data::Uint<8>, sol_data::Bytes);

/// Encodes `data` into its length-prefixed wire frame.
pub fn encode(data: &AppData) -> Vec<u8> {
    let (mode, body) = match data {
        AppData::Default => (MODE_DEFAULT, Vec::new()),
        AppData::Offer {
            issuer,
            data_hash,
            price,
            buyer,
        } => {
            let tuple: OfferTuple = (*issuer, *data_hash, *price, *buyer);
            (MODE_OFFER, tuple.abi_encode_params())
        }
        AppData::Cert { signature } => (MODE_CERT, signature.to_vec()),
    };

    let encoded = FrameTuple::abi_encode_params(&(mode, Bytes::from(body)));

    let len = u16::try_from(encoded.len()).expect("abi frame exceeds u16 length");
    let mut out = Vec::with_capacity(2 + encoded.len());
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(&encoded);
    out
}

/// Decodes a length-prefixed wire frame back into [`AppData`].
pub fn decode(wire: &[u8]) -> CoreResult<AppData> {
    if wire.len() < 2 {
        warn!(len = wire.len(), "frame shorter than the length prefix");
        return Err(CoreError::BadFrame("missing length prefix".into()));
    }
    let len = u16::from_be_bytes([wire[0], wire[1]]) as usize;
    let body = wire.get(2..2 + len).ok_or_else(|| {
        warn!(declared = len, actual = wire.len() - 2, "declared frame length exceeds input");
        CoreError::BadFrame(format!("declared length {len} exceeds input"))
    })?;

    let (mode, data): (u8, Bytes) = FrameTuple::abi_decode_params(body, true).map_err(|e| {
        warn!(error = %e, "abi-decoding frame tuple failed");
        CoreError::BadFrame(e.to_string())
    })?;

    match mode {
        MODE_DEFAULT => Ok(AppData::Default),
        MODE_OFFER => {
            let (issuer, data_hash, price, buyer) =
                OfferTuple::abi_decode_params(&data, true)
                    .map_err(|e| CoreError::BadFrame(e.to_string()))?;
            Ok(AppData::Offer {
                issuer,
                data_hash,
                price,
                buyer,
            })
        }
        MODE_CERT => {
            if data.len() != SIG_LEN {
                return Err(CoreError::BadFrame(format!(
                    "cert payload length {} != {SIG_LEN}",
                    data.len()
                )));
            }
            let mut signature = [0u8; SIG_LEN];
            signature.copy_from_slice(&data);
            Ok(AppData::Cert { signature })
        }
        other => {
            warn!(mode = other, "unknown app-data mode");
            Err(CoreError::UnknownMode(other))
        }
    }
}

//! Channel data model: allocations, parameters, state, and the tagged-union
//! application data embedded in every state.

use alloy::primitives::{Address, FixedBytes, U256};

/// 32-byte channel identifier.
pub type ChannelId = FixedBytes<32>;

/// 32-byte keccak256 document digest.
pub type DocHash = FixedBytes<32>;

/// Zero-based index of a channel participant.
pub type ParticipantIdx = u16;

/// A sub-allocation locked into a dependent (virtual) channel.
///
/// This protocol never opens virtual channels; the field exists purely so
/// [`Allocation`] mirrors the on-chain `Channel.Allocation` struct shape.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LockedAllocation {
    pub id: ChannelId,
    pub balances: Vec<U256>,
}

/// Asset balances for a channel, indexed `[asset][participant]`.
///
/// The protocol only ever uses a single asset; `assert_single_asset` enforces
/// that at the boundary the predicate cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub assets: Vec<Address>,
    pub balances: Vec<Vec<U256>>,
    pub locked: Vec<LockedAllocation>,
}

impl Allocation {
    pub fn single_asset(asset: Address, balances: Vec<U256>) -> Self {
        Self {
            assets: vec![asset],
            balances: vec![balances],
            locked: Vec::new(),
        }
    }

    pub fn num_participants(&self) -> usize {
        self.balances.first().map_or(0, Vec::len)
    }

    /// Balance of `participant` in the single-asset slot.
    pub fn balance(&self, asset_idx: usize, participant: usize) -> U256 {
        self.balances[asset_idx][participant]
    }
}

/// Parameters fixed for the lifetime of a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelParams {
    pub participants: Vec<Address>,
    pub challenge_duration: u64,
}

/// Tagged-union application data carried in every channel state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppData {
    /// No swap in progress.
    Default,
    /// A buyer's open offer to purchase a credential.
    Offer {
        issuer: Address,
        data_hash: DocHash,
        price: U256,
        buyer: ParticipantIdx,
    },
    /// An issuer's signed certificate settling an offer.
    Cert { signature: [u8; 65] },
}

impl AppData {
    pub fn as_offer(&self) -> Option<(Address, DocHash, U256, ParticipantIdx)> {
        match self {
            AppData::Offer {
                issuer,
                data_hash,
                price,
                buyer,
            } => Some((*issuer, *data_hash, *price, *buyer)),
            _ => None,
        }
    }

    pub fn as_cert(&self) -> Option<[u8; 65]> {
        match self {
            AppData::Cert { signature } => Some(*signature),
            _ => None,
        }
    }
}

/// A single channel state: the object the transition predicate validates
/// one step of at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelState {
    pub id: ChannelId,
    pub version: u64,
    pub outcome: Allocation,
    pub data: AppData,
    pub is_final: bool,
}

impl ChannelState {
    pub fn new(id: ChannelId, outcome: Allocation) -> Self {
        Self {
            id,
            version: 0,
            outcome,
            data: AppData::Default,
            is_final: false,
        }
    }
}

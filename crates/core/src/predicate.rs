//! The deterministic transition predicate gating every off-chain (and,
//! mirrored on-chain, every forced) channel update.

use alloy::primitives::U256;
use tracing::warn;

use crate::crypto::verify_sig;
use crate::data::{AppData, ChannelParams, ChannelState, ParticipantIdx};
use crate::error::{CoreError, CoreResult};

const ASSET_IDX: usize = 0;

/// Validates the transition from `cur` to `next`, proposed by `actor`.
///
/// Pure and side-effect-free: a function only of its four inputs, so both
/// parties and the on-chain arbiter reach the same verdict.
pub fn valid_transition(
    _params: &ChannelParams,
    cur: &ChannelState,
    next: &ChannelState,
    actor: ParticipantIdx,
) -> CoreResult<()> {
    assert_single_constant_asset(cur, next)?;

    let Some((issuer, data_hash, price, buyer)) = cur.data.as_offer() else {
        // Not in offer mode: the allocation must not change.
        if cur.outcome.balances != next.outcome.balances {
            return Err(CoreError::UnequalBalances);
        }
        if let Some((_, _, offer_price, offer_buyer)) = next.data.as_offer() {
            let buyer_balance = cur.outcome.balance(ASSET_IDX, offer_buyer as usize);
            if buyer_balance < offer_price {
                return Err(CoreError::InsufficientFunds {
                    needed: offer_price.to_string(),
                    have: buyer_balance.to_string(),
                });
            }
        }
        return Ok(());
    };

    // `cur` carries an open offer: `next` must settle it with a certificate.
    let signature = next.data.as_cert().ok_or(CoreError::InvalidNextData)?;
    verify_sig(&signature, data_hash, issuer)
        .map_err(|e| CoreError::SignatureVerification(e.to_string()))?;

    let buyer_idx = buyer as usize;
    let actor_idx = actor as usize;

    let expected_buyer_bal = cur.outcome.balance(ASSET_IDX, buyer_idx) - price;
    let got_buyer_bal = next.outcome.balance(ASSET_IDX, buyer_idx);
    if got_buyer_bal != expected_buyer_bal {
        return Err(CoreError::BalanceMismatch {
            index: buyer,
            expected: expected_buyer_bal.to_string(),
            got: got_buyer_bal.to_string(),
        });
    }

    let expected_actor_bal = cur.outcome.balance(ASSET_IDX, actor_idx) + price;
    let got_actor_bal = next.outcome.balance(ASSET_IDX, actor_idx);
    if got_actor_bal != expected_actor_bal {
        return Err(CoreError::BalanceMismatch {
            index: actor,
            expected: expected_actor_bal.to_string(),
            got: got_actor_bal.to_string(),
        });
    }

    for p in 0..cur.outcome.num_participants() {
        if p == buyer_idx || p == actor_idx {
            continue;
        }
        let bal = cur.outcome.balance(ASSET_IDX, p);
        if next.outcome.balance(ASSET_IDX, p) != bal {
            return Err(CoreError::BalanceMismatch {
                index: p as u16,
                expected: bal.to_string(),
                got: next.outcome.balance(ASSET_IDX, p).to_string(),
            });
        }
    }

    Ok(())
}

fn assert_single_constant_asset(cur: &ChannelState, next: &ChannelState) -> CoreResult<()> {
    if cur.outcome.assets.len() != 1 {
        return Err(CoreError::WrongAssetCount("current"));
    }
    if next.outcome.assets.len() != 1 {
        return Err(CoreError::WrongAssetCount("next"));
    }
    if cur.outcome.assets[0] != next.outcome.assets[0] {
        return Err(CoreError::AssetMismatch);
    }
    let current = cur.outcome.num_participants();
    let next_count = next.outcome.num_participants();
    if current != next_count {
        warn!(current, next = next_count, "participant count changed across transition");
        return Err(CoreError::ParticipantCountMismatch {
            current,
            next: next_count,
        });
    }
    Ok(())
}

#[allow(dead_code)]
fn total_balance(balances: &[U256]) -> U256 {
    balances.iter().fold(U256::ZERO, |a, b| a + *b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Allocation;
    use alloy::primitives::{address, FixedBytes};

    fn params() -> ChannelParams {
        ChannelParams {
            participants: vec![
                address!("0000000000000000000000000000000000000001"),
                address!("0000000000000000000000000000000000000002"),
            ],
            challenge_duration: 60,
        }
    }

    fn base_state(data: AppData, balances: Vec<u64>) -> ChannelState {
        let asset = address!("0000000000000000000000000000000000000aaa"[2..]);
        let balances = balances.into_iter().map(U256::from).collect();
        ChannelState {
            id: FixedBytes::from([1u8; 32]),
            version: 0,
            outcome: Allocation::single_asset(asset, balances),
            data,
            is_final: false,
        }
    }

    #[test]
    fn accepts_no_op_default_transition() {
        let p = params();
        let cur = base_state(AppData::Default, vec![5_000_000, 0]);
        let mut next = cur.clone();
        next.version += 1;
        assert!(valid_transition(&p, &cur, &next, 0).is_ok());
    }

    #[test]
    fn rejects_balance_change_without_offer() {
        let p = params();
        let cur = base_state(AppData::Default, vec![5_000_000, 0]);
        let mut next = cur.clone();
        next.outcome.balances[0][0] = U256::from(4_000_000u64);
        next.outcome.balances[0][1] = U256::from(1_000_000u64);
        assert!(matches!(
            valid_transition(&p, &cur, &next, 0),
            Err(CoreError::UnequalBalances)
        ));
    }

    #[test]
    fn rejects_opening_offer_with_insufficient_funds() {
        let p = params();
        let cur = base_state(AppData::Default, vec![500_000, 0]);
        let mut next = cur.clone();
        next.data = AppData::Offer {
            issuer: address!("0000000000000000000000000000000000000002"),
            data_hash: FixedBytes::from([7u8; 32]),
            price: U256::from(1_000_000u64),
            buyer: 0,
        };
        assert!(matches!(
            valid_transition(&p, &cur, &next, 0),
            Err(CoreError::InsufficientFunds { .. })
        ));
    }

    #[test]
    fn rejects_offer_settlement_with_wrong_next_data() {
        let p = params();
        let cur = base_state(
            AppData::Offer {
                issuer: address!("0000000000000000000000000000000000000002"),
                data_hash: FixedBytes::from([7u8; 32]),
                price: U256::from(1_000_000u64),
                buyer: 0,
            },
            vec![5_000_000, 0],
        );
        let mut next = cur.clone();
        next.data = AppData::Default;
        assert!(matches!(
            valid_transition(&p, &cur, &next, 1),
            Err(CoreError::InvalidNextData)
        ));
    }

    #[test]
    fn rejects_participant_count_change_before_indexing_balances() {
        let p = params();
        let cur = base_state(AppData::Default, vec![5_000_000, 0]);
        let mut next = cur.clone();
        next.outcome.balances[0].pop();
        assert!(matches!(
            valid_transition(&p, &cur, &next, 0),
            Err(CoreError::ParticipantCountMismatch { current: 2, next: 1 })
        ));
    }
}

//! Typed ABI mirror of the on-chain arbiter's `validTransition` interface.
//!
//! This crate never deploys or calls the contract; the interface exists so
//! callers that do construct calldata for the real arbiter (out of scope
//! here) share one source of truth for the selector and argument layout
//! with [`crate::predicate::valid_transition`].

use alloy::sol;

sol! {
    /// Mirrors `Channel.Allocation` from the on-chain channel library.
    #[derive(Debug)]
    struct SolAllocation {
        address[] assets;
        uint256[][] balances;
    }

    /// Mirrors `Channel.Params`.
    #[derive(Debug)]
    struct SolParams {
        address[] participants;
        uint256 challengeDuration;
    }

    /// Mirrors `Channel.State`.
    #[derive(Debug)]
    struct SolState {
        bytes32 id;
        uint64 version;
        SolAllocation outcome;
        bytes data;
        bool isFinal;
    }

    /// The credential-swap app's on-chain transition predicate.
    interface ICredentialSwapApp {
        function validTransition(
            SolParams calldata params,
            SolState calldata from,
            SolState calldata to,
            uint256 actorIdx
        ) external view;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::sol_types::SolCall;

    #[test]
    fn selector_is_four_bytes() {
        assert_eq!(ICredentialSwapApp::validTransitionCall::SELECTOR.len(), 4);
    }
}

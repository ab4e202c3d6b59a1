//! Unconditional transfer variants.
//!
//! These variants carry two funded `(recipient, amount)` pairs and admit no
//! actions at all: the outcome is computed directly from the funded state.
//! [DirectTransfer] pays the pairs as-is; [SwapTransfer] pays them with the
//! amounts exchanged, which is how a payment channel redirects its funding.

use crate::codec::decode;
use alloy_primitives::{Address, U256};
use alloy_sol_types::{sol, SolType};
use arbiter_primitives::{
    default_turn_taker, AppDefinition, Application, CoinTransfer, Outcome, ProtocolError,
};

type TransferSchema = sol! { tuple(uint256, address, uint256, address, uint256) };

/// The decoded state of an unconditional transfer: a version and two funded
/// payout pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferState {
    /// The mandatory, monotonically increasing state version.
    pub version: U256,
    /// The first funded pair.
    pub first: CoinTransfer,
    /// The second funded pair.
    pub second: CoinTransfer,
}

impl TransferState {
    /// Encodes this state into its canonical buffer.
    pub fn encode(&self) -> Vec<u8> {
        TransferSchema::abi_encode(&(
            self.version,
            self.first.to,
            self.first.amount,
            self.second.to,
            self.second.amount,
        ))
    }

    /// Decodes a state buffer, failing fast on any schema mismatch.
    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        let (version, first_to, first_amount, second_to, second_amount) =
            decode::<TransferSchema>(buf, "transfer state")?;
        Ok(Self {
            version,
            first: CoinTransfer {
                to: first_to,
                amount: first_amount,
            },
            second: CoinTransfer {
                to: second_to,
                amount: second_amount,
            },
        })
    }
}

/// Unconditional transfer paying the funded pairs as-is.
#[derive(Debug, Clone, Copy)]
pub struct DirectTransfer;

/// Unconditional transfer paying the funded pairs with amounts exchanged.
#[derive(Debug, Clone, Copy)]
pub struct SwapTransfer;

fn turn_taker(state: &[u8], participants: &[Address]) -> Result<Address, ProtocolError> {
    let state = TransferState::decode(state)?;
    default_turn_taker(state.version, participants)
}

impl Application for DirectTransfer {
    fn definition(&self) -> AppDefinition {
        AppDefinition::DirectTransfer
    }

    fn is_state_terminal(&self, state: &[u8]) -> Result<bool, ProtocolError> {
        TransferState::decode(state)?;
        // With no actions to apply, every valid state is terminal.
        Ok(true)
    }

    fn get_turn_taker(
        &self,
        state: &[u8],
        participants: &[Address],
    ) -> Result<Address, ProtocolError> {
        turn_taker(state, participants)
    }

    fn apply_action(
        &self,
        _state: &[u8],
        _action: &[u8],
        _block_height: u64,
    ) -> Result<Vec<u8>, ProtocolError> {
        Err(ProtocolError::precondition(
            "unconditional transfer admits no actions",
        ))
    }

    fn compute_outcome(
        &self,
        state: &[u8],
        _block_height: u64,
    ) -> Result<Outcome, ProtocolError> {
        let state = TransferState::decode(state)?;
        Ok(Outcome::Transfers(vec![state.first, state.second]))
    }
}

impl Application for SwapTransfer {
    fn definition(&self) -> AppDefinition {
        AppDefinition::SwapTransfer
    }

    fn is_state_terminal(&self, state: &[u8]) -> Result<bool, ProtocolError> {
        TransferState::decode(state)?;
        Ok(true)
    }

    fn get_turn_taker(
        &self,
        state: &[u8],
        participants: &[Address],
    ) -> Result<Address, ProtocolError> {
        turn_taker(state, participants)
    }

    fn apply_action(
        &self,
        _state: &[u8],
        _action: &[u8],
        _block_height: u64,
    ) -> Result<Vec<u8>, ProtocolError> {
        Err(ProtocolError::precondition(
            "unconditional transfer admits no actions",
        ))
    }

    fn compute_outcome(
        &self,
        state: &[u8],
        _block_height: u64,
    ) -> Result<Outcome, ProtocolError> {
        let state = TransferState::decode(state)?;
        Ok(Outcome::Transfers(vec![
            CoinTransfer {
                to: state.first.to,
                amount: state.second.amount,
            },
            CoinTransfer {
                to: state.second.to,
                amount: state.first.amount,
            },
        ]))
    }
}

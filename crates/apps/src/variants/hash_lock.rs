//! Hash-locked transfer variant.
//!
//! Funds move from payer to payee only if the payee reveals the preimage of
//! the lock hash before the expiry height. Missing the expiry returns the
//! original funded split.

use crate::codec::decode;
use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::{sol, SolType};
use arbiter_primitives::{
    AppDefinition, Application, CoinTransfer, Outcome, ProtocolError,
};

type HashLockStateSchema = sol! {
    tuple(uint256, address, uint256, address, uint256, bytes32, bytes, uint256, bool)
};
type HashLockActionSchema = sol! { tuple(bytes,) };

/// The decoded state of a hash-locked transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashLockState {
    /// The mandatory, monotonically increasing state version.
    pub version: U256,
    /// The funded payer pair.
    pub payer: CoinTransfer,
    /// The funded payee pair.
    pub payee: CoinTransfer,
    /// keccak256 of the preimage that unlocks the transfer.
    pub lock_hash: B256,
    /// The revealed preimage; empty until a successful reveal.
    pub preimage: Bytes,
    /// The block height after which the lock can no longer be opened.
    pub expiry: U256,
    /// Set once the preimage has been revealed and the funds redirected.
    pub finalized: bool,
}

impl HashLockState {
    /// Encodes this state into its canonical buffer.
    pub fn encode(&self) -> Vec<u8> {
        HashLockStateSchema::abi_encode(&(
            self.version,
            self.payer.to,
            self.payer.amount,
            self.payee.to,
            self.payee.amount,
            self.lock_hash,
            self.preimage.clone(),
            self.expiry,
            self.finalized,
        ))
    }

    /// Decodes a state buffer, failing fast on any schema mismatch.
    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        let (version, payer, payer_amount, payee, payee_amount, lock_hash, preimage, expiry, finalized) =
            decode::<HashLockStateSchema>(buf, "hash lock state")?;
        Ok(Self {
            version,
            payer: CoinTransfer {
                to: payer,
                amount: payer_amount,
            },
            payee: CoinTransfer {
                to: payee,
                amount: payee_amount,
            },
            lock_hash,
            preimage: preimage.into(),
            expiry,
            finalized,
        })
    }
}

/// The reveal action of a hash-locked transfer: the claimed preimage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashLockAction {
    /// The claimed preimage of the lock hash.
    pub preimage: Bytes,
}

impl HashLockAction {
    /// Encodes this action into its canonical buffer.
    pub fn encode(&self) -> Vec<u8> {
        HashLockActionSchema::abi_encode(&(self.preimage.clone(),))
    }

    /// Decodes an action buffer, failing fast on any schema mismatch.
    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        let (preimage,) = decode::<HashLockActionSchema>(buf, "hash lock action")?;
        Ok(Self {
            preimage: preimage.into(),
        })
    }
}

/// Transfer unlocked by revealing a hash preimage before an expiry height.
#[derive(Debug, Clone, Copy)]
pub struct HashLockTransfer;

impl Application for HashLockTransfer {
    fn definition(&self) -> AppDefinition {
        AppDefinition::HashLockTransfer
    }

    fn is_state_terminal(&self, state: &[u8]) -> Result<bool, ProtocolError> {
        Ok(HashLockState::decode(state)?.finalized)
    }

    fn get_turn_taker(
        &self,
        state: &[u8],
        _participants: &[Address],
    ) -> Result<Address, ProtocolError> {
        // Fixed turn-taker: only the payee can act, by revealing the preimage.
        Ok(HashLockState::decode(state)?.payee.to)
    }

    fn apply_action(
        &self,
        state: &[u8],
        action: &[u8],
        block_height: u64,
    ) -> Result<Vec<u8>, ProtocolError> {
        let state = HashLockState::decode(state)?;
        let action = HashLockAction::decode(action)?;

        if state.finalized {
            return Err(ProtocolError::precondition("transfer already finalized"));
        }
        if U256::from(block_height) > state.expiry {
            return Err(ProtocolError::precondition(format!(
                "lock expired at height {}, current height {block_height}",
                state.expiry
            )));
        }
        if keccak256(&action.preimage) != state.lock_hash {
            return Err(ProtocolError::precondition(
                "revealed preimage does not match lock hash",
            ));
        }

        let total = state.payer.amount + state.payee.amount;
        Ok(HashLockState {
            version: state.version + U256::from(1),
            payer: CoinTransfer {
                to: state.payer.to,
                amount: U256::ZERO,
            },
            payee: CoinTransfer {
                to: state.payee.to,
                amount: total,
            },
            preimage: action.preimage,
            finalized: true,
            ..state
        }
        .encode())
    }

    fn compute_outcome(
        &self,
        state: &[u8],
        block_height: u64,
    ) -> Result<Outcome, ProtocolError> {
        let state = HashLockState::decode(state)?;

        if !state.finalized && U256::from(block_height) < state.expiry {
            return Err(ProtocolError::precondition(format!(
                "lock is still open until height {}; outcome not yet determinable",
                state.expiry
            )));
        }

        // Finalized: pay as transitioned. Expired unrevealed: the original
        // split stands.
        Ok(Outcome::Transfers(vec![state.payer, state.payee]))
    }
}

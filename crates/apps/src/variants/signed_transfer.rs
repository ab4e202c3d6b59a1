//! Signed conditional transfer variant.
//!
//! Funds move from payer to payee once the payee presents arbitrary data
//! signed by the authorized signer over `(data, paymentId)`.

use crate::codec::decode;
use crate::signatures::recover_signer;
use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::{sol, SolType, SolValue};
use arbiter_primitives::{
    AppDefinition, Application, CoinTransfer, Outcome, ProtocolError,
};

type SignedTransferStateSchema = sol! {
    tuple(uint256, address, bytes32, address, uint256, address, uint256, bool)
};
type SignedTransferActionSchema = sol! { tuple(bytes, bytes) };

/// The decoded state of a signed conditional transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransferState {
    /// The mandatory, monotonically increasing state version.
    pub version: U256,
    /// The address whose signature releases the funds.
    pub signer: Address,
    /// The payment identifier bound into every authorization.
    pub payment_id: B256,
    /// The funded payer pair.
    pub payer: CoinTransfer,
    /// The funded payee pair.
    pub payee: CoinTransfer,
    /// Set once a valid authorization has redirected the funds.
    pub finalized: bool,
}

impl SignedTransferState {
    /// Encodes this state into its canonical buffer.
    pub fn encode(&self) -> Vec<u8> {
        SignedTransferStateSchema::abi_encode(&(
            self.version,
            self.signer,
            self.payment_id,
            self.payer.to,
            self.payer.amount,
            self.payee.to,
            self.payee.amount,
            self.finalized,
        ))
    }

    /// Decodes a state buffer, failing fast on any schema mismatch.
    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        let (version, signer, payment_id, payer, payer_amount, payee, payee_amount, finalized) =
            decode::<SignedTransferStateSchema>(buf, "signed transfer state")?;
        Ok(Self {
            version,
            signer,
            payment_id,
            payer: CoinTransfer {
                to: payer,
                amount: payer_amount,
            },
            payee: CoinTransfer {
                to: payee,
                amount: payee_amount,
            },
            finalized,
        })
    }
}

/// The unlock action of a signed transfer: arbitrary data plus the
/// authorized signer's 65-byte signature over `(data, paymentId)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransferAction {
    /// The signed payload.
    pub data: Bytes,
    /// The 65-byte `(r, s, v)` signature.
    pub signature: Bytes,
}

impl SignedTransferAction {
    /// Encodes this action into its canonical buffer.
    pub fn encode(&self) -> Vec<u8> {
        SignedTransferActionSchema::abi_encode(&(self.data.clone(), self.signature.clone()))
    }

    /// Decodes an action buffer, failing fast on any schema mismatch.
    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        let (data, signature) = decode::<SignedTransferActionSchema>(buf, "signed transfer action")?;
        Ok(Self {
            data: data.into(),
            signature: signature.into(),
        })
    }
}

/// The digest the authorized signer must sign to release the funds.
pub(crate) fn authorization_digest(data: &Bytes, payment_id: B256) -> B256 {
    keccak256((data.clone(), payment_id).abi_encode())
}

/// Transfer unlocked by a signature from an authorized signer.
#[derive(Debug, Clone, Copy)]
pub struct SignedTransfer;

impl Application for SignedTransfer {
    fn definition(&self) -> AppDefinition {
        AppDefinition::SignedTransfer
    }

    fn is_state_terminal(&self, state: &[u8]) -> Result<bool, ProtocolError> {
        Ok(SignedTransferState::decode(state)?.finalized)
    }

    fn get_turn_taker(
        &self,
        state: &[u8],
        _participants: &[Address],
    ) -> Result<Address, ProtocolError> {
        // Fixed turn-taker: only the payee can act, by presenting the
        // signer's authorization.
        Ok(SignedTransferState::decode(state)?.payee.to)
    }

    fn apply_action(
        &self,
        state: &[u8],
        action: &[u8],
        _block_height: u64,
    ) -> Result<Vec<u8>, ProtocolError> {
        let state = SignedTransferState::decode(state)?;
        let action = SignedTransferAction::decode(action)?;

        if state.finalized {
            return Err(ProtocolError::precondition("transfer already finalized"));
        }

        let digest = authorization_digest(&action.data, state.payment_id);
        let recovered = recover_signer(digest, &action.signature)?;
        if recovered != state.signer {
            return Err(ProtocolError::BadSignature {
                reason: format!(
                    "authorization recovered to {recovered}, expected {}",
                    state.signer
                ),
            });
        }

        let total = state.payer.amount + state.payee.amount;
        Ok(SignedTransferState {
            version: state.version + U256::from(1),
            payer: CoinTransfer {
                to: state.payer.to,
                amount: U256::ZERO,
            },
            payee: CoinTransfer {
                to: state.payee.to,
                amount: total,
            },
            finalized: true,
            ..state
        }
        .encode())
    }

    fn compute_outcome(
        &self,
        state: &[u8],
        _block_height: u64,
    ) -> Result<Outcome, ProtocolError> {
        let state = SignedTransferState::decode(state)?;
        Ok(Outcome::Transfers(vec![state.payer, state.payee]))
    }
}

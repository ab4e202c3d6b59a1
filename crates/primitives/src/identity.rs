//! Per-channel-instance identity types.

use crate::ProtocolError;
use alloy_primitives::{keccak256, Address, B256, U256};
use alloy_sol_types::SolValue;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

/// The [AppDefinition] enum identifies which application variant a channel
/// instance is running. The set is closed: dispatch over it is exhaustive and
/// versioned with the protocol itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppDefinition {
    /// Unconditional transfer paying the funded pairs as-is.
    DirectTransfer = 0,
    /// Unconditional transfer paying the funded pairs with amounts exchanged.
    SwapTransfer = 1,
    /// Transfer unlocked by revealing a hash preimage before an expiry height.
    HashLockTransfer = 2,
    /// Transfer unlocked by a signature from an authorized signer.
    SignedTransfer = 3,
    /// Two-round commit-reveal dice game.
    HighRoller = 4,
    /// Turn-based board game with explicit win claims.
    TicTacToe = 5,
}

impl TryFrom<u8> for AppDefinition {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AppDefinition::DirectTransfer),
            1 => Ok(AppDefinition::SwapTransfer),
            2 => Ok(AppDefinition::HashLockTransfer),
            3 => Ok(AppDefinition::SignedTransfer),
            4 => Ok(AppDefinition::HighRoller),
            5 => Ok(AppDefinition::TicTacToe),
            _ => Err(ProtocolError::schema(format!(
                "invalid app definition: {value}"
            ))),
        }
    }
}

/// The [AppIdentity] struct is the immutable identity of one funded channel
/// instance, fixed at channel creation by the funding layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppIdentity {
    /// The multisig (channel) address holding the funds.
    pub channel_address: Address,
    /// The per-channel nonce distinguishing successive instances between the
    /// same participants.
    pub channel_nonce: U256,
    /// The ordered list of participant addresses.
    pub participants: Vec<Address>,
    /// The application variant this channel instance runs.
    pub app_definition: AppDefinition,
    /// The default timeout, in block-height units, for each challenge window.
    pub default_timeout: u64,
}

impl AppIdentity {
    /// Returns the canonical key of this channel instance: the keccak256
    /// digest of the ABI encoding of every identity field. Keys the replay
    /// guard and any per-channel storage.
    pub fn channel_key(&self) -> B256 {
        let encoded = (
            self.channel_address,
            self.channel_nonce,
            self.participants.clone(),
            U256::from(self.app_definition as u8),
            U256::from(self.default_timeout),
        )
            .abi_encode();
        keccak256(encoded)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use alloy_primitives::address;

    fn identity(nonce: u64) -> AppIdentity {
        AppIdentity {
            channel_address: address!("00000000000000000000000000000000deadbeef"),
            channel_nonce: U256::from(nonce),
            participants: vec![
                address!("0000000000000000000000000000000000000a11"),
                address!("0000000000000000000000000000000000000b0b"),
            ],
            app_definition: AppDefinition::HighRoller,
            default_timeout: 10,
        }
    }

    #[test]
    fn channel_key_is_deterministic() {
        assert_eq!(identity(1).channel_key(), identity(1).channel_key());
    }

    #[test]
    fn channel_key_separates_instances() {
        assert_ne!(identity(1).channel_key(), identity(2).channel_key());
    }

    #[test]
    fn app_definition_round_trips_through_u8() {
        for value in 0..=5u8 {
            let def = AppDefinition::try_from(value).unwrap();
            assert_eq!(def as u8, value);
        }
        assert!(AppDefinition::try_from(6).is_err());
    }
}

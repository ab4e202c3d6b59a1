//! The universal result type produced once an application is finalized.

use crate::ProtocolError;
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

/// A single `(recipient, amount)` payout entry.
///
/// Zero-amount entries are legal and preserved, so the sum of an outcome's
/// transfers is always checkable against the channel's funded amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinTransfer {
    /// The recipient of the transfer.
    pub to: Address,
    /// The amount transferred.
    pub amount: U256,
}

/// The [TwoPartyOutcome] enum is the symbolic resolution of a strictly
/// two-party binary game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TwoPartyOutcome {
    /// The full funded amount is sent to the first participant.
    SendToFirst = 0,
    /// The full funded amount is sent to the second participant.
    SendToSecond = 1,
    /// The funded amount is split evenly between the two participants.
    SplitAndSend = 2,
}

impl TryFrom<u8> for TwoPartyOutcome {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TwoPartyOutcome::SendToFirst),
            1 => Ok(TwoPartyOutcome::SendToSecond),
            2 => Ok(TwoPartyOutcome::SplitAndSend),
            _ => Err(ProtocolError::schema(format!(
                "invalid two-party outcome discriminant: {value}"
            ))),
        }
    }
}

/// The [Outcome] enum is the final fund-distribution result of an application,
/// consumed by the execution layer. Which shape a variant returns is fixed by
/// its [crate::AppDefinition].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// An ordered list of per-recipient payouts.
    Transfers(Vec<CoinTransfer>),
    /// The three-way resolution of a two-party binary game.
    TwoParty(TwoPartyOutcome),
}

impl Outcome {
    /// Returns the total amount moved by a [Outcome::Transfers] outcome, or
    /// `None` for the symbolic two-party shape.
    pub fn total(&self) -> Option<U256> {
        match self {
            Outcome::Transfers(transfers) => Some(
                transfers
                    .iter()
                    .fold(U256::ZERO, |acc, t| acc.wrapping_add(t.amount)),
            ),
            Outcome::TwoParty(_) => None,
        }
    }

    /// Lowers this outcome into explicit transfers over a two-party funded
    /// split, so both shapes are payable by the execution layer.
    ///
    /// ### Takes
    /// - `participants`: The two participant addresses, in channel order.
    /// - `funded`: The total amount funded into the channel.
    ///
    /// ### Returns
    /// - The explicit payout list, or an error if a two-party outcome is
    ///   lowered against a participant list that is not exactly two long.
    pub fn as_transfers(
        &self,
        participants: &[Address],
        funded: U256,
    ) -> Result<Vec<CoinTransfer>, ProtocolError> {
        match self {
            Outcome::Transfers(transfers) => Ok(transfers.clone()),
            Outcome::TwoParty(resolution) => {
                if participants.len() != 2 {
                    return Err(ProtocolError::precondition(format!(
                        "two-party outcome requires exactly 2 participants, got {}",
                        participants.len()
                    )));
                }
                let (first, second) = (participants[0], participants[1]);
                let split = match resolution {
                    TwoPartyOutcome::SendToFirst => (funded, U256::ZERO),
                    TwoPartyOutcome::SendToSecond => (U256::ZERO, funded),
                    TwoPartyOutcome::SplitAndSend => {
                        let half = funded >> 1;
                        (funded - half, half)
                    }
                };
                Ok(vec![
                    CoinTransfer {
                        to: first,
                        amount: split.0,
                    },
                    CoinTransfer {
                        to: second,
                        amount: split.1,
                    },
                ])
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use alloy_primitives::address;

    const ALICE: Address = address!("0000000000000000000000000000000000000a11");
    const BOB: Address = address!("0000000000000000000000000000000000000b0b");

    #[test]
    fn zero_amount_transfers_are_preserved() {
        let outcome = Outcome::Transfers(vec![
            CoinTransfer {
                to: ALICE,
                amount: U256::ZERO,
            },
            CoinTransfer {
                to: BOB,
                amount: U256::from(100),
            },
        ]);

        let transfers = outcome.as_transfers(&[ALICE, BOB], U256::from(100)).unwrap();
        assert_eq!(transfers.len(), 2);
        assert_eq!(transfers[0].amount, U256::ZERO);
        assert_eq!(outcome.total(), Some(U256::from(100)));
    }

    #[test]
    fn two_party_outcome_lowers_to_transfers() {
        let funded = U256::from(100);

        let first = Outcome::TwoParty(TwoPartyOutcome::SendToFirst)
            .as_transfers(&[ALICE, BOB], funded)
            .unwrap();
        assert_eq!(first[0].amount, funded);
        assert_eq!(first[1].amount, U256::ZERO);

        let split = Outcome::TwoParty(TwoPartyOutcome::SplitAndSend)
            .as_transfers(&[ALICE, BOB], funded)
            .unwrap();
        assert_eq!(split[0].amount, U256::from(50));
        assert_eq!(split[1].amount, U256::from(50));
    }

    #[test]
    fn uneven_split_favors_first_participant() {
        let transfers = Outcome::TwoParty(TwoPartyOutcome::SplitAndSend)
            .as_transfers(&[ALICE, BOB], U256::from(101))
            .unwrap();
        assert_eq!(transfers[0].amount, U256::from(51));
        assert_eq!(transfers[1].amount, U256::from(50));
    }

    #[test]
    fn two_party_outcome_requires_two_participants() {
        let res = Outcome::TwoParty(TwoPartyOutcome::SendToFirst)
            .as_transfers(&[ALICE], U256::from(1));
        assert!(matches!(res, Err(ProtocolError::Precondition { .. })));
    }

    #[test]
    fn invalid_discriminant_is_rejected() {
        assert!(TwoPartyOutcome::try_from(3).is_err());
        assert_eq!(TwoPartyOutcome::try_from(1), Ok(TwoPartyOutcome::SendToSecond));
    }
}

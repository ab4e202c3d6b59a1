//! Two-round commit-reveal dice game.
//!
//! The first player commits to a hidden number via its salted hash, the
//! second player answers with a number in the clear, and the first player
//! then reveals. Four dice are drawn from the mingled numbers, two per
//! player, and the higher total wins. A stalled or cheating player forfeits
//! to the counterparty.

use crate::codec::decode;
use alloy_primitives::{keccak256, Address, B256, U256};
use alloy_sol_types::{sol, SolType, SolValue};
use arbiter_primitives::{
    AppDefinition, Application, Outcome, ProtocolError, TwoPartyOutcome,
};
use std::convert::TryFrom;

type HighRollerStateSchema = sol! { tuple(uint256, uint8, bytes32, uint256, uint256) };
type HighRollerActionSchema = sol! { tuple(uint8, bytes32, uint256, bytes32) };

/// The [HighRollerStage] enum sequences the two commit rounds and the reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighRollerStage {
    /// Waiting for the first player's salted commitment.
    CommitHash = 0,
    /// Waiting for the second player's number, posted in the clear.
    CommitNumber = 1,
    /// Waiting for the first player to reveal the committed number.
    Reveal = 2,
    /// Both numbers are on the table; the game can be scored.
    Done = 3,
}

impl TryFrom<u8> for HighRollerStage {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(HighRollerStage::CommitHash),
            1 => Ok(HighRollerStage::CommitNumber),
            2 => Ok(HighRollerStage::Reveal),
            3 => Ok(HighRollerStage::Done),
            _ => Err(ProtocolError::schema(format!(
                "invalid high roller stage: {value}"
            ))),
        }
    }
}

/// The type tag of a [HighRollerAction].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighRollerActionKind {
    /// The first player's salted commitment hash.
    CommitHash = 0,
    /// The second player's number, in the clear.
    CommitNumber = 1,
    /// The first player's salt and number, opening the commitment.
    Reveal = 2,
}

impl TryFrom<u8> for HighRollerActionKind {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(HighRollerActionKind::CommitHash),
            1 => Ok(HighRollerActionKind::CommitNumber),
            2 => Ok(HighRollerActionKind::Reveal),
            _ => Err(ProtocolError::schema(format!(
                "invalid high roller action kind: {value}"
            ))),
        }
    }
}

/// The decoded state of a high roller game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighRollerState {
    /// The mandatory, monotonically increasing state version.
    pub version: U256,
    /// The current stage of the protocol.
    pub stage: HighRollerStage,
    /// The first player's commitment, `keccak256(abi(salt, number))`.
    pub commit_hash: B256,
    /// The second player's number.
    pub committed_number: U256,
    /// The first player's revealed number.
    pub revealed_number: U256,
}

impl HighRollerState {
    /// The opening state of a fresh game.
    pub fn opening() -> Self {
        Self {
            version: U256::ZERO,
            stage: HighRollerStage::CommitHash,
            commit_hash: B256::ZERO,
            committed_number: U256::ZERO,
            revealed_number: U256::ZERO,
        }
    }

    /// Encodes this state into its canonical buffer.
    pub fn encode(&self) -> Vec<u8> {
        HighRollerStateSchema::abi_encode(&(
            self.version,
            self.stage as u8,
            self.commit_hash,
            self.committed_number,
            self.revealed_number,
        ))
    }

    /// Decodes a state buffer, failing fast on any schema mismatch.
    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        let (version, stage, commit_hash, committed_number, revealed_number) =
            decode::<HighRollerStateSchema>(buf, "high roller state")?;
        Ok(Self {
            version,
            stage: HighRollerStage::try_from(stage)?,
            commit_hash,
            committed_number,
            revealed_number,
        })
    }
}

/// A tagged high roller action. Fields not used by the tagged kind are zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighRollerAction {
    /// Which action this is; must match the game's current stage.
    pub kind: HighRollerActionKind,
    /// The commitment hash (for [HighRollerActionKind::CommitHash]).
    pub hash: B256,
    /// The number (for [HighRollerActionKind::CommitNumber] and
    /// [HighRollerActionKind::Reveal]).
    pub number: U256,
    /// The commitment salt (for [HighRollerActionKind::Reveal]).
    pub salt: B256,
}

impl HighRollerAction {
    /// Encodes this action into its canonical buffer.
    pub fn encode(&self) -> Vec<u8> {
        HighRollerActionSchema::abi_encode(&(self.kind as u8, self.hash, self.number, self.salt))
    }

    /// Decodes an action buffer, failing fast on any schema mismatch.
    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        let (kind, hash, number, salt) = decode::<HighRollerActionSchema>(buf, "high roller action")?;
        Ok(Self {
            kind: HighRollerActionKind::try_from(kind)?,
            hash,
            number,
            salt,
        })
    }
}

/// Computes the commitment a reveal must open: `keccak256(abi(salt, number))`.
pub fn commitment(salt: B256, number: U256) -> B256 {
    keccak256((salt, number).abi_encode())
}

/// Two-round commit-reveal dice game.
#[derive(Debug, Clone, Copy)]
pub struct HighRoller;

impl HighRoller {
    /// Draws two dice per player from the mingled numbers and scores the
    /// game. Each die is one big-endian `u64` chunk of the digest, `mod 6`
    /// plus one.
    fn score(revealed: U256, committed: U256) -> TwoPartyOutcome {
        let randomness = keccak256((revealed, committed).abi_encode());
        let die = |chunk: usize| -> u64 {
            let bytes: [u8; 8] = randomness[chunk * 8..(chunk + 1) * 8].try_into().unwrap();
            u64::from_be_bytes(bytes) % 6 + 1
        };

        let first_total = die(0) + die(1);
        let second_total = die(2) + die(3);
        match first_total.cmp(&second_total) {
            std::cmp::Ordering::Greater => TwoPartyOutcome::SendToFirst,
            std::cmp::Ordering::Less => TwoPartyOutcome::SendToSecond,
            std::cmp::Ordering::Equal => TwoPartyOutcome::SplitAndSend,
        }
    }
}

impl Application for HighRoller {
    fn definition(&self) -> AppDefinition {
        AppDefinition::HighRoller
    }

    fn is_state_terminal(&self, state: &[u8]) -> Result<bool, ProtocolError> {
        Ok(HighRollerState::decode(state)?.stage == HighRollerStage::Done)
    }

    fn get_turn_taker(
        &self,
        state: &[u8],
        participants: &[Address],
    ) -> Result<Address, ProtocolError> {
        if participants.len() != 2 {
            return Err(ProtocolError::precondition(format!(
                "high roller requires exactly 2 participants, got {}",
                participants.len()
            )));
        }
        // The stage, not the version, fixes whose move it is: the first
        // player commits and reveals, the second player answers in between.
        let state = HighRollerState::decode(state)?;
        Ok(match state.stage {
            HighRollerStage::CommitNumber => participants[1],
            _ => participants[0],
        })
    }

    fn apply_action(
        &self,
        state: &[u8],
        action: &[u8],
        _block_height: u64,
    ) -> Result<Vec<u8>, ProtocolError> {
        let state = HighRollerState::decode(state)?;
        let action = HighRollerAction::decode(action)?;

        let next = match (state.stage, action.kind) {
            (HighRollerStage::CommitHash, HighRollerActionKind::CommitHash) => HighRollerState {
                stage: HighRollerStage::CommitNumber,
                commit_hash: action.hash,
                ..state
            },
            (HighRollerStage::CommitNumber, HighRollerActionKind::CommitNumber) => {
                HighRollerState {
                    stage: HighRollerStage::Reveal,
                    committed_number: action.number,
                    ..state
                }
            }
            (HighRollerStage::Reveal, HighRollerActionKind::Reveal) => {
                if commitment(action.salt, action.number) != state.commit_hash {
                    return Err(ProtocolError::precondition(
                        "revealed value does not open the stored commitment",
                    ));
                }
                HighRollerState {
                    stage: HighRollerStage::Done,
                    revealed_number: action.number,
                    ..state
                }
            }
            (stage, kind) => {
                return Err(ProtocolError::precondition(format!(
                    "action {kind:?} does not match stage {stage:?}"
                )))
            }
        };

        Ok(HighRollerState {
            version: state.version + U256::from(1),
            ..next
        }
        .encode())
    }

    fn compute_outcome(
        &self,
        state: &[u8],
        _block_height: u64,
    ) -> Result<Outcome, ProtocolError> {
        let state = HighRollerState::decode(state)?;

        let resolution = match state.stage {
            // The first player owes the next move; stalling forfeits to the
            // second player, and vice versa.
            HighRollerStage::CommitHash | HighRollerStage::Reveal => TwoPartyOutcome::SendToSecond,
            HighRollerStage::CommitNumber => TwoPartyOutcome::SendToFirst,
            HighRollerStage::Done => {
                // Zero is the reserved invalid marker: a player who put it on
                // the table forfeits rather than being scored.
                match (
                    state.revealed_number.is_zero(),
                    state.committed_number.is_zero(),
                ) {
                    (true, true) => TwoPartyOutcome::SplitAndSend,
                    (true, false) => TwoPartyOutcome::SendToSecond,
                    (false, true) => TwoPartyOutcome::SendToFirst,
                    (false, false) => Self::score(state.revealed_number, state.committed_number),
                }
            }
        };
        Ok(Outcome::TwoParty(resolution))
    }
}

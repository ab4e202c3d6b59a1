//! The on-chain challenge record and its time-boxed lifecycle state machine.
//!
//! The lifecycle is modeled as an explicit finite-state machine: [AppChallenge]
//! plus a block height map to exactly one [LifecyclePhase], and every predicate
//! exposed to collaborators is derived from that single phase function rather
//! than from ad-hoc timeout arithmetic at call sites.

use crate::{ProtocolError, StateHash};
use alloy_primitives::{B256, U256};
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

/// The [ChallengeStatus] enum is the persisted dispute status of one channel
/// instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChallengeStatus {
    /// No dispute has been opened; participants are cooperating off-chain.
    NoChallenge = 0,
    /// A state has been submitted on-chain and the response window is running.
    InDispute = 1,
    /// The disputed state is being advanced on-chain by the turn-taker.
    InOnchainProgression = 2,
    /// An outcome was committed directly rather than derived live from state.
    OutcomeSet = 3,
    /// The dispute was finalized explicitly (e.g. a terminal state was
    /// reached during on-chain progression).
    ExplicitlyFinalized = 4,
}

impl TryFrom<u8> for ChallengeStatus {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ChallengeStatus::NoChallenge),
            1 => Ok(ChallengeStatus::InDispute),
            2 => Ok(ChallengeStatus::InOnchainProgression),
            3 => Ok(ChallengeStatus::OutcomeSet),
            4 => Ok(ChallengeStatus::ExplicitlyFinalized),
            _ => Err(ProtocolError::schema(format!(
                "invalid challenge status: {value}"
            ))),
        }
    }
}

/// The [LifecyclePhase] enum is the observable phase of a challenge at a given
/// block height. The phases are total and mutually exclusive: every
/// `(record, height)` pair maps to exactly one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    /// A fresher, all-party-signed state may be submitted.
    Disputable,
    /// The current turn-taker may advance the disputed state on-chain, or the
    /// participants may cancel the dispute with a fresher cooperative state.
    Progressable,
    /// The recorded state is final; its outcome may be computed and paid.
    Finalized,
    /// An outcome has been committed directly; no further state transitions.
    OutcomeSet,
}

/// The [AppChallenge] struct is the only persisted on-chain record per channel
/// instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppChallenge {
    /// The current dispute status.
    pub status: ChallengeStatus,
    /// keccak256 of the latest state either cooperatively agreed or submitted
    /// in a dispute.
    pub app_state_hash: StateHash,
    /// The version of that state. Never decreases across any accepted
    /// transition.
    pub version_number: U256,
    /// The block height deadline of the current window. Meaningful only in
    /// time-bound statuses.
    pub finalizes_at: u64,
}

impl AppChallenge {
    /// The implicit record created when a channel instance is opened.
    pub fn new() -> Self {
        Self {
            status: ChallengeStatus::NoChallenge,
            app_state_hash: B256::ZERO,
            version_number: U256::ZERO,
            finalizes_at: 0,
        }
    }

    /// Maps this record and a block height to its unique [LifecyclePhase].
    ///
    /// Two windows govern a dispute: up to `finalizes_at` the participants may
    /// still submit a fresher cooperative state, and for `default_timeout`
    /// further blocks the rightful turn-taker may advance the stalled state
    /// on-chain. Missing both windows finalizes whatever state was last
    /// recorded, which is how a disconnected counterparty is handled.
    pub fn phase(&self, default_timeout: u64, block_height: u64) -> LifecyclePhase {
        match self.status {
            ChallengeStatus::NoChallenge => LifecyclePhase::Disputable,
            ChallengeStatus::InDispute => {
                if block_height <= self.finalizes_at {
                    LifecyclePhase::Disputable
                } else if block_height <= self.finalizes_at.saturating_add(default_timeout) {
                    LifecyclePhase::Progressable
                } else {
                    LifecyclePhase::Finalized
                }
            }
            ChallengeStatus::InOnchainProgression => {
                if block_height <= self.finalizes_at {
                    LifecyclePhase::Progressable
                } else {
                    LifecyclePhase::Finalized
                }
            }
            ChallengeStatus::OutcomeSet => LifecyclePhase::OutcomeSet,
            ChallengeStatus::ExplicitlyFinalized => LifecyclePhase::Finalized,
        }
    }

    /// True while a fresher, all-party-signed state may reset the dispute.
    pub fn is_disputable(&self, default_timeout: u64, block_height: u64) -> bool {
        self.phase(default_timeout, block_height) == LifecyclePhase::Disputable
    }

    /// True while the current turn-taker may advance the disputed state
    /// on-chain by exactly one step.
    pub fn is_progressable(&self, default_timeout: u64, block_height: u64) -> bool {
        self.phase(default_timeout, block_height) == LifecyclePhase::Progressable
    }

    /// True while a progressable dispute may instead be abandoned in favor of
    /// a newer cooperative state. Identical window to [Self::is_progressable].
    pub fn is_cancellable(&self, default_timeout: u64, block_height: u64) -> bool {
        self.is_progressable(default_timeout, block_height)
    }

    /// True once the recorded state is final and its outcome is payable.
    pub fn is_finalized(&self, default_timeout: u64, block_height: u64) -> bool {
        self.phase(default_timeout, block_height) == LifecyclePhase::Finalized
    }

    /// True iff an outcome was committed directly rather than derived live
    /// from state.
    pub fn is_outcome_set(&self) -> bool {
        self.status == ChallengeStatus::OutcomeSet
    }
}

impl Default for AppChallenge {
    fn default() -> Self {
        Self::new()
    }
}

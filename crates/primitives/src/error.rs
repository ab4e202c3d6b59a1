//! The typed error taxonomy shared by every protocol operation.
//!
//! Financial outcomes must never be ambiguous: every failure mode is a
//! distinct, synchronously surfaced variant, never a silent no-op.

use alloy_primitives::{Address, B256, U256};

/// The [ProtocolError] enum covers every way a protocol operation can fail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// A state or action buffer did not decode to the expected schema
    /// shape/length. Always fatal to the call; no partial state is produced.
    #[error("schema error: {reason}")]
    Schema {
        /// Human-readable description of the decode failure.
        reason: String,
    },
    /// An action-specific precondition did not hold (wrong stage, occupied
    /// cell, mismatched hash, already finalized, out-of-range index, ...).
    #[error("precondition violation: {reason}")]
    Precondition {
        /// The violated precondition.
        reason: String,
    },
    /// A submitted version did not strictly exceed the recorded one.
    #[error("stale submission: submitted version {submitted} <= recorded version {recorded}")]
    StaleSubmission {
        /// The version of the rejected submission.
        submitted: U256,
        /// The version currently recorded in the challenge.
        recorded: U256,
    },
    /// The lifecycle predicate gating the attempted operation is false at the
    /// supplied block height.
    #[error("lifecycle violation: operation requires `{required}` to hold")]
    Lifecycle {
        /// The name of the predicate that must hold.
        required: &'static str,
    },
    /// The action payload was already consumed for this channel.
    #[error("replayed action: {action_hash} already consumed")]
    ReplayedAction {
        /// keccak256 of the replayed action payload.
        action_hash: B256,
    },
    /// A signature was malformed or did not recover to the expected address.
    #[error("bad signature: {reason}")]
    BadSignature {
        /// What went wrong during parsing or recovery.
        reason: String,
    },
    /// A recovered signer is not a participant of the channel.
    #[error("unknown participant: {address}")]
    UnknownParticipant {
        /// The address that is not part of the channel.
        address: Address,
    },
}

impl ProtocolError {
    /// Shorthand for a [ProtocolError::Schema] with the given reason.
    pub fn schema(reason: impl Into<String>) -> Self {
        Self::Schema {
            reason: reason.into(),
        }
    }

    /// Shorthand for a [ProtocolError::Precondition] with the given reason.
    pub fn precondition(reason: impl Into<String>) -> Self {
        Self::Precondition {
            reason: reason.into(),
        }
    }
}

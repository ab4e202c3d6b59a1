//! The adjudicator drives the challenge lifecycle over the application
//! variants.
//!
//! Every operation is gated by the lifecycle predicate named in its doc
//! comment, rejects stale versions, and fails atomically: the challenge
//! record and the consumed-action set are only written after every check has
//! passed.

use crate::registry::application;
use crate::signatures::recover_signer;
use alloy_primitives::{keccak256, Bytes, B256};
use alloy_sol_types::SolValue;
use anyhow::{Context, Result};
use arbiter_primitives::{
    read_version, AppChallenge, AppIdentity, ChallengeStatus, Outcome, ProtocolError,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// The off-chain message unit participants exchange: an encoded application
/// state plus one 65-byte signature per participant, in participant order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedAppState {
    /// The encoded application state.
    pub app_state: Vec<u8>,
    /// One `(r, s, v)` signature over `keccak256(app_state)` per participant,
    /// in channel participant order.
    pub signatures: Vec<Vec<u8>>,
}

impl SignedAppState {
    /// The digest each participant signs.
    pub fn digest(&self) -> B256 {
        keccak256(&self.app_state)
    }
}

/// The [Adjudicator] applies challenge transitions for any number of channel
/// instances and persists the consumed-action set that protects on-chain
/// progression against replays.
#[derive(Debug, Default)]
pub struct Adjudicator {
    /// `(channel key, keccak256(action payload))` pairs already consumed.
    consumed_actions: HashSet<(B256, B256)>,
}

impl Adjudicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens or resets a dispute with a fresher, all-party-signed state.
    /// Gated by `is_disputable`.
    pub fn set_state(
        &self,
        identity: &AppIdentity,
        challenge: &mut AppChallenge,
        submission: &SignedAppState,
        block_height: u64,
    ) -> Result<()> {
        if !challenge.is_disputable(identity.default_timeout, block_height) {
            return Err(ProtocolError::Lifecycle {
                required: "is_disputable",
            }
            .into());
        }

        let version = self
            .check_unanimous_submission(identity, challenge, submission)
            .context("state submission rejected")?;

        challenge.status = ChallengeStatus::InDispute;
        challenge.app_state_hash = submission.digest();
        challenge.version_number = version;
        challenge.finalizes_at = block_height.saturating_add(identity.default_timeout);

        debug!(
            channel = %identity.channel_key(),
            %version,
            finalizes_at = challenge.finalizes_at,
            "dispute opened"
        );
        Ok(())
    }

    /// Advances a stalled dispute by one on-chain `apply_action` step, taken
    /// by the current turn-taker. Gated by `is_progressable`. Returns the
    /// successor state buffer.
    pub fn progress_state(
        &mut self,
        identity: &AppIdentity,
        challenge: &mut AppChallenge,
        app_state: &[u8],
        action: &[u8],
        signature: &[u8],
        block_height: u64,
    ) -> Result<Vec<u8>> {
        if !challenge.is_progressable(identity.default_timeout, block_height) {
            return Err(ProtocolError::Lifecycle {
                required: "is_progressable",
            }
            .into());
        }
        if keccak256(app_state) != challenge.app_state_hash {
            return Err(ProtocolError::precondition(
                "submitted state does not match the recorded state hash",
            )
            .into());
        }

        let replay_key = (identity.channel_key(), keccak256(action));
        if self.consumed_actions.contains(&replay_key) {
            return Err(ProtocolError::ReplayedAction {
                action_hash: replay_key.1,
            }
            .into());
        }

        let app = application(identity.app_definition);
        let turn_taker = app.get_turn_taker(app_state, &identity.participants)?;
        let signer = recover_signer(progress_digest(app_state, action), signature)?;
        if signer != turn_taker {
            return Err(ProtocolError::UnknownParticipant { address: signer })
                .context(format!("action must be signed by the turn-taker {turn_taker}"));
        }

        let next_state = app
            .apply_action(app_state, action, block_height)
            .context("on-chain progression rejected")?;

        self.consumed_actions.insert(replay_key);
        challenge.app_state_hash = keccak256(&next_state);
        challenge.version_number = read_version(&next_state)?;
        challenge.status = if app.is_state_terminal(&next_state)? {
            ChallengeStatus::ExplicitlyFinalized
        } else {
            ChallengeStatus::InOnchainProgression
        };
        challenge.finalizes_at = block_height.saturating_add(identity.default_timeout);

        debug!(
            channel = %identity.channel_key(),
            version = %challenge.version_number,
            status = ?challenge.status,
            "dispute progressed on-chain"
        );
        Ok(next_state)
    }

    /// Abandons a progressable dispute in favor of a newer cooperative
    /// state. Gated by `is_cancellable`.
    pub fn cancel_challenge(
        &self,
        identity: &AppIdentity,
        challenge: &mut AppChallenge,
        submission: &SignedAppState,
        block_height: u64,
    ) -> Result<()> {
        if !challenge.is_cancellable(identity.default_timeout, block_height) {
            return Err(ProtocolError::Lifecycle {
                required: "is_cancellable",
            }
            .into());
        }

        let version = self
            .check_unanimous_submission(identity, challenge, submission)
            .context("cancellation rejected")?;

        challenge.status = ChallengeStatus::NoChallenge;
        challenge.app_state_hash = submission.digest();
        challenge.version_number = version;
        challenge.finalizes_at = 0;

        debug!(channel = %identity.channel_key(), %version, "dispute cancelled");
        Ok(())
    }

    /// Computes the outcome of a finalized challenge from the state buffer
    /// matching the recorded hash. Gated by `is_finalized`.
    pub fn compute_outcome(
        &self,
        identity: &AppIdentity,
        challenge: &AppChallenge,
        app_state: &[u8],
        block_height: u64,
    ) -> Result<Outcome> {
        if !challenge.is_finalized(identity.default_timeout, block_height) {
            return Err(ProtocolError::Lifecycle {
                required: "is_finalized",
            }
            .into());
        }
        if keccak256(app_state) != challenge.app_state_hash {
            return Err(ProtocolError::precondition(
                "submitted state does not match the recorded state hash",
            )
            .into());
        }

        let outcome = application(identity.app_definition)
            .compute_outcome(app_state, block_height)
            .context("outcome computation failed")?;
        Ok(outcome)
    }

    /// Computes and commits the outcome of a finalized challenge, moving the
    /// record into [ChallengeStatus::OutcomeSet] so the execution layer can
    /// pay it without re-deriving it from state.
    pub fn set_outcome(
        &self,
        identity: &AppIdentity,
        challenge: &mut AppChallenge,
        app_state: &[u8],
        block_height: u64,
    ) -> Result<Outcome> {
        let outcome = self.compute_outcome(identity, challenge, app_state, block_height)?;
        challenge.status = ChallengeStatus::OutcomeSet;

        debug!(channel = %identity.channel_key(), "outcome set");
        Ok(outcome)
    }

    /// Checks an all-party-signed submission: its version must strictly
    /// exceed the recorded one and signature `k` must recover to participant
    /// `k`. Returns the submitted version.
    fn check_unanimous_submission(
        &self,
        identity: &AppIdentity,
        challenge: &AppChallenge,
        submission: &SignedAppState,
    ) -> Result<alloy_primitives::U256, ProtocolError> {
        let version = read_version(&submission.app_state)?;
        if version <= challenge.version_number {
            return Err(ProtocolError::StaleSubmission {
                submitted: version,
                recorded: challenge.version_number,
            });
        }

        if submission.signatures.len() != identity.participants.len() {
            return Err(ProtocolError::BadSignature {
                reason: format!(
                    "expected {} signatures, got {}",
                    identity.participants.len(),
                    submission.signatures.len()
                ),
            });
        }
        let digest = submission.digest();
        for (participant, signature) in identity.participants.iter().zip(&submission.signatures) {
            let signer = recover_signer(digest, signature)?;
            if signer != *participant {
                return Err(ProtocolError::UnknownParticipant { address: signer });
            }
        }
        Ok(version)
    }
}

/// The digest the turn-taker signs to authorize one on-chain progression
/// step: `keccak256(abi(state, action))`.
pub fn progress_digest(app_state: &[u8], action: &[u8]) -> B256 {
    let encoded = (
        Bytes::copy_from_slice(app_state),
        Bytes::copy_from_slice(action),
    )
        .abi_encode();
    keccak256(encoded)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::signatures::sign_digest;
    use crate::variants::{HighRollerAction, HighRollerActionKind, HighRollerState};
    use alloy_primitives::{Address, B256, U256};
    use arbiter_primitives::{AppDefinition, LifecyclePhase, TwoPartyOutcome};
    use k256::ecdsa::SigningKey;

    const TIMEOUT: u64 = 10;

    fn keys() -> (SigningKey, SigningKey) {
        (
            SigningKey::from_slice(&[0x11; 32]).unwrap(),
            SigningKey::from_slice(&[0x22; 32]).unwrap(),
        )
    }

    fn identity() -> AppIdentity {
        let (first, second) = keys();
        AppIdentity {
            channel_address: Address::repeat_byte(0xcc),
            channel_nonce: U256::from(1),
            participants: vec![
                Address::from_public_key(first.verifying_key()),
                Address::from_public_key(second.verifying_key()),
            ],
            app_definition: AppDefinition::HighRoller,
            default_timeout: TIMEOUT,
        }
    }

    fn signed_by_all(state: Vec<u8>) -> SignedAppState {
        let (first, second) = keys();
        let digest = keccak256(&state);
        SignedAppState {
            app_state: state,
            signatures: vec![
                sign_digest(&first, digest).unwrap(),
                sign_digest(&second, digest).unwrap(),
            ],
        }
    }

    fn commit_hash_action() -> Vec<u8> {
        HighRollerAction {
            kind: HighRollerActionKind::CommitHash,
            hash: keccak256(b"commitment"),
            number: U256::ZERO,
            salt: B256::ZERO,
        }
        .encode()
    }

    /// Applies the first commit off-chain, yielding a version-1 state.
    fn first_commit() -> Vec<u8> {
        use arbiter_primitives::Application;
        crate::variants::HighRoller
            .apply_action(&HighRollerState::opening().encode(), &commit_hash_action(), 0)
            .unwrap()
    }

    fn opened_dispute() -> (AppIdentity, AppChallenge, Vec<u8>) {
        let identity = identity();
        let mut challenge = AppChallenge::new();

        // Version 0 is never submittable; exchange one off-chain action first.
        let state = first_commit();
        Adjudicator::new()
            .set_state(&identity, &mut challenge, &signed_by_all(state.clone()), 100)
            .unwrap();
        (identity, challenge, state)
    }

    #[test]
    fn set_state_opens_a_dispute() {
        let (identity, challenge, state) = opened_dispute();
        assert_eq!(challenge.status, ChallengeStatus::InDispute);
        assert_eq!(challenge.app_state_hash, keccak256(&state));
        assert_eq!(challenge.version_number, U256::from(1));
        assert_eq!(challenge.finalizes_at, 100 + TIMEOUT);
        assert!(challenge.is_disputable(identity.default_timeout, 100 + TIMEOUT));
    }

    #[test]
    fn stale_versions_are_rejected_without_mutation() {
        let (identity, mut challenge, state) = opened_dispute();
        let before = challenge.clone();

        let err = Adjudicator::new()
            .set_state(&identity, &mut challenge, &signed_by_all(state), 101)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProtocolError>(),
            Some(ProtocolError::StaleSubmission { .. })
        ));
        assert_eq!(challenge, before);
    }

    #[test]
    fn unsigned_participants_cannot_set_state() {
        let identity = identity();
        let mut challenge = AppChallenge::new();

        let mut submission = signed_by_all(first_commit());
        submission.signatures.pop();

        let err = Adjudicator::new()
            .set_state(&identity, &mut challenge, &submission, 100)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProtocolError>(),
            Some(ProtocolError::BadSignature { .. })
        ));
        assert_eq!(challenge.status, ChallengeStatus::NoChallenge);
    }

    #[test]
    fn turn_taker_progresses_a_stalled_dispute() {
        let (identity, mut challenge, state) = opened_dispute();
        let mut adjudicator = Adjudicator::new();

        // Past the dispute window: the second player owes a number.
        let height = challenge.finalizes_at + 1;
        let action = HighRollerAction {
            kind: HighRollerActionKind::CommitNumber,
            hash: B256::ZERO,
            number: U256::from(11),
            salt: B256::ZERO,
        }
        .encode();

        let (_, second) = keys();
        let signature =
            sign_digest(&second, progress_digest(&state, &action)).unwrap();
        let next = adjudicator
            .progress_state(&identity, &mut challenge, &state, &action, &signature, height)
            .unwrap();

        assert_eq!(challenge.status, ChallengeStatus::InOnchainProgression);
        assert_eq!(challenge.version_number, U256::from(2));
        assert_eq!(challenge.app_state_hash, keccak256(&next));
    }

    #[test]
    fn progression_requires_the_turn_taker_signature() {
        let (identity, mut challenge, state) = opened_dispute();
        let mut adjudicator = Adjudicator::new();
        let height = challenge.finalizes_at + 1;
        let action = HighRollerAction {
            kind: HighRollerActionKind::CommitNumber,
            hash: B256::ZERO,
            number: U256::from(11),
            salt: B256::ZERO,
        }
        .encode();

        // Signed by the first player, but the second owes the move.
        let (first, _) = keys();
        let signature = sign_digest(&first, progress_digest(&state, &action)).unwrap();
        let err = adjudicator
            .progress_state(&identity, &mut challenge, &state, &action, &signature, height)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProtocolError>(),
            Some(ProtocolError::UnknownParticipant { .. })
        ));
        assert_eq!(challenge.status, ChallengeStatus::InDispute);
    }

    #[test]
    fn consumed_actions_cannot_be_replayed() {
        let (identity, mut challenge, state) = opened_dispute();
        let mut adjudicator = Adjudicator::new();
        let height = challenge.finalizes_at + 1;
        let action = HighRollerAction {
            kind: HighRollerActionKind::CommitNumber,
            hash: B256::ZERO,
            number: U256::from(11),
            salt: B256::ZERO,
        }
        .encode();
        let (_, second) = keys();
        let signature = sign_digest(&second, progress_digest(&state, &action)).unwrap();

        let next = adjudicator
            .progress_state(&identity, &mut challenge, &state, &action, &signature, height)
            .unwrap();

        // Same action payload against the successor state: replay.
        let replay_sig = sign_digest(&second, progress_digest(&next, &action)).unwrap();
        let err = adjudicator
            .progress_state(&identity, &mut challenge, &next, &action, &replay_sig, height)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProtocolError>(),
            Some(ProtocolError::ReplayedAction { .. })
        ));
    }

    #[test]
    fn cancellation_returns_the_record_to_no_challenge() {
        let (identity, mut challenge, _state) = opened_dispute();
        let height = challenge.finalizes_at + 1;
        assert!(challenge.is_cancellable(identity.default_timeout, height));

        // A fresher cooperative state supersedes the open dispute.
        use arbiter_primitives::Application;
        let fresher = crate::variants::HighRoller
            .apply_action(
                &first_commit(),
                &HighRollerAction {
                    kind: HighRollerActionKind::CommitNumber,
                    hash: B256::ZERO,
                    number: U256::from(3),
                    salt: B256::ZERO,
                }
                .encode(),
                0,
            )
            .unwrap();
        Adjudicator::new()
            .cancel_challenge(&identity, &mut challenge, &signed_by_all(fresher), height)
            .unwrap();
        assert_eq!(challenge.status, ChallengeStatus::NoChallenge);
        assert_eq!(challenge.version_number, U256::from(2));
    }

    #[test]
    fn missed_windows_finalize_the_last_recorded_state() {
        let (identity, challenge, state) = opened_dispute();
        let adjudicator = Adjudicator::new();

        // Inside the windows no outcome may be read.
        let err = adjudicator
            .compute_outcome(&identity, &challenge, &state, challenge.finalizes_at)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProtocolError>(),
            Some(ProtocolError::Lifecycle { .. })
        ));

        // Both windows missed: the recorded state is final as-is. The second
        // player never answered, so the first is paid.
        let height = challenge.finalizes_at + TIMEOUT + 1;
        assert_eq!(
            challenge.phase(identity.default_timeout, height),
            LifecyclePhase::Finalized
        );
        let outcome = adjudicator
            .compute_outcome(&identity, &challenge, &state, height)
            .unwrap();
        assert_eq!(outcome, Outcome::TwoParty(TwoPartyOutcome::SendToFirst));
    }

    #[test]
    fn set_outcome_commits_the_resolution() {
        let (identity, mut challenge, state) = opened_dispute();
        let height = challenge.finalizes_at + TIMEOUT + 1;

        let outcome = Adjudicator::new()
            .set_outcome(&identity, &mut challenge, &state, height)
            .unwrap();
        assert_eq!(outcome, Outcome::TwoParty(TwoPartyOutcome::SendToFirst));
        assert!(challenge.is_outcome_set());
    }

    #[test]
    fn mismatched_state_buffers_are_rejected() {
        let (identity, mut challenge, _) = opened_dispute();
        let mut adjudicator = Adjudicator::new();
        let height = challenge.finalizes_at + 1;
        let other_state = HighRollerState::opening().encode();

        let err = adjudicator
            .progress_state(&identity, &mut challenge, &other_state, &[], &[0u8; 65], height)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProtocolError>(),
            Some(ProtocolError::Precondition { .. })
        ));
    }
}

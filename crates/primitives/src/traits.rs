//! The traits module contains the polymorphic application capability every
//! variant implements.

use crate::{AppDefinition, Outcome, ProtocolError};
use alloy_primitives::{Address, B256, U256};

/// The [StateHash] type is an alias to [B256], used to deliniate the digest of
/// an application state buffer from a regular hash.
pub type StateHash = B256;

/// The [Application] trait is the highest level trait in the library,
/// describing a self-contained, deterministic state machine over an opaque,
/// app-specific state buffer. It has several key properties:
///
/// - It is stateless and pure: every operation is a function of its arguments
///   only, with no I/O, no shared mutable state, and no randomness. The
///   caller-supplied `block_height` is the only clock.
/// - State is never mutated in place: [Application::apply_action] returns a
///   fresh buffer, and every successful call increments the state's version
///   by exactly one.
/// - Any precondition violation fails the call atomically; no partial state
///   is ever observable.
pub trait Application {
    /// Returns the [AppDefinition] identifying this variant.
    fn definition(&self) -> AppDefinition;

    /// Returns true once no further [Application::apply_action] call is
    /// meaningful. Pure function of the state only.
    fn is_state_terminal(&self, state: &[u8]) -> Result<bool, ProtocolError>;

    /// Selects whose signature is required for the next state.
    ///
    /// Unless the variant has a fixed turn-taker, this is
    /// `version mod participants.len()` (see [default_turn_taker]).
    fn get_turn_taker(
        &self,
        state: &[u8],
        participants: &[Address],
    ) -> Result<Address, ProtocolError>;

    /// The sole state-transition primitive: validates the action against the
    /// current state and returns the successor state buffer.
    ///
    /// ### Takes
    /// - `state`: The current state buffer, decoded per this variant's schema.
    /// - `action`: The action buffer, consumed once and never persisted.
    /// - `block_height`: The caller-supplied monotonic block height; ignored
    ///   by height-independent variants.
    ///
    /// ### Returns
    /// - The successor state buffer, or an error if the buffers do not match
    ///   the schema or a precondition does not hold.
    fn apply_action(
        &self,
        state: &[u8],
        action: &[u8],
        block_height: u64,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Computes the final fund distribution from a (possibly terminal) state.
    /// Idempotent: identical inputs yield identical outcomes.
    fn compute_outcome(&self, state: &[u8], block_height: u64)
        -> Result<Outcome, ProtocolError>;
}

/// The default turn-taker rule: `version mod participants.len()`.
pub fn default_turn_taker(
    version: U256,
    participants: &[Address],
) -> Result<Address, ProtocolError> {
    if participants.is_empty() {
        return Err(ProtocolError::precondition(
            "channel has no participants".to_string(),
        ));
    }
    let index = version.wrapping_rem(U256::from(participants.len())).to::<usize>();
    Ok(participants[index])
}

/// Reads the mandatory version field out of any state buffer.
///
/// Every variant's schema places the version in the first 32-byte word, so
/// external tooling can order states without knowing the rest of the schema.
pub fn read_version(state: &[u8]) -> Result<U256, ProtocolError> {
    let word = state
        .get(..32)
        .ok_or_else(|| ProtocolError::schema("state buffer shorter than one word"))?;
    Ok(U256::from_be_slice(word))
}

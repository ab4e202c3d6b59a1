//! Closed dispatch from an [AppDefinition] to its [Application]
//! implementation.

use crate::variants::{
    DirectTransfer, HashLockTransfer, HighRoller, SignedTransfer, SwapTransfer, TicTacToe,
};
use arbiter_primitives::{AppDefinition, Application};

/// Returns the [Application] implementation for a variant identifier.
///
/// The variant set is closed: every [AppDefinition] maps to exactly one
/// implementation, and adding a variant is a protocol version change.
pub fn application(definition: AppDefinition) -> &'static dyn Application {
    match definition {
        AppDefinition::DirectTransfer => &DirectTransfer,
        AppDefinition::SwapTransfer => &SwapTransfer,
        AppDefinition::HashLockTransfer => &HashLockTransfer,
        AppDefinition::SignedTransfer => &SignedTransfer,
        AppDefinition::HighRoller => &HighRoller,
        AppDefinition::TicTacToe => &TicTacToe,
    }
}

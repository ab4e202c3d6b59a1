//! This module contains the concrete application variants of the protocol.
//!
//! All variants implement [arbiter_primitives::Application]; they differ only
//! in their state/action schemas and transition rules.

mod transfer;
pub use self::transfer::{DirectTransfer, SwapTransfer, TransferState};

mod hash_lock;
pub use self::hash_lock::{HashLockAction, HashLockState, HashLockTransfer};

mod signed_transfer;
pub use self::signed_transfer::{SignedTransfer, SignedTransferAction, SignedTransferState};

mod high_roller;
pub use self::high_roller::{HighRoller, HighRollerAction, HighRollerActionKind, HighRollerStage, HighRollerState};

mod tic_tac_toe;
pub use self::tic_tac_toe::{
    TicTacToe, TicTacToeAction, TicTacToeActionKind, TicTacToeState, WinClaimType,
};

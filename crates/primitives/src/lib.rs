#![doc = include_str!("../README.md")]

//! Primitives for Arbiter, a library implementing the off-chain application /
//! on-chain dispute core of a state-channel network.

mod error;
pub use error::ProtocolError;

mod outcome;
pub use outcome::{CoinTransfer, Outcome, TwoPartyOutcome};

mod identity;
pub use identity::{AppDefinition, AppIdentity};

mod challenge;
pub use challenge::{AppChallenge, ChallengeStatus, LifecyclePhase};

mod traits;
pub use traits::{default_turn_taker, read_version, Application, StateHash};

//! The apps module contains the concrete application variants of the protocol,
//! the closed variant registry, and the [Adjudicator] that drives the
//! challenge lifecycle over them.

extern crate arbiter_primitives;

mod codec;

mod signatures;
pub use signatures::{recover_signer, sign_digest};

pub mod variants;

mod registry;
pub use registry::application;

mod adjudicator;
pub use adjudicator::{progress_digest, Adjudicator, SignedAppState};

pub mod prelude {
    pub use super::{
        adjudicator::{progress_digest, Adjudicator, SignedAppState},
        registry::application,
        signatures::{recover_signer, sign_digest},
        variants::*,
    };
    pub use arbiter_primitives::*;
}

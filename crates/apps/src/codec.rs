//! Shared helpers for the per-variant binary codecs.
//!
//! Every schema is a `sol!` tuple whose first word is the state version, so
//! [arbiter_primitives::read_version] works against any encoded state.

use alloy_sol_types::SolType;
use arbiter_primitives::ProtocolError;

/// Decodes `buf` against the schema `T`, failing fast with a
/// [ProtocolError::Schema] if the buffer does not match the expected
/// shape/length.
pub(crate) fn decode<T: SolType>(buf: &[u8], what: &str) -> Result<T::RustType, ProtocolError> {
    T::abi_decode(buf, true)
        .map_err(|e| ProtocolError::schema(format!("{what} does not match schema: {e}")))
}

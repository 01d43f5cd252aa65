//! CBOR wire codec for the snapshot container format.
//!
//! Strict schema-checked decoding: definite-length arrays and maps only,
//! known tags and keys only, fixed arity per record kind. Anything not
//! matching a known shape is rejected rather than coerced.

mod envelope;
mod header;
mod record;

pub use envelope::*;
pub use header::*;
pub use record::*;

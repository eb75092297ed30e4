//! # Transform
//!
//! Pure curation functions: payload decoding and key renaming, plus
//! schema conformance checking.
//!
//! Responsibilities:
//! - Decode payload bytes permissively (never fatal)
//! - Wrap non-JSON / non-object payloads as `{"value": ...}`
//! - Rename keys recursively according to an approved mapping table
//! - Check top-level payload keys against a bound expected schema
//!
//! No I/O, no state; every function here is safe to call from any task.

mod conformance;
mod payload;

pub use conformance::check;
pub use payload::{decode_payload, rename_keys, transform};

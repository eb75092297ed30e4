//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Wall-clock UTC timestamps (`chrono::DateTime<Utc>`) stamped at receipt/production
//! - Per-topic ordering comes from the FIFO ingest queue, not from timestamps

mod config;
mod conformance;
mod connection;
mod error;
mod mapping;
mod message;
mod records;
mod store;
mod topic_path;

pub use config::*;
pub use conformance::*;
pub use connection::*;
pub use error::*;
pub use mapping::*;
pub use message::*;
pub use records::*;
pub use store::{CurationStore, LocalCurationStore};
pub use topic_path::TopicPath;

//! # Ingest
//!
//! Queue-backed ingestion pipeline.
//!
//! Responsibilities:
//! - Bounded ingest queue with non-blocking enqueue and shed-on-full
//! - Batch worker: collect by size or time, conformance-check against the
//!   binding cache, grouped writes to the persistent store
//! - Intake loop: subscribe to the raw filters, wrap bus messages as
//!   `RawMessage` and feed the queue, reconnecting on transport errors
//!
//! The intake and the batch worker communicate only through the queue;
//! a slow store never applies backpressure to the bus subscriber.

mod canonical;
mod intake;
mod queue;
mod stats;
mod worker;

pub use canonical::canonical_text;
pub use intake::{extract_publisher, Intake, IntakeConfig, IntakeHandle};
pub use queue::{ingest_channel, IngestQueue};
pub use stats::{IngestSnapshot, IngestStats};
pub use worker::{BatchConfig, BatchWorker};

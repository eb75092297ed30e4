//! Service orchestration module.

mod health;
mod orchestrator;
mod stats;

pub use health::{BridgeHealth, HealthRegistry};
pub use orchestrator::{CurationService, ServiceConfig};
pub use stats::RunStats;

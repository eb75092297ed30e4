//! Health/readiness endpoint.
//!
//! Aggregates connection states, cache stats and worker counters into a
//! JSON view for an orchestration platform's probes. `/health` always
//! answers 200 with the full report; `/ready` answers 503 until the
//! caches are loaded and every bus leg is connected.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use bridge::{BridgeSnapshot, BridgeStats, LineageSnapshot, LineageStats};
use bus::ConnectionStateHandle;
use cache::{BindingCache, CacheStats, MappingCache};
use contracts::ConnectionState;
use ingest::{IngestSnapshot, IngestStats};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Health view of one bridge route
pub struct BridgeHealth {
    pub name: String,
    pub stats: Arc<BridgeStats>,
    pub state: ConnectionStateHandle,
}

/// Shared registry of everything the health endpoint reports on
pub struct HealthRegistry {
    pub intake_state: ConnectionStateHandle,
    pub bridges: Vec<BridgeHealth>,
    pub ingest: Arc<IngestStats>,
    pub lineage: Arc<LineageStats>,
    pub mappings: Arc<MappingCache>,
    pub bindings: Arc<BindingCache>,
}

/// Full health report
#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub ready: bool,
    pub intake: ConnectionState,
    pub bridges: Vec<BridgeReport>,
    pub caches: CacheReports,
    pub ingest: IngestSnapshot,
    pub lineage: LineageSnapshot,
}

/// Health view of one bridge
#[derive(Debug, Serialize)]
pub struct BridgeReport {
    pub name: String,
    pub connection: ConnectionState,
    pub stats: BridgeSnapshot,
}

/// Cache entry counts and hit rates
#[derive(Debug, Serialize)]
pub struct CacheReports {
    pub mappings: CacheStats,
    pub bindings: CacheStats,
}

impl HealthRegistry {
    /// Build the current report
    pub fn report(&self) -> HealthReport {
        let intake = self.intake_state.snapshot();
        let bridges: Vec<BridgeReport> = self
            .bridges
            .iter()
            .map(|bridge| BridgeReport {
                name: bridge.name.clone(),
                connection: bridge.state.snapshot(),
                stats: bridge.stats.snapshot(),
            })
            .collect();

        let ready = self.mappings.is_loaded()
            && self.bindings.is_loaded()
            && intake.is_connected()
            && bridges.iter().all(|b| b.connection.is_connected());

        HealthReport {
            ready,
            intake,
            bridges,
            caches: CacheReports {
                mappings: self.mappings.stats(),
                bindings: self.bindings.stats(),
            },
            ingest: self.ingest.snapshot(),
            lineage: self.lineage.snapshot(),
        }
    }
}

/// Spawn the health server; it stops when the shutdown watch flips
pub fn spawn(
    port: u16,
    registry: Arc<HealthRegistry>,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = serve(port, registry, shutdown).await {
            error!(error = %e, port, "health endpoint failed");
        }
    })
}

async fn serve(
    port: u16,
    registry: Arc<HealthRegistry>,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .with_state(registry);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "health endpoint listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.wait_for(|stopped| *stopped).await;
        })
        .await
}

async fn health_handler(State(registry): State<Arc<HealthRegistry>>) -> Json<HealthReport> {
    Json(registry.report())
}

async fn ready_handler(State(registry): State<Arc<HealthRegistry>>) -> impl IntoResponse {
    let report = registry.report();
    let status = if report.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}

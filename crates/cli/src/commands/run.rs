//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::info;

use crate::cli::RunArgs;
use crate::service::{CurationService, ServiceConfig};

/// Execute the `run` command
pub async fn run_service(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let mut config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(ref host) = args.uncurated_host {
        info!(host = %host, "Overriding uncurated bus host from CLI");
        config.bus.uncurated.host = host.clone();
    }
    if let Some(ref host) = args.curated_host {
        info!(host = %host, "Overriding curated bus host from CLI");
        config.bus.curated.host = host.clone();
    }
    if let Some(ref path) = args.store_path {
        info!(path = %path, "Overriding store path from CLI");
        config.store.path = path.clone();
    }

    info!(
        uncurated = %config.bus.uncurated.host,
        curated = %config.bus.curated.host,
        store = %config.store.path,
        bridges = config.bridges.len(),
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config);
        return Ok(());
    }

    let service_config = ServiceConfig {
        config,
        max_messages: if args.max_messages == 0 {
            None
        } else {
            Some(args.max_messages)
        },
        timeout: if args.timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(args.timeout))
        },
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
        health_port: if args.health_port == 0 {
            None
        } else {
            Some(args.health_port)
        },
        sim_interval: Duration::from_millis(args.sim_interval_ms.max(1)),
    };

    let service = CurationService::new(service_config);

    info!("Starting curation pipeline...");

    let stats = service
        .run(shutdown_signal())
        .await
        .context("Pipeline execution failed")?;

    info!(
        ingested = stats.ingest.received,
        written = stats.ingest.messages_written,
        duration_secs = stats.duration.as_secs_f64(),
        "Pipeline completed"
    );
    stats.print_summary();

    info!("Topic Curator finished");
    Ok(())
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &contracts::CuratorConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Bus:");
    println!(
        "  Uncurated: {}:{}",
        config.bus.uncurated.host, config.bus.uncurated.port
    );
    println!(
        "  Curated: {}:{}",
        config.bus.curated.host, config.bus.curated.port
    );

    println!("\nStore:");
    println!("  Path: {}", config.store.path);
    println!("  Retention: {}h", config.store.retention_hours);

    println!("\nIngest:");
    println!("  Queue capacity: {}", config.ingest.queue_capacity);
    println!(
        "  Batch: {} messages / {}ms",
        config.ingest.batch_size, config.ingest.batch_timeout_ms
    );
    println!("  Filters: {:?}", config.ingest.subscribe_filters);

    if !config.bridges.is_empty() {
        println!("\nBridges ({}):", config.bridges.len());
        for bridge in &config.bridges {
            println!(
                "  - {} ({} @ QoS {})",
                bridge.name,
                bridge.subscribe_filter,
                bridge.qos.as_u8()
            );
        }
    }

    println!();
}

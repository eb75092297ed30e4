//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    bus: BusInfo,
    store: StoreInfo,
    cache: CacheInfo,
    ingest: IngestInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    bridges: Vec<BridgeInfo>,
}

#[derive(Serialize)]
struct BusInfo {
    uncurated: String,
    curated: String,
}

#[derive(Serialize)]
struct StoreInfo {
    path: String,
    retention_hours: u64,
    cleanup_interval_secs: u64,
}

#[derive(Serialize)]
struct CacheInfo {
    refresh_interval_secs: u64,
}

#[derive(Serialize)]
struct IngestInfo {
    queue_capacity: usize,
    batch_size: usize,
    batch_timeout_ms: u64,
    subscribe_filters: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    publisher_namespace: Option<String>,
}

#[derive(Serialize)]
struct BridgeInfo {
    name: String,
    subscribe_filter: String,
    qos: u8,
    backoff_secs: u64,
    mode: String,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&config, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config, args);
    }

    Ok(())
}

fn republish_mode(policy: &contracts::RepublishPolicy) -> String {
    match policy {
        contracts::RepublishPolicy::Mapped => "mapped".to_string(),
        contracts::RepublishPolicy::Namespace { prefix, .. } => {
            format!("namespace -> {prefix}")
        }
    }
}

fn build_config_info(config: &contracts::CuratorConfig, args: &InfoArgs) -> ConfigInfo {
    let bridges = if args.bridges {
        config
            .bridges
            .iter()
            .map(|b| BridgeInfo {
                name: b.name.clone(),
                subscribe_filter: b.subscribe_filter.clone(),
                qos: b.qos.as_u8(),
                backoff_secs: b.backoff_secs,
                mode: republish_mode(&b.republish),
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", config.version),
        bus: BusInfo {
            uncurated: format!("{}:{}", config.bus.uncurated.host, config.bus.uncurated.port),
            curated: format!("{}:{}", config.bus.curated.host, config.bus.curated.port),
        },
        store: StoreInfo {
            path: config.store.path.clone(),
            retention_hours: config.store.retention_hours,
            cleanup_interval_secs: config.store.cleanup_interval_secs,
        },
        cache: CacheInfo {
            refresh_interval_secs: config.cache.refresh_interval_secs,
        },
        ingest: IngestInfo {
            queue_capacity: config.ingest.queue_capacity,
            batch_size: config.ingest.batch_size,
            batch_timeout_ms: config.ingest.batch_timeout_ms,
            subscribe_filters: config.ingest.subscribe_filters.clone(),
            publisher_namespace: config.ingest.publisher_namespace.clone(),
        },
        bridges,
    }
}

fn print_config_info(config: &contracts::CuratorConfig, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Topic Curator Configuration                    ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("🚌 Bus");
    println!("   ├─ Version: {:?}", config.version);
    println!(
        "   ├─ Uncurated: {}:{}",
        config.bus.uncurated.host, config.bus.uncurated.port
    );
    println!(
        "   └─ Curated: {}:{}",
        config.bus.curated.host, config.bus.curated.port
    );

    println!("\n💾 Store");
    println!("   ├─ Path: {}", config.store.path);
    println!("   ├─ Retention: {}h", config.store.retention_hours);
    println!(
        "   └─ Cleanup interval: {}s",
        config.store.cleanup_interval_secs
    );

    println!("\n⚙️  Ingest");
    println!("   ├─ Queue capacity: {}", config.ingest.queue_capacity);
    println!("   ├─ Batch size: {}", config.ingest.batch_size);
    println!("   ├─ Batch timeout: {}ms", config.ingest.batch_timeout_ms);
    println!("   ├─ Filters: {:?}", config.ingest.subscribe_filters);
    match &config.ingest.publisher_namespace {
        Some(namespace) => println!("   └─ Publisher namespace: {}", namespace),
        None => println!("   └─ Publisher namespace: (disabled)"),
    }

    println!(
        "\n🔄 Caches: refresh every {}s",
        config.cache.refresh_interval_secs
    );

    if !config.bridges.is_empty() {
        println!("\n📤 Bridges ({})", config.bridges.len());
        for (i, bridge) in config.bridges.iter().enumerate() {
            let is_last = i == config.bridges.len() - 1;
            let prefix = if is_last { "└─" } else { "├─" };
            if args.bridges {
                println!(
                    "   {} {} ({} @ QoS {}, backoff {}s, {})",
                    prefix,
                    bridge.name,
                    bridge.subscribe_filter,
                    bridge.qos.as_u8(),
                    bridge.backoff_secs,
                    republish_mode(&bridge.republish)
                );
            } else {
                println!("   {} {}", prefix, bridge.name);
            }
        }
    }

    println!();
}

//! Run statistics and end-of-run summary.

use std::time::Duration;

use bridge::{BridgeSnapshot, LineageSnapshot};
use cache::CacheStats;
use ingest::IngestSnapshot;
use observability::MetricsSummary;

/// Statistics from a pipeline run
#[derive(Debug, Clone)]
pub struct RunStats {
    /// Total duration of the run
    pub duration: Duration,

    /// Ingest queue and batch worker counters
    pub ingest: IngestSnapshot,

    /// Per-bridge counters
    pub bridges: Vec<(String, BridgeSnapshot)>,

    /// Lineage writer counters
    pub lineage: LineageSnapshot,

    /// Mapping cache stats
    pub mapping_cache: CacheStats,

    /// Binding cache stats
    pub binding_cache: CacheStats,

    /// Aggregated periodic observations
    pub metrics: MetricsSummary,
}

impl RunStats {
    /// Ingested messages per second
    pub fn ingest_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.ingest.received as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Curation Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Ingest");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Received: {}", self.ingest.received);
        println!("   ├─ Rate: {:.2} msg/s", self.ingest_rate());
        println!("   ├─ Written: {}", self.ingest.messages_written);
        println!("   ├─ Batches: {}", self.ingest.batches_flushed);
        println!("   ├─ Shed (queue full): {}", self.ingest.dropped_queue_full);
        println!("   └─ Write errors: {}", self.ingest.write_errors);

        println!("\n✅ Conformance");
        println!("   ├─ Conformant: {}", self.ingest.conformant);
        println!("   ├─ Non-conformant: {}", self.ingest.non_conformant);
        println!("   └─ Unbound: {}", self.ingest.unbound);

        if !self.bridges.is_empty() {
            println!("\n📤 Bridges");
            for (i, (name, snapshot)) in self.bridges.iter().enumerate() {
                let is_last = i == self.bridges.len() - 1;
                let prefix = if is_last { "└─" } else { "├─" };
                println!(
                    "   {} {}: received={} transformed={} dropped={} rate={:.2} reconnects={}",
                    prefix,
                    name,
                    snapshot.received,
                    snapshot.transformed,
                    snapshot.dropped,
                    snapshot.transform_rate,
                    snapshot.reconnects
                );
            }
        }

        println!("\n🧬 Lineage");
        println!("   ├─ Written: {}", self.lineage.written);
        println!("   ├─ Failed: {}", self.lineage.failed);
        println!("   └─ Dropped: {}", self.lineage.dropped);

        println!("\n🔄 Caches");
        println!(
            "   ├─ Mappings: {} entries, hit rate {:.2} ({} refresh failures)",
            self.mapping_cache.size, self.mapping_cache.hit_rate, self.mapping_cache.refresh_failures
        );
        println!(
            "   └─ Bindings: {} entries, hit rate {:.2} ({} refresh failures)",
            self.binding_cache.size, self.binding_cache.hit_rate, self.binding_cache.refresh_failures
        );

        if self.metrics.polls > 0 {
            println!("\n📈 Observed over {} polls", self.metrics.polls);
            println!("   ├─ Queue depth: {}", self.metrics.queue_depth);
            for (name, rate) in &self.metrics.drop_rates {
                println!("   ├─ Drop rate [{}]: {}", name, rate);
            }
            if self.metrics.disconnect_observations.is_empty() {
                println!("   └─ Disconnects observed: none");
            } else {
                println!(
                    "   └─ Disconnects observed: {:?}",
                    self.metrics.disconnect_observations
                );
            }
        }

        println!();
    }
}

//! Curation metric helpers and in-memory aggregation
//!
//! Counters on the hot paths are emitted by the owning crates; the helpers
//! here cover the gauges the orchestrator publishes from periodic snapshot
//! polls, plus an aggregator that turns those polls into an end-of-run
//! summary.

use std::collections::BTreeMap;

use metrics::gauge;

/// Record the current depth of a bounded queue
pub fn record_queue_depth(queue: &str, depth: usize) {
    gauge!("curator_queue_depth", "queue" => queue.to_string()).set(depth as f64);
}

/// Record whether a connection pair is currently usable
pub fn record_connection_state(component: &str, connected: bool) {
    gauge!("curator_connected", "component" => component.to_string())
        .set(if connected { 1.0 } else { 0.0 });
}

/// Record a bridge's drop rate (dropped / received).
///
/// Dropping unmapped messages is expected steady-state; the gauge exists
/// so operators can alert on rate changes, not because a drop is an error.
pub fn record_drop_rate(bridge: &str, rate: f64) {
    gauge!("curator_bridge_drop_rate", "bridge" => bridge.to_string()).set(rate);
}

/// Running statistics accumulator (count / mean / min / max)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// Add a sample
    pub fn update(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.sum += value;
    }

    /// Sample count
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Summary of the accumulated samples
    pub fn summary(&self) -> StatsSummary {
        StatsSummary {
            count: self.count,
            mean: if self.count > 0 {
                self.sum / self.count as f64
            } else {
                0.0
            },
            min: if self.count > 0 { self.min } else { 0.0 },
            max: if self.count > 0 { self.max } else { 0.0 },
        }
    }
}

/// Summary of one RunningStats series
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "mean={:.2} min={:.2} max={:.2} (n={})",
            self.mean, self.min, self.max, self.count
        )
    }
}

/// Aggregates periodic pipeline snapshots into an end-of-run summary
#[derive(Debug, Clone, Default)]
pub struct CurationMetricsAggregator {
    /// Poll count
    polls: u64,
    /// Ingest queue depth over time
    queue_depth: RunningStats,
    /// Bridge drop rate over time, per bridge
    drop_rates: BTreeMap<String, RunningStats>,
    /// Disconnect observations per component
    disconnects: BTreeMap<String, u64>,
}

impl CurationMetricsAggregator {
    /// Record one poll of the ingest queue depth
    pub fn observe_queue_depth(&mut self, depth: usize) {
        self.polls += 1;
        self.queue_depth.update(depth as f64);
        record_queue_depth("ingest", depth);
    }

    /// Record one poll of a bridge's drop rate
    pub fn observe_drop_rate(&mut self, bridge: &str, received: u64, dropped: u64) {
        let rate = if received > 0 {
            dropped as f64 / received as f64
        } else {
            0.0
        };
        self.drop_rates
            .entry(bridge.to_string())
            .or_default()
            .update(rate);
        record_drop_rate(bridge, rate);
    }

    /// Record one poll of a component's connection state
    pub fn observe_connection(&mut self, component: &str, connected: bool) {
        if !connected {
            *self.disconnects.entry(component.to_string()).or_insert(0) += 1;
        }
        record_connection_state(component, connected);
    }

    /// Summary over every poll so far
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            polls: self.polls,
            queue_depth: self.queue_depth.summary(),
            drop_rates: self
                .drop_rates
                .iter()
                .map(|(name, stats)| (name.clone(), stats.summary()))
                .collect(),
            disconnect_observations: self.disconnects.clone(),
        }
    }
}

/// End-of-run metrics summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub polls: u64,
    pub queue_depth: StatsSummary,
    pub drop_rates: BTreeMap<String, StatsSummary>,
    pub disconnect_observations: BTreeMap<String, u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        stats.update(2.0);
        stats.update(4.0);
        stats.update(6.0);

        let summary = stats.summary();
        assert_eq!(summary.count, 3);
        assert!((summary.mean - 4.0).abs() < f64::EPSILON);
        assert!((summary.min - 2.0).abs() < f64::EPSILON);
        assert!((summary.max - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_stats_summary() {
        let summary = RunningStats::default().summary();
        assert_eq!(summary.count, 0);
        assert_eq!(summary.mean, 0.0);
    }

    #[test]
    fn test_aggregator_drop_rate() {
        let mut aggregator = CurationMetricsAggregator::default();
        aggregator.observe_drop_rate("main", 10, 5);
        aggregator.observe_drop_rate("main", 10, 0);

        let summary = aggregator.summary();
        let main = summary.drop_rates.get("main").unwrap();
        assert_eq!(main.count, 2);
        assert!((main.mean - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_aggregator_counts_disconnects() {
        let mut aggregator = CurationMetricsAggregator::default();
        aggregator.observe_connection("bridge:main", true);
        aggregator.observe_connection("bridge:main", false);
        aggregator.observe_connection("bridge:main", false);

        let summary = aggregator.summary();
        assert_eq!(summary.disconnect_observations.get("bridge:main"), Some(&2));
    }
}

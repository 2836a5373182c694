//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes only the counters the import pipeline reports.

use std::sync::Arc;

use prometheus::core::Collector;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{MetricStage, Result, TelemetryError};

/// Prometheus-backed metrics registry shared across the pipeline.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    pipeline_steps_total: IntCounterVec,
    pipeline_runs_total: IntCounterVec,
    events_emitted_total: IntCounterVec,
    files_discovered_total: IntCounter,
    bytes_cached_total: IntCounter,
    entries_detected_total: IntCounter,
    active_runs: IntGauge,
}

/// Snapshot of selected gauges and counters for health reporting.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Runs currently executing.
    pub active_runs: i64,
    /// Candidate files found by discovery.
    pub files_discovered_total: u64,
    /// Bytes copied into the cache.
    pub bytes_cached_total: u64,
    /// Top-level vCard entries counted by the collector.
    pub entries_detected_total: u64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let pipeline_steps_total = counter_vec(
            "pipeline_steps_total",
            "Import pipeline steps executed by status",
            &["step", "status"],
        )?;
        let pipeline_runs_total = counter_vec(
            "pipeline_runs_total",
            "Import pipeline runs by terminal outcome",
            &["outcome"],
        )?;
        let events_emitted_total = counter_vec(
            "events_emitted_total",
            "Pipeline events emitted by type",
            &["type"],
        )?;
        let files_discovered_total = counter(
            "files_discovered_total",
            "Candidate files found by discovery",
        )?;
        let bytes_cached_total = counter("bytes_cached_total", "Bytes copied into the cache")?;
        let entries_detected_total = counter(
            "entries_detected_total",
            "Top-level vCard entries counted during meta collection",
        )?;
        let active_runs = IntGauge::with_opts(Opts::new("active_runs", "Runs in progress"))
            .map_err(|source| TelemetryError::metric("active_runs", MetricStage::Build, source))?;

        register(&registry, "pipeline_steps_total", &pipeline_steps_total)?;
        register(&registry, "pipeline_runs_total", &pipeline_runs_total)?;
        register(&registry, "events_emitted_total", &events_emitted_total)?;
        register(&registry, "files_discovered_total", &files_discovered_total)?;
        register(&registry, "bytes_cached_total", &bytes_cached_total)?;
        register(&registry, "entries_detected_total", &entries_detected_total)?;
        register(&registry, "active_runs", &active_runs)?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                pipeline_steps_total,
                pipeline_runs_total,
                events_emitted_total,
                files_discovered_total,
                bytes_cached_total,
                entries_detected_total,
                active_runs,
            }),
        })
    }

    /// Increment the pipeline step counter.
    pub fn inc_pipeline_step(&self, step: &str, status: &str) {
        self.inner
            .pipeline_steps_total
            .with_label_values(&[step, status])
            .inc();
    }

    /// Record a run reaching a terminal outcome.
    pub fn inc_run_outcome(&self, outcome: &str) {
        self.inner
            .pipeline_runs_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Increment the emitted event counter for the specific event type.
    pub fn inc_event(&self, event_type: &str) {
        self.inner
            .events_emitted_total
            .with_label_values(&[event_type])
            .inc();
    }

    /// Add discovered candidates.
    pub fn add_files_discovered(&self, count: u64) {
        self.inner.files_discovered_total.inc_by(count);
    }

    /// Add bytes copied into the cache.
    pub fn add_bytes_cached(&self, bytes: u64) {
        self.inner.bytes_cached_total.inc_by(bytes);
    }

    /// Add counted entries.
    pub fn add_entries_detected(&self, entries: u64) {
        self.inner.entries_detected_total.inc_by(entries);
    }

    /// Mark a run as started.
    pub fn run_started(&self) {
        self.inner.active_runs.inc();
    }

    /// Mark a run as finished.
    pub fn run_finished(&self) {
        self.inner.active_runs.dec();
    }

    /// Current value of the step counter for one label pair.
    #[must_use]
    pub fn pipeline_step_count(&self, step: &str, status: &str) -> u64 {
        self.inner
            .pipeline_steps_total
            .with_label_values(&[step, status])
            .get()
    }

    /// Current value of the run outcome counter for one outcome.
    #[must_use]
    pub fn run_outcome_count(&self, outcome: &str) -> u64 {
        self.inner
            .pipeline_runs_total
            .with_label_values(&[outcome])
            .get()
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::Render { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::RenderUtf8 { source })
    }

    /// Take a point-in-time snapshot of the most relevant gauges and counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            active_runs: self.inner.active_runs.get(),
            files_discovered_total: self.inner.files_discovered_total.get(),
            bytes_cached_total: self.inner.bytes_cached_total.get(),
            entries_detected_total: self.inner.entries_detected_total.get(),
        }
    }
}

fn counter(name: &'static str, help: &str) -> Result<IntCounter> {
    IntCounter::with_opts(Opts::new(name, help))
        .map_err(|source| TelemetryError::metric(name, MetricStage::Build, source))
}

fn counter_vec(name: &'static str, help: &str, labels: &[&str]) -> Result<IntCounterVec> {
    IntCounterVec::new(Opts::new(name, help), labels)
        .map_err(|source| TelemetryError::metric(name, MetricStage::Build, source))
}

fn register<C>(registry: &Registry, name: &'static str, collector: &C) -> Result<()>
where
    C: Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::metric(name, MetricStage::Register, source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_snapshot_reflects_updates() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.inc_pipeline_step("copy_sources", "completed");
        metrics.inc_run_outcome("dispatched");
        metrics.inc_event("scan_started");
        metrics.add_files_discovered(3);
        metrics.add_bytes_cached(2_048);
        metrics.add_entries_detected(7);
        metrics.run_started();

        let snapshot = metrics.snapshot();
        assert_eq!(
            snapshot,
            MetricsSnapshot {
                active_runs: 1,
                files_discovered_total: 3,
                bytes_cached_total: 2_048,
                entries_detected_total: 7,
            }
        );
        assert_eq!(metrics.pipeline_step_count("copy_sources", "completed"), 1);
        assert_eq!(metrics.run_outcome_count("dispatched"), 1);

        metrics.run_finished();
        assert_eq!(metrics.snapshot().active_runs, 0);

        let rendered = metrics.render()?;
        assert!(rendered.contains("pipeline_steps_total"));
        assert!(rendered.contains("pipeline_runs_total{outcome=\"dispatched\"} 1"));
        assert!(rendered.contains("bytes_cached_total 2048"));
        Ok(())
    }

    #[test]
    fn clones_share_one_registry() -> Result<()> {
        let metrics = Metrics::new()?;
        let clone = metrics.clone();
        clone.add_files_discovered(2);
        assert_eq!(metrics.snapshot().files_discovered_total, 2);
        Ok(())
    }

    #[test]
    fn snapshot_serialises() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let metrics = Metrics::new()?;
        let json = serde_json::to_value(metrics.snapshot())?;
        assert_eq!(json["active_runs"], 0);
        Ok(())
    }
}

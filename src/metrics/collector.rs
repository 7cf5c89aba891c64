//! Metrics collection and registry.

use crate::files::Stats;
use prometheus::{Encoder, Gauge, IntCounter, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Registration or encoding failed.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// Prometheus registry for debiasing sessions.
pub struct MetricsRegistry {
    registry: Registry,

    // Volume
    streams_total: IntCounter,
    bytes_in_total: IntCounter,
    bytes_out_total: IntCounter,
    cipher_cycles_total: IntCounter,

    // Extraction decisions
    output_bits_total: IntCounter,
    discard_bits_total: IntCounter,

    // Last stream
    last_duration_seconds: Gauge,
    last_yield_ratio: Gauge,
}

impl MetricsRegistry {
    /// Creates a registry with every debias metric registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let streams_total =
            IntCounter::new("debias_streams_total", "Total number of streams processed")?;
        let bytes_in_total =
            IntCounter::new("debias_bytes_in_total", "Total raw input bytes consumed")?;
        let bytes_out_total =
            IntCounter::new("debias_bytes_out_total", "Total output bytes delivered")?;
        let cipher_cycles_total = IntCounter::new(
            "debias_cipher_cycles_total",
            "Total Kaminsky encryption cycles run",
        )?;

        let output_bits_total = IntCounter::new(
            "debias_output_bits_total",
            "Total bits kept by the von Neumann extractor",
        )?;
        let discard_bits_total = IntCounter::new(
            "debias_discard_bits_total",
            "Total bits routed to the discard stream",
        )?;

        let last_duration_seconds = Gauge::new(
            "debias_last_duration_seconds",
            "Wall-clock duration of the most recent stream",
        )?;
        let last_yield_ratio = Gauge::new(
            "debias_last_yield_ratio",
            "Output bytes per input byte of the most recent stream",
        )?;

        registry.register(Box::new(streams_total.clone()))?;
        registry.register(Box::new(bytes_in_total.clone()))?;
        registry.register(Box::new(bytes_out_total.clone()))?;
        registry.register(Box::new(cipher_cycles_total.clone()))?;
        registry.register(Box::new(output_bits_total.clone()))?;
        registry.register(Box::new(discard_bits_total.clone()))?;
        registry.register(Box::new(last_duration_seconds.clone()))?;
        registry.register(Box::new(last_yield_ratio.clone()))?;

        Ok(Self {
            registry,
            streams_total,
            bytes_in_total,
            bytes_out_total,
            cipher_cycles_total,
            output_bits_total,
            discard_bits_total,
            last_duration_seconds,
            last_yield_ratio,
        })
    }

    /// Folds one finished stream into the metrics.
    pub fn record(&self, stats: &Stats) {
        let report = &stats.report;

        self.streams_total.inc();
        self.bytes_in_total.inc_by(report.bytes_in);
        self.bytes_out_total.inc_by(report.bytes_out);
        self.cipher_cycles_total.inc_by(report.cipher_cycles);
        self.output_bits_total.inc_by(report.output_bits);
        self.discard_bits_total.inc_by(report.discard_bits);

        self.last_duration_seconds.set(stats.duration.as_secs_f64());
        self.last_yield_ratio.set(stats.yield_ratio());
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

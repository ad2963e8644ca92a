//! Process-level metrics registry and text exposition

use prometheus::proto::MetricFamily;
use prometheus::{Encoder, IntCounter, Opts, Registry, TextEncoder};

use crate::error::Result;

/// Metrics owned by the process bootstrap and injected where they are updated
#[derive(Clone)]
pub struct ExporterMetrics {
    registry: Registry,
    refresh_errors: IntCounter,
}

impl ExporterMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let refresh_errors = IntCounter::with_opts(
            Opts::new("refresh_labels_errors_total", "Number of refresh labels errors.")
                .namespace("gmail"),
        )?;
        registry.register(Box::new(refresh_errors.clone()))?;

        Ok(Self {
            registry,
            refresh_errors,
        })
    }

    /// Handle to the refresh failure counter; clones share the same value
    pub fn refresh_errors(&self) -> IntCounter {
        self.refresh_errors.clone()
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }
}

/// Render families in the Prometheus text format, sorted by name
///
/// Always text format 0.0.4 regardless of the scraper's `Accept` header;
/// the `prometheus` crate has no OpenMetrics encoder, so scrapers asking
/// for `application/openmetrics-text` fall back to the classic format.
pub fn encode_text(mut families: Vec<MetricFamily>) -> Result<Vec<u8>> {
    families.sort_by(|a, b| a.get_name().cmp(b.get_name()));

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&families, &mut buffer)?;
    Ok(buffer)
}

//! Common test utilities and fixtures

#![allow(dead_code)]

use axum::Router;
use gmail_exporter::error::Result;
use gmail_exporter::models::{LabelDetail, LabelSummary};
use gmail_exporter::server::{self, AppState};
use gmail_exporter::{label_snapshot, BearerAuthorizer, ExporterMetrics, LabelCollector, LabelSource};
use mockall::mock;
use std::sync::Arc;

pub const SCRAPE_TOKEN: &str = "correct-token";

/// Create a user label
pub fn create_test_label(id: &str, name: &str) -> LabelSummary {
    LabelSummary::new(id, name, "user")
}

/// Create a system label
pub fn create_system_label(id: &str, name: &str) -> LabelSummary {
    LabelSummary::new(id, name, "system")
}

/// Router over a fixed snapshot, guarded by [`SCRAPE_TOKEN`]
pub fn scrape_app(source: MockLabelSource, labels: Vec<LabelSummary>) -> (Router, ExporterMetrics) {
    let (mut writer, reader) = label_snapshot();
    writer.replace(labels);

    let metrics = ExporterMetrics::new().unwrap();
    let collector = LabelCollector::new(Arc::new(source), reader, 4);
    let state = AppState::new(
        BearerAuthorizer::new(SCRAPE_TOKEN.as_bytes()),
        collector,
        metrics.clone(),
    );
    (server::router(state, "/metrics"), metrics)
}

/// Value of the `metric` sample whose `label_id` is `label_id`
pub fn sample_value(text: &str, metric: &str, label_id: &str) -> Option<f64> {
    let prefix = format!("{}{{", metric);
    let id_pair = format!("label_id=\"{}\"", label_id);
    text.lines()
        .filter(|line| line.starts_with(&prefix) && line.contains(&id_pair))
        .find_map(|line| line.rsplit(' ').next()?.parse().ok())
}

/// Number of samples of `metric` in a text exposition
pub fn sample_count(text: &str, metric: &str) -> usize {
    let prefix = format!("{}{{", metric);
    text.lines().filter(|line| line.starts_with(&prefix)).count()
}

// Mock implementation of LabelSource for testing
mock! {
    pub LabelSource {}

    #[async_trait::async_trait]
    impl LabelSource for LabelSource {
        async fn list_labels(&self) -> Result<Vec<LabelSummary>>;
        async fn get_label_detail(&self, id: &str) -> Result<LabelDetail>;
    }
}

//! Per-scrape label metrics
//!
//! Each scrape copies the current snapshot, fetches counts for every label and
//! only then builds the gauge families. Any failed detail call aborts the scrape
//! so it contributes no label samples at all.

use futures::stream::{self, StreamExt, TryStreamExt};
use prometheus::proto::MetricFamily;
use prometheus::{GaugeVec, Opts, Registry};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

use crate::client::LabelSource;
use crate::error::{ExporterError, Result};
use crate::models::{LabelDetail, LabelSummary, LABEL_DIMENSIONS};
use crate::snapshot::SnapshotReader;

pub const MESSAGES_TOTAL: &str = "gmail_messages_total";
pub const MESSAGES_UNREAD: &str = "gmail_messages_unread_total";

const MESSAGES_TOTAL_HELP: &str = "total messages for a gmail label";
const MESSAGES_UNREAD_HELP: &str = "unread messages for a gmail label";

#[derive(Clone)]
pub struct LabelCollector {
    source: Arc<dyn LabelSource>,
    snapshot: SnapshotReader,
    max_concurrent: usize,
}

impl LabelCollector {
    /// `max_concurrent` bounds detail calls in flight within one scrape
    pub fn new(source: Arc<dyn LabelSource>, snapshot: SnapshotReader, max_concurrent: usize) -> Self {
        Self {
            source,
            snapshot,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Collect both gauge families for every label in the current snapshot
    ///
    /// Returns no families when the snapshot is empty.
    pub async fn collect(&self) -> Result<Vec<MetricFamily>> {
        let started = Instant::now();
        let labels = self.snapshot.read();

        // Owned ids, not borrows of the snapshot, keep the scrape future Send
        let ids: Vec<String> = labels.iter().map(|label| label.id.clone()).collect();
        let details: Vec<LabelDetail> = stream::iter(ids)
            .map(|label_id| {
                let source = Arc::clone(&self.source);
                async move {
                    let result = source.get_label_detail(&label_id).await;
                    result.map_err(|e| ExporterError::LabelDetail {
                        label_id,
                        source: Box::new(e),
                    })
                }
            })
            .buffered(self.max_concurrent)
            .try_collect()
            .await
            .map_err(|e| {
                error!(error = %e, "Aborting scrape, no label metrics reported");
                e
            })?;

        let families = label_families(&labels, &details)?;
        debug!(
            labels = labels.len(),
            elapsed = ?started.elapsed(),
            "Collected label metrics"
        );
        Ok(families)
    }
}

/// Build gauge families from labels and their details, matched by position
fn label_families(labels: &[LabelSummary], details: &[LabelDetail]) -> Result<Vec<MetricFamily>> {
    if labels.len() != details.len() {
        return Err(ExporterError::Internal(format!(
            "{} labels but {} label details",
            labels.len(),
            details.len()
        )));
    }

    let total = GaugeVec::new(Opts::new(MESSAGES_TOTAL, MESSAGES_TOTAL_HELP), &LABEL_DIMENSIONS)?;
    let unread = GaugeVec::new(
        Opts::new(MESSAGES_UNREAD, MESSAGES_UNREAD_HELP),
        &LABEL_DIMENSIONS,
    )?;

    let registry = Registry::new();
    registry.register(Box::new(total.clone()))?;
    registry.register(Box::new(unread.clone()))?;

    for (label, detail) in labels.iter().zip(details) {
        let values = label.dimension_values();
        total
            .get_metric_with_label_values(&values)?
            .set(detail.messages_total as f64);
        unread
            .get_metric_with_label_values(&values)?
            .set(detail.messages_unread as f64);
    }

    Ok(registry.gather())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockLabelSource;
    use crate::snapshot::label_snapshot;
    use async_trait::async_trait;
    use prometheus::proto::Metric;
    use std::time::Duration;
    use tokio::sync::{Notify, Semaphore};

    /// Detail calls stay pending until the test releases them
    struct GatedSource {
        entered: Notify,
        gate: Semaphore,
    }

    impl GatedSource {
        fn new() -> Self {
            Self {
                entered: Notify::new(),
                gate: Semaphore::new(0),
            }
        }
    }

    #[async_trait]
    impl LabelSource for GatedSource {
        async fn list_labels(&self) -> Result<Vec<LabelSummary>> {
            Ok(Vec::new())
        }

        async fn get_label_detail(&self, _id: &str) -> Result<LabelDetail> {
            self.entered.notify_one();
            let _permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| ExporterError::Internal(e.to_string()))?;
            Ok(LabelDetail::new(7, 1))
        }
    }

    fn label_ids(families: &[MetricFamily], name: &str) -> Vec<String> {
        let mut ids: Vec<String> = family(families, name)
            .get_metric()
            .iter()
            .map(|metric| label_value(metric, "label_id").to_string())
            .collect();
        ids.sort();
        ids
    }

    fn collector_with(mock: MockLabelSource, labels: Vec<LabelSummary>) -> LabelCollector {
        let (mut writer, reader) = label_snapshot();
        writer.replace(labels);
        LabelCollector::new(Arc::new(mock), reader, 4)
    }

    fn family<'a>(families: &'a [MetricFamily], name: &str) -> &'a MetricFamily {
        families
            .iter()
            .find(|f| f.get_name() == name)
            .unwrap_or_else(|| panic!("missing family {}", name))
    }

    fn label_value<'a>(metric: &'a Metric, name: &str) -> &'a str {
        metric
            .get_label()
            .iter()
            .find(|pair| pair.get_name() == name)
            .map(|pair| pair.get_value())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_single_label_emits_two_samples() {
        let mut mock = MockLabelSource::new();
        mock.expect_get_label_detail()
            .withf(|id| id == "L1")
            .times(1)
            .returning(|_| Ok(LabelDetail::new(10, 3)));

        let collector = collector_with(mock, vec![LabelSummary::new("L1", "Inbox", "system")]);
        let families = collector.collect().await.unwrap();
        assert_eq!(families.len(), 2);

        let total = family(&families, MESSAGES_TOTAL);
        assert_eq!(total.get_help(), MESSAGES_TOTAL_HELP);
        assert_eq!(total.get_metric().len(), 1);
        let sample = &total.get_metric()[0];
        assert_eq!(sample.get_gauge().get_value(), 10.0);
        assert_eq!(label_value(sample, "label_id"), "L1");
        assert_eq!(label_value(sample, "label_name"), "Inbox");
        assert_eq!(label_value(sample, "label_type"), "system");

        let unread = family(&families, MESSAGES_UNREAD);
        assert_eq!(unread.get_metric().len(), 1);
        assert_eq!(unread.get_metric()[0].get_gauge().get_value(), 3.0);
        assert_eq!(label_value(&unread.get_metric()[0], "label_id"), "L1");
    }

    #[tokio::test]
    async fn test_any_detail_failure_aborts_scrape() {
        let mut mock = MockLabelSource::new();
        mock.expect_get_label_detail().returning(|id| {
            if id == "L2" {
                Err(ExporterError::NetworkError("reset".to_string()))
            } else {
                Ok(LabelDetail::new(1, 0))
            }
        });

        let collector = collector_with(
            mock,
            vec![
                LabelSummary::new("L1", "Inbox", "system"),
                LabelSummary::new("L2", "Work", "user"),
                LabelSummary::new("L3", "Home", "user"),
            ],
        );

        match collector.collect().await {
            Err(ExporterError::LabelDetail { label_id, source }) => {
                assert_eq!(label_id, "L2");
                assert!(matches!(*source, ExporterError::NetworkError(_)));
            }
            other => panic!("expected label detail error, got {:?}", other.map(|f| f.len())),
        }
    }

    #[tokio::test]
    async fn test_empty_snapshot_emits_nothing() {
        let mut mock = MockLabelSource::new();
        mock.expect_get_label_detail().times(0);

        let collector = collector_with(mock, Vec::new());
        assert!(collector.collect().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_every_label_is_reported() {
        let mut mock = MockLabelSource::new();
        mock.expect_get_label_detail().times(3).returning(|id| {
            let n: u64 = id.trim_start_matches('L').parse().unwrap();
            Ok(LabelDetail::new(n * 10, n))
        });

        let collector = collector_with(
            mock,
            vec![
                LabelSummary::new("L3", "C", "user"),
                LabelSummary::new("L1", "A", "system"),
                LabelSummary::new("L2", "B", "user"),
            ],
        );
        let families = collector.collect().await.unwrap();

        let total = family(&families, MESSAGES_TOTAL);
        assert_eq!(total.get_metric().len(), 3);
        for sample in total.get_metric() {
            let n: f64 = label_value(sample, "label_id")
                .trim_start_matches('L')
                .parse()
                .unwrap();
            assert_eq!(sample.get_gauge().get_value(), n * 10.0);
        }
        assert_eq!(family(&families, MESSAGES_UNREAD).get_metric().len(), 3);
    }

    #[test]
    fn test_label_families_rejects_mismatched_lengths() {
        let labels = vec![LabelSummary::new("L1", "Inbox", "system")];
        let result = label_families(&labels, &[]);
        assert!(matches!(result, Err(ExporterError::Internal(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_collect_runs_on_spawned_task() {
        let mut mock = MockLabelSource::new();
        mock.expect_get_label_detail()
            .returning(|_| Ok(LabelDetail::new(10, 3)));

        let collector = collector_with(
            mock,
            vec![
                LabelSummary::new("L1", "Inbox", "system"),
                LabelSummary::new("L2", "Work", "user"),
            ],
        );
        let families = tokio::spawn(async move { collector.collect().await })
            .await
            .unwrap()
            .unwrap();

        assert_eq!(label_ids(&families, MESSAGES_TOTAL), vec!["L1", "L2"]);
        assert_eq!(label_ids(&families, MESSAGES_UNREAD), vec!["L1", "L2"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_refresh_during_scrape_keeps_scrape_consistent() {
        let (mut writer, reader) = label_snapshot();
        writer.replace(vec![
            LabelSummary::new("L1", "Inbox", "system"),
            LabelSummary::new("L2", "Work", "user"),
        ]);

        let source = Arc::new(GatedSource::new());
        let collector = LabelCollector::new(source.clone(), reader.clone(), 4);
        let scrape = tokio::spawn(async move { collector.collect().await });

        // A detail call is in flight; the snapshot must not be locked by it
        source.entered.notified().await;
        let replace = tokio::task::spawn_blocking(move || {
            writer.replace(vec![LabelSummary::new("L3", "Receipts", "user")]);
        });
        tokio::time::timeout(Duration::from_secs(5), replace)
            .await
            .expect("replace blocked behind a pending scrape")
            .unwrap();

        let ids: Vec<_> = reader.read().iter().map(|l| l.id.clone()).collect();
        assert_eq!(ids, vec!["L3"]);

        source.gate.add_permits(10);
        let families = tokio::time::timeout(Duration::from_secs(5), scrape)
            .await
            .expect("scrape did not finish")
            .unwrap()
            .unwrap();

        assert_eq!(label_ids(&families, MESSAGES_TOTAL), vec!["L1", "L2"]);
        assert_eq!(label_ids(&families, MESSAGES_UNREAD), vec!["L1", "L2"]);
    }
}

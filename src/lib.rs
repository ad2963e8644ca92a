//! Gmail Label Exporter
//!
//! Polls a Gmail account's labels on a fixed interval and serves per-label
//! message counts as Prometheus metrics behind a bearer token.
//!
//! # Overview
//!
//! - **Snapshot**: the latest label list, swapped whole by the poller
//! - **Poller**: refreshes the snapshot periodically, counting failures
//! - **Collector**: on each scrape, fetches counts for every snapshot label
//!   and reports all of them or none
//! - **Authorizer**: constant-time bearer token check for the scrape endpoint
//!
//! # Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use gmail_exporter::{
//!     auth, client::GmailLabelSource, config::Config, BearerAuthorizer, ExporterMetrics,
//!     LabelCollector, LabelPoller,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml".as_ref()).await?;
//!     let hub = auth::initialize_gmail_hub(
//!         "credentials.json".as_ref(),
//!         "token.json".as_ref(),
//!     ).await?;
//!
//!     let source: Arc<dyn gmail_exporter::LabelSource> =
//!         Arc::new(GmailLabelSource::new(hub, &config.gmail));
//!     let metrics = ExporterMetrics::new()?;
//!     let (writer, reader) = gmail_exporter::label_snapshot();
//!
//!     let shutdown = CancellationToken::new();
//!     let poller = LabelPoller::new(
//!         Arc::clone(&source),
//!         writer,
//!         metrics.refresh_errors(),
//!         config.refresh.period(),
//!     )?;
//!     tokio::spawn(poller.run(shutdown.child_token()));
//!
//!     let collector = LabelCollector::new(source, reader, config.gmail.max_concurrent_requests);
//!     let state = gmail_exporter::server::AppState::new(
//!         BearerAuthorizer::new(b"token"),
//!         collector,
//!         metrics,
//!     );
//!     let app = gmail_exporter::server::router(state, &config.server.metrics_path);
//!     let listener = tokio::net::TcpListener::bind(config.server.socket_addr()?).await?;
//!     gmail_exporter::server::serve(listener, app, shutdown).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`auth`] - OAuth2 bootstrap of the Gmail API hub
//! - [`authorizer`] - Bearer token check for scrapes
//! - [`cli`] - Command-line interface
//! - [`client`] - Label source trait and Gmail implementation
//! - [`collector`] - Per-scrape label gauges
//! - [`config`] - Configuration management
//! - [`error`] - Error types and result aliases
//! - [`metrics`] - Process registry and text encoding
//! - [`models`] - Label data structures
//! - [`poller`] - Periodic label refresh
//! - [`server`] - HTTP scrape endpoint
//! - [`snapshot`] - Shared label snapshot

pub mod auth;
pub mod authorizer;
pub mod cli;
pub mod client;
pub mod collector;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod poller;
pub mod server;
pub mod snapshot;

pub use error::{ExporterError, Result};

pub use authorizer::{BearerAuthorizer, Unauthorized};
pub use client::{GmailLabelSource, LabelSource};
pub use collector::LabelCollector;
pub use config::Config;
pub use metrics::ExporterMetrics;
pub use models::{LabelDetail, LabelSummary};
pub use poller::LabelPoller;
pub use snapshot::{label_snapshot, SnapshotReader, SnapshotWriter};

use anyhow::{Context, Result};
use clap::Parser;
use gmail_exporter::authorizer::{load_scrape_token, BearerAuthorizer};
use gmail_exporter::cli::{Cli, Commands};
use gmail_exporter::client::{GmailLabelSource, LabelSource};
use gmail_exporter::config::Config;
use gmail_exporter::error::ExporterError;
use gmail_exporter::server::{self, AppState};
use gmail_exporter::{label_snapshot, ExporterMetrics, LabelCollector, LabelPoller};
use std::process;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Exit with proper code on error
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        eprintln!("\nFor help, run: gmail-exporter --help");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Install default crypto provider for rustls
    // This is necessary because multiple dependencies use different crypto providers
    #[cfg(not(windows))]
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install default crypto provider"))?;

    #[cfg(windows)]
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install default crypto provider"))?;

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("gmail_exporter=debug,info"))
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("gmail_exporter=info,warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command() {
        Commands::Serve => serve(&cli).await,

        Commands::InitConfig { output, force } => {
            if output.exists() && !force {
                return Err(ExporterError::ConfigError(format!(
                    "Configuration file already exists at {:?}. Use --force to overwrite.",
                    output
                ))
                .into());
            }

            Config::create_example(&output).await?;
            println!("Created example configuration file at: {:?}", output);
            Ok(())
        }
    }
}

async fn serve(cli: &Cli) -> Result<()> {
    let mut config = Config::load(&cli.config).await?;
    if let Some(listen) = &cli.listen {
        config.server.listen_addr = listen.clone();
        config.validate()?;
    }

    let scrape_token = load_scrape_token(&cli.scrape_token).await?;
    let authorizer = BearerAuthorizer::new(&scrape_token);
    drop(scrape_token);

    tracing::info!("Authenticating with Gmail API...");
    let hub = gmail_exporter::auth::initialize_gmail_hub(&cli.credentials, &cli.token_cache)
        .await
        .context("Unable to retrieve Gmail client")?;

    let source: Arc<dyn LabelSource> = Arc::new(GmailLabelSource::new(hub, &config.gmail));
    let metrics = ExporterMetrics::new()?;
    let (writer, reader) = label_snapshot();
    let shutdown = CancellationToken::new();

    let mut poller = LabelPoller::new(
        Arc::clone(&source),
        writer,
        metrics.refresh_errors(),
        config.refresh.period(),
    )?;
    // Initial refresh before serving; a failure here is counted and logged, not fatal
    if let Ok(count) = poller.refresh().await {
        tracing::info!(labels = count, "Initial label refresh complete");
    }
    let poller_task = tokio::spawn(poller.run_periodic(shutdown.child_token()));

    let collector = LabelCollector::new(source, reader, config.gmail.max_concurrent_requests);
    let app = server::router(
        AppState::new(authorizer, collector, metrics),
        &config.server.metrics_path,
    );

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Unable to listen at {}", addr))?;

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            return;
        }
        tracing::info!("Received shutdown signal");
        signal_token.cancel();
    });

    let served = server::serve(listener, app, shutdown.clone()).await;
    shutdown.cancel();
    poller_task.await.context("Label poller panicked")?;

    served?;
    Ok(())
}

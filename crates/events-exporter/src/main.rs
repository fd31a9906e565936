//! events-exporter - Prometheus exporter for Kubernetes events
//!
//! Reads a JSON events stream, keeps every event as a `kube_event_info`
//! gauge until its TTL expires, and serves the exposition over HTTP.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use event_vault::{ExpositionRegistry, MetricsVault};
use events_exporter::{
    event_mapping, logging, source, Config, EventHandler, ExporterResult, MetricsServer, Sweeper,
};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Events buffered between the source and the handler.
const EVENT_BUFFER: usize = 1024;

/// How long tasks get to wind down after cancellation.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    logging::init(&config.log_level, config.log_format)?;

    let code = run(config).await?;

    // The blocking source read cannot be interrupted, so leave without
    // waiting for it.
    std::process::exit(code)
}

async fn run(config: Config) -> anyhow::Result<i32> {
    let source = source::open(&config.events_source)?.with_selector(config.selector()?);

    let registry = ExpositionRegistry::new();
    let mut vault = MetricsVault::new();
    vault.register_mappings([event_mapping(config.events_ttl)], &registry)?;
    let vault = Arc::new(vault);

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!(
        address = %config.exporter_address,
        source = %config.events_source,
        selector = %config.field_selector,
        ttl = ?config.events_ttl,
        omit_messages = config.omit_events_messages,
        "Starting events exporter"
    );

    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);

    let mut source_task = tokio::task::spawn_blocking(move || source.run(&tx));
    tokio::spawn(EventHandler::new(Arc::clone(&vault), config.omit_events_messages).run(rx));
    let sweeper_task = tokio::spawn(
        Sweeper::new(Arc::clone(&vault), config.sweep_interval).run(cancel.clone()),
    );

    let server = MetricsServer::new(registry);
    let server_cancel = cancel.clone();
    let addr = config.exporter_address;
    let mut server_task = tokio::spawn(async move {
        server
            .serve_with_shutdown(addr, async move { server_cancel.cancelled().await })
            .await
    });

    let code = tokio::select! {
        _ = sigterm.recv() => {
            info!(signal = "SIGTERM", "Shutting down");
            0
        }
        _ = sigint.recv() => {
            info!(signal = "SIGINT", "Shutting down");
            0
        }
        result = &mut source_task => {
            report("events source", result);
            1
        }
        result = &mut server_task => {
            report("metrics server", result);
            1
        }
    };

    cancel.cancel();
    let wind_down = async {
        if !server_task.is_finished() {
            let _ = server_task.await;
        }
        let _ = sweeper_task.await;
    };
    if tokio::time::timeout(SHUTDOWN_GRACE, wind_down).await.is_err() {
        warn!(grace = ?SHUTDOWN_GRACE, "Tasks did not stop in time");
    }

    Ok(code)
}

fn report(task: &str, result: Result<ExporterResult<()>, JoinError>) {
    match result {
        Ok(Ok(())) => warn!(task, "Task stopped unexpectedly"),
        Ok(Err(e)) => error!(task, error = %e, "Task failed"),
        Err(e) => error!(task, error = %e, "Task panicked"),
    }
}

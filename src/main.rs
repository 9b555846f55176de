use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinSet;

use capgate::capabilities::{register_builtin, Providers};
use capgate::logging;
use capgate::permissions::{AppConfig, Policy, PolicySeeds};
use capgate::router::{Response, Router};

const CONFIG_ENV: &str = "CAPGATE_CONFIG";
const PROJECT_DIR_ENV: &str = "CAPGATE_PROJECT_DIR";

#[tokio::main]
async fn main() -> Result<()> {
    // Keep the guard alive so file logs flush on exit
    let _log_guard = logging::init_logging()?;

    tracing::info!("=== capgate starting ===");

    let config = load_config()?;
    let seeds = match std::env::var_os(PROJECT_DIR_ENV) {
        Some(dir) => PolicySeeds::new().with_project_dir(dir),
        None => PolicySeeds::from_env(),
    };
    let policy = Arc::new(Policy::from_config(&config, &seeds));

    let router = Arc::new(Router::new());
    register_builtin(&router, Arc::clone(&policy), Providers::default())?;

    tracing::info!(
        "Serving '{}' in {:?} mode on stdio",
        config.identifier,
        policy.mode()
    );

    serve(router).await?;

    tracing::info!("=== capgate shutting down ===");

    Ok(())
}

/// Config path: first argument, else `CAPGATE_CONFIG`
fn load_config() -> Result<AppConfig> {
    let path = std::env::args_os()
        .nth(1)
        .or_else(|| std::env::var_os(CONFIG_ENV))
        .map(PathBuf::from)
        .with_context(|| format!("usage: capgate <config.json> (or set {})", CONFIG_ENV))?;

    AppConfig::load(&path).with_context(|| format!("failed to load config {}", path.display()))
}

/// Read newline-delimited requests until EOF, answering each on stdout
async fn serve(router: Arc<Router>) -> Result<()> {
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();

    // Single writer so lines never interleave
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = out_rx.recv().await {
            let written = async {
                stdout.write_all(line.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await
            };
            if let Err(e) = written.await {
                tracing::error!("Failed to write to stdout: {}", e);
                break;
            }
        }
    });

    let mut events = router.subscribe();
    let event_tx = out_tx.clone();
    let forwarder = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if event_tx.send(event.encode()).is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("Event stream lagged, dropped {} events", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let mut reader = BufReader::new(tokio::io::stdin());
    let mut buf = Vec::new();
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            read = reader.read_until(b'\n', &mut buf) => {
                if read.context("failed to read stdin")? == 0 {
                    break;
                }
                let line = String::from_utf8_lossy(&buf).trim().to_string();
                buf.clear();
                if line.is_empty() {
                    continue;
                }

                let router = Arc::clone(&router);
                let out_tx = out_tx.clone();
                in_flight.spawn(async move {
                    let response = dispatch_line(router, line).await;
                    // The writer only goes away on a broken stdout
                    let _ = out_tx.send(response);
                });
            }
            Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
        }
    }

    tracing::info!("stdin closed, waiting for {} in-flight requests", in_flight.len());
    while in_flight.join_next().await.is_some() {}

    forwarder.abort();
    drop(out_tx);
    writer.await.context("stdout writer failed")?;

    Ok(())
}

/// Dispatch in its own task so a panicking handler still yields a response
async fn dispatch_line(router: Arc<Router>, line: String) -> String {
    let id = request_id(&line);
    let task = tokio::spawn(async move { router.dispatch(&line).await });

    match task.await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(id = %id, "Handler task failed: {}", e);
            Response::error(id, "internal error: handler failed").encode()
        }
    }
}

/// Best-effort correlation id of a raw line
fn request_id(line: &str) -> String {
    serde_json::from_str::<Value>(line)
        .ok()
        .and_then(|v| v.get("id").and_then(Value::as_str).map(String::from))
        .unwrap_or_default()
}

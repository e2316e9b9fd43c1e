//! Tracing configuration and log routing.
//!
//! Console output goes to stdout for the webhook server and to stderr for the MCP server,
//! whose stdout carries protocol frames. When `DOCRAG_LOG_FILE` is set, logs are also
//! appended to that path through a non‑blocking writer.
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Destination for the console log layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleTarget {
    /// Write console logs to stdout.
    Stdout,
    /// Write console logs to stderr.
    Stderr,
}

/// Configure tracing subscribers for console and optional file logging.
///
/// - Respects `RUST_LOG` for filtering (defaults to `info`).
/// - Installs a compact console layer and, when `DOCRAG_LOG_FILE` is set, a file layer.
/// - Safe to call more than once; later calls leave the first subscriber in place.
pub fn init_tracing(target: ConsoleTarget) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console_layer = match target {
        ConsoleTarget::Stdout => fmt::layer().with_target(false).compact().boxed(),
        ConsoleTarget::Stderr => fmt::layer()
            .with_target(false)
            .with_ansi(false)
            .with_writer(std::io::stderr)
            .compact()
            .boxed(),
    };

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    let result = if let Some(writer) = configure_file_writer() {
        let file_layer = fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .compact();
        registry.with(file_layer).try_init()
    } else {
        registry.try_init()
    };

    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

/// Build a non‑blocking writer for file logging.
///
/// Returns `None` when no log file is configured or the target file cannot be opened.
fn configure_file_writer() -> Option<NonBlocking> {
    let path = std::env::var("DOCRAG_LOG_FILE").ok()?;
    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
    {
        Ok(file) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            let _ = LOG_GUARD.set(guard);
            Some(non_blocking)
        }
        Err(err) => {
            eprintln!("Failed to open log file {path}: {err}");
            None
        }
    }
}

//! Capture session API
//!
//! This module provides the main API for driving the capture core from the
//! UI shell: logging setup, session lifecycle, producer-side event
//! recording, and the poll pump that turns buffered proxy events into
//! history-view updates.

use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};

use crate::capture::{CaptureBuffer, DEFAULT_CAPACITY};
use crate::correlate::{Transaction, TransactionCorrelator};
use crate::models::{CaptureEvent, UiUpdate};
use crate::render::{self, TransactionDump};

// Global capture session state
static SESSION: Lazy<Mutex<Option<Arc<CaptureSession>>>> = Lazy::new(|| Mutex::new(None));
static CAPTURE_RUNNING: AtomicBool = AtomicBool::new(false);
static PUMP_GENERATION: AtomicU64 = AtomicU64::new(0);

const UPDATE_CHANNEL_CAPACITY: usize = 512;

/// Errors surfaced to the UI shell by the session API
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture session is not running")]
    NotRunning,
    #[error("capture session is already running")]
    AlreadyRunning,
}

/// Capture session configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CaptureConfig {
    /// Maximum number of undrained events retained before eviction
    pub capacity: usize,
    /// Poll cadence for the UI-side pump, in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            poll_interval_ms: 500,
        }
    }
}

pub fn create_default_config() -> CaptureConfig {
    CaptureConfig::default()
}

/// Capture session status information
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct CaptureStatus {
    /// Whether a session is running
    pub is_running: bool,
    /// Configured pump cadence
    pub poll_interval_ms: u64,
    /// Events currently waiting in the buffer
    pub buffered_events: usize,
    /// Events lost to ring eviction this session
    pub evicted_events: u64,
    /// Transactions observed this session
    pub transaction_count: usize,
}

struct CaptureSession {
    buffer: CaptureBuffer,
    correlator: RwLock<TransactionCorrelator>,
    updates: broadcast::Sender<UiUpdate>,
    poll_interval_ms: u64,
}

/// Initialize the core library (call once at startup).
/// `storage_path` is used to store log files in release mode.
#[allow(unused_variables)]
pub fn init_core(storage_path: Option<String>) -> anyhow::Result<bool> {
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "info");
    }

    // Initialize tracing/logging based on build mode
    #[cfg(debug_assertions)]
    {
        // Debug mode: log to console (stderr)
        let level = resolve_log_level();
        let _ = tracing_subscriber::fmt().with_max_level(level).try_init();
    }

    #[cfg(not(debug_assertions))]
    {
        use anyhow::Context as _;

        // Release mode: log to file
        let level = resolve_log_level();

        let log_dir = storage_path
            .as_ref()
            .map(|p| std::path::PathBuf::from(p).join("logs"))
            .unwrap_or_else(|| std::path::PathBuf::from("logs"));

        std::fs::create_dir_all(&log_dir)
            .with_context(|| format!("creating log directory {}", log_dir.display()))?;
        let file_appender = tracing_appender::rolling::daily(&log_dir, "nibble_core");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        // Keep the guard alive for the lifetime of the program; logging
        // lasts until process exit.
        std::mem::forget(guard);

        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(non_blocking)
            .try_init();
    }

    tracing::info!("Nibble capture core initialized v{}", env!("CARGO_PKG_VERSION"));
    Ok(true)
}

fn resolve_log_level() -> tracing::level_filters::LevelFilter {
    use tracing::level_filters::LevelFilter;

    match std::env::var("RUST_LOG") {
        Ok(val) => match val.to_lowercase().as_str() {
            "trace" => LevelFilter::TRACE,
            "debug" => LevelFilter::DEBUG,
            "info" => LevelFilter::INFO,
            "warn" | "warning" => LevelFilter::WARN,
            "error" => LevelFilter::ERROR,
            _ => LevelFilter::INFO,
        },
        Err(_) => LevelFilter::INFO,
    }
}

/// Start a capture session and spawn its poll pump.
///
/// Must be called from within a tokio runtime; the pump drains the buffer
/// every `poll_interval_ms` and broadcasts the resulting UI updates.
pub fn start_capture(config: CaptureConfig) -> Result<(), CaptureError> {
    if CAPTURE_RUNNING.swap(true, Ordering::SeqCst) {
        return Err(CaptureError::AlreadyRunning);
    }

    let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
    let session = Arc::new(CaptureSession {
        buffer: CaptureBuffer::new(config.capacity),
        correlator: RwLock::new(TransactionCorrelator::new()),
        updates,
        poll_interval_ms: config.poll_interval_ms,
    });

    *SESSION.lock().expect("session slot poisoned") = Some(Arc::clone(&session));

    let generation = PUMP_GENERATION.fetch_add(1, Ordering::SeqCst) + 1;
    tokio::spawn(run_pump(session, generation));

    tracing::info!(
        "Capture session started (capacity={}, poll_interval_ms={})",
        config.capacity,
        config.poll_interval_ms
    );
    Ok(())
}

/// Stop the running session. The pump exits on its next tick.
pub fn stop_capture() -> Result<(), CaptureError> {
    if !CAPTURE_RUNNING.swap(false, Ordering::SeqCst) {
        return Err(CaptureError::NotRunning);
    }
    *SESSION.lock().expect("session slot poisoned") = None;
    tracing::info!("Capture session stopping");
    Ok(())
}

/// Record one observed event. Called by the proxy-layer glue from any
/// thread or task; never blocks beyond the buffer's critical section.
pub fn record_event(event: CaptureEvent) -> Result<(), CaptureError> {
    let session = current_session().ok_or(CaptureError::NotRunning)?;
    session.buffer.push(event);
    Ok(())
}

/// Subscribe to the stream of history-view updates
pub fn subscribe_updates() -> Result<broadcast::Receiver<UiUpdate>, CaptureError> {
    let session = current_session().ok_or(CaptureError::NotRunning)?;
    Ok(session.updates.subscribe())
}

/// Get current capture session status
pub async fn capture_status() -> CaptureStatus {
    let Some(session) = current_session() else {
        return CaptureStatus::default();
    };
    let transaction_count = session.correlator.read().await.len();
    CaptureStatus {
        is_running: CAPTURE_RUNNING.load(Ordering::SeqCst),
        poll_interval_ms: session.poll_interval_ms,
        buffered_events: session.buffer.len(),
        evicted_events: session.buffer.evicted(),
        transaction_count,
    }
}

/// Look up a transaction for the detail view
pub async fn selected_transaction(id: &str) -> Option<Transaction> {
    let session = current_session()?;
    let correlator = session.correlator.read().await;
    correlator.transaction(id).cloned()
}

/// Render both panes of the detail view for a transaction
pub async fn transaction_dump(id: &str) -> Option<TransactionDump> {
    let tx = selected_transaction(id).await?;
    Some(render::dump_transaction(&tx))
}

/// Drop all buffered events and every correlated transaction
pub async fn clear_session() -> Result<(), CaptureError> {
    let session = current_session().ok_or(CaptureError::NotRunning)?;
    session.buffer.drain_all();
    session.correlator.write().await.clear();
    tracing::info!("Capture session cleared");
    Ok(())
}

fn current_session() -> Option<Arc<CaptureSession>> {
    SESSION.lock().expect("session slot poisoned").clone()
}

async fn run_pump(session: Arc<CaptureSession>, generation: u64) {
    let mut ticker =
        tokio::time::interval(Duration::from_millis(session.poll_interval_ms.max(1)));
    loop {
        ticker.tick().await;
        // A newer session's pump supersedes this one.
        if PUMP_GENERATION.load(Ordering::SeqCst) != generation
            || !CAPTURE_RUNNING.load(Ordering::SeqCst)
        {
            break;
        }

        let events = session.buffer.drain_all();
        if events.is_empty() {
            continue;
        }
        tracing::debug!("Draining {} capture events", events.len());

        let updates = {
            let mut correlator = session.correlator.write().await;
            correlator.ingest(events)
        };
        for update in updates {
            // Nobody listening is fine; updates are advisory.
            let _ = session.updates.send(update);
        }
    }
    tracing::debug!("Capture pump {} stopped", generation);
}

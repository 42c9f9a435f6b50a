// SPDX-FileCopyrightText: 2026 Crashrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Crash capture and delivery orchestration.
//!
//! [`Reporter`] is the host-facing entry point. It wraps fallible work with
//! [`Reporter::capture`], renders failures into reports, fans them out to the
//! configured channels, and falls back to the on-disk store plus the offline
//! watcher when no channel accepts a report live.
//!
//! Failures never stop propagating: a captured error is returned to the
//! caller unchanged and a captured panic is resumed, whether or not the
//! report could be delivered.

pub mod watcher;

pub use watcher::{OfflineWatcher, WatcherState};

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crashrelay_config::ReporterConfig;
use crashrelay_core::{CrashrelayError, ReportChannel, StoredReport};
use crashrelay_report::{
    install_panic_capture, take_panic_snapshot, CrashContext, ReportRenderer,
};
use crashrelay_store::ReportStore;
use futures::FutureExt;
use tracing::{debug, error, info, warn};

/// Produces extra files to attach to every outgoing report.
pub type AttachmentProvider = Box<dyn Fn() -> Vec<PathBuf> + Send + Sync>;

/// Captures failures, renders them, and drives delivery.
///
/// All methods take `&self`; the reporter is meant to be shared behind an
/// [`Arc`] between the host's tasks.
pub struct Reporter {
    enabled: AtomicBool,
    renderer: ReportRenderer,
    channels: Vec<Arc<dyn ReportChannel>>,
    store: Arc<ReportStore>,
    annotations: Mutex<Vec<(String, String)>>,
    attachment_provider: Mutex<Option<AttachmentProvider>>,
    watcher: OfflineWatcher,
}

impl Reporter {
    /// Creates a reporter over the given channels, opening (and if needed
    /// creating) the report directory.
    ///
    /// Must be called from within a Tokio runtime: when reports from a
    /// previous run are still on disk, the offline watcher task is spawned
    /// immediately.
    pub fn new(
        config: &ReporterConfig,
        renderer: ReportRenderer,
        channels: Vec<Arc<dyn ReportChannel>>,
    ) -> Result<Self, CrashrelayError> {
        let store = Arc::new(ReportStore::new(
            config.report_dir.as_str(),
            config.offline_report_limit,
        )?);
        let watcher = OfflineWatcher::new(
            Arc::clone(&store),
            channels.clone(),
            Duration::from_secs(config.check_interval_secs),
        );
        // Reports left over from a previous run go straight back into retry.
        watcher.ensure_running();

        Ok(Self {
            enabled: AtomicBool::new(true),
            renderer,
            channels,
            store,
            annotations: Mutex::new(Vec::new()),
            attachment_provider: Mutex::new(None),
            watcher,
        })
    }

    /// Runs `fut` and reports any failure before letting it propagate.
    ///
    /// Entering the scope arms reporting: a previously disabled reporter is
    /// re-enabled for the scope's duration, so suppressing a scoped failure
    /// takes a `disable()` issued inside the scope itself.
    ///
    /// A future that resolves to `Err` has the error rendered and delivered,
    /// then returned unchanged. A panicking future has its panic reported
    /// from the hook snapshot and resumed. A clean completion only logs.
    pub async fn capture<F, T, E>(&self, fut: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        self.enable();
        install_panic_capture();
        match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(Ok(value)) => {
                debug!("captured block completed without failure");
                Ok(value)
            }
            Ok(Err(err)) => {
                self.report_failure(CrashContext::from_error(&err)).await;
                Err(err)
            }
            Err(payload) => {
                let message = panic_payload_message(payload.as_ref());
                let snapshot = take_panic_snapshot();
                self.report_failure(CrashContext::from_panic(message, snapshot))
                    .await;
                std::panic::resume_unwind(payload)
            }
        }
    }

    /// Renders `ctx` and delivers it: every channel is attempted in order,
    /// and when none accepts the report it is persisted for the offline
    /// watcher to retry. Does nothing while reporting is disabled.
    ///
    /// Delivery problems are logged, never returned; reporting must not add
    /// failure modes to the host's own error path.
    pub async fn report_failure(&self, mut ctx: CrashContext) {
        if !self.is_enabled() {
            info!("crash reporting is disabled, dropping report");
            return;
        }

        info!(kind = %ctx.kind, message = %ctx.message, "crash captured");

        {
            let annotations = self.annotations.lock().unwrap_or_else(|e| e.into_inner());
            for (key, value) in annotations.iter() {
                ctx.values.push((key.clone(), value.clone()));
            }
        }

        let mut report = self.renderer.render(&ctx);
        {
            let provider = self
                .attachment_provider
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            if let Some(provider) = provider.as_ref() {
                report.attachments = provider();
            }
        }

        let mut delivered = false;
        for channel in &self.channels {
            match channel.send_report(&report).await {
                Ok(()) => {
                    info!(channel = channel.name(), "crash report delivered");
                    delivered = true;
                }
                Err(e) => {
                    error!(
                        channel = channel.name(),
                        error = %e,
                        "crash report delivery failed"
                    );
                }
            }
        }
        if delivered {
            return;
        }

        match self.store.save(&report.body) {
            Ok(()) => {
                warn!("crash report stored for later delivery");
                self.watcher.ensure_running();
            }
            Err(e) => {
                error!(error = %e, "failed to store undelivered crash report");
            }
        }
    }

    /// Turns reporting back on. Does not restart the offline watcher by
    /// itself; the next undeliverable report does.
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
        info!("crash reporting enabled");
    }

    /// Turns reporting off and asks the offline watcher to stop. Stored
    /// reports stay on disk.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
        self.watcher.request_stop();
        info!("crash reporting disabled");
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Attaches a key/value pair to the context table of every report
    /// rendered from now on.
    pub fn annotate(&self, key: impl Into<String>, value: impl Into<String>) {
        self.annotations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((key.into(), value.into()));
    }

    /// Installs a callback that lists files to attach to every outgoing
    /// report, replacing any previous provider.
    pub fn set_attachment_provider<P>(&self, provider: P)
    where
        P: Fn() -> Vec<PathBuf> + Send + Sync + 'static,
    {
        *self
            .attachment_provider
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(Box::new(provider));
    }

    /// Reports currently persisted for retry, oldest ordinal first.
    pub fn offline_reports(&self) -> Result<Vec<StoredReport>, CrashrelayError> {
        self.store.list()
    }

    /// Deletes every persisted report. A running watcher notices the empty
    /// store on its next cycle and stops.
    pub fn delete_offline_reports(&self) -> Result<(), CrashrelayError> {
        self.store.purge()
    }

    pub fn watcher_state(&self) -> WatcherState {
        self.watcher.state()
    }
}

fn panic_payload_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with a non-string payload".to_string()
    }
}

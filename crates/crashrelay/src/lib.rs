// SPDX-FileCopyrightText: 2026 Crashrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Crash reporting with offline fallback.
//!
//! This facade wires the pieces together: configuration is loaded and
//! validated by `crashrelay-config`, failures are captured and rendered by
//! `crashrelay-report`, and [`build_reporter`] assembles one delivery
//! channel per configured section. A report that no channel accepts live is
//! persisted by `crashrelay-store` and retried in the background until every
//! stored report has been accepted somewhere.
//!
//! The `mail` and `transfer` features (both on by default) control which
//! channel implementations are compiled in.

use std::sync::Arc;

use tracing::warn;

pub use crashrelay_config::{
    load_and_validate, load_and_validate_str, load_config, load_config_from_path,
    load_config_from_str, render_errors, ConfigError, CrashrelayConfig, MailConfig,
    ReporterConfig, TransferConfig,
};
pub use crashrelay_core::{BacklogReceipt, CrashrelayError, Report, ReportChannel, StoredReport};
pub use crashrelay_report::{
    install_panic_capture, take_panic_snapshot, CrashContext, FailureKind, PanicSnapshot,
    ReportRenderer, SourceLocation,
};
pub use crashrelay_reporter::{AttachmentProvider, OfflineWatcher, Reporter, WatcherState};
pub use crashrelay_store::ReportStore;

#[cfg(feature = "transfer")]
pub use crashrelay_ftp::FtpChannel;
#[cfg(feature = "mail")]
pub use crashrelay_smtp::MailChannel;

/// Builds a [`Reporter`] from a loaded configuration: one channel per
/// configured section, attempted in delivery order (mail first, then
/// transfer).
///
/// Must be called from within a Tokio runtime; reports persisted by a
/// previous run start the offline watcher immediately.
pub fn build_reporter(config: &CrashrelayConfig) -> Result<Reporter, CrashrelayError> {
    let renderer = ReportRenderer::new(
        config.reporter.application_name.clone(),
        config.reporter.application_version.clone(),
        config.reporter.rich_markup,
    );

    #[allow(unused_mut)]
    let mut channels: Vec<Arc<dyn ReportChannel>> = Vec::new();

    #[cfg(feature = "mail")]
    if let Some(mail) = &config.mail {
        let channel = MailChannel::new(mail.clone())?.with_digest_subject(renderer.subject());
        channels.push(Arc::new(channel));
    }

    #[cfg(feature = "transfer")]
    if let Some(transfer) = &config.transfer {
        channels.push(Arc::new(FtpChannel::new(transfer.clone())?));
    }

    if channels.is_empty() {
        warn!("no delivery channel configured, crash reports will only be stored locally");
    }

    Reporter::new(&config.reporter, renderer, channels)
}

/// Initializes the tracing subscriber with the given log level.
///
/// A no-op when the host has already installed a global subscriber.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("crashrelay={log_level},warn")));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .try_init();
}

// SPDX-FileCopyrightText: 2026 Crashrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! FTP transfer channel for the crashrelay reporting toolkit.
//!
//! Implements [`ReportChannel`] over suppaftp's blocking `FtpStream`, run
//! on the blocking thread pool so channel I/O never stalls the async
//! runtime. Remote files reuse the offline store's naming scheme, numbered
//! past whatever already sits in the remote directory.

use std::io::Cursor;
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use async_trait::async_trait;
use crashrelay_config::model::TransferConfig;
use crashrelay_core::error::CrashrelayError;
use crashrelay_core::traits::ReportChannel;
use crashrelay_core::types::{BacklogReceipt, Report, StoredReport};
use suppaftp::FtpStream;
use tracing::{debug, info, warn};

/// Transfer channel implementing [`ReportChannel`] over FTP.
///
/// Every send opens a fresh session: connect, login, change to the remote
/// directory, upload, quit. Sessions are never reused across sends.
pub struct FtpChannel {
    config: TransferConfig,
}

impl FtpChannel {
    /// Creates a new transfer channel from the `[transfer]` configuration
    /// section.
    ///
    /// Requires `host`, `user`, and `remote_path` to be non-empty.
    pub fn new(config: TransferConfig) -> Result<Self, CrashrelayError> {
        if config.host.trim().is_empty() {
            return Err(CrashrelayError::Config(
                "transfer.host cannot be empty".into(),
            ));
        }

        if config.user.trim().is_empty() {
            return Err(CrashrelayError::Config(
                "transfer.user cannot be empty".into(),
            ));
        }

        if config.remote_path.trim().is_empty() {
            return Err(CrashrelayError::Config(
                "transfer.remote_path cannot be empty".into(),
            ));
        }

        Ok(Self { config })
    }
}

#[async_trait]
impl ReportChannel for FtpChannel {
    fn name(&self) -> &str {
        "transfer"
    }

    async fn send_report(&self, report: &Report) -> Result<(), CrashrelayError> {
        let config = self.config.clone();
        let body = report.body.clone();

        let name = tokio::task::spawn_blocking(move || {
            let mut session = open_session(&config)?;
            let name = upload_report(&mut session, &body)?;
            close_session(session);
            Ok::<String, CrashrelayError>(name)
        })
        .await
        .map_err(|e| CrashrelayError::Internal(format!("transfer task panicked: {e}")))??;

        debug!(name = %name, host = %self.config.host, "crash report uploaded");
        Ok(())
    }

    async fn send_backlog(
        &self,
        reports: &[StoredReport],
    ) -> Result<BacklogReceipt, CrashrelayError> {
        if reports.is_empty() {
            return Ok(BacklogReceipt::empty());
        }

        let config = self.config.clone();
        let reports = reports.to_vec();

        let receipt = tokio::task::spawn_blocking(move || {
            let mut session = open_session(&config)?;
            let mut delivered = Vec::new();

            for report in &reports {
                let body = match report.read() {
                    Ok(body) => body,
                    Err(e) => {
                        warn!(
                            ordinal = report.ordinal,
                            error = %e,
                            "skipping unreadable stored report"
                        );
                        continue;
                    }
                };

                match upload_report(&mut session, &body) {
                    Ok(name) => {
                        debug!(
                            ordinal = report.ordinal,
                            name = %name,
                            "offline crash report uploaded"
                        );
                        delivered.push(report.ordinal);
                    }
                    Err(e) => {
                        warn!(
                            ordinal = report.ordinal,
                            error = %e,
                            "failed to upload offline crash report"
                        );
                    }
                }
            }

            close_session(session);
            Ok::<BacklogReceipt, CrashrelayError>(BacklogReceipt { delivered })
        })
        .await
        .map_err(|e| CrashrelayError::Internal(format!("transfer task panicked: {e}")))??;

        info!(
            count = receipt.delivered.len(),
            host = %self.config.host,
            "offline crash reports uploaded"
        );
        Ok(receipt)
    }
}

/// Opens and authenticates an FTP session positioned in the remote report
/// directory.
fn open_session(config: &TransferConfig) -> Result<FtpStream, CrashrelayError> {
    let addr = resolve_addr(&config.host, config.port)?;

    let mut session = FtpStream::connect_timeout(addr, Duration::from_secs(config.timeout_secs))
        .map_err(|e| CrashrelayError::Channel {
            message: format!("failed to connect to {}:{}: {e}", config.host, config.port),
            source: Some(Box::new(e)),
        })?;

    session
        .login(config.user.as_str(), config.credential.as_str())
        .map_err(|e| CrashrelayError::Channel {
            message: format!("ftp login failed for {}@{}: {e}", config.user, config.host),
            source: Some(Box::new(e)),
        })?;

    session
        .cwd(config.remote_path.as_str())
        .map_err(|e| CrashrelayError::Channel {
            message: format!(
                "failed to change to remote directory {}: {e}",
                config.remote_path
            ),
            source: Some(Box::new(e)),
        })?;

    Ok(session)
}

/// Uploads one report body under the next free remote name.
///
/// The remote directory is re-listed on every call, so sequential uploads
/// in one session keep numbering past each other.
fn upload_report(session: &mut FtpStream, body: &str) -> Result<String, CrashrelayError> {
    let existing = session.nlst(None).map_err(|e| CrashrelayError::Channel {
        message: format!("failed to list remote directory: {e}"),
        source: Some(Box::new(e)),
    })?;

    let name = remote_report_name(existing.len());
    let mut reader = Cursor::new(body.as_bytes());
    session
        .put_file(&name, &mut reader)
        .map_err(|e| CrashrelayError::Channel {
            message: format!("failed to upload {name}: {e}"),
            source: Some(Box::new(e)),
        })?;

    Ok(name)
}

/// Closes a session whose uploads already stand; quit failures are only
/// logged.
fn close_session(mut session: FtpStream) {
    if let Err(e) = session.quit() {
        warn!(error = %e, "ftp session close failed");
    }
}

/// Remote filename for the next report given the current remote entry count.
fn remote_report_name(existing: usize) -> String {
    format!("crashreport{:02}", existing + 1)
}

/// Resolves a host/port pair to the first socket address it yields.
fn resolve_addr(host: &str, port: u16) -> Result<SocketAddr, CrashrelayError> {
    let mut addrs = (host, port)
        .to_socket_addrs()
        .map_err(|e| CrashrelayError::Channel {
            message: format!("failed to resolve {host}:{port}: {e}"),
            source: Some(Box::new(e)),
        })?;

    addrs.next().ok_or_else(|| CrashrelayError::Channel {
        message: format!("no addresses found for {host}:{port}"),
        source: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer_config() -> TransferConfig {
        TransferConfig {
            host: "ftp.example.com".to_string(),
            port: 21,
            user: "uploader".to_string(),
            credential: "secret".to_string(),
            remote_path: "/crash".to_string(),
            timeout_secs: 5,
        }
    }

    #[test]
    fn new_requires_host() {
        let mut config = transfer_config();
        config.host = "".to_string();
        assert!(FtpChannel::new(config).is_err());
    }

    #[test]
    fn new_requires_user() {
        let mut config = transfer_config();
        config.user = "  ".to_string();
        assert!(FtpChannel::new(config).is_err());
    }

    #[test]
    fn new_requires_remote_path() {
        let mut config = transfer_config();
        config.remote_path = "".to_string();
        assert!(FtpChannel::new(config).is_err());
    }

    #[test]
    fn new_accepts_valid_config() {
        assert!(FtpChannel::new(transfer_config()).is_ok());
    }

    #[test]
    fn channel_name_is_transfer() {
        let channel = FtpChannel::new(transfer_config()).unwrap();
        assert_eq!(channel.name(), "transfer");
    }

    #[test]
    fn remote_names_continue_the_store_numbering() {
        assert_eq!(remote_report_name(0), "crashreport01");
        assert_eq!(remote_report_name(2), "crashreport03");
        assert_eq!(remote_report_name(99), "crashreport100");
    }

    #[test]
    fn resolve_addr_handles_numeric_hosts() {
        let addr = resolve_addr("127.0.0.1", 2121).unwrap();
        assert_eq!(addr.port(), 2121);
        assert!(addr.ip().is_loopback());
    }

    #[tokio::test]
    async fn empty_backlog_yields_empty_receipt() {
        let channel = FtpChannel::new(transfer_config()).unwrap();
        let receipt = channel.send_backlog(&[]).await.unwrap();
        assert!(receipt.delivered.is_empty());
    }
}

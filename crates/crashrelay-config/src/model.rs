// SPDX-FileCopyrightText: 2026 Crashrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for crashrelay.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages. A delivery
//! channel is enabled by the presence of its section.

use serde::{Deserialize, Deserializer, Serialize};

/// Top-level crashrelay configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. The `[reporter]` section defaults to sensible values; channel
/// sections are optional and absent means disabled.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CrashrelayConfig {
    /// Controller and offline store settings.
    #[serde(default)]
    pub reporter: ReporterConfig,

    /// Mail delivery channel. Omitting the section disables mail delivery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mail: Option<MailConfig>,

    /// File transfer delivery channel. Omitting the section disables it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer: Option<TransferConfig>,
}

/// Controller and offline store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReporterConfig {
    /// Directory where undelivered reports are kept.
    #[serde(default = "default_report_dir")]
    pub report_dir: String,

    /// Maximum number of undelivered reports kept on disk.
    #[serde(default = "default_offline_report_limit")]
    pub offline_report_limit: usize,

    /// Render rich HTML report bodies instead of plain text.
    #[serde(default)]
    pub rich_markup: bool,

    /// Seconds between offline delivery retry cycles.
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,

    /// Application name shown in report subjects and bodies.
    #[serde(default)]
    pub application_name: Option<String>,

    /// Application version shown alongside the name.
    #[serde(default)]
    pub application_version: Option<String>,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            report_dir: default_report_dir(),
            offline_report_limit: default_offline_report_limit(),
            rich_markup: false,
            check_interval_secs: default_check_interval_secs(),
            application_name: None,
            application_version: None,
            log_level: default_log_level(),
        }
    }
}

fn default_report_dir() -> String {
    dirs::data_dir()
        .map(|p| p.join("crashrelay").join("reports"))
        .unwrap_or_else(|| std::path::PathBuf::from("crashrelay-reports"))
        .to_string_lossy()
        .into_owned()
}

fn default_offline_report_limit() -> usize {
    10
}

fn default_check_interval_secs() -> u64 {
    300
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Mail (SMTP) delivery channel configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MailConfig {
    /// SMTP relay hostname.
    pub host: String,

    /// SMTP relay port (STARTTLS).
    #[serde(default = "default_mail_port")]
    pub port: u16,

    /// Sender mailbox address, also used as the login user.
    pub sender_address: String,

    /// Sender password. Empty string sends without authentication.
    #[serde(default)]
    pub sender_credential: String,

    /// Recipient mailbox addresses. Accepts a single string or a list.
    #[serde(deserialize_with = "one_or_many")]
    pub recipients: Vec<String>,
}

fn default_mail_port() -> u16 {
    587
}

/// File transfer (FTP) delivery channel configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TransferConfig {
    /// FTP server hostname.
    pub host: String,

    /// FTP control port.
    #[serde(default = "default_transfer_port")]
    pub port: u16,

    /// Login user.
    pub user: String,

    /// Login password. Empty string for anonymous-style logins.
    #[serde(default)]
    pub credential: String,

    /// Remote directory uploads land in.
    #[serde(default = "default_remote_path")]
    pub remote_path: String,

    /// TCP connect timeout in seconds.
    #[serde(default = "default_transfer_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_transfer_port() -> u16 {
    21
}

fn default_remote_path() -> String {
    ".".to_string()
}

fn default_transfer_timeout_secs() -> u64 {
    5
}

/// Accepts either a single string or a list of strings.
///
/// Lets a config write `recipients = "oncall@example.com"` without the
/// brackets when there is only one address.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(addr) => vec![addr],
        OneOrMany::Many(addrs) => addrs,
    })
}

// SPDX-FileCopyrightText: 2026 Crashrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./crashrelay.toml` > `~/.config/crashrelay/crashrelay.toml`
//! > `/etc/crashrelay/crashrelay.toml` with environment variable overrides
//! via `CRASHRELAY_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use tracing::debug;

use crate::model::CrashrelayConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/crashrelay/crashrelay.toml` (system-wide)
/// 3. `~/.config/crashrelay/crashrelay.toml` (user XDG config)
/// 4. `./crashrelay.toml` (local directory)
/// 5. `CRASHRELAY_*` environment variables
pub fn load_config() -> Result<CrashrelayConfig, figment::Error> {
    let system_file = Path::new("/etc/crashrelay/crashrelay.toml");
    let user_file = dirs::config_dir()
        .map(|d| d.join("crashrelay/crashrelay.toml"))
        .unwrap_or_default();
    let local_file = Path::new("crashrelay.toml");

    for file in [system_file, user_file.as_path(), local_file] {
        if file.is_file() {
            debug!(path = %file.display(), "merging configuration file");
        }
    }

    Figment::new()
        .merge(Serialized::defaults(CrashrelayConfig::default()))
        .merge(Toml::file(system_file))
        .merge(Toml::file(&user_file))
        .merge(Toml::file(local_file))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<CrashrelayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CrashrelayConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<CrashrelayConfig, figment::Error> {
    debug!(path = %path.display(), "loading configuration file");
    Figment::new()
        .merge(Serialized::defaults(CrashrelayConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `CRASHRELAY_MAIL_SENDER_ADDRESS` must map
/// to `mail.sender_address`, not `mail.sender.address`.
fn env_provider() -> Env {
    Env::prefixed("CRASHRELAY_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: CRASHRELAY_REPORTER_REPORT_DIR -> "reporter_report_dir"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("reporter_", "reporter.", 1)
            .replacen("mail_", "mail.", 1)
            .replacen("transfer_", "transfer.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_vars_override_toml_values() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "crashrelay.toml",
                r#"
[reporter]
offline_report_limit = 4
"#,
            )?;
            jail.set_env("CRASHRELAY_REPORTER_OFFLINE_REPORT_LIMIT", "7");
            jail.set_env("CRASHRELAY_REPORTER_RICH_MARKUP", "true");

            let config = load_config().expect("config should load");
            assert_eq!(config.reporter.offline_report_limit, 7);
            assert!(config.reporter.rich_markup);
            Ok(())
        });
    }

    #[test]
    fn env_vars_reach_channel_sections() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "crashrelay.toml",
                r#"
[mail]
host = "smtp.example.com"
sender_address = "crash@example.com"
recipients = ["oncall@example.com"]
"#,
            )?;
            jail.set_env("CRASHRELAY_MAIL_HOST", "smtp.internal");

            let config = load_config().expect("config should load");
            let mail = config.mail.expect("mail section should be present");
            assert_eq!(mail.host, "smtp.internal");
            assert_eq!(mail.sender_address, "crash@example.com");
            Ok(())
        });
    }
}

// SPDX-FileCopyrightText: 2026 Crashrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as non-empty hosts, non-zero limits, and at least one mail recipient.

use crate::diagnostic::ConfigError;
use crate::model::CrashrelayConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &CrashrelayConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    // Validate report_dir is not empty
    if config.reporter.report_dir.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "reporter.report_dir must not be empty".to_string(),
        });
    }

    // Validate the offline store holds at least one report
    if config.reporter.offline_report_limit < 1 {
        errors.push(ConfigError::Validation {
            message: format!(
                "reporter.offline_report_limit must be at least 1, got {}",
                config.reporter.offline_report_limit
            ),
        });
    }

    if config.reporter.check_interval_secs < 1 {
        errors.push(ConfigError::Validation {
            message: format!(
                "reporter.check_interval_secs must be at least 1, got {}",
                config.reporter.check_interval_secs
            ),
        });
    }

    if let Some(mail) = &config.mail {
        if mail.host.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: "mail.host must not be empty".to_string(),
            });
        }

        if mail.sender_address.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: "mail.sender_address must not be empty".to_string(),
            });
        }

        if mail.recipients.is_empty() {
            errors.push(ConfigError::Validation {
                message: "mail.recipients must list at least one address".to_string(),
            });
        }

        for (i, recipient) in mail.recipients.iter().enumerate() {
            if recipient.trim().is_empty() {
                errors.push(ConfigError::Validation {
                    message: format!("mail.recipients[{i}] must not be empty"),
                });
            }
        }
    }

    if let Some(transfer) = &config.transfer {
        if transfer.host.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: "transfer.host must not be empty".to_string(),
            });
        }

        if transfer.user.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: "transfer.user must not be empty".to_string(),
            });
        }

        if transfer.remote_path.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: "transfer.remote_path must not be empty".to_string(),
            });
        }

        if transfer.timeout_secs < 1 {
            errors.push(ConfigError::Validation {
                message: format!(
                    "transfer.timeout_secs must be at least 1, got {}",
                    transfer.timeout_secs
                ),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MailConfig, TransferConfig};

    fn mail_section() -> MailConfig {
        MailConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            sender_address: "crash@example.com".to_string(),
            sender_credential: String::new(),
            recipients: vec!["ops@example.com".to_string()],
        }
    }

    fn transfer_section() -> TransferConfig {
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
    fn default_config_validates() {
        let config = CrashrelayConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_report_dir_fails_validation() {
        let mut config = CrashrelayConfig::default();
        config.reporter.report_dir = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("report_dir"))));
    }

    #[test]
    fn zero_report_limit_fails_validation() {
        let mut config = CrashrelayConfig::default();
        config.reporter.offline_report_limit = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("offline_report_limit"))));
    }

    #[test]
    fn zero_check_interval_fails_validation() {
        let mut config = CrashrelayConfig::default();
        config.reporter.check_interval_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("check_interval_secs"))));
    }

    #[test]
    fn mail_without_recipients_fails_validation() {
        let mut config = CrashrelayConfig::default();
        let mut mail = mail_section();
        mail.recipients.clear();
        config.mail = Some(mail);
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("at least one address"))));
    }

    #[test]
    fn blank_recipient_entry_fails_validation() {
        let mut config = CrashrelayConfig::default();
        let mut mail = mail_section();
        mail.recipients.push("  ".to_string());
        config.mail = Some(mail);
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("recipients[1]"))));
    }

    #[test]
    fn transfer_without_user_fails_validation() {
        let mut config = CrashrelayConfig::default();
        let mut transfer = transfer_section();
        transfer.user = "".to_string();
        config.transfer = Some(transfer);
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("transfer.user"))));
    }

    #[test]
    fn all_errors_are_collected() {
        let mut config = CrashrelayConfig::default();
        config.reporter.report_dir = "".to_string();
        config.reporter.offline_report_limit = 0;
        let mut transfer = transfer_section();
        transfer.host = "".to_string();
        config.transfer = Some(transfer);
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn valid_custom_config_passes() {
        let mut config = CrashrelayConfig::default();
        config.reporter.report_dir = "/var/lib/crashrelay/reports".to_string();
        config.reporter.offline_report_limit = 25;
        config.mail = Some(mail_section());
        config.transfer = Some(transfer_section());
        assert!(validate_config(&config).is_ok());
    }
}

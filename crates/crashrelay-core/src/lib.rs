// SPDX-FileCopyrightText: 2026 Crashrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the crashrelay crash-reporting utility.
//!
//! This crate provides the foundational trait definitions, error types, and
//! common types used throughout the crashrelay workspace. Concrete delivery
//! channels implement the [`ReportChannel`] trait defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::CrashrelayError;
pub use traits::ReportChannel;
pub use types::{BacklogReceipt, Report, StoredReport};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crashrelay_error_has_all_variants() {
        // Verify all error variants exist and can be constructed.
        let _config = CrashrelayError::Config("test".into());
        let _store = CrashrelayError::Store {
            message: "test".into(),
            source: std::io::Error::other("test"),
        };
        let _channel = CrashrelayError::Channel {
            message: "test".into(),
            source: None,
        };
        let _internal = CrashrelayError::Internal("test".into());
    }

    #[test]
    fn store_error_displays_io_cause() {
        let err = CrashrelayError::Store {
            message: "failed to rotate report".into(),
            source: std::io::Error::other("disk full"),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("failed to rotate report"));
        assert!(rendered.contains("disk full"));
    }

    #[test]
    fn report_channel_is_object_safe() {
        // The controller stores channels as trait objects; this won't
        // compile if the trait loses object safety.
        fn _assert(_: &dyn ReportChannel) {}
    }

    #[test]
    fn report_new_has_no_attachments() {
        let report = Report::new("Crash Report", "body", false);
        assert!(report.attachments.is_empty());
        assert!(!report.rich);
        assert_eq!(report.subject, "Crash Report");
    }

    #[test]
    fn backlog_receipt_covering_lists_every_ordinal() {
        let reports = vec![
            StoredReport {
                ordinal: 1,
                path: "crashreport01".into(),
            },
            StoredReport {
                ordinal: 2,
                path: "crashreport02".into(),
            },
        ];
        let receipt = BacklogReceipt::covering(&reports);
        assert_eq!(receipt.delivered, vec![1, 2]);
        assert!(BacklogReceipt::empty().delivered.is_empty());
    }
}

//! Error handling for patchsync
//!
//! The error system follows two principles:
//! 1. **Strongly-typed errors** so callers (and tests) can tell a path escape from
//!    a network hiccup
//! 2. **User-friendly messages** with a suggestion, rendered only at the outermost
//!    boundary (`main.rs`)
//!
//! # Error Categories
//!
//! - **Configuration**: [`PatchError::ConfigNotFound`], [`PatchError::ConfigParse`]
//! - **Parsing**: [`PatchError::TimestampParse`]
//! - **Network**: [`PatchError::Network`], [`PatchError::ReleaseNotListed`]
//! - **Filesystem**: [`PatchError::PathEscape`], [`PatchError::FileSystem`],
//!   [`PatchError::Archive`]
//! - **Process control**: [`PatchError::Process`], [`PatchError::StopTimedOut`]
//!
//! Everything else in the crate returns [`anyhow::Result`] and attaches context
//! with `.context()`. Typed errors survive the trip and are recovered with
//! `downcast_ref` in [`user_friendly_error`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use patchsync::core::{PatchError, user_friendly_error};
//!
//! let err = anyhow::Error::from(PatchError::PathEscape {
//!     entry: "../evil.dll".to_string(),
//!     root: "/opt/app".to_string(),
//! });
//! user_friendly_error(err).display();
//! ```

use colored::Colorize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// The main error type for patchsync operations.
///
/// Variants carry rendered strings rather than source errors so the enum stays
/// `Clone` and can be re-wrapped in an [`ErrorContext`].
#[derive(Error, Debug, Clone)]
pub enum PatchError {
    /// No configuration file at the expected location.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// Path that was searched
        path: String,
    },

    /// The configuration file exists but is not valid.
    #[error("Invalid configuration in {path}: {reason}")]
    ConfigParse {
        /// Path of the configuration file
        path: String,
        /// Parser message
        reason: String,
    },

    /// A timestamp did not match the patch page format.
    #[error("Invalid timestamp '{input}': {reason}")]
    TimestampParse {
        /// The offending text, trimmed
        input: String,
        /// Parser message
        reason: String,
    },

    /// An HTTP request failed or returned a non-success status.
    #[error("Network error during {operation}: {reason}")]
    Network {
        /// What was being fetched (e.g. "patch page", "archive download")
        operation: String,
        /// Transport or status message
        reason: String,
    },

    /// The patch page does not mention the archive at all.
    #[error("'{archive}' is not listed on {url}")]
    ReleaseNotListed {
        /// Archive file name that was searched for
        archive: String,
        /// Patch page URL
        url: String,
    },

    /// An archive entry resolves outside the install root (zip-slip).
    #[error("Archive entry '{entry}' escapes the install directory {root}")]
    PathEscape {
        /// Entry name as stored in the archive
        entry: String,
        /// Install root it tried to leave
        root: String,
    },

    /// A filesystem operation on the install directory failed.
    #[error("File system error during {operation}: {path}: {reason}")]
    FileSystem {
        /// Operation that failed (e.g. "write", "set modification time")
        operation: String,
        /// Path involved
        path: String,
        /// Underlying I/O message
        reason: String,
    },

    /// The downloaded payload is not a readable zip archive.
    #[error("Invalid archive: {reason}")]
    Archive {
        /// Zip reader message
        reason: String,
    },

    /// Querying, terminating or launching the managed process failed.
    #[error("Process control failed during {operation} of '{name}': {reason}")]
    Process {
        /// "query", "terminate" or "launch"
        operation: String,
        /// Process or executable name
        name: String,
        /// Command output or OS message
        reason: String,
    },

    /// The managed process was still alive when the stop timeout elapsed.
    #[error("'{name}' did not stop within {waited:?}")]
    StopTimedOut {
        /// Process name
        name: String,
        /// How long patchsync waited
        waited: Duration,
    },

    /// Anything that has no dedicated variant.
    #[error("{message}")]
    Other {
        /// Full message, including the cause chain
        message: String,
    },
}

impl PatchError {
    pub(crate) fn fs(operation: &str, path: &std::path::Path, err: &std::io::Error) -> Self {
        Self::FileSystem {
            operation: operation.to_string(),
            path: path.display().to_string(),
            reason: err.to_string(),
        }
    }

    pub(crate) fn network(operation: &str, err: impl fmt::Display) -> Self {
        Self::Network {
            operation: operation.to_string(),
            reason: err.to_string(),
        }
    }
}

/// A [`PatchError`] plus the hints shown to the operator.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: PatchError,
    /// What the operator can do about it
    pub suggestion: Option<String>,
    /// Extra background
    pub details: Option<String>,
}

impl ErrorContext {
    #[must_use]
    pub const fn new(error: PatchError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print to stderr with colours.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with a suggestion where one is known.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(patch_error) = error.downcast_ref::<PatchError>() {
        return create_error_context(patch_error.clone());
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>()
        && io_error.kind() == std::io::ErrorKind::PermissionDenied
    {
        return ErrorContext::new(PatchError::FileSystem {
            operation: "file access".to_string(),
            path: "unknown".to_string(),
            reason: io_error.to_string(),
        })
        .with_suggestion("Run patchsync as a user that can write to the install directory");
    }

    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(PatchError::Other {
        message,
    })
}

fn create_error_context(error: PatchError) -> ErrorContext {
    match &error {
        PatchError::ConfigNotFound { .. } => ErrorContext::new(error)
            .with_suggestion("Create patchsync.toml or pass --config <path>"),
        PatchError::ConfigParse { .. } => ErrorContext::new(error).with_suggestion(
            "Check the TOML syntax and that patch_url, archive_name, install_dir and executable are set",
        ),
        PatchError::TimestampParse { .. } => ErrorContext::new(error)
            .with_details("The patch page is expected to show times as YYYY-MM-DD HH:MM")
            .with_suggestion("Check that patch_url points at the directory listing page"),
        PatchError::Network { .. } => ErrorContext::new(error)
            .with_suggestion("Check your network connection and the patch_url setting; nothing was modified"),
        PatchError::ReleaseNotListed { .. } => ErrorContext::new(error)
            .with_suggestion("Check archive_name; it must match the link text on the patch page exactly"),
        PatchError::PathEscape { .. } => ErrorContext::new(error)
            .with_details("The archive tried to write outside the install directory and was rejected")
            .with_suggestion("Do not apply this archive; report it to the publisher"),
        PatchError::FileSystem { .. } => ErrorContext::new(error)
            .with_details("Files written before the failure were kept; the next run resumes from there")
            .with_suggestion("Check permissions on the install directory and that the application is closed"),
        PatchError::Archive { .. } => ErrorContext::new(error)
            .with_suggestion("The download may be truncated; run patchsync again"),
        PatchError::Process { .. } => ErrorContext::new(error)
            .with_details("patchsync will not modify files while the application state is unknown"),
        PatchError::StopTimedOut { .. } => ErrorContext::new(error)
            .with_suggestion("Close the application manually or raise stop_timeout_secs"),
        PatchError::Other { .. } => ErrorContext::new(error),
    }
}

//! Core types shared by every stage of a patch run.
//!
//! # Architecture Overview
//!
//! ## Error Management
//! - [`PatchError`] - strongly-typed failure cases, grouped the same way an operator
//!   would triage them (configuration, network, filesystem, process control)
//! - [`ErrorContext`] - wraps a [`PatchError`] with a suggestion and details for display
//! - [`user_friendly_error`] - converts any [`anyhow::Error`] into an [`ErrorContext`]
//!
//! ## Time
//! - [`Timestamp`] - the single timestamp type used for watermarks, remote release
//!   times, archive entry times and on-disk modification times
//!
//! # Modules
//!
//! - [`error`] - error enum and presentation helpers
//! - [`timestamp`] - canonical parse/format of timestamps

pub mod error;
pub mod timestamp;

pub use error::{ErrorContext, PatchError, user_friendly_error};
pub use timestamp::Timestamp;

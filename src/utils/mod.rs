//! Shared helpers.
//!
//! - [`http`] - the `reqwest` client used for the patch page and the download
//! - [`path_validation`] - keeping archive entries inside the install directory

pub mod http;
pub mod path_validation;

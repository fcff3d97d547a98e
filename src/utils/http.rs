//! Shared HTTP client for the patch page and archive downloads.

use anyhow::{Context, Result};

use crate::constants::{HTTP_CONNECT_TIMEOUT, USER_AGENT};

/// Build the [`reqwest::Client`] used for every request in a run.
///
/// Only the connect phase has a timeout; archive transfers are allowed to take
/// as long as they need.
pub fn build_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(HTTP_CONNECT_TIMEOUT)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .context("Failed to build HTTP client")
}

//! Shared HTTP client construction.

use std::time::Duration;

use reqwest::Client;

use crate::config::HttpConfig;
use crate::{Result, VidsatError};

/// Build the HTTP client used for feeds, permalink expansion and sharing.
pub fn build_client(config: &HttpConfig) -> Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .timeout(Duration::from_secs(config.total_timeout_secs))
        .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|e| VidsatError::Config(format!("failed to create HTTP client: {e}")))
}

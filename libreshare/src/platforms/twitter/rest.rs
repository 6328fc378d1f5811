//! Request-based API client

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;

use super::{map_http_error, map_transport_error, oauth, USER_AGENT};
use crate::config::Credentials;
use crate::error::{PlatformError, Result};
use crate::platforms::ReshareClient;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct TwitterRestClient {
    http: reqwest::Client,
    credentials: Arc<Credentials>,
    api_base: String,
}

impl TwitterRestClient {
    /// Create a client for the request API rooted at `api_base`
    /// (e.g. "https://api.twitter.com")
    pub fn new(credentials: Arc<Credentials>, api_base: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| PlatformError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            credentials,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    fn retweet_url(&self, post_id: &str) -> String {
        format!(
            "{}/1.1/statuses/retweet/{}.json",
            self.api_base,
            oauth::percent_encode(post_id)
        )
    }
}

#[async_trait]
impl ReshareClient for TwitterRestClient {
    async fn reshare(&self, post_id: &str) -> Result<()> {
        let url = self.retweet_url(post_id);
        let auth = oauth::authorization_header(&self.credentials, "POST", &url, &[])?;

        tracing::debug!("Retweeting {}", post_id);

        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, auth)
            .send()
            .await
            .map_err(|e| map_transport_error(e, "retweet"))?;

        if !response.status().is_success() {
            return Err(map_http_error(response, "retweet").await.into());
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "twitter"
    }
}

//! Re-share client that only logs
//!
//! Used by `reshare-bot --dry-run` to watch the live stream and see which
//! posts would be re-shared without touching the account.

use async_trait::async_trait;

use crate::error::Result;
use crate::platforms::ReshareClient;

#[derive(Debug, Default)]
pub struct DryRunReshareClient;

impl DryRunReshareClient {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ReshareClient for DryRunReshareClient {
    async fn reshare(&self, post_id: &str) -> Result<()> {
        tracing::info!(post_id, "[dry-run] would re-share post {}", post_id);
        Ok(())
    }

    fn name(&self) -> &str {
        "dry-run"
    }
}

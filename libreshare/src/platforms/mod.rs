//! Platform abstraction and implementations
//!
//! The bot talks to two external APIs: a streaming API that delivers posts
//! matching a set of track keywords, and a request-based API that performs
//! one-shot actions such as re-sharing. Each is hidden behind a trait so the
//! supervisor can be driven by in-memory doubles in tests.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use futures::StreamExt;
//! use libreshare::config::{Credentials, TwitterConfig};
//! use libreshare::platforms::{ReshareClient, StreamClient};
//! use libreshare::platforms::twitter::{TwitterRestClient, TwitterStreamClient};
//!
//! # async fn example() -> libreshare::error::Result<()> {
//! let credentials = Arc::new(Credentials::from_env()?);
//! let twitter = TwitterConfig::default();
//!
//! let stream_client = TwitterStreamClient::new(credentials.clone(), &twitter.stream_base)?;
//! let rest_client = TwitterRestClient::new(credentials, &twitter.api_base)?;
//!
//! let mut events = stream_client.subscribe(&["#rust".to_string()]).await?;
//! while let Some(event) = events.next().await {
//!     println!("{:?}", event?);
//! }
//! rest_client.reshare("1050118621198921728").await?;
//! # Ok(())
//! # }
//! ```

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::Result;
use crate::types::StreamEvent;

pub mod dry_run;
pub mod twitter;

// Mock clients are available for all builds (not just tests) to support integration tests
pub mod mock;

/// Events of one live subscription, in delivery order
///
/// An `Err` item or the end of the stream terminates the subscription.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

/// Subscription side of the platform
#[async_trait]
pub trait StreamClient: Send + Sync {
    /// Open a subscription filtered by the given track keywords
    ///
    /// # Errors
    ///
    /// Returns an error when the connection cannot be established or the
    /// server refuses the subscription (bad credentials, rate limit, ...).
    async fn subscribe(&self, track: &[String]) -> Result<EventStream>;

    /// Lowercase platform identifier for log lines
    fn name(&self) -> &str;
}

/// Request side of the platform
#[async_trait]
pub trait ReshareClient: Send + Sync {
    /// Re-share the post with the given identifier under the bot's account
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::AlreadyReshared` when the account already
    /// re-shared the post, and `Authentication`, `RateLimit`, `Network` or
    /// `Api` for the other failure modes.
    async fn reshare(&self, post_id: &str) -> Result<()>;

    fn name(&self) -> &str;
}

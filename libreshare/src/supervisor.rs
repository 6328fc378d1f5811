//! Stream supervisor
//!
//! Keeps one subscription alive forever. The supervisor alternates between
//! two states:
//!
//! - **Subscribed**: events are pulled from the stream one at a time. Each
//!   post is logged and run through the decision engine; a positive decision
//!   re-shares the post before the next event is pulled.
//! - **Error-Wait**: entered when anything ends the subscription (connect
//!   failure, mid-stream error, disconnect notice, end of stream, or a failed
//!   re-share). The error is logged, the supervisor sleeps for the delay
//!   chosen by its [`RetryPolicy`], then subscribes again with the same
//!   keywords.
//!
//! Every failure takes the same path; nothing escapes [`Supervisor::run`].
//!
//! # Example
//!
//! ```no_run
//! use libreshare::config::Config;
//! use libreshare::platforms::twitter::{TwitterRestClient, TwitterStreamClient};
//! use libreshare::supervisor::Supervisor;
//!
//! # async fn example() -> libreshare::error::Result<()> {
//! let config = Config::load(None)?;
//! let stream = TwitterStreamClient::new(config.credentials.clone(), &config.twitter.stream_base)?;
//! let rest = TwitterRestClient::new(config.credentials.clone(), &config.twitter.api_base)?;
//!
//! let supervisor = Supervisor::new(&config, Box::new(stream), Box::new(rest));
//! match supervisor.run().await {}
//! # }
//! ```

use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tracing::{debug, error, info, warn};

use crate::config::{Config, DEFAULT_RETRY_DELAY_SECS};
use crate::error::{ReshareError, Result, StreamError};
use crate::filter::{self, Verdict, WatchList};
use crate::platforms::{ReshareClient, StreamClient};
use crate::types::StreamEvent;

/// Wait used in the Error-Wait state
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real wall-clock sleep
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Records requested waits instead of sleeping
///
/// Available for all builds so integration tests can drive the supervisor
/// without real delays. Clones share their recordings.
#[derive(Debug, Default, Clone)]
pub struct RecordingSleeper {
    waits: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
        tokio::task::yield_now().await;
    }
}

/// Chooses how long to wait after a failed subscription
pub trait RetryPolicy: Send + Sync {
    fn delay_for(&self, error: &ReshareError) -> Duration;
}

/// The same delay for every error, transient or not
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDelay(pub Duration);

impl Default for FixedDelay {
    fn default() -> Self {
        FixedDelay(Duration::from_secs(DEFAULT_RETRY_DELAY_SECS))
    }
}

impl RetryPolicy for FixedDelay {
    fn delay_for(&self, _error: &ReshareError) -> Duration {
        self.0
    }
}

/// What happened during one Subscribed → Error-Wait cycle
#[derive(Debug)]
pub struct SessionReport {
    /// Stream messages received, of any kind
    pub events: usize,
    /// Posts among those messages
    pub posts: usize,
    /// Posts successfully re-shared
    pub reshared: usize,
    /// The failure that ended the subscription
    pub error: ReshareError,
    /// How long the supervisor waited afterwards
    pub waited: Duration,
}

#[derive(Debug, Default)]
struct SessionStats {
    events: usize,
    posts: usize,
    reshared: usize,
}

pub struct Supervisor {
    stream: Box<dyn StreamClient>,
    reshare: Box<dyn ReshareClient>,
    watch_list: WatchList,
    max_hashtags: usize,
    retry_policy: Box<dyn RetryPolicy>,
    sleeper: Box<dyn Sleeper>,
}

impl Supervisor {
    /// Create a supervisor waiting `config.retry_delay` after every failure
    pub fn new(
        config: &Config,
        stream: Box<dyn StreamClient>,
        reshare: Box<dyn ReshareClient>,
    ) -> Self {
        Self {
            stream,
            reshare,
            watch_list: config.watch_list.clone(),
            max_hashtags: config.max_hashtags,
            retry_policy: Box::new(FixedDelay(config.retry_delay)),
            sleeper: Box::new(TokioSleeper),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Box<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: Box<dyn RetryPolicy>) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Supervise the subscription forever
    pub async fn run(&self) -> Infallible {
        loop {
            self.run_session().await;
        }
    }

    /// Run one Subscribed state to its failure, then the Error-Wait state
    pub async fn run_session(&self) -> SessionReport {
        let mut stats = SessionStats::default();

        let error = match self.stream_until_failure(&mut stats).await {
            Ok(()) => ReshareError::from(StreamError::Ended),
            Err(e) => e,
        };

        let delay = self.retry_policy.delay_for(&error);

        error!(
            events = stats.events,
            reshared = stats.reshared,
            "Subscription failed: {}",
            error
        );
        info!(
            at = %chrono::Utc::now().to_rfc3339(),
            "Waiting for {} seconds before resubscribing",
            delay.as_secs()
        );

        self.sleeper.sleep(delay).await;

        SessionReport {
            events: stats.events,
            posts: stats.posts,
            reshared: stats.reshared,
            error,
            waited: delay,
        }
    }

    /// Subscribed state; returns `Ok` only if the stream ends cleanly
    async fn stream_until_failure(&self, stats: &mut SessionStats) -> Result<()> {
        info!(
            platform = self.stream.name(),
            track = %self.watch_list,
            "Subscribing to stream"
        );

        let mut events = self
            .stream
            .subscribe(self.watch_list.track_keywords())
            .await?;

        info!("Subscribed, waiting for posts");

        while let Some(event) = events.next().await {
            let event = event?;
            stats.events += 1;
            self.handle_event(&event, stats).await?;
        }

        Ok(())
    }

    async fn handle_event(&self, event: &StreamEvent, stats: &mut SessionStats) -> Result<()> {
        match event {
            StreamEvent::Post(post) => {
                stats.posts += 1;
                info!(post_id = %post.id, "Caught post -> {}", post.display_text());
            }
            StreamEvent::Disconnect { code, reason } => {
                return Err(StreamError::Disconnected {
                    code: *code,
                    reason: reason.clone(),
                }
                .into());
            }
            StreamEvent::Warning { message } => warn!("Stream warning: {}", message),
            StreamEvent::Limit { undelivered } => {
                debug!("Stream limit notice: {} posts not delivered", undelivered)
            }
            other => debug!(kind = other.kind(), "Ignoring stream message"),
        }

        let verdict = filter::evaluate(event, &self.watch_list, self.max_hashtags);
        let StreamEvent::Post(post) = event else {
            return Ok(());
        };

        if verdict != Verdict::Reshare {
            debug!(post_id = %post.id, "Skipping post: {}", verdict);
            return Ok(());
        }

        self.reshare.reshare(&post.id).await?;
        stats.reshared += 1;

        info!(
            post_id = %post.id,
            platform = self.reshare.name(),
            "[{}] Re-shared successfully!",
            chrono::Utc::now().to_rfc3339()
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use crate::config::FileConfig;
    use crate::error::PlatformError;
    use crate::platforms::mock::{MockReshareClient, MockStreamClient};
    use crate::types::Post;

    fn config() -> Config {
        Config::build(Credentials::new("a", "b", "c", "d"), FileConfig::default()).unwrap()
    }

    fn supervisor(
        stream: &MockStreamClient,
        reshare: &MockReshareClient,
        sleeper: &RecordingSleeper,
    ) -> Supervisor {
        Supervisor::new(
            &config(),
            Box::new(stream.clone()),
            Box::new(reshare.clone()),
        )
        .with_sleeper(Box::new(sleeper.clone()))
    }

    fn matching(id: &str) -> StreamEvent {
        StreamEvent::Post(Post::new(id, "hello").with_hashtags(&["ruby"]))
    }

    #[tokio::test]
    async fn test_clean_end_of_stream_is_a_failure() {
        let stream = MockStreamClient::new().with_events(vec![]);
        let reshare = MockReshareClient::success();
        let sleeper = RecordingSleeper::new();

        let report = supervisor(&stream, &reshare, &sleeper).run_session().await;

        assert!(matches!(
            report.error,
            ReshareError::Stream(StreamError::Ended)
        ));
        assert_eq!(report.waited, Duration::from_secs(60));
        assert_eq!(sleeper.waits(), vec![Duration::from_secs(60)]);
    }

    #[tokio::test]
    async fn test_disconnect_notice_ends_session() {
        let stream = MockStreamClient::new().with_events(vec![
            StreamEvent::Disconnect {
                code: 7,
                reason: "admin logout".to_string(),
            },
            matching("1"),
        ]);
        let reshare = MockReshareClient::success();
        let sleeper = RecordingSleeper::new();

        let report = supervisor(&stream, &reshare, &sleeper).run_session().await;

        assert!(matches!(
            report.error,
            ReshareError::Stream(StreamError::Disconnected { code: 7, .. })
        ));
        assert_eq!(reshare.call_count(), 0);
    }

    #[tokio::test]
    async fn test_reshare_failure_ends_session() {
        let stream = MockStreamClient::new().with_events(vec![matching("1"), matching("2")]);
        let reshare = MockReshareClient::failure(PlatformError::AlreadyReshared(
            "You have already retweeted this Tweet.".to_string(),
        ));
        let sleeper = RecordingSleeper::new();

        let report = supervisor(&stream, &reshare, &sleeper).run_session().await;

        assert!(matches!(
            report.error,
            ReshareError::Platform(PlatformError::AlreadyReshared(_))
        ));
        // The second post is never processed
        assert_eq!(reshare.reshared_ids(), vec!["1".to_string()]);
        assert_eq!(report.events, 1);
        assert_eq!(report.reshared, 0);
        assert_eq!(sleeper.waits().len(), 1);
    }

    #[tokio::test]
    async fn test_custom_retry_policy() {
        struct Quick;
        impl RetryPolicy for Quick {
            fn delay_for(&self, _error: &ReshareError) -> Duration {
                Duration::from_secs(1)
            }
        }

        let stream = MockStreamClient::new().with_connect_error("refused");
        let reshare = MockReshareClient::success();
        let sleeper = RecordingSleeper::new();

        let report = supervisor(&stream, &reshare, &sleeper)
            .with_retry_policy(Box::new(Quick))
            .run_session()
            .await;

        assert_eq!(report.waited, Duration::from_secs(1));
        assert_eq!(sleeper.waits(), vec![Duration::from_secs(1)]);
    }

    #[test]
    fn test_fixed_delay_ignores_error_kind() {
        let policy = FixedDelay::default();
        let auth: ReshareError = PlatformError::Authentication("bad".to_string()).into();
        let network: ReshareError = StreamError::Network("reset".to_string()).into();
        assert_eq!(policy.delay_for(&auth), Duration::from_secs(60));
        assert_eq!(policy.delay_for(&network), Duration::from_secs(60));
    }
}

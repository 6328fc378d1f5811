//! libreshare - hashtag re-share bot
//!
//! Watches a real-time post stream for posts tagged with a fixed set of
//! hashtags and re-shares the ones that pass the decision engine. The
//! supervisor keeps the subscription alive forever, waiting a fixed delay
//! after every failure.

pub mod config;
pub mod error;
pub mod filter;
pub mod logging;
pub mod platforms;
pub mod supervisor;
pub mod types;

// Re-export commonly used types
pub use config::{Config, Credentials};
pub use error::{ReshareError, Result};
pub use filter::{should_reshare, WatchList, MAX_HASHTAG_COUNT};
pub use supervisor::Supervisor;
pub use types::{Post, StreamEvent};

//! Decision engine: should a stream event be re-shared?
//!
//! A post qualifies when all of the following hold:
//!
//! 1. the event is a post (notices and unknown messages never qualify)
//! 2. the post is original, not itself a re-share
//! 3. it carries at most `max_hashtags` hashtags
//! 4. the platform has not flagged it sensitive
//! 5. at least one of its hashtags is on the watch list
//!
//! Hashtags are always taken from [`Post::hashtags`], which selects the
//! extended-content set when one is present.
//!
//! # Example
//!
//! ```
//! use libreshare::filter::{should_reshare, WatchList, MAX_HASHTAG_COUNT};
//! use libreshare::types::{Post, StreamEvent};
//!
//! let watch_list = WatchList::default();
//! let post = Post::new("1", "New release #Ruby").with_hashtags(&["Ruby"]);
//!
//! assert!(should_reshare(&StreamEvent::Post(post), &watch_list, MAX_HASHTAG_COUNT));
//! ```

use std::fmt;

use crate::error::{ConfigError, Result};
use crate::types::{Post, StreamEvent};

/// Posts with more hashtags than this are treated as spam
pub const MAX_HASHTAG_COUNT: usize = 10;

/// Hashtags watched when no configuration overrides them
pub const DEFAULT_HASHTAGS: &[&str] = &["#rails", "#ruby", "#RubyOnRails"];

/// Fixed set of `#`-prefixed hashtags, compared case-insensitively
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchList {
    /// Entries as configured, used as stream track keywords
    entries: Vec<String>,
    /// Upper-cased entries, used for matching
    normalized: Vec<String>,
}

impl WatchList {
    /// Build a watch list, rejecting empty lists and entries without `#`
    pub fn new<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries: Vec<String> = entries
            .into_iter()
            .map(|e| e.into().trim().to_string())
            .collect();

        if entries.is_empty() {
            return Err(ConfigError::Invalid("watch list must not be empty".to_string()).into());
        }

        if let Some(bad) = entries.iter().find(|e| e.len() < 2 || !e.starts_with('#')) {
            return Err(ConfigError::Invalid(format!(
                "watch list entry '{}' must be a '#'-prefixed hashtag",
                bad
            ))
            .into());
        }

        let normalized = entries.iter().map(|e| e.to_uppercase()).collect();

        Ok(Self {
            entries,
            normalized,
        })
    }

    /// Keywords passed to the stream subscription
    pub fn track_keywords(&self) -> &[String] {
        &self.entries
    }

    /// True when at least one authoritative hashtag of the post is watched
    ///
    /// Entities without text never match. A post without hashtags never
    /// matches.
    pub fn matches(&self, post: &Post) -> bool {
        post.hashtags().iter().any(|hashtag| {
            hashtag
                .text
                .as_deref()
                .map(|text| format!("#{}", text.to_uppercase()))
                .is_some_and(|tag| self.normalized.contains(&tag))
        })
    }
}

impl Default for WatchList {
    fn default() -> Self {
        let entries: Vec<String> = DEFAULT_HASHTAGS.iter().map(|s| s.to_string()).collect();
        let normalized = entries.iter().map(|e| e.to_uppercase()).collect();
        Self {
            entries,
            normalized,
        }
    }
}

impl fmt::Display for WatchList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.entries.join(","))
    }
}

/// Outcome of evaluating one stream event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Reshare,
    NotAPost,
    AlreadyReshare,
    TooManyHashtags,
    Sensitive,
    NoWatchedHashtag,
}

impl Verdict {
    pub fn is_reshare(&self) -> bool {
        matches!(self, Verdict::Reshare)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Verdict::Reshare => "matches watch list",
            Verdict::NotAPost => "not a post",
            Verdict::AlreadyReshare => "post is itself a re-share",
            Verdict::TooManyHashtags => "too many hashtags",
            Verdict::Sensitive => "flagged sensitive",
            Verdict::NoWatchedHashtag => "no watched hashtag",
        };
        write!(f, "{}", reason)
    }
}

pub fn is_post(event: &StreamEvent) -> bool {
    matches!(event, StreamEvent::Post(_))
}

pub fn is_reshare(post: &Post) -> bool {
    !post.is_original
}

pub fn within_hashtag_limit(post: &Post, max_hashtags: usize) -> bool {
    post.hashtags().len() <= max_hashtags
}

pub fn is_sensitive(post: &Post) -> bool {
    post.is_sensitive
}

/// Evaluate an event, reporting the first failed check
pub fn evaluate(event: &StreamEvent, watch_list: &WatchList, max_hashtags: usize) -> Verdict {
    let StreamEvent::Post(post) = event else {
        return Verdict::NotAPost;
    };

    if is_reshare(post) {
        Verdict::AlreadyReshare
    } else if !within_hashtag_limit(post, max_hashtags) {
        Verdict::TooManyHashtags
    } else if is_sensitive(post) {
        Verdict::Sensitive
    } else if !watch_list.matches(post) {
        Verdict::NoWatchedHashtag
    } else {
        Verdict::Reshare
    }
}

/// Decide whether an event should be re-shared
pub fn should_reshare(event: &StreamEvent, watch_list: &WatchList, max_hashtags: usize) -> bool {
    evaluate(event, watch_list, max_hashtags).is_reshare()
}

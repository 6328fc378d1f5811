//! Core types for the re-share bot
//!
//! The stream delivers one JSON message per line. Most lines are posts, but
//! the platform also interleaves deletion notices, track-limit notices, stall
//! warnings and disconnect notices. [`StreamEvent`] classifies a line into one
//! of these without ever failing on an unexpected shape: anything that cannot
//! be understood becomes [`StreamEvent::Other`].

use serde::Deserialize;
use serde_json::Value;

use crate::error::StreamError;

/// A post received from the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    /// Platform identifier (`id_str` on the wire)
    pub id: String,
    pub text: String,
    /// Screen name of the author, when the payload includes it
    pub author: Option<String>,
    /// False when the post is itself a re-share of another post
    pub is_original: bool,
    pub is_sensitive: bool,
    /// Top-level hashtag entities
    pub hashtags: Vec<HashtagEntity>,
    /// Extended content for long posts
    pub extended: Option<ExtendedContent>,
}

/// Extended content carried by posts longer than the classic limit
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtendedContent {
    pub full_text: Option<String>,
    /// Hashtags of the extended content; when present they replace the
    /// top-level ones entirely
    pub hashtags: Option<Vec<HashtagEntity>>,
}

/// A hashtag annotation. Text may be missing on malformed payloads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HashtagEntity {
    #[serde(default)]
    pub text: Option<String>,
}

impl HashtagEntity {
    pub fn new(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
        }
    }

    /// An entity without text
    pub fn empty() -> Self {
        Self { text: None }
    }
}

impl Post {
    /// Create an original, non-sensitive post without hashtags
    pub fn new(id: &str, text: &str) -> Self {
        Self {
            id: id.to_string(),
            text: text.to_string(),
            author: None,
            is_original: true,
            is_sensitive: false,
            hashtags: Vec::new(),
            extended: None,
        }
    }

    /// Replace the top-level hashtags
    pub fn with_hashtags(mut self, tags: &[&str]) -> Self {
        self.hashtags = tags.iter().map(|t| HashtagEntity::new(t)).collect();
        self
    }

    /// Attach extended content carrying its own hashtag set
    pub fn with_extended_hashtags(mut self, tags: &[&str]) -> Self {
        let extended = self.extended.get_or_insert_with(ExtendedContent::default);
        extended.hashtags = Some(tags.iter().map(|t| HashtagEntity::new(t)).collect());
        self
    }

    /// Mark the post as a re-share of another post
    pub fn as_reshare(mut self) -> Self {
        self.is_original = false;
        self
    }

    /// Mark the post as flagged sensitive by the platform
    pub fn as_sensitive(mut self) -> Self {
        self.is_sensitive = true;
        self
    }

    /// The authoritative hashtag set
    ///
    /// Extended-content hashtags win when the post carries them; the two sets
    /// are never combined.
    pub fn hashtags(&self) -> &[HashtagEntity] {
        self.extended
            .as_ref()
            .and_then(|e| e.hashtags.as_deref())
            .unwrap_or(self.hashtags.as_slice())
    }

    /// Full display text, preferring the extended text for long posts
    pub fn display_text(&self) -> &str {
        self.extended
            .as_ref()
            .and_then(|e| e.full_text.as_deref())
            .unwrap_or(self.text.as_str())
    }
}

/// A single message received on the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Post(Post),
    /// A post was deleted upstream
    Delete { id: Option<String> },
    /// More posts matched the track keywords than the stream delivered
    Limit { undelivered: u64 },
    /// Stall warning: the client is falling behind
    Warning { message: String },
    /// The server is about to close the connection
    Disconnect { code: u32, reason: String },
    /// Any message this bot does not understand
    Other,
}

impl StreamEvent {
    /// Classify one line of the stream
    ///
    /// Only invalid JSON is an error. A valid message with an unexpected
    /// shape, including a post whose fields fail to decode, becomes
    /// [`StreamEvent::Other`].
    pub fn from_json(line: &str) -> std::result::Result<Self, StreamError> {
        let value: Value =
            serde_json::from_str(line).map_err(|e| StreamError::Decode(e.to_string()))?;
        Ok(Self::from_value(value))
    }

    pub fn from_value(value: Value) -> Self {
        let Some(object) = value.as_object() else {
            return StreamEvent::Other;
        };

        if let Some(delete) = object.get("delete") {
            let id = delete
                .pointer("/status/id_str")
                .and_then(Value::as_str)
                .map(str::to_string);
            return StreamEvent::Delete { id };
        }

        if let Some(limit) = object.get("limit") {
            let undelivered = limit.get("track").and_then(Value::as_u64).unwrap_or(0);
            return StreamEvent::Limit { undelivered };
        }

        if let Some(warning) = object.get("warning") {
            let message = warning
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            return StreamEvent::Warning { message };
        }

        if let Some(disconnect) = object.get("disconnect") {
            let code = disconnect
                .get("code")
                .and_then(Value::as_u64)
                .and_then(|code| u32::try_from(code).ok())
                .unwrap_or(0);
            let reason = disconnect
                .get("reason")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            return StreamEvent::Disconnect { code, reason };
        }

        if object.contains_key("id_str") {
            return match serde_json::from_value::<RawPost>(value) {
                Ok(raw) => StreamEvent::Post(raw.into()),
                Err(e) => {
                    tracing::debug!("Ignoring post-like message that failed to decode: {}", e);
                    StreamEvent::Other
                }
            };
        }

        StreamEvent::Other
    }

    /// Short label for log lines
    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::Post(_) => "post",
            StreamEvent::Delete { .. } => "delete",
            StreamEvent::Limit { .. } => "limit",
            StreamEvent::Warning { .. } => "warning",
            StreamEvent::Disconnect { .. } => "disconnect",
            StreamEvent::Other => "other",
        }
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawPost {
    id_str: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    full_text: Option<String>,
    #[serde(default)]
    user: Option<RawUser>,
    #[serde(default)]
    retweeted_status: Option<Value>,
    #[serde(default)]
    possibly_sensitive: Option<bool>,
    #[serde(default)]
    entities: Option<RawEntities>,
    #[serde(default)]
    extended_tweet: Option<RawExtended>,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    #[serde(default)]
    screen_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEntities {
    #[serde(default)]
    hashtags: Option<Vec<HashtagEntity>>,
}

#[derive(Debug, Deserialize)]
struct RawExtended {
    #[serde(default)]
    full_text: Option<String>,
    #[serde(default)]
    entities: Option<RawEntities>,
}

impl From<RawPost> for Post {
    fn from(raw: RawPost) -> Self {
        let extended = raw.extended_tweet.map(|ext| ExtendedContent {
            full_text: ext.full_text,
            hashtags: ext.entities.and_then(|e| e.hashtags),
        });

        Post {
            id: raw.id_str,
            text: raw.text.or(raw.full_text).unwrap_or_default(),
            author: raw.user.and_then(|u| u.screen_name),
            is_original: raw.retweeted_status.is_none(),
            is_sensitive: raw.possibly_sensitive.unwrap_or(false),
            hashtags: raw.entities.and_then(|e| e.hashtags).unwrap_or_default(),
            extended,
        }
    }
}

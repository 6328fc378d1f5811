//! Mock platform clients for testing
//!
//! [`MockStreamClient`] replays scripted subscriptions: each call to
//! `subscribe` consumes the next scripted session, which either fails to
//! connect or delivers a fixed list of items. Once the script runs out,
//! subscriptions succeed and stay silent forever, like an idle live stream.
//!
//! [`MockReshareClient`] records every re-share request and can be told to
//! fail. Both clients are cheap to clone and clones share their recordings,
//! so a test can keep a handle after moving one into the supervisor.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::error::{PlatformError, ReshareError, Result, StreamError};
use crate::platforms::{EventStream, ReshareClient, StreamClient};
use crate::types::StreamEvent;

/// One scripted item of a mock subscription
#[derive(Debug, Clone)]
pub enum MockItem {
    Event(StreamEvent),
    /// Mid-stream network failure with the given message
    Error(String),
}

/// One scripted subscription
#[derive(Debug, Clone)]
pub enum MockSession {
    /// `subscribe` itself fails with a network error
    ConnectError(String),
    /// `subscribe` succeeds and the stream yields these items, then ends
    Items(Vec<MockItem>),
}

#[derive(Debug, Clone, Default)]
pub struct MockStreamClient {
    sessions: Arc<Mutex<VecDeque<MockSession>>>,
    subscribe_calls: Arc<Mutex<Vec<Vec<String>>>>,
}

impl MockStreamClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(self, session: MockSession) -> Self {
        self.sessions.lock().unwrap().push_back(session);
        self
    }

    /// Script a subscription that fails to connect
    pub fn with_connect_error(self, message: &str) -> Self {
        self.with_session(MockSession::ConnectError(message.to_string()))
    }

    /// Script a subscription that delivers these events and then ends
    pub fn with_events(self, events: Vec<StreamEvent>) -> Self {
        self.with_session(MockSession::Items(
            events.into_iter().map(MockItem::Event).collect(),
        ))
    }

    /// Script a subscription that delivers these events and then fails
    pub fn with_events_then_error(self, events: Vec<StreamEvent>, message: &str) -> Self {
        let mut items: Vec<MockItem> = events.into_iter().map(MockItem::Event).collect();
        items.push(MockItem::Error(message.to_string()));
        self.with_session(MockSession::Items(items))
    }

    /// Track keywords of every `subscribe` call, in order
    pub fn subscribe_calls(&self) -> Vec<Vec<String>> {
        self.subscribe_calls.lock().unwrap().clone()
    }

    pub fn subscribe_count(&self) -> usize {
        self.subscribe_calls.lock().unwrap().len()
    }

    pub fn remaining_sessions(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }
}

#[async_trait]
impl StreamClient for MockStreamClient {
    async fn subscribe(&self, track: &[String]) -> Result<EventStream> {
        self.subscribe_calls.lock().unwrap().push(track.to_vec());

        let next = self.sessions.lock().unwrap().pop_front();
        match next {
            Some(MockSession::ConnectError(message)) => {
                Err(PlatformError::Network(message).into())
            }
            Some(MockSession::Items(items)) => {
                let items = items.into_iter().map(|item| match item {
                    MockItem::Event(event) => Ok(event),
                    MockItem::Error(message) => {
                        Err(ReshareError::from(StreamError::Network(message)))
                    }
                });
                Ok(Box::pin(futures::stream::iter(items)))
            }
            None => Ok(Box::pin(futures::stream::pending::<Result<StreamEvent>>())),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockReshareClient {
    failure: Option<PlatformError>,
    reshared: Arc<Mutex<Vec<String>>>,
}

impl MockReshareClient {
    /// A client whose re-shares always succeed
    pub fn success() -> Self {
        Self::default()
    }

    /// A client whose re-shares always fail with the given error
    pub fn failure(error: PlatformError) -> Self {
        Self {
            failure: Some(error),
            ..Default::default()
        }
    }

    /// Post ids of every re-share request, including failed ones
    pub fn reshared_ids(&self) -> Vec<String> {
        self.reshared.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.reshared.lock().unwrap().len()
    }
}

#[async_trait]
impl ReshareClient for MockReshareClient {
    async fn reshare(&self, post_id: &str) -> Result<()> {
        self.reshared.lock().unwrap().push(post_id.to_string());

        match &self.failure {
            Some(error) => Err(error.clone().into()),
            None => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

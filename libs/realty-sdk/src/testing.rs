//! In-memory fakes for exercising the clients without a network.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use realty_auth::{SecretString, SessionError, SessionHandle};
use realty_http::{HeaderMap, HttpError, StatusCode, header::HeaderValue};

use crate::executor::{ApiRequest, RequestExecutor};
use crate::outcome::RequestOutcome;

pub fn outcome_for(status: u16, body: &str) -> RequestOutcome {
    RequestOutcome::classify(
        StatusCode::from_u16(status).unwrap(),
        HeaderMap::new(),
        Bytes::from(body.to_owned()),
    )
}

/// Session whose refresh and teardown behavior is set up front.
pub struct FakeSession {
    credential: Mutex<Option<String>>,
    user_id: Option<String>,
    refresh_to: Option<String>,
    fail_teardown: bool,
    refreshes: AtomicUsize,
    teardowns: AtomicUsize,
}

impl FakeSession {
    /// Signed in with `credential`; refresh fails until `refreshing_to` is set.
    pub fn new(credential: &str) -> Self {
        Self {
            credential: Mutex::new(Some(credential.to_owned())),
            user_id: Some("u-1".to_owned()),
            refresh_to: None,
            fail_teardown: false,
            refreshes: AtomicUsize::new(0),
            teardowns: AtomicUsize::new(0),
        }
    }

    pub fn signed_out() -> Self {
        let session = Self::new("");
        *session.credential.lock().unwrap() = None;
        session
    }

    pub fn refreshing_to(mut self, credential: &str) -> Self {
        self.refresh_to = Some(credential.to_owned());
        self
    }

    pub fn failing_refresh(mut self) -> Self {
        self.refresh_to = None;
        self
    }

    pub fn failing_teardown(mut self) -> Self {
        self.fail_teardown = true;
        self
    }

    pub fn refresh_calls(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn teardown_calls(&self) -> usize {
        self.teardowns.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionHandle for FakeSession {
    fn credential(&self) -> Option<SecretString> {
        self.credential
            .lock()
            .unwrap()
            .as_deref()
            .map(SecretString::new)
    }

    fn user_id(&self) -> Option<String> {
        self.user_id.clone()
    }

    async fn refresh(&self) -> Result<SecretString, SessionError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        match &self.refresh_to {
            Some(fresh) => {
                *self.credential.lock().unwrap() = Some(fresh.clone());
                Ok(SecretString::new(fresh.as_str()))
            }
            None => Err(SessionError::Rejected("refresh token expired".into())),
        }
    }

    async fn teardown(&self) -> Result<(), SessionError> {
        self.teardowns.fetch_add(1, Ordering::SeqCst);
        *self.credential.lock().unwrap() = None;
        if self.fail_teardown {
            return Err(SessionError::Http("session logout HTTP 500".into()));
        }
        Ok(())
    }
}

/// Canned reply for [`FakeExecutor`].
pub enum Reply {
    Response {
        status: u16,
        headers: HeaderMap,
        body: Bytes,
    },
    Network,
}

impl Reply {
    pub fn status(status: u16, body: impl Into<Bytes>) -> Self {
        Self::Response {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        if let Self::Response { headers, .. } = &mut self {
            headers.insert(name, HeaderValue::from_str(value).unwrap());
        }
        self
    }
}

/// A request as the executor saw it.
#[derive(Clone)]
pub struct RecordedCall {
    pub credential: String,
    pub request: ApiRequest,
}

/// Executor that replays scripted replies in order and records every call.
#[derive(Default)]
pub struct FakeExecutor {
    script: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeExecutor {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            script: Mutex::new(replies.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl RequestExecutor for FakeExecutor {
    async fn execute(&self, request: &ApiRequest, credential: &SecretString) -> RequestOutcome {
        self.calls.lock().unwrap().push(RecordedCall {
            credential: credential.expose().to_owned(),
            request: request.clone(),
        });
        let reply = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .expect("FakeExecutor script exhausted");
        match reply {
            Reply::Response {
                status,
                headers,
                body,
            } => RequestOutcome::classify(StatusCode::from_u16(status).unwrap(), headers, body),
            Reply::Network => RequestOutcome::NetworkFailure(HttpError::Transport(
                "connection refused".into(),
            )),
        }
    }
}

//! Scripted transport and recording clock for gateway tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde_json::Value;

use super::error::TransportError;
use super::executor::{RawResponse, Sleeper, UpstreamTransport};

pub(crate) enum Step {
    Reply(RawResponse),
    Fail(TransportError),
}

pub(crate) fn reply(status: u16, body: &str) -> RawResponse {
    RawResponse {
        status,
        location: None,
        body: body.to_string(),
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SentRequest {
    pub url: String,
    pub payload: Value,
    pub headers: HeaderMap,
    pub timeout: Duration,
}

/// Replays a fixed sequence of replies and records every request
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    script: Mutex<VecDeque<Step>>,
    sent: Mutex<Vec<SentRequest>>,
}

impl ScriptedTransport {
    pub fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(steps.into()),
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn sent(&self) -> Vec<SentRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn urls(&self) -> Vec<String> {
        self.sent().into_iter().map(|r| r.url).collect()
    }

    pub fn headers(&self) -> Vec<HeaderMap> {
        self.sent().into_iter().map(|r| r.headers).collect()
    }

    pub fn timeouts(&self) -> Vec<Duration> {
        self.sent().into_iter().map(|r| r.timeout).collect()
    }
}

#[async_trait]
impl UpstreamTransport for ScriptedTransport {
    async fn post(
        &self,
        url: &str,
        payload: &Value,
        headers: &HeaderMap,
        timeout: Duration,
    ) -> Result<RawResponse, TransportError> {
        self.sent.lock().unwrap().push(SentRequest {
            url: url.to_string(),
            payload: payload.clone(),
            headers: headers.clone(),
            timeout,
        });

        match self.script.lock().unwrap().pop_front() {
            Some(Step::Reply(raw)) => Ok(raw),
            Some(Step::Fail(err)) => Err(err),
            None => Err(TransportError::Connect("script exhausted".to_string())),
        }
    }
}

/// Records requested delays and returns immediately
#[derive(Default)]
pub(crate) struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

//! Scriptable stand-ins for the external services, for tests and demos.
//!
//! [`MockCompletionService`] serves queued replies in order, then its
//! fallback for every later call, and records every request. [`StaticSearchGateway`] serves a fixed candidate
//! list, honoring `k` and the threshold, and records every call.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::completion::{Completion, CompletionRequest, CompletionService};
use crate::document::Chunk;
use crate::error::{RagError, Result};
use crate::gateway::SimilaritySearch;

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Fail(String),
}

/// A completion service that answers from a script.
#[derive(Debug)]
pub struct MockCompletionService {
    queue: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    requests: Mutex<Vec<CompletionRequest>>,
    tokens_per_call: u32,
}

impl MockCompletionService {
    /// Reply with `fallback` whenever the queue is empty.
    pub fn new(fallback: impl Into<String>) -> Self {
        Self::with_fallback(Reply::Text(fallback.into()))
    }

    /// Fail with `message` whenever the queue is empty.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_fallback(Reply::Fail(message.into()))
    }

    fn with_fallback(fallback: Reply) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback,
            requests: Mutex::new(Vec::new()),
            tokens_per_call: 42,
        }
    }

    /// Queue a text reply. Queued replies are served first, in queue order.
    pub fn queue_reply(self, text: impl Into<String>) -> Self {
        self.push(Reply::Text(text.into()));
        self
    }

    /// Queue a failure. Queued replies are served first, in queue order.
    pub fn queue_failure(self, message: impl Into<String>) -> Self {
        self.push(Reply::Fail(message.into()));
        self
    }

    fn push(&self, reply: Reply) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push_back(reply);
        }
    }

    /// Number of completions requested so far.
    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }

    /// Every request received, in order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CompletionService for MockCompletionService {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        let reply = self
            .queue
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or_else(|| self.fallback.clone());

        match reply {
            Reply::Text(text) => Ok(Completion { text, token_count: self.tokens_per_call }),
            Reply::Fail(message) => {
                Err(RagError::CompletionError { provider: "mock".to_string(), message })
            }
        }
    }
}

/// A gateway over a fixed candidate list.
#[derive(Debug, Default)]
pub struct StaticSearchGateway {
    chunks: Vec<Chunk>,
    failure: Option<String>,
    calls: Mutex<Vec<(usize, Option<f32>)>>,
}

impl StaticSearchGateway {
    /// Serve `chunks` (best first) for every query.
    pub fn new(chunks: Vec<Chunk>) -> Self {
        Self { chunks, ..Self::default() }
    }

    /// Fail every search with a retrieval error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self { failure: Some(message.into()), ..Self::default() }
    }

    /// `(k, threshold)` of every search, in order.
    pub fn calls(&self) -> Vec<(usize, Option<f32>)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SimilaritySearch for StaticSearchGateway {
    async fn search(&self, _query: &str, k: usize, threshold: Option<f32>) -> Result<Vec<Chunk>> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((k, threshold));
        }
        if let Some(message) = &self.failure {
            return Err(RagError::RetrievalError(message.clone()));
        }
        Ok(self
            .chunks
            .iter()
            .filter(|c| threshold.is_none_or(|t| c.similarity >= t))
            .take(k)
            .cloned()
            .collect())
    }
}

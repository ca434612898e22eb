//! Scriptable reasoner for tests and demos.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use cosecha_core::reasoner::{GenerateRequest, Reasoner, ReasonerError, ReasoningCandidate};

/// A reasoner that replays scripted replies and records every request.
///
/// An exhausted script yields absent candidates, so a `MockReasoner::new()`
/// behaves like a service that answers but produces nothing usable.
#[derive(Default)]
pub struct MockReasoner {
    replies: Mutex<VecDeque<Result<ReasoningCandidate, ReasonerError>>>,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl MockReasoner {
    /// A reasoner with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// A reasoner that replies once with `text`.
    pub fn replying(text: impl Into<String>) -> Self {
        let mock = Self::new();
        mock.push_reply(text);
        mock
    }

    /// A reasoner that fails once with `error`.
    pub fn failing(error: ReasonerError) -> Self {
        let mock = Self::new();
        mock.push_failure(error);
        mock
    }

    /// Queue a text reply.
    pub fn push_reply(&self, text: impl Into<String>) {
        self.replies
            .lock()
            .expect("mock replies lock")
            .push_back(Ok(ReasoningCandidate::from_text(text)));
    }

    /// Queue a failure.
    pub fn push_failure(&self, error: ReasonerError) {
        self.replies
            .lock()
            .expect("mock replies lock")
            .push_back(Err(error));
    }

    /// Every request seen so far, in order.
    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().expect("mock requests lock").clone()
    }

    /// The most recent request, if any.
    pub fn last_request(&self) -> Option<GenerateRequest> {
        self.requests
            .lock()
            .expect("mock requests lock")
            .last()
            .cloned()
    }
}

#[async_trait]
impl Reasoner for MockReasoner {
    async fn generate(
        &self,
        request: GenerateRequest,
    ) -> Result<ReasoningCandidate, ReasonerError> {
        self.requests
            .lock()
            .expect("mock requests lock")
            .push(request);
        self.replies
            .lock()
            .expect("mock replies lock")
            .pop_front()
            .unwrap_or_else(|| Ok(ReasoningCandidate::none()))
    }
}

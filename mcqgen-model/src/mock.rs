//! Scripted model for tests and offline runs.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::{ModelError, Result};
use crate::llm::{Llm, LlmRequest, LlmResponse};

enum Reply {
    Text(String),
    Fail(String),
}

/// A [`Llm`] that replays queued replies and records every request.
///
/// Replies are consumed in order. Once the queue is empty the last reply
/// repeats; a mock with nothing queued answers with
/// [`ModelError::EmptyResponse`].
///
/// ```rust
/// use mcqgen_model::{Llm, LlmRequest, MockLlm};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let model = MockLlm::new("mock").with_response("{}");
/// let reply = model.generate(LlmRequest::new("prompt")).await.unwrap();
/// assert_eq!(reply.text, "{}");
/// assert_eq!(model.requests()[0].prompt, "prompt");
/// # });
/// ```
pub struct MockLlm {
    name: String,
    replies: Mutex<VecDeque<Reply>>,
    last: Mutex<Option<Reply>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlm {
    /// Create a mock with no queued replies.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            replies: Mutex::new(VecDeque::new()),
            last: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful reply.
    pub fn with_response(self, text: impl Into<String>) -> Self {
        lock(&self.replies).push_back(Reply::Text(text.into()));
        self
    }

    /// Queue a failing reply.
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        lock(&self.replies).push_back(Reply::Fail(message.into()));
        self
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<LlmRequest> {
        lock(&self.requests).clone()
    }

    /// Number of `generate` calls so far.
    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn answer(name: &str, reply: &Reply) -> Result<LlmResponse> {
    match reply {
        Reply::Text(text) => Ok(LlmResponse::new(text.clone())),
        Reply::Fail(message) => {
            Err(ModelError::Request { provider: name.to_string(), message: message.clone() })
        }
    }
}

#[async_trait]
impl Llm for MockLlm {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse> {
        lock(&self.requests).push(request);

        let next = lock(&self.replies).pop_front();
        let mut last = lock(&self.last);
        if let Some(reply) = next {
            *last = Some(reply);
        }
        match last.as_ref() {
            Some(reply) => answer(&self.name, reply),
            None => Err(ModelError::EmptyResponse { provider: self.name.clone() }),
        }
    }
}

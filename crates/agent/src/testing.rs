//! Scripted provider fakes shared by the unit tests in this crate.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{ChatProvider, ChatRequest, LlmError};

/// Replays a queue of canned outcomes; the final entry repeats once the
/// queue is drained. Counts calls and keeps the last request for assertions.
pub struct ScriptedProvider {
    name: String,
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    last: Result<String, LlmError>,
    calls: AtomicUsize,
    last_request: Mutex<Option<ChatRequest>>,
}

impl ScriptedProvider {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            script: Mutex::new(VecDeque::new()),
            last: Err(LlmError::EmptyContent),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn reply(mut self, text: &str) -> Self {
        self.last = Ok(text.to_string());
        self.script.get_mut().expect("script lock").push_back(Ok(text.to_string()));
        self
    }

    pub fn fail(mut self, error: LlmError) -> Self {
        self.last = Err(error.clone());
        self.script.get_mut().expect("script lock").push_back(Err(error));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<ChatRequest> {
        self.last_request.lock().expect("request lock").clone()
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().expect("request lock") = Some(request.clone());
        let mut script = self.script.lock().expect("script lock");
        match script.pop_front() {
            Some(outcome) => outcome,
            None => self.last.clone(),
        }
    }
}

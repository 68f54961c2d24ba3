//! Scripted LLM provider — replays a fixed sequence of replies.
//!
//! Deterministic stand-in for driving the agent loop in tests: each call
//! pops the next canned reply. Clones share the same queue so a provider
//! handed to an agent and a tool can be scripted from one place.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::llm::{ChatMessage, ProviderError};

#[derive(Debug, Clone)]
pub struct ScriptedProvider {
    replies: Arc<Mutex<VecDeque<String>>>,
}

impl ScriptedProvider {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Arc::new(Mutex::new(
                replies.into_iter().map(Into::into).collect(),
            )),
        }
    }

    pub async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, ProviderError> {
        self.replies
            .lock()
            .map_err(|_| ProviderError::Request("script lock poisoned".into()))?
            .pop_front()
            .ok_or_else(|| ProviderError::Request("script exhausted".into()))
    }
}

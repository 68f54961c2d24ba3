//! Dummy LLM provider — echoes the last user message prefixed with `[echo]`.
//! Used for testing the full agent round-trip without a real API key.

use crate::llm::{ChatMessage, ProviderError, Role};

#[derive(Debug, Clone)]
pub struct DummyProvider;

impl DummyProvider {
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("");
        Ok(format!("[echo] {last_user}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn complete_prefixes_echo() {
        let p = DummyProvider;
        let msgs = vec![ChatMessage::system("sys"), ChatMessage::user("hello")];
        assert_eq!(p.complete(&msgs).await.unwrap(), "[echo] hello");
    }

    #[tokio::test]
    async fn complete_echoes_last_user_message() {
        let p = DummyProvider;
        let msgs = vec![
            ChatMessage::user("first"),
            ChatMessage::assistant("reply"),
            ChatMessage::user("second"),
        ];
        assert_eq!(p.complete(&msgs).await.unwrap(), "[echo] second");
    }

    #[tokio::test]
    async fn complete_empty_input() {
        let p = DummyProvider;
        assert_eq!(p.complete(&[]).await.unwrap(), "[echo] ");
    }
}

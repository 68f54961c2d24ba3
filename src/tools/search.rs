//! Web search tool — Google Custom Search JSON API.
//!
//! One GET per query against `customsearch/v1` with `key` + `cx` + `q`
//! parameters; results are rendered as plain text lines for the agent.
//! Wire types are private to this module.

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error};

use crate::config::SearchConfig;
use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct WebSearch {
    client: Client,
    endpoint: String,
    api_key: String,
    cse_id: String,
    max_results: u32,
}

impl WebSearch {
    /// Build the search tool. Both credentials are required; a missing key
    /// is a construction error so the caller can decide whether to run
    /// without the tool.
    pub fn new(
        config: &SearchConfig,
        api_key: Option<String>,
        cse_id: Option<String>,
    ) -> Result<Self, AppError> {
        let api_key = api_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AppError::Search("GOOGLE_API_KEY is not set".into()))?;
        let cse_id = cse_id
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AppError::Search("GOOGLE_CSE_ID is not set".into()))?;

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AppError::Search(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            cse_id,
            // the API rejects num > 10
            max_results: config.max_results.clamp(1, 10),
        })
    }

    /// Run a search and render the results as `title — snippet (link)` lines.
    pub async fn run(&self, query: &str) -> Result<String, AppError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::Search("empty search query".into()));
        }

        debug!(query, "web search");
        let num = self.max_results.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.cse_id.as_str()),
                ("q", query),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "search request failed (transport)");
                AppError::Search(format!("request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read error body>".to_string());
            let message = match serde_json::from_str::<ErrorEnvelope>(&body) {
                Ok(env) => format!("HTTP {status}: {}", env.error.message),
                Err(_) => format!("HTTP {status}: {body}"),
            };
            error!(%status, "search returned HTTP error");
            return Err(AppError::Search(message));
        }

        let parsed = response
            .json::<SearchResponse>()
            .await
            .map_err(|e| AppError::Search(format!("failed to parse response body: {e}")))?;

        Ok(render_items(&parsed.items))
    }
}

pub(crate) fn render_items(items: &[Item]) -> String {
    if items.is_empty() {
        return "No search results found.".to_string();
    }
    items
        .iter()
        .map(|item| {
            format!(
                "{} — {} ({})",
                item.title.trim(),
                item.snippet.trim(),
                item.link.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Item {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> SearchConfig {
        SearchConfig {
            endpoint: "http://127.0.0.1:1/customsearch/v1".into(),
            max_results: 5,
            timeout_seconds: 1,
        }
    }

    #[test]
    fn missing_keys_error_at_construction() {
        let cfg = test_config();
        assert!(WebSearch::new(&cfg, None, Some("cx".into())).is_err());
        assert!(WebSearch::new(&cfg, Some("key".into()), None).is_err());
        assert!(WebSearch::new(&cfg, Some(String::new()), Some("cx".into())).is_err());
        assert!(WebSearch::new(&cfg, Some("key".into()), Some("cx".into())).is_ok());
    }

    #[test]
    fn max_results_clamped_to_api_limit() {
        let mut cfg = test_config();
        cfg.max_results = 50;
        let ws = WebSearch::new(&cfg, Some("key".into()), Some("cx".into())).unwrap();
        assert_eq!(ws.max_results, 10);
    }

    #[test]
    fn response_items_decode() {
        let body = r#"{"items":[{"title":"T","link":"https://x","snippet":"S"}]}"#;
        let parsed: SearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.items.len(), 1);
        assert_eq!(render_items(&parsed.items), "T — S (https://x)");
    }

    #[test]
    fn empty_items_render_placeholder() {
        let parsed: SearchResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(render_items(&parsed.items), "No search results found.");
    }

    #[tokio::test]
    async fn empty_query_rejected() {
        let ws =
            WebSearch::new(&test_config(), Some("key".into()), Some("cx".into())).unwrap();
        assert!(ws.run("   ").await.is_err());
    }
}

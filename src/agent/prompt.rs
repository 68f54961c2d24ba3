//! Layered system-prompt assembly.
//!
//! The agent's system prompt is stitched together from plain-text fragments
//! under `config/prompts/`, in the order they are requested:
//!
//! ```text
//! 0. persona.md — who the assistant is and how it speaks
//! 1. agent.md   — tool-use grammar; {{tools}} / {{tool_names}} placeholders
//! ```
//!
//! A missing fragment file drops that layer rather than failing the build,
//! so deployments can override or omit individual layers. `{{key}}`
//! placeholders are filled in after all layers are joined.

use std::path::PathBuf;

/// Fluent builder that assembles a layered prompt from template files.
pub struct PromptBuilder {
    prompts_dir: PathBuf,
    layers: Vec<String>,
    vars: Vec<(String, String)>,
}

impl PromptBuilder {
    /// Create a builder rooted at `prompts_dir` (e.g. `"config/prompts"`).
    pub fn new(prompts_dir: impl Into<PathBuf>) -> Self {
        Self {
            prompts_dir: prompts_dir.into(),
            layers: Vec::new(),
            vars: Vec::new(),
        }
    }

    /// Append the layer stored in `filename`. A missing or empty file is
    /// skipped.
    pub fn layer(mut self, filename: &str) -> Self {
        let path = self.prompts_dir.join(filename);
        match std::fs::read_to_string(&path) {
            Ok(text) => self.push_nonempty(&text),
            Err(_) => tracing::debug!(layer = %path.display(), "prompt layer missing, skipped"),
        }
        self
    }

    /// Append an inline text fragment as its own layer.
    pub fn append(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.push_nonempty(&text);
        self
    }

    /// Register a `{{key}}` → `value` substitution applied at build time.
    pub fn var(mut self, key: &str, value: impl Into<String>) -> Self {
        self.vars.push((key.to_string(), value.into()));
        self
    }

    /// Join the layers with blank lines and fill in every `{{key}}`.
    pub fn build(self) -> String {
        let mut prompt = self.layers.join("\n\n");
        for (key, value) in &self.vars {
            prompt = prompt.replace(&format!("{{{{{key}}}}}"), value);
        }
        prompt
    }

    fn push_nonempty(&mut self, text: &str) {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            self.layers.push(trimmed.to_string());
        }
    }
}

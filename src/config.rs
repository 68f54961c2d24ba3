//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory,
//! then applies `MEDIBOT_WORK_DIR` and `MEDIBOT_LOG_LEVEL` env overrides.
//! API credentials come from the environment only, never from TOML.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::AppError;

/// OpenAI / OpenAI-compatible provider configuration.
/// Populated from `[llm.openai]` in the TOML.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Full chat completions endpoint URL.
    pub api_base_url: String,
    /// Model used by the conversational agent.
    pub agent_model: String,
    pub agent_temperature: f32,
    /// Model used for answer synthesis (index queries, SQL answers).
    pub synthesis_model: String,
    pub synthesis_temperature: f32,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
}

/// LLM subsystem configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Which provider is active (e.g. `"dummy"`, `"openai"`).
    /// Maps to `default` in `[llm]` TOML — named `default` there to signal
    /// that other provider sections can coexist without being loaded.
    pub provider: String,
    pub openai: OpenAiConfig,
}

/// Web search tool configuration (`[search]`).
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Google Custom Search JSON API endpoint.
    pub endpoint: String,
    /// Number of results requested per query (API caps this at 10).
    pub max_results: u32,
    pub timeout_seconds: u64,
}

/// Document index configuration (`[index]`).
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Directory containing the documents to index.
    pub data_dir: PathBuf,
    /// Directory used to persist/reload the built index.
    pub storage_dir: PathBuf,
    /// Target chunk size in characters for the Markdown splitter.
    pub chunk_size: usize,
    /// Number of chunks retrieved per query.
    pub top_k: usize,
}

/// Conversation memory configuration (`[memory]`).
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Maximum transcript entries kept per session (FIFO eviction).
    pub transcript_cap: usize,
    /// Number of past entries injected into the agent prompt.
    pub history_window: usize,
}

/// Agent loop configuration (`[agent]`).
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Maximum tool invocations per user turn.
    pub max_steps: usize,
}

/// HTTP surface configuration (`[http]`).
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub enabled: bool,
    /// Socket address to bind the HTTP listener to.
    pub bind: String,
}

/// Fully-resolved application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_name: String,
    /// Working directory for all persistent data (already expanded, no `~`).
    pub work_dir: PathBuf,
    pub log_level: String,
    /// Append log output here instead of stderr when set.
    pub log_file: Option<PathBuf>,
    pub llm: LlmConfig,
    pub search: SearchConfig,
    pub index: IndexConfig,
    pub memory: MemoryConfig,
    pub agent: AgentConfig,
    pub http: HttpConfig,
    /// From `OPENAI_API_KEY` env — `None` for keyless local models.
    pub openai_api_key: Option<String>,
    /// From `GOOGLE_API_KEY` env — required by the web search tool.
    pub google_api_key: Option<String>,
    /// From `GOOGLE_CSE_ID` env — the Custom Search Engine id (`cx`).
    pub google_cse_id: Option<String>,
}

// ── Raw TOML shape — `serde` target before resolution ─────────────────────────

#[derive(Deserialize)]
struct RawConfig {
    bot: RawBot,
    #[serde(default)]
    llm: RawLlm,
    #[serde(default)]
    search: RawSearch,
    #[serde(default)]
    index: RawIndex,
    #[serde(default)]
    memory: RawMemory,
    #[serde(default)]
    agent: RawAgent,
    #[serde(default)]
    http: RawHttp,
}

#[derive(Deserialize)]
struct RawBot {
    name: String,
    work_dir: String,
    log_level: String,
    #[serde(default)]
    log_file: Option<String>,
}

#[derive(Deserialize)]
struct RawLlm {
    /// Maps to `default = "..."` in `[llm]`.
    #[serde(rename = "default", default = "default_llm_provider")]
    provider: String,
    #[serde(default)]
    openai: RawOpenAi,
}

impl Default for RawLlm {
    fn default() -> Self {
        Self { provider: default_llm_provider(), openai: RawOpenAi::default() }
    }
}

#[derive(Deserialize)]
struct RawOpenAi {
    #[serde(default = "default_openai_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_agent_model")]
    agent_model: String,
    #[serde(default = "default_agent_temperature")]
    agent_temperature: f32,
    #[serde(default = "default_synthesis_model")]
    synthesis_model: String,
    #[serde(default = "default_synthesis_temperature")]
    synthesis_temperature: f32,
    #[serde(default = "default_llm_timeout_seconds")]
    timeout_seconds: u64,
}

impl Default for RawOpenAi {
    fn default() -> Self {
        Self {
            api_base_url: default_openai_api_base_url(),
            agent_model: default_agent_model(),
            agent_temperature: default_agent_temperature(),
            synthesis_model: default_synthesis_model(),
            synthesis_temperature: default_synthesis_temperature(),
            timeout_seconds: default_llm_timeout_seconds(),
        }
    }
}

#[derive(Deserialize)]
struct RawSearch {
    #[serde(default = "default_search_endpoint")]
    endpoint: String,
    #[serde(default = "default_search_max_results")]
    max_results: u32,
    #[serde(default = "default_search_timeout_seconds")]
    timeout_seconds: u64,
}

impl Default for RawSearch {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            max_results: default_search_max_results(),
            timeout_seconds: default_search_timeout_seconds(),
        }
    }
}

#[derive(Deserialize)]
struct RawIndex {
    #[serde(default = "default_data_dir")]
    data_dir: String,
    #[serde(default = "default_storage_dir")]
    storage_dir: String,
    #[serde(default = "default_chunk_size")]
    chunk_size: usize,
    #[serde(default = "default_top_k")]
    top_k: usize,
}

impl Default for RawIndex {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            storage_dir: default_storage_dir(),
            chunk_size: default_chunk_size(),
            top_k: default_top_k(),
        }
    }
}

#[derive(Deserialize)]
struct RawMemory {
    #[serde(default = "default_transcript_cap")]
    transcript_cap: usize,
    #[serde(default = "default_history_window")]
    history_window: usize,
}

impl Default for RawMemory {
    fn default() -> Self {
        Self {
            transcript_cap: default_transcript_cap(),
            history_window: default_history_window(),
        }
    }
}

#[derive(Deserialize)]
struct RawAgent {
    #[serde(default = "default_max_steps")]
    max_steps: usize,
}

impl Default for RawAgent {
    fn default() -> Self {
        Self { max_steps: default_max_steps() }
    }
}

#[derive(Deserialize)]
struct RawHttp {
    /// Defaults to `true`: the HTTP surface is the primary caller.
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default = "default_http_bind")]
    bind: String,
}

impl Default for RawHttp {
    fn default() -> Self {
        Self { enabled: true, bind: default_http_bind() }
    }
}

fn default_llm_provider() -> String { "dummy".to_string() }
fn default_openai_api_base_url() -> String { "https://api.openai.com/v1/chat/completions".to_string() }
fn default_agent_model() -> String { "gpt-4-1106-preview".to_string() }
fn default_agent_temperature() -> f32 { 0.6 }
fn default_synthesis_model() -> String { "gpt-3.5-turbo".to_string() }
fn default_synthesis_temperature() -> f32 { 0.4 }
fn default_llm_timeout_seconds() -> u64 { 60 }
fn default_search_endpoint() -> String { "https://customsearch.googleapis.com/customsearch/v1".to_string() }
fn default_search_max_results() -> u32 { 5 }
fn default_search_timeout_seconds() -> u64 { 30 }
fn default_data_dir() -> String { "data".to_string() }
fn default_storage_dir() -> String { "storage".to_string() }
fn default_chunk_size() -> usize { 1000 }
fn default_top_k() -> usize { 4 }
fn default_transcript_cap() -> usize { 500 }
fn default_history_window() -> usize { 12 }
fn default_max_steps() -> usize { 4 }
fn default_http_bind() -> String { "127.0.0.1:8080".to_string() }
fn default_true() -> bool { true }

/// Load config from `config/default.toml`, then apply env-var overrides.
pub fn load() -> Result<Config, AppError> {
    let work_dir_override = env::var("MEDIBOT_WORK_DIR").ok();
    let log_level_override = env::var("MEDIBOT_LOG_LEVEL").ok();
    load_from(
        Path::new("config/default.toml"),
        work_dir_override.as_deref(),
        log_level_override.as_deref(),
    )
}

/// Internal loader — accepts an explicit path and optional overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(
    path: &Path,
    work_dir_override: Option<&str>,
    log_level_override: Option<&str>,
) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    let work_dir_str = work_dir_override.unwrap_or(&parsed.bot.work_dir).to_string();
    let work_dir = expand_home(&work_dir_str);
    let log_level = log_level_override.unwrap_or(&parsed.bot.log_level).to_string();

    Ok(Config {
        bot_name: parsed.bot.name,
        work_dir,
        log_level,
        log_file: parsed.bot.log_file.as_deref().map(expand_home),
        llm: LlmConfig {
            provider: parsed.llm.provider,
            openai: OpenAiConfig {
                api_base_url: parsed.llm.openai.api_base_url,
                agent_model: parsed.llm.openai.agent_model,
                agent_temperature: parsed.llm.openai.agent_temperature,
                synthesis_model: parsed.llm.openai.synthesis_model,
                synthesis_temperature: parsed.llm.openai.synthesis_temperature,
                timeout_seconds: parsed.llm.openai.timeout_seconds,
            },
        },
        search: SearchConfig {
            endpoint: parsed.search.endpoint,
            max_results: parsed.search.max_results,
            timeout_seconds: parsed.search.timeout_seconds,
        },
        index: IndexConfig {
            data_dir: expand_home(&parsed.index.data_dir),
            storage_dir: expand_home(&parsed.index.storage_dir),
            chunk_size: parsed.index.chunk_size,
            top_k: parsed.index.top_k,
        },
        memory: MemoryConfig {
            transcript_cap: parsed.memory.transcript_cap,
            history_window: parsed.memory.history_window,
        },
        agent: AgentConfig {
            max_steps: parsed.agent.max_steps,
        },
        http: HttpConfig {
            enabled: parsed.http.enabled,
            bind: parsed.http.bind,
        },
        openai_api_key: env::var("OPENAI_API_KEY").ok(),
        google_api_key: env::var("GOOGLE_API_KEY").ok(),
        google_cse_id: env::var("GOOGLE_CSE_ID").ok(),
    })
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

// ── test helpers ──────────────────────────────────────────────────────────────

/// Safe `Config` for tests — dummy LLM, no API keys, no external calls.
/// Not `cfg(test)`-gated so integration tests can use it too.
impl Config {
    pub fn test_default(work_dir: &Path) -> Self {
        Self {
            bot_name: "test".into(),
            work_dir: work_dir.to_path_buf(),
            log_level: "info".into(),
            log_file: None,
            llm: LlmConfig {
                provider: "dummy".into(),
                openai: OpenAiConfig {
                    api_base_url: "http://localhost:0/v1/chat/completions".into(),
                    agent_model: "test-model".into(),
                    agent_temperature: 0.0,
                    synthesis_model: "test-model".into(),
                    synthesis_temperature: 0.0,
                    timeout_seconds: 1,
                },
            },
            search: SearchConfig {
                endpoint: "http://localhost:0/customsearch/v1".into(),
                max_results: 3,
                timeout_seconds: 1,
            },
            index: IndexConfig {
                data_dir: work_dir.join("data"),
                storage_dir: work_dir.join("storage"),
                chunk_size: 200,
                top_k: 3,
            },
            memory: MemoryConfig {
                transcript_cap: 50,
                history_window: 6,
            },
            agent: AgentConfig { max_steps: 3 },
            http: HttpConfig {
                enabled: false,
                bind: default_http_bind(),
            },
            openai_api_key: None,
            google_api_key: None,
            google_cse_id: None,
        }
    }
}

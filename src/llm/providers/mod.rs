//! Concrete provider backends and the config-keyed factory.

pub mod dummy;
pub mod openai_compatible;
pub mod scripted;

use crate::config::LlmConfig;
use crate::llm::{LlmProvider, ProviderError};

/// Which model profile from `[llm.openai]` a provider instance uses.
///
/// The agent model drives the conversational tool loop; the synthesis model
/// turns retrieved context / SQL rows into a final sentence. Two profiles,
/// two provider instances — both cheap clones of the same HTTP client config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelProfile {
    Agent,
    Synthesis,
}

/// Build a provider from config. `api_key` comes from `OPENAI_API_KEY` env —
/// never TOML. Unknown provider names are an error, not a silent fallback.
pub fn build(
    config: &LlmConfig,
    profile: ModelProfile,
    api_key: Option<String>,
) -> Result<LlmProvider, ProviderError> {
    match config.provider.as_str() {
        "dummy" => Ok(LlmProvider::Dummy(dummy::DummyProvider)),
        "openai" => {
            let (model, temperature) = match profile {
                ModelProfile::Agent => (
                    config.openai.agent_model.clone(),
                    config.openai.agent_temperature,
                ),
                ModelProfile::Synthesis => (
                    config.openai.synthesis_model.clone(),
                    config.openai.synthesis_temperature,
                ),
            };
            let provider = openai_compatible::OpenAiCompatibleProvider::new(
                config.openai.api_base_url.clone(),
                model,
                temperature,
                config.openai.timeout_seconds,
                api_key,
            )?;
            Ok(LlmProvider::OpenAiCompatible(provider))
        }
        other => Err(ProviderError::UnknownProvider(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use crate::config::Config;

    #[test]
    fn build_dummy() {
        let cfg = Config::test_default(Path::new("/tmp"));
        let p = build(&cfg.llm, ModelProfile::Agent, None).unwrap();
        assert!(matches!(p, LlmProvider::Dummy(_)));
    }

    #[test]
    fn build_openai() {
        let mut cfg = Config::test_default(Path::new("/tmp"));
        cfg.llm.provider = "openai".into();
        let p = build(&cfg.llm, ModelProfile::Synthesis, Some("sk-test".into())).unwrap();
        assert!(matches!(p, LlmProvider::OpenAiCompatible(_)));
    }

    #[test]
    fn unknown_provider_errors() {
        let mut cfg = Config::test_default(Path::new("/tmp"));
        cfg.llm.provider = "mystery".into();
        let err = build(&cfg.llm, ModelProfile::Agent, None).unwrap_err();
        assert!(err.to_string().contains("mystery"));
    }
}

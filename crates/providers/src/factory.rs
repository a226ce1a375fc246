use vendabot_core::{Config, Error, Result};

use crate::openai::OpenAIProvider;
use crate::Provider;

/// Guess the provider from well-known model name prefixes.
fn infer_provider_from_model(model: &str) -> Option<&'static str> {
    let lower = model.to_lowercase();
    if lower.starts_with("llama") || lower.starts_with("mixtral") || lower.starts_with("gemma") {
        Some("groq")
    } else if lower.starts_with("gpt") || lower.starts_with("o1") || lower.starts_with("o3") {
        Some("openai")
    } else if lower.starts_with("deepseek") {
        Some("deepseek")
    } else if lower.contains('/') {
        // OpenRouter models are namespaced, e.g. "meta-llama/llama-3.1-8b-instruct".
        Some("openrouter")
    } else {
        None
    }
}

fn default_api_base(provider: &str) -> Option<&'static str> {
    match provider {
        "groq" => Some("https://api.groq.com/openai/v1"),
        "openai" => Some("https://api.openai.com/v1"),
        "openrouter" => Some("https://openrouter.ai/api/v1"),
        "deepseek" => Some("https://api.deepseek.com/v1"),
        _ => None,
    }
}

/// Build the LLM client for the configured model. Precedence: the explicit
/// `agents.defaults.provider` setting, then the model name prefix, then the
/// first provider with an API key.
pub fn create_provider(config: &Config) -> Result<Box<dyn Provider>> {
    let defaults = &config.agents.defaults;

    let provider_name = defaults
        .provider
        .as_deref()
        .or_else(|| infer_provider_from_model(&defaults.model))
        .or_else(|| config.get_api_key().map(|(name, _)| name))
        .ok_or_else(|| {
            Error::Config(
                "No LLM provider configured. Set GROQ_API_KEY or add an API key to the config"
                    .to_string(),
            )
        })?;

    let provider_config = config.get_provider(provider_name).ok_or_else(|| {
        Error::Config(format!("Unknown provider '{}' in config", provider_name))
    })?;

    if provider_config.api_key.is_empty() {
        return Err(Error::Config(format!(
            "Provider '{}' has no API key configured",
            provider_name
        )));
    }

    let api_base = provider_config
        .api_base
        .as_deref()
        .or_else(|| default_api_base(provider_name));

    Ok(Box::new(OpenAIProvider::new(
        &provider_config.api_key,
        api_base,
        &defaults.model,
        defaults.max_tokens,
        defaults.temperature,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_provider_from_model() {
        assert_eq!(infer_provider_from_model("llama-3.1-8b-instant"), Some("groq"));
        assert_eq!(infer_provider_from_model("gpt-4o-mini"), Some("openai"));
        assert_eq!(infer_provider_from_model("deepseek-chat"), Some("deepseek"));
        assert_eq!(
            infer_provider_from_model("meta-llama/llama-3.1-8b-instruct"),
            Some("openrouter")
        );
        assert_eq!(infer_provider_from_model("unknown-model"), None);
    }

    #[test]
    fn test_default_api_base() {
        assert_eq!(default_api_base("groq"), Some("https://api.groq.com/openai/v1"));
        assert_eq!(default_api_base("nonexistent"), None);
    }

    #[test]
    fn test_create_provider_requires_key() {
        let config = Config::default();
        let err = create_provider(&config).err().unwrap();
        assert!(err.to_string().contains("no API key"));
    }

    #[test]
    fn test_create_provider_with_groq_key() {
        let mut config = Config::default();
        config
            .providers
            .get_mut("groq")
            .unwrap()
            .api_key = "gsk_test".to_string();
        assert!(create_provider(&config).is_ok());
    }

    #[test]
    fn test_explicit_provider_overrides_model_prefix() {
        let mut config = Config::default();
        // llama-* would infer groq, which has no key; the explicit setting wins.
        config.agents.defaults.provider = Some("openai".to_string());
        config
            .providers
            .get_mut("openai")
            .unwrap()
            .api_key = "sk_test".to_string();
        assert!(create_provider(&config).is_ok());

        // Without the explicit setting the same config fails on groq.
        config.agents.defaults.provider = None;
        let err = create_provider(&config).err().unwrap();
        assert!(err.to_string().contains("groq"));
    }

    #[test]
    fn test_unknown_model_falls_back_to_first_configured_key() {
        let mut config = Config::default();
        config.agents.defaults.model = "unknown-model".to_string();
        config
            .providers
            .get_mut("deepseek")
            .unwrap()
            .api_key = "ds_test".to_string();
        assert!(create_provider(&config).is_ok());
    }
}

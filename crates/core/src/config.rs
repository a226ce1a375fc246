use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;
use crate::paths::Paths;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_base: Option<String>,
}

/// How replies are produced for inbound messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResponderMode {
    /// In-process LLM agent with sales database tools.
    Builtin,
    /// External command receiving the message body as its sole argument.
    Command,
}

impl Default for ResponderMode {
    fn default() -> Self {
        ResponderMode::Builtin
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponderConfig {
    #[serde(default)]
    pub mode: ResponderMode,
    /// Interpreter to invoke in command mode (e.g. "python").
    #[serde(default = "default_responder_command")]
    pub command: String,
    /// Fixed arguments placed before the message body (e.g. ["-u", "agent.py"]).
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_responder_timeout")]
    pub timeout_secs: u32,
}

fn default_responder_command() -> String {
    "python".to_string()
}

fn default_responder_timeout() -> u32 {
    120
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            mode: ResponderMode::default(),
            command: default_responder_command(),
            args: Vec::new(),
            timeout_secs: default_responder_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDefaults {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: u32,
    #[serde(default = "default_llm_max_retries")]
    pub llm_max_retries: u32,
    #[serde(default = "default_llm_retry_delay_ms")]
    pub llm_retry_delay_ms: u64,
    /// Explicit LLM provider name. If unset, inferred from the model prefix
    /// or the first provider with a configured API key.
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub responder: ResponderConfig,
}

fn default_model() -> String {
    "llama-3.1-8b-instant".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tool_iterations() -> u32 {
    10
}

fn default_llm_max_retries() -> u32 {
    3
}

fn default_llm_retry_delay_ms() -> u64 {
    2000
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            max_tool_iterations: default_max_tool_iterations(),
            llm_max_retries: default_llm_max_retries(),
            llm_retry_delay_ms: default_llm_retry_delay_ms(),
            provider: None,
            responder: ResponderConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AgentsConfig {
    #[serde(default)]
    pub defaults: AgentDefaults,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhatsAppConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_whatsapp_bridge_url")]
    pub bridge_url: String,
    /// Allowlist of sender JIDs or bare phone numbers. Empty = allow all.
    #[serde(default)]
    pub allow_from: Vec<String>,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bridge_url: default_whatsapp_bridge_url(),
            allow_from: Vec::new(),
        }
    }
}

fn default_whatsapp_bridge_url() -> String {
    "ws://localhost:3001".to_string()
}

/// Evolution API channel configuration. Inbound messages arrive on a webhook
/// served by vendabot; outbound replies go through the Evolution REST API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvolutionConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_evolution_host")]
    pub host: String,
    #[serde(default = "default_evolution_port")]
    pub port: u16,
    #[serde(default = "default_evolution_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_evolution_instance")]
    pub instance: String,
    #[serde(default)]
    pub allow_from: Vec<String>,
}

fn default_evolution_host() -> String {
    "0.0.0.0".to_string()
}

fn default_evolution_port() -> u16 {
    8080
}

fn default_evolution_api_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_evolution_instance() -> String {
    "default".to_string()
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_evolution_host(),
            port: default_evolution_port(),
            api_url: default_evolution_api_url(),
            api_key: String::new(),
            instance: default_evolution_instance(),
            allow_from: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChannelsConfig {
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,
    #[serde(default)]
    pub evolution: EvolutionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SalesConfig {
    /// Override the sales database path. Defaults to ~/.vendabot/sales.db.
    #[serde(default)]
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ToolsConfig {
    #[serde(default)]
    pub sales: SalesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    #[serde(default)]
    pub agents: AgentsConfig,
    #[serde(default)]
    pub channels: ChannelsConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

impl Default for Config {
    fn default() -> Self {
        let mut providers = HashMap::new();
        providers.insert("groq".to_string(), ProviderConfig {
            api_key: String::new(),
            api_base: Some("https://api.groq.com/openai/v1".to_string()),
        });
        providers.insert("openai".to_string(), ProviderConfig::default());
        providers.insert("openrouter".to_string(), ProviderConfig {
            api_key: String::new(),
            api_base: Some("https://openrouter.ai/api/v1".to_string()),
        });
        providers.insert("deepseek".to_string(), ProviderConfig::default());

        Self {
            providers,
            agents: AgentsConfig::default(),
            channels: ChannelsConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = serde_json::from_str(&content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_or_default(paths: &Paths) -> Result<Self> {
        let config_path = paths.config_file();
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Environment variables win over the config file so API keys can stay
    /// out of it (".env" files are loaded by the binary before this runs).
    fn apply_env_overrides(&mut self) {
        let env_keys = [
            ("groq", "GROQ_API_KEY"),
            ("openai", "OPENAI_API_KEY"),
            ("openrouter", "OPENROUTER_API_KEY"),
            ("deepseek", "DEEPSEEK_API_KEY"),
        ];
        for (name, var) in env_keys {
            if let Ok(key) = std::env::var(var) {
                if !key.is_empty() {
                    self.providers.entry(name.to_string()).or_default().api_key = key;
                }
            }
        }
        if let Ok(key) = std::env::var("EVOLUTION_API_KEY") {
            if !key.is_empty() {
                self.channels.evolution.api_key = key;
            }
        }
        if let Ok(url) = std::env::var("EVOLUTION_API_URL") {
            if !url.is_empty() {
                self.channels.evolution.api_url = url;
            }
        }
    }

    pub fn get_provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }

    /// First provider with a usable API key, in a fixed priority order.
    pub fn get_api_key(&self) -> Option<(&str, &ProviderConfig)> {
        let priority = ["groq", "openai", "openrouter", "deepseek"];

        for name in priority {
            if let Some(provider) = self.providers.get(name) {
                if !provider.api_key.is_empty() {
                    return Some((name, provider));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_groq() {
        let cfg = Config::default();
        let groq = cfg.get_provider("groq").unwrap();
        assert_eq!(groq.api_base.as_deref(), Some("https://api.groq.com/openai/v1"));
        assert_eq!(cfg.agents.defaults.model, "llama-3.1-8b-instant");
    }

    #[test]
    fn test_camel_case_fields() {
        let raw = r#"{
  "agents": { "defaults": { "maxToolIterations": 5, "llmMaxRetries": 1 } },
  "channels": { "whatsapp": { "enabled": true, "bridgeUrl": "ws://bridge:3001", "allowFrom": ["5521980306189@c.us"] } }
}"#;
        let cfg: Config = serde_json::from_str(raw).unwrap();
        assert_eq!(cfg.agents.defaults.max_tool_iterations, 5);
        assert_eq!(cfg.agents.defaults.llm_max_retries, 1);
        assert!(cfg.channels.whatsapp.enabled);
        assert_eq!(cfg.channels.whatsapp.bridge_url, "ws://bridge:3001");
        assert_eq!(cfg.channels.whatsapp.allow_from.len(), 1);
    }

    #[test]
    fn test_responder_mode_snake_case() {
        let raw = r#"{
  "agents": { "defaults": { "responder": { "mode": "command", "command": "python", "args": ["-u", "ai_agent.py"] } } }
}"#;
        let cfg: Config = serde_json::from_str(raw).unwrap();
        let responder = &cfg.agents.defaults.responder;
        assert_eq!(responder.mode, ResponderMode::Command);
        assert_eq!(responder.args, vec!["-u", "ai_agent.py"]);
        assert_eq!(responder.timeout_secs, 120);
    }

    #[test]
    fn test_config_roundtrip() {
        let cfg = Config::default();
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("apiBase"));
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.agents.defaults.model, cfg.agents.defaults.model);
    }
}

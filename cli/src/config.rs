//! Configuration file loading.
//!
//! Every table is optional; a missing file means all defaults.
//!
//! ```toml
//! [provider]
//! kind = "azure"
//! base_url = "https://my-resource.openai.azure.com"
//! model = "gpt-4o"
//!
//! [build]
//! min_token_threshold = 5000
//!
//! [retrieval]
//! answer_temperature = 0.0
//!
//! [normalizer]
//! keywords = ["Step", "Stap", "Chapter"]
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use docindex_outline::{BuildOptions, MAX_DEPTH, NormalizerConfig};
use docindex_reasoning::{AuthStyle, OpenAIProvider, ReasoningProvider};
use docindex_retrieval::RetrievalConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// File name looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "docindex.toml";

/// Environment variables consulted for an API key, after `provider.api_key_env`.
pub const API_KEY_ENV_VARS: [&str; 3] = ["AZURE_OPENAI_API_KEY", "OPENAI_API_KEY", "CHATGPT_API_KEY"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderConfig,
    pub build: BuildOptions,
    pub retrieval: RetrievalConfig,
    pub normalizer: NormalizerConfig,
}

/// Which chat completion service to talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    Openai,
    Azure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub kind: ProviderKind,

    /// Service root. For Azure this is the resource endpoint; falls back to
    /// `AZURE_OPENAI_ENDPOINT`.
    pub base_url: Option<String>,

    /// Model (or Azure deployment) name. For Azure falls back to
    /// `AZURE_DEPLOYMENT_NAME`.
    pub model: Option<String>,

    /// Environment variable holding the API key, tried before the defaults.
    pub api_key_env: Option<String>,

    /// Per-request timeout.
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::Openai,
            base_url: None,
            model: None,
            api_key_env: None,
            timeout_secs: 120,
        }
    }
}

impl ProviderConfig {
    /// First non-empty API key from the configured or default variables.
    pub fn api_key(&self) -> Option<String> {
        self.api_key_env
            .iter()
            .map(String::as_str)
            .chain(API_KEY_ENV_VARS)
            .find_map(|name| std::env::var(name).ok().filter(|v| !v.trim().is_empty()))
    }

    fn base_url(&self) -> Result<Option<String>> {
        match self.kind {
            ProviderKind::Openai => Ok(self.base_url.clone()),
            ProviderKind::Azure => {
                let endpoint = self
                    .base_url
                    .clone()
                    .or_else(|| std::env::var("AZURE_OPENAI_ENDPOINT").ok())
                    .context("provider.base_url or AZURE_OPENAI_ENDPOINT is required for azure")?;
                Ok(Some(azure_v1_url(&endpoint)))
            }
        }
    }

    fn model(&self) -> Option<String> {
        self.model.clone().or_else(|| match self.kind {
            ProviderKind::Azure => std::env::var("AZURE_DEPLOYMENT_NAME").ok(),
            ProviderKind::Openai => None,
        })
    }

    /// Build the provider, or `None` when no API key is available.
    pub fn build_provider(&self) -> Result<Option<Arc<dyn ReasoningProvider>>> {
        let Some(api_key) = self.api_key() else {
            debug!("No API key found; reasoning provider disabled");
            return Ok(None);
        };

        let mut provider = OpenAIProvider::new()
            .with_api_key(api_key)
            .with_timeout(Duration::from_secs(self.timeout_secs))?;
        if let Some(url) = self.base_url()? {
            provider = provider.with_base_url(url);
        }
        if let Some(model) = self.model() {
            provider = provider.with_model(model);
        }
        if self.kind == ProviderKind::Azure {
            provider = provider.with_auth_style(AuthStyle::ApiKeyHeader);
        }

        info!(
            "Using {:?} provider with model {}",
            self.kind,
            provider.default_model()
        );
        Ok(Some(Arc::new(provider)))
    }
}

/// The OpenAI-compatible v1 root of an Azure OpenAI resource.
fn azure_v1_url(endpoint: &str) -> String {
    let endpoint = endpoint.trim_end_matches('/');
    if endpoint.ends_with("/openai/v1") {
        endpoint.to_string()
    } else {
        format!("{endpoint}/openai/v1")
    }
}

/// Read and validate a configuration file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    validate(&config)?;
    Ok(config)
}

/// Explicit path, else `./docindex.toml`, else the user config directory.
pub fn resolve_config(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        return load_config(path);
    }

    let candidates: Vec<PathBuf> = [
        Some(PathBuf::from(LOCAL_CONFIG_FILE)),
        dirs::config_dir().map(|d| d.join("docindex").join("config.toml")),
    ]
    .into_iter()
    .flatten()
    .collect();

    for path in candidates {
        if path.is_file() {
            info!("Loading configuration from {}", path.display());
            return load_config(&path);
        }
    }
    debug!("No configuration file found; using defaults");
    Ok(Config::default())
}

fn validate(config: &Config) -> Result<()> {
    if config.build.max_depth == 0 || config.build.max_depth > MAX_DEPTH {
        bail!("build.max_depth must be between 1 and {MAX_DEPTH}");
    }
    if config.build.min_token_threshold == Some(0) {
        bail!("build.min_token_threshold must be > 0 when set");
    }
    if !(0.0..=2.0).contains(&config.retrieval.answer_temperature) {
        bail!("retrieval.answer_temperature must be in [0.0, 2.0]");
    }
    if config
        .retrieval
        .selection_temperature
        .is_some_and(|t| !(0.0..=2.0).contains(&t))
    {
        bail!("retrieval.selection_temperature must be in [0.0, 2.0]");
    }
    if config.provider.timeout_secs == 0 {
        bail!("provider.timeout_secs must be > 0");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docindex.toml");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_empty_file_is_all_defaults() {
        let (_dir, path) = write("");
        assert_eq!(load_config(&path).unwrap(), Config::default());
    }

    #[test]
    fn test_tables_override_defaults() {
        let (_dir, path) = write(
            r#"
[provider]
kind = "azure"
base_url = "https://res.openai.azure.com/"
model = "gpt-4o"

[build]
add_node_text = false
min_token_threshold = 5000

[retrieval]
selection_temperature = 0.2

[normalizer]
keywords = ["Chapter"]
"#,
        );

        let config = load_config(&path).unwrap();
        assert_eq!(config.provider.kind, ProviderKind::Azure);
        assert_eq!(
            config.provider.base_url().unwrap().as_deref(),
            Some("https://res.openai.azure.com/openai/v1")
        );
        assert!(!config.build.add_node_text);
        assert_eq!(config.build.min_token_threshold, Some(5000));
        assert_eq!(config.retrieval.selection_temperature, Some(0.2));
        assert_eq!(config.retrieval.answer_temperature, 0.0);
        assert_eq!(config.normalizer.keywords, vec!["Chapter"]);
        assert_eq!(config.normalizer.default_max_len, 80);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let (_dir, path) = write("[build]\nmax_depth = 6\n");
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("max_depth"));

        let (_dir, path) = write("[retrieval]\nanswer_temperature = 3.5\n");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_unknown_provider_kind_fails_to_parse() {
        let (_dir, path) = write("[provider]\nkind = \"palm\"\n");
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn test_azure_url_is_not_doubled() {
        assert_eq!(
            azure_v1_url("https://res.openai.azure.com/openai/v1/"),
            "https://res.openai.azure.com/openai/v1"
        );
    }
}

//! Configuration loader with environment variable expansion
//!
//! Loads configuration from `.composer.toml` in the working directory or the
//! user config directory.

use super::types::{ComposerConfig, ProviderConfig};
use regex::Regex;
use std::path::{Path, PathBuf};

const ENV_PATTERN: &str = r"\$\{([^}]+)\}";

/// Configuration loading error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Load configuration from various sources
///
/// Priority order:
/// 1. Project-level `.composer.toml`
/// 2. User-level `~/.config/composer/config.toml`
/// 3. Default configuration
pub fn load_config(project_dir: &Path) -> Result<ComposerConfig, ConfigError> {
    let project_config = project_dir.join(".composer.toml");
    if project_config.exists() {
        return load_from_file(&project_config);
    }

    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            return load_from_file(&user_config);
        }
    }

    finish(ComposerConfig::default())
}

/// Get user config file path
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("composer").join("config.toml"))
}

/// Load configuration from a specific file
pub fn load_from_file(path: &Path) -> Result<ComposerConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: ComposerConfig = toml::from_str(&content)?;
    tracing::debug!("Loaded config from {}", path.display());
    finish(config)
}

fn finish(mut config: ComposerConfig) -> Result<ComposerConfig, ConfigError> {
    expand_env_vars(&mut config)?;
    let config = apply_env_overrides(config, |name| std::env::var(name).ok());
    validate(&config)?;
    Ok(config)
}

/// Expand ${VAR} patterns in string values
fn expand_env_vars(config: &mut ComposerConfig) -> Result<(), ConfigError> {
    let env_regex = Regex::new(ENV_PATTERN).map_err(|e| ConfigError::Invalid(e.to_string()))?;

    for provider in config.llm.providers.values_mut() {
        if let Some(ref api_key) = provider.api_key {
            provider.api_key = Some(expand_string(api_key, &env_regex));
        }
        if let Some(ref base_url) = provider.base_url {
            provider.base_url = Some(expand_string(base_url, &env_regex));
        }
    }

    let output_dir = config.build.output_dir.to_string_lossy().to_string();
    config.build.output_dir = PathBuf::from(expand_string(&output_dir, &env_regex));

    Ok(())
}

/// Expand environment variables in a single string
fn expand_string(s: &str, regex: &Regex) -> String {
    regex
        .replace_all(s, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
}

/// Apply environment variable overrides for common settings
///
/// Supports direct environment variables:
/// - DEEPSEEK_API_KEY -> deepseek.api_key
/// - OPENAI_API_KEY -> openai.api_key
/// - OLLAMA_BASE_URL -> ollama.base_url
/// - COMPOSER_PROVIDER / LLM_PROVIDER -> llm.default_provider
/// - COMPOSER_OUTPUT_DIR -> build.output_dir
fn apply_env_overrides(
    mut config: ComposerConfig,
    env: impl Fn(&str) -> Option<String>,
) -> ComposerConfig {
    let non_empty = |name: &str| env(name).filter(|v| !v.is_empty());

    for (var, provider_id) in [("DEEPSEEK_API_KEY", "deepseek"), ("OPENAI_API_KEY", "openai")] {
        if let Some(key) = non_empty(var) {
            let provider = config
                .llm
                .providers
                .entry(provider_id.to_string())
                .or_insert_with(ProviderConfig::default);
            provider.api_key = Some(key);
            provider.enabled = true;
        }
    }

    if let Some(url) = non_empty("OLLAMA_BASE_URL") {
        let provider = config
            .llm
            .providers
            .entry("ollama".to_string())
            .or_insert_with(ProviderConfig::default);
        provider.base_url = Some(url);
    }

    if let Some(provider) = non_empty("COMPOSER_PROVIDER").or_else(|| non_empty("LLM_PROVIDER")) {
        config.llm.default_provider = provider;
    }

    if let Some(dir) = non_empty("COMPOSER_OUTPUT_DIR") {
        config.build.output_dir = PathBuf::from(dir);
    }

    config
}

fn validate(config: &ComposerConfig) -> Result<(), ConfigError> {
    if config.build.max_attempts == 0 {
        return Err(ConfigError::Invalid(
            "build.max_attempts must be at least 1".to_string(),
        ));
    }
    if config.testing.timeout_secs == 0 {
        return Err(ConfigError::Invalid(
            "testing.timeout_secs must be at least 1".to_string(),
        ));
    }
    if config.testing.program.trim().is_empty() {
        return Err(ConfigError::Invalid("testing.program is empty".to_string()));
    }
    if config.build.artifact_file.contains(['/', '\\']) {
        return Err(ConfigError::Invalid(
            "build.artifact_file must be a plain file name".to_string(),
        ));
    }
    Ok(())
}

/// Create a sample configuration file content
pub fn sample_config() -> &'static str {
    r#"# Composer Configuration
# Place this file in your working directory as .composer.toml
# or in ~/.config/composer/config.toml for global settings

[llm]
# Default provider: deepseek, openai, ollama
default_provider = "deepseek"
timeout = 120
max_retries = 3

[llm.providers.deepseek]
api_key = "${DEEPSEEK_API_KEY}"
default_model = "deepseek-coder"

[llm.providers.ollama]
base_url = "http://localhost:11434"
default_model = "deepseek-coder"

[build]
output_dir = "services"
max_attempts = 5
error_context_window = 3
max_security_repairs = 2
check_ambiguity = true
artifact_file = "main.py"

[testing]
program = "pytest"
all_args = ["tests"]
component_args = ["tests", "-k", "{component}"]
timeout_secs = 120

[constraints]
banned_tech = ["COBOL", "VB6"]
preferred_cloud = "AWS"
"#
}

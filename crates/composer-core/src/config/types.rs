//! Configuration types for Composer
//!
//! Defines the structure of `.composer.toml` configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComposerConfig {
    /// LLM configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Build loop configuration
    #[serde(default)]
    pub build: BuildConfig,

    /// Test execution configuration
    #[serde(default)]
    pub testing: TestConfig,

    /// Banned constructs for generated code
    #[serde(default)]
    pub security: SecurityConfig,

    /// Constraints handed to the planner
    #[serde(default)]
    pub constraints: TechConstraints,
}

/// LLM configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Default provider to use (deepseek, openai, ollama)
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Maximum retries for failed requests
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Provider configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "deepseek".to_string()
}

fn default_timeout() -> u64 {
    120
}

fn default_max_retries() -> u32 {
    3
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            timeout: default_timeout(),
            max_retries: default_max_retries(),
            providers: default_providers(),
        }
    }
}

/// Individual provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Whether this provider is enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// API key (supports ${ENV_VAR} syntax)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL for the API
    #[serde(default)]
    pub base_url: Option<String>,

    /// Model used for completions
    #[serde(default)]
    pub default_model: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            base_url: None,
            default_model: None,
        }
    }
}

/// Create default provider configurations
fn default_providers() -> HashMap<String, ProviderConfig> {
    let mut providers = HashMap::new();

    providers.insert(
        "deepseek".to_string(),
        ProviderConfig {
            enabled: true,
            api_key: Some("${DEEPSEEK_API_KEY}".to_string()),
            base_url: None,
            default_model: Some("deepseek-coder".to_string()),
        },
    );

    providers.insert(
        "openai".to_string(),
        ProviderConfig {
            enabled: true,
            api_key: Some("${OPENAI_API_KEY}".to_string()),
            base_url: None,
            default_model: Some("gpt-4o".to_string()),
        },
    );

    // Local, no API key needed
    providers.insert(
        "ollama".to_string(),
        ProviderConfig {
            enabled: true,
            api_key: None,
            base_url: Some("http://localhost:11434".to_string()),
            default_model: Some("deepseek-coder".to_string()),
        },
    );

    providers
}

/// Build loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Directory that receives one sub-directory per project
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Attempts per component before the build fails
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Most recent error records fed back into code generation
    #[serde(default = "default_error_context_window")]
    pub error_context_window: usize,

    /// Security repairs tried inside one attempt before it counts as failed
    #[serde(default = "default_max_security_repairs")]
    pub max_security_repairs: u32,

    /// Ask the planner whether the requirement needs clarification first
    #[serde(default = "default_check_ambiguity")]
    pub check_ambiguity: bool,

    /// File name of each persisted artifact version
    #[serde(default = "default_artifact_file")]
    pub artifact_file: String,

    /// Directory for the file-backed knowledge base (disabled when unset)
    #[serde(default)]
    pub knowledge_dir: Option<PathBuf>,

    /// Style check: maximum line length before a warning
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("services")
}

fn default_max_attempts() -> u32 {
    5
}

fn default_error_context_window() -> usize {
    3
}

fn default_max_security_repairs() -> u32 {
    2
}

fn default_check_ambiguity() -> bool {
    true
}

fn default_artifact_file() -> String {
    "main.py".to_string()
}

fn default_max_line_length() -> usize {
    120
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            max_attempts: default_max_attempts(),
            error_context_window: default_error_context_window(),
            max_security_repairs: default_max_security_repairs(),
            check_ambiguity: default_check_ambiguity(),
            artifact_file: default_artifact_file(),
            knowledge_dir: None,
            max_line_length: default_max_line_length(),
        }
    }
}

/// Test execution configuration
///
/// `{component}` in `component_args` is replaced by the component name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestConfig {
    #[serde(default = "default_test_program")]
    pub program: String,

    #[serde(default = "default_all_args")]
    pub all_args: Vec<String>,

    #[serde(default = "default_component_args")]
    pub component_args: Vec<String>,

    /// Per-run timeout in seconds
    #[serde(default = "default_test_timeout")]
    pub timeout_secs: u64,
}

fn default_test_program() -> String {
    "pytest".to_string()
}

fn default_all_args() -> Vec<String> {
    vec!["tests".to_string()]
}

fn default_component_args() -> Vec<String> {
    vec!["tests".to_string(), "-k".to_string(), "{component}".to_string()]
}

fn default_test_timeout() -> u64 {
    120
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            program: default_test_program(),
            all_args: default_all_args(),
            component_args: default_component_args(),
            timeout_secs: default_test_timeout(),
        }
    }
}

/// A disallowed construct in generated code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BannedPattern {
    /// Regular expression matched against each line
    pub pattern: String,

    /// Issue text reported when the pattern matches
    pub description: String,
}

impl BannedPattern {
    pub fn new(pattern: &str, description: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            description: description.to_string(),
        }
    }
}

/// Security configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(default = "default_banned_patterns")]
    pub banned_patterns: Vec<BannedPattern>,
}

fn default_banned_patterns() -> Vec<BannedPattern> {
    vec![
        BannedPattern::new(r"\beval\s*\(", "Found eval(), which is potentially unsafe"),
        BannedPattern::new(r"\bexec\s*\(", "Found exec(), which is potentially unsafe"),
        BannedPattern::new(r"\bos\.system\s*\(", "Found os.system(), use subprocess without a shell"),
        BannedPattern::new(r"\bpickle\.loads?\s*\(", "Found pickle deserialization of untrusted data"),
        BannedPattern::new(r"__import__\s*\(", "Found dynamic __import__()"),
        BannedPattern::new(r"shell\s*=\s*True", "Found subprocess call with shell=True"),
    ]
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            banned_patterns: default_banned_patterns(),
        }
    }
}

/// Constraints the planner must respect
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechConstraints {
    /// Technologies a plan may not use (case-insensitive)
    #[serde(default = "default_banned_tech")]
    pub banned_tech: Vec<String>,

    #[serde(default = "default_preferred_cloud")]
    pub preferred_cloud: Option<String>,
}

fn default_banned_tech() -> Vec<String> {
    vec!["COBOL".to_string(), "VB6".to_string()]
}

fn default_preferred_cloud() -> Option<String> {
    Some("AWS".to_string())
}

impl Default for TechConstraints {
    fn default() -> Self {
        Self {
            banned_tech: default_banned_tech(),
            preferred_cloud: default_preferred_cloud(),
        }
    }
}

impl ComposerConfig {
    /// Get a provider config by name
    pub fn get_provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.llm.providers.get(name)
    }

    /// Get the default provider config
    pub fn default_provider_config(&self) -> Option<&ProviderConfig> {
        self.get_provider(&self.llm.default_provider)
    }
}

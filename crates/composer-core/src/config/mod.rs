//! Configuration module for Composer
//!
//! Handles loading and parsing of `.composer.toml` configuration files
//! with support for environment variable expansion. Configuration is passed
//! explicitly into the orchestrator and its collaborators.

mod loader;
mod types;

pub use loader::{load_config, load_from_file, sample_config, user_config_path, ConfigError};
pub use types::{
    BannedPattern, BuildConfig, ComposerConfig, LlmConfig, ProviderConfig, SecurityConfig,
    TechConstraints, TestConfig,
};

// Configuration management module
// TOML settings under the base directory plus the interactive editor

pub mod interactive;
pub mod settings;


pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    BASE_DIR_ENV, Config, ConfigError, EmbeddingConfig, EmbeddingProvider, OllamaConfig,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}

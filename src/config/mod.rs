// Configuration management module
// TOML settings stored in the data directory, plus the interactive setup flow


pub mod interactive;
pub mod settings;

pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    Config, ConfigError, MongoConfig, OllamaConfig, ServerConfig, TranslationConfig,
};

/// Resolve the data directory as an absolute path, falling back to `~/.book-recs`
#[inline]
pub fn resolve_data_dir(
    data_dir: Option<std::path::PathBuf>,
) -> Result<std::path::PathBuf, ConfigError> {
    let dir = data_dir.map_or_else(Config::default_dir, Ok)?;
    Ok(std::path::absolute(dir)?)
}

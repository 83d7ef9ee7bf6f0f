
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};
use std::path::Path;

use super::{Config, ConfigError, MongoConfig, OllamaConfig, TranslationConfig};

#[inline]
pub fn run_interactive_config(config_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 Book Recs Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(config_dir)?;

    eprintln!("{}", style("Ollama Configuration").bold().yellow());
    eprintln!("Configure the Ollama instance used to embed book texts.");
    eprintln!();

    configure_ollama(&mut config.ollama)?;

    eprintln!();
    eprintln!("{}", style("MongoDB Configuration").bold().yellow());
    eprintln!("Ratings and the catalog are stored in MongoDB.");
    eprintln!();

    configure_mongo(&mut config.mongo)?;

    eprintln!();
    eprintln!("{}", style("Translation Configuration").bold().yellow());
    eprintln!("Non-English descriptions are translated while cleaning the catalog.");
    eprintln!();

    configure_translation(&mut config.translation)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_http_service(&format!(
        "{}://{}:{}/api/version",
        config.ollama.protocol, config.ollama.host, config.ollama.port
    )) {
        eprintln!("{}", style("✓ Ollama connection successful!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not connect to Ollama").yellow()
        );
        eprintln!("You can continue, but make sure Ollama is running before building indexes.");
    }

    if config.translation.enabled {
        if test_http_service(&format!(
            "{}://{}:{}/languages",
            config.translation.protocol, config.translation.host, config.translation.port
        )) {
            eprintln!("{}", style("✓ Translation service reachable!").green());
        } else {
            eprintln!(
                "{}",
                style("⚠ Warning: Could not reach the translation service").yellow()
            );
            eprintln!("Descriptions will be kept untranslated when it is unavailable.");
        }
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Ollama Settings:").bold().yellow());
    match config.ollama_url() {
        Ok(url) => eprintln!("  Ollama URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  Ollama URL: {} ({})", style("Invalid").red(), e),
    }
    eprintln!("  Model: {}", style(&config.ollama.model).cyan());
    eprintln!("  Batch Size: {}", style(config.ollama.batch_size).cyan());
    eprintln!(
        "  Embedding Dimension: {}",
        style(config.ollama.embedding_dimension).cyan()
    );

    eprintln!();
    eprintln!("{}", style("MongoDB Settings:").bold().yellow());
    eprintln!("  URI: {}", style(redact_uri(&config.mongo.uri)).cyan());
    eprintln!("  Database: {}", style(&config.mongo.database).cyan());
    eprintln!(
        "  Collections: {} (ratings), {} (catalog)",
        style(&config.mongo.ratings_collection).cyan(),
        style(&config.mongo.catalog_collection).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Translation Settings:").bold().yellow());
    eprintln!("  Enabled: {}", style(config.translation.enabled).cyan());
    match config.translation_url() {
        Ok(url) => eprintln!("  Service URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  Service URL: {} ({})", style("Invalid").red(), e),
    }
    eprintln!(
        "  Target Language: {}",
        style(&config.translation.target_language).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Pipeline Settings:").bold().yellow());
    eprintln!("  Synthetic Users: {}", style(config.synthetic.num_users).cyan());
    eprintln!(
        "  Readers per Book: {} ± {}",
        style(config.synthetic.mean_readers).cyan(),
        style(config.synthetic.std_readers).cyan()
    );
    eprintln!(
        "  Neighbours: {} (collaborative), {} (content)",
        style(config.recommend.collab_neighbors).cyan(),
        style(config.recommend.content_neighbors).cyan()
    );
    eprintln!(
        "  Recommendations per Query: {}",
        style(config.recommend.count).cyan()
    );
    eprintln!(
        "  Web UI: {}",
        style(format!("http://{}:{}", config.server.host, config.server.port)).cyan()
    );

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config(config_dir: &Path) -> Result<Config> {
    Config::load(config_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            Ok(Config {
                base_dir: config_dir.to_path_buf(),
                ..Config::default()
            })
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

/// Hide the password component of a connection string
pub(crate) fn redact_uri(uri: &str) -> String {
    let Some((scheme, rest)) = uri.split_once("://") else {
        return uri.to_string();
    };
    match rest.split_once('@') {
        Some((credentials, host)) => {
            let user = credentials.split(':').next().unwrap_or_default();
            format!("{}://{}:****@{}", scheme, user, host)
        }
        None => uri.to_string(),
    }
}

fn configure_ollama(ollama: &mut OllamaConfig) -> Result<()> {
    let protocols = &["http", "https"];
    let default_index = protocols
        .iter()
        .position(|&p| p == ollama.protocol)
        .unwrap_or(0);

    let protocol_index = Select::new()
        .with_prompt("Ollama protocol")
        .default(default_index)
        .items(protocols)
        .interact()?;

    let protocol = protocols[protocol_index].to_string();

    let host: String = Input::new()
        .with_prompt("Ollama host")
        .default(ollama.host.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let temp_config = OllamaConfig {
                protocol: protocol.clone(),
                host: input.clone(),
                ..OllamaConfig::default()
            };
            temp_config.validate()?;
            Ok(())
        })
        .interact_text()?;

    let port: u16 = Input::new()
        .with_prompt("Ollama port")
        .default(ollama.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt("Embedding model")
        .default(ollama.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let dimension: u32 = Input::new()
        .with_prompt("Embedding dimension of the model")
        .default(ollama.embedding_dimension)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if (64..=4096).contains(input) {
                Ok(())
            } else {
                Err("Dimension must be between 64 and 4096")
            }
        })
        .interact_text()?;

    ollama.set_protocol(protocol)?;
    ollama.set_host(host)?;
    ollama.set_port(port)?;
    ollama.set_model(model)?;
    ollama.set_embedding_dimension(dimension)?;

    Ok(())
}

fn configure_mongo(mongo: &mut MongoConfig) -> Result<()> {
    let uri: String = Input::new()
        .with_prompt("MongoDB connection string")
        .default(mongo.uri.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.starts_with("mongodb://") || input.starts_with("mongodb+srv://") {
                Ok(())
            } else {
                Err("Connection string must start with mongodb:// or mongodb+srv://")
            }
        })
        .interact_text()?;

    let database: String = Input::new()
        .with_prompt("Database name")
        .default(mongo.database.clone())
        .interact_text()?;

    mongo.set_uri(uri)?;
    mongo.set_database(database)?;

    Ok(())
}

fn configure_translation(translation: &mut TranslationConfig) -> Result<()> {
    translation.enabled = Confirm::new()
        .with_prompt("Translate non-English descriptions?")
        .default(translation.enabled)
        .interact()?;

    if !translation.enabled {
        return Ok(());
    }

    translation.host = Input::new()
        .with_prompt("Translation service host")
        .default(translation.host.clone())
        .interact_text()?;

    translation.port = Input::new()
        .with_prompt("Translation service port")
        .default(translation.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    translation.validate()?;
    Ok(())
}

pub(crate) fn test_http_service(url: &str) -> bool {
    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(std::time::Duration::from_secs(5)))
        .build()
        .into();

    match agent.get(url).call() {
        Ok(_) => true,
        Err(ureq::Error::StatusCode(code)) if (400..500).contains(&code) => true,
        Err(_) => false,
    }
}

use book_recs::commands::{
    build_model, clean_catalog, generate_ratings, normalize_descriptions, recommend_for_user,
    recommend_similar, serve, show_status,
};
use book_recs::config::{Config, resolve_data_dir, run_interactive_config, show_config};
use book_recs::{RecsError, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "book-recs")]
#[command(about = "Book recommendations from synthetic reader histories and book descriptions")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml and the vector stores (default: ~/.book-recs)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure MongoDB, Ollama and translation settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Clean a raw book catalog CSV
    Clean {
        /// Raw catalog CSV
        input: PathBuf,
        /// Where to write the cleaned catalog
        output: PathBuf,
        /// Only read the first N rows
        #[arg(long)]
        rows: Option<usize>,
        /// Skip language detection and translation
        #[arg(long)]
        no_translate: bool,
    },
    /// Generate synthetic ratings and load them into MongoDB with the catalog
    Generate {
        /// Cleaned catalog CSV
        catalog: PathBuf,
        /// Number of catalog rows to use (default from config)
        #[arg(long)]
        rows: Option<usize>,
        /// Seed for reproducible ratings
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Translate and strip stop words from stored book descriptions
    Normalize,
    /// Embed reader histories and books into the vector stores
    Build {
        /// Seed for the train/validation split
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print recommendations
    Recommend {
        #[command(subcommand)]
        target: RecommendTarget,
    },
    /// Start the web UI
    Serve,
    /// Show the status of every backing service
    Status,
}

#[derive(Subcommand)]
enum RecommendTarget {
    /// Books liked by readers similar to this user
    User {
        /// Reader id
        id: u32,
    },
    /// Books similar to this title
    Title {
        /// Book title
        title: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let data_dir = resolve_data_dir(cli.data_dir).map_err(|e| RecsError::Config(e.to_string()))?;

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&data_dir)?;
            } else {
                run_interactive_config(&data_dir)?;
            }
        }
        Commands::Clean {
            input,
            output,
            rows,
            no_translate,
        } => {
            let config = Config::load(&data_dir)?;
            clean_catalog(&config, &input, &output, rows, !no_translate)?;
        }
        Commands::Generate {
            catalog,
            rows,
            seed,
        } => {
            let config = Config::load(&data_dir)?;
            generate_ratings(&config, &catalog, rows, seed).await?;
        }
        Commands::Normalize => {
            normalize_descriptions(&Config::load(&data_dir)?).await?;
        }
        Commands::Build { seed } => {
            build_model(&Config::load(&data_dir)?, seed).await?;
        }
        Commands::Recommend { target } => {
            let config = Config::load(&data_dir)?;
            match target {
                RecommendTarget::User { id } => recommend_for_user(&config, id).await?,
                RecommendTarget::Title { title } => recommend_similar(&config, &title).await?,
            }
        }
        Commands::Serve => {
            serve(&Config::load(&data_dir)?).await?;
        }
        Commands::Status => {
            show_status(&Config::load(&data_dir)?).await?;
        }
    }

    Ok(())
}

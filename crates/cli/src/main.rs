//! studybot CLI: the main entry point.
//!
//! Commands:
//! - `sync`        Bring course indexes in line with the corpus on disk
//! - `ask`         Ask a question (single message or interactive)
//! - `courses`     List configured courses and their index state
//! - `unanswered`  Show logged unanswerable questions
//! - `config`      Show, validate, or initialize configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "studybot",
    about = "studybot: answers study-program questions from curated course documents",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config.toml (default: ~/.studybot/config.toml)
    #[arg(long, global = true, env = "STUDYBOT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Synchronize course indexes with their documents
    Sync {
        /// Only this course (default: all configured courses)
        #[arg(short, long)]
        course: Option<String>,

        /// Discard the existing index and rebuild from scratch
        #[arg(long)]
        rebuild: bool,
    },

    /// Ask a question about a course
    Ask {
        /// Course code, e.g. `wi`
        #[arg(short, long)]
        course: String,

        /// Ask a single question instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// List configured courses
    Courses,

    /// Show questions the assistant could not answer
    Unanswered {
        /// Only this course
        #[arg(short, long)]
        course: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Validate the configuration file
    Validate,
    /// Print the config file path
    Path,
    /// Write a default config file if none exists
    Init,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Sync { course, rebuild } => {
            commands::sync::run(config_path, course.as_deref(), rebuild).await?
        }
        Commands::Ask {
            course,
            message,
            json,
        } => commands::ask::run(config_path, &course, message, json).await?,
        Commands::Courses => commands::courses::run(config_path).await?,
        Commands::Unanswered { course } => {
            commands::unanswered::run(config_path, course.as_deref()).await?
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show(config_path).await?,
            ConfigAction::Validate => commands::config_cmd::validate(config_path).await?,
            ConfigAction::Path => commands::config_cmd::path(config_path).await?,
            ConfigAction::Init => commands::config_cmd::init(config_path).await?,
        },
    }

    Ok(())
}

use std::path::PathBuf;

use anyhow::Context;
use bookshelf::Application;
use bookshelf_kernel::settings::Settings;
use clap::{Parser, Subcommand};

/// Operator tooling for the bookshelf service.
#[derive(Parser, Debug)]
#[command(name = "bookshelf-cli", version, about)]
struct Cli {
    /// Directory holding `base.toml` and `{env}.toml`
    #[arg(long, global = true, env = "BOOKSHELF_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Deployment environment: local, staging or production
    #[arg(long, global = true, env = "BOOKSHELF_ENV", default_value = "local")]
    env: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
    /// Print the merged OpenAPI document
    Openapi,
    /// Print the resolved configuration
    CheckConfig,
}

impl Cli {
    fn settings(&self) -> anyhow::Result<Settings> {
        let config_dir = match &self.config_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()
                .context("unable to resolve current directory")?
                .join("config"),
        };
        Settings::load_from(&config_dir, &self.env)
            .with_context(|| format!("failed to load settings from {}", config_dir.display()))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Allow missing `.env` files without failing.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    match &cli.command {
        Command::Serve => {
            let settings = cli.settings()?;
            bookshelf_telemetry::init(&settings.telemetry)?;
            Application::bootstrap(settings).await?.serve().await
        }
        Command::Migrate => {
            let settings = cli.settings()?;
            bookshelf_telemetry::init(&settings.telemetry)?;
            let applied = bookshelf::app::migrate(&settings).await?;
            tracing::info!(applied, "migrations complete");
            println!("applied {applied} migration(s)");
            Ok(())
        }
        Command::Openapi => {
            let registry = bookshelf::app::registry()?;
            let spec = bookshelf_http::openapi_document(&registry);
            println!("{}", serde_json::to_string_pretty(&spec)?);
            Ok(())
        }
        Command::CheckConfig => {
            let settings = cli.settings()?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
            Ok(())
        }
    }
}

mod commands;
mod config;
mod utils;

use clap::{Parser, Subcommand};
use commands::{ApplyArgs, OutputFormat, handle_apply, handle_list};
use jailtab_middleware::{METHOD_ENV, MidcltClient, Middleware, MiddlewareMethod, RestClient};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jailtab")]
#[command(about = "jailtab - declaratively manage the fstab of a TrueNAS jail")]
struct Cli {
    /// How to reach the middleware: midclt or rest
    #[arg(long, global = true, env = METHOD_ENV, default_value = "midclt")]
    method: MiddlewareMethod,

    /// Base URL of the NAS, for the rest method
    #[arg(long, global = true, env = "TRUENAS_URL")]
    url: Option<String>,

    /// API key, for the rest method
    #[arg(long, global = true, env = "TRUENAS_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bring the jail's fstab in line with the desired mount points
    Apply(ApplyArgs),
    /// Show what apply would change, without changing anything
    Plan(ApplyArgs),
    /// List the jail's current fstab entries
    List {
        /// Name of the jail
        jail: String,
    },
}

fn connect(cli: &Cli) -> Result<Arc<dyn Middleware>, Box<dyn std::error::Error>> {
    tracing::debug!("Using middleware method {}", cli.method);

    match cli.method {
        MiddlewareMethod::Midclt => Ok(Arc::new(MidcltClient::new())),
        MiddlewareMethod::Rest => {
            let url = cli
                .url
                .as_deref()
                .ok_or("The rest method needs --url or TRUENAS_URL")?;
            Ok(Arc::new(RestClient::new(url, cli.api_key.as_deref())?))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let middleware = connect(&cli)?;

    match cli.command {
        Commands::Apply(args) => {
            handle_apply(middleware, args, false, cli.output).await?;
        }
        Commands::Plan(args) => {
            handle_apply(middleware, args, true, cli.output).await?;
        }
        Commands::List { jail } => {
            handle_list(middleware.as_ref(), &jail, cli.output).await?;
        }
    }

    Ok(())
}

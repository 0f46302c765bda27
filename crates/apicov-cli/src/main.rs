use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::WrapErr;

use apicov_core::{Catalog, Config};

mod cluster;
mod collect;
mod logging;
mod serve;

#[derive(Parser)]
#[command(name = "apicov")]
#[command(about = "Kubernetes API type coverage from admission traffic", long_about = None)]
struct Cli {
    /// Config file to use instead of the default locations
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the admission webhook and the coverage query API
    Serve {
        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
        /// Register the webhook with the cluster after startup (needs TLS configured)
        #[arg(long)]
        register: bool,
    },
    /// Fetch coverage from a running webhook and write report artifacts
    Collect {
        /// Write a zero-coverage JUnit report without contacting the webhook
        #[arg(long)]
        build_failed: bool,
        /// Query API base URI; discovered through the cluster when omitted
        #[arg(long)]
        webhook_uri: Option<String>,
        /// Directory for report artifacts
        #[arg(long)]
        artifacts_dir: Option<String>,
    },
    /// List the registered resource kinds
    Kinds,
    /// Print the default configuration
    DefaultConfig,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let mut config = Config::load_from(cli.config.as_deref()).wrap_err("loading configuration")?;
    logging::init(&config.logging)?;

    match cli.command {
        Commands::Serve { port, register } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            serve::run(config, register).await?;
        }
        Commands::Collect {
            build_failed,
            webhook_uri,
            artifacts_dir,
        } => {
            if webhook_uri.is_some() {
                config.client.webhook_uri = webhook_uri;
            }
            if let Some(dir) = artifacts_dir {
                config.client.artifacts_dir = dir;
            }
            collect::run(&config, build_failed).await?;
        }
        Commands::Kinds => {
            let catalog = Catalog::load(config.coverage.catalog_path().as_deref())?;
            for key in catalog.keys() {
                println!("{}", key);
            }
        }
        Commands::DefaultConfig => {
            print!("{}", Config::default_config_string());
        }
    }

    Ok(())
}

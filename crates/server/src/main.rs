//! HostLock - access-decision server

use clap::{Parser, Subcommand};
use hostlock_server::commands;
use hostlock_store::Store;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "hostlock")]
#[command(about = "HostLock - fob and face access control for rental properties", long_about = None)]
struct Cli {
    /// Config file (TOML); HOSTLOCK_* variables override it
    #[arg(short, long, env = "HOSTLOCK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the decision pipeline and HTTP surface
    Serve,

    /// Load properties, persons, reservations and fob assignments
    Seed {
        /// Registry file (TOML)
        file: PathBuf,
    },

    /// Show access history
    Logs {
        /// Only this reservation
        #[arg(long)]
        reservation: Option<i64>,
        #[arg(long, default_value = "20")]
        limit: u32,
    },

    /// Show tamper alerts
    Alerts {
        /// Only properties owned by this host
        #[arg(long)]
        host: Option<i64>,
        #[arg(long, default_value = "20")]
        limit: u32,
    },

    /// Mark a tamper alert resolved
    ResolveAlert {
        tamper_id: String,
        /// Host performing the resolution
        #[arg(long)]
        host: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hostlock=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = commands::load_config(cli.config.as_deref())?;

    if let Commands::Serve = cli.command {
        return commands::serve(config).await;
    }

    let store = Store::connect(&config.storage.database_url).await?;

    match cli.command {
        Commands::Serve => {}
        Commands::Seed { file } => commands::seed(&store, &file).await?,
        Commands::Logs { reservation, limit } => commands::logs(&store, reservation, limit).await?,
        Commands::Alerts { host, limit } => commands::alerts(&store, host, limit).await?,
        Commands::ResolveAlert { tamper_id, host } => {
            commands::resolve_alert(&store, &tamper_id, host).await?
        }
    }

    store.close().await;
    Ok(())
}

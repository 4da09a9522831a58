use crate::{
    error::CliError,
    shutdown::{ExitCode, ShutdownCoordinator},
};
use clap::Parser;
use commands::Commands;
use connectors::adapter::Adapter;
use engine_config::settings::ScanConfig;
use engine_core::state::{OffsetStore, sled_store::SledOffsetStore};
use model::offset::{OffsetType, resolve};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod output;
mod scan;
mod shutdown;

#[derive(Parser)]
#[command(
    name = "tablescan",
    version = "0.1.0",
    about = "Incremental table reader"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    // Logs go to stderr; stdout carries row output
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let shutdown = ShutdownCoordinator::new(CancellationToken::new());
    shutdown.register_handlers();

    let code = match run(cli.command, &shutdown).await {
        Ok(()) if shutdown.is_shutdown_requested() => ExitCode::ShutdownRequested,
        Ok(()) => ExitCode::Success,
        Err(err) => {
            error!("{err}");
            ExitCode::GeneralError
        }
    };
    std::process::exit(code.as_i32());
}

async fn run(command: Commands, shutdown: &ShutdownCoordinator) -> Result<(), CliError> {
    match command {
        Commands::Scan {
            config,
            table,
            once,
        } => scan::run(&config, table.as_deref(), once, shutdown.cancel_token()).await?,
        Commands::Resolve { offset_type, value } => {
            let offset_type: OffsetType = offset_type.parse()?;
            let token = resolve(offset_type, &value)?;
            println!("{token}");
        }
        Commands::Offsets { config, json } => {
            let store = open_store(&config)?;
            let offsets = store.list().await?;
            output::print_offsets(&offsets, json)?;
        }
        Commands::Reset { config, table } => {
            let settings = ScanConfig::from_file(&config)?;
            let table = settings.table(&table)?;
            let store = SledOffsetStore::open(&settings.scan.state_path)?;
            if store
                .delete(&table.table_ref(), &table.offset_column)
                .await?
            {
                info!(table = %table.name, column = %table.offset_column, "Stored offset removed");
            } else {
                info!(table = %table.name, column = %table.offset_column, "No stored offset to remove");
            }
        }
        Commands::TestConn { url } => {
            let adapter = Adapter::connect(&url).await?;
            let sql = adapter.get_sql();
            sql.ping().await?;
            println!("Connection OK ({})", sql.kind());
        }
    }

    Ok(())
}

fn open_store(config_path: &str) -> Result<SledOffsetStore, CliError> {
    let config = ScanConfig::from_file(config_path)?;
    Ok(SledOffsetStore::open(&config.scan.state_path)?)
}

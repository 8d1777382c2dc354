//! Arweave indexer node entry point.

use arweave_indexer::utils::logging::{self, LogLevel};
use arweave_indexer::{Database, DatabaseClient, Module, Result, Server};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Parser)]
#[command(name = "arweave-indexer", about = "Index publishing-platform activity from Arweave")]
struct Args {
    /// Path to the module configuration file.
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let module = Module::from_yaml_file(&args.config)?;
    module.validate()?;

    let database_url = std::env::var("DATABASE_URL")?;
    let database = Arc::new(Database::new(&database_url).await?);
    database.initialize().await?;
    logging::log(LogLevel::Success, "database schema initialized");

    let server = Server::new(module, database).await?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                logging::log(LogLevel::Warning, "interrupt received, shutting down");
                cancel.cancel();
            }
        });
    }

    server.run(cancel).await
}

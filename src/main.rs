//! # An Implementation of a Redis Server

use clap::Parser;
use log::info;
use mini_redis_server::cli::Args;
use mini_redis_server::constants::ExitCode;
use mini_redis_server::errors::ApplicationError;
use mini_redis_server::expiry::sweep_loop;
use mini_redis_server::log_and_stderr;
use mini_redis_server::server::Server;
use mini_redis_server::storage::Store;
use std::process::exit;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), ApplicationError> {
    env_logger::init();
    info!("Starting the server...");

    let args = Args::parse();
    let store = Store::new();

    let sweeper_store = store.clone();
    let sweep_interval = Duration::from_millis(args.sweep_interval_ms);
    tokio::spawn(async move {
        sweep_loop(sweeper_store, sweep_interval).await;
    });

    let server = match Server::new(&args, store).await {
        Ok(server) => server,
        Err(e) => {
            log_and_stderr!(error, "Failed to bind the server:", e);
            exit(ExitCode::BindFailure as i32);
        }
    };

    server.start().await?;

    Ok(())
}

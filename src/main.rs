//! EmberKV server entry point.
//!
//! Parses startup options, opens the configuration (validating the
//! snapshot header), builds the shared store, starts the expiry sweeper
//! and runs the accept loop until Ctrl+C.

use emberkv::commands::CommandHandler;
use emberkv::config::{ConfigStore, OptionsAction, ServerOptions};
use emberkv::connection::{handle_connection, ConnectionStats};
use emberkv::storage::{start_expiry_sweeper, StorageEngine};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn print_help() {
    println!(
        r#"
EmberKV - A Single-Node In-Memory Key-Value Server

USAGE:
    emberkv [OPTIONS]

OPTIONS:
    -h, --host <HOST>          Host to bind to (default: 127.0.0.1)
    -p, --port <PORT>          Port to listen on (default: 6379)
        --dir <PATH>           Snapshot directory (default: /tmp/redis-files)
        --dbfilename <NAME>    Snapshot file name (default: dump.rdb)
    -v, --version              Print version information
        --help                 Print this help message

CONNECTING:
    $ redis-cli -p 6379
    127.0.0.1:6379> SET greeting hello PX 5000
    OK
    127.0.0.1:6379> GET greeting
    "hello"
"#
    );
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let options = match ServerOptions::parse(std::env::args().skip(1))? {
        OptionsAction::Run(options) => options,
        OptionsAction::Help => {
            print_help();
            return Ok(());
        }
        OptionsAction::Version => {
            println!("EmberKV version {}", emberkv::VERSION);
            return Ok(());
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!(version = emberkv::VERSION, "Starting EmberKV");

    // An invalid snapshot header aborts startup.
    let config = Arc::new(ConfigStore::from_options(&options)?);

    // One store for the whole process, shared by every connection.
    let storage = Arc::new(StorageEngine::new());
    let _sweeper = start_expiry_sweeper(Arc::clone(&storage));

    let handler = CommandHandler::new(storage, config);
    let stats = Arc::new(ConnectionStats::new());

    let listener = TcpListener::bind(options.bind_address()).await?;
    info!("Listening on {}", options.bind_address());

    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received, stopping server...");
    };

    tokio::select! {
        _ = accept_loop(listener, handler, stats) => {}
        _ = shutdown => {}
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Main loop that accepts incoming connections
async fn accept_loop(listener: TcpListener, handler: CommandHandler, stats: Arc<ConnectionStats>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                tokio::spawn(handle_connection(
                    stream,
                    addr,
                    handler.clone(),
                    Arc::clone(&stats),
                ));
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}

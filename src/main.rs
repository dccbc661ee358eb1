//! `wirecall` server binary.
//!
//! Serves the built-in sample functions on the port given on the command
//! line until interrupted with Ctrl+C.

mod cli;

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use wirecall::{builtins::register_builtins, server::RpcServer};

#[tokio::main]
async fn main() -> ExitCode {
    // Applications embedding the library should install their own subscriber.
    tracing_subscriber::fmt::init();

    let cli = cli::Cli::parse();
    let server = RpcServer::new(cli.port);
    if let Err(e) = register_builtins(&server) {
        error!(error = %e, "failed to register built-in functions");
        return ExitCode::FAILURE;
    }

    let handle = server.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            return;
        }
        info!("interrupt received; shutting down");
        handle.stop().await;
    });

    match server.start().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "server failed");
            ExitCode::FAILURE
        }
    }
}

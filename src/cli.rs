//! Command line interface for the `wirecall` server binary.

use clap::Parser;

/// Command line arguments for the `wirecall` binary.
#[derive(Debug, Parser)]
#[command(
    name = "wirecall",
    version,
    about = "Serve length-prefixed JSON remote procedure calls over TCP"
)]
pub struct Cli {
    /// TCP port to listen on (1-65535).
    #[arg(value_parser = clap::value_parser!(u16).range(1..))]
    pub port: u16,
}

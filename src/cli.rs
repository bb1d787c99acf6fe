//! # The Command-Line Arguments

use crate::constants::{DEFAULT_MAX_CONNECTIONS, DEFAULT_PORT, DEFAULT_SWEEP_INTERVAL_MS};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "Redis Server")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// The server port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Maximum number of simultaneously-handled connections
    #[arg(long, default_value_t = DEFAULT_MAX_CONNECTIONS)]
    pub max_conn: usize,

    /// Expiry sweeper tick period, in milliseconds
    #[arg(long, default_value_t = DEFAULT_SWEEP_INTERVAL_MS)]
    pub sweep_interval_ms: u64,
}

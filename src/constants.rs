//! # Constants
//!
//! Constants and types used throughout the application

/// Default listen address. `0.0.0.0` so the server accepts connections on any interface.
pub const LOCAL_SOCKET_ADDR_STR: &str = "0.0.0.0";

/// Default listen port. The conventional Redis port.
pub const DEFAULT_PORT: u16 = 6379;

/// Default cap on simultaneously-handled connections.
pub const DEFAULT_MAX_CONNECTIONS: usize = 1024;

/// How long `acquire_socket_permit` will wait for a free connection slot before giving up.
pub const CONNECTION_PERMIT_TIMEOUT_MS: u64 = 5_000;

/// Size of the per-connection read chunk.
pub const BUFFER_LEN: usize = 4096;

/// Sweeper tick period.
pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 100;

/// Maximum number of keys the sweeper samples per tick.
pub const SWEEP_SAMPLE_SIZE: usize = 20;

/// If more than this fraction of a sample is expired, the sweeper repeats immediately.
pub const SWEEP_REPEAT_THRESHOLD: f64 = 0.25;

/// Application exit codes
#[derive(Debug)]
pub enum ExitCode {
    Ok = 0,
    BindFailure = 1,
    Shutdown = -1,
}

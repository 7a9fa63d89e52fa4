//! Error types for the fan control daemon

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for the fan control daemon
pub type Result<T> = std::result::Result<T, FanControlError>;

/// Main error type for the fan control daemon
#[derive(Error, Debug)]
pub enum FanControlError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("system call failed: {0}")]
    Sys(#[from] nix::errno::Errno),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("fan control interface not found at {}", .path.display())]
    ControlUnavailable { path: PathBuf },

    #[error("pid file {} already exists, another instance may be running", .path.display())]
    AlreadyRunning { path: PathBuf },

    #[error("daemon not running")]
    DaemonNotRunning,

    #[error("invalid pid file {}: {reason}", .path.display())]
    InvalidPidFile { path: PathBuf, reason: String },
}

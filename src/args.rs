//! Command line argument parsing for the fan control daemon

use std::path::PathBuf;

use clap::Parser;

/// Default pid marker location for daemon mode
pub const DEFAULT_PID_FILE: &str = "/var/run/tp-fancontrold.pid";

/// Dynamic fan control for ThinkPad laptops
///
/// Overrides the embedded controller's automatic fan behavior with a
/// multi-sensor, hysteresis-based control loop.
#[derive(Parser, Debug)]
#[command(name = "tp-fancontrold")]
#[command(about = "Dynamic fan control for ThinkPad laptops")]
#[command(version)]
pub struct Args {
    /// Shift every minimum temperature threshold by N degrees
    /// (positive for quieter, negative for cooler)
    #[arg(short = 's', long, value_name = "N", default_value_t = 0, allow_negative_numbers = true)]
    pub shift_min: i32,

    /// Shift every maximum temperature threshold by N degrees. DANGEROUS
    #[arg(short = 'S', long, value_name = "N", default_value_t = 0, allow_negative_numbers = true)]
    pub shift_max: i32,

    /// Dry run: print fan commands instead of writing them
    #[arg(short = 't', long = "test")]
    pub dry_run: bool,

    /// Suppress console output
    #[arg(short, long)]
    pub quiet: bool,

    /// Run as a background daemon (implies --quiet)
    #[arg(short, long)]
    pub daemon: bool,

    /// Log to syslog as well
    #[arg(short = 'l', long)]
    pub syslog: bool,

    /// Terminate an already-running daemon
    #[arg(short, long)]
    pub kill: bool,

    /// Tell an already-running daemon that the system is being suspended
    #[arg(short = 'u', long)]
    pub suspend: bool,

    /// Pid file location for daemon mode
    #[arg(short, long, value_name = "PATH", default_value = DEFAULT_PID_FILE)]
    pub pid_file: PathBuf,

    /// Increase verbosity (can be used multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

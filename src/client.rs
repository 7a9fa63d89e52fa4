//! Signalling an already-running daemon instance.
//!
//! The daemon records its pid in the marker file; the CLI locates it there
//! and delivers plain process signals. The daemon consumes them between
//! control ticks.

use std::path::Path;

use log::info;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

use crate::errors::Result;
use crate::pidfile;

/// Ask the instance recorded in the pid file to terminate.
pub fn kill_daemon(pid_file: &Path) -> Result<()> {
    signal_daemon(pid_file, Signal::SIGINT)
}

/// Tell the instance recorded in the pid file that the system is being
/// suspended.
pub fn suspend_daemon(pid_file: &Path) -> Result<()> {
    signal_daemon(pid_file, Signal::SIGUSR1)
}

fn signal_daemon(pid_file: &Path, signal: Signal) -> Result<()> {
    let pid = pidfile::read(pid_file)?;
    info!("sending {} to pid {}", signal, pid);
    kill(Pid::from_raw(pid), signal)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FanControlError;

    #[test]
    fn signalling_without_a_pid_file_reports_not_running() {
        let path = std::env::temp_dir().join("tp-fancontrol-client-none");
        assert!(matches!(
            kill_daemon(&path),
            Err(FanControlError::DaemonNotRunning)
        ));
        assert!(matches!(
            suspend_daemon(&path),
            Err(FanControlError::DaemonNotRunning)
        ));
    }
}

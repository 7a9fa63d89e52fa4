//! Pid marker handling for daemon mode.

use std::fs;
use std::path::Path;

use log::warn;

use crate::errors::{FanControlError, Result};

/// Record `pid` in the marker file. Refuses to overwrite an existing marker.
pub fn create(path: &Path, pid: i32) -> Result<()> {
    if path.exists() {
        return Err(FanControlError::AlreadyRunning {
            path: path.to_path_buf(),
        });
    }
    fs::write(path, pid.to_string())?;
    Ok(())
}

/// Read the recorded pid of a running instance.
pub fn read(path: &Path) -> Result<i32> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(FanControlError::DaemonNotRunning);
        }
        Err(err) => return Err(err.into()),
    };
    contents
        .trim()
        .parse()
        .map_err(|_| FanControlError::InvalidPidFile {
            path: path.to_path_buf(),
            reason: format!("not a pid: {:?}", contents.trim()),
        })
}

/// Remove the marker. Failures are logged, not propagated; removal runs
/// during shutdown.
pub fn remove(path: &Path) {
    if let Err(err) = fs::remove_file(path) {
        if err.kind() != std::io::ErrorKind::NotFound {
            warn!("could not remove pid file {}: {}", path.display(), err);
        }
    }
}

pub fn exists(path: &Path) -> bool {
    path.exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("tp-fancontrol-{}-{}", name, std::process::id()))
    }

    #[test]
    fn pid_round_trip() {
        let path = scratch("pid");
        create(&path, 4242).unwrap();
        assert_eq!(read(&path).unwrap(), 4242);
        remove(&path);
        assert!(!exists(&path));
    }

    #[test]
    fn create_refuses_an_existing_marker() {
        let path = scratch("dup");
        create(&path, 1).unwrap();
        assert!(matches!(
            create(&path, 2),
            Err(FanControlError::AlreadyRunning { .. })
        ));
        remove(&path);
    }

    #[test]
    fn missing_marker_reads_as_daemon_not_running() {
        let path = scratch("missing");
        assert!(matches!(read(&path), Err(FanControlError::DaemonNotRunning)));
    }

    #[test]
    fn garbage_marker_is_rejected() {
        let path = scratch("garbage");
        fs::write(&path, "not-a-pid\n").unwrap();
        assert!(matches!(
            read(&path),
            Err(FanControlError::InvalidPidFile { .. })
        ));
        remove(&path);
    }
}

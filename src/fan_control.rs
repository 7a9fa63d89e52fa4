//! EC fan command channel.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use log::debug;

use crate::errors::{FanControlError, Result};

/// ThinkPad ACPI fan control pseudo-file.
const FAN_CONTROL_PATH: &str = "/proc/acpi/ibm/fan";

/// Writes short text commands to the EC fan interface. In dry-run mode the
/// commands are printed instead of written, and the interface need not
/// exist.
#[derive(Debug, Clone)]
pub struct FanControl {
    control_path: PathBuf,
    dry_run: bool,
}

impl FanControl {
    pub fn new(dry_run: bool) -> Result<Self> {
        Self::with_path(PathBuf::from(FAN_CONTROL_PATH), dry_run)
    }

    fn with_path(control_path: PathBuf, dry_run: bool) -> Result<Self> {
        if !dry_run && !control_path.exists() {
            return Err(FanControlError::ControlUnavailable { path: control_path });
        }
        Ok(Self {
            control_path,
            dry_run,
        })
    }

    /// Select a fan level.
    pub fn set_level(&self, level: u8) -> Result<()> {
        self.send_command(&format!("level {}", level))
    }

    /// Arm the EC watchdog: fan control reverts to firmware unless another
    /// fan command arrives within the timeout.
    pub fn arm_watchdog(&self, seconds: u32) -> Result<()> {
        self.send_command(&format!("watchdog {}", seconds))
    }

    pub fn disable_watchdog(&self) -> Result<()> {
        self.send_command("watchdog 0")
    }

    /// Hand fan control back to the firmware.
    pub fn restore_automatic(&self) -> Result<()> {
        self.send_command("enable")
    }

    fn send_command(&self, command: &str) -> Result<()> {
        if self.dry_run {
            println!("fan command: {}", command);
            return Ok(());
        }
        debug!("fan command: {}", command);
        let mut device = OpenOptions::new().write(true).open(&self.control_path)?;
        device.write_all(command.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_control_file_is_fatal_unless_dry_run() {
        let path = std::env::temp_dir().join("tp-fancontrol-no-such-fan");
        assert!(FanControl::with_path(path.clone(), false).is_err());

        let fan = FanControl::with_path(path, true).unwrap();
        fan.set_level(0).unwrap();
        fan.arm_watchdog(9).unwrap();
        fan.restore_automatic().unwrap();
    }

    #[test]
    fn commands_are_written_to_the_control_file() {
        let path = std::env::temp_dir().join(format!("tp-fancontrol-fan-{}", std::process::id()));
        std::fs::write(&path, "").unwrap();

        let fan = FanControl::with_path(path.clone(), false).unwrap();
        fan.set_level(7).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "level 7");
        fan.arm_watchdog(9).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "watchdog 9");

        std::fs::remove_file(&path).unwrap();
    }
}

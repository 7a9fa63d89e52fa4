//! Disk temperature via the legacy Hitachi vendor command.
//!
//! Only a fixed family of Hitachi/IBM 2.5" drives answers the vendor read,
//! so the drive model string is checked against an allow-list before any
//! command is issued. The whole probe is expensive and runs on a slow
//! cadence; the caller reuses the returned value between probes.

use std::fs;
use std::fs::OpenOptions;
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use log::debug;
use nix::libc;

use crate::engine::UNAVAILABLE;

/// Drive models known to answer the vendor temperature read. `.` matches any
/// single character; matching is strict same-length.
const SUPPORTED_MODELS: &[&str] = &[
    "HTS4212..H9AT00",
    "HTS726060M9AT00",
    "HTS5410..G9AT00",
    "IC25N0..ATCS04",
    "IC25N0..ATCS05",
    "IC25T0..ATCS04",
    "IC25T0..ATCS05",
    "HTE541040G9AT00",
    "HTS5416..J9AT00",
    "HTS5416..J9SA00",
    "HTS54161",
];

/// Block devices probed for a supported drive, in order.
const CANDIDATE_DEVICES: &[&str] = &["hda", "sda"];

// Drive command block: [command, sector number, feature, sector count] on
// the way in; the temperature comes back in byte 2.
nix::ioctl_readwrite_bad!(hdio_drive_cmd, 0x031f, [u8; 4]);

const TEMP_READ_CMD: [u8; 4] = [0xf0, 0x00, 0x01, 0x00];

/// Lazily identifies a supported drive and reads its temperature.
pub struct DiskTempProbe {
    sys_block: PathBuf,
    dev_dir: PathBuf,
    matched: Option<PathBuf>,
}

impl DiskTempProbe {
    pub fn new() -> Self {
        Self {
            sys_block: PathBuf::from("/sys/block"),
            dev_dir: PathBuf::from("/dev"),
            matched: None,
        }
    }

    /// Identify a supported drive if none is cached, then read its
    /// temperature. Returns the unavailable sentinel when there is no
    /// supported drive or the read fails.
    pub fn refresh(&mut self) -> i32 {
        if self.matched.is_none() {
            self.matched = self.identify();
        }
        let Some(device) = self.matched.clone() else {
            return UNAVAILABLE;
        };
        let temp = read_drive_temp(&device);
        if temp == UNAVAILABLE {
            // Drive gone or no longer answering; re-identify next probe.
            debug!("dropping cached disk device {}", device.display());
            self.matched = None;
        }
        temp
    }

    fn identify(&self) -> Option<PathBuf> {
        for name in CANDIDATE_DEVICES {
            let model_path = self.sys_block.join(name).join("device/model");
            let Ok(contents) = fs::read_to_string(&model_path) else {
                continue;
            };
            let model = contents.split_whitespace().last().unwrap_or("");
            if SUPPORTED_MODELS
                .iter()
                .any(|pattern| model_matches(model, pattern))
            {
                debug!("supported drive {} at /dev/{}", model, name);
                return Some(self.dev_dir.join(name));
            }
        }
        None
    }
}

impl Default for DiskTempProbe {
    fn default() -> Self {
        Self::new()
    }
}

fn model_matches(model: &str, pattern: &str) -> bool {
    if model.len() != pattern.len() {
        return false;
    }
    model
        .bytes()
        .zip(pattern.bytes())
        .all(|(m, p)| p == b'.' || m == p)
}

/// Issue the vendor temperature read and decode the result byte.
fn read_drive_temp(device: &Path) -> i32 {
    let file = match OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_NONBLOCK)
        .open(device)
    {
        Ok(file) => file,
        Err(err) => {
            debug!("could not open {}: {}", device.display(), err);
            return UNAVAILABLE;
        }
    };

    let mut block = TEMP_READ_CMD;
    match unsafe { hdio_drive_cmd(file.as_raw_fd(), &mut block) } {
        Ok(_) => decode_temp_byte(block[2]),
        Err(err) => {
            debug!("drive command on {} failed: {}", device.display(), err);
            UNAVAILABLE
        }
    }
}

/// `0x00`/`0xff` report under/overflow and `0x01` means the read is not
/// supported; anything else encodes the temperature in half-degree steps
/// starting at -20 C.
fn decode_temp_byte(byte: u8) -> i32 {
    match byte {
        0x00 | 0x01 | 0xff => UNAVAILABLE,
        _ => i32::from(byte) / 2 - 20,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_mismatch_at_fixed_position() {
        assert!(!model_matches("HTS541040G9AT00", "HTE541040G9AT00"));
        assert!(!model_matches("HTS541040G9AT00", "HTS5416..J9AT00"));
    }

    #[test]
    fn pattern_length_must_match() {
        assert!(!model_matches("HTS541040G9AT00", "HTS54161"));
        assert!(!model_matches("HTS54161", "HTS5416..J9AT00"));
        assert!(!model_matches("", "HTS54161"));
    }

    #[test]
    fn wildcard_positions_match_any_character() {
        assert!(model_matches("HTS541040G9AT00", "HTS5410..G9AT00"));
        assert!(model_matches("IC25N040ATCS04", "IC25N0..ATCS04"));
        assert!(model_matches("HTS54161", "HTS54161"));
    }

    #[test]
    fn temp_byte_decoding() {
        assert_eq!(decode_temp_byte(0x00), UNAVAILABLE);
        assert_eq!(decode_temp_byte(0xff), UNAVAILABLE);
        assert_eq!(decode_temp_byte(0x01), UNAVAILABLE);
        assert_eq!(decode_temp_byte(0x50), 20);
        assert_eq!(decode_temp_byte(100), 30);
    }

    #[test]
    fn identify_matches_model_from_sysfs() {
        let root = std::env::temp_dir().join(format!("tp-fancontrol-disk-{}", std::process::id()));
        let model_dir = root.join("sys/sda/device");
        fs::create_dir_all(&model_dir).unwrap();
        fs::write(model_dir.join("model"), "ATA HTS541040G9AT00\n").unwrap();

        let probe = DiskTempProbe {
            sys_block: root.join("sys"),
            dev_dir: root.join("dev"),
            matched: None,
        };
        assert_eq!(probe.identify(), Some(root.join("dev/sda")));

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn identify_skips_unsupported_models() {
        let root =
            std::env::temp_dir().join(format!("tp-fancontrol-nodisk-{}", std::process::id()));
        let model_dir = root.join("sys/sda/device");
        fs::create_dir_all(&model_dir).unwrap();
        fs::write(model_dir.join("model"), "Samsung SSD 870\n").unwrap();

        let probe = DiskTempProbe {
            sys_block: root.join("sys"),
            dev_dir: root.join("dev"),
            matched: None,
        };
        assert_eq!(probe.identify(), None);

        fs::remove_dir_all(&root).unwrap();
    }
}

//! Multi-channel temperature sampling.
//!
//! Channel order is fixed: the EC thermal zones first, then the disk, then
//! the hdaps accelerometer. A channel that cannot be read reports the
//! unavailable sentinel; sampling itself never fails.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::disk_temp::DiskTempProbe;
use crate::engine::{THERMAL_ZONE_COUNT, UNAVAILABLE};

/// EC thermal zone pseudo-file.
const THERMAL_PATH: &str = "/proc/acpi/ibm/thermal";

/// Accelerometer temperature node.
const HDAPS_TEMP_PATH: &str = "/sys/devices/platform/hdaps/temp1";

/// Samples between runs of the expensive disk probe (24 s at the 3 s tick).
const DISK_PROBE_SAMPLES: u32 = 8;

pub struct SensorSource {
    thermal_path: PathBuf,
    hdaps_path: PathBuf,
    disk: DiskTempProbe,
    disk_temp: i32,
    sample_count: u32,
}

impl SensorSource {
    pub fn new() -> Self {
        Self::with_paths(
            PathBuf::from(THERMAL_PATH),
            PathBuf::from(HDAPS_TEMP_PATH),
            DiskTempProbe::new(),
        )
    }

    fn with_paths(thermal_path: PathBuf, hdaps_path: PathBuf, disk: DiskTempProbe) -> Self {
        Self {
            thermal_path,
            hdaps_path,
            disk,
            disk_temp: UNAVAILABLE,
            sample_count: 0,
        }
    }

    pub fn channel_count(&self) -> usize {
        THERMAL_ZONE_COUNT + 2
    }

    /// Collect one reading in fixed channel order. The disk channel reports
    /// the cached value except on the slow probe cadence.
    pub fn sample(&mut self) -> Vec<i32> {
        let mut reading = self.read_thermal_zones();

        if self.sample_count % DISK_PROBE_SAMPLES == 0 {
            self.disk_temp = self.disk.refresh();
            debug!("disk temperature probe: {}", self.disk_temp);
        }
        self.sample_count = self.sample_count.wrapping_add(1);
        reading.push(self.disk_temp);

        reading.push(read_integer_file(&self.hdaps_path));
        reading
    }

    fn read_thermal_zones(&self) -> Vec<i32> {
        match fs::read_to_string(&self.thermal_path) {
            Ok(contents) => parse_thermal_line(&contents, THERMAL_ZONE_COUNT),
            Err(err) => {
                debug!("could not read {}: {}", self.thermal_path.display(), err);
                vec![UNAVAILABLE; THERMAL_ZONE_COUNT]
            }
        }
    }
}

impl Default for SensorSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse the EC thermal line (`temperatures:\t47 42 ...`) into exactly
/// `count` channels, padding a short line with the unavailable sentinel.
fn parse_thermal_line(contents: &str, count: usize) -> Vec<i32> {
    let values = contents.split_once(':').map_or(contents, |(_, rest)| rest);
    let mut reading: Vec<i32> = values
        .split_whitespace()
        .take(count)
        .map(|token| token.parse().unwrap_or(UNAVAILABLE))
        .collect();
    reading.resize(count, UNAVAILABLE);
    reading
}

fn read_integer_file(path: &Path) -> i32 {
    match fs::read_to_string(path) {
        Ok(contents) => contents.trim().parse().unwrap_or(UNAVAILABLE),
        Err(_) => UNAVAILABLE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thermal_line_is_parsed_in_order() {
        let reading = parse_thermal_line("temperatures:\t47 42 39 60 35 -128 31 40\n", 8);
        assert_eq!(reading, vec![47, 42, 39, 60, 35, -128, 31, 40]);
    }

    #[test]
    fn short_thermal_line_is_padded_with_the_sentinel() {
        let reading = parse_thermal_line("temperatures:\t47 42\n", 8);
        assert_eq!(reading[..2], [47, 42]);
        assert!(reading[2..].iter().all(|&temp| temp == UNAVAILABLE));
        assert_eq!(reading.len(), 8);
    }

    #[test]
    fn garbage_tokens_become_the_sentinel() {
        let reading = parse_thermal_line("temperatures:\t47 n/a 39\n", 3);
        assert_eq!(reading, vec![47, UNAVAILABLE, 39]);
    }

    #[test]
    fn line_without_label_still_parses() {
        let reading = parse_thermal_line("47 42 39\n", 3);
        assert_eq!(reading, vec![47, 42, 39]);
    }

    #[test]
    fn extra_tokens_are_ignored() {
        let reading = parse_thermal_line("temperatures:\t1 2 3 4 5\n", 3);
        assert_eq!(reading, vec![1, 2, 3]);
    }

    #[test]
    fn missing_sources_report_every_channel_unavailable() {
        let root = std::env::temp_dir().join(format!("tp-fancontrol-sense-{}", std::process::id()));
        let mut sensors = SensorSource::with_paths(
            root.join("thermal"),
            root.join("temp1"),
            DiskTempProbe::new(),
        );
        let reading = sensors.sample();
        assert_eq!(reading.len(), sensors.channel_count());
        assert!(reading[..THERMAL_ZONE_COUNT]
            .iter()
            .all(|&temp| temp == UNAVAILABLE));
        assert_eq!(reading[THERMAL_ZONE_COUNT + 1], UNAVAILABLE);
    }

    #[test]
    fn sample_reads_the_configured_files() {
        let root = std::env::temp_dir().join(format!("tp-fancontrol-files-{}", std::process::id()));
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("thermal"), "temperatures:\t47 42 39 60 35 -128 31 40\n").unwrap();
        fs::write(root.join("temp1"), "41\n").unwrap();

        let mut sensors = SensorSource::with_paths(
            root.join("thermal"),
            root.join("temp1"),
            DiskTempProbe::new(),
        );
        let reading = sensors.sample();
        assert_eq!(reading[0], 47);
        assert_eq!(reading[THERMAL_ZONE_COUNT + 1], 41);

        fs::remove_dir_all(&root).unwrap();
    }
}

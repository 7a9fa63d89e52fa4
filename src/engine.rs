//! Fan level decision engine.
//!
//! Converts a multi-channel temperature reading into a discrete fan level.
//! Each channel maps onto a ramp twice as dense as the level table, which
//! gives every level boundary a half-step dead zone; a minimum dwell time
//! additionally rate-limits downward steps. Together these keep a reading
//! that hovers around a boundary from pulsing the fan every cycle.

use std::time::{Duration, Instant};

use log::{debug, info};

use crate::errors::{FanControlError, Result};

/// Sentinel for a channel that produced no valid sample this cycle.
pub const UNAVAILABLE: i32 = -128;

/// Minimum time a level is held before the engine may step down.
pub const MIN_DWELL: Duration = Duration::from_secs(180);

/// Readings this far below a channel's min threshold exert no pressure at all.
const OFF_THRESH_DELTA: i32 = 3;

/// Number of EC thermal zone channels.
pub const THERMAL_ZONE_COUNT: usize = 8;

/// Total channel count: EC zones, then disk, then hdaps.
pub const CHANNEL_COUNT: usize = THERMAL_ZONE_COUNT + 2;

/// Per-channel (min, max) temperature bounds in degrees Celsius, in channel
/// order. The EC zone order follows the classic ThinkPad sensor layout.
pub const DEFAULT_THRESHOLDS: [(i32, i32); CHANNEL_COUNT] = [
    (50, 70), // cpu
    (45, 65), // mini-pci
    (48, 68), // board
    (50, 72), // gpu
    (42, 60), // main battery
    (45, 65), // ultrabay
    (45, 65), // bus
    (42, 60), // secondary battery
    (38, 55), // disk
    (45, 65), // hdaps
];

/// EC fan levels: idle, low, medium, high.
pub const DEFAULT_LEVELS: [u8; 4] = [0, 2, 4, 7];

/// Per-channel temperature thresholds, validated so `max > min` everywhere.
#[derive(Debug, Clone)]
pub struct ThresholdTable {
    pairs: Vec<(i32, i32)>,
}

impl ThresholdTable {
    pub fn new(pairs: Vec<(i32, i32)>) -> Result<Self> {
        if pairs.is_empty() {
            return Err(FanControlError::Config(
                "threshold table is empty".to_string(),
            ));
        }
        for (channel, (min, max)) in pairs.iter().enumerate() {
            if max <= min {
                return Err(FanControlError::Config(format!(
                    "threshold pair {} has max {} <= min {}",
                    channel, max, min
                )));
            }
        }
        Ok(Self { pairs })
    }

    /// The reference table with every min bound shifted by `shift_min` and
    /// every max bound shifted by `shift_max`, re-validated.
    pub fn default_shifted(shift_min: i32, shift_max: i32) -> Result<Self> {
        let pairs = DEFAULT_THRESHOLDS
            .iter()
            .map(|&(min, max)| (min + shift_min, max + shift_max))
            .collect();
        Self::new(pairs)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    fn pair(&self, channel: usize) -> (i32, i32) {
        self.pairs[channel]
    }
}

/// Discrete fan speed levels, non-decreasing in index order.
#[derive(Debug, Clone)]
pub struct LevelTable {
    levels: Vec<u8>,
}

impl LevelTable {
    pub fn new(levels: Vec<u8>) -> Result<Self> {
        if levels.len() < 2 {
            return Err(FanControlError::Config(
                "level table needs at least two levels".to_string(),
            ));
        }
        if levels.windows(2).any(|pair| pair[0] > pair[1]) {
            return Err(FanControlError::Config(
                "level table must be non-decreasing".to_string(),
            ));
        }
        Ok(Self { levels })
    }

    pub fn max_idx(&self) -> usize {
        self.levels.len() - 1
    }

    pub fn value(&self, idx: usize) -> u8 {
        self.levels[idx]
    }

    pub fn lowest(&self) -> u8 {
        self.levels[0]
    }
}

impl Default for LevelTable {
    fn default() -> Self {
        Self {
            levels: DEFAULT_LEVELS.to_vec(),
        }
    }
}

/// The control state machine. State persists between ticks; `step` mutates
/// it exactly once per tick.
pub struct DecisionEngine {
    thresholds: ThresholdTable,
    levels: LevelTable,
    idx: usize,
    last_change: Instant,
    first_tick: bool,
}

impl DecisionEngine {
    pub fn new(thresholds: ThresholdTable, levels: LevelTable) -> Self {
        Self {
            thresholds,
            levels,
            idx: 0,
            last_change: Instant::now(),
            first_tick: true,
        }
    }

    pub fn channel_count(&self) -> usize {
        self.thresholds.len()
    }

    pub fn current_level(&self) -> u8 {
        self.levels.value(self.idx)
    }

    pub fn lowest_level(&self) -> u8 {
        self.levels.lowest()
    }

    /// Advance one tick: map the reading onto the next fan level.
    ///
    /// Unavailable channels are skipped; with no valid channel at all the
    /// level holds, or decays one step once the dwell time has expired.
    pub fn step(&mut self, reading: &[i32], now: Instant) -> u8 {
        let max_idx = self.levels.max_idx();

        // Baseline on the doubled scale: hold the current level, or allow a
        // single step down once the dwell time has expired.
        let mut max_z: i32 = if self.idx == 0 {
            0
        } else if now > self.last_change + MIN_DWELL {
            2 * (self.idx as i32 - 1)
        } else {
            2 * self.idx as i32
        };

        for (channel, &temp) in reading.iter().enumerate().take(self.thresholds.len()) {
            if temp == UNAVAILABLE {
                continue;
            }
            let (min, max) = self.thresholds.pair(channel);
            let z = if temp < min - OFF_THRESH_DELTA {
                0
            } else {
                let ramp = 2 * (temp - min) * (max_idx as i32 - 1);
                (ramp.div_euclid(max - min) + 2).clamp(1, 2 * max_idx as i32)
            };
            max_z = max_z.max(z);
        }

        // A value exactly half a step below the current level sits in the
        // dead zone and is not rounded up.
        let in_band = max_z == 2 * self.idx as i32 - 1;
        if !in_band {
            max_z += 1;
        }
        let new_idx = (max_z / 2).clamp(0, max_idx as i32) as usize;

        if !self.first_tick && self.levels.value(new_idx) != self.levels.value(self.idx) {
            info!(
                "fan level {} -> {}",
                self.levels.value(self.idx),
                self.levels.value(new_idx)
            );
            self.last_change = now;
        }
        debug!("tick: max_z={} idx {} -> {}", max_z, self.idx, new_idx);
        self.idx = new_idx;
        self.first_tick = false;
        self.levels.value(new_idx)
    }
}

//! Daemon control loop.
//!
//! Drives the fixed-period sample -> decide -> actuate cycle and turns
//! asynchronously delivered process signals into state changes between
//! ticks. Hardware is only ever touched from this loop, never from signal
//! context; the inter-tick sleep is the only suspension point and any
//! pending signal preempts it.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use log::{error, info, warn};
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::time::MissedTickBehavior;

use crate::engine::DecisionEngine;
use crate::errors::{FanControlError, Result};
use crate::fan_control::FanControl;
use crate::pidfile;
use crate::sensors::SensorSource;

/// Time between control ticks.
pub const INTERVAL: Duration = Duration::from_secs(3);

/// EC watchdog timeout in seconds; three missed ticks and the firmware
/// takes fan control back.
pub const WATCHDOG_DELAY: u32 = 9;

/// How long a suspend request pins the fan to the lowest level.
const SUSPEND_HOLD: Duration = Duration::from_secs(60);

enum DaemonState {
    Running,
    Suspended { until: Instant },
}

/// Main daemon structure: owns the sensors, the decision engine and the fan
/// interface for the lifetime of the process.
pub struct FanDaemon {
    sensors: SensorSource,
    engine: DecisionEngine,
    fan: FanControl,
    pid_file: Option<PathBuf>,
    state: DaemonState,
}

impl FanDaemon {
    pub fn new(
        sensors: SensorSource,
        engine: DecisionEngine,
        fan: FanControl,
        pid_file: Option<PathBuf>,
    ) -> Result<Self> {
        if sensors.channel_count() != engine.channel_count() {
            return Err(FanControlError::Config(format!(
                "threshold table covers {} channels, sensors provide {}",
                engine.channel_count(),
                sensors.channel_count()
            )));
        }
        Ok(Self {
            sensors,
            engine,
            fan,
            pid_file,
            state: DaemonState::Running,
        })
    }

    /// Run the control loop until a termination signal arrives.
    pub async fn run(mut self) -> Result<()> {
        let mut terminate = TerminationSignals::new()?;
        let mut suspend = signal(SignalKind::user_defined1())?;

        // Restores automatic control even if the loop unwinds; the EC must
        // never be left in manual mode with the watchdog off.
        let _restore = RestoreGuard {
            fan: self.fan.clone(),
            pid_file: self.pid_file.clone(),
        };

        if let Err(err) = self.fan.arm_watchdog(WATCHDOG_DELAY) {
            error!("could not arm fan watchdog: {}", err);
        }
        info!("starting dynamic fan control");

        let mut interval = tokio::time::interval(INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = terminate.recv() => {
                    info!("termination requested, restoring automatic fan control");
                    break;
                }
                _ = suspend.recv() => {
                    info!(
                        "suspend requested, holding lowest fan level for {}s",
                        SUSPEND_HOLD.as_secs()
                    );
                    self.state = DaemonState::Suspended {
                        until: Instant::now() + SUSPEND_HOLD,
                    };
                    if let Err(err) = self.fan.set_level(self.engine.lowest_level()) {
                        warn!("could not set suspend fan level: {}", err);
                    }
                }
                _ = interval.tick() => {
                    self.tick(Instant::now());
                }
            }
        }
        Ok(())
    }

    fn tick(&mut self, now: Instant) {
        if let DaemonState::Suspended { until } = self.state {
            if now < until {
                // Hold the lowest level and keep feeding the watchdog; the
                // decision engine stays paused.
                if let Err(err) = self.fan.set_level(self.engine.lowest_level()) {
                    warn!("could not hold suspend fan level: {}", err);
                }
                return;
            }
            info!("suspend hold finished, resuming fan control");
            self.state = DaemonState::Running;
        }

        let reading = self.sensors.sample();
        let level = self.engine.step(&reading, now);
        // Written every tick, changed or not: each write re-arms the EC
        // watchdog, and a failed write is simply retried next tick.
        if let Err(err) = self.fan.set_level(level) {
            warn!("could not set fan level {}: {}", level, err);
        }
    }
}

/// The four signals treated as a termination request, multiplexed into one
/// event source.
struct TerminationSignals {
    interrupt: Signal,
    terminate: Signal,
    hangup: Signal,
    quit: Signal,
}

impl TerminationSignals {
    fn new() -> std::io::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
            hangup: signal(SignalKind::hangup())?,
            quit: signal(SignalKind::quit())?,
        })
    }

    async fn recv(&mut self) {
        tokio::select! {
            _ = self.interrupt.recv() => {}
            _ = self.terminate.recv() => {}
            _ = self.hangup.recv() => {}
            _ = self.quit.recv() => {}
        }
    }
}

struct RestoreGuard {
    fan: FanControl,
    pid_file: Option<PathBuf>,
}

impl Drop for RestoreGuard {
    fn drop(&mut self) {
        if let Err(err) = self.fan.restore_automatic() {
            error!("could not restore automatic fan control: {}", err);
        }
        if let Err(err) = self.fan.disable_watchdog() {
            error!("could not disable fan watchdog: {}", err);
        }
        if let Some(path) = &self.pid_file {
            pidfile::remove(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{LevelTable, ThresholdTable};

    fn test_daemon() -> FanDaemon {
        let thresholds = ThresholdTable::default_shifted(0, 0).unwrap();
        let engine = DecisionEngine::new(thresholds, LevelTable::default());
        FanDaemon::new(
            SensorSource::new(),
            engine,
            FanControl::new(true).unwrap(),
            None,
        )
        .unwrap()
    }

    #[test]
    fn suspend_hold_expires_back_to_running() {
        let mut daemon = test_daemon();
        let now = Instant::now();
        daemon.state = DaemonState::Suspended {
            until: now + SUSPEND_HOLD,
        };

        daemon.tick(now + Duration::from_secs(3));
        assert!(matches!(daemon.state, DaemonState::Suspended { .. }));

        daemon.tick(now + SUSPEND_HOLD + Duration::from_secs(1));
        assert!(matches!(daemon.state, DaemonState::Running));
    }

    #[test]
    fn channel_count_mismatch_is_rejected() {
        let thresholds = ThresholdTable::new(vec![(50, 70)]).unwrap();
        let engine = DecisionEngine::new(thresholds, LevelTable::default());
        let result = FanDaemon::new(
            SensorSource::new(),
            engine,
            FanControl::new(true).unwrap(),
            None,
        );
        assert!(matches!(result, Err(FanControlError::Config(_))));
    }
}

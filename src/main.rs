//! Main entry point for the fan control daemon

use std::os::fd::AsRawFd;
use std::path::Path;

use anyhow::Context;
use clap::Parser;
use nix::unistd::{dup2, fork, setsid, ForkResult};
use tp_fancontrol::{
    args::Args,
    client,
    daemon::FanDaemon,
    engine::{DecisionEngine, LevelTable, ThresholdTable},
    errors::FanControlError,
    fan_control::FanControl,
    logging, pidfile,
    sensors::SensorSource,
};

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let dry_run = args.dry_run;
    // Dry runs stay in the foreground and keep their output.
    let quiet = !dry_run && (args.quiet || args.daemon);
    let daemonize = args.daemon && !dry_run;

    logging::setup(args.verbose, quiet, args.syslog)?;

    let pkg_version = env!("CARGO_PKG_VERSION");
    let git_hash = option_env!("GIT_HASH").unwrap_or("unknown");
    let build_time = option_env!("BUILD_TIME").unwrap_or("unknown");
    log::info!(
        "tp-fancontrold v{} (git {}) built {}",
        pkg_version,
        git_hash,
        build_time
    );

    if args.kill || args.suspend {
        let result = if args.kill {
            client::kill_daemon(&args.pid_file)
        } else {
            client::suspend_daemon(&args.pid_file)
        };
        return match result {
            Err(FanControlError::DaemonNotRunning) => {
                log::warn!("no running daemon found at {}", args.pid_file.display());
                Ok(())
            }
            other => other.context("could not signal the running daemon"),
        };
    }

    if dry_run {
        println!("dry run, will not change fan state");
    }

    let thresholds = ThresholdTable::default_shifted(args.shift_min, args.shift_max)
        .context("invalid temperature thresholds")?;
    let engine = DecisionEngine::new(thresholds, LevelTable::default());
    let sensors = SensorSource::new();
    let fan = FanControl::new(dry_run).context("fan control interface unavailable")?;

    // Fork before the runtime exists; the daemon loop must not inherit a
    // forked runtime.
    let pid_file = if daemonize {
        daemonize_into_background(&args.pid_file)?;
        Some(args.pid_file.clone())
    } else {
        if pidfile::exists(&args.pid_file) {
            log::warn!(
                "pid file {} exists, daemon already running?",
                args.pid_file.display()
            );
        }
        None
    };

    if !dry_run {
        raise_priority();
    }

    let daemon = FanDaemon::new(sensors, engine, fan, pid_file)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("could not start the control loop runtime")?;
    runtime.block_on(daemon.run())?;
    Ok(())
}

/// Fork into the background. The parent records the child pid in the marker
/// file and exits; the child detaches from the controlling terminal and
/// redirects stdio to /dev/null.
fn daemonize_into_background(pid_file: &Path) -> anyhow::Result<()> {
    if pidfile::exists(pid_file) {
        anyhow::bail!(
            "pid file {} already exists, refusing to run",
            pid_file.display()
        );
    }

    match unsafe { fork() }.context("could not fork")? {
        ForkResult::Parent { child } => {
            if let Err(err) = pidfile::create(pid_file, child.as_raw()) {
                log::error!("could not write pid file: {}", err);
                let _ = nix::sys::signal::kill(child, nix::sys::signal::Signal::SIGTERM);
                std::process::exit(1);
            }
            std::process::exit(0);
        }
        ForkResult::Child => {
            setsid().context("could not detach from session")?;
            redirect_stdio_to_null()?;
            Ok(())
        }
    }
}

fn redirect_stdio_to_null() -> anyhow::Result<()> {
    let null = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open("/dev/null")
        .context("could not open /dev/null")?;
    for target in [0, 1, 2] {
        dup2(null.as_raw_fd(), target).context("could not redirect stdio")?;
    }
    Ok(())
}

/// Nice the control loop above normal so sampling stays on schedule under
/// load. Needs root; failure is only logged.
fn raise_priority() {
    let rc = unsafe { nix::libc::setpriority(nix::libc::PRIO_PROCESS as _, 0, -10) };
    if rc != 0 {
        log::warn!("could not raise scheduling priority");
    }
}

//! Logging setup for the fan control daemon

use anyhow::Context;
use fern::Dispatch;
use log::LevelFilter;

/// Setup logging with the specified verbosity level.
///
/// `quiet` drops the console chain entirely; `use_syslog` adds a syslog
/// chain, which replaces the console for a backgrounded daemon.
pub fn setup(verbosity: u8, quiet: bool, use_syslog: bool) -> anyhow::Result<()> {
    let level = match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let mut dispatch = Dispatch::new().level(level);

    if !quiet {
        dispatch = dispatch.chain(
            Dispatch::new()
                .format(|out, message, record| {
                    out.finish(format_args!(
                        "{} [{}] {}: {}",
                        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                        record.level(),
                        record.target(),
                        message
                    ))
                })
                .chain(std::io::stdout()),
        );
    }

    if use_syslog {
        let formatter = syslog::Formatter3164 {
            facility: syslog::Facility::LOG_DAEMON,
            hostname: None,
            process: "tp-fancontrold".to_string(),
            pid: std::process::id(),
        };
        let logger = syslog::unix(formatter)
            .map_err(|e| anyhow::anyhow!("syslog unavailable: {e}"))?;
        dispatch = dispatch.chain(logger);
    }

    dispatch.apply().context("logger already installed")?;
    Ok(())
}

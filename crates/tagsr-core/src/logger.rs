//! Process logger for the tagsr tools.
//!
//! `init_with_level` installs a stderr logger printing
//! `[elapsed LEVEL crate] message`. The level filter applies in full to the
//! `tagsr*` crates; records from dependencies are capped at `info` so image
//! codecs do not drown the per-sample warnings.
//!
//! With the `tracing` feature, `init_tracing` installs a `tracing-subscriber`
//! instead. Its default filter follows the same rule, and `RUST_LOG`
//! replaces it when set.

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{Level, LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

const OWN_CRATES: [&str; 4] = ["tagsr", "tagsr_core", "tagsr_aruco", "tagsr_eval"];

fn crate_of(target: &str) -> &str {
    target.split("::").next().unwrap_or(target)
}

fn is_own_target(target: &str) -> bool {
    OWN_CRATES.contains(&crate_of(target))
}

fn allows(level: LevelFilter, record_level: Level, target: &str) -> bool {
    if record_level > level {
        return false;
    }
    is_own_target(target) || record_level <= Level::Info
}

fn format_line(elapsed: f64, level: Level, target: &str, message: &std::fmt::Arguments) -> String {
    format!("[{elapsed:7.3}s {level:>5} {}] {message}", crate_of(target))
}

struct SimpleLogger {
    level: LevelFilter,
    started: Instant,
}

impl Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        allows(self.level, metadata.level(), metadata.target())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(
            self.started.elapsed().as_secs_f64(),
            record.level(),
            record.target(),
            record.args(),
        );
        let _ = writeln!(std::io::stderr().lock(), "{line}");
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<SimpleLogger> = OnceLock::new();

/// Install the stderr logger with the provided level filter.
///
/// Calling this more than once is a no-op after the first successful
/// initialization.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_none() {
        let logger = LOGGER.get_or_init(|| SimpleLogger {
            level,
            started: Instant::now(),
        });
        log::set_logger(logger)?;
        log::set_max_level(level);
    }
    Ok(())
}

/// `EnvFilter` directives equivalent to the stderr logger's filtering.
pub fn default_directives(level: LevelFilter) -> String {
    let level = level.to_string().to_ascii_lowercase();
    let deps = if level == "off" || level == "error" || level == "warn" {
        level.as_str()
    } else {
        "info"
    };
    let mut out = deps.to_string();
    for name in OWN_CRATES {
        out.push_str(&format!(",{name}={level}"));
    }
    out
}

/// Install a `tracing-subscriber` fmt subscriber. The filter comes from
/// `RUST_LOG` when set, otherwise from [`default_directives`] at `level`.
/// `json = true` switches to flattened JSON events.
///
/// The subscriber also bridges `log` records, so code using the `log` macros
/// keeps working.
#[cfg(feature = "tracing")]
pub fn init_tracing(level: LevelFilter, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));
    let installed = if json {
        fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .json()
            .flatten_event(true)
            .finish()
            .try_init()
    } else {
        fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init()
    };
    if let Err(e) = installed {
        log::debug!("tracing subscriber not installed: {e}");
    }
}

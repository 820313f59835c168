//! Logger initialisation for the update binaries.
//!
//! Diagnostics go through the `log` facade. The level follows the `-v` count
//! unless `MOZJS_UPDATE_LOG` holds an `env_logger` filter, which always wins.

use env_logger::{Builder, Env};
use log::{Level, LevelFilter};
use std::io::Write;

/// Environment variable holding an `env_logger` filter.
pub const LOG_ENV: &str = "MOZJS_UPDATE_LOG";

/// Environment variable selecting colour output (`auto`, `always`, `never`).
pub const LOG_STYLE_ENV: &str = "MOZJS_UPDATE_LOG_STYLE";

/// Maps a `-v` count to a log level.
///
/// # Examples
///
/// ```
/// use log::LevelFilter;
/// use mozjs_updater::logging::level_for_verbosity;
///
/// assert_eq!(level_for_verbosity(0), LevelFilter::Warn);
/// assert_eq!(level_for_verbosity(7), LevelFilter::Trace);
/// ```
#[must_use]
pub const fn level_for_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// A logger builder for `verbosity`, honouring the environment overrides.
#[must_use]
pub fn builder(verbosity: u8) -> Builder {
    let default_filter = level_for_verbosity(verbosity).to_string();
    let mut builder = Builder::from_env(
        Env::new()
            .filter_or(LOG_ENV, default_filter)
            .write_style(LOG_STYLE_ENV),
    );
    builder.format(|buf, record| match record.level() {
        Level::Info => writeln!(buf, "{}", record.args()),
        Level::Error | Level::Warn => writeln!(
            buf,
            "{}: {}",
            record.level().as_str().to_lowercase(),
            record.args()
        ),
        Level::Debug | Level::Trace => writeln!(
            buf,
            "{} {} - {}",
            record.level(),
            record.target(),
            record.args()
        ),
    });
    builder
}

/// Installs the global logger. Later calls are no-ops.
pub fn init(verbosity: u8) {
    if builder(verbosity).try_init().is_err() {
        // A logger is already installed.
    }
}

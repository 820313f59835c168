//! Ctrl-C handling for the update binaries.
//!
//! The first interrupt is only recorded. A running child receives the same
//! signal and fails, and the long in-process loops (unpacking, copying) poll
//! the flag between entries, so the run unwinds through ordinary error
//! returns and the scratch directory is removed on the way out. A second
//! interrupt exits immediately.

use crate::error::{Result, UpdaterError};
use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};

/// Exit status conventionally used after SIGINT.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Installs the process-wide Ctrl-C handler.
///
/// # Errors
///
/// Returns [`UpdaterError::SignalHandler`] if a handler cannot be installed.
pub fn install_handler() -> Result<()> {
    ctrlc::set_handler(|| {
        if INTERRUPTED.swap(true, Ordering::SeqCst) {
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
    })
    .map_err(|source| UpdaterError::SignalHandler { source })
}

/// Fails with [`UpdaterError::Interrupted`] once Ctrl-C has been pressed.
///
/// # Errors
///
/// Returns [`UpdaterError::Interrupted`] after an interrupt.
pub fn check() -> Result<()> {
    check_flag(&INTERRUPTED)
}

/// [`check`] against an explicit flag.
pub(crate) fn check_flag(flag: &AtomicBool) -> Result<()> {
    if flag.load(Ordering::SeqCst) {
        debug!("stopping after interrupt");
        Err(UpdaterError::Interrupted)
    } else {
        Ok(())
    }
}

/// The flag [`install_handler`] sets.
pub(crate) fn flag() -> &'static AtomicBool {
    &INTERRUPTED
}

// src/signals.rs

//! Process-wide signal flags polled by the main loop.
//!
//! Handlers only store to atomics. They are installed without `SA_RESTART`
//! so a blocking wait returns early with `EINTR` and the loop sees the flag
//! on the same iteration.

use anyhow::{Context, Result};
use log::debug;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use std::sync::atomic::{AtomicBool, Ordering};

/// Set by SIGTERM and SIGINT.
pub static TERMINATE: AtomicBool = AtomicBool::new(false);

/// Set by SIGUSR1: refresh content now instead of at the next tick.
pub static REFRESH: AtomicBool = AtomicBool::new(false);

extern "C" fn on_terminate(_: libc::c_int) {
    TERMINATE.store(true, Ordering::SeqCst);
}

extern "C" fn on_refresh(_: libc::c_int) {
    REFRESH.store(true, Ordering::SeqCst);
}

pub fn install() -> Result<()> {
    let terminate = SigAction::new(
        SigHandler::Handler(on_terminate),
        SaFlags::empty(),
        SigSet::empty(),
    );
    let refresh = SigAction::new(
        SigHandler::Handler(on_refresh),
        SaFlags::empty(),
        SigSet::empty(),
    );
    for (signal, action) in [
        (Signal::SIGTERM, &terminate),
        (Signal::SIGINT, &terminate),
        (Signal::SIGUSR1, &refresh),
    ] {
        // SAFETY: the handlers only perform atomic stores, which are
        // async-signal-safe.
        unsafe { sigaction(signal, action) }
            .with_context(|| format!("Failed to install {} handler", signal))?;
    }
    debug!("Signal handlers installed");
    Ok(())
}

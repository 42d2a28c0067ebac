// src/script.rs

//! The boundary toward the scripting layer.
//!
//! The scripting engine itself lives outside this crate. The pipeline only
//! needs two calls from it: a synchronous mouse hook whose return value says
//! whether the event was consumed, and a best-effort push of the current
//! window geometry.

use crate::input::MouseEvent;
use crate::window::WindowGeometry;
use anyhow::Result;
use log::trace;

pub trait ScriptHook {
    /// Offers a pointer event to the scripts. `Ok(true)` means the event was
    /// consumed and must not reach other windows. An `Err` is a fault inside
    /// the scripting layer; callers treat it as not consumed.
    ///
    /// Implementations run on the loop thread and must not re-enter the loop.
    fn dispatch_mouse(&mut self, event: &MouseEvent) -> Result<bool>;

    /// Publishes the window geometry to the scripts. A no-op when the
    /// scripting environment is not initialized.
    fn update_window_table(&mut self, geometry: &WindowGeometry);
}

/// Hook used when no scripting environment is loaded. Consumes nothing.
#[derive(Debug, Default)]
pub struct NullScriptHook;

impl ScriptHook for NullScriptHook {
    fn dispatch_mouse(&mut self, event: &MouseEvent) -> Result<bool> {
        trace!("NullScriptHook: {:?} not consumed", event.kind);
        Ok(false)
    }

    fn update_window_table(&mut self, _geometry: &WindowGeometry) {}
}

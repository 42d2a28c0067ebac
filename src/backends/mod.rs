// src/backends/mod.rs

//! The capability interface every output target implements, and the ordered
//! list of built-in targets.
//!
//! A backend is either graphical (owns a window on a display server) or a
//! text sink. Lifecycle methods are required. Window-management operations
//! default to an explicit `Unsupported` error so a caller always learns that
//! nothing happened; `capabilities()` lets the scheduler skip them up front.

pub mod console;
pub mod file;
#[cfg(feature = "http")]
pub mod http;
#[cfg(test)]
pub mod mock;
#[cfg(feature = "tui")]
pub mod tui;
#[cfg(feature = "wayland")]
pub mod wayland;
#[cfg(feature = "x11")]
pub mod x11;

use crate::config::Config;
use crate::content::RenderedContent;
use crate::damage::DamageRegion;
use crate::error::DisplayError;
use crate::geometry::{Point, Rect, Size};
use crate::input::PointerNotification;
use crate::os::epoll::WaitResult;
use crate::registry::BackendRegistry;
use crate::window::{GeometryRequest, Struts, WindowGeometry};
use anyhow::Result;
use bitflags::bitflags;
use std::time::Duration;

/// The closed set of backend families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Wayland,
    X11,
    Http,
    File,
    Ncurses,
    Console,
    #[cfg(test)]
    Mock { graphical: bool },
}

impl BackendKind {
    pub fn is_graphical(self) -> bool {
        match self {
            BackendKind::Wayland | BackendKind::X11 => true,
            BackendKind::Http | BackendKind::File | BackendKind::Ncurses | BackendKind::Console => {
                false
            }
            #[cfg(test)]
            BackendKind::Mock { graphical } => graphical,
        }
    }
}

bitflags! {
    /// Optional operations a backend implements.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Capabilities: u8 {
        /// Accepts resize requests and reports configure notifications.
        const RESIZE = 1 << 0;
        /// Accepts move requests.
        const MOVE = 1 << 1;
        const STRUTS = 1 << 2;
        /// Delivers pointer notifications.
        const POINTER = 1 << 3;
        /// Can re-inject unconsumed pointer events below its window.
        const PROPAGATE = 1 << 4;
        const INPUT_FOCUS = 1 << 5;
    }
}

/// Why `main_loop_wait` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The native event source has something to drain.
    Ready,
    TimedOut,
    /// A signal woke the wait.
    Interrupted,
}

impl From<WaitResult> for WaitOutcome {
    fn from(result: WaitResult) -> Self {
        match result {
            WaitResult::Ready(_) => WaitOutcome::Ready,
            WaitResult::TimedOut => WaitOutcome::TimedOut,
            WaitResult::Interrupted => WaitOutcome::Interrupted,
        }
    }
}

/// A native notification, already stripped of protocol detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeEvent {
    /// Part of the surface must be repainted. Window-relative.
    Expose(Rect),
    /// The window system reports the window's geometry. Root coordinates.
    Configure { pos: Point, size: Size },
    Pointer(PointerNotification),
    /// The user or window manager asked the window to close.
    CloseRequested,
}

/// What a backend paints in one draw step.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub content: &'a RenderedContent,
    pub damage: &'a DamageRegion,
    pub geometry: WindowGeometry,
}

pub trait Backend {
    fn name(&self) -> &str;

    fn kind(&self) -> BackendKind;

    fn is_graphical(&self) -> bool {
        self.kind().is_graphical()
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::empty()
    }

    /// Whether `main_loop_wait` watches something that can become ready
    /// before the timeout. Pure sinks only sleep.
    fn has_event_source(&self) -> bool {
        self.is_graphical()
    }

    /// Whether this backend is enabled and its target is reachable. Must not
    /// acquire resources that `shutdown` would need to release.
    fn detect(&self, config: &Config) -> bool;

    fn initialize(&mut self, config: &Config) -> Result<()>;

    /// Releases every native resource. Safe to call after a failed or partial
    /// initialize.
    fn shutdown(&mut self) -> Result<()>;

    /// Blocks until the native event source is readable, `timeout` elapses,
    /// or a signal arrives. Never blocks longer than `timeout`.
    fn main_loop_wait(&mut self, timeout: Duration) -> Result<WaitOutcome>;

    /// Returns every notification that is pending without blocking.
    fn drain_events(&mut self) -> Result<Vec<NativeEvent>>;

    fn draw(&mut self, frame: &Frame<'_>) -> Result<()>;

    /// Double-buffered presentation repaints the whole surface every frame.
    fn requires_full_repaint(&self) -> bool {
        false
    }

    /// Size `content` occupies on this backend's surface.
    fn measure(&self, content: &RenderedContent) -> Size {
        Size::new(content.columns() as u32, content.rows() as u32)
    }

    /// Usable screen area for window placement, when the backend owns a window.
    fn workarea(&self) -> Option<Rect> {
        None
    }

    /// Full screen size, used to clamp struts.
    fn display_size(&self) -> Option<Size> {
        None
    }

    /// Tidies up after a normal end of the loop, before `shutdown`.
    fn cleanup(&mut self);

    /// Tidies up after a termination signal, before `shutdown`. Must leave
    /// the backend in a state where `shutdown` releases everything.
    fn sigterm_cleanup(&mut self);

    fn request_geometry(&mut self, request: GeometryRequest) -> Result<()> {
        let _ = request;
        Err(DisplayError::unsupported(self.name(), "geometry requests").into())
    }

    fn set_struts(&mut self, struts: &Struts) -> Result<()> {
        let _ = struts;
        Err(DisplayError::unsupported(self.name(), "struts").into())
    }

    /// Re-injects an unconsumed pointer notification toward the window below.
    fn propagate_pointer(&mut self, notification: &PointerNotification) -> Result<()> {
        let _ = notification;
        Err(DisplayError::unsupported(self.name(), "pointer propagation").into())
    }

    fn take_input_focus(&mut self) -> Result<()> {
        Err(DisplayError::unsupported(self.name(), "input focus").into())
    }
}

/// Registers the built-in backends in precedence order: an optional
/// compositor backend, the X backend, the interactive text targets, then
/// the plain sinks ending with the console fallback whose `detect` always
/// succeeds.
pub fn register_builtin_backends(registry: &mut BackendRegistry) -> Result<(), DisplayError> {
    #[cfg(feature = "wayland")]
    registry.register(Box::new(wayland::WaylandBackend::new()))?;
    #[cfg(feature = "x11")]
    registry.register(Box::new(x11::X11Backend::new()))?;
    #[cfg(feature = "http")]
    registry.register(Box::new(http::HttpBackend::new()))?;
    #[cfg(feature = "tui")]
    registry.register(Box::new(tui::TuiBackend::new()))?;
    registry.register(Box::new(file::FileBackend::new()))?;
    registry.register(Box::new(console::ConsoleBackend::new()))?;
    Ok(())
}

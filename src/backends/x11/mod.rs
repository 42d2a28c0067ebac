// src/backends/x11/mod.rs

//! The X Window System backend.
//!
//! Owns one top-level window and speaks the core protocol only. Pointer
//! events carry the request serial of the XEvent they came from, which the
//! input normalizer uses as the dedup key. The raw event is kept until the
//! next drain so an unconsumed one can be forwarded to the window beneath.

pub mod connection;
pub mod event;
pub mod window;

use self::connection::Connection;
use self::event::EventPump;
use self::window::{latin1_line, OwnWindow};
use super::{Backend, BackendKind, Capabilities, Frame, NativeEvent, WaitOutcome};
use crate::config::Config;
use crate::content::RenderedContent;
use crate::geometry::{Rect, Size};
use crate::input::PointerNotification;
use crate::os::epoll::{EpollFlags, EventMonitor};
use crate::window::{GeometryRequest, Struts};
use anyhow::{anyhow, Context, Result};
use log::{debug, info, trace, warn};
use std::time::Duration;

const X_FD_TOKEN: u64 = 1;

pub struct X11Backend {
    conn: Option<Connection>,
    window: Option<OwnWindow>,
    pump: EventPump,
    monitor: Option<EventMonitor>,
    double_buffer: bool,
}

impl X11Backend {
    pub fn new() -> Self {
        Self {
            conn: None,
            window: None,
            pump: EventPump::default(),
            monitor: None,
            double_buffer: false,
        }
    }

    fn parts(&mut self) -> Result<(&Connection, &mut OwnWindow)> {
        match (self.conn.as_ref(), self.window.as_mut()) {
            (Some(conn), Some(window)) if window.is_alive() => Ok((conn, window)),
            _ => Err(anyhow!("X11Backend: not initialized")),
        }
    }
}

impl Default for X11Backend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for X11Backend {
    fn name(&self) -> &str {
        "x11"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::X11
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::all()
    }

    fn detect(&self, config: &Config) -> bool {
        config.output.out_to_x && std::env::var_os("DISPLAY").is_some_and(|d| !d.is_empty())
    }

    fn initialize(&mut self, config: &Config) -> Result<()> {
        let conn = Connection::open().context("X11Backend: Failed to connect")?;
        let monitor = EventMonitor::new().context("X11Backend: Failed to create event monitor")?;
        monitor
            .add(conn.event_fd(), X_FD_TOKEN, EpollFlags::EPOLLIN)
            .context("X11Backend: Failed to watch the X connection")?;
        let window = OwnWindow::create(&conn, &config.window, config.display.double_buffer)
            .context("X11Backend: Failed to create window")?;
        window.map(&conn);

        self.double_buffer = config.display.double_buffer;
        self.monitor = Some(monitor);
        self.window = Some(window);
        self.conn = Some(conn);
        info!("X11Backend initialized (double buffer: {})", self.double_buffer);
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        if let (Some(conn), Some(window)) = (self.conn.as_ref(), self.window.as_mut()) {
            window.destroy(conn);
        }
        self.window = None;
        self.monitor = None;
        if self.conn.take().is_some() {
            debug!("X11Backend: connection released");
        }
        Ok(())
    }

    fn main_loop_wait(&mut self, timeout: Duration) -> Result<WaitOutcome> {
        let Some(conn) = self.conn.as_ref() else {
            return Ok(WaitOutcome::TimedOut);
        };
        // Xlib may already have buffered events the socket no longer signals.
        if conn.pending() > 0 {
            return Ok(WaitOutcome::Ready);
        }
        conn.flush();
        match self.monitor.as_mut() {
            Some(monitor) => Ok(monitor.wait(timeout)?.into()),
            None => Ok(WaitOutcome::TimedOut),
        }
    }

    fn drain_events(&mut self) -> Result<Vec<NativeEvent>> {
        let (Some(conn), Some(window)) = (self.conn.as_ref(), self.window.as_mut()) else {
            return Ok(Vec::new());
        };
        let events = self.pump.drain(conn, window);
        trace!("X11Backend: drained {} events", events.len());
        Ok(events)
    }

    fn draw(&mut self, frame: &Frame<'_>) -> Result<()> {
        let (conn, window) = self.parts()?;
        let surface = Rect::from_parts(Default::default(), frame.geometry.size);
        let clip = if window.double_buffered() {
            surface
        } else {
            frame.damage.bounds(surface)
        };
        let lines: Vec<Vec<u8>> = frame.content.lines.iter().map(|l| latin1_line(l)).collect();
        window.paint(conn, clip, frame.geometry.content_origin(), &lines);
        Ok(())
    }

    fn requires_full_repaint(&self) -> bool {
        self.double_buffer
    }

    fn measure(&self, content: &RenderedContent) -> Size {
        let Some(window) = self.window.as_ref() else {
            return Size::new(content.columns() as u32, content.rows() as u32);
        };
        let width = content
            .lines
            .iter()
            .map(|l| window.text_width(&latin1_line(l)))
            .max()
            .unwrap_or(0);
        Size::new(width, content.rows() as u32 * window.cell_size().height)
    }

    fn workarea(&self) -> Option<Rect> {
        self.conn.as_ref().map(|c| c.workarea())
    }

    fn display_size(&self) -> Option<Size> {
        self.conn.as_ref().map(|c| c.display_size())
    }

    fn cleanup(&mut self) {
        if let Some(conn) = self.conn.as_ref() {
            conn.flush();
        }
    }

    fn sigterm_cleanup(&mut self) {
        // Struts left behind would keep screen space reserved after exit.
        if let (Some(conn), Some(window)) = (self.conn.as_ref(), self.window.as_ref()) {
            if window.is_alive() {
                window.set_struts(conn, &Struts::default());
                conn.flush();
            }
        }
    }

    fn request_geometry(&mut self, request: GeometryRequest) -> Result<()> {
        let (conn, window) = self.parts()?;
        match request {
            GeometryRequest::Resize(size) => window.resize(conn, size),
            GeometryRequest::Move(pos) => window.move_to(conn, pos),
        }
        Ok(())
    }

    fn set_struts(&mut self, struts: &Struts) -> Result<()> {
        let (conn, window) = self.parts()?;
        window.set_struts(conn, struts);
        Ok(())
    }

    fn propagate_pointer(&mut self, notification: &PointerNotification) -> Result<()> {
        let (Some(conn), Some(window)) = (self.conn.as_ref(), self.window.as_ref()) else {
            return Err(anyhow!("X11Backend: not initialized"));
        };
        self.pump.propagate(conn, window.id(), notification)
    }

    fn take_input_focus(&mut self) -> Result<()> {
        let (conn, window) = self.parts()?;
        window.take_focus(conn);
        Ok(())
    }
}

impl Drop for X11Backend {
    fn drop(&mut self) {
        if self.window.as_ref().is_some_and(|w| w.is_alive()) {
            warn!("X11Backend dropped without shutdown; releasing window now");
            let _ = self.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_should_not_detect_without_x_output() {
        let mut config = Config::default();
        config.output.out_to_x = false;
        assert!(!X11Backend::new().detect(&config));
    }

    #[test]
    fn it_should_advertise_every_window_capability() {
        let backend = X11Backend::new();
        assert!(backend.is_graphical());
        assert!(backend
            .capabilities()
            .contains(Capabilities::RESIZE | Capabilities::STRUTS | Capabilities::PROPAGATE));
    }

    #[test]
    fn it_should_reject_window_operations_before_initialize() {
        let mut backend = X11Backend::new();
        assert!(backend.take_input_focus().is_err());
        assert!(backend.drain_events().map(|e| e.is_empty()).unwrap_or(false));
        assert!(backend.shutdown().is_ok());
    }
}

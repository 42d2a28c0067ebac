// src/backends/tui.rs

//! Full-screen terminal output through crossterm.
//!
//! The terminal is put in raw mode on the alternate screen with mouse
//! capture enabled. Terminal mouse reports are fed to the normalizer like any
//! other pointer source; cell coordinates stand in for pixels.

use super::{Backend, BackendKind, Capabilities, Frame, NativeEvent, WaitOutcome};
use crate::config::Config;
use crate::geometry::{Point, Rect};
use crate::input::{Modifiers, PointerKind, PointerNotification, ScrollDirection, CORE_POINTER};
use anyhow::{Context, Result};
use crossterm::event::{
    self, Event, KeyCode, KeyEventKind, KeyModifiers, MouseButton as CtButton, MouseEvent,
    MouseEventKind,
};
use crossterm::{cursor, queue, style, terminal};
use log::{debug, info, trace, warn};
use std::io::{self, IsTerminal, Write};
use std::time::{Duration, Instant};

pub struct TuiBackend {
    active: bool,
    cols: u16,
    rows: u16,
    started: Instant,
}

impl TuiBackend {
    pub fn new() -> Self {
        Self {
            active: false,
            cols: 0,
            rows: 0,
            started: Instant::now(),
        }
    }

    fn surface(&self) -> Rect {
        Rect::new(0, 0, self.cols as u32, self.rows as u32)
    }

    /// Leaves raw mode and the alternate screen. Idempotent.
    fn restore_terminal(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        let mut stdout = io::stdout();
        let restored = crossterm::execute!(
            stdout,
            event::DisableMouseCapture,
            cursor::Show,
            terminal::LeaveAlternateScreen
        );
        let raw = terminal::disable_raw_mode();
        restored.context("TuiBackend: Failed to restore screen")?;
        raw.context("TuiBackend: Failed to leave raw mode")?;
        debug!("TuiBackend: terminal restored");
        Ok(())
    }

    fn translate(&mut self, event: Event) -> Option<NativeEvent> {
        match event {
            Event::Mouse(mouse) => Some(NativeEvent::Pointer(self.pointer(mouse))),
            Event::Resize(cols, rows) => {
                self.cols = cols;
                self.rows = rows;
                Some(NativeEvent::Expose(self.surface()))
            }
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                let ctrl_c = key.code == KeyCode::Char('c')
                    && key.modifiers.contains(KeyModifiers::CONTROL);
                (ctrl_c || key.code == KeyCode::Char('q')).then_some(NativeEvent::CloseRequested)
            }
            _ => None,
        }
    }

    fn pointer(&self, mouse: MouseEvent) -> PointerNotification {
        let kind = match mouse.kind {
            MouseEventKind::Down(button) => PointerKind::ButtonPress(button_code(button)),
            MouseEventKind::Up(button) => PointerKind::ButtonRelease(button_code(button)),
            MouseEventKind::Drag(_) | MouseEventKind::Moved => PointerKind::Motion,
            MouseEventKind::ScrollUp => PointerKind::Axis(ScrollDirection::Up),
            MouseEventKind::ScrollDown => PointerKind::Axis(ScrollDirection::Down),
            MouseEventKind::ScrollLeft => PointerKind::Axis(ScrollDirection::Left),
            MouseEventKind::ScrollRight => PointerKind::Axis(ScrollDirection::Right),
        };
        let pos = Point::new(mouse.column as i32, mouse.row as i32);
        PointerNotification {
            kind,
            serial: None,
            source: CORE_POINTER,
            pos,
            pos_abs: pos,
            modifiers: modifiers(mouse.modifiers),
            time_ms: self.started.elapsed().as_millis() as u64,
        }
    }
}

impl Default for TuiBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn button_code(button: CtButton) -> u32 {
    match button {
        CtButton::Left => 1,
        CtButton::Middle => 2,
        CtButton::Right => 3,
    }
}

fn modifiers(m: KeyModifiers) -> Modifiers {
    let mut out = Modifiers::empty();
    out.set(Modifiers::SHIFT, m.contains(KeyModifiers::SHIFT));
    out.set(Modifiers::CONTROL, m.contains(KeyModifiers::CONTROL));
    out.set(Modifiers::ALT, m.contains(KeyModifiers::ALT));
    out.set(Modifiers::SUPER, m.contains(KeyModifiers::SUPER));
    out
}

impl Backend for TuiBackend {
    fn name(&self) -> &str {
        "ncurses"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Ncurses
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::POINTER
    }

    fn has_event_source(&self) -> bool {
        true
    }

    fn detect(&self, config: &Config) -> bool {
        config.output.out_to_ncurses && io::stdout().is_terminal()
    }

    fn initialize(&mut self, _config: &Config) -> Result<()> {
        let (cols, rows) = terminal::size().context("TuiBackend: Failed to query terminal size")?;
        terminal::enable_raw_mode().context("TuiBackend: Failed to enter raw mode")?;
        self.active = true;
        let mut stdout = io::stdout();
        if let Err(e) = crossterm::execute!(
            stdout,
            terminal::EnterAlternateScreen,
            event::EnableMouseCapture,
            cursor::Hide
        ) {
            let _ = self.restore_terminal();
            return Err(e).context("TuiBackend: Failed to set up the screen");
        }
        self.cols = cols;
        self.rows = rows;
        self.started = Instant::now();
        info!("TuiBackend initialized ({}x{} cells)", cols, rows);
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        self.restore_terminal()
    }

    fn main_loop_wait(&mut self, timeout: Duration) -> Result<WaitOutcome> {
        if !self.active {
            return Ok(WaitOutcome::TimedOut);
        }
        match event::poll(timeout) {
            Ok(true) => Ok(WaitOutcome::Ready),
            Ok(false) => Ok(WaitOutcome::TimedOut),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(WaitOutcome::Interrupted),
            Err(e) => Err(e).context("TuiBackend: Failed to poll terminal events"),
        }
    }

    fn drain_events(&mut self) -> Result<Vec<NativeEvent>> {
        let mut out = Vec::new();
        while self.active && event::poll(Duration::ZERO).context("TuiBackend: poll failed")? {
            let raw = event::read().context("TuiBackend: Failed to read terminal event")?;
            trace!("TuiBackend: {:?}", raw);
            out.extend(self.translate(raw));
        }
        Ok(out)
    }

    fn draw(&mut self, frame: &Frame<'_>) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        let surface = self.surface();
        let damaged_rows = |row: u16| -> bool {
            frame.damage.is_full()
                || frame.damage.rects().iter().any(|r| {
                    let row = row as i32;
                    row >= r.y() && row < r.end_y()
                })
        };

        let mut stdout = io::stdout();
        for row in 0..self.rows {
            if !damaged_rows(row) {
                continue;
            }
            let line = frame
                .content
                .lines
                .get(row as usize)
                .map(|l| l.chars().take(surface.size.width as usize).collect::<String>())
                .unwrap_or_default();
            queue!(
                stdout,
                cursor::MoveTo(0, row),
                terminal::Clear(terminal::ClearType::CurrentLine),
                style::Print(line)
            )
            .context("TuiBackend: Failed to queue line")?;
        }
        stdout.flush().context("TuiBackend: Failed to flush")
    }

    fn cleanup(&mut self) {
        if let Err(e) = self.restore_terminal() {
            warn!("{:#}", e);
        }
    }

    fn sigterm_cleanup(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEvent, MouseEvent};

    fn mouse(kind: MouseEventKind) -> Event {
        Event::Mouse(MouseEvent {
            kind,
            column: 4,
            row: 2,
            modifiers: KeyModifiers::SHIFT,
        })
    }

    #[test]
    fn it_should_map_terminal_mouse_reports() {
        let mut tui = TuiBackend::new();
        let Some(NativeEvent::Pointer(n)) = tui.translate(mouse(MouseEventKind::Down(CtButton::Right))) else {
            panic!("expected a pointer notification");
        };
        assert_eq!(n.kind, PointerKind::ButtonPress(3));
        assert_eq!(n.pos, Point::new(4, 2));
        assert_eq!(n.modifiers, Modifiers::SHIFT);
        assert_eq!(n.serial, None);

        let Some(NativeEvent::Pointer(n)) = tui.translate(mouse(MouseEventKind::ScrollLeft)) else {
            panic!("expected a pointer notification");
        };
        assert_eq!(n.kind, PointerKind::Axis(ScrollDirection::Left));
    }

    #[test]
    fn it_should_expose_the_whole_screen_on_resize() {
        let mut tui = TuiBackend::new();
        assert_eq!(
            tui.translate(Event::Resize(80, 24)),
            Some(NativeEvent::Expose(Rect::new(0, 0, 80, 24)))
        );
    }

    #[test]
    fn it_should_request_close_on_ctrl_c() {
        let mut tui = TuiBackend::new();
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(tui.translate(Event::Key(key)), Some(NativeEvent::CloseRequested));
        let other = KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE);
        assert_eq!(tui.translate(Event::Key(other)), None);
    }
}

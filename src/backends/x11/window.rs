// src/backends/x11/window.rs
#![allow(non_snake_case)] // Allow non-snake case for X11 types

use super::connection::Connection;
use crate::config::{WindowConfig, WindowType};
use crate::geometry::{Point, Rect, Size};
use crate::window::Struts;
use anyhow::{anyhow, Context, Result};
use libc::{c_char, c_int, c_long, c_uint};
use log::{debug, error, info, trace};
use std::ffi::CString;
use std::mem;
use std::ptr;
use x11::xlib;

/// Motif hints flag saying the decorations field is set.
const MWM_HINTS_DECORATIONS: c_long = 1 << 1;

/// Fallback glyph cell when the server font cannot be queried.
const FALLBACK_CELL: Size = Size::new(6, 13);

const EVENT_MASK: c_long = xlib::ExposureMask
    | xlib::StructureNotifyMask
    | xlib::ButtonPressMask
    | xlib::ButtonReleaseMask
    | xlib::PointerMotionMask
    | xlib::EnterWindowMask
    | xlib::LeaveWindowMask;

/// The own window, its graphics context and optional back buffer.
///
/// Server-side resources are released by `destroy`, which the backend calls
/// on every shutdown path before the connection closes.
#[derive(Debug)]
pub struct OwnWindow {
    id: xlib::Window,
    gc: xlib::GC,
    font: *mut xlib::XFontStruct,
    back_buffer: xlib::Pixmap,
    buffer_size: Size,
    double_buffer: bool,
    size: Size,
    foreground: libc::c_ulong,
    background: libc::c_ulong,
}

impl OwnWindow {
    pub fn create(conn: &Connection, config: &WindowConfig, double_buffer: bool) -> Result<Self> {
        let display = conn.display();
        let screen = conn.screen();
        let size = Size::new(config.initial_width.max(1), config.initial_height.max(1));
        info!("Creating X11 window {}x{} ({:?})", size.width, size.height, config.window_type);

        // SAFETY: all calls use the open display from `conn`; attribute
        // struct is zero-initialised before the fields we set.
        let (id, foreground, background) = unsafe {
            let foreground = xlib::XWhitePixel(display, screen);
            let background = xlib::XBlackPixel(display, screen);
            let mut attrs: xlib::XSetWindowAttributes = mem::zeroed();
            attrs.background_pixel = background;
            attrs.border_pixel = background;
            attrs.event_mask = EVENT_MASK;
            attrs.override_redirect = (config.window_type == WindowType::Override) as c_int;
            let id = xlib::XCreateWindow(
                display,
                conn.root(),
                0,
                0,
                size.width as c_uint,
                size.height as c_uint,
                0,
                xlib::CopyFromParent,
                xlib::InputOutput as c_uint,
                ptr::null_mut(),
                xlib::CWBackPixel | xlib::CWBorderPixel | xlib::CWEventMask | xlib::CWOverrideRedirect,
                &mut attrs,
            );
            (id, foreground, background)
        };
        if id == 0 {
            return Err(anyhow!("XCreateWindow failed"));
        }

        // SAFETY: window id is valid; the GC is freed in `destroy`.
        let (gc, font) = unsafe {
            let gc = xlib::XCreateGC(display, id, 0, ptr::null_mut());
            xlib::XSetForeground(display, gc, foreground);
            xlib::XSetBackground(display, gc, background);
            let font = xlib::XQueryFont(display, xlib::XGContextFromGC(gc));
            (gc, font)
        };

        let mut window = Self {
            id,
            gc,
            font,
            back_buffer: 0,
            buffer_size: Size::ZERO,
            double_buffer,
            size,
            foreground,
            background,
        };
        if let Err(e) = window.set_hints(conn, config) {
            window.destroy(conn);
            return Err(e);
        }
        Ok(window)
    }

    fn set_hints(&mut self, conn: &Connection, config: &WindowConfig) -> Result<()> {
        let display = conn.display();
        let atoms = conn.atoms();
        let title = CString::new(config.title.as_str()).context("Window title contains a NUL byte")?;

        // SAFETY: display and window are valid; property buffers outlive the calls.
        unsafe {
            let mut protocols = [atoms.wm_delete_window];
            xlib::XSetWMProtocols(display, self.id, protocols.as_mut_ptr(), 1);

            xlib::XStoreName(display, self.id, title.as_ptr() as *mut c_char);
            xlib::XChangeProperty(
                display,
                self.id,
                atoms.net_wm_name,
                atoms.utf8_string,
                8,
                xlib::PropModeReplace,
                title.as_ptr() as *const u8,
                title.as_bytes().len() as c_int,
            );

            let type_atom = match config.window_type {
                WindowType::Normal => Some(atoms.net_wm_window_type_normal),
                WindowType::Dock | WindowType::Panel => Some(atoms.net_wm_window_type_dock),
                WindowType::Desktop => Some(atoms.net_wm_window_type_desktop),
                WindowType::Utility => Some(atoms.net_wm_window_type_utility),
                WindowType::Override => None,
            };
            if let Some(type_atom) = type_atom {
                let value: [c_long; 1] = [type_atom as c_long];
                xlib::XChangeProperty(
                    display,
                    self.id,
                    atoms.net_wm_window_type,
                    xlib::XA_ATOM,
                    32,
                    xlib::PropModeReplace,
                    value.as_ptr() as *const u8,
                    1,
                );
            }

            if config.undecorated && atoms.motif_wm_hints != 0 {
                // flags, functions, decorations, input_mode, status
                let hints: [c_long; 5] = [MWM_HINTS_DECORATIONS, 0, 0, 0, 0];
                xlib::XChangeProperty(
                    display,
                    self.id,
                    atoms.motif_wm_hints,
                    atoms.motif_wm_hints,
                    32,
                    xlib::PropModeReplace,
                    hints.as_ptr() as *const u8,
                    5,
                );
            }
        }
        debug!("WM hints set for window {}", self.id);
        Ok(())
    }

    pub fn map(&self, conn: &Connection) {
        // SAFETY: window is valid.
        unsafe {
            xlib::XMapWindow(conn.display(), self.id);
        }
        conn.flush();
    }

    #[inline]
    pub fn id(&self) -> xlib::Window {
        self.id
    }

    pub fn is_alive(&self) -> bool {
        self.id != 0
    }

    pub fn double_buffered(&self) -> bool {
        self.double_buffer
    }

    pub fn note_size(&mut self, size: Size) {
        self.size = size;
    }

    pub fn resize(&mut self, conn: &Connection, size: Size) {
        trace!("XResizeWindow {} -> {:?}", self.id, size);
        // SAFETY: window is valid.
        unsafe {
            xlib::XResizeWindow(conn.display(), self.id, size.width.max(1), size.height.max(1));
        }
        self.size = size;
    }

    pub fn move_to(&self, conn: &Connection, pos: Point) {
        trace!("XMoveWindow {} -> {:?}", self.id, pos);
        // SAFETY: window is valid.
        unsafe {
            xlib::XMoveWindow(conn.display(), self.id, pos.x, pos.y);
        }
    }

    /// Window origin in root coordinates, accounting for reparenting by the
    /// window manager.
    pub fn root_position(&self, conn: &Connection) -> Point {
        let (mut x, mut y): (c_int, c_int) = (0, 0);
        let mut child: xlib::Window = 0;
        // SAFETY: out-pointers reference locals.
        unsafe {
            xlib::XTranslateCoordinates(conn.display(), self.id, conn.root(), 0, 0, &mut x, &mut y, &mut child);
        }
        Point::new(x, y)
    }

    pub fn set_struts(&self, conn: &Connection, struts: &Struts) {
        let atoms = conn.atoms();
        let values: Vec<c_long> = struts.values.iter().map(|v| *v as c_long).collect();
        // SAFETY: `values` holds 12 longs, more than either property reads.
        unsafe {
            if atoms.net_wm_strut != 0 {
                xlib::XChangeProperty(
                    conn.display(),
                    self.id,
                    atoms.net_wm_strut,
                    xlib::XA_CARDINAL,
                    32,
                    xlib::PropModeReplace,
                    values.as_ptr() as *const u8,
                    4,
                );
            }
            if atoms.net_wm_strut_partial != 0 {
                xlib::XChangeProperty(
                    conn.display(),
                    self.id,
                    atoms.net_wm_strut_partial,
                    xlib::XA_CARDINAL,
                    32,
                    xlib::PropModeReplace,
                    values.as_ptr() as *const u8,
                    12,
                );
            }
        }
        debug!("Struts set: {:?}", struts.values);
    }

    pub fn take_focus(&self, conn: &Connection) {
        // SAFETY: window is valid.
        unsafe {
            xlib::XSetInputFocus(conn.display(), self.id, xlib::RevertToParent, xlib::CurrentTime);
        }
    }

    /// Size of one character cell of the server's default font.
    pub fn cell_size(&self) -> Size {
        if self.font.is_null() {
            return FALLBACK_CELL;
        }
        // SAFETY: font was returned by XQueryFont and is freed only in destroy.
        let font = unsafe { &*self.font };
        let height = (font.ascent + font.descent).max(1) as u32;
        let width = (font.max_bounds.width as i32).max(1) as u32;
        Size::new(width, height)
    }

    fn ascent(&self) -> i32 {
        if self.font.is_null() {
            return FALLBACK_CELL.height as i32 - 2;
        }
        // SAFETY: as in cell_size.
        unsafe { (*self.font).ascent }
    }

    /// Pixel width of `line` in the default font.
    pub fn text_width(&self, line: &[u8]) -> u32 {
        if self.font.is_null() {
            return line.len() as u32 * FALLBACK_CELL.width;
        }
        // SAFETY: font is valid; the slice bounds the read.
        let w = unsafe { xlib::XTextWidth(self.font, line.as_ptr() as *const c_char, line.len() as c_int) };
        w.max(0) as u32
    }

    fn ensure_back_buffer(&mut self, conn: &Connection) -> xlib::Drawable {
        if !self.double_buffer {
            return self.id;
        }
        if self.back_buffer != 0 && self.buffer_size == self.size {
            return self.back_buffer;
        }
        // SAFETY: window is valid; the old pixmap, if any, is ours.
        unsafe {
            if self.back_buffer != 0 {
                xlib::XFreePixmap(conn.display(), self.back_buffer);
            }
            let depth = xlib::XDefaultDepth(conn.display(), conn.screen()) as c_uint;
            self.back_buffer = xlib::XCreatePixmap(
                conn.display(),
                self.id,
                self.size.width.max(1),
                self.size.height.max(1),
                depth,
            );
        }
        self.buffer_size = self.size;
        debug!("Back buffer (re)created at {:?}", self.size);
        self.back_buffer
    }

    /// Clears `clip` and paints `lines` starting at `origin`, then presents.
    pub fn paint(&mut self, conn: &Connection, clip: Rect, origin: Point, lines: &[Vec<u8>]) {
        if clip.is_empty() {
            return;
        }
        let drawable = self.ensure_back_buffer(conn);
        let display = conn.display();
        let line_height = self.cell_size().height as i32;
        let ascent = self.ascent();
        // SAFETY: drawable and gc are valid; line slices bound every read.
        unsafe {
            let mut rect = x_rectangle(clip);
            xlib::XSetClipRectangles(display, self.gc, 0, 0, &mut rect, 1, xlib::Unsorted);
            xlib::XSetForeground(display, self.gc, self.background);
            xlib::XFillRectangle(display, drawable, self.gc, clip.x(), clip.y(), clip.size.width, clip.size.height);
            xlib::XSetForeground(display, self.gc, self.foreground);
            for (row, line) in lines.iter().enumerate() {
                let baseline = origin.y + row as i32 * line_height + ascent;
                if baseline - ascent >= clip.end_y() || baseline - ascent + line_height <= clip.y() {
                    continue;
                }
                xlib::XDrawString(
                    display,
                    drawable,
                    self.gc,
                    origin.x,
                    baseline,
                    line.as_ptr() as *const c_char,
                    line.len() as c_int,
                );
            }
            xlib::XSetClipMask(display, self.gc, 0);
            if drawable != self.id {
                xlib::XCopyArea(
                    display,
                    drawable,
                    self.id,
                    self.gc,
                    0,
                    0,
                    self.size.width,
                    self.size.height,
                    0,
                    0,
                );
            }
        }
        conn.flush();
    }

    /// Releases the back buffer, GC, font info and window. Idempotent.
    pub fn destroy(&mut self, conn: &Connection) {
        if self.id == 0 {
            return;
        }
        let display = conn.display();
        // SAFETY: every handle below was created on this display and is
        // released exactly once, then zeroed.
        unsafe {
            if self.back_buffer != 0 {
                xlib::XFreePixmap(display, self.back_buffer);
                self.back_buffer = 0;
            }
            if !self.font.is_null() {
                xlib::XFreeFontInfo(ptr::null_mut(), self.font, 1);
                self.font = ptr::null_mut();
            }
            if !self.gc.is_null() {
                xlib::XFreeGC(display, self.gc);
                self.gc = ptr::null_mut();
            }
            xlib::XDestroyWindow(display, self.id);
            xlib::XFlush(display);
        }
        info!("Destroyed X11 window {}", self.id);
        self.id = 0;
    }
}

impl Drop for OwnWindow {
    fn drop(&mut self) {
        if self.id != 0 {
            error!(
                "X11 window {} dropped without destroy; server resources leak until the connection closes",
                self.id
            );
        } else {
            trace!("OwnWindow dropped after destroy");
        }
    }
}

/// Replaces bytes the core font cannot show.
/// Protocol rectangle for `clip`, saturated to the 16-bit wire fields.
pub fn x_rectangle(clip: Rect) -> xlib::XRectangle {
    let coord = |v: i32| v.clamp(i16::MIN as i32, i16::MAX as i32) as i16;
    let extent = |v: u32| v.min(u16::MAX as u32) as u16;
    xlib::XRectangle {
        x: coord(clip.x()),
        y: coord(clip.y()),
        width: extent(clip.size.width),
        height: extent(clip.size.height),
    }
}

pub fn latin1_line(line: &str) -> Vec<u8> {
    line.chars()
        .map(|c| if (c as u32) < 0x100 && !c.is_control() { c as u32 as u8 } else { b'?' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_should_saturate_oversized_clip_rectangles() {
        let r = x_rectangle(Rect::new(-70_000, 12, 70_000, 100_000));
        assert_eq!((r.x, r.y), (i16::MIN, 12));
        assert_eq!((r.width, r.height), (u16::MAX, u16::MAX));

        let r = x_rectangle(Rect::new(3, 4, 640, 480));
        assert_eq!((r.x, r.y, r.width, r.height), (3, 4, 640, 480));
    }

    #[test]
    fn it_should_replace_characters_outside_latin1() {
        assert_eq!(latin1_line("a€é\t"), vec![b'a', b'?', 0xe9, b'?']);
    }

    #[test]
    fn it_should_fall_back_to_a_fixed_cell_without_a_server_font() {
        let window = OwnWindow {
            id: 0,
            gc: ptr::null_mut(),
            font: ptr::null_mut(),
            back_buffer: 0,
            buffer_size: Size::ZERO,
            double_buffer: false,
            size: Size::ZERO,
            foreground: 0,
            background: 0,
        };
        assert!(!window.is_alive());
        assert_eq!(window.cell_size(), FALLBACK_CELL);
        assert_eq!(window.text_width(b"abc"), 18);
    }
}

// src/backends/x11/connection.rs
#![allow(non_snake_case)] // Allow non-snake case for X11 types

use crate::geometry::{Rect, Size};
use anyhow::{anyhow, Result};
use libc::{c_char, c_int};
use log::{debug, info, warn};
use std::os::unix::io::RawFd;
use std::ptr;
use x11::xlib;

/// Owns the raw `Display` pointer and closes it on drop.
#[derive(Debug)]
struct ManagedDisplay {
    ptr: *mut xlib::Display,
}

impl ManagedDisplay {
    fn open() -> Result<Self> {
        // SAFETY: a null name makes Xlib read $DISPLAY. The result is checked.
        let ptr = unsafe { xlib::XOpenDisplay(ptr::null()) };
        if ptr.is_null() {
            return Err(anyhow!(
                "Failed to open X display. Check DISPLAY environment variable or X server status."
            ));
        }
        debug!("X display opened: {:p}", ptr);
        Ok(Self { ptr })
    }
}

impl Drop for ManagedDisplay {
    fn drop(&mut self) {
        if self.ptr.is_null() {
            return;
        }
        info!("Closing X11 display connection: {:p}", self.ptr);
        // SAFETY: ptr came from XOpenDisplay and is closed exactly once here.
        unsafe {
            xlib::XCloseDisplay(self.ptr);
        }
        self.ptr = ptr::null_mut();
    }
}

/// Atoms interned once per connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct Atoms {
    pub wm_protocols: xlib::Atom,
    pub wm_delete_window: xlib::Atom,
    pub net_wm_name: xlib::Atom,
    pub utf8_string: xlib::Atom,
    pub net_wm_window_type: xlib::Atom,
    pub net_wm_window_type_normal: xlib::Atom,
    pub net_wm_window_type_dock: xlib::Atom,
    pub net_wm_window_type_desktop: xlib::Atom,
    pub net_wm_window_type_utility: xlib::Atom,
    pub net_wm_strut: xlib::Atom,
    pub net_wm_strut_partial: xlib::Atom,
    pub motif_wm_hints: xlib::Atom,
}

impl Atoms {
    fn intern(display: *mut xlib::Display) -> Self {
        let atom = |name: &[u8]| -> xlib::Atom {
            // SAFETY: `name` is NUL-terminated and display is open.
            unsafe { xlib::XInternAtom(display, name.as_ptr() as *const c_char, xlib::False) }
        };
        Self {
            wm_protocols: atom(b"WM_PROTOCOLS\0"),
            wm_delete_window: atom(b"WM_DELETE_WINDOW\0"),
            net_wm_name: atom(b"_NET_WM_NAME\0"),
            utf8_string: atom(b"UTF8_STRING\0"),
            net_wm_window_type: atom(b"_NET_WM_WINDOW_TYPE\0"),
            net_wm_window_type_normal: atom(b"_NET_WM_WINDOW_TYPE_NORMAL\0"),
            net_wm_window_type_dock: atom(b"_NET_WM_WINDOW_TYPE_DOCK\0"),
            net_wm_window_type_desktop: atom(b"_NET_WM_WINDOW_TYPE_DESKTOP\0"),
            net_wm_window_type_utility: atom(b"_NET_WM_WINDOW_TYPE_UTILITY\0"),
            net_wm_strut: atom(b"_NET_WM_STRUT\0"),
            net_wm_strut_partial: atom(b"_NET_WM_STRUT_PARTIAL\0"),
            motif_wm_hints: atom(b"_MOTIF_WM_HINTS\0"),
        }
    }
}

/// An open connection to the X server with the default screen's identifiers.
#[derive(Debug)]
pub struct Connection {
    display: ManagedDisplay,
    screen: c_int,
    root: xlib::Window,
    atoms: Atoms,
}

impl Connection {
    pub fn open() -> Result<Self> {
        info!("Establishing X11 server connection.");
        let display = ManagedDisplay::open()?;
        // SAFETY: the display was opened above; these are plain accessors.
        let (screen, root) = unsafe {
            let screen = xlib::XDefaultScreen(display.ptr);
            (screen, xlib::XRootWindow(display.ptr, screen))
        };
        let atoms = Atoms::intern(display.ptr);
        debug!("X11 screen {}, root window {}", screen, root);
        Ok(Self {
            display,
            screen,
            root,
            atoms,
        })
    }

    /// Raw display pointer. Valid until the connection is dropped.
    #[inline]
    pub fn display(&self) -> *mut xlib::Display {
        self.display.ptr
    }

    #[inline]
    pub fn screen(&self) -> c_int {
        self.screen
    }

    #[inline]
    pub fn root(&self) -> xlib::Window {
        self.root
    }

    #[inline]
    pub fn atoms(&self) -> &Atoms {
        &self.atoms
    }

    /// Descriptor that becomes readable when the server sends events.
    pub fn event_fd(&self) -> RawFd {
        // SAFETY: display is open for the lifetime of self.
        unsafe { xlib::XConnectionNumber(self.display()) }
    }

    pub fn display_size(&self) -> Size {
        // SAFETY: display is open; screen is its default screen.
        let (w, h) = unsafe {
            (
                xlib::XDisplayWidth(self.display(), self.screen),
                xlib::XDisplayHeight(self.display(), self.screen),
            )
        };
        Size::new(w.max(0) as u32, h.max(0) as u32)
    }

    /// `_NET_WORKAREA` of the current desktop, or the whole display when the
    /// window manager does not publish one.
    pub fn workarea(&self) -> Rect {
        let full = Rect::from_parts(Default::default(), self.display_size());
        let atom = unsafe {
            // SAFETY: NUL-terminated name on an open display.
            xlib::XInternAtom(self.display(), b"_NET_WORKAREA\0".as_ptr() as *const c_char, xlib::True)
        };
        if atom == 0 {
            return full;
        }
        match self.cardinal_property(self.root, atom, 4) {
            Some(v) if v[2] > 0 && v[3] > 0 => Rect::new(v[0] as i32, v[1] as i32, v[2] as u32, v[3] as u32),
            _ => {
                debug!("No usable _NET_WORKAREA, using the full display");
                full
            }
        }
    }

    /// Reads the first `count` 32-bit items of a CARDINAL property.
    fn cardinal_property(&self, window: xlib::Window, atom: xlib::Atom, count: usize) -> Option<Vec<i64>> {
        let mut actual_type: xlib::Atom = 0;
        let mut actual_format: c_int = 0;
        let mut nitems: libc::c_ulong = 0;
        let mut bytes_after: libc::c_ulong = 0;
        let mut data: *mut u8 = ptr::null_mut();
        // SAFETY: out-pointers reference locals; `data` is freed below.
        let status = unsafe {
            xlib::XGetWindowProperty(
                self.display(),
                window,
                atom,
                0,
                count as libc::c_long,
                xlib::False,
                xlib::XA_CARDINAL,
                &mut actual_type,
                &mut actual_format,
                &mut nitems,
                &mut bytes_after,
                &mut data,
            )
        };
        if status != xlib::Success as c_int || data.is_null() {
            return None;
        }
        // Format-32 properties are returned as an array of C longs.
        let values = if actual_format == 32 && nitems as usize >= count {
            // SAFETY: Xlib guarantees `nitems` longs at `data` for format 32.
            let longs = unsafe { std::slice::from_raw_parts(data as *const libc::c_long, count) };
            Some(longs.iter().map(|v| *v as i64).collect())
        } else {
            warn!("Unexpected property format {} with {} items", actual_format, nitems);
            None
        };
        // SAFETY: data was allocated by XGetWindowProperty.
        unsafe {
            xlib::XFree(data as *mut libc::c_void);
        }
        values
    }

    pub fn flush(&self) {
        // SAFETY: display is open.
        unsafe {
            xlib::XFlush(self.display());
        }
    }

    /// Number of events already read from the socket and queued by Xlib.
    pub fn pending(&self) -> c_int {
        // SAFETY: display is open.
        unsafe { xlib::XPending(self.display()) }
    }
}

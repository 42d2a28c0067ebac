// src/backends/x11/event.rs
#![allow(non_snake_case)] // Allow non-snake case for X11 types

use super::connection::Connection;
use super::window::OwnWindow;
use crate::backends::NativeEvent;
use crate::geometry::{Point, Rect, Size};
use crate::input::{Modifiers, PointerKind, PointerNotification, CORE_POINTER};
use anyhow::{anyhow, Result};
use libc::{c_int, c_uint};
use log::{debug, trace, warn};
use std::collections::HashMap;
use std::mem;
use std::ptr;
use std::slice;
use x11::xlib;

/// Maps a core-protocol state mask onto our modifier set.
pub fn modifiers_from_state(state: c_uint) -> Modifiers {
    let mut m = Modifiers::empty();
    let pairs = [
        (xlib::ShiftMask, Modifiers::SHIFT),
        (xlib::ControlMask, Modifiers::CONTROL),
        (xlib::Mod1Mask, Modifiers::ALT),
        (xlib::Mod4Mask, Modifiers::SUPER),
        (xlib::LockMask, Modifiers::CAPS_LOCK),
        (xlib::Mod2Mask, Modifiers::NUM_LOCK),
        (xlib::Button1Mask, Modifiers::BUTTON1),
        (xlib::Button2Mask, Modifiers::BUTTON2),
        (xlib::Button3Mask, Modifiers::BUTTON3),
        (xlib::Button4Mask, Modifiers::BUTTON4),
        (xlib::Button5Mask, Modifiers::BUTTON5),
    ];
    for (mask, flag) in pairs {
        if state & mask != 0 {
            m |= flag;
        }
    }
    m
}

/// Pointer fields shared by every core pointer event.
struct PointerFields {
    serial: u64,
    pos: Point,
    pos_abs: Point,
    state: c_uint,
    time: xlib::Time,
}

fn notification(kind: PointerKind, f: PointerFields) -> PointerNotification {
    PointerNotification {
        kind,
        serial: Some(f.serial),
        source: CORE_POINTER,
        pos: f.pos,
        pos_abs: f.pos_abs,
        modifiers: modifiers_from_state(f.state),
        time_ms: f.time as u64,
    }
}

/// Translates one event addressed to our window. Returns `None` for events
/// we do not act on.
fn translate(conn: &Connection, window: &mut OwnWindow, xevent: &xlib::XEvent) -> Option<NativeEvent> {
    // SAFETY: each arm reads only the union member matching `type_`.
    unsafe {
        match xevent.type_ {
            xlib::Expose => {
                let e = xevent.expose;
                Some(NativeEvent::Expose(Rect::new(e.x, e.y, e.width as u32, e.height as u32)))
            }
            xlib::ConfigureNotify => {
                let e = xevent.configure;
                let size = Size::new(e.width.max(0) as u32, e.height.max(0) as u32);
                window.note_size(size);
                // Reparenting window managers report parent-relative positions.
                let pos = window.root_position(conn);
                Some(NativeEvent::Configure { pos, size })
            }
            xlib::ClientMessage => {
                let e = xevent.client_message;
                let atoms = conn.atoms();
                if e.message_type == atoms.wm_protocols
                    && e.data.get_long(0) as xlib::Atom == atoms.wm_delete_window
                {
                    debug!("WM_DELETE_WINDOW received");
                    Some(NativeEvent::CloseRequested)
                } else {
                    None
                }
            }
            xlib::ButtonPress | xlib::ButtonRelease => {
                let e = xevent.button;
                let kind = if xevent.type_ == xlib::ButtonPress {
                    PointerKind::ButtonPress(e.button)
                } else {
                    PointerKind::ButtonRelease(e.button)
                };
                Some(NativeEvent::Pointer(notification(
                    kind,
                    PointerFields {
                        serial: e.serial as u64,
                        pos: Point::new(e.x, e.y),
                        pos_abs: Point::new(e.x_root, e.y_root),
                        state: e.state,
                        time: e.time,
                    },
                )))
            }
            xlib::MotionNotify => {
                let e = xevent.motion;
                Some(NativeEvent::Pointer(notification(
                    PointerKind::Motion,
                    PointerFields {
                        serial: e.serial as u64,
                        pos: Point::new(e.x, e.y),
                        pos_abs: Point::new(e.x_root, e.y_root),
                        state: e.state,
                        time: e.time,
                    },
                )))
            }
            xlib::EnterNotify | xlib::LeaveNotify => {
                let e = xevent.crossing;
                let kind = if xevent.type_ == xlib::EnterNotify {
                    PointerKind::Enter
                } else {
                    PointerKind::Leave
                };
                Some(NativeEvent::Pointer(notification(
                    kind,
                    PointerFields {
                        serial: e.serial as u64,
                        pos: Point::new(e.x, e.y),
                        pos_abs: Point::new(e.x_root, e.y_root),
                        state: e.state,
                        time: e.time,
                    },
                )))
            }
            xlib::ReparentNotify | xlib::MapNotify | xlib::UnmapNotify => None,
            other => {
                trace!("Unhandled X event type {}", other);
                None
            }
        }
    }
}

/// Identifies one pointer report within a drain. The request serial alone
/// is shared by every event received between two client requests, so a
/// press and its release usually carry the same one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct RawKey {
    serial: u64,
    kind: PointerKind,
    time_ms: u64,
}

impl RawKey {
    fn of(n: &PointerNotification) -> Option<Self> {
        Some(Self {
            serial: n.serial?,
            kind: n.kind,
            time_ms: n.time_ms,
        })
    }
}

/// Raw events behind the pointer notifications of the current drain.
#[derive(Default)]
struct RawPointerLog {
    events: HashMap<RawKey, xlib::XEvent>,
}

impl RawPointerLog {
    fn clear(&mut self) {
        self.events.clear();
    }

    /// Keeps the first raw event for a key; later identical reports are
    /// dropped as duplicates before they could be propagated.
    fn record(&mut self, n: &PointerNotification, raw: xlib::XEvent) {
        if let Some(key) = RawKey::of(n) {
            self.events.entry(key).or_insert(raw);
        }
    }

    fn lookup(&self, n: &PointerNotification) -> Option<&xlib::XEvent> {
        RawKey::of(n).and_then(|key| self.events.get(&key))
    }
}

/// Drains the Xlib queue, remembering raw pointer events so that
/// unconsumed ones can be forwarded to the window below.
#[derive(Default)]
pub struct EventPump {
    raw_pointer: RawPointerLog,
}

impl EventPump {
    pub fn drain(&mut self, conn: &Connection, window: &mut OwnWindow) -> Vec<NativeEvent> {
        self.raw_pointer.clear();
        let display = conn.display();
        let mut out = Vec::new();
        while conn.pending() > 0 {
            // SAFETY: XPending reported a queued event, so XNextEvent does
            // not block; the zeroed XEvent is a valid out-buffer.
            let xevent = unsafe {
                let mut xevent: xlib::XEvent = mem::zeroed();
                xlib::XNextEvent(display, &mut xevent);
                xevent
            };
            // SAFETY: `any` is valid for every event type.
            let target = unsafe { xevent.any.window };
            if target != window.id() {
                continue;
            }
            let Some(native) = translate(conn, window, &xevent) else {
                continue;
            };
            if let NativeEvent::Pointer(n) = &native {
                self.raw_pointer.record(n, xevent);
            }
            out.push(native);
        }
        out
    }

    /// Forwards the raw event behind `notification` to the topmost viewable
    /// top-level window under the pointer, other than ours.
    pub fn propagate(
        &self,
        conn: &Connection,
        own: xlib::Window,
        notification: &PointerNotification,
    ) -> Result<()> {
        let serial = notification
            .serial
            .ok_or_else(|| anyhow!("X11: pointer notification has no serial"))?;
        let Some(raw) = self.raw_pointer.lookup(notification) else {
            return Err(anyhow!("X11: no raw {:?} recorded for serial {}", notification.kind, serial));
        };
        let Some(target) = window_at(conn, own, notification.pos_abs) else {
            debug!("No window below {:?}; dropping event", notification.pos_abs);
            return Ok(());
        };

        let mut forwarded = *raw;
        let (x, y) = relative_to(conn, target, notification.pos_abs);
        // SAFETY: only the member matching `type_` is written.
        unsafe {
            match forwarded.type_ {
                xlib::ButtonPress | xlib::ButtonRelease => {
                    forwarded.button.window = target;
                    forwarded.button.subwindow = 0;
                    forwarded.button.x = x;
                    forwarded.button.y = y;
                }
                xlib::MotionNotify => {
                    forwarded.motion.window = target;
                    forwarded.motion.subwindow = 0;
                    forwarded.motion.x = x;
                    forwarded.motion.y = y;
                }
                xlib::EnterNotify | xlib::LeaveNotify => {
                    forwarded.crossing.window = target;
                    forwarded.crossing.subwindow = 0;
                    forwarded.crossing.x = x;
                    forwarded.crossing.y = y;
                }
                _ => {}
            }
            let event_mask = event_mask_for(forwarded.type_);
            if xlib::XSendEvent(conn.display(), target, xlib::True, event_mask, &mut forwarded) == 0 {
                warn!("XSendEvent to window {} failed", target);
            }
        }
        conn.flush();
        trace!("Propagated serial {} to window {}", serial, target);
        Ok(())
    }
}

fn event_mask_for(event_type: c_int) -> libc::c_long {
    match event_type {
        xlib::ButtonPress => xlib::ButtonPressMask,
        xlib::ButtonRelease => xlib::ButtonReleaseMask,
        xlib::MotionNotify => xlib::PointerMotionMask,
        xlib::EnterNotify => xlib::EnterWindowMask,
        xlib::LeaveNotify => xlib::LeaveWindowMask,
        _ => xlib::NoEventMask,
    }
}

/// Root point translated into `target`'s coordinates.
fn relative_to(conn: &Connection, target: xlib::Window, root_pos: Point) -> (c_int, c_int) {
    let (mut x, mut y): (c_int, c_int) = (0, 0);
    let mut child: xlib::Window = 0;
    // SAFETY: out-pointers reference locals.
    unsafe {
        xlib::XTranslateCoordinates(
            conn.display(),
            conn.root(),
            target,
            root_pos.x,
            root_pos.y,
            &mut x,
            &mut y,
            &mut child,
        );
    }
    (x, y)
}

/// Topmost viewable child of the root containing `pos`, skipping `own`.
fn window_at(conn: &Connection, own: xlib::Window, pos: Point) -> Option<xlib::Window> {
    let display = conn.display();
    let mut root_ret: xlib::Window = 0;
    let mut parent_ret: xlib::Window = 0;
    let mut children: *mut xlib::Window = ptr::null_mut();
    let mut count: c_uint = 0;
    // SAFETY: out-pointers reference locals; `children` is freed below.
    let ok = unsafe {
        xlib::XQueryTree(
            display,
            conn.root(),
            &mut root_ret,
            &mut parent_ret,
            &mut children,
            &mut count,
        )
    };
    if ok == 0 || children.is_null() {
        return None;
    }
    // SAFETY: XQueryTree returned `count` windows at `children`, bottom to top.
    let stack = unsafe { slice::from_raw_parts(children, count as usize) }.to_vec();
    // SAFETY: allocated by XQueryTree.
    unsafe {
        xlib::XFree(children as *mut libc::c_void);
    }

    stack.into_iter().rev().filter(|w| *w != own).find(|w| {
        // SAFETY: zeroed attributes struct is a valid out-buffer.
        let mut attrs: xlib::XWindowAttributes = unsafe { mem::zeroed() };
        let ok = unsafe { xlib::XGetWindowAttributes(display, *w, &mut attrs) };
        ok != 0
            && attrs.map_state == xlib::IsViewable
            && attrs.class == xlib::InputOutput
            && Rect::new(attrs.x, attrs.y, attrs.width.max(0) as u32, attrs.height.max(0) as u32)
                .contains(pos)
    })
}

// src/input/mod.rs

//! Normalizes native pointer reports from every backend into one event model
//! and runs the consume/propagate contract with the scripting layer.
//!
//! Each backend owns one `InputNormalizer`. The normalizer:
//! - drops reports whose (serial, kind, source) was already seen inside the
//!   debounce window,
//! - redirects legacy wheel button codes to scroll events,
//! - emits crossing events only when the "cursor inside" state flips, so a
//!   backend that reports the same transition through two event classes
//!   still produces one crossing,
//! - dispatches the resulting envelopes to the script hook and decides
//!   whether the native event is swallowed or re-injected below us.

pub mod debounce;
pub mod event;

pub use debounce::{DebounceKey, Debouncer};
pub use event::{
    ButtonAction, Crossing, DeviceId, Modifiers, MouseButton, MouseEvent, MouseEventKind,
    PointerKind, PointerKindTag, PointerNotification, ScrollDirection, CORE_POINTER,
};

use crate::config::{Config, WindowType};
use crate::geometry::Rect;
use crate::script::ScriptHook;
use log::{debug, trace, warn};

/// What the backend must do with the native event after dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Swallow the native event. `take_focus` asks the backend to move input
    /// focus to our own window.
    Consumed { take_focus: bool },
    /// Re-inject the native event toward the next window in stacking order.
    Propagate,
    /// A duplicate report. Treated as consumed with no effect.
    Duplicate,
}

#[derive(Debug)]
pub struct InputNormalizer {
    debouncer: Debouncer,
    cursor_inside: bool,
    window_type: WindowType,
    undecorated: bool,
}

impl InputNormalizer {
    pub fn new(config: &Config) -> Self {
        Self {
            debouncer: Debouncer::new(
                config.input.debounce_window_ms,
                config.input.debounce_capacity,
            ),
            cursor_inside: false,
            window_type: config.window.window_type,
            undecorated: config.window.undecorated,
        }
    }

    pub fn cursor_inside(&self) -> bool {
        self.cursor_inside
    }

    /// Translates one native report into zero or more envelopes, updating the
    /// crossing state. `window` is the window's rectangle in root coordinates;
    /// an empty rectangle means the backend has no notion of outside.
    pub fn translate(&mut self, n: &PointerNotification, window: Rect) -> Vec<MouseEvent> {
        let envelope = |kind| MouseEvent {
            kind,
            pos: n.pos,
            pos_abs: n.pos_abs,
            modifiers: n.modifiers,
            time_ms: n.time_ms,
        };
        let crossing = |crossing| envelope(MouseEventKind::Crossing { crossing });

        let mut out = Vec::with_capacity(2);
        match n.kind {
            PointerKind::Motion => {
                let inside = window.is_empty() || window.contains(n.pos_abs);
                if inside != self.cursor_inside {
                    self.cursor_inside = inside;
                    out.push(crossing(if inside { Crossing::Enter } else { Crossing::Leave }));
                }
                if inside {
                    out.push(envelope(MouseEventKind::Move));
                }
            }
            PointerKind::Enter => {
                if !self.cursor_inside {
                    self.cursor_inside = true;
                    out.push(crossing(Crossing::Enter));
                }
            }
            PointerKind::Leave => {
                if self.cursor_inside {
                    self.cursor_inside = false;
                    out.push(crossing(Crossing::Leave));
                }
            }
            PointerKind::ButtonPress(code) => match ScrollDirection::from_legacy_code(code) {
                Some(direction) => out.push(envelope(MouseEventKind::Scroll { direction })),
                None => out.push(envelope(MouseEventKind::Button {
                    action: ButtonAction::Press,
                    button: MouseButton::from_code(code),
                })),
            },
            PointerKind::ButtonRelease(code) => {
                // Wheel steps are reported once, on press.
                if ScrollDirection::from_legacy_code(code).is_none() {
                    out.push(envelope(MouseEventKind::Button {
                        action: ButtonAction::Release,
                        button: MouseButton::from_code(code),
                    }));
                }
            }
            PointerKind::Axis(direction) => {
                out.push(envelope(MouseEventKind::Scroll { direction }));
            }
        }
        out
    }

    /// Runs one native report through dedup, translation, and dispatch.
    pub fn handle(
        &mut self,
        n: &PointerNotification,
        window: Rect,
        hook: &mut dyn ScriptHook,
    ) -> DispatchOutcome {
        if let Some(serial) = n.serial {
            let key = DebounceKey {
                serial,
                kind: n.kind.tag(),
                source: n.source,
            };
            if self.debouncer.check_and_record(key, n.time_ms) {
                return DispatchOutcome::Duplicate;
            }
        }

        let events = self.translate(n, window);
        if events.is_empty() {
            trace!("InputNormalizer: {:?} produced no envelope", n.kind);
            return DispatchOutcome::Consumed { take_focus: false };
        }

        let mut consumed = false;
        let mut had_press = false;
        for event in &events {
            consumed = match hook.dispatch_mouse(event) {
                Ok(consumed) => consumed,
                Err(e) => {
                    warn!("Mouse hook failed for {:?}: {:#}. Propagating event.", event.kind, e);
                    false
                }
            };
            had_press |= matches!(
                event.kind,
                MouseEventKind::Button {
                    action: ButtonAction::Press,
                    ..
                }
            );
        }

        consumed = self.apply_category_policy(consumed);
        if consumed {
            let take_focus = had_press && self.window_type.captures_input_focus();
            debug!(
                "InputNormalizer: {:?} consumed (take_focus: {})",
                events.last().map(|e| e.kind),
                take_focus
            );
            DispatchOutcome::Consumed { take_focus }
        } else {
            DispatchOutcome::Propagate
        }
    }

    /// Decorated normal/utility windows always keep their input; a desktop
    /// window sits at the bottom of the stack with nothing to propagate to.
    fn apply_category_policy(&self, consumed: bool) -> bool {
        match self.window_type {
            WindowType::Normal | WindowType::Utility if !self.undecorated => true,
            WindowType::Desktop => true,
            _ => consumed,
        }
    }
}

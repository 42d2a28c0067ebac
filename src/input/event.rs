// src/input/event.rs

//! Pointer event types: the native notifications backends hand to the
//! normalizer, and the closed envelope set the scripting layer receives.

use crate::geometry::Point;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Keyboard modifiers and held pointer buttons at the time of an event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Modifiers: u16 {
        const SHIFT = 1 << 0;
        const CONTROL = 1 << 1;
        const ALT = 1 << 2; // Mod1 on X11
        const SUPER = 1 << 3; // Mod4 on X11
        const CAPS_LOCK = 1 << 4;
        const NUM_LOCK = 1 << 5;
        const BUTTON1 = 1 << 8;
        const BUTTON2 = 1 << 9;
        const BUTTON3 = 1 << 10;
        const BUTTON4 = 1 << 11;
        const BUTTON5 = 1 << 12;
    }
}

/// Identifier of the physical or logical device that produced a report.
pub type DeviceId = u32;

/// Device id used by backends whose protocol has a single core pointer.
pub const CORE_POINTER: DeviceId = 2;

/// First legacy button code that encodes a wheel step instead of a button.
pub const LEGACY_SCROLL_FIRST: u32 = 4;
/// Last legacy wheel code (inclusive).
pub const LEGACY_SCROLL_LAST: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
}

impl ScrollDirection {
    /// Maps a legacy wheel button code to its direction. The first pair of
    /// reserved codes is vertical, the second pair horizontal; within a pair
    /// the lower code is up/left.
    pub fn from_legacy_code(code: u32) -> Option<Self> {
        if !(LEGACY_SCROLL_FIRST..=LEGACY_SCROLL_LAST).contains(&code) {
            return None;
        }
        let offset = code - LEGACY_SCROLL_FIRST;
        let horizontal = offset >= 2;
        let negative = offset % 2 == 0;
        Some(match (horizontal, negative) {
            (false, true) => ScrollDirection::Up,
            (false, false) => ScrollDirection::Down,
            (true, true) => ScrollDirection::Left,
            (true, false) => ScrollDirection::Right,
        })
    }
}

/// A pointer button, identified by its legacy code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    Back,
    Forward,
    Other(u32),
}

impl MouseButton {
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => MouseButton::Left,
            2 => MouseButton::Middle,
            3 => MouseButton::Right,
            8 => MouseButton::Back,
            9 => MouseButton::Forward,
            other => MouseButton::Other(other),
        }
    }

    pub fn code(self) -> u32 {
        match self {
            MouseButton::Left => 1,
            MouseButton::Middle => 2,
            MouseButton::Right => 3,
            MouseButton::Back => 8,
            MouseButton::Forward => 9,
            MouseButton::Other(code) => code,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonAction {
    Press,
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Crossing {
    Enter,
    Leave,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MouseEventKind {
    Move,
    Button {
        action: ButtonAction,
        button: MouseButton,
    },
    Scroll {
        direction: ScrollDirection,
    },
    Crossing {
        crossing: Crossing,
    },
}

/// The normalized envelope handed to the scripting layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MouseEvent {
    pub kind: MouseEventKind,
    /// Position relative to the window origin.
    pub pos: Point,
    /// Position relative to the root of the screen.
    pub pos_abs: Point,
    pub modifiers: Modifiers,
    /// Milliseconds, in the clock of the originating backend.
    pub time_ms: u64,
}

impl MouseEvent {
    pub fn is_button(&self) -> bool {
        matches!(self.kind, MouseEventKind::Button { .. })
    }
}

/// What a backend observed, before normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerKind {
    Motion,
    ButtonPress(u32),
    ButtonRelease(u32),
    /// A native wheel/axis report that already carries a direction.
    Axis(ScrollDirection),
    Enter,
    Leave,
}

/// The payload-free discriminant used in duplicate-suppression keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerKindTag {
    Motion,
    ButtonPress,
    ButtonRelease,
    Axis,
    Enter,
    Leave,
}

impl PointerKind {
    pub fn tag(self) -> PointerKindTag {
        match self {
            PointerKind::Motion => PointerKindTag::Motion,
            PointerKind::ButtonPress(_) => PointerKindTag::ButtonPress,
            PointerKind::ButtonRelease(_) => PointerKindTag::ButtonRelease,
            PointerKind::Axis(_) => PointerKindTag::Axis,
            PointerKind::Enter => PointerKindTag::Enter,
            PointerKind::Leave => PointerKindTag::Leave,
        }
    }
}

/// A native pointer report as delivered by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerNotification {
    pub kind: PointerKind,
    /// Protocol serial, if the protocol has one. Reports without a serial are
    /// never treated as duplicates.
    pub serial: Option<u64>,
    pub source: DeviceId,
    pub pos: Point,
    pub pos_abs: Point,
    pub modifiers: Modifiers,
    pub time_ms: u64,
}

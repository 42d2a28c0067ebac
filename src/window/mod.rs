// src/window/mod.rs

//! Window geometry negotiation with an external window manager.
//!
//! The reconciler owns the geometry it believes the window has. Each content
//! refresh it computes the size the content needs and the position the
//! alignment asks for, and emits requests for whatever differs. Window-manager
//! notifications are folded back in through `observe_configure`. When a
//! notification contradicts a request we made, the affected axis latches:
//! from then on the window manager owns it and we only track what it reports.

pub mod alignment;
pub mod struts;

pub use alignment::apply_window_alignment;
pub use struts::{StrutEdge, Struts};

use crate::config::{Alignment, Config};
use crate::geometry::{Point, Rect, Size};
use log::{debug, trace};
use serde::Serialize;

/// Position, size, and border inset of the own window, in root coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct WindowGeometry {
    pub pos: Point,
    pub size: Size,
    pub border: u32,
}

impl WindowGeometry {
    pub fn rect(&self) -> Rect {
        Rect::from_parts(self.pos, self.size)
    }

    /// Offset of the content area from the window origin.
    pub fn content_origin(&self) -> Point {
        Point::new(self.border as i32, self.border as i32)
    }

    pub fn content_size(&self) -> Size {
        self.size.deflate(self.border)
    }
}

/// Which axes the window manager has taken over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LatchState {
    #[default]
    Free,
    FixedSize,
    FixedPos,
    FixedBoth,
}

impl LatchState {
    pub fn size_fixed(self) -> bool {
        matches!(self, LatchState::FixedSize | LatchState::FixedBoth)
    }

    pub fn pos_fixed(self) -> bool {
        matches!(self, LatchState::FixedPos | LatchState::FixedBoth)
    }

    fn with_size_fixed(self) -> Self {
        if self.pos_fixed() {
            LatchState::FixedBoth
        } else {
            LatchState::FixedSize
        }
    }

    fn with_pos_fixed(self) -> Self {
        if self.size_fixed() {
            LatchState::FixedBoth
        } else {
            LatchState::FixedPos
        }
    }
}

/// A change the backend should ask the window system for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryRequest {
    Resize(Size),
    Move(Point),
}

/// Result of one reconciliation step.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub requests: Vec<GeometryRequest>,
    /// The believed geometry changed. Struts and the script's window table
    /// need refreshing.
    pub changed: bool,
}

#[derive(Debug)]
pub struct GeometryReconciler {
    geometry: WindowGeometry,
    latch: LatchState,
    /// Content size from the last reconcile. Zero until content exists.
    content: Size,
    last_requested_size: Option<Size>,
    last_requested_pos: Option<Point>,
    maximum_width: u32,
    alignment: Alignment,
    gap_x: i32,
    gap_y: i32,
    position_latch_threshold: u32,
    updates: u32,
}

impl GeometryReconciler {
    pub fn new(config: &Config, initial: WindowGeometry) -> Self {
        Self {
            geometry: initial,
            latch: LatchState::Free,
            content: Size::ZERO,
            last_requested_size: None,
            last_requested_pos: None,
            maximum_width: config.display.maximum_width,
            alignment: config.display.alignment,
            gap_x: config.display.gap_x,
            gap_y: config.display.gap_y,
            position_latch_threshold: config.geometry.position_latch_threshold,
            updates: 0,
        }
    }

    /// Hands the position axis to the window system from the start, for
    /// backends that cannot place their window. Only sizes are requested and
    /// the position is whatever the backend reports.
    pub fn with_position_fixed(mut self) -> Self {
        self.latch = self.latch.with_pos_fixed();
        self
    }

    pub fn geometry(&self) -> WindowGeometry {
        self.geometry
    }

    pub fn latch(&self) -> LatchState {
        self.latch
    }

    pub fn alignment(&self) -> Alignment {
        self.alignment
    }

    fn clamp_content(&self, content: Size) -> Size {
        if self.maximum_width > 0 && content.width > self.maximum_width {
            Size::new(self.maximum_width, content.height)
        } else {
            content
        }
    }

    /// Computes the desired geometry for `content` on `workarea` and returns
    /// the requests needed to reach it. Called once per content refresh.
    pub fn reconcile(&mut self, content: Size, workarea: Rect) -> Reconciliation {
        self.updates = self.updates.saturating_add(1);
        let content = self.clamp_content(content);
        self.content = content;

        let mut out = Reconciliation::default();
        let border = self.geometry.border;

        if !self.latch.size_fixed() {
            let desired = content.inflate(border);
            if desired != self.geometry.size {
                trace!("GeometryReconciler: resize {:?} -> {:?}", self.geometry.size, desired);
                out.requests.push(GeometryRequest::Resize(desired));
                self.last_requested_size = Some(desired);
                self.geometry.size = desired;
                out.changed = true;
            }
        }

        if !self.latch.pos_fixed() {
            let content_pos = apply_window_alignment(
                self.alignment,
                self.geometry.content_size(),
                workarea,
                self.gap_x,
                self.gap_y,
            );
            let desired = content_pos.offset(-(border as i32), -(border as i32));
            if desired != self.geometry.pos {
                trace!("GeometryReconciler: move {:?} -> {:?}", self.geometry.pos, desired);
                out.requests.push(GeometryRequest::Move(desired));
                self.last_requested_pos = Some(desired);
                self.geometry.pos = desired;
                out.changed = true;
            }
        }
        out
    }

    /// Folds in a geometry notification from the window system. Returns true
    /// if the believed geometry changed.
    pub fn observe_configure(&mut self, pos: Point, size: Size) -> bool {
        if !self.latch.size_fixed() {
            let expected = self.last_requested_size.unwrap_or(self.geometry.size);
            if size != expected && !self.content.is_empty() {
                debug!(
                    "Window manager imposed size {:?} (requested {:?}), latching size",
                    size, expected
                );
                self.latch = self.latch.with_size_fixed();
            }
        }

        if !self.latch.pos_fixed() && self.updates >= self.position_latch_threshold {
            let expected = self.last_requested_pos.unwrap_or(self.geometry.pos);
            if pos != expected && !self.content.is_empty() {
                debug!(
                    "Window manager imposed position {:?} (requested {:?}), latching position",
                    pos, expected
                );
                self.latch = self.latch.with_pos_fixed();
            }
        }

        let changed = pos != self.geometry.pos || size != self.geometry.size;
        self.geometry.pos = pos;
        self.geometry.size = size;
        changed
    }

    /// Struts for the current geometry on a display of `display` size.
    pub fn struts(&self, display: Size) -> Struts {
        Struts::compute(self.alignment, self.geometry.rect(), display)
    }
}

#[cfg(test)]
mod tests;

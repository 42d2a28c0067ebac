// src/damage.rs

//! Per-backend accumulation of regions that need repainting.
//!
//! Exposure notifications and content refreshes add to the region during one
//! loop iteration. The scheduler draws once over the union and then clears it,
//! so a second drain with no new notifications finds nothing to do.

use crate::geometry::Rect;
use log::trace;

/// The rectangles invalidated since the last draw.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DamageRegion {
    rects: Vec<Rect>,
    full: bool,
}

impl DamageRegion {
    pub fn is_empty(&self) -> bool {
        !self.full && self.rects.is_empty()
    }

    /// True when the whole surface must be repainted.
    pub fn is_full(&self) -> bool {
        self.full
    }

    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    /// Smallest rectangle covering every damaged area, clipped to `surface`.
    /// A full region yields the surface itself.
    pub fn bounds(&self, surface: Rect) -> Rect {
        if self.full {
            return surface;
        }
        self.rects
            .iter()
            .fold(Rect::default(), |acc, r| acc.union(r))
            .intersection(&surface)
    }
}

#[derive(Debug, Default)]
pub struct DamageTracker {
    region: DamageRegion,
}

impl DamageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rectangle. Empty rectangles and rectangles already covered are
    /// ignored so a burst of identical exposures does not grow the list.
    pub fn add(&mut self, rect: Rect) {
        if self.region.full || rect.is_empty() {
            return;
        }
        if self.region.rects.iter().any(|r| r.covers(&rect)) {
            return;
        }
        self.region.rects.retain(|r| !rect.covers(r));
        trace!("DamageTracker: add {:?}", rect);
        self.region.rects.push(rect);
    }

    pub fn mark_full(&mut self) {
        self.region.full = true;
        self.region.rects.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.region.is_empty()
    }

    /// Hands the accumulated region to the caller and resets the tracker.
    pub fn take(&mut self) -> DamageRegion {
        std::mem::take(&mut self.region)
    }

    /// Drops pending damage without drawing it.
    pub fn clear(&mut self) {
        self.region = DamageRegion::default();
    }
}

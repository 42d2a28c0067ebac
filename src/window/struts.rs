// src/window/struts.rs

//! Reserved screen-edge space for panel windows, laid out the way the EWMH
//! `_NET_WM_STRUT_PARTIAL` property expects it.

use crate::config::Alignment;
use crate::geometry::{Rect, Size};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrutEdge {
    Left,
    Right,
    Top,
    Bottom,
}

impl StrutEdge {
    /// The edge a panel with this alignment reserves. Centered windows reserve nothing.
    pub fn for_alignment(alignment: Alignment) -> Option<Self> {
        match alignment {
            Alignment::TopLeft | Alignment::TopMiddle | Alignment::TopRight => Some(StrutEdge::Top),
            Alignment::BottomLeft | Alignment::BottomMiddle | Alignment::BottomRight => {
                Some(StrutEdge::Bottom)
            }
            Alignment::MiddleLeft => Some(StrutEdge::Left),
            Alignment::MiddleRight => Some(StrutEdge::Right),
            Alignment::MiddleMiddle => None,
        }
    }
}

/// Depths `left, right, top, bottom` followed by the start/end pairs for
/// each edge, in that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Struts {
    pub values: [u32; 12],
}

impl Struts {
    pub fn left(&self) -> u32 {
        self.values[0]
    }

    pub fn right(&self) -> u32 {
        self.values[1]
    }

    pub fn top(&self) -> u32 {
        self.values[2]
    }

    pub fn bottom(&self) -> u32 {
        self.values[3]
    }

    /// The four-element `_NET_WM_STRUT` form.
    pub fn depths(&self) -> [u32; 4] {
        [self.values[0], self.values[1], self.values[2], self.values[3]]
    }

    pub fn is_empty(&self) -> bool {
        self.values.iter().all(|v| *v == 0)
    }

    /// Computes the struts for `window` on a display of `display` size.
    /// Every value is clamped to the display: horizontal quantities to its
    /// width, vertical ones to its height.
    pub fn compute(alignment: Alignment, window: Rect, display: Size) -> Self {
        let mut raw = [0i64; 12];
        let (x, y) = (window.x() as i64, window.y() as i64);
        let (end_x, end_y) = (window.end_x() as i64, window.end_y() as i64);

        let edge = match StrutEdge::for_alignment(alignment) {
            Some(edge) => edge,
            None => return Struts::default(),
        };
        match edge {
            StrutEdge::Left => {
                raw[0] = end_x;
                raw[4] = y;
                raw[5] = end_y;
            }
            StrutEdge::Right => {
                raw[1] = display.width as i64 - x;
                raw[6] = y;
                raw[7] = end_y;
            }
            StrutEdge::Top => {
                raw[2] = end_y;
                raw[8] = x;
                raw[9] = end_x;
            }
            StrutEdge::Bottom => {
                raw[3] = display.height as i64 - y;
                raw[10] = x;
                raw[11] = end_x;
            }
        }

        let mut values = [0u32; 12];
        for (i, v) in raw.iter().enumerate() {
            let limit = if i <= 1 || i >= 8 {
                display.width
            } else {
                display.height
            };
            values[i] = (*v).clamp(0, limit as i64) as u32;
        }
        Struts { values }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DISPLAY: Size = Size::new(600, 800);

    #[test]
    fn it_should_reserve_the_top_edge_for_top_alignments() {
        let window = Rect::new(0, 0, 200, 600);
        for alignment in [Alignment::TopLeft, Alignment::TopMiddle, Alignment::TopRight] {
            let s = Struts::compute(alignment, window, DISPLAY);
            assert_eq!(s.depths(), [0, 0, 600, 0]);
            assert_eq!(&s.values[4..8], &[0, 0, 0, 0]);
            assert_eq!(s.values[8], 0);
            assert_eq!(s.values[9], 200);
            assert_eq!(&s.values[10..], &[0, 0]);
        }
    }

    #[test]
    fn it_should_measure_right_and_bottom_depths_from_the_far_edge() {
        let window = Rect::new(450, 700, 150, 100);
        let right = Struts::compute(Alignment::MiddleRight, window, DISPLAY);
        assert_eq!(right.right(), 150);
        assert_eq!((right.values[6], right.values[7]), (700, 800));

        let bottom = Struts::compute(Alignment::BottomLeft, window, DISPLAY);
        assert_eq!(bottom.bottom(), 100);
        assert_eq!((bottom.values[10], bottom.values[11]), (450, 600));
    }

    #[test]
    fn it_should_clamp_values_to_the_display() {
        let window = Rect::new(-20, 500, 900, 400);
        let left = Struts::compute(Alignment::MiddleLeft, window, DISPLAY);
        assert_eq!(left.left(), 600);
        assert_eq!((left.values[4], left.values[5]), (500, 800));
    }

    #[test]
    fn it_should_not_reserve_space_when_centered() {
        let s = Struts::compute(Alignment::MiddleMiddle, Rect::new(10, 10, 10, 10), DISPLAY);
        assert!(s.is_empty());
    }
}

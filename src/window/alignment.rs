// src/window/alignment.rs

use crate::config::Alignment;
use crate::geometry::{Point, Rect, Size};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
    Start,
    Middle,
    End,
}

impl Alignment {
    fn anchors(self) -> (Anchor, Anchor) {
        use Anchor::*;
        match self {
            Alignment::TopLeft => (Start, Start),
            Alignment::TopMiddle => (Middle, Start),
            Alignment::TopRight => (End, Start),
            Alignment::MiddleLeft => (Start, Middle),
            Alignment::MiddleMiddle => (Middle, Middle),
            Alignment::MiddleRight => (End, Middle),
            Alignment::BottomLeft => (Start, End),
            Alignment::BottomMiddle => (Middle, End),
            Alignment::BottomRight => (End, End),
        }
    }
}

fn place(anchor: Anchor, start: i32, end: i32, extent: u32, gap: i32) -> i32 {
    let extent = extent as i32;
    match anchor {
        Anchor::Start => start + gap,
        Anchor::Middle => start + (end - start) / 2 - extent / 2 - gap,
        Anchor::End => end - extent - gap,
    }
}

/// Position of the content area's top-left corner for `content` anchored in
/// `workarea`. Gaps push away from the anchored edge; for middle anchors they
/// shift toward the start edge.
pub fn apply_window_alignment(
    alignment: Alignment,
    content: Size,
    workarea: Rect,
    gap_x: i32,
    gap_y: i32,
) -> Point {
    let (horizontal, vertical) = alignment.anchors();
    Point::new(
        place(horizontal, workarea.x(), workarea.end_x(), content.width, gap_x),
        place(vertical, workarea.y(), workarea.end_y(), content.height, gap_y),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORKAREA: Rect = Rect::new(0, 0, 1000, 800);

    #[test]
    fn it_should_anchor_corners_with_gaps() {
        let content = Size::new(200, 100);
        assert_eq!(
            apply_window_alignment(Alignment::TopLeft, content, WORKAREA, 10, 20),
            Point::new(10, 20)
        );
        assert_eq!(
            apply_window_alignment(Alignment::TopRight, content, WORKAREA, 10, 20),
            Point::new(790, 20)
        );
        assert_eq!(
            apply_window_alignment(Alignment::BottomRight, content, WORKAREA, 10, 20),
            Point::new(790, 680)
        );
    }

    #[test]
    fn it_should_center_middle_anchors() {
        let content = Size::new(200, 100);
        assert_eq!(
            apply_window_alignment(Alignment::MiddleMiddle, content, WORKAREA, 0, 0),
            Point::new(400, 350)
        );
    }

    #[test]
    fn it_should_respect_a_workarea_offset() {
        let workarea = Rect::new(50, 30, 1000, 800);
        assert_eq!(
            apply_window_alignment(Alignment::TopLeft, Size::new(10, 10), workarea, 5, 5),
            Point::new(55, 35)
        );
    }
}

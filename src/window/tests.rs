// src/window/tests.rs

use super::*;
use crate::config::{Alignment, Config, WindowType};
use proptest::prelude::*;

const WORKAREA: Rect = Rect::new(0, 0, 1920, 1080);

fn config(alignment: Alignment) -> Config {
    let mut config = Config::default();
    config.display.alignment = alignment;
    config.display.gap_x = 10;
    config.display.gap_y = 10;
    config
}

fn reconciler(config: &Config) -> GeometryReconciler {
    let initial = WindowGeometry {
        pos: Point::ORIGIN,
        size: Size::new(1, 1),
        border: config.display.border_total(),
    };
    GeometryReconciler::new(config, initial)
}

#[test]
fn it_should_request_size_and_position_for_new_content() {
    let config = config(Alignment::TopLeft);
    let mut r = reconciler(&config);

    let out = r.reconcile(Size::new(300, 200), WORKAREA);
    assert!(out.changed);
    assert_eq!(
        out.requests,
        vec![
            GeometryRequest::Resize(Size::new(310, 210)),
            GeometryRequest::Move(Point::new(5, 5)),
        ]
    );
    // Content plus the border on each side equals the window size.
    assert_eq!(r.geometry().content_size(), Size::new(300, 200));
}

#[test]
fn it_should_issue_nothing_when_geometry_already_matches() {
    let config = config(Alignment::TopLeft);
    let mut r = reconciler(&config);
    r.reconcile(Size::new(300, 200), WORKAREA);
    let out = r.reconcile(Size::new(300, 200), WORKAREA);
    assert!(out.requests.is_empty());
    assert!(!out.changed);
}

#[test]
fn it_should_clamp_content_to_the_maximum_width() {
    let mut config = config(Alignment::TopLeft);
    config.display.maximum_width = 250;
    let mut r = reconciler(&config);
    r.reconcile(Size::new(400, 100), WORKAREA);
    assert_eq!(r.geometry().content_size(), Size::new(250, 100));
}

#[test]
fn it_should_keep_the_right_edge_anchored_when_content_grows() {
    let config = config(Alignment::TopRight);
    let mut r = reconciler(&config);
    r.reconcile(Size::new(100, 50), WORKAREA);
    let right_edge = r.geometry().rect().end_x();
    r.reconcile(Size::new(180, 50), WORKAREA);
    assert_eq!(r.geometry().rect().end_x(), right_edge);
}

#[test_log::test]
fn it_should_latch_size_when_the_window_manager_overrides_it() {
    let config = config(Alignment::TopLeft);
    let mut r = reconciler(&config);
    let out = r.reconcile(Size::new(300, 200), WORKAREA);
    assert!(out.requests.contains(&GeometryRequest::Resize(Size::new(310, 210))));

    // The window manager ignores the request and tiles the window instead.
    let imposed = Size::new(640, 480);
    assert!(r.observe_configure(Point::new(5, 5), imposed));
    assert_eq!(r.geometry().size, imposed);
    assert!(r.latch().size_fixed());
    assert!(!r.latch().pos_fixed());

    let out = r.reconcile(Size::new(320, 220), WORKAREA);
    assert!(!out
        .requests
        .iter()
        .any(|req| matches!(req, GeometryRequest::Resize(_))));
    assert_eq!(r.geometry().size, imposed);
}

#[test]
fn it_should_not_latch_on_the_initial_placement() {
    let config = config(Alignment::TopLeft);
    let mut r = reconciler(&config);
    // Before any content exists the window manager maps the window at its own size.
    r.observe_configure(Point::new(30, 40), Size::new(64, 64));
    assert_eq!(r.latch(), LatchState::Free);

    let out = r.reconcile(Size::new(100, 100), WORKAREA);
    assert!(out.requests.contains(&GeometryRequest::Resize(Size::new(110, 110))));
}

#[test]
fn it_should_ignore_position_jitter_before_the_threshold() {
    let config = config(Alignment::TopLeft);
    let mut r = reconciler(&config);
    r.reconcile(Size::new(100, 100), WORKAREA);
    r.observe_configure(Point::new(7, 29), Size::new(110, 110));
    assert!(!r.latch().pos_fixed());

    // Second refresh re-requests the aligned position.
    let out = r.reconcile(Size::new(100, 100), WORKAREA);
    assert_eq!(out.requests, vec![GeometryRequest::Move(Point::new(5, 5))]);

    // A contradicting report after the threshold latches the axis.
    r.observe_configure(Point::new(7, 29), Size::new(110, 110));
    assert_eq!(r.latch(), LatchState::FixedPos);
    let out = r.reconcile(Size::new(100, 100), WORKAREA);
    assert!(out.requests.is_empty());
    assert_eq!(r.geometry().pos, Point::new(7, 29));
}

#[test]
fn it_should_honour_a_configurable_position_threshold() {
    let mut config = config(Alignment::TopLeft);
    config.geometry.position_latch_threshold = 1;
    let mut r = reconciler(&config);
    r.reconcile(Size::new(100, 100), WORKAREA);
    r.observe_configure(Point::new(50, 50), Size::new(110, 110));
    assert!(r.latch().pos_fixed());
}

#[test]
fn it_should_combine_both_latches() {
    let mut config = config(Alignment::TopLeft);
    config.geometry.position_latch_threshold = 1;
    let mut r = reconciler(&config);
    r.reconcile(Size::new(100, 100), WORKAREA);
    r.observe_configure(Point::new(50, 50), Size::new(400, 400));
    assert_eq!(r.latch(), LatchState::FixedBoth);
}

#[test]
fn it_should_only_request_sizes_when_the_position_is_not_ours() {
    let config = config(Alignment::TopRight);
    let mut r = reconciler(&config).with_position_fixed();
    let out = r.reconcile(Size::new(300, 200), WORKAREA);
    assert_eq!(out.requests, vec![GeometryRequest::Resize(Size::new(310, 210))]);
    assert_eq!(r.geometry().pos, Point::ORIGIN);
    assert_eq!(r.latch(), LatchState::FixedPos);

    // A size override still latches the size axis on top.
    r.observe_configure(Point::ORIGIN, Size::new(640, 480));
    assert_eq!(r.latch(), LatchState::FixedBoth);
}

#[test]
fn it_should_compute_struts_for_a_panel() {
    let mut config = config(Alignment::BottomLeft);
    config.window.window_type = WindowType::Panel;
    let mut r = reconciler(&config);
    r.reconcile(Size::new(1900, 30), WORKAREA);
    let struts = r.struts(WORKAREA.size);
    let geometry = r.geometry();
    assert_eq!(struts.bottom(), (1080 - geometry.pos.y) as u32);
    assert_eq!(struts.values[10], geometry.pos.x as u32);
    assert_eq!(struts.values[11], geometry.rect().end_x() as u32);
}

#[derive(Debug, Clone)]
enum Step {
    Refresh(u32, u32),
    Configure(i32, i32, u32, u32),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (1u32..800, 1u32..600).prop_map(|(w, h)| Step::Refresh(w, h)),
        (-50i32..2000, -50i32..1100, 1u32..900, 1u32..700)
            .prop_map(|(x, y, w, h)| Step::Configure(x, y, w, h)),
    ]
}

proptest! {
    #[test]
    fn it_should_never_request_a_latched_axis(steps in prop::collection::vec(step(), 1..40)) {
        let mut config = config(Alignment::TopRight);
        config.geometry.position_latch_threshold = 1;
        let mut r = reconciler(&config);
        let mut size_latched = false;
        let mut pos_latched = false;

        for step in steps {
            match step {
                Step::Refresh(w, h) => {
                    let out = r.reconcile(Size::new(w, h), WORKAREA);
                    for request in out.requests {
                        match request {
                            GeometryRequest::Resize(_) => prop_assert!(!size_latched),
                            GeometryRequest::Move(_) => prop_assert!(!pos_latched),
                        }
                    }
                }
                Step::Configure(x, y, w, h) => {
                    r.observe_configure(Point::new(x, y), Size::new(w, h));
                }
            }
            // Latches never release.
            prop_assert!(!size_latched || r.latch().size_fixed());
            prop_assert!(!pos_latched || r.latch().pos_fixed());
            size_latched = r.latch().size_fixed();
            pos_latched = r.latch().pos_fixed();
        }
    }

    #[test]
    fn it_should_keep_content_plus_border_equal_to_window_while_free(
        sizes in prop::collection::vec((1u32..800, 1u32..600), 1..20)
    ) {
        let config = config(Alignment::BottomMiddle);
        let mut r = reconciler(&config);
        for (w, h) in sizes {
            r.reconcile(Size::new(w, h), WORKAREA);
            let g = r.geometry();
            prop_assert_eq!(g.content_size().inflate(g.border), g.size);
            prop_assert_eq!(g.content_size(), Size::new(w, h));
        }
    }
}

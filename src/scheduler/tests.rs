// src/scheduler/tests.rs

use super::*;
use crate::backends::mock::{MockBackend, MockLog, SharedLog};
use crate::input::{Crossing, Modifiers, MouseEvent, MouseEventKind, PointerKind, CORE_POINTER};
use crate::registry::BackendRegistry;
use std::cell::RefCell;
use std::rc::Rc;

struct StaticSource {
    lines: Vec<String>,
    refreshes: Rc<RefCell<u32>>,
}

impl ContentSource for StaticSource {
    fn refresh(&mut self) -> Result<RenderedContent> {
        *self.refreshes.borrow_mut() += 1;
        Ok(RenderedContent::new(self.lines.clone()))
    }
}

#[derive(Default)]
struct HookRecord {
    dispatched: Vec<MouseEvent>,
    tables: Vec<WindowGeometry>,
}

struct RecordingHook {
    consume: bool,
    record: Rc<RefCell<HookRecord>>,
}

impl ScriptHook for RecordingHook {
    fn dispatch_mouse(&mut self, event: &MouseEvent) -> Result<bool> {
        self.record.borrow_mut().dispatched.push(*event);
        Ok(self.consume)
    }

    fn update_window_table(&mut self, geometry: &WindowGeometry) {
        self.record.borrow_mut().tables.push(*geometry);
    }
}

struct Harness {
    scheduler: RedrawScheduler,
    log: SharedLog,
    hook: Rc<RefCell<HookRecord>>,
    refreshes: Rc<RefCell<u32>>,
    terminate: AtomicBool,
    refresh: AtomicBool,
}

impl Harness {
    fn new(config: &Config, backends: Vec<MockBackend>, log: SharedLog, consume: bool) -> Self {
        let mut registry = BackendRegistry::new();
        for backend in backends {
            registry.register(Box::new(backend)).expect("unique names");
        }
        let active = registry.select_active(config).expect("selection");
        log.borrow_mut().calls.clear();

        let refreshes = Rc::new(RefCell::new(0));
        let hook = Rc::new(RefCell::new(HookRecord::default()));
        let scheduler = RedrawScheduler::new(
            active,
            config,
            Box::new(StaticSource {
                lines: vec!["load 0.10".into(), "up 3h".into()],
                refreshes: Rc::clone(&refreshes),
            }),
            Box::new(RecordingHook {
                consume,
                record: Rc::clone(&hook),
            }),
        );
        Self {
            scheduler,
            log,
            hook,
            refreshes,
            terminate: AtomicBool::new(false),
            refresh: AtomicBool::new(false),
        }
    }

    fn text(name: &str) -> (Config, SharedLog, Vec<MockBackend>) {
        let log = MockLog::shared();
        let backends = vec![MockBackend::new(name, false, &log)];
        (Config::default(), log, backends)
    }

    fn iterate(&mut self) -> LoopStatus {
        self.scheduler
            .iterate(&self.terminate, &self.refresh)
            .expect("iteration")
    }

    fn draws(&self) -> usize {
        self.log.borrow().draws.len()
    }
}

fn press(serial: u64, code: u32) -> NativeEvent {
    NativeEvent::Pointer(PointerNotification {
        kind: PointerKind::ButtonPress(code),
        serial: Some(serial),
        source: CORE_POINTER,
        pos: Point::new(5, 5),
        pos_abs: Point::new(905, 45),
        modifiers: Modifiers::empty(),
        time_ms: 100,
    })
}

#[test]
fn it_should_bound_the_wait_by_the_next_update() {
    let now = Instant::now();
    let interval = Duration::from_secs(1);
    assert_eq!(wait_timeout(now, now + interval, interval), Duration::ZERO);
    assert_eq!(
        wait_timeout(now + Duration::from_millis(300), now, interval),
        Duration::from_millis(300)
    );
    assert_eq!(wait_timeout(now + Duration::from_secs(60), now, interval), interval);
}

#[test_log::test]
fn it_should_refresh_and_draw_on_the_first_iteration() {
    let (config, log, backends) = Harness::text("console");
    let mut h = Harness::new(&config, backends, log, false);

    assert_eq!(h.iterate(), LoopStatus::Running);
    assert_eq!(*h.refreshes.borrow(), 1);
    assert_eq!(h.draws(), 1);
    assert!(h.log.borrow().draws[0].1.is_full());
    assert!(h.scheduler.last_update().is_some());
}

#[test_log::test]
fn it_should_draw_identical_exposures_once_and_then_nothing() {
    let (config, log, backends) = Harness::text("console");
    let mut h = Harness::new(&config, backends, log, false);
    h.iterate();
    let before = h.draws();

    {
        let mut log = h.log.borrow_mut();
        log.queued.push_back(NativeEvent::Expose(Rect::new(0, 0, 20, 10)));
        log.queued.push_back(NativeEvent::Expose(Rect::new(0, 0, 20, 10)));
    }
    h.iterate();
    assert_eq!(h.draws(), before + 1);
    let region = h.log.borrow().draws.last().map(|d| d.1.clone()).expect("a draw");
    assert_eq!(region.rects(), &[Rect::new(0, 0, 20, 10)]);

    // Nothing new: the region was cleared by the draw.
    h.iterate();
    assert_eq!(h.draws(), before + 1);
    assert_eq!(*h.refreshes.borrow(), 1);
}

#[test]
fn it_should_repaint_every_iteration_when_double_buffered() {
    let log = MockLog::shared();
    let backends = vec![MockBackend::new("x11", true, &log).full_repaint(true)];
    let mut h = Harness::new(&Config::default(), backends, log, false);
    h.iterate();
    h.iterate();
    h.iterate();
    assert_eq!(h.draws(), 3);
    assert!(h.log.borrow().draws.iter().all(|(_, d)| d.is_full()));
}

#[test]
fn it_should_let_only_the_graphical_backend_block() {
    let log = MockLog::shared();
    let backends = vec![
        MockBackend::new("x11", true, &log),
        MockBackend::new("console", false, &log),
    ];
    let mut h = Harness::new(&Config::default(), backends, log, false);
    h.iterate();
    h.iterate();

    let log = h.log.borrow();
    let interval = Config::default().display.update_interval();
    for (name, timeout) in &log.waits {
        match name.as_str() {
            "x11" => assert!(*timeout <= interval),
            _ => assert_eq!(*timeout, Duration::ZERO),
        }
    }
    // After the first tick the lead waits for (most of) an interval.
    let (_, second) = log.waits.iter().filter(|(n, _)| n == "x11").nth(1).expect("two waits");
    assert!(*second > Duration::ZERO);
}

#[test]
fn it_should_block_on_the_interactive_text_backend_over_plain_sinks() {
    let log = MockLog::shared();
    let backends = vec![
        MockBackend::new("file", false, &log),
        MockBackend::new("ncurses", false, &log).event_source(true),
        MockBackend::new("console", false, &log),
    ];
    let mut h = Harness::new(&Config::default(), backends, log, false);
    h.iterate();
    h.iterate();

    let log = h.log.borrow();
    for (name, timeout) in &log.waits {
        if name != "ncurses" {
            assert_eq!(*timeout, Duration::ZERO, "{} must not block", name);
        }
    }
    let (_, second) = log
        .waits
        .iter()
        .filter(|(n, _)| n == "ncurses")
        .nth(1)
        .expect("two waits");
    assert!(*second > Duration::ZERO);
}

#[test]
fn it_should_refresh_early_when_asked() {
    let (config, log, backends) = Harness::text("console");
    let mut h = Harness::new(&config, backends, log, false);
    h.iterate();
    h.refresh.store(true, Ordering::SeqCst);
    h.iterate();
    assert_eq!(*h.refreshes.borrow(), 2);
    assert!(!h.refresh.load(Ordering::SeqCst));
}

#[test_log::test]
fn it_should_shut_down_cleanly_on_termination_with_pending_damage() {
    let log = MockLog::shared();
    let backends = vec![
        MockBackend::new("x11", true, &log),
        MockBackend::new("console", false, &log),
    ];
    let mut h = Harness::new(&Config::default(), backends, log, false);
    h.iterate();
    h.log.borrow_mut().calls.clear();
    h.log
        .borrow_mut()
        .queued
        .push_back(NativeEvent::Expose(Rect::new(0, 0, 5, 5)));

    h.terminate.store(true, Ordering::SeqCst);
    assert_eq!(h.iterate(), LoopStatus::Shutdown);
    assert_eq!(
        h.log.borrow().calls,
        vec![
            "x11:sigterm_cleanup",
            "console:sigterm_cleanup",
            "console:shutdown",
            "x11:shutdown",
        ]
    );

    // Later iterations are inert.
    assert_eq!(h.iterate(), LoopStatus::Shutdown);
    assert_eq!(h.log.borrow().count("x11:sigterm_cleanup"), 1);
    assert_eq!(h.log.borrow().count("x11:draw"), 0);
    assert!(h.scheduler.is_finished());
}

#[test]
fn it_should_clean_up_and_shut_down_on_close_request() {
    let (config, log, backends) = Harness::text("console");
    let mut h = Harness::new(&config, backends, log, false);
    h.log.borrow_mut().queued.push_back(NativeEvent::CloseRequested);
    assert_eq!(h.iterate(), LoopStatus::Shutdown);
    assert_eq!(h.log.borrow().calls, vec!["console:cleanup", "console:shutdown"]);
}

#[test]
fn it_should_stop_running_when_terminated() {
    let (config, log, backends) = Harness::text("console");
    let mut h = Harness::new(&config, backends, log, false);
    h.terminate.store(true, Ordering::SeqCst);
    h.scheduler
        .run(&h.terminate, &h.refresh)
        .expect("run returns after shutdown");
    assert!(h.scheduler.is_finished());
}

#[test_log::test]
fn it_should_size_position_and_reserve_space_for_a_panel() {
    let log = MockLog::shared();
    let mut config = Config::default();
    config.window.window_type = WindowType::Panel;
    let backends = vec![MockBackend::new("x11", true, &log).with_capabilities(Capabilities::all())];
    let mut h = Harness::new(&config, backends, log, false);
    h.iterate();

    let log = h.log.borrow();
    assert!(log
        .requests
        .iter()
        .any(|r| matches!(r, GeometryRequest::Resize(_))));
    assert!(log.requests.iter().any(|r| matches!(r, GeometryRequest::Move(_))));
    assert_eq!(log.struts.len(), 1);
    assert!(!log.struts[0].is_empty());
    assert_eq!(h.hook.borrow().tables.len(), 1);
}

#[test]
fn it_should_not_send_requests_the_backend_cannot_honour() {
    let log = MockLog::shared();
    let backends = vec![MockBackend::new("wayland", true, &log).with_capabilities(Capabilities::RESIZE)];
    let mut h = Harness::new(&Config::default(), backends, log, false);
    h.iterate();
    let log = h.log.borrow();
    assert!(log.requests.iter().all(|r| matches!(r, GeometryRequest::Resize(_))));
    assert!(log.struts.is_empty());
}

fn pointer(kind: PointerKind, serial: Option<u64>, pos: Point) -> NativeEvent {
    NativeEvent::Pointer(PointerNotification {
        kind,
        serial,
        source: CORE_POINTER,
        pos,
        pos_abs: pos,
        modifiers: Modifiers::empty(),
        time_ms: 200,
    })
}

#[test]
fn it_should_keep_surface_local_pointers_inside_an_unplaceable_window() {
    let log = MockLog::shared();
    let backends = vec![MockBackend::new("wayland", true, &log)
        .with_capabilities(Capabilities::RESIZE | Capabilities::POINTER)];
    let mut h = Harness::new(&Config::default(), backends, log, true);
    h.iterate();

    h.log
        .borrow_mut()
        .queued
        .push_back(pointer(PointerKind::Enter, Some(3), Point::new(5, 5)));
    h.log
        .borrow_mut()
        .queued
        .push_back(pointer(PointerKind::Motion, None, Point::new(6, 5)));
    h.iterate();

    let kinds: Vec<MouseEventKind> = h.hook.borrow().dispatched.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            MouseEventKind::Crossing {
                crossing: Crossing::Enter
            },
            MouseEventKind::Move,
        ]
    );
    assert!(h.log.borrow().requests.iter().all(|r| matches!(r, GeometryRequest::Resize(_))));
}

#[test]
fn it_should_propagate_pointer_events_the_hook_declines() {
    let log = MockLog::shared();
    let mut config = Config::default();
    config.window.window_type = WindowType::Dock;
    let backends = vec![MockBackend::new("x11", true, &log).with_capabilities(Capabilities::all())];
    let mut h = Harness::new(&config, backends, log, false);
    h.iterate();

    h.log.borrow_mut().queued.push_back(press(42, 1));
    h.log.borrow_mut().queued.push_back(press(42, 1));
    h.iterate();

    assert_eq!(h.hook.borrow().dispatched.len(), 1);
    assert_eq!(h.log.borrow().propagated.len(), 1);
    assert_eq!(h.log.borrow().count("x11:take_input_focus"), 0);
}

#[test]
fn it_should_take_focus_for_consumed_presses_on_a_normal_window() {
    let log = MockLog::shared();
    let backends = vec![MockBackend::new("x11", true, &log).with_capabilities(Capabilities::all())];
    let mut h = Harness::new(&Config::default(), backends, log, true);
    h.iterate();

    h.log.borrow_mut().queued.push_back(press(7, 1));
    h.iterate();
    assert_eq!(h.log.borrow().count("x11:take_input_focus"), 1);
    assert!(h.log.borrow().propagated.is_empty());
}

#[test]
fn it_should_ignore_pointer_capabilities_the_backend_lacks() {
    let (config, log, backends) = Harness::text("ncurses");
    let mut h = Harness::new(&config, backends, log, false);
    h.log.borrow_mut().queued.push_back(press(1, 1));
    h.iterate();
    assert_eq!(h.hook.borrow().dispatched.len(), 1);
    assert!(h.log.borrow().propagated.is_empty());
}

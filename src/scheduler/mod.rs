// src/scheduler/mod.rs

//! The main loop: periodic content refresh plus per-iteration drain and draw.
//!
//! Each iteration blocks in exactly one place, the lead backend's
//! `main_loop_wait`, bounded by the time left until the next refresh. Every
//! other backend is polled with a zero timeout. After the wait, a due
//! refresh marks every surface fully damaged, native notifications are
//! routed into damage, geometry, and input handling, and backends with
//! non-empty damage draw once.

use crate::backends::{Backend, Capabilities, Frame, NativeEvent, WaitOutcome};
use crate::config::{Config, WindowType};
use crate::content::{ContentSource, RenderedContent};
use crate::damage::DamageTracker;
use crate::error::DisplayError;
use crate::geometry::{Point, Rect, Size};
use crate::input::{DispatchOutcome, InputNormalizer, PointerNotification};
use crate::registry::{ActiveBackend, ActiveSet};
use crate::script::ScriptHook;
use crate::window::{GeometryReconciler, GeometryRequest, WindowGeometry};
use anyhow::Result;
use log::{debug, info, trace, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopStatus {
    Running,
    Shutdown,
}

/// Loop-owned state that belongs to one active backend.
struct BackendSlot {
    damage: DamageTracker,
    /// Present only for backends that own a resizable window.
    reconciler: Option<GeometryReconciler>,
    input: InputNormalizer,
}

impl BackendSlot {
    fn new(backend: &dyn Backend, config: &Config) -> Self {
        let caps = backend.capabilities();
        let reconciler = caps.contains(Capabilities::RESIZE).then(|| {
            let initial = WindowGeometry {
                pos: Point::ORIGIN,
                size: Size::new(config.window.initial_width, config.window.initial_height),
                border: config.display.border_total(),
            };
            let reconciler = GeometryReconciler::new(config, initial);
            if caps.contains(Capabilities::MOVE) {
                reconciler
            } else {
                reconciler.with_position_fixed()
            }
        });
        Self {
            damage: DamageTracker::new(),
            reconciler,
            input: InputNormalizer::new(config),
        }
    }

    /// Window rectangle used for inside/outside decisions. Backends without
    /// a window treat every position as inside.
    fn window_rect(&self) -> Rect {
        self.reconciler
            .as_ref()
            .map(|r| r.geometry().rect())
            .unwrap_or_default()
    }
}

/// Time the lead backend may block: until the next refresh, never more than
/// one interval.
pub fn wait_timeout(next_update: Instant, now: Instant, interval: Duration) -> Duration {
    next_update.saturating_duration_since(now).min(interval)
}

/// The backend allowed to block: the graphical one, else the first with an
/// event source, else the first.
fn lead_index(entries: &[ActiveBackend]) -> usize {
    entries
        .iter()
        .position(|e| e.descriptor.is_graphical)
        .or_else(|| entries.iter().position(|e| e.backend.has_event_source()))
        .unwrap_or(0)
}

pub struct RedrawScheduler {
    active: ActiveSet,
    slots: Vec<BackendSlot>,
    /// Index of the backend whose wait may block.
    lead: usize,
    source: Box<dyn ContentSource>,
    hook: Box<dyn ScriptHook>,
    content: RenderedContent,
    interval: Duration,
    last_update: Option<Instant>,
    next_update: Instant,
    window_type: WindowType,
    finished: bool,
}

impl RedrawScheduler {
    pub fn new(
        mut active: ActiveSet,
        config: &Config,
        source: Box<dyn ContentSource>,
        hook: Box<dyn ScriptHook>,
    ) -> Self {
        let slots: Vec<BackendSlot> = active
            .entries_mut()
            .iter()
            .map(|e| BackendSlot::new(e.backend.as_ref(), config))
            .collect();
        let lead = lead_index(active.entries_mut());
        Self {
            active,
            slots,
            lead,
            source,
            hook,
            content: RenderedContent::default(),
            interval: config.display.update_interval(),
            last_update: None,
            next_update: Instant::now(),
            window_type: config.window.window_type,
            finished: false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn last_update(&self) -> Option<Instant> {
        self.last_update
    }

    /// Runs iterations until the loop shuts down.
    pub fn run(&mut self, terminate: &AtomicBool, refresh: &AtomicBool) -> Result<()> {
        info!("Entering main loop (update interval {:?})", self.interval);
        while self.iterate(terminate, refresh)? == LoopStatus::Running {}
        info!("Main loop finished");
        Ok(())
    }

    /// One wait, refresh, drain, draw cycle.
    pub fn iterate(&mut self, terminate: &AtomicBool, refresh: &AtomicBool) -> Result<LoopStatus> {
        if self.finished {
            return Ok(LoopStatus::Shutdown);
        }
        if terminate.load(Ordering::SeqCst) {
            return Ok(self.terminate());
        }

        self.wait_all();
        if terminate.load(Ordering::SeqCst) {
            return Ok(self.terminate());
        }

        let now = Instant::now();
        if now >= self.next_update || refresh.swap(false, Ordering::SeqCst) {
            self.tick(now);
        }

        let mut close_requested = false;
        for i in 0..self.slots.len() {
            close_requested |= self.drain_backend(i);
        }
        if close_requested {
            return Ok(self.close());
        }

        self.draw_all();
        Ok(LoopStatus::Running)
    }

    fn wait_all(&mut self) {
        let timeout = wait_timeout(self.next_update, Instant::now(), self.interval);
        let lead = self.lead;
        for (i, entry) in self.active.entries_mut().iter_mut().enumerate() {
            let t = if i == lead { timeout } else { Duration::ZERO };
            match entry.backend.main_loop_wait(t) {
                Ok(WaitOutcome::Interrupted) => trace!("{}: wait interrupted", entry.descriptor.name),
                Ok(outcome) => trace!("{}: {:?}", entry.descriptor.name, outcome),
                Err(e) => warn!("{}: wait failed: {:#}", entry.descriptor.name, e),
            }
        }
    }

    /// Refreshes content and pushes it into every backend's damage and
    /// window geometry.
    fn tick(&mut self, now: Instant) {
        match self.source.refresh() {
            Ok(content) => self.content = content,
            Err(e) => warn!("Content refresh failed, keeping previous frame: {:#}", e),
        }
        self.last_update = Some(now);
        // Missed ticks coalesce into this one.
        self.next_update = now + self.interval;

        let reserves_struts = self.window_type.reserves_struts();
        for (entry, slot) in self.active.entries_mut().iter_mut().zip(self.slots.iter_mut()) {
            slot.damage.mark_full();
            let Some(reconciler) = slot.reconciler.as_mut() else {
                continue;
            };
            let backend = entry.backend.as_mut();
            let content = backend.measure(&self.content);
            let workarea = backend
                .workarea()
                .unwrap_or_else(|| Rect::from_parts(Point::ORIGIN, content));
            let step = reconciler.reconcile(content, workarea);
            let caps = backend.capabilities();
            for request in step.requests {
                let allowed = match request {
                    GeometryRequest::Resize(_) => caps.contains(Capabilities::RESIZE),
                    GeometryRequest::Move(_) => caps.contains(Capabilities::MOVE),
                };
                if !allowed {
                    continue;
                }
                if let Err(e) = backend.request_geometry(request) {
                    log_rejected(backend.name(), "geometry request", e);
                }
            }
            if step.changed {
                publish_geometry(backend, reconciler, self.hook.as_mut(), reserves_struts);
            }
        }
    }

    /// Routes every pending notification of backend `i`. Returns true when
    /// the window system asked us to close.
    fn drain_backend(&mut self, i: usize) -> bool {
        let reserves_struts = self.window_type.reserves_struts();
        let entry = &mut self.active.entries_mut()[i];
        let slot = &mut self.slots[i];
        let backend = entry.backend.as_mut();

        let events = match backend.drain_events() {
            Ok(events) => events,
            Err(e) => {
                warn!("{}: failed to drain events: {:#}", backend.name(), e);
                return false;
            }
        };

        let mut close = false;
        for event in events {
            match event {
                NativeEvent::Expose(rect) => slot.damage.add(rect),
                NativeEvent::Configure { pos, size } => {
                    let Some(reconciler) = slot.reconciler.as_mut() else {
                        continue;
                    };
                    if reconciler.observe_configure(pos, size) {
                        slot.damage.mark_full();
                        publish_geometry(backend, reconciler, self.hook.as_mut(), reserves_struts);
                    }
                }
                NativeEvent::Pointer(n) => {
                    let window = slot.window_rect();
                    let outcome = slot.input.handle(&n, window, self.hook.as_mut());
                    apply_dispatch(backend, &n, outcome);
                }
                NativeEvent::CloseRequested => {
                    info!("{}: close requested", backend.name());
                    close = true;
                }
            }
        }
        close
    }

    fn draw_all(&mut self) {
        for (entry, slot) in self.active.entries_mut().iter_mut().zip(self.slots.iter_mut()) {
            let backend = entry.backend.as_mut();
            let full_repaint = backend.requires_full_repaint();
            if slot.damage.is_empty() && !full_repaint {
                continue;
            }
            if full_repaint {
                slot.damage.mark_full();
            }
            let damage = slot.damage.take();
            let geometry = match slot.reconciler.as_ref() {
                Some(r) => r.geometry(),
                None => WindowGeometry {
                    size: backend.measure(&self.content),
                    ..WindowGeometry::default()
                },
            };
            let frame = Frame {
                content: &self.content,
                damage: &damage,
                geometry,
            };
            if let Err(e) = backend.draw(&frame) {
                warn!("{}: draw failed: {:#}", backend.name(), e);
            }
        }
    }

    /// Termination path: drop pending damage, let each backend undo
    /// persistent side effects, then shut everything down.
    fn terminate(&mut self) -> LoopStatus {
        info!("Termination requested, shutting down display backends");
        for slot in &mut self.slots {
            slot.damage.clear();
        }
        for entry in self.active.entries_mut().iter_mut() {
            entry.backend.sigterm_cleanup();
        }
        self.finish()
    }

    /// Normal end of the loop after a close request.
    fn close(&mut self) -> LoopStatus {
        for entry in self.active.entries_mut().iter_mut() {
            entry.backend.cleanup();
        }
        self.finish()
    }

    fn finish(&mut self) -> LoopStatus {
        self.active.shutdown();
        self.slots.clear();
        self.finished = true;
        LoopStatus::Shutdown
    }
}

/// Window-management calls are best effort. An unsupported operation is
/// routine; anything else is worth a warning.
fn log_rejected(backend: &str, operation: &str, e: anyhow::Error) {
    match e.downcast_ref::<DisplayError>() {
        Some(d) if !d.is_fatal() => debug!("{}: {} skipped: {}", backend, operation, d),
        _ => warn!("{}: {} failed: {:#}", backend, operation, e),
    }
}

fn publish_geometry(
    backend: &mut dyn Backend,
    reconciler: &GeometryReconciler,
    hook: &mut dyn ScriptHook,
    reserves_struts: bool,
) {
    if reserves_struts && backend.capabilities().contains(Capabilities::STRUTS) {
        if let Some(display) = backend.display_size() {
            if let Err(e) = backend.set_struts(&reconciler.struts(display)) {
                log_rejected(backend.name(), "struts", e);
            }
        }
    }
    hook.update_window_table(&reconciler.geometry());
}

fn apply_dispatch(backend: &mut dyn Backend, n: &PointerNotification, outcome: DispatchOutcome) {
    let caps = backend.capabilities();
    match outcome {
        DispatchOutcome::Propagate if caps.contains(Capabilities::PROPAGATE) => {
            if let Err(e) = backend.propagate_pointer(n) {
                log_rejected(backend.name(), "propagation", e);
            }
        }
        DispatchOutcome::Consumed { take_focus: true } if caps.contains(Capabilities::INPUT_FOCUS) => {
            if let Err(e) = backend.take_input_focus() {
                log_rejected(backend.name(), "focus transfer", e);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests;

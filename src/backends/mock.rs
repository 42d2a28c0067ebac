// src/backends/mock.rs

//! A scriptable backend for registry and scheduler tests.

use super::{Backend, BackendKind, Capabilities, Frame, NativeEvent, WaitOutcome};
use crate::config::Config;
use crate::damage::DamageRegion;
use crate::geometry::{Rect, Size};
use crate::input::PointerNotification;
use crate::window::{GeometryRequest, Struts};
use anyhow::{anyhow, Result};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

/// What every mock did, shared between the mocks and the test body.
#[derive(Debug, Default)]
pub struct MockLog {
    /// `"<name>:<operation>"` in call order, across all mocks sharing the log.
    pub calls: Vec<String>,
    /// Timeouts passed to `main_loop_wait`, per backend name.
    pub waits: Vec<(String, Duration)>,
    pub draws: Vec<(String, DamageRegion)>,
    pub requests: Vec<GeometryRequest>,
    pub struts: Vec<Struts>,
    pub propagated: Vec<PointerNotification>,
    /// Events returned by the next `drain_events` of any mock.
    pub queued: VecDeque<NativeEvent>,
}

pub type SharedLog = Rc<RefCell<MockLog>>;

impl MockLog {
    pub fn shared() -> SharedLog {
        Rc::new(RefCell::new(MockLog::default()))
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }
}

pub struct MockBackend {
    name: String,
    graphical: bool,
    detects: bool,
    initializes: bool,
    full_repaint: bool,
    event_source: bool,
    capabilities: Capabilities,
    log: SharedLog,
}

impl MockBackend {
    pub fn new(name: &str, graphical: bool, log: &SharedLog) -> Self {
        Self {
            name: name.to_string(),
            graphical,
            detects: true,
            initializes: true,
            full_repaint: false,
            event_source: graphical,
            capabilities: Capabilities::empty(),
            log: Rc::clone(log),
        }
    }

    pub fn detects(mut self, detects: bool) -> Self {
        self.detects = detects;
        self
    }

    pub fn initializes(mut self, initializes: bool) -> Self {
        self.initializes = initializes;
        self
    }

    pub fn full_repaint(mut self, full_repaint: bool) -> Self {
        self.full_repaint = full_repaint;
        self
    }

    pub fn event_source(mut self, event_source: bool) -> Self {
        self.event_source = event_source;
        self
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    fn record(&self, operation: &str) {
        self.log
            .borrow_mut()
            .calls
            .push(format!("{}:{}", self.name, operation));
    }
}

impl Backend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Mock {
            graphical: self.graphical,
        }
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn has_event_source(&self) -> bool {
        self.event_source
    }

    fn detect(&self, _config: &Config) -> bool {
        self.record("detect");
        self.detects
    }

    fn initialize(&mut self, _config: &Config) -> Result<()> {
        self.record("initialize");
        if self.initializes {
            Ok(())
        } else {
            Err(anyhow!("{} refused to initialize", self.name))
        }
    }

    fn shutdown(&mut self) -> Result<()> {
        self.record("shutdown");
        Ok(())
    }

    fn main_loop_wait(&mut self, timeout: Duration) -> Result<WaitOutcome> {
        let mut log = self.log.borrow_mut();
        log.waits.push((self.name.clone(), timeout));
        Ok(if log.queued.is_empty() {
            WaitOutcome::TimedOut
        } else {
            WaitOutcome::Ready
        })
    }

    fn drain_events(&mut self) -> Result<Vec<NativeEvent>> {
        Ok(self.log.borrow_mut().queued.drain(..).collect())
    }

    fn draw(&mut self, frame: &Frame<'_>) -> Result<()> {
        self.record("draw");
        self.log
            .borrow_mut()
            .draws
            .push((self.name.clone(), frame.damage.clone()));
        Ok(())
    }

    fn requires_full_repaint(&self) -> bool {
        self.full_repaint
    }

    fn measure(&self, content: &crate::content::RenderedContent) -> Size {
        Size::new(content.columns() as u32 * 10, content.rows() as u32 * 10)
    }

    fn workarea(&self) -> Option<Rect> {
        self.graphical.then(|| Rect::new(0, 0, 1000, 800))
    }

    fn display_size(&self) -> Option<Size> {
        self.graphical.then(|| Size::new(1000, 800))
    }

    fn cleanup(&mut self) {
        self.record("cleanup");
    }

    fn sigterm_cleanup(&mut self) {
        self.record("sigterm_cleanup");
    }

    fn request_geometry(&mut self, request: GeometryRequest) -> Result<()> {
        self.log.borrow_mut().requests.push(request);
        Ok(())
    }

    fn set_struts(&mut self, struts: &Struts) -> Result<()> {
        self.log.borrow_mut().struts.push(*struts);
        Ok(())
    }

    fn propagate_pointer(&mut self, notification: &PointerNotification) -> Result<()> {
        self.log.borrow_mut().propagated.push(*notification);
        Ok(())
    }

    fn take_input_focus(&mut self) -> Result<()> {
        self.record("take_input_focus");
        Ok(())
    }
}

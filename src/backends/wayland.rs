// src/backends/wayland.rs

//! Wayland backend: one surface presented from an shm buffer.
//!
//! With `zwlr_layer_shell_v1` the surface is a layer surface: alignment
//! becomes anchors, gaps become margins, and a panel reserves its edge
//! through the exclusive zone. Without it the surface is a plain xdg
//! toplevel placed by the compositor. Either way there is no global
//! position, so move requests are unsupported. Pointer events carry the
//! protocol serial where the protocol supplies one (enter, leave, button).

use super::{Backend, BackendKind, Capabilities, Frame, NativeEvent, WaitOutcome};
use crate::config::{Alignment, Config, WindowType};
use crate::error::DisplayError;
use crate::geometry::{Point, Rect, Size};
use crate::input::{Modifiers, PointerKind, PointerNotification, ScrollDirection, CORE_POINTER};
use crate::window::{GeometryRequest, StrutEdge};
use anyhow::{anyhow, Context, Result};
use log::{debug, error, info, trace, warn};
use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use std::ffi::CString;
use std::fs::File;
use std::os::fd::{AsFd, FromRawFd, OwnedFd};
use std::os::unix::fs::FileExt;
use std::time::Duration;
use wayland_client::{
    delegate_noop,
    protocol::{
        wl_buffer, wl_compositor, wl_pointer, wl_registry, wl_seat, wl_shm, wl_shm_pool,
        wl_surface,
    },
    Connection, Dispatch, EventQueue, QueueHandle, WEnum,
};
use wayland_protocols::xdg::shell::client::{xdg_surface, xdg_toplevel, xdg_wm_base};
use wayland_protocols_wlr::layer_shell::v1::client::{zwlr_layer_shell_v1, zwlr_layer_surface_v1};

const SHM_FORMAT: wl_shm::Format = wl_shm::Format::Argb8888;
const CELL: Size = Size::new(8, 16);
const BACKGROUND: u32 = 0xff00_0000;
const FOREGROUND: u32 = 0xffe0_e0e0;

/// Linux input event codes for pointer buttons.
const BTN_LEFT: u32 = 0x110;
const BTN_RIGHT: u32 = 0x111;
const BTN_MIDDLE: u32 = 0x112;
const BTN_SIDE: u32 = 0x113;
const BTN_EXTRA: u32 = 0x114;

/// Maps an evdev button code to the legacy X numbering used downstream.
pub fn legacy_button_code(evdev: u32) -> u32 {
    match evdev {
        BTN_LEFT => 1,
        BTN_MIDDLE => 2,
        BTN_RIGHT => 3,
        BTN_SIDE => 8,
        BTN_EXTRA => 9,
        other => other,
    }
}

fn scroll_direction(axis: wl_pointer::Axis, value: f64) -> Option<ScrollDirection> {
    if value == 0.0 {
        return None;
    }
    Some(match (axis, value < 0.0) {
        (wl_pointer::Axis::VerticalScroll, true) => ScrollDirection::Up,
        (wl_pointer::Axis::VerticalScroll, false) => ScrollDirection::Down,
        (wl_pointer::Axis::HorizontalScroll, true) => ScrollDirection::Left,
        (wl_pointer::Axis::HorizontalScroll, false) => ScrollDirection::Right,
        _ => return None,
    })
}

/// Layer-shell anchors for an alignment. Centered axes anchor to neither edge.
pub fn layer_anchor(alignment: Alignment) -> zwlr_layer_surface_v1::Anchor {
    use zwlr_layer_surface_v1::Anchor;
    let vertical = match alignment {
        Alignment::TopLeft | Alignment::TopMiddle | Alignment::TopRight => Anchor::Top,
        Alignment::BottomLeft | Alignment::BottomMiddle | Alignment::BottomRight => Anchor::Bottom,
        _ => Anchor::empty(),
    };
    let horizontal = match alignment {
        Alignment::TopLeft | Alignment::MiddleLeft | Alignment::BottomLeft => Anchor::Left,
        Alignment::TopRight | Alignment::MiddleRight | Alignment::BottomRight => Anchor::Right,
        _ => Anchor::empty(),
    };
    vertical | horizontal
}

/// Stacking layer for a window type.
fn layer_for(window_type: WindowType) -> zwlr_layer_shell_v1::Layer {
    use zwlr_layer_shell_v1::Layer;
    match window_type {
        WindowType::Desktop => Layer::Background,
        WindowType::Panel | WindowType::Dock => Layer::Top,
        WindowType::Override => Layer::Overlay,
        WindowType::Normal | WindowType::Utility => Layer::Bottom,
    }
}

/// Where a layer surface sits and what it reserves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerPlacement {
    pub alignment: Alignment,
    pub gap_x: i32,
    pub gap_y: i32,
    pub window_type: WindowType,
}

impl LayerPlacement {
    pub fn from_config(config: &Config) -> Self {
        Self {
            alignment: config.display.alignment,
            gap_x: config.display.gap_x,
            gap_y: config.display.gap_y,
            window_type: config.window.window_type,
        }
    }

    /// Margins as `(top, right, bottom, left)`. Only anchored edges use them.
    pub fn margins(&self) -> (i32, i32, i32, i32) {
        (self.gap_y, self.gap_x, self.gap_y, self.gap_x)
    }

    /// Space a panel keeps free along its edge: its extent plus the gap.
    /// Other window types and centered panels reserve nothing.
    pub fn exclusive_zone(&self, size: Size) -> i32 {
        if !self.window_type.reserves_struts() {
            return 0;
        }
        let extent = match StrutEdge::for_alignment(self.alignment) {
            Some(StrutEdge::Top | StrutEdge::Bottom) => size.height as i64 + self.gap_y.max(0) as i64,
            Some(StrutEdge::Left | StrutEdge::Right) => size.width as i64 + self.gap_x.max(0) as i64,
            None => 0,
        };
        extent.min(i32::MAX as i64) as i32
    }

    fn apply(&self, layer: &zwlr_layer_surface_v1::ZwlrLayerSurfaceV1, size: Size) {
        layer.set_size(size.width, size.height);
        layer.set_anchor(layer_anchor(self.alignment));
        let (top, right, bottom, left) = self.margins();
        layer.set_margin(top, right, bottom, left);
        layer.set_exclusive_zone(self.exclusive_zone(size));
    }
}

fn create_memfd(size: usize) -> Result<File> {
    let name = CString::new("sysview-shm")?;
    // SAFETY: name is NUL-terminated; the result is checked before use.
    let fd = unsafe { libc::memfd_create(name.as_ptr(), libc::MFD_CLOEXEC) };
    if fd < 0 {
        return Err(std::io::Error::last_os_error()).context("memfd_create failed");
    }
    // SAFETY: fd is a fresh descriptor owned by nobody else.
    let file = File::from(unsafe { OwnedFd::from_raw_fd(fd) });
    file.set_len(size as u64).context("Failed to size shm file")?;
    Ok(file)
}

struct ShmBuffer {
    file: File,
    pool: wl_shm_pool::WlShmPool,
    buffer: wl_buffer::WlBuffer,
    size: Size,
}

impl ShmBuffer {
    fn destroy(self) {
        self.buffer.destroy();
        self.pool.destroy();
    }
}

/// Protocol objects and the notifications gathered while dispatching.
#[derive(Default)]
struct WaylandState {
    compositor: Option<wl_compositor::WlCompositor>,
    shm: Option<wl_shm::WlShm>,
    wm_base: Option<xdg_wm_base::XdgWmBase>,
    layer_shell: Option<zwlr_layer_shell_v1::ZwlrLayerShellV1>,
    seat: Option<wl_seat::WlSeat>,
    pointer: Option<wl_pointer::WlPointer>,

    surface: Option<wl_surface::WlSurface>,
    xdg_surface: Option<xdg_surface::XdgSurface>,
    toplevel: Option<xdg_toplevel::XdgToplevel>,
    layer_surface: Option<zwlr_layer_surface_v1::ZwlrLayerSurfaceV1>,
    configured: bool,
    /// Size the compositor asked for in the last toplevel configure.
    suggested: Option<Size>,
    size: Size,

    pointer_pos: Point,
    last_serial: Option<u64>,
    pending: Vec<NativeEvent>,
}

impl WaylandState {
    fn push_pointer(&mut self, kind: PointerKind, serial: Option<u32>, time_ms: u32) {
        let serial = serial.map(u64::from);
        if serial.is_some() {
            self.last_serial = serial;
        }
        self.pending.push(NativeEvent::Pointer(PointerNotification {
            kind,
            serial,
            source: CORE_POINTER,
            pos: self.pointer_pos,
            // Global coordinates are not exposed to clients.
            pos_abs: self.pointer_pos,
            modifiers: Modifiers::empty(),
            time_ms: time_ms as u64,
        }));
    }
}

pub struct WaylandBackend {
    conn: Option<Connection>,
    queue: Option<EventQueue<WaylandState>>,
    state: WaylandState,
    buffer: Option<ShmBuffer>,
    pixels: Vec<u32>,
    placement: Option<LayerPlacement>,
}

impl WaylandBackend {
    pub fn new() -> Self {
        Self {
            conn: None,
            queue: None,
            state: WaylandState::default(),
            buffer: None,
            pixels: Vec::new(),
            placement: None,
        }
    }

    fn dispatch_pending(&mut self) -> Result<usize> {
        let Some(queue) = self.queue.as_mut() else {
            return Ok(0);
        };
        queue
            .dispatch_pending(&mut self.state)
            .context("WaylandBackend: dispatch failed")
    }

    fn ensure_buffer(&mut self, size: Size) -> Result<()> {
        if self.buffer.as_ref().is_some_and(|b| b.size == size) {
            return Ok(());
        }
        if let Some(old) = self.buffer.take() {
            old.destroy();
        }
        let (Some(shm), Some(queue)) = (self.state.shm.as_ref(), self.queue.as_ref()) else {
            return Err(anyhow!("WaylandBackend: not initialized"));
        };
        let qh = queue.handle();
        let stride = size.width * 4;
        let bytes = (stride * size.height) as usize;
        let file = create_memfd(bytes)?;
        let pool = shm.create_pool(file.as_fd(), bytes as i32, &qh, ());
        let buffer = pool.create_buffer(
            0,
            size.width as i32,
            size.height as i32,
            stride as i32,
            SHM_FORMAT,
            &qh,
            (),
        );
        debug!("WaylandBackend: shm buffer {:?}", size);
        self.buffer = Some(ShmBuffer {
            file,
            pool,
            buffer,
            size,
        });
        Ok(())
    }

    /// Paints one block per visible character; glyph rendering is the
    /// drawing layer's concern.
    fn paint(&mut self, frame: &Frame<'_>, size: Size, clip: Rect) {
        self.pixels.resize((size.width * size.height) as usize, BACKGROUND);
        let origin = frame.geometry.content_origin();
        for y in clip.y().max(0)..clip.end_y().min(size.height as i32) {
            for x in clip.x().max(0)..clip.end_x().min(size.width as i32) {
                let cx = x - origin.x;
                let cy = y - origin.y;
                let lit = cx >= 0
                    && cy >= 0
                    && (cx as u32 % CELL.width) < CELL.width - 1
                    && (cy as u32 % CELL.height) >= 3
                    && (cy as u32 % CELL.height) < CELL.height - 2
                    && frame
                        .content
                        .lines
                        .get((cy as u32 / CELL.height) as usize)
                        .and_then(|l| l.chars().nth((cx as u32 / CELL.width) as usize))
                        .is_some_and(|c| !c.is_whitespace());
                self.pixels[(y as u32 * size.width + x as u32) as usize] =
                    if lit { FOREGROUND } else { BACKGROUND };
            }
        }
    }
}

impl Default for WaylandBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for WaylandBackend {
    fn name(&self) -> &str {
        "wayland"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Wayland
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::RESIZE | Capabilities::POINTER
    }

    fn detect(&self, config: &Config) -> bool {
        config.output.out_to_wayland && std::env::var_os("WAYLAND_DISPLAY").is_some()
    }

    fn initialize(&mut self, config: &Config) -> Result<()> {
        let conn = Connection::connect_to_env().context("WaylandBackend: Failed to connect")?;
        let mut queue = conn.new_event_queue::<WaylandState>();
        let qh = queue.handle();
        let _registry = conn.display().get_registry(&qh, ());
        queue
            .roundtrip(&mut self.state)
            .context("WaylandBackend: registry roundtrip failed")?;

        let Some(compositor) = &self.state.compositor else {
            return Err(anyhow!("WaylandBackend: compositor lacks wl_compositor"));
        };
        if self.state.layer_shell.is_none() && self.state.wm_base.is_none() {
            return Err(anyhow!(
                "WaylandBackend: compositor offers neither zwlr_layer_shell_v1 nor xdg_wm_base"
            ));
        }
        if self.state.shm.is_none() {
            return Err(anyhow!("WaylandBackend: compositor lacks wl_shm"));
        }
        if self.state.seat.is_none() {
            warn!("WaylandBackend: no wl_seat; pointer input unavailable");
        }

        let size = Size::new(config.window.initial_width.max(1), config.window.initial_height.max(1));
        let surface = compositor.create_surface(&qh, ());
        if let Some(layer_shell) = &self.state.layer_shell {
            let placement = LayerPlacement::from_config(config);
            let layer = layer_shell.get_layer_surface(
                &surface,
                None,
                layer_for(placement.window_type),
                "sysview".to_string(),
                &qh,
                (),
            );
            placement.apply(&layer, size);
            debug!("WaylandBackend: layer surface {:?}", placement);
            self.state.layer_surface = Some(layer);
            self.placement = Some(placement);
        } else if let Some(wm_base) = &self.state.wm_base {
            let xdg_surface = wm_base.get_xdg_surface(&surface, &qh, ());
            let toplevel = xdg_surface.get_toplevel(&qh, ());
            toplevel.set_title(config.window.title.clone());
            toplevel.set_app_id("sysview".to_string());
            self.state.xdg_surface = Some(xdg_surface);
            self.state.toplevel = Some(toplevel);
        }
        surface.commit();

        self.state.size = size;
        self.state.surface = Some(surface);
        queue
            .roundtrip(&mut self.state)
            .context("WaylandBackend: initial configure roundtrip failed")?;

        self.queue = Some(queue);
        self.conn = Some(conn);
        info!(
            "WaylandBackend initialized as {} (configured: {})",
            if self.placement.is_some() { "layer surface" } else { "xdg toplevel" },
            self.state.configured
        );
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        if let Some(buffer) = self.buffer.take() {
            buffer.destroy();
        }
        if let Some(pointer) = self.state.pointer.take() {
            pointer.release();
        }
        if let Some(layer) = self.state.layer_surface.take() {
            layer.destroy();
        }
        if let Some(toplevel) = self.state.toplevel.take() {
            toplevel.destroy();
        }
        if let Some(xdg_surface) = self.state.xdg_surface.take() {
            xdg_surface.destroy();
        }
        if let Some(surface) = self.state.surface.take() {
            surface.destroy();
        }
        if let Some(conn) = self.conn.take() {
            if let Err(e) = conn.flush() {
                debug!("WaylandBackend: final flush failed: {}", e);
            }
        }
        self.queue = None;
        self.placement = None;
        self.state = WaylandState::default();
        info!("WaylandBackend shut down");
        Ok(())
    }

    fn main_loop_wait(&mut self, timeout: Duration) -> Result<WaitOutcome> {
        let Some(conn) = self.conn.clone() else {
            return Ok(WaitOutcome::TimedOut);
        };
        self.dispatch_pending()?;
        if !self.state.pending.is_empty() {
            return Ok(WaitOutcome::Ready);
        }
        if let Err(e) = conn.flush() {
            warn!("WaylandBackend: flush failed: {}", e);
        }
        // No guard means events are already queued for dispatch.
        let Some(guard) = conn.prepare_read() else {
            return Ok(WaitOutcome::Ready);
        };
        let ms = timeout.as_millis().min(i32::MAX as u128) as i32;
        let poll_timeout = PollTimeout::try_from(ms).unwrap_or(PollTimeout::MAX);
        let ready = {
            let mut fds = [PollFd::new(guard.connection_fd(), PollFlags::POLLIN)];
            match poll(&mut fds, poll_timeout) {
                Ok(n) => n > 0,
                Err(Errno::EINTR) => return Ok(WaitOutcome::Interrupted),
                Err(e) => return Err(e).context("WaylandBackend: poll failed"),
            }
        };
        if !ready {
            return Ok(WaitOutcome::TimedOut);
        }
        guard.read().context("WaylandBackend: read failed")?;
        Ok(WaitOutcome::Ready)
    }

    fn drain_events(&mut self) -> Result<Vec<NativeEvent>> {
        self.dispatch_pending()?;
        let events = std::mem::take(&mut self.state.pending);
        trace!("WaylandBackend: drained {} events", events.len());
        Ok(events)
    }

    fn draw(&mut self, frame: &Frame<'_>) -> Result<()> {
        if !self.state.configured {
            trace!("WaylandBackend: skipping draw before first configure");
            return Ok(());
        }
        let size = self.state.size;
        if size.is_empty() {
            return Ok(());
        }
        self.ensure_buffer(size)?;
        let surface_rect = Rect::from_parts(Point::ORIGIN, size);
        let clip = frame.damage.bounds(surface_rect);
        self.paint(frame, size, clip);

        let (Some(buffer), Some(surface)) = (self.buffer.as_ref(), self.state.surface.as_ref()) else {
            return Err(anyhow!("WaylandBackend: not initialized"));
        };
        let bytes: Vec<u8> = self.pixels.iter().flat_map(|p| p.to_ne_bytes()).collect();
        buffer
            .file
            .write_all_at(&bytes, 0)
            .context("WaylandBackend: Failed to write shm buffer")?;
        surface.attach(Some(&buffer.buffer), 0, 0);
        surface.damage_buffer(clip.x(), clip.y(), clip.size.width as i32, clip.size.height as i32);
        surface.commit();
        if let Some(conn) = self.conn.as_ref() {
            conn.flush().context("WaylandBackend: flush failed")?;
        }
        Ok(())
    }

    fn measure(&self, content: &crate::content::RenderedContent) -> Size {
        Size::new(
            content.columns() as u32 * CELL.width,
            content.rows() as u32 * CELL.height,
        )
    }

    fn cleanup(&mut self) {
        if let Some(conn) = self.conn.as_ref() {
            if let Err(e) = conn.flush() {
                debug!("WaylandBackend: flush failed: {}", e);
            }
        }
    }

    fn sigterm_cleanup(&mut self) {
        self.cleanup();
    }

    fn request_geometry(&mut self, request: GeometryRequest) -> Result<()> {
        match request {
            GeometryRequest::Resize(size) => {
                if let (Some(layer), Some(placement)) = (&self.state.layer_surface, &self.placement) {
                    // Applied with the next commit, which the following draw makes.
                    layer.set_size(size.width, size.height);
                    layer.set_exclusive_zone(placement.exclusive_zone(size));
                    self.state.size = size;
                    self.state.pending.push(NativeEvent::Configure {
                        pos: Point::ORIGIN,
                        size,
                    });
                    return Ok(());
                }
                // Only a floating toplevel (no suggested size) picks its own size.
                if self.state.suggested.is_none() {
                    self.state.size = size;
                    self.state.pending.push(NativeEvent::Configure {
                        pos: Point::ORIGIN,
                        size,
                    });
                }
                Ok(())
            }
            GeometryRequest::Move(_) => Err(DisplayError::unsupported(self.name(), "move").into()),
        }
    }
}

impl Drop for WaylandBackend {
    fn drop(&mut self) {
        if self.conn.is_some() {
            error!("WaylandBackend dropped without shutdown");
            let _ = self.shutdown();
        }
    }
}

impl Dispatch<wl_registry::WlRegistry, ()> for WaylandState {
    fn event(
        state: &mut Self,
        registry: &wl_registry::WlRegistry,
        event: wl_registry::Event,
        _: &(),
        _: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        if let wl_registry::Event::Global {
            name,
            interface,
            version,
        } = event
        {
            trace!("Wayland global: {} v{} ({})", interface, version, name);
            match interface.as_str() {
                "wl_compositor" => {
                    state.compositor = Some(registry.bind(name, version.min(4), qh, ()));
                }
                "wl_shm" => state.shm = Some(registry.bind(name, 1, qh, ())),
                "xdg_wm_base" => state.wm_base = Some(registry.bind(name, 1, qh, ())),
                "zwlr_layer_shell_v1" => {
                    state.layer_shell = Some(registry.bind(name, version.min(4), qh, ()));
                }
                "wl_seat" => state.seat = Some(registry.bind(name, version.min(5), qh, ())),
                _ => {}
            }
        }
    }
}

impl Dispatch<xdg_wm_base::XdgWmBase, ()> for WaylandState {
    fn event(
        _: &mut Self,
        wm_base: &xdg_wm_base::XdgWmBase,
        event: xdg_wm_base::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        if let xdg_wm_base::Event::Ping { serial } = event {
            wm_base.pong(serial);
        }
    }
}

impl Dispatch<xdg_surface::XdgSurface, ()> for WaylandState {
    fn event(
        state: &mut Self,
        xdg_surface: &xdg_surface::XdgSurface,
        event: xdg_surface::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        if let xdg_surface::Event::Configure { serial } = event {
            xdg_surface.ack_configure(serial);
            state.configured = true;
            if let Some(size) = state.suggested {
                state.size = size;
            }
            let size = state.size;
            state.pending.push(NativeEvent::Configure {
                pos: Point::ORIGIN,
                size,
            });
            state.pending.push(NativeEvent::Expose(Rect::from_parts(Point::ORIGIN, size)));
        }
    }
}

impl Dispatch<xdg_toplevel::XdgToplevel, ()> for WaylandState {
    fn event(
        state: &mut Self,
        _: &xdg_toplevel::XdgToplevel,
        event: xdg_toplevel::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        match event {
            xdg_toplevel::Event::Configure { width, height, .. } => {
                state.suggested =
                    (width > 0 && height > 0).then(|| Size::new(width as u32, height as u32));
            }
            xdg_toplevel::Event::Close => state.pending.push(NativeEvent::CloseRequested),
            _ => {}
        }
    }
}

impl Dispatch<zwlr_layer_surface_v1::ZwlrLayerSurfaceV1, ()> for WaylandState {
    fn event(
        state: &mut Self,
        layer: &zwlr_layer_surface_v1::ZwlrLayerSurfaceV1,
        event: zwlr_layer_surface_v1::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        match event {
            zwlr_layer_surface_v1::Event::Configure {
                serial,
                width,
                height,
            } => {
                layer.ack_configure(serial);
                state.configured = true;
                // Zero means the client picks; otherwise the compositor stretched us.
                if width > 0 && height > 0 {
                    state.size = Size::new(width, height);
                }
                let size = state.size;
                state.pending.push(NativeEvent::Configure {
                    pos: Point::ORIGIN,
                    size,
                });
                state.pending.push(NativeEvent::Expose(Rect::from_parts(Point::ORIGIN, size)));
            }
            zwlr_layer_surface_v1::Event::Closed => state.pending.push(NativeEvent::CloseRequested),
            _ => {}
        }
    }
}

impl Dispatch<wl_seat::WlSeat, ()> for WaylandState {
    fn event(
        state: &mut Self,
        seat: &wl_seat::WlSeat,
        event: wl_seat::Event,
        _: &(),
        _: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        if let wl_seat::Event::Capabilities {
            capabilities: WEnum::Value(caps),
        } = event
        {
            if caps.contains(wl_seat::Capability::Pointer) && state.pointer.is_none() {
                state.pointer = Some(seat.get_pointer(qh, ()));
            }
        }
    }
}

impl Dispatch<wl_pointer::WlPointer, ()> for WaylandState {
    fn event(
        state: &mut Self,
        _: &wl_pointer::WlPointer,
        event: wl_pointer::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        match event {
            wl_pointer::Event::Enter {
                serial,
                surface_x,
                surface_y,
                ..
            } => {
                state.pointer_pos = Point::new(surface_x as i32, surface_y as i32);
                state.push_pointer(PointerKind::Enter, Some(serial), 0);
            }
            wl_pointer::Event::Leave { serial, .. } => {
                state.push_pointer(PointerKind::Leave, Some(serial), 0);
            }
            wl_pointer::Event::Motion {
                time,
                surface_x,
                surface_y,
            } => {
                state.pointer_pos = Point::new(surface_x as i32, surface_y as i32);
                state.push_pointer(PointerKind::Motion, None, time);
            }
            wl_pointer::Event::Button {
                serial,
                time,
                button,
                state: WEnum::Value(button_state),
            } => {
                let code = legacy_button_code(button);
                let kind = match button_state {
                    wl_pointer::ButtonState::Pressed => PointerKind::ButtonPress(code),
                    _ => PointerKind::ButtonRelease(code),
                };
                state.push_pointer(kind, Some(serial), time);
            }
            wl_pointer::Event::Axis {
                time,
                axis: WEnum::Value(axis),
                value,
            } => {
                if let Some(direction) = scroll_direction(axis, value) {
                    state.push_pointer(PointerKind::Axis(direction), None, time);
                }
            }
            _ => {}
        }
    }
}

delegate_noop!(WaylandState: wl_compositor::WlCompositor);
delegate_noop!(WaylandState: zwlr_layer_shell_v1::ZwlrLayerShellV1);
delegate_noop!(WaylandState: wl_shm_pool::WlShmPool);
delegate_noop!(WaylandState: ignore wl_shm::WlShm);
delegate_noop!(WaylandState: ignore wl_buffer::WlBuffer);
delegate_noop!(WaylandState: ignore wl_surface::WlSurface);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_should_map_evdev_buttons_to_legacy_codes() {
        assert_eq!(legacy_button_code(BTN_LEFT), 1);
        assert_eq!(legacy_button_code(BTN_MIDDLE), 2);
        assert_eq!(legacy_button_code(BTN_RIGHT), 3);
        assert_eq!(legacy_button_code(BTN_SIDE), 8);
        assert_eq!(legacy_button_code(BTN_EXTRA), 9);
    }

    #[test]
    fn it_should_map_axis_sign_to_scroll_direction() {
        let v = wl_pointer::Axis::VerticalScroll;
        let h = wl_pointer::Axis::HorizontalScroll;
        assert_eq!(scroll_direction(v, -10.0), Some(ScrollDirection::Up));
        assert_eq!(scroll_direction(v, 10.0), Some(ScrollDirection::Down));
        assert_eq!(scroll_direction(h, -1.0), Some(ScrollDirection::Left));
        assert_eq!(scroll_direction(h, 0.0), None);
    }

    fn placement(alignment: Alignment, window_type: WindowType) -> LayerPlacement {
        LayerPlacement {
            alignment,
            gap_x: 12,
            gap_y: 60,
            window_type,
        }
    }

    #[test]
    fn it_should_anchor_layer_surfaces_to_the_aligned_edges() {
        use zwlr_layer_surface_v1::Anchor;
        assert_eq!(layer_anchor(Alignment::TopLeft), Anchor::Top | Anchor::Left);
        assert_eq!(layer_anchor(Alignment::BottomMiddle), Anchor::Bottom);
        assert_eq!(layer_anchor(Alignment::MiddleRight), Anchor::Right);
        assert_eq!(layer_anchor(Alignment::MiddleMiddle), Anchor::empty());
    }

    #[test]
    fn it_should_use_gaps_as_layer_margins() {
        let p = placement(Alignment::TopRight, WindowType::Normal);
        assert_eq!(p.margins(), (60, 12, 60, 12));
    }

    #[test]
    fn it_should_reserve_the_panel_edge_as_exclusive_zone() {
        let size = Size::new(800, 30);
        assert_eq!(placement(Alignment::BottomMiddle, WindowType::Panel).exclusive_zone(size), 90);
        assert_eq!(placement(Alignment::MiddleLeft, WindowType::Panel).exclusive_zone(size), 812);
        assert_eq!(placement(Alignment::MiddleMiddle, WindowType::Panel).exclusive_zone(size), 0);
        assert_eq!(placement(Alignment::BottomMiddle, WindowType::Dock).exclusive_zone(size), 0);
    }

    #[test]
    fn it_should_stack_desktops_below_and_panels_above() {
        use zwlr_layer_shell_v1::Layer;
        assert_eq!(layer_for(WindowType::Desktop), Layer::Background);
        assert_eq!(layer_for(WindowType::Panel), Layer::Top);
        assert_eq!(layer_for(WindowType::Normal), Layer::Bottom);
    }

    #[test]
    fn it_should_refuse_move_requests() {
        let mut backend = WaylandBackend::new();
        let err = backend
            .request_geometry(GeometryRequest::Move(Point::new(1, 1)))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DisplayError>(),
            Some(DisplayError::Unsupported { .. })
        ));
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! Seam to the rendering/backend/protocol collaborator.
//!
//! The collaborator owns displays, input hardware and the client protocol; it
//! hands the core raw handles ([`OutputDevice`], [`InputDevice`],
//! [`ToplevelHandle`], [`LayerSurfaceHandle`]) and a stream of [`Event`]s.
//! Commands flow the other way as method calls on the handles (send a
//! configure, set the activated state, commit an output mode). Handles are
//! cheap clones of a shared allocation; equality is identity.

use parking_lot::Mutex;
use std::sync::Arc;

pub use xkbcommon::xkb::Keysym;

use crate::utils::geometry::{Point, Size, Transform, TransformExt};
use crate::utils::id_gen;

pub mod headless;

id_gen!(next_device_id, DEVICE_ID);
id_gen!(next_surface_id, SURFACE_ID);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    Pressed,
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Pressed,
    Released,
}

/// Modifier state as translated by the collaborator's keymap handling.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ModifiersState {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub logo: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCapability {
    Pointer,
    Keyboard,
}

bitflags::bitflags! {
    /// Which edges of a toplevel take part in an interactive resize.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ResizeEdge: u32 {
        const TOP = 1;
        const BOTTOM = 2;
        const LEFT = 4;
        const RIGHT = 8;
    }
}

bitflags::bitflags! {
    /// Screen edges a layer surface is anchored to.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct Anchor: u32 {
        const TOP = 1;
        const BOTTOM = 2;
        const LEFT = 4;
        const RIGHT = 8;
    }
}

bitflags::bitflags! {
    /// Double-buffered layer-surface state that changed in a commit.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct LayerStateDelta: u32 {
        const LAYER = 1;
        const SIZE = 2;
        const EXCLUSIVE_ZONE = 4;
        const ANCHOR = 8;
        const MARGIN = 16;
        const INTERACTIVITY = 32;
    }
}

/// Shell stacking layer of a layer surface, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Layer {
    Background,
    Bottom,
    Top,
    Overlay,
}

impl Layer {
    pub const ALL: [Layer; 4] = [Layer::Background, Layer::Bottom, Layer::Top, Layer::Overlay];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyboardInteractivity {
    None,
    OnDemand,
    Exclusive,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Margins {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
}

/// One entry of an output's mode list. `refresh` is in mHz, following the
/// display protocol convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mode {
    pub size: Size<i32>,
    pub refresh: i32,
    pub preferred: bool,
}

impl Mode {
    pub fn refresh_hz(&self) -> f64 {
        self.refresh as f64 / 1000.0
    }
}

/// State applied to an output device in one commit. `None` fields keep the
/// device's current value.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PendingOutputState {
    pub mode: Option<Mode>,
    pub enabled: Option<bool>,
    pub scale: Option<f64>,
    pub transform: Option<Transform>,
    pub adaptive_sync: Option<bool>,
}

#[derive(Debug, thiserror::Error)]
pub enum OutputCommitError {
    #[error("mode {0}x{1}@{2}mHz is not advertised by the device")]
    UnknownMode(i32, i32, i32),
}

#[derive(Debug)]
struct OutputDeviceState {
    modes: Vec<Mode>,
    current_mode: Option<Mode>,
    enabled: bool,
    scale: f64,
    transform: Transform,
    adaptive_sync: bool,
}

#[derive(Debug)]
struct OutputDeviceInner {
    id: usize,
    name: String,
    make: String,
    model: String,
    state: Mutex<OutputDeviceState>,
}

/// A physical display as reported by the backend.
#[derive(Debug, Clone)]
pub struct OutputDevice(Arc<OutputDeviceInner>);

impl PartialEq for OutputDevice {
    fn eq(&self, other: &OutputDevice) -> bool {
        self.0.id == other.0.id
    }
}
impl Eq for OutputDevice {}

impl OutputDevice {
    pub fn new(
        name: impl Into<String>,
        make: impl Into<String>,
        model: impl Into<String>,
        modes: Vec<Mode>,
    ) -> OutputDevice {
        OutputDevice(Arc::new(OutputDeviceInner {
            id: next_device_id(),
            name: name.into(),
            make: make.into(),
            model: model.into(),
            state: Mutex::new(OutputDeviceState {
                modes,
                current_mode: None,
                enabled: false,
                scale: 1.0,
                transform: Transform::Normal,
                adaptive_sync: false,
            }),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn make(&self) -> &str {
        &self.0.make
    }

    pub fn model(&self) -> &str {
        &self.0.model
    }

    pub fn modes(&self) -> Vec<Mode> {
        self.0.state.lock().modes.clone()
    }

    pub fn preferred_mode(&self) -> Option<Mode> {
        let state = self.0.state.lock();
        state
            .modes
            .iter()
            .find(|m| m.preferred)
            .or_else(|| state.modes.first())
            .copied()
    }

    pub fn current_mode(&self) -> Option<Mode> {
        self.0.state.lock().current_mode
    }

    pub fn enabled(&self) -> bool {
        self.0.state.lock().enabled
    }

    pub fn scale(&self) -> f64 {
        self.0.state.lock().scale
    }

    pub fn transform(&self) -> Transform {
        self.0.state.lock().transform
    }

    pub fn adaptive_sync(&self) -> bool {
        self.0.state.lock().adaptive_sync
    }

    /// Checks whether `pending` could be committed, without touching the
    /// device.
    pub fn test_state(&self, pending: &PendingOutputState) -> Result<(), OutputCommitError> {
        if let Some(mode) = pending.mode {
            let state = self.0.state.lock();
            if !state.modes.contains(&mode) {
                return Err(OutputCommitError::UnknownMode(
                    mode.size.w,
                    mode.size.h,
                    mode.refresh,
                ));
            }
        }
        Ok(())
    }

    pub fn commit_state(&self, pending: &PendingOutputState) -> Result<(), OutputCommitError> {
        self.test_state(pending)?;
        let mut state = self.0.state.lock();
        if let Some(mode) = pending.mode {
            state.current_mode = Some(mode);
        }
        if let Some(enabled) = pending.enabled {
            state.enabled = enabled;
        }
        if let Some(scale) = pending.scale {
            state.scale = scale;
        }
        if let Some(transform) = pending.transform {
            state.transform = transform;
        }
        if let Some(adaptive_sync) = pending.adaptive_sync {
            state.adaptive_sync = adaptive_sync;
        }
        Ok(())
    }

    /// Resolution in logical coordinates: the transformed mode size divided
    /// by the output scale.
    pub fn effective_resolution(&self) -> Size<i32> {
        let state = self.0.state.lock();
        let mode_size = state.current_mode.map(|m| m.size).unwrap_or_default();
        state
            .transform
            .transform_size(mode_size)
            .downscale(state.scale)
            .to_i32_round()
    }
}

#[derive(Debug)]
struct InputDeviceInner {
    id: usize,
    name: String,
    capability: DeviceCapability,
}

/// One physical input device (already decoded by the collaborator).
#[derive(Debug, Clone)]
pub struct InputDevice(Arc<InputDeviceInner>);

impl PartialEq for InputDevice {
    fn eq(&self, other: &InputDevice) -> bool {
        self.0.id == other.0.id
    }
}
impl Eq for InputDevice {}

impl InputDevice {
    pub fn new(name: impl Into<String>, capability: DeviceCapability) -> InputDevice {
        InputDevice(Arc::new(InputDeviceInner {
            id: next_device_id(),
            name: name.into(),
            capability,
        }))
    }

    pub fn id(&self) -> usize {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn capability(&self) -> DeviceCapability {
        self.0.capability
    }
}

#[derive(Debug, Default, Clone)]
pub struct ToplevelHandleState {
    pub app_id: String,
    pub title: String,
    /// Size of the currently committed buffer.
    pub surface_size: Size<i32>,
    /// Committed window geometry, if the client has set one.
    pub geometry_size: Option<Size<i32>>,
    /// Size of the last configure sent and not yet committed.
    pub scheduled_size: Option<Size<i32>>,
    pub activated: bool,
    pub close_requested: bool,
}

#[derive(Debug)]
struct ToplevelHandleInner {
    id: usize,
    state: Mutex<ToplevelHandleState>,
}

/// Raw client handle for an application window.
#[derive(Debug, Clone)]
pub struct ToplevelHandle(Arc<ToplevelHandleInner>);

impl PartialEq for ToplevelHandle {
    fn eq(&self, other: &ToplevelHandle) -> bool {
        self.0.id == other.0.id
    }
}
impl Eq for ToplevelHandle {}

impl ToplevelHandle {
    pub fn new() -> ToplevelHandle {
        ToplevelHandle(Arc::new(ToplevelHandleInner {
            id: next_surface_id(),
            state: Mutex::new(ToplevelHandleState::default()),
        }))
    }

    pub fn id(&self) -> usize {
        self.0.id
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&mut ToplevelHandleState) -> R) -> R {
        f(&mut self.0.state.lock())
    }

    pub fn send_configure(&self, size: Size<i32>) {
        self.0.state.lock().scheduled_size = Some(size);
    }

    pub fn set_activated(&self, activated: bool) {
        self.0.state.lock().activated = activated;
    }

    pub fn activated(&self) -> bool {
        self.0.state.lock().activated
    }

    pub fn send_close(&self) {
        self.0.state.lock().close_requested = true;
    }

    /// Size to lay the window out with: the committed geometry, else the
    /// scheduled configure, else whatever the surface currently shows.
    pub fn pending_or_current_size(&self) -> Size<i32> {
        let state = self.0.state.lock();
        state
            .geometry_size
            .or(state.scheduled_size)
            .filter(|size| !size.is_empty())
            .unwrap_or(state.surface_size)
    }
}

impl Default for ToplevelHandle {
    fn default() -> ToplevelHandle {
        ToplevelHandle::new()
    }
}

/// The double-buffered protocol state of a layer surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerSurfaceState {
    pub layer: Layer,
    pub anchor: Anchor,
    pub exclusive_zone: i32,
    pub margin: Margins,
    pub desired_size: Size<i32>,
    pub keyboard_interactivity: KeyboardInteractivity,
}

impl Default for LayerSurfaceState {
    fn default() -> LayerSurfaceState {
        LayerSurfaceState {
            layer: Layer::Background,
            anchor: Anchor::empty(),
            exclusive_zone: 0,
            margin: Margins::default(),
            desired_size: Size::default(),
            keyboard_interactivity: KeyboardInteractivity::None,
        }
    }
}

#[derive(Debug)]
struct LayerHandleState {
    pending: LayerSurfaceState,
    current: LayerSurfaceState,
    configured_size: Option<Size<i32>>,
    close_requested: bool,
}

#[derive(Debug)]
struct LayerSurfaceHandleInner {
    id: usize,
    namespace: String,
    requested_output: Option<String>,
    state: Mutex<LayerHandleState>,
}

/// Raw client handle for a shell-layer surface (panel, lock screen, ...).
#[derive(Debug, Clone)]
pub struct LayerSurfaceHandle(Arc<LayerSurfaceHandleInner>);

impl PartialEq for LayerSurfaceHandle {
    fn eq(&self, other: &LayerSurfaceHandle) -> bool {
        self.0.id == other.0.id
    }
}
impl Eq for LayerSurfaceHandle {}

impl LayerSurfaceHandle {
    pub fn new(
        namespace: impl Into<String>,
        requested_output: Option<String>,
        initial: LayerSurfaceState,
    ) -> LayerSurfaceHandle {
        LayerSurfaceHandle(Arc::new(LayerSurfaceHandleInner {
            id: next_surface_id(),
            namespace: namespace.into(),
            requested_output,
            state: Mutex::new(LayerHandleState {
                pending: initial,
                current: initial,
                configured_size: None,
                close_requested: false,
            }),
        }))
    }

    pub fn id(&self) -> usize {
        self.0.id
    }

    pub fn namespace(&self) -> &str {
        &self.0.namespace
    }

    pub fn requested_output(&self) -> Option<&str> {
        self.0.requested_output.as_deref()
    }

    pub fn current(&self) -> LayerSurfaceState {
        self.0.state.lock().current
    }

    pub fn set_pending(&self, f: impl FnOnce(&mut LayerSurfaceState)) {
        f(&mut self.0.state.lock().pending)
    }

    /// Applies pending state and reports what changed; called by the
    /// protocol glue on surface commit.
    pub fn commit_pending(&self) -> LayerStateDelta {
        let mut state = self.0.state.lock();
        let mut delta = LayerStateDelta::empty();
        let (old, new) = (state.current, state.pending);
        if old.layer != new.layer {
            delta |= LayerStateDelta::LAYER;
        }
        if old.desired_size != new.desired_size {
            delta |= LayerStateDelta::SIZE;
        }
        if old.exclusive_zone != new.exclusive_zone {
            delta |= LayerStateDelta::EXCLUSIVE_ZONE;
        }
        if old.anchor != new.anchor {
            delta |= LayerStateDelta::ANCHOR;
        }
        if old.margin != new.margin {
            delta |= LayerStateDelta::MARGIN;
        }
        if old.keyboard_interactivity != new.keyboard_interactivity {
            delta |= LayerStateDelta::INTERACTIVITY;
        }
        state.current = new;
        delta
    }

    pub fn configure(&self, size: Size<i32>) {
        self.0.state.lock().configured_size = Some(size);
    }

    pub fn configured_size(&self) -> Option<Size<i32>> {
        self.0.state.lock().configured_size
    }

    pub fn send_close(&self) {
        self.0.state.lock().close_requested = true;
    }

    pub fn close_requested(&self) -> bool {
        self.0.state.lock().close_requested
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupParent {
    Toplevel(ToplevelHandle),
    LayerSurface(LayerSurfaceHandle),
}

#[derive(Debug)]
struct PopupHandleInner {
    id: usize,
    parent: PopupParent,
    configured: Mutex<bool>,
}

/// Raw client handle for a child popup of a toplevel or layer surface.
#[derive(Debug, Clone)]
pub struct PopupHandle(Arc<PopupHandleInner>);

impl PartialEq for PopupHandle {
    fn eq(&self, other: &PopupHandle) -> bool {
        self.0.id == other.0.id
    }
}
impl Eq for PopupHandle {}

impl PopupHandle {
    pub fn new(parent: PopupParent) -> PopupHandle {
        PopupHandle(Arc::new(PopupHandleInner {
            id: next_surface_id(),
            parent,
            configured: Mutex::new(false),
        }))
    }

    pub fn id(&self) -> usize {
        self.0.id
    }

    pub fn parent(&self) -> &PopupParent {
        &self.0.parent
    }

    pub fn send_configure(&self) {
        *self.0.configured.lock() = true;
    }

    pub fn configured(&self) -> bool {
        *self.0.configured.lock()
    }
}

/// Everything the collaborator can tell the core.
#[derive(Debug, Clone)]
pub enum Event {
    NewOutput(OutputDevice),
    OutputRemoved(OutputDevice),
    NewInputDevice(InputDevice),
    InputDeviceRemoved(InputDevice),

    NewToplevel(ToplevelHandle),
    ToplevelMapped(ToplevelHandle),
    ToplevelUnmapped(ToplevelHandle),
    ToplevelCommit(ToplevelHandle),
    ToplevelDestroyed(ToplevelHandle),
    ToplevelRequestMove(ToplevelHandle),
    ToplevelRequestResize {
        toplevel: ToplevelHandle,
        edges: ResizeEdge,
    },
    ToplevelRequestFullscreen(ToplevelHandle),

    NewLayerSurface(LayerSurfaceHandle),
    LayerSurfaceMapped(LayerSurfaceHandle),
    LayerSurfaceUnmapped(LayerSurfaceHandle),
    LayerSurfaceCommit {
        surface: LayerSurfaceHandle,
        delta: LayerStateDelta,
    },
    LayerSurfaceDestroyed(LayerSurfaceHandle),

    NewPopup(PopupHandle),
    PopupDestroyed(PopupHandle),

    PointerMotion {
        time_msec: u32,
        delta: Point<f64>,
    },
    PointerMotionAbsolute {
        time_msec: u32,
        position: Point<f64>,
    },
    PointerButton {
        time_msec: u32,
        button: u32,
        state: ButtonState,
    },
    PointerAxis {
        time_msec: u32,
        horizontal: f64,
        vertical: f64,
    },
    PointerFrame,

    KeyboardKey {
        device: InputDevice,
        time_msec: u32,
        keycode: u32,
        state: KeyState,
        /// Keysym from the raw keycode, layout layer 0.
        raw_sym: Keysym,
        /// Keysym after full layout translation.
        sym: Keysym,
        modifiers: ModifiersState,
    },
    KeyboardModifiers {
        device: InputDevice,
        modifiers: ModifiersState,
    },
}

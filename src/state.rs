// SPDX-License-Identifier: GPL-3.0-only

use std::sync::Arc;

use calloop::LoopSignal;
use parking_lot::RwLock;
use tracing::trace;

use crate::backend::headless::HeadlessState;
use crate::backend::{Event, KeyState};
use crate::config::Config;
use crate::shell::Shell;

/// Which backend implementation drives this session.
#[derive(Debug)]
pub enum BackendData {
    Headless(HeadlessState),
    Unset,
}

impl BackendData {
    pub fn headless(&self) -> &HeadlessState {
        match self {
            BackendData::Headless(headless) => headless,
            BackendData::Unset => panic!("backend not initialized"),
        }
    }
}

/// Session-wide context shared by event handlers; replaces any global
/// state, so initialization order is explicit.
pub struct Common {
    pub config: Config,
    pub shell: Arc<RwLock<Shell>>,
    pub should_stop: bool,
    pub event_loop_signal: LoopSignal,
}

impl Common {
    /// Periodic housekeeping between dispatches.
    pub fn refresh(&mut self) {
        self.shell.write().refresh();
    }
}

pub struct State {
    pub common: Common,
    pub backend: BackendData,
}

impl State {
    pub fn new(config: Config, event_loop_signal: LoopSignal) -> State {
        State {
            common: Common {
                config,
                shell: Arc::new(RwLock::new(Shell::new())),
                should_stop: false,
                event_loop_signal,
            },
            backend: BackendData::Unset,
        }
    }

    /// Single entry point for everything the backend collaborator reports.
    /// Runs on the event loop thread; all shell mutation is serialized
    /// here.
    pub fn handle_backend_event(&mut self, event: Event) {
        match event {
            Event::NewOutput(device) => {
                self.common
                    .shell
                    .write()
                    .add_output(device, &self.common.config.static_conf);
            }
            Event::OutputRemoved(device) => {
                self.common.shell.write().remove_output(&device);
            }
            Event::NewInputDevice(device) => {
                self.common
                    .shell
                    .write()
                    .seat
                    .add_device(device, self.common.config.static_conf.key_repeat);
            }
            Event::InputDeviceRemoved(device) => {
                self.common.shell.write().seat.remove_device(&device);
            }

            Event::NewToplevel(handle) => {
                self.common.shell.write().new_toplevel(handle);
            }
            Event::ToplevelMapped(handle) => {
                self.common.shell.write().map_toplevel(&handle);
            }
            Event::ToplevelUnmapped(handle) => {
                self.common.shell.write().unmap_toplevel(&handle);
            }
            Event::ToplevelCommit(handle) => {
                self.common.shell.write().toplevel_commit(&handle);
            }
            Event::ToplevelDestroyed(handle) => {
                self.common.shell.write().toplevel_destroyed(&handle);
            }
            Event::ToplevelRequestMove(handle) => {
                let mut shell = self.common.shell.write();
                if let Some(toplevel) = shell.toplevel_by_handle(&handle).cloned() {
                    if shell.seat.cursor.mode == crate::input::CursorMode::Passthrough {
                        shell.begin_interactive(
                            &toplevel,
                            crate::input::CursorMode::Move,
                            crate::backend::ResizeEdge::empty(),
                        );
                    }
                }
            }
            Event::ToplevelRequestResize { toplevel, edges } => {
                let mut shell = self.common.shell.write();
                if let Some(toplevel) = shell.toplevel_by_handle(&toplevel).cloned() {
                    if shell.seat.cursor.mode == crate::input::CursorMode::Passthrough {
                        shell.begin_interactive(&toplevel, crate::input::CursorMode::Resize, edges);
                    }
                }
            }
            Event::ToplevelRequestFullscreen(handle) => {
                let mut shell = self.common.shell.write();
                if let Some(toplevel) = shell.toplevel_by_handle(&handle).cloned() {
                    shell.toggle_fullscreen(&toplevel);
                }
            }

            Event::NewLayerSurface(handle) => {
                self.common.shell.write().new_layer_surface(handle);
            }
            Event::LayerSurfaceMapped(handle) => {
                self.common.shell.write().map_layer_surface(&handle);
            }
            Event::LayerSurfaceUnmapped(handle) => {
                self.common.shell.write().unmap_layer_surface(&handle);
            }
            Event::LayerSurfaceCommit { surface, delta } => {
                self.common
                    .shell
                    .write()
                    .layer_surface_commit(&surface, delta);
            }
            Event::LayerSurfaceDestroyed(handle) => {
                self.common.shell.write().layer_surface_destroyed(&handle);
            }

            Event::NewPopup(popup) => {
                self.common.shell.write().add_popup(&popup);
            }
            Event::PopupDestroyed(popup) => {
                self.common.shell.write().remove_popup(&popup);
            }

            Event::PointerMotion { time_msec, delta } => {
                let mut shell = self.common.shell.write();
                let position = shell.seat.cursor.position + delta;
                shell.seat.cursor.position = position;
                shell.process_cursor_motion(time_msec);
            }
            Event::PointerMotionAbsolute {
                time_msec,
                position,
            } => {
                let mut shell = self.common.shell.write();
                shell.seat.cursor.position = position;
                shell.process_cursor_motion(time_msec);
            }
            Event::PointerButton { state, .. } => {
                self.common.shell.write().on_pointer_button(state);
            }
            Event::PointerAxis {
                horizontal,
                vertical,
                ..
            } => {
                self.common
                    .shell
                    .write()
                    .on_pointer_axis(horizontal, vertical);
            }
            Event::PointerFrame => {
                trace!("pointer frame");
            }

            Event::KeyboardKey {
                state,
                sym,
                modifiers,
                ..
            } => {
                {
                    self.common.shell.write().seat.modifiers = modifiers;
                }
                if state == KeyState::Pressed && self.handle_keybinding(modifiers, sym) {
                    return;
                }
                trace!(?sym, ?state, "key forwarded to the focused surface");
            }
            Event::KeyboardModifiers { modifiers, .. } => {
                self.common.shell.write().seat.modifiers = modifiers;
            }
        }
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! The shell: node lifecycle, window/workspace placement, pointer routing
//! and multi-output arrangement, glued to the seat's focus machinery.

use std::collections::HashMap;

use tracing::{debug, error, info, trace, warn};

use crate::backend::{
    Layer, LayerStateDelta, LayerSurfaceHandle, OutputDevice, PendingOutputState, PopupHandle,
    PopupParent, ResizeEdge, ToplevelHandle,
};
use crate::config::StaticConfig;
use crate::input::{CursorMode, Seat};
use crate::utils::prelude::*;

pub mod focus;
pub mod grabs;
pub mod layer;
pub mod node;
pub mod output;
pub mod scene;
pub mod toplevel;
pub mod workspace;

pub use self::focus::FocusResult;
use self::grabs::{GrabState, MoveGrab, ResizeGrab};
use self::layer::LayerSurface;
use self::node::Node;
use self::output::Output;
use self::scene::{SceneNodeId, SceneRoot};
use self::toplevel::Toplevel;
use self::workspace::Workspaces;

pub struct Shell {
    pub root: SceneRoot,
    pub outputs: Vec<Output>,
    pub workspaces: Workspaces,
    pub seat: Seat,

    /// All mapped windows, in map order.
    pub toplevels: Vec<Toplevel>,
    layer_surfaces: Vec<LayerSurface>,
    /// Toplevel handles announced but not yet mapped.
    pending_toplevels: Vec<ToplevelHandle>,
    popup_trees: HashMap<usize, SceneNodeId>,
}

impl Shell {
    pub fn new() -> Shell {
        Shell {
            root: SceneRoot::new(),
            outputs: Vec::new(),
            workspaces: Workspaces::new(),
            seat: Seat::new("seat0"),
            toplevels: Vec::new(),
            layer_surfaces: Vec::new(),
            pending_toplevels: Vec::new(),
            popup_trees: HashMap::new(),
        }
    }

    // ---------------------------------------------------------------------
    // outputs

    pub fn output_by_name(&self, name: &str) -> Option<&Output> {
        self.outputs.iter().find(|o| o.name() == name)
    }

    pub fn output_for_device(&self, device: &OutputDevice) -> Option<&Output> {
        self.outputs.iter().find(|o| o.device() == device)
    }

    /// The output the pointer currently lives on, else the first known one.
    pub fn focused_output(&self) -> Option<Output> {
        self.seat
            .active_output()
            .cloned()
            .or_else(|| self.outputs.first().cloned())
    }

    pub fn add_output(&mut self, device: OutputDevice, config: &StaticConfig) {
        info!(name = device.name(), "New output");
        let output = Output::new(device, &mut self.root);

        let output_config = config
            .outputs
            .get(output.name())
            .cloned()
            .unwrap_or_default();
        if let Err(err) = output.apply_config(&output_config, false) {
            warn!(
                ?err,
                output = output.name(),
                "Failed to apply output configuration, enabling the preferred mode"
            );
            let _ = output.device().commit_state(&PendingOutputState {
                mode: output.device().preferred_mode(),
                enabled: Some(true),
                ..Default::default()
            });
        }

        match output_config.position {
            Some((x, y)) => self.root.output_layout.add(&output, Point::new(x, y)),
            None => {
                self.root.output_layout.add_auto(&output);
            }
        }
        self.outputs.push(output.clone());
        self.root.arrange(&self.outputs);
        output.arrange_layers(&mut self.root.scene);

        let amount = config.workspaces.initial_workspaces.max(1);
        for _ in 0..amount {
            self.workspaces.create(&output, &mut self.root);
        }
        let first = output.workspaces()[0];
        let workspace = self.workspaces.get_mut(first).unwrap();
        workspace.active = true;
        workspace.set_enabled(&mut self.root.scene, true);
        output.set_active_workspace(first);

        if self.seat.active_output().is_none() {
            self.seat.set_active_output(&output);
        }
    }

    pub fn remove_output(&mut self, device: &OutputDevice) {
        let Some(output) = self.output_for_device(device).cloned() else {
            return;
        };
        info!(name = output.name(), "Output removed");

        // Layer surfaces die with their output.
        for surface in output.layer_surfaces() {
            surface.handle().send_close();
            if surface.is_mapped() {
                self.node_destroyed(Node::from(surface));
            } else {
                self.drop_layer_surface_quietly(&surface);
            }
        }

        self.root.output_layout.remove(&output);
        self.outputs.retain(|o| o != &output);
        self.seat.forget_output(&output);

        // Workspaces are re-homed to the first remaining output; their
        // windows keep their workspace membership.
        if let Some(fallback) = self.outputs.first().cloned() {
            for id in output.workspaces() {
                output.remove_workspace(id);
                if let Some(workspace) = self.workspaces.get_mut(id) {
                    workspace.output = fallback.clone();
                    fallback.add_workspace(id);
                    if workspace.active {
                        // The fallback already has an active workspace.
                        workspace.active = false;
                        workspace.set_enabled(&mut self.root.scene, false);
                    }
                }
            }
        }

        for layer in Layer::ALL {
            self.root.scene.destroy(output.shell_layer_tree(layer));
        }
        self.root.arrange(&self.outputs);
    }

    /// External reconfiguration entry point (`output` config blocks and the
    /// management protocol). A failed apply leaves everything untouched and
    /// reports the failure to the requester.
    pub fn apply_output_config(
        &mut self,
        name: &str,
        config: &arbor_comp_config::OutputConfig,
        test: bool,
    ) -> Result<(), output::OutputConfigError> {
        let Some(output) = self.output_by_name(name).cloned() else {
            debug!(name, "Ignoring configuration for unknown output");
            return Ok(());
        };
        output.apply_config(config, test)?;
        if test {
            return Ok(());
        }
        match config.position {
            Some((x, y)) => self.root.output_layout.add(&output, Point::new(x, y)),
            None => {
                self.root.output_layout.add_auto(&output);
            }
        }
        self.root.arrange(&self.outputs);
        output.arrange_layers(&mut self.root.scene);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // toplevels

    pub fn new_toplevel(&mut self, handle: ToplevelHandle) {
        self.pending_toplevels.push(handle);
    }

    pub fn toplevel_by_handle(&self, handle: &ToplevelHandle) -> Option<&Toplevel> {
        self.toplevels.iter().find(|t| t.handle() == handle)
    }

    /// Places a newly mapped window on the focused output's active
    /// workspace, centered in the usable area, and focuses it.
    pub fn map_toplevel(&mut self, handle: &ToplevelHandle) -> Option<Toplevel> {
        self.pending_toplevels.retain(|t| t != handle);
        let toplevel = Toplevel::new(handle.clone());

        let size = handle.pending_or_current_size();
        let Some(output) = self.focused_output() else {
            warn!("Mapped a toplevel without any output; parking it at the origin");
            toplevel.set_geometry(Rectangle::new((0, 0), size));
            self.toplevels.push(toplevel.clone());
            return Some(toplevel);
        };

        let workspace_id = output
            .active_workspace()
            .expect("output without an active workspace");

        let usable = output.usable_area();
        let local = Point::new(
            usable.loc.x + ((usable.size.w - size.w) / 2).max(0),
            usable.loc.y + ((usable.size.h - size.h) / 2).max(0),
        );
        let position = output.position() + local;
        toplevel.set_geometry(Rectangle::new(position, size));

        let workspace = self.workspaces.get_mut(workspace_id).unwrap();
        let scene_node = self.root.scene.create_tree(workspace.tree);
        self.root.scene.set_position(scene_node, position);
        toplevel.with_state(|state| {
            state.scene_node = Some(scene_node);
            state.workspace = Some(workspace_id);
        });
        workspace.floating.push(toplevel.clone());
        self.toplevels.push(toplevel.clone());

        let node = Node::from(toplevel.clone());
        self.root.new_node.emit(&node);
        let result = {
            let Shell {
                seat, workspaces, ..
            } = self;
            seat.on_new_node(&node, workspaces)
        };
        if result == FocusResult::Focused {
            self.root.scene.raise_to_top(scene_node);
        }
        Some(toplevel)
    }

    pub fn unmap_toplevel(&mut self, handle: &ToplevelHandle) {
        if let Some(toplevel) = self.toplevel_by_handle(handle).cloned() {
            self.node_destroyed(Node::from(toplevel));
        }
    }

    pub fn toplevel_commit(&mut self, handle: &ToplevelHandle) {
        if let Some(toplevel) = self.toplevel_by_handle(handle).cloned() {
            // The client acked a size; keep the compositor-side box in sync.
            let size = handle.pending_or_current_size();
            let mut geometry = toplevel.geometry();
            if !size.is_empty() && geometry.size != size && !toplevel.is_fullscreen() {
                geometry.size = size;
                toplevel.set_geometry(geometry);
            }
        } else if self.pending_toplevels.contains(handle) {
            // First commit: let the client pick its own size.
            if handle.with_state(|state| state.scheduled_size.is_none()) {
                handle.send_configure((0, 0).into());
            }
        }
    }

    pub fn toplevel_destroyed(&mut self, handle: &ToplevelHandle) {
        self.pending_toplevels.retain(|t| t != handle);
        // A destroy without unmap still tears the node down.
        self.unmap_toplevel(handle);
    }

    /// Routes a focus request through the seat with the shell's workspace
    /// state in reach.
    pub fn focus_node(&mut self, node: Option<&Node>) -> FocusResult {
        let Shell {
            seat, workspaces, ..
        } = self;
        seat.focus_node(node, workspaces)
    }

    pub fn focused_toplevel(&self) -> Option<Toplevel> {
        self.seat
            .focused_node()
            .and_then(|node| node.toplevel())
            .cloned()
    }

    fn move_toplevel(&mut self, toplevel: &Toplevel, position: Point<i32>) {
        let mut geometry = toplevel.geometry();
        geometry.loc = position;
        toplevel.set_geometry(geometry);
        if let Some(node) = toplevel.with_state(|state| state.scene_node) {
            self.root.scene.set_position(node, position);
        }
    }

    // ---------------------------------------------------------------------
    // layer surfaces

    pub fn layer_surface_by_handle(&self, handle: &LayerSurfaceHandle) -> Option<&LayerSurface> {
        self.layer_surfaces.iter().find(|s| s.handle() == handle)
    }

    pub fn new_layer_surface(&mut self, handle: LayerSurfaceHandle) -> Option<LayerSurface> {
        let output = handle
            .requested_output()
            .and_then(|name| self.output_by_name(name).cloned())
            .or_else(|| self.focused_output());
        let Some(output) = output else {
            error!(
                namespace = handle.namespace(),
                "No output to assign layer surface to"
            );
            handle.send_close();
            return None;
        };

        let layer = handle.current().layer;
        let surface = LayerSurface::new(handle, output.downgrade());
        let tree = self
            .root
            .scene
            .create_tree(output.shell_layer_tree(layer));
        self.root.scene.set_enabled(tree, false);
        let popup_tree = self.root.scene.create_tree(self.root.layers.layer_popups);
        surface.with_state(|state| {
            state.scene_node = Some(tree);
            state.popup_tree = Some(popup_tree);
        });
        output.add_layer_surface(surface.clone());
        self.layer_surfaces.push(surface.clone());
        Some(surface)
    }

    pub fn map_layer_surface(&mut self, handle: &LayerSurfaceHandle) {
        let Some(surface) = self.layer_surface_by_handle(handle).cloned() else {
            return;
        };
        surface.with_state(|state| state.mapped = true);
        if let Some(node) = surface.with_state(|state| state.scene_node) {
            self.root.scene.set_enabled(node, true);
        }
        if let Some(output) = surface.output() {
            output.arrange_layers(&mut self.root.scene);
        }

        let node = Node::from(surface.clone());
        self.root.new_node.emit(&node);
        let Shell {
            seat, workspaces, ..
        } = self;
        seat.on_new_node(&node, workspaces);
    }

    pub fn unmap_layer_surface(&mut self, handle: &LayerSurfaceHandle) {
        let Some(surface) = self.layer_surface_by_handle(handle).cloned() else {
            return;
        };
        if !surface.is_mapped() {
            return;
        }
        surface.with_state(|state| state.mapped = false);
        if let Some(node) = surface.with_state(|state| state.scene_node) {
            self.root.scene.set_enabled(node, false);
        }
        self.node_destroyed(Node::from(surface));
    }

    pub fn layer_surface_commit(&mut self, handle: &LayerSurfaceHandle, delta: LayerStateDelta) {
        let Some(surface) = self.layer_surface_by_handle(handle).cloned() else {
            return;
        };
        let Some(output) = surface.output() else {
            return;
        };

        if !surface.is_mapped() && handle.configured_size().is_none() {
            // Initial commit: acknowledge the desired size and arrange so
            // the first configure carries real geometry.
            handle.configure(handle.current().desired_size);
            output.arrange_layers(&mut self.root.scene);
            return;
        }

        if delta.contains(LayerStateDelta::LAYER) {
            if let Some(node) = surface.with_state(|state| state.scene_node) {
                let new_tree = output.shell_layer_tree(handle.current().layer);
                self.root.scene.reparent(node, new_tree);
            }
        }

        if delta.intersects(
            LayerStateDelta::LAYER
                | LayerStateDelta::SIZE
                | LayerStateDelta::EXCLUSIVE_ZONE
                | LayerStateDelta::ANCHOR
                | LayerStateDelta::MARGIN,
        ) {
            output.arrange_layers(&mut self.root.scene);
        }

        if delta.contains(LayerStateDelta::INTERACTIVITY) && surface.is_mapped() {
            let node = Node::from(surface.clone());
            let Shell {
                seat, workspaces, ..
            } = self;
            seat.rekey_node(&node, workspaces);
            if handle.current().keyboard_interactivity
                != crate::backend::KeyboardInteractivity::None
            {
                seat.focus_node(Some(&node), workspaces);
            }
        }
    }

    pub fn layer_surface_destroyed(&mut self, handle: &LayerSurfaceHandle) {
        if let Some(surface) = self.layer_surface_by_handle(handle).cloned() {
            if surface.is_mapped() {
                self.node_destroyed(Node::from(surface));
            } else {
                self.drop_layer_surface_quietly(&surface);
            }
        }
    }

    fn drop_layer_surface_quietly(&mut self, surface: &LayerSurface) {
        surface.kill();
        if let Some(output) = surface.output() {
            output.remove_layer_surface(surface);
        }
        let (scene_node, popup_tree) =
            surface.with_state(|state| (state.scene_node.take(), state.popup_tree.take()));
        if let Some(node) = scene_node {
            self.root.scene.destroy(node);
        }
        if let Some(tree) = popup_tree {
            self.root.scene.destroy(tree);
        }
        self.layer_surfaces.retain(|s| s != surface);
    }

    // ---------------------------------------------------------------------
    // node lifecycle

    /// Tears a node down: fires its destroy signal exactly once, detaches it
    /// from the seat, grabs, workspaces and the scene, then drops it.
    /// Calling this twice for the same node is a lifecycle bug.
    pub fn node_destroyed(&mut self, node: Node) {
        let first = match &node {
            Node::Toplevel(toplevel) => toplevel.kill(),
            Node::LayerSurface(surface) => surface.kill(),
        };
        assert!(first, "node destroy signalled twice");
        trace!(?node, "node destroyed");

        node.destroy_signal().emit(&node);
        self.root.node_destroy.emit(&node);

        // Destroying the grabbed node always resets the cursor.
        if self
            .seat
            .cursor
            .grab
            .as_ref()
            .is_some_and(|grab| Some(grab.window()) == node.toplevel())
        {
            self.seat.cursor.reset_mode();
        }

        {
            let Shell {
                seat, workspaces, ..
            } = self;
            seat.on_node_destroy(&node, workspaces);
        }

        match node {
            Node::Toplevel(toplevel) => {
                if let Some(id) = toplevel.with_state(|state| state.workspace) {
                    if let Some(workspace) = self.workspaces.get_mut(id) {
                        workspace.floating.retain(|w| w != &toplevel);
                        if workspace.fullscreen.as_ref() == Some(&toplevel) {
                            workspace.fullscreen = None;
                        }
                    }
                }
                let (scene_node, popup_tree) = toplevel
                    .with_state(|state| (state.scene_node.take(), state.popup_tree.take()));
                if let Some(node) = scene_node {
                    self.root.scene.destroy(node);
                }
                if let Some(tree) = popup_tree {
                    self.root.scene.destroy(tree);
                }
                self.toplevels.retain(|t| t != &toplevel);
            }
            Node::LayerSurface(surface) => {
                if let Some(output) = surface.output() {
                    output.remove_layer_surface(&surface);
                    output.arrange_layers(&mut self.root.scene);
                }
                let (scene_node, popup_tree) =
                    surface.with_state(|state| (state.scene_node.take(), state.popup_tree.take()));
                if let Some(node) = scene_node {
                    self.root.scene.destroy(node);
                }
                if let Some(tree) = popup_tree {
                    self.root.scene.destroy(tree);
                }
                self.layer_surfaces.retain(|s| s != &surface);
            }
        }
    }

    // ---------------------------------------------------------------------
    // popups

    pub fn add_popup(&mut self, popup: &PopupHandle) {
        let parent_tree = match popup.parent() {
            PopupParent::Toplevel(handle) => {
                let Some(toplevel) = self.toplevel_by_handle(handle).cloned() else {
                    return;
                };
                toplevel.with_state(|state| state.popup_tree).unwrap_or_else(|| {
                    let tree = self.root.scene.create_tree(self.root.layers.toplevel_popups);
                    toplevel.with_state(|state| state.popup_tree = Some(tree));
                    tree
                })
            }
            PopupParent::LayerSurface(handle) => {
                let Some(surface) = self.layer_surface_by_handle(handle).cloned() else {
                    return;
                };
                match surface.with_state(|state| state.popup_tree) {
                    Some(tree) => tree,
                    None => return,
                }
            }
        };
        let tree = self.root.scene.create_tree(parent_tree);
        self.popup_trees.insert(popup.id(), tree);
        popup.send_configure();
    }

    pub fn remove_popup(&mut self, popup: &PopupHandle) {
        if let Some(tree) = self.popup_trees.remove(&popup.id()) {
            if self.root.scene.contains(tree) {
                self.root.scene.destroy(tree);
            }
        }
    }

    // ---------------------------------------------------------------------
    // pointer

    /// Hit test against the scene, top to bottom: overlay and top shell
    /// layers, the fullscreen window, floating windows in stacking order,
    /// then the bottom layers. Returns the node plus surface-local
    /// coordinates.
    pub fn surface_under(&self, position: Point<f64>) -> Option<(Node, Point<f64>)> {
        let output = self.root.output_layout.output_at(position)?.clone();

        for layer in [Layer::Overlay, Layer::Top] {
            if let Some(hit) = self.layer_surface_under(&output, layer, position) {
                return Some(hit);
            }
        }

        if let Some(workspace) = output
            .active_workspace()
            .and_then(|id| self.workspaces.get(id))
        {
            if let Some(fullscreen) = &workspace.fullscreen {
                let geometry = fullscreen.geometry().to_f64();
                if geometry.contains(position) {
                    return Some((Node::from(fullscreen.clone()), position - geometry.loc));
                }
            }
            for window in workspace.floating.iter().rev() {
                let geometry = window.geometry().to_f64();
                if geometry.contains(position) {
                    return Some((Node::from(window.clone()), position - geometry.loc));
                }
            }
        }

        for layer in [Layer::Bottom, Layer::Background] {
            if let Some(hit) = self.layer_surface_under(&output, layer, position) {
                return Some(hit);
            }
        }
        None
    }

    fn layer_surface_under(
        &self,
        output: &Output,
        layer: Layer,
        position: Point<f64>,
    ) -> Option<(Node, Point<f64>)> {
        let origin = output.position();
        for surface in output.layer_surfaces().iter().rev() {
            if !surface.is_mapped() || surface.handle().current().layer != layer {
                continue;
            }
            let local = surface.geometry();
            let global = Rectangle::new(origin + local.loc, local.size).to_f64();
            if global.contains(position) {
                return Some((Node::from(surface.clone()), position - global.loc));
            }
        }
        None
    }

    /// Runs after the cursor position changed for any reason.
    pub fn process_cursor_motion(&mut self, _time_msec: u32) {
        let position = self.seat.cursor.position;
        match self.seat.cursor.mode {
            CursorMode::Passthrough => {
                if let Some(output) = self.root.output_layout.output_at(position).cloned() {
                    if self.seat.active_output() != Some(&output) {
                        self.seat.set_active_output(&output);
                        // Crossing outputs focuses that output's workspace.
                        if let Some(id) = output.active_workspace() {
                            self.activate_workspace(id);
                        }
                    }
                }
                let under = self.surface_under(position).map(|(node, _)| node);
                self.seat.set_pointer_focus(under);
            }
            CursorMode::Move => {
                if let Some(GrabState::Move(grab)) = self.seat.cursor.grab.clone() {
                    let location = grab.new_location(position);
                    self.move_toplevel(&grab.window, location);
                }
            }
            CursorMode::Resize => {
                if let Some(GrabState::Resize(grab)) = self.seat.cursor.grab.clone() {
                    let geometry = grab.new_geometry(position);
                    grab.window.set_geometry(geometry);
                    if let Some(node) = grab.window.with_state(|state| state.scene_node) {
                        self.root.scene.set_position(node, geometry.loc);
                    }
                    grab.window.handle().send_configure(geometry.size);
                }
            }
        }
    }

    pub fn on_pointer_button(
        &mut self,
        state: crate::backend::ButtonState,
    ) -> FocusResult {
        match state {
            crate::backend::ButtonState::Released => {
                // Any release ends an interactive move/resize.
                self.seat.cursor.reset_mode();
                FocusResult::Unchanged
            }
            crate::backend::ButtonState::Pressed => {
                let position = self.seat.cursor.position;
                let Some((node, _)) = self.surface_under(position) else {
                    return FocusResult::Unchanged;
                };
                let focusable = match &node {
                    Node::Toplevel(_) => true,
                    Node::LayerSurface(surface) => {
                        surface.handle().current().keyboard_interactivity
                            != crate::backend::KeyboardInteractivity::None
                    }
                };
                if !focusable {
                    return FocusResult::Unchanged;
                }
                let result = self.focus_node(Some(&node));
                if result == FocusResult::Focused {
                    if let Some(scene_node) =
                        node.toplevel().and_then(|t| t.with_state(|s| s.scene_node))
                    {
                        self.root.scene.raise_to_top(scene_node);
                    }
                }
                result
            }
        }
    }

    pub fn on_pointer_axis(&mut self, horizontal: f64, vertical: f64) {
        if self.seat.cursor.mode == CursorMode::Passthrough {
            if let Some(node) = self.seat.pointer_focus() {
                trace!(?node, horizontal, vertical, "axis forwarded");
            }
        }
    }

    /// Starts an interactive move or resize of a window. Calling this while
    /// another grab is active is a bug in the caller.
    pub fn begin_interactive(&mut self, toplevel: &Toplevel, mode: CursorMode, edges: ResizeEdge) {
        assert!(
            self.seat.cursor.mode == CursorMode::Passthrough,
            "interactive grab started while one is active"
        );
        if toplevel.is_fullscreen() {
            return;
        }
        let cursor = self.seat.cursor.position;
        let geometry = toplevel.geometry();
        match mode {
            CursorMode::Move => {
                self.seat.cursor.grab = Some(GrabState::Move(MoveGrab {
                    window: toplevel.clone(),
                    initial_window_location: geometry.loc,
                    initial_cursor_location: cursor,
                }));
            }
            CursorMode::Resize => {
                self.seat.cursor.grab = Some(GrabState::Resize(ResizeGrab {
                    window: toplevel.clone(),
                    edges,
                    initial_geometry: geometry,
                    initial_cursor_location: cursor,
                }));
            }
            CursorMode::Passthrough => unreachable!("passthrough is not a grab"),
        }
        self.seat.cursor.mode = mode;
    }

    // ---------------------------------------------------------------------
    // workspaces

    /// The `workspace <n>` entry point: switches to the workspace, creating
    /// it on the focused output if it does not exist yet.
    pub fn focus_or_create_workspace(&mut self, id: u32) {
        if !self.workspaces.contains(id) {
            let Some(output) = self.focused_output() else {
                warn!(id, "Cannot create workspace without an output");
                return;
            };
            self.workspaces.create_with_id(id, &output, &mut self.root);
        }
        self.switch_workspace_focus(id);
    }

    /// Workspace switch semantics: a no-op if the workspace is already
    /// active on the pointer-focused output; otherwise warps the pointer to
    /// its output, swaps the visible subtrees and restores keyboard focus.
    pub fn switch_workspace_focus(&mut self, id: u32) {
        let Some(workspace) = self.workspaces.get(id) else {
            return;
        };
        let output = workspace.output.clone();
        if workspace.active && self.seat.active_output() == Some(&output) {
            return;
        }

        self.seat.cursor.position = output.center();
        self.seat.set_active_output(&output);

        if let Some(old_id) = output.active_workspace() {
            if old_id != id {
                if let Some(old) = self.workspaces.get_mut(old_id) {
                    old.active = false;
                    old.set_enabled(&mut self.root.scene, false);
                }
            }
        }
        if let Some(workspace) = self.workspaces.get(id) {
            workspace.set_enabled(&mut self.root.scene, true);
        }
        self.activate_workspace(id);
    }

    /// Marks a workspace active on its output and re-establishes keyboard
    /// focus on its last focused window, if any.
    fn activate_workspace(&mut self, id: u32) {
        let Some(workspace) = self.workspaces.get_mut(id) else {
            return;
        };
        workspace.active = true;
        let output = workspace.output.clone();
        let last_focused = workspace.last_focused();
        output.set_active_workspace(id);

        if let Some(toplevel) = last_focused {
            let node = Node::from(toplevel);
            self.focus_node(Some(&node));
        }
    }

    // ---------------------------------------------------------------------
    // fullscreen

    /// Symmetric fullscreen toggle. Entering saves the window box and blows
    /// it up to the output box in the dedicated layer; leaving restores the
    /// saved box exactly. A workspace holds at most one fullscreen window.
    pub fn toggle_fullscreen(&mut self, toplevel: &Toplevel) {
        let Some(id) = self.workspaces.workspace_for(toplevel) else {
            return;
        };
        if toplevel.is_fullscreen() {
            self.unfullscreen(toplevel, id);
        } else {
            if let Some(existing) = self
                .workspaces
                .get(id)
                .and_then(|workspace| workspace.fullscreen.clone())
            {
                if &existing != toplevel {
                    self.unfullscreen(&existing, id);
                }
            }
            self.fullscreen(toplevel, id);
        }
    }

    fn fullscreen(&mut self, toplevel: &Toplevel, workspace_id: u32) {
        let Some(workspace) = self.workspaces.get_mut(workspace_id) else {
            return;
        };
        let output_box = workspace.output.geometry();
        let fs_tree = workspace.fs_tree;
        workspace.floating.retain(|w| w != toplevel);
        workspace.fullscreen = Some(toplevel.clone());

        toplevel.with_state(|state| {
            state.saved_geometry = Some(state.geometry);
            state.fullscreen = true;
            state.geometry = output_box;
        });
        if let Some(node) = toplevel.with_state(|state| state.scene_node) {
            self.root.scene.reparent(node, fs_tree);
            self.root.scene.set_position(node, output_box.loc);
        }
        toplevel.handle().send_configure(output_box.size);
    }

    fn unfullscreen(&mut self, toplevel: &Toplevel, workspace_id: u32) {
        let Some(workspace) = self.workspaces.get_mut(workspace_id) else {
            return;
        };
        if workspace.fullscreen.as_ref() != Some(toplevel) {
            return;
        }
        workspace.fullscreen = None;
        workspace.floating.push(toplevel.clone());
        let tree = workspace.tree;

        let restored = toplevel.with_state(|state| {
            state.fullscreen = false;
            state.geometry = state.saved_geometry.take().unwrap_or(state.geometry);
            state.geometry
        });
        if let Some(node) = toplevel.with_state(|state| state.scene_node) {
            self.root.scene.reparent(node, tree);
            self.root.scene.set_position(node, restored.loc);
        }
        toplevel.handle().send_configure(restored.size);
    }

    // ---------------------------------------------------------------------
    // housekeeping

    /// Periodic liveness sweep: drops dead references and fixes up focus if
    /// the focused node died without a proper destroy (which itself is a
    /// bug, but one we can survive).
    pub fn refresh(&mut self) {
        self.workspaces.refresh();
        self.toplevels.retain(|t| t.alive());
        self.layer_surfaces.retain(|s| s.alive());
        let Shell {
            seat, workspaces, ..
        } = self;
        seat.refresh_focus(workspaces);
    }
}

impl Default for Shell {
    fn default() -> Shell {
        Shell::new()
    }
}

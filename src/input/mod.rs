// SPDX-License-Identifier: GPL-3.0-only

//! The seat: input device registry, cursor state machine and the keyboard
//! focus authority.

use tracing::{debug, trace};

use arbor_comp_config::KeyRepeatConfig;

use crate::backend::{DeviceCapability, InputDevice, ModifiersState};
use crate::shell::focus::{FocusResult, FocusStack};
use crate::shell::grabs::GrabState;
use crate::shell::node::Node;
use crate::shell::output::Output;
use crate::shell::toplevel::ToplevelWeak;
use crate::shell::workspace::Workspaces;
use crate::utils::prelude::*;

pub mod actions;

/// What pointer events currently mean. Outside `Passthrough` all motion is
/// consumed by the active grab instead of being forwarded to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMode {
    Passthrough,
    Move,
    Resize,
}

/// Pointer position and interaction state.
#[derive(Debug)]
pub struct Cursor {
    pub position: Point<f64>,
    pub mode: CursorMode,
    pub grab: Option<GrabState>,
}

impl Cursor {
    fn new() -> Cursor {
        Cursor {
            position: Point::default(),
            mode: CursorMode::Passthrough,
            grab: None,
        }
    }

    /// Unconditionally returns to passthrough and forgets the grab.
    pub fn reset_mode(&mut self) {
        self.mode = CursorMode::Passthrough;
        self.grab = None;
    }
}

#[derive(Debug)]
pub struct KeyboardDevice {
    pub device: InputDevice,
    pub repeat_rate: i32,
    pub repeat_delay: i32,
}

/// The input routing authority for one logical set of pointer/keyboard
/// devices. One per session.
#[derive(Debug)]
pub struct Seat {
    name: String,
    devices: Vec<InputDevice>,
    keyboards: Vec<KeyboardDevice>,
    pub cursor: Cursor,

    /// Normal focus history, most recently used last.
    focus_stack: FocusStack,
    /// Focus history of nodes with exclusivity. While non-empty, its front
    /// element owns the keyboard and normal focus is suppressed.
    exclusivity_stack: FocusStack,
    focused_node: Option<Node>,
    /// Last toplevel that held keyboard focus; restored when focus would
    /// otherwise drop to nothing.
    previous_toplevel: ToplevelWeak,

    /// Output currently under the pointer.
    active_output: Option<Output>,
    /// Surface currently under the pointer (receives motion/axis events).
    pointer_focus: Option<Node>,
    pub modifiers: ModifiersState,
}

impl Seat {
    pub fn new(name: impl Into<String>) -> Seat {
        Seat {
            name: name.into(),
            devices: Vec::new(),
            keyboards: Vec::new(),
            cursor: Cursor::new(),
            focus_stack: FocusStack::new(),
            exclusivity_stack: FocusStack::new(),
            focused_node: None,
            previous_toplevel: ToplevelWeak::default(),
            active_output: None,
            pointer_focus: None,
            modifiers: ModifiersState::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_device(&mut self, device: InputDevice, repeat: KeyRepeatConfig) {
        debug!(name = device.name(), "New input device");
        if device.capability() == DeviceCapability::Keyboard {
            self.keyboards.push(KeyboardDevice {
                device: device.clone(),
                repeat_rate: repeat.rate,
                repeat_delay: repeat.delay,
            });
        }
        self.devices.push(device);
    }

    pub fn remove_device(&mut self, device: &InputDevice) {
        self.keyboards.retain(|k| &k.device != device);
        self.devices.retain(|d| d != device);
    }

    pub fn devices(&self) -> &[InputDevice] {
        &self.devices
    }

    pub fn keyboards(&self) -> &[KeyboardDevice] {
        &self.keyboards
    }

    pub fn has_keyboard(&self) -> bool {
        !self.keyboards.is_empty()
    }

    pub fn focused_node(&self) -> Option<&Node> {
        self.focused_node.as_ref()
    }

    pub fn pointer_focus(&self) -> Option<&Node> {
        self.pointer_focus.as_ref()
    }

    pub(crate) fn set_pointer_focus(&mut self, node: Option<Node>) {
        if self.pointer_focus != node {
            trace!(?node, "pointer focus change");
            self.pointer_focus = node;
        }
    }

    pub fn active_output(&self) -> Option<&Output> {
        self.active_output.as_ref()
    }

    pub fn set_active_output(&mut self, output: &Output) {
        self.active_output = Some(output.clone());
    }

    pub(crate) fn forget_output(&mut self, output: &Output) {
        if self.active_output.as_ref() == Some(output) {
            self.active_output = None;
        }
    }

    /// The node that should receive focus now: the front of the exclusivity
    /// stack if any, else the most recent normal node.
    pub fn get_next_focus(&self) -> Option<Node> {
        self.exclusivity_stack
            .last()
            .or_else(|| self.focus_stack.last())
            .cloned()
    }

    /// Re-resolves focus if the focused node silently died.
    pub fn refresh_focus(&mut self, workspaces: &mut Workspaces) {
        if self.focused_node.as_ref().is_some_and(|n| !n.alive()) {
            self.focused_node = None;
            let next = self.get_next_focus();
            self.focus_node(next.as_ref(), workspaces);
        }
    }

    /// Registers a freshly announced node and immediately focuses it.
    pub fn on_new_node(&mut self, node: &Node, workspaces: &mut Workspaces) -> FocusResult {
        if node.has_exclusivity() {
            self.exclusivity_stack.append(node);
        } else {
            self.focus_stack.append(node);
        }
        let result = self.focus_node(Some(node), workspaces);
        self.assert_invariants();
        result
    }

    /// Drops every reference to a node whose destroy signal just fired and,
    /// if it held focus, moves focus along.
    pub fn on_node_destroy(&mut self, node: &Node, workspaces: &mut Workspaces) {
        self.focus_stack.remove(node);
        self.exclusivity_stack.remove(node);

        if self.pointer_focus.as_ref() == Some(node) {
            self.pointer_focus = None;
        }
        if let Some(toplevel) = node.toplevel() {
            if self.previous_toplevel.is(toplevel) {
                self.previous_toplevel.clear();
            }
        }

        if self.focused_node.as_ref() == Some(node) {
            self.focused_node = None;
            let next = self.get_next_focus();
            self.focus_node(next.as_ref(), workspaces);
        }
        self.assert_invariants();
    }

    /// Moves a node between the two stacks after its exclusivity changed,
    /// then re-resolves focus.
    pub fn rekey_node(&mut self, node: &Node, workspaces: &mut Workspaces) {
        let known = self.focus_stack.remove(node) | self.exclusivity_stack.remove(node);
        if !known {
            return;
        }
        if node.has_exclusivity() {
            self.exclusivity_stack.append(node);
        } else {
            self.focus_stack.append(node);
        }
        if let Some(front) = self.exclusivity_stack.last().cloned() {
            if self.focused_node.as_ref() != Some(&front) {
                self.focused_node = None;
                self.focus_node(Some(&front), workspaces);
            }
        }
        self.assert_invariants();
    }

    /// The focus-resolution algorithm.
    ///
    /// A `None` target clears the keyboard focus, except that the last
    /// focused toplevel is restored if it is still mapped (the "overlay
    /// closed" path). An exclusive holder refuses any other target, and a
    /// layer surface never steals from a higher shell layer while any
    /// exclusive node exists.
    pub fn focus_node(&mut self, node: Option<&Node>, workspaces: &mut Workspaces) -> FocusResult {
        if let Some(current) = &self.focused_node {
            let target_exclusive = node.map(|n| n.has_exclusivity()).unwrap_or(false);
            if current.alive()
                && current.has_exclusivity()
                && node != Some(current)
                && !target_exclusive
            {
                return FocusResult::Refused;
            }
        }

        let Some(node) = node else {
            if let Some(previous) = self.previous_toplevel.upgrade() {
                let node = Node::from(previous);
                return self.focus_node(Some(&node), workspaces);
            }
            if self.focused_node.take().is_some() {
                trace!("keyboard focus cleared");
            }
            return FocusResult::Cleared;
        };

        debug_assert!(node.alive(), "focus request for a destroyed node");

        if self.focused_node.as_ref() == Some(node) && node.alive() {
            return FocusResult::Unchanged;
        }

        if let (Some(target_layer), Some(current_layer)) = (
            node.shell_layer(),
            self.focused_node.as_ref().and_then(|n| n.shell_layer()),
        ) {
            // A non-exclusive layer surface cannot climb past a higher
            // shell layer while any exclusive node exists; a new exclusive
            // node always may, it becomes the exclusivity front.
            if current_layer > target_layer
                && !node.has_exclusivity()
                && !self.exclusivity_stack.is_empty()
            {
                return FocusResult::Refused;
            }
        }

        if node.has_exclusivity() {
            self.exclusivity_stack.append(node);
        } else {
            self.focus_stack.append(node);
        }

        match node {
            Node::LayerSurface(surface) => {
                debug!(?surface, "focusing layer surface");
            }
            Node::Toplevel(toplevel) => {
                debug!(?toplevel, "focusing toplevel");
                let previously = self.previous_toplevel.upgrade();
                if let Some(previous) = previously.filter(|p| p != toplevel) {
                    previous.handle().set_activated(false);
                }
                toplevel.handle().set_activated(true);
                self.previous_toplevel = toplevel.downgrade();

                if let Some(id) = workspaces.workspace_for(toplevel) {
                    if let Some(workspace) = workspaces.get_mut(id) {
                        workspace.last_focused = toplevel.downgrade();
                    }
                }
            }
        }

        self.focused_node = Some(node.clone());
        self.assert_invariants();
        FocusResult::Focused
    }

    fn assert_invariants(&self) {
        if let Some(front) = self.exclusivity_stack.last() {
            debug_assert!(
                self.focused_node.as_ref() == Some(front),
                "exclusive node is not focused"
            );
        }
    }
}

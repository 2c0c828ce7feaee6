// SPDX-License-Identifier: GPL-3.0-only

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use crate::backend::ToplevelHandle;
use crate::shell::node::Node;
use crate::shell::scene::SceneNodeId;
use crate::utils::geometry::Rectangle;
use crate::utils::signal::Signal;
use crate::utils::IsAlive;

#[derive(Debug, Default)]
pub struct ToplevelState {
    /// Current position and size in global layout coordinates.
    pub geometry: Rectangle<i32>,
    /// Geometry to restore when fullscreen ends.
    pub saved_geometry: Option<Rectangle<i32>>,
    pub fullscreen: bool,
    pub scene_node: Option<SceneNodeId>,
    pub popup_tree: Option<SceneNodeId>,
    /// Id of the workspace whose floating list holds this window.
    pub workspace: Option<u32>,
}

pub(crate) struct ToplevelInner {
    handle: ToplevelHandle,
    alive: AtomicBool,
    destroy: Signal<Node>,
    pub(crate) state: Mutex<ToplevelState>,
}

/// An application window.
#[derive(Clone)]
pub struct Toplevel(Arc<ToplevelInner>);

impl std::fmt::Debug for Toplevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toplevel").field("id", &self.id()).finish()
    }
}

impl PartialEq for Toplevel {
    fn eq(&self, other: &Toplevel) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for Toplevel {}

impl std::hash::Hash for Toplevel {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl Toplevel {
    pub fn new(handle: ToplevelHandle) -> Toplevel {
        Toplevel(Arc::new(ToplevelInner {
            handle,
            alive: AtomicBool::new(true),
            destroy: Signal::new(),
            state: Mutex::new(ToplevelState::default()),
        }))
    }

    pub fn id(&self) -> usize {
        self.0.handle.id()
    }

    pub fn handle(&self) -> &ToplevelHandle {
        &self.0.handle
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&mut ToplevelState) -> R) -> R {
        f(&mut self.0.state.lock())
    }

    pub fn geometry(&self) -> Rectangle<i32> {
        self.0.state.lock().geometry
    }

    pub fn set_geometry(&self, geometry: Rectangle<i32>) {
        self.0.state.lock().geometry = geometry;
    }

    pub fn is_fullscreen(&self) -> bool {
        self.0.state.lock().fullscreen
    }

    pub fn destroy_signal(&self) -> Signal<Node> {
        self.0.destroy.clone()
    }

    /// Flips the handle dead. Returns whether this call was the one that
    /// killed it; a second kill is a lifecycle bug in the caller.
    pub(crate) fn kill(&self) -> bool {
        !self.0.alive.swap(false, Ordering::SeqCst)
    }

    pub fn downgrade(&self) -> ToplevelWeak {
        ToplevelWeak(Arc::downgrade(&self.0))
    }
}

impl IsAlive for Toplevel {
    fn alive(&self) -> bool {
        self.0.alive.load(Ordering::SeqCst)
    }
}

/// Weak back-reference to a toplevel; upgrades to `None` once the window is
/// destroyed, even if the allocation is still around.
#[derive(Clone, Default)]
pub struct ToplevelWeak(Weak<ToplevelInner>);

impl std::fmt::Debug for ToplevelWeak {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ToplevelWeak")
    }
}

impl ToplevelWeak {
    pub fn upgrade(&self) -> Option<Toplevel> {
        self.0
            .upgrade()
            .map(Toplevel)
            .filter(|toplevel| toplevel.alive())
    }

    /// Identity check that also matches a dead referent.
    pub fn is(&self, toplevel: &Toplevel) -> bool {
        std::ptr::eq(self.0.as_ptr(), Arc::as_ptr(&toplevel.0))
    }

    pub fn clear(&mut self) {
        self.0 = Weak::new();
    }
}

// SPDX-License-Identifier: GPL-3.0-only

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::backend::LayerSurfaceHandle;
use crate::shell::node::Node;
use crate::shell::output::WeakOutput;
use crate::shell::scene::SceneNodeId;
use crate::utils::geometry::Rectangle;
use crate::utils::signal::Signal;
use crate::utils::IsAlive;

#[derive(Debug, Default)]
pub struct LayerState {
    /// Geometry computed by the owning output's arrangement, in
    /// output-local coordinates.
    pub geometry: Rectangle<i32>,
    pub scene_node: Option<SceneNodeId>,
    pub popup_tree: Option<SceneNodeId>,
    pub mapped: bool,
}

pub(crate) struct LayerSurfaceInner {
    handle: LayerSurfaceHandle,
    output: WeakOutput,
    alive: AtomicBool,
    destroy: Signal<Node>,
    pub(crate) state: Mutex<LayerState>,
}

/// A shell-provided surface with a declared stacking layer (panel,
/// wallpaper, lock screen, on-screen keyboard).
#[derive(Clone)]
pub struct LayerSurface(Arc<LayerSurfaceInner>);

impl std::fmt::Debug for LayerSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerSurface")
            .field("id", &self.id())
            .field("namespace", &self.handle().namespace())
            .finish()
    }
}

impl PartialEq for LayerSurface {
    fn eq(&self, other: &LayerSurface) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for LayerSurface {}

impl std::hash::Hash for LayerSurface {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl LayerSurface {
    pub fn new(handle: LayerSurfaceHandle, output: WeakOutput) -> LayerSurface {
        LayerSurface(Arc::new(LayerSurfaceInner {
            handle,
            output,
            alive: AtomicBool::new(true),
            destroy: Signal::new(),
            state: Mutex::new(LayerState::default()),
        }))
    }

    pub fn id(&self) -> usize {
        self.0.handle.id()
    }

    pub fn handle(&self) -> &LayerSurfaceHandle {
        &self.0.handle
    }

    pub fn output(&self) -> Option<crate::shell::output::Output> {
        self.0.output.upgrade()
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&mut LayerState) -> R) -> R {
        f(&mut self.0.state.lock())
    }

    pub fn geometry(&self) -> Rectangle<i32> {
        self.0.state.lock().geometry
    }

    pub fn is_mapped(&self) -> bool {
        self.0.state.lock().mapped
    }

    pub fn destroy_signal(&self) -> Signal<Node> {
        self.0.destroy.clone()
    }

    pub(crate) fn kill(&self) -> bool {
        !self.0.alive.swap(false, Ordering::SeqCst)
    }
}

impl IsAlive for LayerSurface {
    fn alive(&self) -> bool {
        self.0.alive.load(Ordering::SeqCst)
    }
}

// SPDX-License-Identifier: GPL-3.0-only

use crate::backend::{KeyboardInteractivity, Layer};
use crate::shell::layer::LayerSurface;
use crate::shell::toplevel::Toplevel;
use crate::utils::signal::Signal;
use crate::utils::IsAlive;

/// Uniform handle for any focusable/stackable scene entity.
///
/// A node is announced through the scene root's `new_node` signal when its
/// surface maps and destroyed exactly once when it unmaps or dies; after the
/// destroy signal has fired, no stack may hold it and `alive()` is false.
/// Nodes are never recycled.
#[derive(Debug, Clone)]
pub enum Node {
    Toplevel(Toplevel),
    LayerSurface(LayerSurface),
}

impl PartialEq for Node {
    fn eq(&self, other: &Node) -> bool {
        self.id() == other.id()
    }
}
impl Eq for Node {}

impl std::hash::Hash for Node {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl Node {
    pub fn id(&self) -> usize {
        match self {
            Node::Toplevel(toplevel) => toplevel.id(),
            Node::LayerSurface(surface) => surface.id(),
        }
    }

    /// Exclusivity pre-empts all normal focus handling. Only top/overlay
    /// layer surfaces that requested exclusive keyboard interactivity have
    /// it; toplevels never do.
    pub fn has_exclusivity(&self) -> bool {
        match self {
            Node::Toplevel(_) => false,
            Node::LayerSurface(surface) => {
                let state = surface.handle().current();
                state.keyboard_interactivity == KeyboardInteractivity::Exclusive
                    && matches!(state.layer, Layer::Top | Layer::Overlay)
            }
        }
    }

    /// The shell layer for layer-surface nodes; `None` for toplevels.
    pub fn shell_layer(&self) -> Option<Layer> {
        match self {
            Node::Toplevel(_) => None,
            Node::LayerSurface(surface) => Some(surface.handle().current().layer),
        }
    }

    pub fn destroy_signal(&self) -> Signal<Node> {
        match self {
            Node::Toplevel(toplevel) => toplevel.destroy_signal(),
            Node::LayerSurface(surface) => surface.destroy_signal(),
        }
    }

    pub fn toplevel(&self) -> Option<&Toplevel> {
        match self {
            Node::Toplevel(toplevel) => Some(toplevel),
            Node::LayerSurface(_) => None,
        }
    }

    pub fn layer_surface(&self) -> Option<&LayerSurface> {
        match self {
            Node::Toplevel(_) => None,
            Node::LayerSurface(surface) => Some(surface),
        }
    }
}

impl IsAlive for Node {
    fn alive(&self) -> bool {
        match self {
            Node::Toplevel(toplevel) => toplevel.alive(),
            Node::LayerSurface(surface) => surface.alive(),
        }
    }
}

impl From<Toplevel> for Node {
    fn from(toplevel: Toplevel) -> Node {
        Node::Toplevel(toplevel)
    }
}

impl From<LayerSurface> for Node {
    fn from(surface: LayerSurface) -> Node {
        Node::LayerSurface(surface)
    }
}

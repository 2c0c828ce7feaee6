// SPDX-License-Identifier: GPL-3.0-only

//! The compositing scene graph owned by the core.
//!
//! Rendering itself happens in the backend collaborator; the core only owns
//! the structure: an arena of positioned, enableable trees with fixed
//! top-level layer containers, plus the 2-D arrangement of outputs.

use std::collections::HashMap;

use crate::backend::Layer;
use crate::shell::node::Node;
use crate::shell::output::Output;
use crate::utils::geometry::{Point, Rectangle};
use crate::utils::signal::Signal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneNodeId(usize);

#[derive(Debug)]
struct SceneNode {
    parent: Option<SceneNodeId>,
    children: Vec<SceneNodeId>,
    position: Point<i32>,
    enabled: bool,
}

/// Arena of scene trees. All operations on unknown ids are programmer
/// errors and panic.
#[derive(Debug, Default)]
pub struct Scene {
    nodes: HashMap<SceneNodeId, SceneNode>,
    next_id: usize,
}

impl Scene {
    pub fn new() -> Scene {
        Scene::default()
    }

    fn insert(&mut self, parent: Option<SceneNodeId>) -> SceneNodeId {
        let id = SceneNodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            SceneNode {
                parent,
                children: Vec::new(),
                position: Point::default(),
                enabled: true,
            },
        );
        if let Some(parent) = parent {
            self.node_mut(parent).children.push(id);
        }
        id
    }

    fn node(&self, id: SceneNodeId) -> &SceneNode {
        self.nodes.get(&id).expect("scene node used after destroy")
    }

    fn node_mut(&mut self, id: SceneNodeId) -> &mut SceneNode {
        self.nodes
            .get_mut(&id)
            .expect("scene node used after destroy")
    }

    pub fn create_root(&mut self) -> SceneNodeId {
        self.insert(None)
    }

    pub fn create_tree(&mut self, parent: SceneNodeId) -> SceneNodeId {
        assert!(self.nodes.contains_key(&parent), "parent tree is gone");
        self.insert(Some(parent))
    }

    pub fn reparent(&mut self, id: SceneNodeId, new_parent: SceneNodeId) {
        let old_parent = self.node(id).parent.expect("cannot reparent the root");
        self.node_mut(old_parent).children.retain(|c| *c != id);
        self.node_mut(new_parent).children.push(id);
        self.node_mut(id).parent = Some(new_parent);
    }

    pub fn set_position(&mut self, id: SceneNodeId, position: Point<i32>) {
        self.node_mut(id).position = position;
    }

    pub fn position(&self, id: SceneNodeId) -> Point<i32> {
        self.node(id).position
    }

    pub fn set_enabled(&mut self, id: SceneNodeId, enabled: bool) {
        self.node_mut(id).enabled = enabled;
    }

    pub fn enabled(&self, id: SceneNodeId) -> bool {
        self.node(id).enabled
    }

    /// Whether the node and all its ancestors are enabled.
    pub fn visible(&self, id: SceneNodeId) -> bool {
        let mut current = Some(id);
        while let Some(id) = current {
            let node = self.node(id);
            if !node.enabled {
                return false;
            }
            current = node.parent;
        }
        true
    }

    /// Moves `id` above all its current siblings.
    pub fn raise_to_top(&mut self, id: SceneNodeId) {
        if let Some(parent) = self.node(id).parent {
            let children = &mut self.node_mut(parent).children;
            children.retain(|c| *c != id);
            children.push(id);
        }
    }

    pub fn destroy(&mut self, id: SceneNodeId) {
        if let Some(node) = self.nodes.remove(&id) {
            if let Some(parent) = node.parent {
                if let Some(parent) = self.nodes.get_mut(&parent) {
                    parent.children.retain(|c| *c != id);
                }
            }
            for child in node.children {
                self.destroy_subtree(child);
            }
        }
    }

    fn destroy_subtree(&mut self, id: SceneNodeId) {
        if let Some(node) = self.nodes.remove(&id) {
            for child in node.children {
                self.destroy_subtree(child);
            }
        }
    }

    pub fn contains(&self, id: SceneNodeId) -> bool {
        self.nodes.contains_key(&id)
    }
}

/// The fixed stacking containers directly under the scene root, lowest
/// first. Per-output layer-shell subtrees are reparented into the matching
/// container whenever the output layout changes.
#[derive(Debug, Clone, Copy)]
pub struct RootLayers {
    pub shell_background: SceneNodeId,
    pub shell_bottom: SceneNodeId,
    pub floating: SceneNodeId,
    pub toplevel_popups: SceneNodeId,
    pub fullscreen: SceneNodeId,
    pub shell_top: SceneNodeId,
    pub shell_overlay: SceneNodeId,
    pub layer_popups: SceneNodeId,
    pub seat: SceneNodeId,
}

/// Owner of the scene, the output layout and the node announcement bus.
pub struct SceneRoot {
    pub scene: Scene,
    root: SceneNodeId,
    pub layers: RootLayers,
    pub output_layout: OutputLayout,
    /// Fires right after a node becomes known to the shell.
    pub new_node: Signal<Node>,
    /// Fires exactly once per node, synchronously, before its payload is
    /// torn down. Listeners must drop their references immediately.
    pub node_destroy: Signal<Node>,
}

impl SceneRoot {
    pub fn new() -> SceneRoot {
        let mut scene = Scene::new();
        let root = scene.create_root();
        let layers = RootLayers {
            shell_background: scene.create_tree(root),
            shell_bottom: scene.create_tree(root),
            floating: scene.create_tree(root),
            toplevel_popups: scene.create_tree(root),
            fullscreen: scene.create_tree(root),
            shell_top: scene.create_tree(root),
            shell_overlay: scene.create_tree(root),
            layer_popups: scene.create_tree(root),
            seat: scene.create_tree(root),
        };
        SceneRoot {
            scene,
            root,
            layers,
            output_layout: OutputLayout::default(),
            new_node: Signal::new(),
            node_destroy: Signal::new(),
        }
    }

    pub fn root(&self) -> SceneNodeId {
        self.root
    }

    /// Root container holding the per-output subtrees of a shell layer.
    pub fn shell_layer_container(&self, layer: Layer) -> SceneNodeId {
        match layer {
            Layer::Background => self.layers.shell_background,
            Layer::Bottom => self.layers.shell_bottom,
            Layer::Top => self.layers.shell_top,
            Layer::Overlay => self.layers.shell_overlay,
        }
    }

    /// Re-synchronizes per-output subtree positions with the output layout.
    /// Must run after any change to the layout or to an output's
    /// mode/transform/scale.
    pub fn arrange(&mut self, outputs: &[Output]) {
        for output in outputs {
            output.update_position(&self.output_layout);
            let position = output.position();
            for layer in Layer::ALL {
                let tree = output.shell_layer_tree(layer);
                self.scene.set_position(tree, position);
            }
        }
    }
}

impl Default for SceneRoot {
    fn default() -> SceneRoot {
        SceneRoot::new()
    }
}

/// The 2-D arrangement of outputs in the global space.
#[derive(Debug, Default)]
pub struct OutputLayout {
    entries: Vec<(Output, Point<i32>)>,
}

impl OutputLayout {
    pub fn add(&mut self, output: &Output, position: Point<i32>) {
        self.entries.retain(|(o, _)| o != output);
        self.entries.push((output.clone(), position));
    }

    /// Places the output right of the rightmost existing one, top-aligned.
    pub fn add_auto(&mut self, output: &Output) -> Point<i32> {
        let x = self
            .entries
            .iter()
            .map(|(output, position)| position.x + output.effective_resolution().w)
            .fold(0, std::cmp::max);
        let position = Point::new(x, 0);
        self.add(output, position);
        position
    }

    pub fn remove(&mut self, output: &Output) {
        self.entries.retain(|(o, _)| o != output);
    }

    pub fn position_of(&self, output: &Output) -> Option<Point<i32>> {
        self.entries
            .iter()
            .find(|(o, _)| o == output)
            .map(|(_, position)| *position)
    }

    pub fn geometry(&self, output: &Output) -> Option<Rectangle<i32>> {
        self.position_of(output)
            .map(|position| Rectangle::new(position, output.effective_resolution()))
    }

    pub fn output_at(&self, point: Point<f64>) -> Option<&Output> {
        self.entries
            .iter()
            .find(|(output, position)| {
                Rectangle::new(*position, output.effective_resolution())
                    .to_f64()
                    .contains(point)
            })
            .map(|(output, _)| output)
    }

    pub fn outputs(&self) -> impl Iterator<Item = &Output> {
        self.entries.iter().map(|(output, _)| output)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

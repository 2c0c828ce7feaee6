// SPDX-License-Identifier: GPL-3.0-only

use indexmap::IndexMap;

use crate::shell::output::Output;
use crate::shell::scene::{Scene, SceneNodeId, SceneRoot};
use crate::shell::toplevel::{Toplevel, ToplevelWeak};
use crate::utils::IsAlive;

/// A set of floating windows plus an optional fullscreen window, bound to
/// exactly one output at a time.
#[derive(Debug)]
pub struct Workspace {
    id: u32,
    pub output: Output,
    /// Subtree below the root floating container holding this workspace's
    /// windows; disabled while the workspace is hidden.
    pub tree: SceneNodeId,
    /// Subtree below the root fullscreen container.
    pub fs_tree: SceneNodeId,
    /// Stacking order, topmost last.
    pub floating: Vec<Toplevel>,
    pub fullscreen: Option<Toplevel>,
    pub last_focused: ToplevelWeak,
    pub active: bool,
}

impl Workspace {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn last_focused(&self) -> Option<Toplevel> {
        self.last_focused.upgrade()
    }

    pub fn set_enabled(&self, scene: &mut Scene, enabled: bool) {
        scene.set_enabled(self.tree, enabled);
        scene.set_enabled(self.fs_tree, enabled);
    }

    pub fn contains(&self, toplevel: &Toplevel) -> bool {
        self.floating.contains(toplevel)
            || self.fullscreen.as_ref() == Some(toplevel)
    }
}

/// Sole authority over workspace ids and storage.
///
/// Ids are allocated by lowest-unused-integer search starting at 1, so an id
/// is reused once the workspace holding it dies. A stale id captured before
/// the reuse will resolve to the new workspace; routing every lookup through
/// here keeps the door open for generation-tagged ids.
#[derive(Debug, Default)]
pub struct Workspaces {
    entries: IndexMap<u32, Workspace>,
}

impl Workspaces {
    pub fn new() -> Workspaces {
        Workspaces::default()
    }

    fn lowest_free_id(&self) -> u32 {
        let mut id = 1;
        while self.entries.contains_key(&id) {
            id += 1;
        }
        id
    }

    /// Creates a workspace bound to `output` with the next free id. The
    /// workspace starts hidden and inactive.
    pub fn create(&mut self, output: &Output, root: &mut SceneRoot) -> u32 {
        let id = self.lowest_free_id();
        self.create_with_id(id, output, root)
    }

    /// Creates a workspace with an explicit id (the `workspace <n>` command
    /// path). The id must be free.
    pub fn create_with_id(&mut self, id: u32, output: &Output, root: &mut SceneRoot) -> u32 {
        assert!(
            !self.entries.contains_key(&id),
            "workspace id {} already taken",
            id
        );
        let tree = root.scene.create_tree(root.layers.floating);
        let fs_tree = root.scene.create_tree(root.layers.fullscreen);
        root.scene.set_enabled(tree, false);
        root.scene.set_enabled(fs_tree, false);
        self.entries.insert(
            id,
            Workspace {
                id,
                output: output.clone(),
                tree,
                fs_tree,
                floating: Vec::new(),
                fullscreen: None,
                last_focused: ToplevelWeak::default(),
                active: false,
            },
        );
        output.add_workspace(id);
        id
    }

    pub fn get(&self, id: u32) -> Option<&Workspace> {
        self.entries.get(&id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Workspace> {
        self.entries.get_mut(&id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn remove(&mut self, id: u32) -> Option<Workspace> {
        let workspace = self.entries.shift_remove(&id)?;
        workspace.output.remove_workspace(id);
        Some(workspace)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Workspace> {
        self.entries.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Workspace> {
        self.entries.values_mut()
    }

    /// The workspace whose floating list (or fullscreen slot) holds the
    /// given window.
    pub fn workspace_for(&self, toplevel: &Toplevel) -> Option<u32> {
        self.entries
            .values()
            .find(|workspace| workspace.contains(toplevel))
            .map(|workspace| workspace.id)
    }

    /// Drops dead windows and dangling back-references; run from the
    /// periodic refresh.
    pub fn refresh(&mut self) {
        for workspace in self.entries.values_mut() {
            workspace.floating.retain(|window| window.alive());
            if workspace
                .fullscreen
                .as_ref()
                .is_some_and(|window| !window.alive())
            {
                workspace.fullscreen = None;
            }
            if workspace.last_focused.upgrade().is_none() {
                workspace.last_focused.clear();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Mode, OutputDevice, PendingOutputState};
    use crate::utils::geometry::Size;

    fn test_output(root: &mut SceneRoot) -> Output {
        let device = OutputDevice::new(
            "TEST-1",
            "make",
            "model",
            vec![Mode {
                size: Size::new(1920, 1080),
                refresh: 60_000,
                preferred: true,
            }],
        );
        device
            .commit_state(&PendingOutputState {
                mode: device.preferred_mode(),
                enabled: Some(true),
                ..Default::default()
            })
            .unwrap();
        Output::new(device, root)
    }

    #[test]
    fn ids_start_at_one_and_fill_the_lowest_hole() {
        let mut root = SceneRoot::new();
        let output = test_output(&mut root);
        let mut workspaces = Workspaces::new();

        assert_eq!(workspaces.create(&output, &mut root), 1);
        assert_eq!(workspaces.create(&output, &mut root), 2);
        assert_eq!(workspaces.create(&output, &mut root), 3);

        workspaces.remove(2);
        assert_eq!(workspaces.create(&output, &mut root), 2);
        assert_eq!(workspaces.create(&output, &mut root), 4);
    }

    #[test]
    fn explicit_ids_are_respected() {
        let mut root = SceneRoot::new();
        let output = test_output(&mut root);
        let mut workspaces = Workspaces::new();

        workspaces.create_with_id(7, &output, &mut root);
        assert!(workspaces.contains(7));
        assert_eq!(output.workspaces(), vec![7]);
        // The gap below stays available for automatic allocation.
        assert_eq!(workspaces.create(&output, &mut root), 1);
    }
}

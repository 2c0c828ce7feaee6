// SPDX-License-Identifier: GPL-3.0-only

use indexmap::IndexSet;

use crate::shell::node::Node;
use crate::utils::IsAlive;

/// Outcome of a focus request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusResult {
    /// Focus moved to the requested node.
    Focused,
    /// The node already held focus; nothing was signalled.
    Unchanged,
    /// An exclusive node (or a higher shell layer) kept the focus.
    Refused,
    /// Focus is now empty.
    Cleared,
}

/// Ordered node stack with most-recently-used semantics.
///
/// Backed by an [`IndexSet`] so membership tests are O(1) and a focus
/// change is a removal plus a re-insert at the most-recent end. Dead nodes
/// are skipped on read and dropped on the next write.
#[derive(Debug, Default)]
pub struct FocusStack {
    stack: IndexSet<Node>,
}

impl FocusStack {
    pub fn new() -> FocusStack {
        FocusStack::default()
    }

    /// Moves `node` to the most-recent position, inserting it if unknown.
    pub fn append(&mut self, node: &Node) {
        self.stack.retain(|n| n.alive());
        self.stack.shift_remove(node);
        self.stack.insert(node.clone());
    }

    pub fn remove(&mut self, node: &Node) -> bool {
        self.stack.shift_remove(node)
    }

    /// The most recently used node that is still alive.
    pub fn last(&self) -> Option<&Node> {
        self.stack.iter().rev().find(|n| n.alive())
    }

    pub fn contains(&self, node: &Node) -> bool {
        self.stack.contains(node)
    }

    /// True when no live node is on the stack.
    pub fn is_empty(&self) -> bool {
        self.last().is_none()
    }

    /// Most recently used first.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.stack.iter().rev().filter(|n| n.alive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ToplevelHandle;
    use crate::shell::toplevel::Toplevel;

    fn node() -> Node {
        Node::from(Toplevel::new(ToplevelHandle::new()))
    }

    #[test]
    fn append_moves_to_the_front() {
        let (a, b) = (node(), node());
        let mut stack = FocusStack::new();
        stack.append(&a);
        stack.append(&b);
        assert_eq!(stack.last(), Some(&b));
        stack.append(&a);
        assert_eq!(stack.last(), Some(&a));
        assert!(stack.contains(&b));
    }

    #[test]
    fn dead_nodes_are_invisible() {
        let (a, b) = (node(), node());
        let mut stack = FocusStack::new();
        stack.append(&a);
        stack.append(&b);
        b.toplevel().unwrap().kill();
        assert_eq!(stack.last(), Some(&a));
        a.toplevel().unwrap().kill();
        assert!(stack.is_empty());
    }
}

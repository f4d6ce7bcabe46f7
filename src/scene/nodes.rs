//! Traversal helpers over node subtrees

use super::Node;

/// How a subtree walk visits nodes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraverseOptions {
    /// Visit front to back instead of back to front
    pub reversed: bool,
    /// Descend into grandchildren and below
    pub recursive: bool,
    /// Visit the starting node itself
    pub include_root: bool,
}

impl TraverseOptions {
    /// Direct children only, back to front, root excluded
    #[must_use]
    pub const fn new() -> Self {
        Self {
            reversed: false,
            recursive: false,
            include_root: false,
        }
    }

    #[must_use]
    pub const fn reversed(mut self, reversed: bool) -> Self {
        self.reversed = reversed;
        self
    }

    #[must_use]
    pub const fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    #[must_use]
    pub const fn include_root(mut self, include_root: bool) -> Self {
        self.include_root = include_root;
        self
    }
}

/// Call `f` for each direct child, back to front.
///
/// Iterates over a snapshot, so `f` may restructure the tree.
pub fn for_each_child<F: FnMut(&Node)>(node: &Node, mut f: F) {
    for child in node.children() {
        f(&child);
    }
}

/// Call `f` for each direct child, front to back
pub fn for_each_child_reversed<F: FnMut(&Node)>(node: &Node, mut f: F) {
    for child in node.children().iter().rev() {
        f(child);
    }
}

/// Append the visited nodes to `out` in depth-first pre-order.
///
/// With `reversed` the sequence is the exact reverse of the forward walk.
/// Returns the number of nodes appended.
pub fn extract_children(node: &Node, out: &mut Vec<Node>, options: TraverseOptions) -> usize {
    let start = out.len();
    if options.include_root {
        out.push(node.clone());
    }
    collect(node, out, options.recursive);
    if options.reversed {
        out[start..].reverse();
    }
    out.len() - start
}

/// Count the nodes a walk with `options` would visit
#[must_use]
pub fn count_children(node: &Node, options: TraverseOptions) -> usize {
    let below = if options.recursive {
        node.child_count_recursive()
    } else {
        node.child_count()
    };
    below + usize::from(options.include_root)
}

fn collect(node: &Node, out: &mut Vec<Node>, recursive: bool) {
    for child in node.children() {
        out.push(child.clone());
        if recursive {
            collect(&child, out, true);
        }
    }
}

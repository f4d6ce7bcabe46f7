//! Scene graph node
//!
//! A `Node` is a reference-counted handle to a tree element carrying a 2D
//! transform. Parents hold strong handles to their children, children keep a
//! weak link back to their parent, so a detached subtree is released as soon
//! as the last outside handle to its root goes away.
//!
//! Local and world matrices are cached and recomputed lazily. Mutations only
//! set dirty flags; the flags are cleared by the next `local_matrix()` or
//! `world_matrix()` read.
//!
//! # Example
//!
//! ```ignore
//! let parent = Node::with_transform(Transform2::from_translation(Vec2::new(10.0, 0.0)));
//! let child = Node::with_parent(&parent);
//! child.set_translation(Vec2::new(20.0, 0.0));
//!
//! let p = child.local_to_world(Vec4::new(5.0, 0.0, 0.0, 1.0));
//! assert_eq!(p, Vec4::new(35.0, 0.0, 0.0, 1.0));
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

use bitflags::bitflags;
use glam::{Mat4, Vec2, Vec4};
use hecs::Entity;
use smallvec::SmallVec;

use crate::math::Transform2;

bitflags! {
    /// Which cached matrices are stale
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    struct DirtyFlags: u8 {
        const LOCAL_MATRIX = 0b01;
        const WORLD_MATRIX = 0b10;
    }
}

type NodeChildren = SmallVec<[Node; 8]>;

struct NodeData {
    owner: Cell<Option<Entity>>,
    transform: Cell<Transform2>,
    local_matrix: Cell<Mat4>,
    world_matrix: Cell<Mat4>,
    flags: Cell<DirtyFlags>,
    parent: RefCell<Weak<NodeData>>,
    children: RefCell<NodeChildren>,
}

impl Drop for NodeData {
    fn drop(&mut self) {
        // Surviving children become roots
        for child in self.children.get_mut().drain(..) {
            *child.0.parent.borrow_mut() = Weak::new();
            child.mark_dirty_world_matrix();
        }
    }
}

/// Strong handle to a scene graph node.
///
/// Cloning the handle shares the node. Equality and hashing are by identity.
#[derive(Clone)]
pub struct Node(Rc<NodeData>);

/// Weak handle to a node that does not keep it alive.
#[derive(Clone)]
pub struct WeakNode(Weak<NodeData>);

impl WeakNode {
    /// Attempt to get a strong handle back.
    ///
    /// Returns `None` if the node has been released.
    #[must_use]
    pub fn upgrade(&self) -> Option<Node> {
        self.0.upgrade().map(Node)
    }

    /// Check if the node is still alive
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl fmt::Debug for WeakNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakNode")
            .field("alive", &self.is_alive())
            .finish()
    }
}

// ============================================================================
// Construction
// ============================================================================

impl Node {
    /// Create a detached node with an identity transform
    #[must_use]
    pub fn new() -> Self {
        Self(Rc::new(NodeData {
            owner: Cell::new(None),
            transform: Cell::new(Transform2::IDENTITY),
            local_matrix: Cell::new(Mat4::IDENTITY),
            world_matrix: Cell::new(Mat4::IDENTITY),
            flags: Cell::new(DirtyFlags::empty()),
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(SmallVec::new()),
        }))
    }

    /// Create a detached node with the given transform
    #[must_use]
    pub fn with_transform(transform: Transform2) -> Self {
        let node = Self::new();
        node.set_transform(transform);
        node
    }

    /// Create a node appended to `parent`'s children
    #[must_use]
    pub fn with_parent(parent: &Node) -> Self {
        let node = Self::new();
        parent.add_child(&node);
        node
    }

    /// Create a node with a transform, appended to `parent`'s children
    #[must_use]
    pub fn with_parent_transform(parent: &Node, transform: Transform2) -> Self {
        let node = Self::with_parent(parent);
        node.set_transform(transform);
        node
    }

    /// Create a detached node bound to an entity
    #[must_use]
    pub fn with_owner(owner: Entity) -> Self {
        let node = Self::new();
        node.set_owner(Some(owner));
        node
    }

    /// Create a detached node bound to an entity, with a transform
    #[must_use]
    pub fn with_owner_transform(owner: Entity, transform: Transform2) -> Self {
        let node = Self::with_owner(owner);
        node.set_transform(transform);
        node
    }

    /// Create a node bound to an entity, appended to `parent`'s children
    #[must_use]
    pub fn with_owner_parent(owner: Entity, parent: &Node) -> Self {
        let node = Self::with_owner(owner);
        parent.add_child(&node);
        node
    }

    /// Create a weak handle to this node
    #[must_use]
    pub fn downgrade(&self) -> WeakNode {
        WeakNode(Rc::downgrade(&self.0))
    }

    /// Number of strong handles (including the parent's) to this node
    #[must_use]
    pub fn strong_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    /// Entity this node belongs to, if any
    #[must_use]
    pub fn owner(&self) -> Option<Entity> {
        self.0.owner.get()
    }

    /// Bind the node to an entity, or unbind it with `None`
    pub fn set_owner(&self, owner: Option<Entity>) {
        self.0.owner.set(owner);
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Transform and matrices
// ============================================================================

impl Node {
    /// Get the local transform
    #[must_use]
    pub fn transform(&self) -> Transform2 {
        self.0.transform.get()
    }

    /// Replace the local transform
    pub fn set_transform(&self, transform: Transform2) {
        self.0.transform.set(transform);
        self.mark_dirty_local_matrix();
    }

    /// Get the local translation
    #[must_use]
    pub fn translation(&self) -> Vec2 {
        self.0.transform.get().translation
    }

    /// Replace the local translation
    pub fn set_translation(&self, translation: Vec2) {
        self.update_transform(|t| t.translation = translation);
    }

    /// Get the local rotation in radians
    #[must_use]
    pub fn rotation(&self) -> f32 {
        self.0.transform.get().rotation
    }

    /// Replace the local rotation (radians)
    pub fn set_rotation(&self, rotation: f32) {
        self.update_transform(|t| t.rotation = rotation);
    }

    /// Get the local scale
    #[must_use]
    pub fn scale(&self) -> Vec2 {
        self.0.transform.get().scale
    }

    /// Replace the local scale
    pub fn set_scale(&self, scale: Vec2) {
        self.update_transform(|t| t.scale = scale);
    }

    fn update_transform(&self, f: impl FnOnce(&mut Transform2)) {
        let mut transform = self.0.transform.get();
        f(&mut transform);
        self.set_transform(transform);
    }

    /// Matrix of the local transform, recomputed only when stale
    #[must_use]
    pub fn local_matrix(&self) -> Mat4 {
        if self.clear_flag(DirtyFlags::LOCAL_MATRIX) {
            self.0.local_matrix.set(self.0.transform.get().matrix());
        }
        self.0.local_matrix.get()
    }

    /// Matrix mapping this node's space to world space, recomputed only when stale
    #[must_use]
    pub fn world_matrix(&self) -> Mat4 {
        if self.clear_flag(DirtyFlags::WORLD_MATRIX) {
            let local = self.local_matrix();
            let world = match self.parent() {
                Some(parent) => parent.world_matrix() * local,
                None => local,
            };
            self.0.world_matrix.set(world);
        }
        self.0.world_matrix.get()
    }

    /// Transform a homogeneous point from local to world space
    #[must_use]
    pub fn local_to_world(&self, local: Vec4) -> Vec4 {
        self.world_matrix() * local
    }

    /// Transform a homogeneous point from world to local space.
    ///
    /// A singular world matrix (e.g. zero scale somewhere up the chain) has no
    /// inverse; the point is then returned unchanged.
    #[must_use]
    pub fn world_to_local(&self, world: Vec4) -> Vec4 {
        self.try_world_to_local(world).unwrap_or_else(|| {
            log::warn!("world_to_local: singular world matrix, point left untransformed");
            world
        })
    }

    /// Transform a homogeneous point from world to local space.
    ///
    /// Returns `None` if the world matrix is not invertible.
    #[must_use]
    pub fn try_world_to_local(&self, world: Vec4) -> Option<Vec4> {
        let matrix = self.world_matrix();
        let det = matrix.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        Some(matrix.inverse() * world)
    }

    fn clear_flag(&self, flag: DirtyFlags) -> bool {
        let flags = self.0.flags.get();
        if flags.contains(flag) {
            self.0.flags.set(flags - flag);
            true
        } else {
            false
        }
    }

    fn set_flag(&self, flag: DirtyFlags) -> bool {
        let flags = self.0.flags.get();
        if flags.contains(flag) {
            false
        } else {
            self.0.flags.set(flags | flag);
            true
        }
    }

    fn mark_dirty_local_matrix(&self) {
        if self.set_flag(DirtyFlags::LOCAL_MATRIX) {
            self.mark_dirty_world_matrix();
        }
    }

    fn mark_dirty_world_matrix(&self) {
        // An already dirty node has dirty descendants
        if self.set_flag(DirtyFlags::WORLD_MATRIX) {
            for child in self.0.children.borrow().iter() {
                child.mark_dirty_world_matrix();
            }
        }
    }
}

// ============================================================================
// Navigation
// ============================================================================

impl Node {
    /// Walk up to the node with no parent (possibly this node)
    #[must_use]
    pub fn root(&self) -> Node {
        let mut node = self.clone();
        while let Some(parent) = node.parent() {
            node = parent;
        }
        node
    }

    /// Get the parent node
    #[must_use]
    pub fn parent(&self) -> Option<Node> {
        self.0.parent.borrow().upgrade().map(Node)
    }

    /// Check if this node has a parent
    #[must_use]
    pub fn has_parent(&self) -> bool {
        self.parent().is_some()
    }

    /// Check if `ancestor` is somewhere up this node's parent chain
    #[must_use]
    pub fn has_parent_recursive(&self, ancestor: &Node) -> bool {
        let mut current = self.parent();
        while let Some(node) = current {
            if node == *ancestor {
                return true;
            }
            current = node.parent();
        }
        false
    }

    /// Check if this node has any children
    #[must_use]
    pub fn has_children(&self) -> bool {
        !self.0.children.borrow().is_empty()
    }

    /// Check if `descendant` is somewhere below this node
    #[must_use]
    pub fn has_child_recursive(&self, descendant: &Node) -> bool {
        descendant.has_parent_recursive(self)
    }

    /// Number of direct children
    #[must_use]
    pub fn child_count(&self) -> usize {
        self.0.children.borrow().len()
    }

    /// Number of nodes in the subtree, excluding this node
    #[must_use]
    pub fn child_count_recursive(&self) -> usize {
        self.0
            .children
            .borrow()
            .iter()
            .map(|child| 1 + child.child_count_recursive())
            .sum()
    }

    /// Child at the back of the sibling order
    #[must_use]
    pub fn first_child(&self) -> Option<Node> {
        self.0.children.borrow().first().cloned()
    }

    /// Child at the front of the sibling order
    #[must_use]
    pub fn last_child(&self) -> Option<Node> {
        self.0.children.borrow().last().cloned()
    }

    /// Sibling directly behind this node
    #[must_use]
    pub fn prev_sibling(&self) -> Option<Node> {
        let parent = self.parent()?;
        let siblings = parent.0.children.borrow();
        let index = siblings.iter().position(|n| n == self)?;
        index.checked_sub(1).and_then(|i| siblings.get(i).cloned())
    }

    /// Sibling directly in front of this node
    #[must_use]
    pub fn next_sibling(&self) -> Option<Node> {
        let parent = self.parent()?;
        let siblings = parent.0.children.borrow();
        let index = siblings.iter().position(|n| n == self)?;
        siblings.get(index + 1).cloned()
    }

    /// Child at `index`, counting from the back
    #[must_use]
    pub fn child_at(&self, index: usize) -> Option<Node> {
        self.0.children.borrow().get(index).cloned()
    }

    /// Position of `child` among this node's children
    #[must_use]
    pub fn child_index(&self, child: &Node) -> Option<usize> {
        if !child.is_child_of(self) {
            return None;
        }
        self.0.children.borrow().iter().position(|n| n == child)
    }

    /// Snapshot of the direct children, back to front
    #[must_use]
    pub fn children(&self) -> Vec<Node> {
        self.0.children.borrow().to_vec()
    }

    fn is_child_of(&self, parent: &Node) -> bool {
        std::ptr::eq(self.0.parent.borrow().as_ptr(), Rc::as_ptr(&parent.0))
    }
}

// ============================================================================
// Structural changes
// ============================================================================

impl Node {
    /// Append `child` at the front of the sibling order.
    ///
    /// Same as [`Node::add_child_to_front`].
    pub fn add_child(&self, child: &Node) -> bool {
        self.add_child_to_front(child)
    }

    /// Insert `child` at `index`, counting from the back.
    ///
    /// Fails if `index` is past the end of the child list.
    pub fn add_child_at(&self, child: &Node, index: usize) -> bool {
        if index == 0 {
            return self.add_child_to_back(child);
        }
        match self.child_at(index - 1) {
            Some(after) => self.add_child_after(&after, child),
            None => false,
        }
    }

    /// Insert `child` behind all other children
    pub fn add_child_to_back(&self, child: &Node) -> bool {
        if !self.can_adopt(child) {
            return false;
        }
        if self.first_child().as_ref() == Some(child) {
            return true;
        }
        self.attach(child, |_, _| 0);
        true
    }

    /// Insert `child` in front of all other children
    pub fn add_child_to_front(&self, child: &Node) -> bool {
        if !self.can_adopt(child) {
            return false;
        }
        if self.last_child().as_ref() == Some(child) {
            return true;
        }
        self.attach(child, |children, _| children.len());
        true
    }

    /// Insert `child` directly behind `before`, which must be a child of this node
    pub fn add_child_before(&self, before: &Node, child: &Node) -> bool {
        if !before.is_child_of(self) || !self.can_adopt(child) {
            return false;
        }
        if before == child || before.prev_sibling().as_ref() == Some(child) {
            return true;
        }
        self.attach(child, |children, _| anchor_position(children, before));
        true
    }

    /// Insert `child` directly in front of `after`, which must be a child of this node
    pub fn add_child_after(&self, after: &Node, child: &Node) -> bool {
        if !after.is_child_of(self) || !self.can_adopt(child) {
            return false;
        }
        if after == child || after.next_sibling().as_ref() == Some(child) {
            return true;
        }
        self.attach(child, |children, len| {
            (anchor_position(children, after) + 1).min(len)
        });
        true
    }

    /// Insert `sibling` directly behind this node under the same parent
    pub fn add_sibling_before(&self, sibling: &Node) -> bool {
        match self.parent() {
            Some(parent) => parent.add_child_before(self, sibling),
            None => false,
        }
    }

    /// Insert `sibling` directly in front of this node under the same parent
    pub fn add_sibling_after(&self, sibling: &Node) -> bool {
        match self.parent() {
            Some(parent) => parent.add_child_after(self, sibling),
            None => false,
        }
    }

    /// Detach `child` from this node
    pub fn remove_child(&self, child: &Node) -> bool {
        if !child.is_child_of(self) {
            return false;
        }
        let removed = {
            let mut children = self.0.children.borrow_mut();
            match children.iter().position(|n| n == child) {
                Some(index) => children.remove(index),
                None => return false,
            }
        };
        *removed.0.parent.borrow_mut() = Weak::new();
        removed.mark_dirty_world_matrix();
        true
    }

    /// Detach this node from its parent
    pub fn remove_from_parent(&self) -> bool {
        match self.parent() {
            Some(parent) => parent.remove_child(self),
            None => false,
        }
    }

    /// Detach the child at `index` and hand it back
    pub fn remove_child_at(&self, index: usize) -> Option<Node> {
        let child = self.child_at(index)?;
        self.remove_child(&child).then_some(child)
    }

    /// Detach every child, front to back. Returns how many were removed.
    pub fn remove_all_children(&self) -> usize {
        let mut count = 0;
        while let Some(child) = self.last_child() {
            if !self.remove_child(&child) {
                break;
            }
            count += 1;
        }
        count
    }

    /// Exchange the positions of two children
    pub fn swap_children(&self, a: &Node, b: &Node) -> bool {
        if !a.is_child_of(self) || !b.is_child_of(self) {
            return false;
        }
        let mut children = self.0.children.borrow_mut();
        let index_a = children.iter().position(|n| n == a);
        let index_b = children.iter().position(|n| n == b);
        match (index_a, index_b) {
            (Some(i), Some(j)) => {
                children.swap(i, j);
                true
            }
            _ => false,
        }
    }

    /// Exchange the positions of the children at two indices
    pub fn swap_children_at(&self, a: usize, b: usize) -> bool {
        match (self.child_at(a), self.child_at(b)) {
            (Some(a), Some(b)) => self.swap_children(&a, &b),
            _ => false,
        }
    }

    /// Move one step towards the back. False if already at the back.
    pub fn send_backward(&self) -> bool {
        match self.prev_sibling() {
            Some(prev) => prev.add_sibling_before(self),
            None => false,
        }
    }

    /// Move behind all siblings
    pub fn bring_to_back(&self) -> bool {
        match self.parent() {
            Some(parent) => parent.add_child_to_back(self),
            None => false,
        }
    }

    /// Move one step towards the front. False if already at the front.
    pub fn send_forward(&self) -> bool {
        match self.next_sibling() {
            Some(next) => next.add_sibling_after(self),
            None => false,
        }
    }

    /// Move in front of all siblings
    pub fn bring_to_front(&self) -> bool {
        match self.parent() {
            Some(parent) => parent.add_child_to_front(self),
            None => false,
        }
    }

    /// A node may not adopt itself or one of its own ancestors
    fn can_adopt(&self, child: &Node) -> bool {
        child != self && !self.has_parent_recursive(child)
    }

    /// Detach `child` from wherever it is, then insert it at the position
    /// computed from this node's (post-detach) child list.
    fn attach(&self, child: &Node, position: impl FnOnce(&[Node], usize) -> usize) {
        child.remove_from_parent();
        {
            let mut children = self.0.children.borrow_mut();
            let len = children.len();
            let index = position(&children, len).min(len);
            children.insert(index, child.clone());
        }
        *child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
        child.mark_dirty_world_matrix();
    }
}

fn anchor_position(children: &[Node], anchor: &Node) -> usize {
    children
        .iter()
        .position(|n| n == anchor)
        .unwrap_or(children.len())
}

// ============================================================================
// Identity
// ============================================================================

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Rc::as_ptr(&self.0).hash(state);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("owner", &self.owner())
            .field("transform", &self.transform())
            .field("has_parent", &self.has_parent())
            .field("child_count", &self.child_count())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn order(parent: &Node) -> Vec<Node> {
        parent.children()
    }

    /// Parent with three children added in order
    fn family() -> (Node, Node, Node, Node) {
        let p = Node::new();
        let n1 = Node::with_parent(&p);
        let n2 = Node::with_parent(&p);
        let n3 = Node::with_parent(&p);
        (p, n1, n2, n3)
    }

    #[test]
    fn test_empty_node() {
        let n = Node::new();
        assert_eq!(n.root(), n);
        assert!(n.parent().is_none());
        assert_eq!(n.child_count(), 0);
        assert!(n.prev_sibling().is_none());
        assert!(n.next_sibling().is_none());
        assert!(n.owner().is_none());
    }

    #[test]
    fn test_owner() {
        let mut world = hecs::World::new();
        let entity = world.spawn(());

        let n = Node::with_owner(entity);
        assert_eq!(n.owner(), Some(entity));

        n.set_owner(None);
        assert!(n.owner().is_none());
    }

    #[test]
    fn test_add_child_sets_parent() {
        let p = Node::new();
        let n = Node::new();

        assert!(p.add_child(&n));
        assert_eq!(n.parent(), Some(p.clone()));
        assert_eq!(p.child_count(), 1);

        // Re-adding is a no-op
        assert!(p.add_child(&n));
        assert_eq!(n.parent(), Some(p.clone()));
        assert_eq!(p.child_count(), 1);
    }

    #[test]
    fn test_add_self_rejected() {
        let p = Node::new();
        assert!(!p.add_child(&p));
        assert!(!p.add_child_to_back(&p));
        assert!(!p.add_child_at(&p, 0));
        assert!(!p.has_parent());
    }

    #[test]
    fn test_add_ancestor_rejected() {
        let root = Node::new();
        let mid = Node::with_parent(&root);
        let leaf = Node::with_parent(&mid);

        assert!(!leaf.add_child(&root));
        assert!(!leaf.add_child(&mid));
        assert_eq!(leaf.child_count(), 0);
        assert_eq!(root.child_count_recursive(), 2);
    }

    #[test]
    fn test_reparent_detaches_from_old_parent() {
        let p1 = Node::new();
        let p2 = Node::new();
        let n = Node::with_parent(&p1);

        assert!(p2.add_child(&n));
        assert_eq!(n.parent(), Some(p2.clone()));
        assert_eq!(p1.child_count(), 0);
        assert_eq!(p2.child_count(), 1);
    }

    #[test]
    fn test_root() {
        let p1 = Node::new();
        let p2 = Node::with_parent(&p1);
        let n1 = Node::with_parent(&p1);
        let n2 = Node::with_parent(&p2);

        assert_eq!(n1.root(), p1);
        assert_eq!(n2.root(), p1);
        assert_eq!(p2.parent(), Some(p1.clone()));
    }

    #[test]
    fn test_has_parent_recursive() {
        let p = Node::new();
        let n = Node::with_parent(&p);

        assert!(!p.has_parent());
        assert!(!p.has_parent_recursive(&n));
        assert!(n.has_parent());
        assert!(n.has_parent_recursive(&p));

        let pp = Node::new();
        assert!(!n.has_parent_recursive(&pp));
        assert!(!pp.has_parent_recursive(&pp));

        pp.add_child(&p);
        assert!(n.has_parent_recursive(&p));
        assert!(n.has_parent_recursive(&pp));
        assert!(!n.has_parent_recursive(&n));
    }

    #[test]
    fn test_has_child_recursive() {
        let p = Node::new();
        assert!(!p.has_children());

        let n = Node::with_parent(&p);
        assert!(p.has_children());
        assert!(p.has_child_recursive(&n));
        assert!(!n.has_child_recursive(&p));

        let pp = Node::new();
        pp.add_child(&p);
        assert!(pp.has_child_recursive(&p));
        assert!(pp.has_child_recursive(&n));
        assert!(!n.has_child_recursive(&pp));
    }

    #[test]
    fn test_remove_from_parent() {
        let (p, n1, n2, _) = family();

        let lone = Node::new();
        assert!(!lone.remove_from_parent());
        assert_eq!(lone.root(), lone);

        assert!(n1.remove_from_parent());
        assert!(!n1.has_parent());
        assert_eq!(n1.root(), n1);
        assert_eq!(p.child_count(), 2);

        assert!(n2.remove_from_parent());
        assert!(!n2.has_parent());
        assert_eq!(p.child_count(), 1);
    }

    #[test]
    fn test_remove_all_children() {
        let (p, n1, n2, n3) = family();
        assert_eq!(p.remove_all_children(), 3);
        assert!(!n1.has_parent());
        assert!(!n2.has_parent());
        assert!(!n3.has_parent());
        assert_eq!(p.child_count(), 0);
        assert_eq!(p.remove_all_children(), 0);
    }

    #[test]
    fn test_remove_child_from_wrong_parent() {
        let (p, n1, _, _) = family();
        let other = Node::new();
        assert!(!other.remove_child(&n1));
        assert_eq!(n1.parent(), Some(p));
    }

    #[test]
    fn test_remove_child_at() {
        let (p, n1, n2, n3) = family();

        assert!(n1.remove_child_at(0).is_none());

        assert_eq!(p.remove_child_at(1), Some(n2.clone()));
        assert!(!n2.has_parent());
        assert_eq!(p.child_count(), 2);

        assert_eq!(p.remove_child_at(0), Some(n1.clone()));
        assert_eq!(p.remove_child_at(0), Some(n3.clone()));
        assert_eq!(p.child_count(), 0);
        assert!(p.remove_child_at(0).is_none());
    }

    #[test]
    fn test_child_count_recursive() {
        let p1 = Node::new();
        assert_eq!(p1.child_count_recursive(), 0);

        let p2 = Node::with_parent(&p1);
        let _n1 = Node::with_parent(&p2);
        let _n2 = Node::with_parent(&p2);

        assert_eq!(p1.child_count(), 1);
        assert_eq!(p1.child_count_recursive(), 3);
        assert_eq!(p2.child_count_recursive(), 2);
    }

    #[test]
    fn test_send_backward_and_bring_to_back() {
        let (p, n1, n2, n3) = family();

        assert!(n3.send_backward());
        assert_eq!(order(&p), vec![n1.clone(), n3.clone(), n2.clone()]);

        assert!(n3.send_backward());
        assert_eq!(order(&p), vec![n3.clone(), n1.clone(), n2.clone()]);

        assert!(!n3.send_backward());
        assert_eq!(order(&p), vec![n3.clone(), n1.clone(), n2.clone()]);

        assert!(n2.bring_to_back());
        assert_eq!(order(&p), vec![n2.clone(), n3.clone(), n1.clone()]);

        // Already at the back: idempotent
        assert!(n2.bring_to_back());
        assert_eq!(order(&p), vec![n2, n3, n1]);

        let lone = Node::new();
        assert!(!lone.send_backward());
        assert!(!lone.bring_to_back());
    }

    #[test]
    fn test_send_forward_and_bring_to_front() {
        let (p, n1, n2, n3) = family();

        assert!(n1.send_forward());
        assert_eq!(order(&p), vec![n2.clone(), n1.clone(), n3.clone()]);

        assert!(n1.send_forward());
        assert_eq!(order(&p), vec![n2.clone(), n3.clone(), n1.clone()]);

        assert!(!n1.send_forward());

        assert!(n2.bring_to_front());
        assert_eq!(order(&p), vec![n3.clone(), n1.clone(), n2.clone()]);

        assert!(n2.bring_to_front());
        assert_eq!(order(&p), vec![n3, n1, n2]);

        let lone = Node::new();
        assert!(!lone.send_forward());
        assert!(!lone.bring_to_front());
    }

    #[test]
    fn test_swap_children() {
        let (p, n1, n2, n3) = family();

        let p2 = Node::new();
        let n4 = Node::with_parent(&p2);
        let n5 = Node::new();

        assert!(!p.swap_children(&n1, &p2));
        assert!(!p.swap_children(&n1, &n4));
        assert!(!p.swap_children(&n5, &n1));

        assert!(p.swap_children(&n1, &n1));
        assert!(p.swap_children(&n1, &n2)); // n2 n1 n3
        assert!(p.swap_children(&n2, &n3)); // n3 n1 n2
        assert!(p.swap_children(&n2, &n1)); // n3 n2 n1

        assert_eq!(order(&p), vec![n3, n2, n1]);
    }

    #[test]
    fn test_swap_children_at() {
        let (p, n1, n2, n3) = family();

        assert!(!p.swap_children_at(0, 3));
        assert!(!p.swap_children_at(3, 0));

        assert!(p.swap_children_at(0, 2));
        assert_eq!(order(&p), vec![n3.clone(), n2.clone(), n1.clone()]);
        assert_eq!(n2.parent(), Some(p));
    }

    #[test]
    fn test_first_last_child() {
        let p = Node::new();
        assert!(p.first_child().is_none());
        assert!(p.last_child().is_none());

        let n1 = Node::with_parent(&p);
        let _n2 = Node::with_parent(&p);
        let n3 = Node::with_parent(&p);

        assert_eq!(p.first_child(), Some(n1));
        assert_eq!(p.last_child(), Some(n3));
    }

    #[test]
    fn test_siblings() {
        let (_p, n1, n2, n3) = family();

        assert!(n1.prev_sibling().is_none());
        assert_eq!(n1.next_sibling(), Some(n2.clone()));
        assert_eq!(n2.prev_sibling(), Some(n1.clone()));
        assert_eq!(n2.next_sibling(), Some(n3.clone()));
        assert_eq!(n3.prev_sibling(), Some(n2));
        assert!(n3.next_sibling().is_none());
    }

    #[test]
    fn test_child_at_and_index() {
        let (p, n1, n2, n3) = family();

        assert_eq!(p.child_at(0), Some(n1.clone()));
        assert_eq!(p.child_at(2), Some(n3.clone()));
        assert!(p.child_at(3).is_none());

        let stranger = Node::new();
        assert_eq!(p.child_index(&n1), Some(0));
        assert_eq!(p.child_index(&n2), Some(1));
        assert_eq!(p.child_index(&n3), Some(2));
        assert_eq!(p.child_index(&stranger), None);
    }

    #[test]
    fn test_add_child_at() {
        let p = Node::new();
        let n1 = Node::new();
        let n2 = Node::new();
        let n3 = Node::new();
        let n4 = Node::new();

        assert!(!p.add_child_at(&n1, 1));

        assert!(p.add_child_at(&n1, 0)); // n1
        assert!(p.add_child_at(&n2, 0)); // n2 n1
        assert!(p.add_child_at(&n3, 2)); // n2 n1 n3
        assert!(p.add_child_at(&n4, 2)); // n2 n1 n4 n3
        assert_eq!(
            order(&p),
            vec![n2.clone(), n1.clone(), n4.clone(), n3.clone()]
        );

        assert!(!p.add_child_at(&n1, 5));
        assert!(p.add_child_at(&n1, 4)); // n2 n4 n3 n1
        assert!(p.add_child_at(&n3, 0)); // n3 n2 n4 n1
        assert!(p.add_child_at(&n4, 1)); // n3 n4 n2 n1
        let index = p.child_index(&n4).unwrap_or_default();
        assert!(p.add_child_at(&n4, index));

        assert_eq!(order(&p), vec![n3, n4, n2, n1]);
    }

    #[test]
    fn test_add_child_to_back() {
        let p = Node::new();
        let n1 = Node::new();
        let n2 = Node::new();
        let n3 = Node::new();

        assert!(p.add_child_to_back(&n1));
        assert!(p.add_child_to_back(&n2));
        assert!(p.add_child_to_back(&n3));
        assert_eq!(order(&p), vec![n3.clone(), n2.clone(), n1.clone()]);

        assert!(p.add_child_to_back(&n1)); // n1 n3 n2
        assert_eq!(order(&p), vec![n1.clone(), n3.clone(), n2.clone()]);

        // Second call changes nothing
        assert!(p.add_child_to_back(&n1));
        assert_eq!(order(&p), vec![n1.clone(), n3.clone(), n2.clone()]);
        assert_eq!(n1.parent(), Some(p.clone()));

        let p2 = Node::new();
        assert!(p2.add_child_to_back(&n1));
        assert_eq!(n1.parent(), Some(p2));
        assert!(n1.prev_sibling().is_none());
        assert!(n1.next_sibling().is_none());
        assert_eq!(p.child_count(), 2);
    }

    #[test]
    fn test_add_child_to_front() {
        let p = Node::new();
        let n1 = Node::new();
        let n2 = Node::new();
        let n3 = Node::new();

        assert!(p.add_child_to_front(&n1));
        assert!(p.add_child_to_front(&n2));
        assert!(p.add_child_to_front(&n3));
        assert_eq!(order(&p), vec![n1.clone(), n2.clone(), n3.clone()]);

        assert!(p.add_child_to_front(&n1)); // n2 n3 n1
        assert!(p.add_child_to_front(&n1));
        assert_eq!(order(&p), vec![n2, n3, n1]);
    }

    #[test]
    fn test_add_sibling_before() {
        let p = Node::new();
        let n1 = Node::new();
        let n2 = Node::new();
        let n3 = Node::new();

        assert!(p.add_child(&n1)); // n1
        assert!(n1.add_sibling_before(&n2)); // n2 n1
        assert!(n1.add_sibling_before(&n3)); // n2 n3 n1
        assert!(n1.add_sibling_before(&n1));
        assert!(n3.add_sibling_before(&n2));
        assert!(!p.add_sibling_before(&n3));
        assert_eq!(order(&p), vec![n2.clone(), n3.clone(), n1.clone()]);

        assert!(n3.add_sibling_before(&n1)); // n2 n1 n3
        assert!(n2.add_sibling_before(&n3)); // n3 n2 n1
        assert_eq!(order(&p), vec![n3.clone(), n2.clone(), n1.clone()]);

        let p2 = Node::new();
        let n4 = Node::with_parent(&p2);
        assert!(n4.add_sibling_before(&n2)); // n2 n4
        assert_eq!(order(&p2), vec![n2.clone(), n4]);
        assert_eq!(p.child_count(), 2);
        assert_eq!(n1.parent(), Some(p));
    }

    #[test]
    fn test_add_sibling_after() {
        let p = Node::new();
        let n1 = Node::new();
        let n2 = Node::new();
        let n3 = Node::new();

        assert!(p.add_child(&n1)); // n1
        assert!(n1.add_sibling_after(&n2)); // n1 n2
        assert!(n1.add_sibling_after(&n3)); // n1 n3 n2
        assert!(n1.add_sibling_after(&n1));
        assert!(n3.add_sibling_after(&n2));
        assert_eq!(order(&p), vec![n1.clone(), n3.clone(), n2.clone()]);

        assert!(n3.add_sibling_after(&n1)); // n3 n1 n2
        assert!(n2.add_sibling_after(&n3)); // n1 n2 n3
        assert_eq!(order(&p), vec![n1, n2, n3]);
    }

    #[test]
    fn test_add_child_before_foreign_anchor() {
        let (p, n1, _, _) = family();
        let other = Node::new();
        let anchor = Node::with_parent(&other);
        assert!(!p.add_child_before(&anchor, &n1));
        assert!(!p.add_child_after(&anchor, &n1));
        assert_eq!(n1.parent(), Some(p));
    }

    #[test]
    fn test_transform_accessors() {
        let p = Node::new();
        assert_eq!(p.transform(), Transform2::IDENTITY);
        assert_eq!(p.translation(), Vec2::ZERO);
        assert_eq!(p.scale(), Vec2::ONE);

        p.set_translation(Vec2::new(1.0, 2.0));
        p.set_rotation(1.0);
        p.set_scale(Vec2::new(1.0, 2.0));
        assert_eq!(p.translation(), Vec2::new(1.0, 2.0));
        assert!((p.rotation() - 1.0).abs() < f32::EPSILON);
        assert_eq!(p.scale(), Vec2::new(1.0, 2.0));
    }

    #[test]
    fn test_local_matrix() {
        let n = Node::with_transform(Transform2::from_translation(Vec2::new(20.0, 0.0)));
        assert_eq!(
            n.local_matrix(),
            Mat4::from_translation(glam::Vec3::new(20.0, 0.0, 0.0))
        );

        n.set_transform(Transform2::from_scale(Vec2::new(1.0, 2.0)));
        assert_eq!(
            n.local_matrix(),
            Mat4::from_scale(glam::Vec3::new(1.0, 2.0, 1.0))
        );
    }

    #[test]
    fn test_world_matrix_composition() {
        let p = Node::new();
        p.set_translation(Vec2::new(10.0, 0.0));
        let n = Node::with_parent(&p);
        n.set_translation(Vec2::new(20.0, 0.0));

        let v = Vec4::new(5.0, 0.0, 0.0, 1.0);
        assert_eq!(n.world_matrix() * v, Vec4::new(35.0, 0.0, 0.0, 1.0));

        n.set_transform(Transform2::from_scale(Vec2::new(1.0, 2.0)));
        assert_eq!(
            n.world_matrix(),
            Mat4::from_translation(glam::Vec3::new(10.0, 0.0, 0.0))
                * Mat4::from_scale(glam::Vec3::new(1.0, 2.0, 1.0))
        );
    }

    #[test]
    fn test_world_matrix_after_adoption() {
        let n = Node::new();
        n.set_translation(Vec2::new(20.0, 0.0));
        assert_eq!(n.local_to_world(Vec4::W), Vec4::new(20.0, 0.0, 0.0, 1.0));

        let p = Node::with_transform(Transform2::from_translation(Vec2::new(10.0, 0.0)));
        p.add_child(&n);
        assert_eq!(n.local_to_world(Vec4::W), Vec4::new(30.0, 0.0, 0.0, 1.0));

        // Back to a root: only its own transform applies
        n.remove_from_parent();
        assert_eq!(n.local_to_world(Vec4::W), Vec4::new(20.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn test_world_matrix_after_grandparent_adoption() {
        let p1 = Node::new();
        p1.set_translation(Vec2::new(10.0, 0.0));
        let p2 = Node::with_transform(Transform2::from_translation(Vec2::new(20.0, 0.0)));
        let n = Node::with_parent_transform(
            &p2,
            Transform2::from_translation(Vec2::new(30.0, 0.0)),
        );

        assert_eq!(n.local_to_world(Vec4::W), Vec4::new(50.0, 0.0, 0.0, 1.0));
        p1.add_child(&p2);
        assert_eq!(n.local_to_world(Vec4::W), Vec4::new(60.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn test_dirty_propagation_reaches_all_descendants() {
        let root = Node::new();
        let a = Node::with_parent(&root);
        let b = Node::with_parent(&a);
        let c = Node::with_parent(&b);
        let d = Node::with_parent(&root);

        // Resolve everything once so the caches are clean
        for n in [&root, &a, &b, &c, &d] {
            let _ = n.world_matrix();
        }

        root.set_translation(Vec2::new(7.0, -3.0));
        let expected = Vec4::new(7.0, -3.0, 0.0, 1.0);
        for n in [&a, &b, &c, &d] {
            assert_eq!(n.local_to_world(Vec4::W), expected);
        }

        // Reading a deep node first must still see later ancestor updates
        let _ = c.world_matrix();
        a.set_rotation(FRAC_PI_2);
        let p = c.local_to_world(Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert!(p.abs_diff_eq(Vec4::new(7.0, -2.0, 0.0, 1.0), 1e-5));
    }

    #[test]
    fn test_dirty_flags_cleared_per_matrix() {
        let parent = Node::new();
        let child = Node::with_parent(&parent);
        let _ = child.world_matrix();
        assert_eq!(parent.0.flags.get(), DirtyFlags::empty());
        assert_eq!(child.0.flags.get(), DirtyFlags::empty());

        child.set_translation(Vec2::new(1.0, 0.0));
        assert_eq!(
            child.0.flags.get(),
            DirtyFlags::LOCAL_MATRIX | DirtyFlags::WORLD_MATRIX
        );
        assert_eq!(parent.0.flags.get(), DirtyFlags::empty());

        let _ = child.local_matrix();
        assert_eq!(child.0.flags.get(), DirtyFlags::WORLD_MATRIX);

        let _ = child.world_matrix();
        assert_eq!(child.0.flags.get(), DirtyFlags::empty());
    }

    #[test]
    fn test_dirty_propagation_stops_at_dirty_node() {
        let root = Node::new();
        let child = Node::with_parent(&root);
        let grandchild = Node::with_parent(&child);
        let _ = grandchild.world_matrix();

        // Ancestor update over an already dirty child leaves its flags alone
        child.set_rotation(FRAC_PI_2);
        root.set_translation(Vec2::new(3.0, 0.0));
        assert_eq!(
            root.0.flags.get(),
            DirtyFlags::LOCAL_MATRIX | DirtyFlags::WORLD_MATRIX
        );
        assert_eq!(
            child.0.flags.get(),
            DirtyFlags::LOCAL_MATRIX | DirtyFlags::WORLD_MATRIX
        );
        assert_eq!(grandchild.0.flags.get(), DirtyFlags::WORLD_MATRIX);

        let _ = grandchild.world_matrix();
        for n in [&root, &child, &grandchild] {
            assert_eq!(n.0.flags.get(), DirtyFlags::empty());
        }

        // A dirty world flag means the walk does not descend further
        child.0.flags.set(DirtyFlags::WORLD_MATRIX);
        root.set_scale(Vec2::splat(2.0));
        assert_eq!(child.0.flags.get(), DirtyFlags::WORLD_MATRIX);
        assert_eq!(grandchild.0.flags.get(), DirtyFlags::empty());
    }

    #[test]
    fn test_world_to_local_round_trip() {
        let p = Node::with_transform(Transform2::new(Vec2::new(3.0, 4.0), 0.7, Vec2::new(2.0, 0.5)));
        let n = Node::with_parent_transform(
            &p,
            Transform2::new(Vec2::new(-1.0, 8.0), -1.3, Vec2::new(1.5, 3.0)),
        );

        let point = Vec4::new(12.5, -4.0, 0.0, 1.0);
        let back = n.local_to_world(n.world_to_local(point));
        assert!(back.abs_diff_eq(point, 1e-3));
    }

    #[test]
    fn test_world_to_local_singular_fallback() {
        let n = Node::with_transform(Transform2::from_scale(Vec2::ZERO));
        let point = Vec4::new(1.0, 2.0, 0.0, 1.0);
        assert!(n.try_world_to_local(point).is_none());
        assert_eq!(n.world_to_local(point), point);
    }

    #[test]
    fn test_child_lifetime_tied_to_parent() {
        let p = Node::new();
        let n = Node::new();
        let weak = n.downgrade();
        p.add_child(&n);

        drop(n);
        assert!(weak.is_alive());
        assert_eq!(p.child_count(), 1);

        drop(p);
        assert!(!weak.is_alive());
    }

    #[test]
    fn test_remove_all_children_releases_orphans() {
        let p = Node::new();
        let w1 = Node::with_parent(&p).downgrade();
        let w2 = Node::with_parent(&p).downgrade();

        assert!(w1.is_alive());
        assert!(w2.is_alive());

        p.remove_all_children();
        assert!(!w1.is_alive());
        assert!(!w2.is_alive());
    }

    #[test]
    fn test_dropping_parent_orphans_held_children() {
        let p1 = Node::new();
        let p2 = Node::with_parent(&p1);
        p2.set_translation(Vec2::new(5.0, 0.0));
        let n1 = Node::with_parent(&p2);
        let n2 = Node::with_parent(&p2);
        assert_eq!(n1.local_to_world(Vec4::W), Vec4::new(5.0, 0.0, 0.0, 1.0));

        p2.remove_from_parent();
        drop(p2);

        assert_eq!(p1.child_count_recursive(), 0);
        assert_eq!(n1.root(), n1);
        assert!(n1.parent().is_none());
        assert!(n1.next_sibling().is_none());
        assert_eq!(n2.root(), n2);
        assert_eq!(n1.local_to_world(Vec4::W), Vec4::W);
    }
}

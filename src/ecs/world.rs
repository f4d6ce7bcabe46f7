//! World wrapper around hecs
//!
//! Every instance is an entity plus a scene node owned by the world. The
//! node table is the owning container: it keeps nodes alive independent of
//! their position in the tree and detaches them before they are released.

use hecs::Entity;
use rustc_hash::FxHashMap;

use crate::math::Transform2;
use crate::scene::Node;

/// Game world containing all entities, components and their nodes
pub struct World {
    /// The underlying hecs world
    pub inner: hecs::World,
    nodes: FxHashMap<Entity, Node>,
}

impl World {
    /// Create a new empty world
    pub fn new() -> Self {
        log::info!("World created");
        Self {
            inner: hecs::World::new(),
            nodes: FxHashMap::default(),
        }
    }

    /// Spawn a root instance with an identity transform
    pub fn instantiate(&mut self) -> Entity {
        self.instantiate_with((), None, Transform2::IDENTITY)
    }

    /// Spawn an instance with components, optionally attached to `parent`
    pub fn instantiate_with(
        &mut self,
        components: impl hecs::DynamicBundle,
        parent: Option<&Node>,
        transform: Transform2,
    ) -> Entity {
        let entity = self.inner.spawn(components);
        let node = Node::with_owner_transform(entity, transform);
        if let Some(parent) = parent {
            parent.add_child(&node);
        }
        self.nodes.insert(entity, node);
        log::debug!("Instantiated {entity:?}");
        entity
    }

    /// Destroy an instance.
    ///
    /// The node is detached from its parent first. With `recursive` every
    /// descendant instance is destroyed too; otherwise the children are
    /// detached and survive as roots. Returns false for unknown entities.
    pub fn destroy_instance(&mut self, entity: Entity, recursive: bool) -> bool {
        let Some(node) = self.nodes.remove(&entity) else {
            return false;
        };

        if recursive {
            for child in node.children() {
                match child.owner() {
                    Some(owner) if self.nodes.contains_key(&owner) => {
                        self.destroy_instance(owner, true);
                    }
                    _ => {
                        child.remove_from_parent();
                    }
                }
            }
        } else {
            node.remove_all_children();
        }

        node.remove_from_parent();
        node.set_owner(None);
        if self.inner.despawn(entity).is_err() {
            log::warn!("Destroyed node of {entity:?} had no live entity");
        }
        log::debug!("Destroyed {entity:?} (recursive: {recursive})");
        true
    }

    /// Get the node of an instance
    pub fn node(&self, entity: Entity) -> Option<&Node> {
        self.nodes.get(&entity)
    }

    /// Iterate every instance and its node
    pub fn nodes(&self) -> impl Iterator<Item = (Entity, &Node)> {
        self.nodes.iter().map(|(entity, node)| (*entity, node))
    }

    /// Nodes without a parent
    pub fn roots(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(|node| !node.has_parent())
    }

    /// Get a reference to a component
    pub fn get<T: hecs::Component>(
        &self,
        entity: Entity,
    ) -> Result<hecs::Ref<'_, T>, hecs::ComponentError> {
        self.inner.get::<&T>(entity)
    }

    /// Get a mutable reference to a component
    pub fn get_mut<T: hecs::Component>(
        &mut self,
        entity: Entity,
    ) -> Result<hecs::RefMut<'_, T>, hecs::ComponentError> {
        self.inner.get::<&mut T>(entity)
    }

    /// Attach components to an existing entity
    pub fn insert(
        &mut self,
        entity: Entity,
        components: impl hecs::DynamicBundle,
    ) -> Result<(), hecs::NoSuchEntity> {
        self.inner.insert(entity, components)
    }

    /// Attach a single component to an existing entity
    pub fn insert_one(
        &mut self,
        entity: Entity,
        component: impl hecs::Component,
    ) -> Result<(), hecs::NoSuchEntity> {
        self.inner.insert_one(entity, component)
    }

    /// Detach a bundle of components
    pub fn remove<T: hecs::Bundle + 'static>(
        &mut self,
        entity: Entity,
    ) -> Result<T, hecs::ComponentError> {
        self.inner.remove::<T>(entity)
    }

    /// Detach a single component
    pub fn remove_one<T: hecs::Component>(
        &mut self,
        entity: Entity,
    ) -> Result<T, hecs::ComponentError> {
        self.inner.remove_one::<T>(entity)
    }

    /// Check if an entity exists
    pub fn contains(&self, entity: Entity) -> bool {
        self.inner.contains(entity)
    }

    /// Get the number of entities
    pub fn len(&self) -> u32 {
        self.inner.len()
    }

    /// Check if the world is empty
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Destroy every instance
    pub fn clear(&mut self) {
        for node in self.nodes.values() {
            node.remove_all_children();
            node.remove_from_parent();
            node.set_owner(None);
        }
        self.nodes.clear();
        self.inner.clear();
    }

    /// Query for entities with specific components
    pub fn query<Q: hecs::Query>(&self) -> hecs::QueryBorrow<'_, Q> {
        self.inner.query::<Q>()
    }

    /// Query for entities with specific components (mutable)
    pub fn query_mut<Q: hecs::Query>(&mut self) -> hecs::QueryMut<'_, Q> {
        self.inner.query_mut::<Q>()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for World {
    fn drop(&mut self) {
        self.clear();
        log::info!("World destroyed");
    }
}

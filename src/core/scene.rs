//! Scene snapshots
//!
//! Captures a node tree as a flat, parent-indexed list and saves it in RON
//! (Rusty Object Notation) or JSON format.

use std::fs;
use std::path::Path;

use hecs::Entity;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::ecs::{Name, World};
use crate::math::Transform2;
use crate::scene::{Node, TraverseOptions, nodes};

/// A serializable node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedNode {
    /// Name of the owning entity, if it has one
    #[serde(default)]
    pub name: Option<String>,
    /// Local transform
    pub transform: Transform2,
    /// Index of the parent entry; always precedes this entry
    #[serde(default)]
    pub parent_index: Option<usize>,
}

impl SerializedNode {
    #[must_use]
    pub fn new(transform: Transform2) -> Self {
        Self {
            name: None,
            transform,
            parent_index: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_parent(mut self, parent_index: usize) -> Self {
        self.parent_index = Some(parent_index);
        self
    }
}

/// A serializable node tree in depth-first order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    /// Scene name
    pub name: String,
    /// Scene version for compatibility
    pub version: u32,
    /// All nodes in the scene, parents before children
    pub nodes: Vec<SerializedNode>,
}

impl SceneSnapshot {
    /// Create a new empty snapshot
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: 1,
            nodes: Vec::new(),
        }
    }

    /// Capture `root` and its subtree.
    ///
    /// Names are read from the [`Name`] component of each node's owner when
    /// a world is given.
    #[must_use]
    pub fn capture(name: impl Into<String>, root: &Node, world: Option<&World>) -> Self {
        let mut snapshot = Self::new(name);

        let mut order = Vec::new();
        nodes::extract_children(
            root,
            &mut order,
            TraverseOptions::new().recursive(true).include_root(true),
        );

        let mut indices: FxHashMap<Node, usize> = FxHashMap::default();
        for node in order {
            let parent_index = node
                .parent()
                .and_then(|parent| indices.get(&parent).copied());
            let name = world.zip(node.owner()).and_then(|(world, owner)| {
                world.get::<Name>(owner).ok().map(|name| name.0.clone())
            });

            let index = snapshot.add_node(SerializedNode {
                name,
                transform: node.transform(),
                parent_index,
            });
            indices.insert(node, index);
        }

        log::debug!(
            "Captured scene '{}' with {} nodes",
            snapshot.name,
            snapshot.nodes.len()
        );
        snapshot
    }

    /// Add a node to the snapshot
    pub fn add_node(&mut self, node: SerializedNode) -> usize {
        let index = self.nodes.len();
        self.nodes.push(node);
        index
    }

    /// Rebuild the node tree and return its roots
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::InvalidParent`] if a parent index does not
    /// precede its child
    pub fn build(&self) -> Result<Vec<Node>, SceneError> {
        self.validate()?;

        let mut built: Vec<Node> = Vec::with_capacity(self.nodes.len());
        for entry in &self.nodes {
            let node = match entry.parent_index {
                Some(parent) => Node::with_parent_transform(&built[parent], entry.transform),
                None => Node::with_transform(entry.transform),
            };
            built.push(node);
        }

        Ok(self
            .nodes
            .iter()
            .zip(built)
            .filter(|(entry, _)| entry.parent_index.is_none())
            .map(|(_, node)| node)
            .collect())
    }

    /// Spawn one instance per entry into `world`.
    ///
    /// Named entries get a [`Name`] component. Returns the entities in
    /// snapshot order.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::InvalidParent`] if a parent index does not
    /// precede its child
    pub fn instantiate_into(&self, world: &mut World) -> Result<Vec<Entity>, SceneError> {
        self.validate()?;

        let mut entities: Vec<Entity> = Vec::with_capacity(self.nodes.len());
        for entry in &self.nodes {
            let parent = entry
                .parent_index
                .and_then(|index| world.node(entities[index]).cloned());
            let entity = match &entry.name {
                Some(name) => world.instantiate_with(
                    (Name::new(name.as_str()),),
                    parent.as_ref(),
                    entry.transform,
                ),
                None => world.instantiate_with((), parent.as_ref(), entry.transform),
            };
            entities.push(entity);
        }
        Ok(entities)
    }

    fn validate(&self) -> Result<(), SceneError> {
        for (index, entry) in self.nodes.iter().enumerate() {
            if let Some(parent) = entry.parent_index {
                if parent >= index {
                    return Err(SceneError::InvalidParent { index, parent });
                }
            }
        }
        Ok(())
    }

    /// Serialize to a pretty RON string
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn to_ron_string(&self) -> Result<String, SceneError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| SceneError::Serialize(e.to_string()))
    }

    /// Parse from a RON string
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails
    pub fn from_ron_str(text: &str) -> Result<Self, SceneError> {
        ron::from_str(text).map_err(|e| SceneError::Deserialize(e.to_string()))
    }

    /// Save the snapshot to a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails
    pub fn save_ron(&self, path: impl AsRef<Path>) -> Result<(), SceneError> {
        let ron_string = self.to_ron_string()?;
        fs::write(path, ron_string).map_err(|e| SceneError::Io(e.to_string()))?;
        Ok(())
    }

    /// Load a snapshot from a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let content = fs::read_to_string(path).map_err(|e| SceneError::Io(e.to_string()))?;
        Self::from_ron_str(&content)
    }

    /// Save the snapshot to a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), SceneError> {
        let json_string =
            serde_json::to_string_pretty(self).map_err(|e| SceneError::Serialize(e.to_string()))?;
        fs::write(path, json_string).map_err(|e| SceneError::Io(e.to_string()))?;
        Ok(())
    }

    /// Load a snapshot from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let content = fs::read_to_string(path).map_err(|e| SceneError::Io(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| SceneError::Deserialize(e.to_string()))
    }

    /// Get the number of nodes
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the snapshot is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Default for SceneSnapshot {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

/// Errors that can occur during scene operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// IO error
    Io(String),
    /// Serialization error
    Serialize(String),
    /// Deserialization error
    Deserialize(String),
    /// A parent index that does not precede its child
    InvalidParent { index: usize, parent: usize },
}

impl std::fmt::Display for SceneError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {e}"),
            Self::Serialize(e) => write!(f, "Serialization error: {e}"),
            Self::Deserialize(e) => write!(f, "Deserialization error: {e}"),
            Self::InvalidParent { index, parent } => {
                write!(f, "Node {index} has invalid parent index {parent}")
            }
        }
    }
}

impl std::error::Error for SceneError {}

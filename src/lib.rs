//! A 2D scene graph and render device facade built in Rust
//!
//! This crate provides:
//! - A reference-counted scene graph with lazily cached transform matrices
//! - Render state value objects (depth, stencil, culling, blending, samplers)
//! - Materials, property blocks and a state-diffing render device
//! - Entity Component System integration with hecs
//! - Scene snapshots in RON and JSON

pub mod core;
pub mod ecs;
pub mod math;
pub mod renderer;
pub mod scene;

// Re-exports for convenience
pub use glam;
pub use hecs;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::core::{RenderConfig, SceneError, SceneSnapshot};
    pub use crate::ecs::{Name, World};
    pub use crate::math::{StrHash, Transform2};
    pub use crate::renderer::{
        Backend, BufferUsage, Geometry, Material, PassState, PixelDeclaration, PixelType,
        PropertyBlock, RecordingBackend, Render, RenderError, SamplerState, StateBlock, Topology,
        VertexDeclaration,
    };
    pub use crate::scene::{Node, TraverseOptions, WeakNode};
    pub use glam::{Mat4, UVec2, Vec2, Vec4};
}

//! Materials and geometry consumed by draw calls

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::property_block::PropertyBlock;
use super::resources::{IndexBufferPtr, ShaderPtr, VertexBufferPtr};
use super::state::StateBlock;

const MAX_PASS_COUNT: usize = 8;
const MAX_VERTEX_STREAMS: usize = 8;

// ============================================================================
// Passes
// ============================================================================

/// One shader invocation: program, fixed-function state and parameters
#[derive(Debug, Clone, Default)]
pub struct PassState {
    pub shader: Option<ShaderPtr>,
    pub states: StateBlock,
    pub properties: PropertyBlock,
}

impl PassState {
    #[must_use]
    pub fn new(shader: ShaderPtr) -> Self {
        Self {
            shader: Some(shader),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_shader(mut self, shader: ShaderPtr) -> Self {
        self.shader = Some(shader);
        self
    }

    #[must_use]
    pub fn with_states(mut self, states: StateBlock) -> Self {
        self.states = states;
        self
    }

    #[must_use]
    pub fn with_properties(mut self, properties: PropertyBlock) -> Self {
        self.properties = properties;
        self
    }
}

/// Ordered passes plus material-wide parameters.
///
/// Passes render in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Material {
    passes: SmallVec<[PassState; MAX_PASS_COUNT]>,
    pub properties: PropertyBlock,
}

impl Material {
    pub const MAX_PASSES: usize = MAX_PASS_COUNT;

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pass.
    ///
    /// # Panics
    ///
    /// Panics when the material already holds [`Self::MAX_PASSES`].
    pub fn add_pass(&mut self, pass: PassState) -> &mut Self {
        assert!(
            self.passes.len() < Self::MAX_PASSES,
            "material is limited to {} passes",
            Self::MAX_PASSES
        );
        self.passes.push(pass);
        self
    }

    #[must_use]
    pub fn with_pass(mut self, pass: PassState) -> Self {
        self.add_pass(pass);
        self
    }

    #[must_use]
    pub fn with_properties(mut self, properties: PropertyBlock) -> Self {
        self.properties = properties;
        self
    }

    #[must_use]
    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    #[must_use]
    pub fn pass(&self, index: usize) -> Option<&PassState> {
        self.passes.get(index)
    }

    pub fn pass_mut(&mut self, index: usize) -> Option<&mut PassState> {
        self.passes.get_mut(index)
    }

    pub fn passes(&self) -> impl Iterator<Item = &PassState> {
        self.passes.iter()
    }
}

// ============================================================================
// Geometry
// ============================================================================

/// How vertices are assembled into triangles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Topology {
    #[default]
    Triangles,
    TrianglesFan,
    TrianglesStrip,
}

/// Index buffer, positional vertex streams and topology
#[derive(Debug, Clone, Default)]
pub struct Geometry {
    indices: Option<IndexBufferPtr>,
    vertices: SmallVec<[VertexBufferPtr; MAX_VERTEX_STREAMS]>,
    topology: Topology,
}

impl Geometry {
    pub const MAX_VERTEX_STREAMS: usize = MAX_VERTEX_STREAMS;

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a vertex stream in the next free slot.
    ///
    /// # Panics
    ///
    /// Panics when all [`Self::MAX_VERTEX_STREAMS`] slots are used.
    pub fn add_vertices(&mut self, buffer: VertexBufferPtr) -> &mut Self {
        assert!(
            self.vertices.len() < Self::MAX_VERTEX_STREAMS,
            "geometry is limited to {} vertex streams",
            Self::MAX_VERTEX_STREAMS
        );
        self.vertices.push(buffer);
        self
    }

    /// Replace the stream in `slot`. Returns false if the slot is unused.
    pub fn set_vertices(&mut self, slot: usize, buffer: VertexBufferPtr) -> bool {
        match self.vertices.get_mut(slot) {
            Some(current) => {
                *current = buffer;
                true
            }
            None => false,
        }
    }

    pub fn set_indices(&mut self, buffer: Option<IndexBufferPtr>) -> &mut Self {
        self.indices = buffer;
        self
    }

    pub fn set_topology(&mut self, topology: Topology) -> &mut Self {
        self.topology = topology;
        self
    }

    #[must_use]
    pub fn with_vertices(mut self, buffer: VertexBufferPtr) -> Self {
        self.add_vertices(buffer);
        self
    }

    #[must_use]
    pub fn with_indices(mut self, buffer: IndexBufferPtr) -> Self {
        self.indices = Some(buffer);
        self
    }

    #[must_use]
    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    #[must_use]
    pub fn indices(&self) -> Option<&IndexBufferPtr> {
        self.indices.as_ref()
    }

    #[must_use]
    pub fn vertices(&self, slot: usize) -> Option<&VertexBufferPtr> {
        self.vertices.get(slot)
    }

    pub fn vertex_streams(&self) -> impl Iterator<Item = &VertexBufferPtr> {
        self.vertices.iter()
    }

    #[must_use]
    pub fn vertices_count(&self) -> usize {
        self.vertices.len()
    }

    #[must_use]
    pub const fn topology(&self) -> Topology {
        self.topology
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::{BufferUsage, Shader, VertexBuffer, VertexDeclaration};
    use glam::Vec2;
    use std::sync::Arc;

    fn shader() -> ShaderPtr {
        Arc::new(Shader::new("void main() {}".into(), "void main() {}".into()))
    }

    fn vertices() -> VertexBufferPtr {
        let decl = VertexDeclaration::new().add_attribute_of::<Vec2>("a_position");
        Arc::new(VertexBuffer::new(24, decl, BufferUsage::StaticDraw))
    }

    #[test]
    fn test_passes_keep_order() {
        let first = shader();
        let second = shader();
        let material = Material::new()
            .with_pass(PassState::new(first.clone()))
            .with_pass(PassState::new(second.clone()));

        assert_eq!(material.pass_count(), 2);
        assert!(Arc::ptr_eq(material.pass(0).unwrap().shader.as_ref().unwrap(), &first));
        assert!(Arc::ptr_eq(material.pass(1).unwrap().shader.as_ref().unwrap(), &second));
        assert!(material.pass(2).is_none());
    }

    #[test]
    #[should_panic(expected = "limited to 8 passes")]
    fn test_pass_cap() {
        let mut material = Material::new();
        for _ in 0..=Material::MAX_PASSES {
            material.add_pass(PassState::default());
        }
    }

    #[test]
    fn test_geometry_streams() {
        let a = vertices();
        let b = vertices();
        let mut geometry = Geometry::new().with_vertices(a.clone());

        assert!(!geometry.set_vertices(1, b.clone()));
        geometry.add_vertices(b.clone());
        assert!(geometry.set_vertices(0, b.clone()));

        assert_eq!(geometry.vertices_count(), 2);
        assert!(Arc::ptr_eq(geometry.vertices(0).unwrap(), &b));
        assert!(geometry.indices().is_none());
        assert_eq!(geometry.topology(), Topology::Triangles);

        geometry.set_topology(Topology::TrianglesStrip);
        assert_eq!(geometry.topology(), Topology::TrianglesStrip);
    }
}

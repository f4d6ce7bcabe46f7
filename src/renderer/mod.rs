//! Rendering module
//!
//! Device-agnostic render facade: immutable resources, render state value
//! objects, materials and a [`Render`] device that validates draws and
//! emits minimal state changes to a [`Backend`].

mod command;
mod declaration;
mod device;
mod error;
mod material;
mod property_block;
mod resources;
mod state;

pub use command::{Backend, Command, RecordingBackend, Viewport};
pub use declaration::{
    AttributeInfo, AttributeType, IndexDeclaration, IndexType, PixelDeclaration, PixelType,
    VertexAttribute, VertexDeclaration,
};
pub use device::{Render, RenderStats};
pub use error::{RenderError, ShaderStage};
pub use material::{Geometry, Material, PassState, Topology};
pub use property_block::{Property, PropertyBlock, PropertyValue};
pub use resources::{
    BufferUsage, IndexBuffer, IndexBufferPtr, RenderTarget, RenderTargetKind, RenderTargetPtr,
    ResourceId, Shader, ShaderPtr, Texture, TexturePtr, VertexBuffer, VertexBufferPtr,
};
pub use state::{
    BlendingColorMask, BlendingEquation, BlendingFactor, BlendingState, CapabilitiesState,
    CompareFunc, CullingFace, CullingMode, CullingState, DepthState, SamplerMagFilter,
    SamplerMinFilter, SamplerState, SamplerWrap, StateBlock, StencilOp, StencilState,
};

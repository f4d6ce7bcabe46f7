//! Device resource handles
//!
//! Resources are immutable descriptions of device-side objects, shared as
//! `Arc` handles so materials and geometry on any thread can reference the
//! same shader or texture. The data itself lives in the backend.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bitflags::bitflags;
use glam::UVec2;
use serde::{Deserialize, Serialize};

use super::declaration::{IndexDeclaration, PixelDeclaration, PixelType, VertexDeclaration};

/// Global counter for generating unique resource IDs
static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one device resource for the lifetime of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

impl ResourceId {
    fn next() -> Self {
        Self(NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

macro_rules! impl_resource_identity {
    ($($ty:ty),*) => {
        $(
            impl PartialEq for $ty {
                fn eq(&self, other: &Self) -> bool {
                    self.id == other.id
                }
            }

            impl Eq for $ty {}
        )*
    };
}

impl_resource_identity!(Shader, Texture, IndexBuffer, VertexBuffer, RenderTarget);

pub type ShaderPtr = Arc<Shader>;
pub type TexturePtr = Arc<Texture>;
pub type IndexBufferPtr = Arc<IndexBuffer>;
pub type VertexBufferPtr = Arc<VertexBuffer>;
pub type RenderTargetPtr = Arc<RenderTarget>;

// ============================================================================
// Shader
// ============================================================================

/// Linked vertex + fragment program
#[derive(Debug)]
pub struct Shader {
    id: ResourceId,
    vertex_source: String,
    fragment_source: String,
}

impl Shader {
    #[must_use]
    pub fn new(vertex_source: String, fragment_source: String) -> Self {
        Self {
            id: ResourceId::next(),
            vertex_source,
            fragment_source,
        }
    }

    #[must_use]
    pub const fn id(&self) -> ResourceId {
        self.id
    }

    #[must_use]
    pub fn vertex_source(&self) -> &str {
        &self.vertex_source
    }

    #[must_use]
    pub fn fragment_source(&self) -> &str {
        &self.fragment_source
    }
}

// ============================================================================
// Texture
// ============================================================================

#[derive(Debug)]
pub struct Texture {
    id: ResourceId,
    size: UVec2,
    decl: PixelDeclaration,
}

impl Texture {
    #[must_use]
    pub fn new(size: UVec2, decl: PixelDeclaration) -> Self {
        Self {
            id: ResourceId::next(),
            size,
            decl,
        }
    }

    #[must_use]
    pub const fn id(&self) -> ResourceId {
        self.id
    }

    #[must_use]
    pub const fn size(&self) -> UVec2 {
        self.size
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.size.x
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.size.y
    }

    #[must_use]
    pub const fn decl(&self) -> PixelDeclaration {
        self.decl
    }

    /// Bytes of pixel data for the full image
    #[must_use]
    pub fn data_size(&self) -> Option<usize> {
        self.decl.data_size(self.size.x, self.size.y)
    }
}

// ============================================================================
// Buffers
// ============================================================================

/// Expected update frequency of a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BufferUsage {
    #[default]
    StaticDraw,
    StreamDraw,
    DynamicDraw,
}

#[derive(Debug)]
pub struct IndexBuffer {
    id: ResourceId,
    size: usize,
    decl: IndexDeclaration,
    usage: BufferUsage,
}

impl IndexBuffer {
    #[must_use]
    pub fn new(size: usize, decl: IndexDeclaration, usage: BufferUsage) -> Self {
        Self {
            id: ResourceId::next(),
            size,
            decl,
            usage,
        }
    }

    #[must_use]
    pub const fn id(&self) -> ResourceId {
        self.id
    }

    /// Size in bytes
    #[must_use]
    pub const fn buffer_size(&self) -> usize {
        self.size
    }

    #[must_use]
    pub const fn index_count(&self) -> usize {
        self.size / self.decl.bytes_per_index()
    }

    #[must_use]
    pub const fn decl(&self) -> IndexDeclaration {
        self.decl
    }

    #[must_use]
    pub const fn usage(&self) -> BufferUsage {
        self.usage
    }
}

#[derive(Debug)]
pub struct VertexBuffer {
    id: ResourceId,
    size: usize,
    decl: VertexDeclaration,
    usage: BufferUsage,
}

impl VertexBuffer {
    #[must_use]
    pub fn new(size: usize, decl: VertexDeclaration, usage: BufferUsage) -> Self {
        Self {
            id: ResourceId::next(),
            size,
            decl,
            usage,
        }
    }

    #[must_use]
    pub const fn id(&self) -> ResourceId {
        self.id
    }

    /// Size in bytes
    #[must_use]
    pub const fn buffer_size(&self) -> usize {
        self.size
    }

    /// Number of whole vertices stored
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        match self.decl.bytes_per_vertex() {
            0 => 0,
            stride => self.size / stride,
        }
    }

    #[must_use]
    pub fn decl(&self) -> &VertexDeclaration {
        &self.decl
    }

    #[must_use]
    pub const fn usage(&self) -> BufferUsage {
        self.usage
    }
}

// ============================================================================
// Render target
// ============================================================================

bitflags! {
    /// Attachments of a render target
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct RenderTargetKind: u8 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const COLOR_AND_DEPTH = Self::COLOR.bits() | Self::DEPTH.bits();
    }
}

/// Offscreen framebuffer with optional color and depth textures
#[derive(Debug)]
pub struct RenderTarget {
    id: ResourceId,
    size: UVec2,
    color: Option<TexturePtr>,
    depth: Option<TexturePtr>,
}

impl RenderTarget {
    /// Create a target with the attachments `kind` asks for
    #[must_use]
    pub fn new(size: UVec2, kind: RenderTargetKind) -> Self {
        let attachment = |flag: RenderTargetKind, ty: PixelType| {
            kind.contains(flag)
                .then(|| Arc::new(Texture::new(size, PixelDeclaration::new(ty))))
        };
        Self {
            id: ResourceId::next(),
            size,
            color: attachment(RenderTargetKind::COLOR, PixelType::Rgba8),
            depth: attachment(RenderTargetKind::DEPTH, PixelType::Depth24Stencil8),
        }
    }

    #[must_use]
    pub const fn id(&self) -> ResourceId {
        self.id
    }

    #[must_use]
    pub const fn size(&self) -> UVec2 {
        self.size
    }

    #[must_use]
    pub fn color(&self) -> Option<&TexturePtr> {
        self.color.as_ref()
    }

    #[must_use]
    pub fn depth(&self) -> Option<&TexturePtr> {
        self.depth.as_ref()
    }
}

//! Device command stream
//!
//! [`Render`](super::Render) validates and diffs state, then hands the result
//! to a [`Backend`] as a sequence of [`Command`]s. A GPU driver implements
//! `Backend`; [`RecordingBackend`] keeps the commands in memory instead.

use glam::{UVec2, Vec4};

use super::declaration::{PixelDeclaration, PixelType};
use super::error::RenderError;
use super::material::Topology;
use super::property_block::PropertyValue;
use super::resources::{
    IndexBufferPtr, RenderTargetPtr, ShaderPtr, TexturePtr, VertexBufferPtr,
};
use super::state::{
    BlendingState, CapabilitiesState, CullingState, DepthState, SamplerState, StencilState,
};
use crate::math::StrHash;

/// Rectangle in framebuffer pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub origin: UVec2,
    pub size: UVec2,
}

impl Viewport {
    #[must_use]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            origin: UVec2::new(x, y),
            size: UVec2::new(width, height),
        }
    }
}

/// A single instruction for the backend
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // Resources
    CreateShader(ShaderPtr),
    CreateTexture {
        texture: TexturePtr,
        data: Option<Vec<u8>>,
    },
    CreateIndexBuffer {
        buffer: IndexBufferPtr,
        data: Vec<u8>,
    },
    CreateVertexBuffer {
        buffer: VertexBufferPtr,
        data: Vec<u8>,
    },
    UpdateIndexBuffer {
        buffer: IndexBufferPtr,
        offset: usize,
        data: Vec<u8>,
    },
    UpdateVertexBuffer {
        buffer: VertexBufferPtr,
        offset: usize,
        data: Vec<u8>,
    },
    CreateRenderTarget(RenderTargetPtr),

    // Framebuffer
    SetRenderTarget(Option<RenderTargetPtr>),
    SetViewport(Viewport),
    ClearColor(Vec4),
    ClearDepth(f32),
    ClearStencil(u8),

    // Pipeline state
    BindShader(ShaderPtr),
    SetDepth(DepthState),
    SetStencil(StencilState),
    SetCulling(CullingState),
    SetBlending(BlendingState),
    SetCapabilities(CapabilitiesState),

    // Draw
    BindSampler {
        name: StrHash,
        unit: u32,
        sampler: SamplerState,
    },
    SetProperty {
        name: StrHash,
        value: PropertyValue,
    },
    BindIndexBuffer(IndexBufferPtr),
    BindVertexBuffer {
        slot: usize,
        buffer: VertexBufferPtr,
    },
    UnbindVertexBuffer {
        slot: usize,
    },
    DrawIndexed {
        topology: Topology,
        index_count: usize,
    },
    Draw {
        topology: Topology,
        vertex_count: usize,
    },
}

impl Command {
    /// True for the commands that rasterize geometry
    #[must_use]
    pub const fn is_draw(&self) -> bool {
        matches!(self, Self::Draw { .. } | Self::DrawIndexed { .. })
    }
}

/// Device-specific executor of commands
pub trait Backend {
    /// Whether textures of this format can be created.
    ///
    /// Compressed formats need explicit driver support.
    fn supports_pixel_type(&self, ty: PixelType) -> bool {
        !PixelDeclaration::new(ty).is_compressed()
    }

    /// Compile and link a program
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::ShaderCompile`] if the driver rejects the sources
    fn compile_shader(&mut self, vertex: &str, fragment: &str) -> Result<(), RenderError> {
        let _ = (vertex, fragment);
        Ok(())
    }

    /// Execute one command
    fn submit(&mut self, command: Command);
}

/// Headless backend that stores every submitted command
#[derive(Debug, Default)]
pub struct RecordingBackend {
    commands: Vec<Command>,
    supported: Option<Vec<PixelType>>,
}

impl RecordingBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict texture creation to exactly these formats
    #[must_use]
    pub fn with_pixel_types(mut self, types: impl IntoIterator<Item = PixelType>) -> Self {
        self.supported = Some(types.into_iter().collect());
        self
    }

    #[must_use]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Take the recorded commands, leaving the log empty
    pub fn drain(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    /// Number of recorded draw commands
    #[must_use]
    pub fn draw_count(&self) -> usize {
        self.commands.iter().filter(|c| c.is_draw()).count()
    }
}

impl Backend for RecordingBackend {
    fn supports_pixel_type(&self, ty: PixelType) -> bool {
        match &self.supported {
            Some(types) => types.contains(&ty),
            None => matches!(ty, PixelType::Rgba8 | PixelType::Depth24Stencil8),
        }
    }

    fn submit(&mut self, command: Command) {
        self.commands.push(command);
    }
}

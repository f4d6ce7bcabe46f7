//! Render device facade
//!
//! `Render` owns a [`Backend`] and is the only way resources are created and
//! geometry is drawn. It validates every request up front, so a failed call
//! never leaves half a draw in the command stream, and it tracks the pipeline
//! state it last submitted so redundant state changes are skipped.
//!
//! # Example
//!
//! ```ignore
//! let mut render = Render::new(RecordingBackend::new(), RenderConfig::default());
//! let shader = render.create_shader(vs.as_bytes(), fs.as_bytes())?;
//! let material = Material::new().with_pass(PassState::new(shader));
//!
//! render
//!     .set_viewport(0, 0, 640, 480)
//!     .clear_color_buffer(Vec4::new(0.1, 0.1, 0.1, 1.0));
//! render.draw(&material, &geometry)?;
//! ```

use std::io::Read;
use std::sync::Arc;

use bytemuck::Pod;
use glam::{UVec2, Vec4};
use image::DynamicImage;

use super::command::{Backend, Command, RecordingBackend, Viewport};
use super::declaration::{IndexDeclaration, IndexType, PixelDeclaration, PixelType, VertexDeclaration};
use super::error::{RenderError, ShaderStage};
use super::material::{Geometry, Material};
use super::property_block::PropertyBlock;
use super::resources::{
    BufferUsage, IndexBuffer, IndexBufferPtr, RenderTarget, RenderTargetKind, RenderTargetPtr,
    Shader, ShaderPtr, Texture, TexturePtr, VertexBuffer, VertexBufferPtr,
};
use super::state::{
    BlendingState, CapabilitiesState, CullingState, DepthState, StateBlock, StencilState,
};
use crate::core::RenderConfig;

/// Counters accumulated since creation or the last [`Render::reset_stats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Draw commands issued
    pub draw_calls: usize,
    /// Material passes executed
    pub passes: usize,
    /// Shader binds and fixed-function state changes
    pub state_changes: usize,
    /// Commands submitted to the backend
    pub commands: usize,
}

/// Last submitted pipeline state. `None` means unknown.
#[derive(Debug, Default)]
struct DeviceState {
    shader: Option<ShaderPtr>,
    depth: Option<DepthState>,
    stencil: Option<StencilState>,
    culling: Option<CullingState>,
    blending: Option<BlendingState>,
    capabilities: Option<CapabilitiesState>,
    index_buffer: Option<IndexBufferPtr>,
    vertex_buffers: [Option<VertexBufferPtr>; Geometry::MAX_VERTEX_STREAMS],
}

/// The render device
pub struct Render<B: Backend = RecordingBackend> {
    backend: B,
    config: RenderConfig,
    state: DeviceState,
    scratch: PropertyBlock,
    stats: RenderStats,
}

impl<B: Backend> Render<B> {
    /// Create a device and set the viewport to the whole framebuffer
    pub fn new(backend: B, config: RenderConfig) -> Self {
        let size = config.framebuffer_size;
        let mut render = Self {
            backend,
            config,
            state: DeviceState::default(),
            scratch: PropertyBlock::new(),
            stats: RenderStats::default(),
        };
        render.set_viewport(0, 0, size.x, size.y);
        log::info!("Render device created ({}x{})", size.x, size.y);
        render
    }

    #[must_use]
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    #[must_use]
    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = RenderStats::default();
    }

    fn submit(&mut self, command: Command) {
        self.stats.commands += 1;
        self.backend.submit(command);
    }

    // ========================================================================
    // Resources
    // ========================================================================

    /// Read, validate and compile a shader program
    ///
    /// # Errors
    ///
    /// Returns an error if either source cannot be read as UTF-8, is empty, or
    /// is rejected by the backend
    pub fn create_shader(
        &mut self,
        vertex: impl Read,
        fragment: impl Read,
    ) -> Result<ShaderPtr, RenderError> {
        let vertex_source = read_shader_source(vertex, ShaderStage::Vertex)?;
        let fragment_source = read_shader_source(fragment, ShaderStage::Fragment)?;

        self.backend.compile_shader(&vertex_source, &fragment_source)?;

        let shader = Arc::new(Shader::new(vertex_source, fragment_source));
        log::debug!("Created shader {}", shader.id());
        self.submit(Command::CreateShader(shader.clone()));
        Ok(shader)
    }

    /// Create an uninitialized texture
    ///
    /// # Errors
    ///
    /// Returns an error if the size is zero or too large, or the backend does
    /// not support the pixel format
    pub fn create_texture(
        &mut self,
        size: UVec2,
        decl: PixelDeclaration,
    ) -> Result<TexturePtr, RenderError> {
        self.check_texture(size, decl)?;
        Ok(self.push_texture(size, decl, None))
    }

    /// Create a texture from raw pixel data in the declared format
    ///
    /// # Errors
    ///
    /// Same as [`Render::create_texture`], plus a size mismatch between
    /// `data` and the texture
    pub fn create_texture_with_data(
        &mut self,
        size: UVec2,
        decl: PixelDeclaration,
        data: &[u8],
    ) -> Result<TexturePtr, RenderError> {
        self.check_texture(size, decl)?;
        let expected = decl
            .data_size(size.x, size.y)
            .ok_or(RenderError::TextureTooLarge {
                size,
                max: self.config.max_texture_size,
            })?;
        if data.len() != expected {
            return Err(RenderError::TextureDataSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(self.push_texture(size, decl, Some(data.to_vec())))
    }

    /// Create an RGBA texture from a decoded image
    ///
    /// # Errors
    ///
    /// Returns an error if the image is empty or too large
    pub fn create_texture_from_image(
        &mut self,
        image: &DynamicImage,
    ) -> Result<TexturePtr, RenderError> {
        let rgba = image.to_rgba8();
        let size = UVec2::new(rgba.width(), rgba.height());
        self.create_texture_with_data(size, PixelType::Rgba8.into(), rgba.as_raw())
    }

    /// Decode an encoded image (PNG, JPEG) and create a texture from it
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::ImageDecode`] if the stream cannot be read or decoded
    pub fn create_texture_from_stream(
        &mut self,
        mut stream: impl Read,
    ) -> Result<TexturePtr, RenderError> {
        let mut bytes = Vec::new();
        stream
            .read_to_end(&mut bytes)
            .map_err(|e| RenderError::ImageDecode(e.to_string()))?;
        let image =
            image::load_from_memory(&bytes).map_err(|e| RenderError::ImageDecode(e.to_string()))?;
        self.create_texture_from_image(&image)
    }

    fn check_texture(&self, size: UVec2, decl: PixelDeclaration) -> Result<(), RenderError> {
        if size.x == 0 || size.y == 0 {
            return Err(RenderError::ZeroSizedTexture);
        }
        self.check_max_size(size)?;
        self.check_pixel_type(decl.pixel_type())
    }

    fn check_max_size(&self, size: UVec2) -> Result<(), RenderError> {
        let max = self.config.max_texture_size;
        if size.max_element() > max {
            return Err(RenderError::TextureTooLarge { size, max });
        }
        Ok(())
    }

    fn check_pixel_type(&self, ty: PixelType) -> Result<(), RenderError> {
        if !self.backend.supports_pixel_type(ty) {
            log::warn!("Pixel format {ty:?} is not supported by the backend");
            return Err(RenderError::UnsupportedPixelFormat(ty));
        }
        Ok(())
    }

    fn push_texture(
        &mut self,
        size: UVec2,
        decl: PixelDeclaration,
        data: Option<Vec<u8>>,
    ) -> TexturePtr {
        let texture = Arc::new(Texture::new(size, decl));
        self.announce_texture(&texture, data);
        texture
    }

    fn announce_texture(&mut self, texture: &TexturePtr, data: Option<Vec<u8>>) {
        log::debug!(
            "Created texture {} ({}x{}, {:?})",
            texture.id(),
            texture.width(),
            texture.height(),
            texture.decl().pixel_type()
        );
        self.submit(Command::CreateTexture {
            texture: texture.clone(),
            data,
        });
    }

    /// Create an index buffer from raw index data
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidBufferSize`] if `indices` is empty or not
    /// a whole number of indices
    pub fn create_index_buffer(
        &mut self,
        indices: &[u8],
        decl: IndexDeclaration,
        usage: BufferUsage,
    ) -> Result<IndexBufferPtr, RenderError> {
        check_buffer_size(indices.len(), decl.bytes_per_index())?;

        let buffer = Arc::new(IndexBuffer::new(indices.len(), decl, usage));
        log::debug!(
            "Created index buffer {} ({} indices, {usage:?})",
            buffer.id(),
            buffer.index_count()
        );
        self.submit(Command::CreateIndexBuffer {
            buffer: buffer.clone(),
            data: indices.to_vec(),
        });
        Ok(buffer)
    }

    /// Create a 16-bit index buffer
    ///
    /// # Errors
    ///
    /// Returns an error if `indices` is empty
    pub fn create_index_buffer_u16(
        &mut self,
        indices: &[u16],
        usage: BufferUsage,
    ) -> Result<IndexBufferPtr, RenderError> {
        self.create_index_buffer(
            bytemuck::cast_slice(indices),
            IndexDeclaration::new(IndexType::UnsignedShort),
            usage,
        )
    }

    /// Create a vertex buffer from raw vertex data
    ///
    /// # Errors
    ///
    /// Returns an error if the declaration is empty or `vertices` is not a
    /// whole, non-zero number of vertices
    pub fn create_vertex_buffer(
        &mut self,
        vertices: &[u8],
        decl: VertexDeclaration,
        usage: BufferUsage,
    ) -> Result<VertexBufferPtr, RenderError> {
        let stride = decl.bytes_per_vertex();
        if stride == 0 {
            return Err(RenderError::EmptyVertexDeclaration);
        }
        check_buffer_size(vertices.len(), stride)?;

        let buffer = Arc::new(VertexBuffer::new(vertices.len(), decl, usage));
        log::debug!(
            "Created vertex buffer {} ({} vertices, {usage:?})",
            buffer.id(),
            buffer.vertex_count()
        );
        self.submit(Command::CreateVertexBuffer {
            buffer: buffer.clone(),
            data: vertices.to_vec(),
        });
        Ok(buffer)
    }

    /// Create a vertex buffer from a slice of plain vertex structs
    ///
    /// # Errors
    ///
    /// Same as [`Render::create_vertex_buffer`]
    pub fn create_vertex_buffer_from<T: Pod>(
        &mut self,
        vertices: &[T],
        decl: VertexDeclaration,
        usage: BufferUsage,
    ) -> Result<VertexBufferPtr, RenderError> {
        self.create_vertex_buffer(bytemuck::cast_slice(vertices), decl, usage)
    }

    /// Overwrite part of an index buffer
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::BufferUpdateOutOfRange`] if the write would pass
    /// the end of the buffer
    pub fn update_index_buffer(
        &mut self,
        buffer: &IndexBufferPtr,
        indices: &[u8],
        offset: usize,
    ) -> Result<(), RenderError> {
        check_update_range(offset, indices.len(), buffer.buffer_size())?;
        self.submit(Command::UpdateIndexBuffer {
            buffer: buffer.clone(),
            offset,
            data: indices.to_vec(),
        });
        Ok(())
    }

    /// Overwrite part of a vertex buffer
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::BufferUpdateOutOfRange`] if the write would pass
    /// the end of the buffer
    pub fn update_vertex_buffer(
        &mut self,
        buffer: &VertexBufferPtr,
        vertices: &[u8],
        offset: usize,
    ) -> Result<(), RenderError> {
        check_update_range(offset, vertices.len(), buffer.buffer_size())?;
        self.submit(Command::UpdateVertexBuffer {
            buffer: buffer.clone(),
            offset,
            data: vertices.to_vec(),
        });
        Ok(())
    }

    /// Create an offscreen target with color and/or depth attachments
    ///
    /// # Errors
    ///
    /// Returns an error if the size is zero or too large, `kind` is empty, or
    /// the backend cannot store an attachment format
    pub fn create_render_target(
        &mut self,
        size: UVec2,
        kind: RenderTargetKind,
    ) -> Result<RenderTargetPtr, RenderError> {
        if size.x == 0 || size.y == 0 || kind.is_empty() {
            return Err(RenderError::ZeroSizedRenderTarget);
        }
        self.check_max_size(size)?;
        if kind.contains(RenderTargetKind::COLOR) {
            self.check_pixel_type(PixelType::Rgba8)?;
        }
        if kind.contains(RenderTargetKind::DEPTH) {
            self.check_pixel_type(PixelType::Depth24Stencil8)?;
        }

        let target = Arc::new(RenderTarget::new(size, kind));
        // Attachments exist before the target that references them
        for attachment in target.color().into_iter().chain(target.depth()) {
            self.announce_texture(attachment, None);
        }
        log::debug!(
            "Created render target {} ({}x{}, {kind:?})",
            target.id(),
            size.x,
            size.y
        );
        self.submit(Command::CreateRenderTarget(target.clone()));
        Ok(target)
    }

    // ========================================================================
    // Framebuffer
    // ========================================================================

    pub fn clear_depth_buffer(&mut self, value: f32) -> &mut Self {
        self.submit(Command::ClearDepth(value));
        self
    }

    pub fn clear_stencil_buffer(&mut self, value: u8) -> &mut Self {
        self.submit(Command::ClearStencil(value));
        self
    }

    pub fn clear_color_buffer(&mut self, color: Vec4) -> &mut Self {
        self.submit(Command::ClearColor(color));
        self
    }

    /// Clear color, depth and stencil with the configured values
    pub fn clear_all(&mut self) -> &mut Self {
        let RenderConfig {
            clear_color,
            clear_depth,
            clear_stencil,
            ..
        } = self.config;
        self.clear_color_buffer(clear_color)
            .clear_depth_buffer(clear_depth)
            .clear_stencil_buffer(clear_stencil)
    }

    pub fn set_viewport(&mut self, x: u32, y: u32, width: u32, height: u32) -> &mut Self {
        self.submit(Command::SetViewport(Viewport::new(x, y, width, height)));
        self
    }

    /// Render into `target`, or the default framebuffer with `None`
    pub fn set_render_target(&mut self, target: Option<RenderTargetPtr>) -> &mut Self {
        self.submit(Command::SetRenderTarget(target));
        self
    }

    // ========================================================================
    // Drawing
    // ========================================================================

    /// Draw `geometry` once per material pass
    ///
    /// # Errors
    ///
    /// See [`Render::draw_with_properties`]
    pub fn draw(&mut self, material: &Material, geometry: &Geometry) -> Result<(), RenderError> {
        self.draw_with_properties(material, geometry, &PropertyBlock::default())
    }

    /// Draw `geometry` once per material pass with call-site overrides.
    ///
    /// Parameters are layered material, then pass, then `properties`, each
    /// later block overriding same-named entries.
    ///
    /// # Errors
    ///
    /// Returns an error, and submits nothing, if the material has no passes,
    /// a pass has no shader, or the geometry has no vertex buffers
    pub fn draw_with_properties(
        &mut self,
        material: &Material,
        geometry: &Geometry,
        properties: &PropertyBlock,
    ) -> Result<(), RenderError> {
        if let Err(err) = validate_draw(material, geometry) {
            log::warn!("Draw rejected: {err}");
            return Err(err);
        }

        for pass in material.passes() {
            let Some(shader) = &pass.shader else {
                continue;
            };
            self.bind_shader(shader);
            self.apply_states(&pass.states);

            let mut merged = std::mem::take(&mut self.scratch);
            merged
                .clear()
                .merge(&material.properties)
                .merge(&pass.properties)
                .merge(properties);
            self.bind_properties(&merged);
            self.scratch = merged;

            self.bind_geometry(geometry);
            self.submit_draw(geometry);
            self.stats.passes += 1;
        }
        Ok(())
    }

    fn bind_shader(&mut self, shader: &ShaderPtr) {
        if self.state.shader.as_ref().is_some_and(|s| Arc::ptr_eq(s, shader)) {
            return;
        }
        self.state.shader = Some(shader.clone());
        self.stats.state_changes += 1;
        self.submit(Command::BindShader(shader.clone()));
    }

    fn apply_states(&mut self, states: &StateBlock) {
        if changed(&mut self.state.depth, states.depth) {
            self.submit_state(Command::SetDepth(states.depth));
        }
        if changed(&mut self.state.stencil, states.stencil) {
            self.submit_state(Command::SetStencil(states.stencil));
        }
        if changed(&mut self.state.culling, states.culling) {
            self.submit_state(Command::SetCulling(states.culling));
        }
        if changed(&mut self.state.blending, states.blending) {
            self.submit_state(Command::SetBlending(states.blending));
        }
        if changed(&mut self.state.capabilities, states.capabilities) {
            self.submit_state(Command::SetCapabilities(states.capabilities));
        }
    }

    fn submit_state(&mut self, command: Command) {
        self.stats.state_changes += 1;
        self.submit(command);
    }

    /// Samplers get texture units in name-hash order
    fn bind_properties(&mut self, block: &PropertyBlock) {
        let mut samplers: Vec<_> = block.samplers().collect();
        samplers.sort_unstable_by_key(|(name, _)| *name);
        for (unit, (name, sampler)) in (0u32..).zip(samplers) {
            self.submit(Command::BindSampler {
                name,
                unit,
                sampler: sampler.clone(),
            });
        }

        let mut values: Vec<_> = block.properties().collect();
        values.sort_unstable_by_key(|(name, _)| *name);
        for (name, value) in values {
            self.submit(Command::SetProperty {
                name,
                value: *value,
            });
        }
    }

    fn bind_geometry(&mut self, geometry: &Geometry) {
        if let Some(indices) = geometry.indices() {
            if !self.state.index_buffer.as_ref().is_some_and(|b| Arc::ptr_eq(b, indices)) {
                self.state.index_buffer = Some(indices.clone());
                self.submit(Command::BindIndexBuffer(indices.clone()));
            }
        }
        for (slot, buffer) in geometry.vertex_streams().enumerate() {
            let bound = &mut self.state.vertex_buffers[slot];
            if bound.as_ref().is_some_and(|b| Arc::ptr_eq(b, buffer)) {
                continue;
            }
            *bound = Some(buffer.clone());
            self.submit(Command::BindVertexBuffer {
                slot,
                buffer: buffer.clone(),
            });
        }

        // Streams past the geometry's last one must not stay attached
        for slot in geometry.vertices_count()..Geometry::MAX_VERTEX_STREAMS {
            if self.state.vertex_buffers[slot].take().is_some() {
                self.submit(Command::UnbindVertexBuffer { slot });
            }
        }
    }

    fn submit_draw(&mut self, geometry: &Geometry) {
        let topology = geometry.topology();
        let command = match geometry.indices() {
            Some(indices) => Command::DrawIndexed {
                topology,
                index_count: indices.index_count(),
            },
            None => Command::Draw {
                topology,
                vertex_count: geometry.vertices(0).map_or(0, |vb| vb.vertex_count()),
            },
        };
        self.stats.draw_calls += 1;
        self.submit(command);
    }
}

impl Render<RecordingBackend> {
    /// Device that records its command stream instead of executing it
    #[must_use]
    pub fn headless(config: RenderConfig) -> Self {
        Self::new(RecordingBackend::new(), config)
    }
}

/// Update the cached value, reporting whether it differed
fn changed<T: PartialEq + Copy>(cached: &mut Option<T>, value: T) -> bool {
    if *cached == Some(value) {
        return false;
    }
    *cached = Some(value);
    true
}

fn read_shader_source(mut source: impl Read, stage: ShaderStage) -> Result<String, RenderError> {
    let mut text = String::new();
    source
        .read_to_string(&mut text)
        .map_err(|e| RenderError::InvalidShaderSource {
            stage,
            reason: e.to_string(),
        })?;
    if text.trim().is_empty() {
        return Err(RenderError::InvalidShaderSource {
            stage,
            reason: "source is empty".into(),
        });
    }
    Ok(text)
}

fn check_buffer_size(len: usize, stride: usize) -> Result<(), RenderError> {
    if len == 0 || len % stride != 0 {
        return Err(RenderError::InvalidBufferSize { len, stride });
    }
    Ok(())
}

fn check_update_range(offset: usize, len: usize, size: usize) -> Result<(), RenderError> {
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(()),
        _ => Err(RenderError::BufferUpdateOutOfRange { offset, len, size }),
    }
}

fn validate_draw(material: &Material, geometry: &Geometry) -> Result<(), RenderError> {
    if material.pass_count() == 0 {
        return Err(RenderError::EmptyMaterial);
    }
    if let Some(pass) = material.passes().position(|p| p.shader.is_none()) {
        return Err(RenderError::MissingShader { pass });
    }
    if geometry.vertices_count() == 0 {
        return Err(RenderError::MissingVertices);
    }
    Ok(())
}

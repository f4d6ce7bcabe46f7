//! Render device configuration

use glam::{UVec2, Vec4};
use serde::{Deserialize, Serialize};

/// Settings for a [`Render`](crate::renderer::Render) device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Size of the default framebuffer; also the initial viewport
    pub framebuffer_size: UVec2,
    /// Largest accepted texture or render target dimension
    pub max_texture_size: u32,
    /// Color written by `clear_all`
    pub clear_color: Vec4,
    /// Depth written by `clear_all`
    pub clear_depth: f32,
    /// Stencil value written by `clear_all`
    pub clear_stencil: u8,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            framebuffer_size: UVec2::new(1280, 720),
            max_texture_size: 4096,
            clear_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            clear_depth: 1.0,
            clear_stencil: 0,
        }
    }
}

impl RenderConfig {
    /// Set framebuffer dimensions
    pub fn with_framebuffer_size(mut self, width: u32, height: u32) -> Self {
        self.framebuffer_size = UVec2::new(width, height);
        self
    }

    /// Set the texture size limit
    pub fn with_max_texture_size(mut self, size: u32) -> Self {
        self.max_texture_size = size;
        self
    }

    /// Set the clear color
    pub fn with_clear_color(mut self, color: Vec4) -> Self {
        self.clear_color = color;
        self
    }

    /// Set the clear depth
    pub fn with_clear_depth(mut self, depth: f32) -> Self {
        self.clear_depth = depth;
        self
    }

    /// Set the clear stencil value
    pub fn with_clear_stencil(mut self, stencil: u8) -> Self {
        self.clear_stencil = stencil;
        self
    }
}

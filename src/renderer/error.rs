//! Render device errors

use std::fmt;

use glam::UVec2;

use super::declaration::PixelType;

/// Shader program stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => f.write_str("vertex"),
            Self::Fragment => f.write_str("fragment"),
        }
    }
}

/// Errors raised while creating resources or validating draws
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum RenderError {
    /// Shader source could not be read or is empty
    InvalidShaderSource { stage: ShaderStage, reason: String },
    /// Backend rejected the shader program
    ShaderCompile(String),
    /// Backend cannot store this pixel format
    UnsupportedPixelFormat(PixelType),
    /// Texture with a zero width or height
    ZeroSizedTexture,
    /// Texture larger than the configured maximum
    TextureTooLarge { size: UVec2, max: u32 },
    /// Encoded image could not be read or decoded
    ImageDecode(String),
    /// Pixel data does not match the texture size and format
    TextureDataSize { expected: usize, actual: usize },
    /// Buffer data is empty or not a whole number of elements
    InvalidBufferSize { len: usize, stride: usize },
    /// Vertex declaration with no bytes per vertex
    EmptyVertexDeclaration,
    /// Update past the end of a buffer
    BufferUpdateOutOfRange { offset: usize, len: usize, size: usize },
    /// Render target with a zero width or height
    ZeroSizedRenderTarget,
    /// Material without passes
    EmptyMaterial,
    /// Pass without a shader
    MissingShader { pass: usize },
    /// Geometry without vertex buffers
    MissingVertices,
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidShaderSource { stage, reason } => {
                write!(f, "Invalid {stage} shader source: {reason}")
            }
            Self::ShaderCompile(e) => write!(f, "Shader compile error: {e}"),
            Self::UnsupportedPixelFormat(ty) => write!(f, "Unsupported pixel format: {ty:?}"),
            Self::ZeroSizedTexture => write!(f, "Texture size must be non-zero"),
            Self::TextureTooLarge { size, max } => {
                write!(f, "Texture size {}x{} exceeds maximum {max}", size.x, size.y)
            }
            Self::ImageDecode(e) => write!(f, "Decode error: {e}"),
            Self::TextureDataSize { expected, actual } => {
                write!(f, "Texture data is {actual} bytes, expected {expected}")
            }
            Self::InvalidBufferSize { len, stride } => {
                write!(f, "Buffer of {len} bytes is not a non-empty multiple of {stride}")
            }
            Self::EmptyVertexDeclaration => write!(f, "Vertex declaration has no attributes"),
            Self::BufferUpdateOutOfRange { offset, len, size } => write!(
                f,
                "Buffer update of {len} bytes at offset {offset} exceeds buffer size {size}"
            ),
            Self::ZeroSizedRenderTarget => write!(f, "Render target size must be non-zero"),
            Self::EmptyMaterial => write!(f, "Material has no passes"),
            Self::MissingShader { pass } => write!(f, "Material pass {pass} has no shader"),
            Self::MissingVertices => write!(f, "Geometry has no vertex buffers"),
        }
    }
}

impl std::error::Error for RenderError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = RenderError::InvalidShaderSource {
            stage: ShaderStage::Fragment,
            reason: "empty".into(),
        };
        assert_eq!(err.to_string(), "Invalid fragment shader source: empty");

        let err = RenderError::TextureTooLarge {
            size: UVec2::new(8192, 16),
            max: 4096,
        };
        assert_eq!(err.to_string(), "Texture size 8192x16 exceeds maximum 4096");
        assert_eq!(
            RenderError::MissingShader { pass: 1 }.to_string(),
            "Material pass 1 has no shader"
        );
    }
}

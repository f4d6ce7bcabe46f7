//! Pipeline state value objects
//!
//! Every state struct is a small `Copy` value with the device defaults and
//! consuming `with_*` setters, so a pass description reads as one expression:
//!
//! ```ignore
//! let states = StateBlock::default()
//!     .with_depth(DepthState::default().with_write(false))
//!     .with_blending(BlendingState::default().with_factor(
//!         BlendingFactor::SrcAlpha,
//!         BlendingFactor::OneMinusSrcAlpha,
//!     ))
//!     .with_capabilities(CapabilitiesState::default().with_blending(true));
//! ```

use std::sync::Arc;

use bitflags::bitflags;
use glam::Vec4;
use serde::{Deserialize, Serialize};

use super::resources::TexturePtr;

// ============================================================================
// Enumerations
// ============================================================================

/// Comparison used by depth and stencil tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareFunc {
    Never,
    Less,
    LEqual,
    Greater,
    GEqual,
    Equal,
    NotEqual,
    Always,
}

/// Action taken on the stencil buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StencilOp {
    #[default]
    Keep,
    Zero,
    Replace,
    Incr,
    IncrWrap,
    Decr,
    DecrWrap,
    Invert,
}

/// Winding order of front-facing triangles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CullingMode {
    Cw,
    #[default]
    Ccw,
}

bitflags! {
    /// Faces discarded by culling
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct CullingFace: u8 {
        const BACK = 1 << 0;
        const FRONT = 1 << 1;
        const BACK_AND_FRONT = Self::BACK.bits() | Self::FRONT.bits();
    }
}

impl Default for CullingFace {
    fn default() -> Self {
        Self::BACK
    }
}

/// Source or destination multiplier in the blend equation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlendingFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
    ConstantColor,
    OneMinusConstantColor,
    ConstantAlpha,
    OneMinusConstantAlpha,
    SrcAlphaSaturate,
}

/// How source and destination terms are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlendingEquation {
    #[default]
    Add,
    Subtract,
    ReverseSubtract,
}

bitflags! {
    /// Color channels written by a draw
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct BlendingColorMask: u8 {
        const R = 1 << 0;
        const G = 1 << 1;
        const B = 1 << 2;
        const A = 1 << 3;
        const RGB = Self::R.bits() | Self::G.bits() | Self::B.bits();
        const RGBA = Self::RGB.bits() | Self::A.bits();
    }
}

impl Default for BlendingColorMask {
    fn default() -> Self {
        Self::RGBA
    }
}

/// Texture coordinate wrapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SamplerWrap {
    Clamp,
    #[default]
    Repeat,
    Mirror,
}

/// Minification filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SamplerMinFilter {
    Nearest,
    #[default]
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

/// Magnification filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SamplerMagFilter {
    Nearest,
    #[default]
    Linear,
}

// ============================================================================
// Depth
// ============================================================================

/// Depth range, depth writes and depth comparison
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthState {
    pub range_near: f32,
    pub range_far: f32,
    pub write: bool,
    pub func: CompareFunc,
}

impl DepthState {
    #[must_use]
    pub const fn with_range(mut self, near: f32, far: f32) -> Self {
        self.range_near = near;
        self.range_far = far;
        self
    }

    #[must_use]
    pub const fn with_write(mut self, enable: bool) -> Self {
        self.write = enable;
        self
    }

    #[must_use]
    pub const fn with_func(mut self, func: CompareFunc) -> Self {
        self.func = func;
        self
    }
}

impl Default for DepthState {
    fn default() -> Self {
        Self {
            range_near: 0.0,
            range_far: 1.0,
            write: true,
            func: CompareFunc::Less,
        }
    }
}

// ============================================================================
// Stencil
// ============================================================================

/// Stencil masks, reference value, comparison and operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StencilState {
    /// Bits the stencil ops may write
    pub write_mask: u8,
    pub reference: u8,
    /// Bits compared by the stencil test
    pub read_mask: u8,
    pub func: CompareFunc,
    /// Stencil test failed
    pub sfail: StencilOp,
    /// Stencil passed, depth failed
    pub zfail: StencilOp,
    /// Both tests passed
    pub pass: StencilOp,
}

impl StencilState {
    #[must_use]
    pub const fn with_write(mut self, mask: u8) -> Self {
        self.write_mask = mask;
        self
    }

    #[must_use]
    pub const fn with_func(mut self, func: CompareFunc, reference: u8, read_mask: u8) -> Self {
        self.func = func;
        self.reference = reference;
        self.read_mask = read_mask;
        self
    }

    #[must_use]
    pub const fn with_op(mut self, sfail: StencilOp, zfail: StencilOp, pass: StencilOp) -> Self {
        self.sfail = sfail;
        self.zfail = zfail;
        self.pass = pass;
        self
    }
}

impl Default for StencilState {
    fn default() -> Self {
        Self {
            write_mask: 1,
            reference: 0,
            read_mask: 1,
            func: CompareFunc::Always,
            sfail: StencilOp::Keep,
            zfail: StencilOp::Keep,
            pass: StencilOp::Keep,
        }
    }
}

// ============================================================================
// Culling
// ============================================================================

/// Front-face winding and culled faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CullingState {
    pub mode: CullingMode,
    pub face: CullingFace,
}

impl CullingState {
    #[must_use]
    pub const fn with_mode(mut self, mode: CullingMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub const fn with_face(mut self, face: CullingFace) -> Self {
        self.face = face;
        self
    }
}

// ============================================================================
// Blending
// ============================================================================

/// Blend factors and equations, split by color and alpha
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlendingState {
    pub constant_color: Vec4,
    pub color_mask: BlendingColorMask,
    pub src_rgb_factor: BlendingFactor,
    pub dst_rgb_factor: BlendingFactor,
    pub rgb_equation: BlendingEquation,
    pub src_alpha_factor: BlendingFactor,
    pub dst_alpha_factor: BlendingFactor,
    pub alpha_equation: BlendingEquation,
}

impl BlendingState {
    #[must_use]
    pub const fn with_constant_color(mut self, color: Vec4) -> Self {
        self.constant_color = color;
        self
    }

    #[must_use]
    pub const fn with_color_mask(mut self, mask: BlendingColorMask) -> Self {
        self.color_mask = mask;
        self
    }

    /// Set both color and alpha factors
    #[must_use]
    pub const fn with_factor(self, src: BlendingFactor, dst: BlendingFactor) -> Self {
        self.with_rgb_factor(src, dst).with_alpha_factor(src, dst)
    }

    #[must_use]
    pub const fn with_rgb_factor(mut self, src: BlendingFactor, dst: BlendingFactor) -> Self {
        self.src_rgb_factor = src;
        self.dst_rgb_factor = dst;
        self
    }

    #[must_use]
    pub const fn with_alpha_factor(mut self, src: BlendingFactor, dst: BlendingFactor) -> Self {
        self.src_alpha_factor = src;
        self.dst_alpha_factor = dst;
        self
    }

    /// Set both color and alpha equations
    #[must_use]
    pub const fn with_equation(self, equation: BlendingEquation) -> Self {
        self.with_rgb_equation(equation).with_alpha_equation(equation)
    }

    #[must_use]
    pub const fn with_rgb_equation(mut self, equation: BlendingEquation) -> Self {
        self.rgb_equation = equation;
        self
    }

    #[must_use]
    pub const fn with_alpha_equation(mut self, equation: BlendingEquation) -> Self {
        self.alpha_equation = equation;
        self
    }
}

impl Default for BlendingState {
    fn default() -> Self {
        Self {
            constant_color: Vec4::ZERO,
            color_mask: BlendingColorMask::RGBA,
            src_rgb_factor: BlendingFactor::One,
            dst_rgb_factor: BlendingFactor::Zero,
            rgb_equation: BlendingEquation::Add,
            src_alpha_factor: BlendingFactor::One,
            dst_alpha_factor: BlendingFactor::Zero,
            alpha_equation: BlendingEquation::Add,
        }
    }
}

// ============================================================================
// Capabilities
// ============================================================================

/// Which fixed-function stages are enabled. All off by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CapabilitiesState {
    pub culling: bool,
    pub blending: bool,
    pub depth_test: bool,
    pub stencil_test: bool,
}

impl CapabilitiesState {
    #[must_use]
    pub const fn with_culling(mut self, enable: bool) -> Self {
        self.culling = enable;
        self
    }

    #[must_use]
    pub const fn with_blending(mut self, enable: bool) -> Self {
        self.blending = enable;
        self
    }

    #[must_use]
    pub const fn with_depth_test(mut self, enable: bool) -> Self {
        self.depth_test = enable;
        self
    }

    #[must_use]
    pub const fn with_stencil_test(mut self, enable: bool) -> Self {
        self.stencil_test = enable;
        self
    }
}

// ============================================================================
// State block
// ============================================================================

/// Complete fixed-function configuration for one pass
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StateBlock {
    pub depth: DepthState,
    pub stencil: StencilState,
    pub culling: CullingState,
    pub blending: BlendingState,
    pub capabilities: CapabilitiesState,
}

impl StateBlock {
    #[must_use]
    pub const fn with_depth(mut self, depth: DepthState) -> Self {
        self.depth = depth;
        self
    }

    #[must_use]
    pub const fn with_stencil(mut self, stencil: StencilState) -> Self {
        self.stencil = stencil;
        self
    }

    #[must_use]
    pub const fn with_culling(mut self, culling: CullingState) -> Self {
        self.culling = culling;
        self
    }

    #[must_use]
    pub const fn with_blending(mut self, blending: BlendingState) -> Self {
        self.blending = blending;
        self
    }

    #[must_use]
    pub const fn with_capabilities(mut self, capabilities: CapabilitiesState) -> Self {
        self.capabilities = capabilities;
        self
    }
}

// ============================================================================
// Sampler
// ============================================================================

/// Texture plus the wrap and filter settings used to sample it.
///
/// Two samplers are equal when they share the same texture instance and
/// settings.
#[derive(Debug, Clone, Default)]
pub struct SamplerState {
    pub texture: Option<TexturePtr>,
    pub s_wrap: SamplerWrap,
    pub t_wrap: SamplerWrap,
    pub min_filter: SamplerMinFilter,
    pub mag_filter: SamplerMagFilter,
}

impl SamplerState {
    /// Default settings sampling `texture`
    #[must_use]
    pub fn new(texture: TexturePtr) -> Self {
        Self::default().with_texture(texture)
    }

    #[must_use]
    pub fn with_texture(mut self, texture: TexturePtr) -> Self {
        self.texture = Some(texture);
        self
    }

    /// Set both wrap axes
    #[must_use]
    pub fn with_wrap(mut self, wrap: SamplerWrap) -> Self {
        self.s_wrap = wrap;
        self.t_wrap = wrap;
        self
    }

    #[must_use]
    pub fn with_s_wrap(mut self, wrap: SamplerWrap) -> Self {
        self.s_wrap = wrap;
        self
    }

    #[must_use]
    pub fn with_t_wrap(mut self, wrap: SamplerWrap) -> Self {
        self.t_wrap = wrap;
        self
    }

    /// Set both filters
    #[must_use]
    pub fn with_filter(mut self, min: SamplerMinFilter, mag: SamplerMagFilter) -> Self {
        self.min_filter = min;
        self.mag_filter = mag;
        self
    }

    #[must_use]
    pub fn with_min_filter(mut self, min: SamplerMinFilter) -> Self {
        self.min_filter = min;
        self
    }

    #[must_use]
    pub fn with_mag_filter(mut self, mag: SamplerMagFilter) -> Self {
        self.mag_filter = mag;
        self
    }
}

impl PartialEq for SamplerState {
    fn eq(&self, other: &Self) -> bool {
        let same_texture = match (&self.texture, &other.texture) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        same_texture
            && self.s_wrap == other.s_wrap
            && self.t_wrap == other.t_wrap
            && self.min_filter == other.min_filter
            && self.mag_filter == other.mag_filter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let depth = DepthState::default();
        assert_eq!(depth.range_near, 0.0);
        assert_eq!(depth.range_far, 1.0);
        assert!(depth.write);
        assert_eq!(depth.func, CompareFunc::Less);

        let stencil = StencilState::default();
        assert_eq!(stencil.write_mask, 1);
        assert_eq!(stencil.reference, 0);
        assert_eq!(stencil.read_mask, 1);
        assert_eq!(stencil.func, CompareFunc::Always);
        assert_eq!(stencil.pass, StencilOp::Keep);

        let culling = CullingState::default();
        assert_eq!(culling.mode, CullingMode::Ccw);
        assert_eq!(culling.face, CullingFace::BACK);

        let blending = BlendingState::default();
        assert_eq!(blending.color_mask, BlendingColorMask::RGBA);
        assert_eq!(blending.src_rgb_factor, BlendingFactor::One);
        assert_eq!(blending.dst_alpha_factor, BlendingFactor::Zero);

        assert_eq!(CapabilitiesState::default(), CapabilitiesState {
            culling: false,
            blending: false,
            depth_test: false,
            stencil_test: false,
        });
    }

    #[test]
    fn test_builders_chain() {
        let states = StateBlock::default()
            .with_depth(DepthState::default().with_range(0.1, 0.9).with_write(false))
            .with_stencil(StencilState::default().with_func(CompareFunc::Equal, 3, 0xff))
            .with_culling(CullingState::default().with_face(CullingFace::BACK_AND_FRONT))
            .with_capabilities(CapabilitiesState::default().with_depth_test(true));

        assert_eq!(states.depth.range_near, 0.1);
        assert!(!states.depth.write);
        assert_eq!(states.stencil.reference, 3);
        assert_eq!(states.stencil.read_mask, 0xff);
        assert!(states.culling.face.contains(CullingFace::FRONT));
        assert!(states.capabilities.depth_test);
        assert!(!states.capabilities.blending);
    }

    #[test]
    fn test_blending_factor_sets_both_channels() {
        let blending = BlendingState::default()
            .with_factor(BlendingFactor::SrcAlpha, BlendingFactor::OneMinusSrcAlpha)
            .with_alpha_equation(BlendingEquation::Subtract);

        assert_eq!(blending.src_rgb_factor, BlendingFactor::SrcAlpha);
        assert_eq!(blending.src_alpha_factor, BlendingFactor::SrcAlpha);
        assert_eq!(blending.dst_rgb_factor, BlendingFactor::OneMinusSrcAlpha);
        assert_eq!(blending.rgb_equation, BlendingEquation::Add);
        assert_eq!(blending.alpha_equation, BlendingEquation::Subtract);
    }

    #[test]
    fn test_state_block_ron_round_trip() {
        let states = StateBlock::default().with_blending(
            BlendingState::default().with_color_mask(BlendingColorMask::RGB),
        );
        let text = ron::to_string(&states).unwrap();
        let back: StateBlock = ron::from_str(&text).unwrap();
        assert_eq!(back, states);
    }

    #[test]
    fn test_sampler_equality_by_texture_identity() {
        use crate::renderer::{PixelDeclaration, Texture};
        use glam::UVec2;

        let decl = PixelDeclaration::default();
        let a = Arc::new(Texture::new(UVec2::splat(4), decl));
        let b = Arc::new(Texture::new(UVec2::splat(4), decl));

        assert_eq!(SamplerState::new(a.clone()), SamplerState::new(a.clone()));
        assert_ne!(SamplerState::new(a.clone()), SamplerState::new(b));
        assert_ne!(
            SamplerState::new(a.clone()),
            SamplerState::new(a).with_wrap(SamplerWrap::Clamp)
        );
        assert_eq!(SamplerState::default(), SamplerState::default());
    }
}

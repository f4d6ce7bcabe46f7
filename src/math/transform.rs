//! 2D transform value type

use glam::{Mat4, Quat, Vec2, Vec4};
use serde::{Deserialize, Serialize};

/// Translation, rotation (radians) and scale in the plane.
///
/// The matrix form is a standard TRS composition without shear, lifted to
/// 4x4 so it composes with the rest of the render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform2 {
    /// Offset from the parent origin
    pub translation: Vec2,
    /// Counter-clockwise rotation in radians
    pub rotation: f32,
    /// Per-axis scale factor
    pub scale: Vec2,
}

impl Transform2 {
    /// The transform that leaves every point in place
    pub const IDENTITY: Self = Self {
        translation: Vec2::ZERO,
        rotation: 0.0,
        scale: Vec2::ONE,
    };

    /// Create a transform from all three components
    #[must_use]
    pub const fn new(translation: Vec2, rotation: f32, scale: Vec2) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Create a transform with just a translation
    #[must_use]
    pub const fn from_translation(translation: Vec2) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    /// Create a transform with just a rotation
    #[must_use]
    pub const fn from_rotation(rotation: f32) -> Self {
        Self {
            rotation,
            ..Self::IDENTITY
        }
    }

    /// Create a transform with just a scale
    #[must_use]
    pub const fn from_scale(scale: Vec2) -> Self {
        Self {
            scale,
            ..Self::IDENTITY
        }
    }

    /// Get the transformation matrix (translate * rotate * scale)
    #[must_use]
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            self.scale.extend(1.0),
            Quat::from_rotation_z(self.rotation),
            self.translation.extend(0.0),
        )
    }

    /// Transform a homogeneous point by this transform's matrix
    #[must_use]
    pub fn apply(&self, point: Vec4) -> Vec4 {
        self.matrix() * point
    }

    /// Translate by a delta
    pub fn translate(&mut self, delta: Vec2) {
        self.translation += delta;
    }

    /// Rotate by an angle in radians
    pub fn rotate(&mut self, angle: f32) {
        self.rotation += angle;
    }
}

impl Default for Transform2 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

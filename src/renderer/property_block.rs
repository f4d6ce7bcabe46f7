//! Named shader parameters
//!
//! A `PropertyBlock` holds two independent tables keyed by [`StrHash`]:
//! samplers and plain numeric values. Blocks are layered at draw time with
//! [`PropertyBlock::merge`], the later block overriding the earlier one.

use glam::{IVec2, IVec3, IVec4, Mat2, Mat3, Mat4, Vec2, Vec3, Vec4};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::state::SamplerState;
use crate::math::StrHash;

/// A uniform value of one of the supported shader types
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    I32(i32),
    F32(f32),
    IVec2(IVec2),
    IVec3(IVec3),
    IVec4(IVec4),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat2(Mat2),
    Mat3(Mat3),
    Mat4(Mat4),
}

/// Rust types stored as a [`PropertyValue`] variant
pub trait Property: Into<PropertyValue> {
    /// Borrow the payload if `value` holds this type
    fn from_value(value: &PropertyValue) -> Option<&Self>;
}

macro_rules! impl_property {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for PropertyValue {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }

            impl Property for $ty {
                fn from_value(value: &PropertyValue) -> Option<&Self> {
                    match value {
                        PropertyValue::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_property! {
    I32 => i32,
    F32 => f32,
    IVec2 => IVec2,
    IVec3 => IVec3,
    IVec4 => IVec4,
    Vec2 => Vec2,
    Vec3 => Vec3,
    Vec4 => Vec4,
    Mat2 => Mat2,
    Mat3 => Mat3,
    Mat4 => Mat4,
}

/// Bag of sampler and uniform overrides
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyBlock {
    samplers: FxHashMap<StrHash, SamplerState>,
    properties: FxHashMap<StrHash, PropertyValue>,
}

impl PropertyBlock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every sampler and property
    pub fn clear(&mut self) -> &mut Self {
        self.samplers.clear();
        self.properties.clear();
        self
    }

    /// Copy every entry of `other` into this block, replacing same-named ones
    pub fn merge(&mut self, other: &PropertyBlock) -> &mut Self {
        for (name, sampler) in &other.samplers {
            self.samplers.insert(*name, sampler.clone());
        }
        self.properties
            .extend(other.properties.iter().map(|(name, value)| (*name, *value)));
        self
    }

    pub fn set_sampler(&mut self, name: impl Into<StrHash>, sampler: SamplerState) -> &mut Self {
        self.samplers.insert(name.into(), sampler);
        self
    }

    #[must_use]
    pub fn sampler(&self, name: impl Into<StrHash>) -> Option<&SamplerState> {
        self.samplers.get(&name.into())
    }

    pub fn set_property(&mut self, name: impl Into<StrHash>, value: impl Into<PropertyValue>) -> &mut Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Typed lookup. `None` if the name is unknown or holds another type.
    #[must_use]
    pub fn property<T: Property>(&self, name: impl Into<StrHash>) -> Option<&T> {
        self.properties.get(&name.into()).and_then(T::from_value)
    }

    /// Untyped lookup
    #[must_use]
    pub fn property_value(&self, name: impl Into<StrHash>) -> Option<&PropertyValue> {
        self.properties.get(&name.into())
    }

    pub fn remove_sampler(&mut self, name: impl Into<StrHash>) -> Option<SamplerState> {
        self.samplers.remove(&name.into())
    }

    pub fn remove_property(&mut self, name: impl Into<StrHash>) -> Option<PropertyValue> {
        self.properties.remove(&name.into())
    }

    /// Iterate samplers in arbitrary order
    pub fn samplers(&self) -> impl Iterator<Item = (StrHash, &SamplerState)> {
        self.samplers.iter().map(|(name, sampler)| (*name, sampler))
    }

    /// Iterate properties in arbitrary order
    pub fn properties(&self) -> impl Iterator<Item = (StrHash, &PropertyValue)> {
        self.properties.iter().map(|(name, value)| (*name, value))
    }

    #[must_use]
    pub fn sampler_count(&self) -> usize {
        self.samplers.len()
    }

    #[must_use]
    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samplers.is_empty() && self.properties.is_empty()
    }

    #[must_use]
    pub fn with_sampler(mut self, name: impl Into<StrHash>, sampler: SamplerState) -> Self {
        self.set_sampler(name, sampler);
        self
    }

    #[must_use]
    pub fn with_property(mut self, name: impl Into<StrHash>, value: impl Into<PropertyValue>) -> Self {
        self.set_property(name, value);
        self
    }
}

//! Memory layout descriptors for texture, index and vertex data

use glam::{Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::math::StrHash;

// ============================================================================
// Pixels
// ============================================================================

/// Texel storage format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PixelType {
    #[default]
    Rgba8,
    Depth24Stencil8,
    Dxt1,
    Dxt3,
    Dxt5,
    RgbPvrtc2,
    RgbPvrtc4,
    RgbaPvrtc2,
    RgbaPvrtc4,
}

/// Layout of texture data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PixelDeclaration {
    ty: PixelType,
}

impl PixelDeclaration {
    #[must_use]
    pub const fn new(ty: PixelType) -> Self {
        Self { ty }
    }

    #[must_use]
    pub const fn pixel_type(&self) -> PixelType {
        self.ty
    }

    /// Block-compressed formats (DXT, PVRTC)
    #[must_use]
    pub const fn is_compressed(&self) -> bool {
        !matches!(self.ty, PixelType::Rgba8 | PixelType::Depth24Stencil8)
    }

    #[must_use]
    pub const fn is_depth(&self) -> bool {
        matches!(self.ty, PixelType::Depth24Stencil8)
    }

    #[must_use]
    pub const fn bits_per_pixel(&self) -> usize {
        match self.ty {
            PixelType::Rgba8 | PixelType::Depth24Stencil8 => 32,
            PixelType::Dxt1 | PixelType::RgbPvrtc4 | PixelType::RgbaPvrtc4 => 4,
            PixelType::Dxt3 | PixelType::Dxt5 => 8,
            PixelType::RgbPvrtc2 | PixelType::RgbaPvrtc2 => 2,
        }
    }

    /// Bytes needed to store a `width` x `height` image in this format.
    ///
    /// DXT formats round up to whole 4x4 blocks; PVRTC has a minimum
    /// footprint of 8x8 (4bpp) or 16x8 (2bpp) texels. Returns `None` if the
    /// size does not fit in `usize`.
    #[must_use]
    pub fn data_size(&self, width: u32, height: u32) -> Option<usize> {
        let (w, h) = (width as usize, height as usize);
        match self.ty {
            PixelType::Rgba8 | PixelType::Depth24Stencil8 => w.checked_mul(h)?.checked_mul(4),
            PixelType::Dxt1 => w.div_ceil(4).checked_mul(h.div_ceil(4))?.checked_mul(8),
            PixelType::Dxt3 | PixelType::Dxt5 => {
                w.div_ceil(4).checked_mul(h.div_ceil(4))?.checked_mul(16)
            }
            PixelType::RgbPvrtc4 | PixelType::RgbaPvrtc4 => {
                Some(w.max(8).checked_mul(h.max(8))? / 2)
            }
            PixelType::RgbPvrtc2 | PixelType::RgbaPvrtc2 => {
                Some(w.max(16).checked_mul(h.max(8))? / 4)
            }
        }
    }
}

impl From<PixelType> for PixelDeclaration {
    fn from(ty: PixelType) -> Self {
        Self::new(ty)
    }
}

// ============================================================================
// Indices
// ============================================================================

/// Width of a single index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IndexType {
    UnsignedByte,
    #[default]
    UnsignedShort,
}

/// Layout of index data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct IndexDeclaration {
    ty: IndexType,
}

impl IndexDeclaration {
    #[must_use]
    pub const fn new(ty: IndexType) -> Self {
        Self { ty }
    }

    #[must_use]
    pub const fn index_type(&self) -> IndexType {
        self.ty
    }

    #[must_use]
    pub const fn bytes_per_index(&self) -> usize {
        match self.ty {
            IndexType::UnsignedByte => 1,
            IndexType::UnsignedShort => 2,
        }
    }
}

impl From<IndexType> for IndexDeclaration {
    fn from(ty: IndexType) -> Self {
        Self::new(ty)
    }
}

// ============================================================================
// Vertices
// ============================================================================

/// Scalar component type of a vertex attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AttributeType {
    I8,
    U8,
    I16,
    U16,
    #[default]
    F32,
}

impl AttributeType {
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::F32 => 4,
        }
    }
}

/// One attribute inside a vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeInfo {
    /// Byte offset from the start of the vertex
    pub stride: usize,
    pub name: StrHash,
    pub rows: u8,
    pub columns: u8,
    pub ty: AttributeType,
    pub normalized: bool,
}

impl AttributeInfo {
    /// Bytes in one row (`columns` components)
    #[must_use]
    pub const fn row_size(&self) -> usize {
        self.columns as usize * self.ty.size()
    }

    /// Bytes occupied by the whole attribute
    #[must_use]
    pub const fn size(&self) -> usize {
        self.rows as usize * self.row_size()
    }
}

/// Types that map directly onto a vertex attribute shape
pub trait VertexAttribute {
    const ROWS: u8;
    const COLUMNS: u8;
    const TYPE: AttributeType;
}

macro_rules! impl_vertex_attribute {
    ($($ty:ty => ($rows:expr, $columns:expr, $attr:ident)),* $(,)?) => {
        $(
            impl VertexAttribute for $ty {
                const ROWS: u8 = $rows;
                const COLUMNS: u8 = $columns;
                const TYPE: AttributeType = AttributeType::$attr;
            }
        )*
    };
}

impl_vertex_attribute! {
    f32 => (1, 1, F32),
    Vec2 => (1, 2, F32),
    Vec3 => (1, 3, F32),
    Vec4 => (1, 4, F32),
    [f32; 2] => (1, 2, F32),
    [f32; 3] => (1, 3, F32),
    [f32; 4] => (1, 4, F32),
    [u8; 4] => (1, 4, U8),
    [i8; 4] => (1, 4, I8),
    [u16; 2] => (1, 2, U16),
    [i16; 2] => (1, 2, I16),
}

const MAX_ATTRIBUTE_COUNT: usize = 8;

/// Ordered list of vertex attributes with automatically computed offsets
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexDeclaration {
    attributes: SmallVec<[AttributeInfo; MAX_ATTRIBUTE_COUNT]>,
    bytes_per_vertex: usize,
}

impl VertexDeclaration {
    pub const MAX_ATTRIBUTES: usize = MAX_ATTRIBUTE_COUNT;

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an attribute at the current end of the vertex.
    ///
    /// # Panics
    ///
    /// Panics when the declaration already holds [`Self::MAX_ATTRIBUTES`].
    #[must_use]
    pub fn add_attribute(
        mut self,
        name: impl Into<StrHash>,
        rows: u8,
        columns: u8,
        ty: AttributeType,
        normalized: bool,
    ) -> Self {
        assert!(
            self.attributes.len() < Self::MAX_ATTRIBUTES,
            "vertex declaration is limited to {} attributes",
            Self::MAX_ATTRIBUTES
        );
        let info = AttributeInfo {
            stride: self.bytes_per_vertex,
            name: name.into(),
            rows,
            columns,
            ty,
            normalized,
        };
        self.bytes_per_vertex += info.size();
        self.attributes.push(info);
        self
    }

    /// Append an attribute shaped like `T`
    #[must_use]
    pub fn add_attribute_of<T: VertexAttribute>(self, name: impl Into<StrHash>) -> Self {
        self.add_attribute(name, T::ROWS, T::COLUMNS, T::TYPE, false)
    }

    /// Mark the last added attribute as normalized
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if let Some(last) = self.attributes.last_mut() {
            last.normalized = true;
        }
        self
    }

    /// Leave a gap of `bytes` before the next attribute
    #[must_use]
    pub fn skip_bytes(mut self, bytes: usize) -> Self {
        self.bytes_per_vertex += bytes;
        self
    }

    #[must_use]
    pub fn attribute(&self, index: usize) -> Option<&AttributeInfo> {
        self.attributes.get(index)
    }

    pub fn attributes(&self) -> impl Iterator<Item = &AttributeInfo> {
        self.attributes.iter()
    }

    #[must_use]
    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    #[must_use]
    pub const fn bytes_per_vertex(&self) -> usize {
        self.bytes_per_vertex
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_formats() {
        let rgba = PixelDeclaration::new(PixelType::Rgba8);
        assert!(!rgba.is_compressed());
        assert!(!rgba.is_depth());
        assert_eq!(rgba.bits_per_pixel(), 32);

        let depth = PixelDeclaration::from(PixelType::Depth24Stencil8);
        assert!(depth.is_depth());
        assert!(!depth.is_compressed());

        assert!(PixelDeclaration::new(PixelType::Dxt5).is_compressed());
        assert_eq!(PixelDeclaration::new(PixelType::Dxt1).bits_per_pixel(), 4);
        assert_eq!(PixelDeclaration::new(PixelType::RgbaPvrtc2).bits_per_pixel(), 2);
        assert_eq!(PixelDeclaration::default().pixel_type(), PixelType::Rgba8);
    }

    #[test]
    fn test_pixel_data_size() {
        assert_eq!(PixelDeclaration::new(PixelType::Rgba8).data_size(4, 2), Some(32));
        // 5x5 rounds up to 2x2 blocks
        assert_eq!(PixelDeclaration::new(PixelType::Dxt1).data_size(5, 5), Some(32));
        assert_eq!(PixelDeclaration::new(PixelType::Dxt5).data_size(4, 4), Some(16));
        assert_eq!(PixelDeclaration::new(PixelType::RgbPvrtc4).data_size(2, 2), Some(32));
        assert_eq!(PixelDeclaration::new(PixelType::RgbaPvrtc2).data_size(32, 32), Some(256));
    }

    #[test]
    fn test_pixel_data_size_overflow() {
        let rgba = PixelDeclaration::new(PixelType::Rgba8);
        assert_eq!(rgba.data_size(u32::MAX, u32::MAX), None);
        assert!(PixelDeclaration::new(PixelType::Dxt5).data_size(u32::MAX, 4).is_some());
    }

    #[test]
    fn test_index_sizes() {
        assert_eq!(IndexDeclaration::default().bytes_per_index(), 2);
        assert_eq!(IndexDeclaration::new(IndexType::UnsignedByte).bytes_per_index(), 1);
    }

    #[test]
    fn test_vertex_offsets_accumulate() {
        let decl = VertexDeclaration::new()
            .add_attribute_of::<Vec2>("a_position")
            .add_attribute_of::<Vec2>("a_uv")
            .add_attribute_of::<[u8; 4]>("a_color")
            .normalized();

        assert_eq!(decl.attribute_count(), 3);
        assert_eq!(decl.bytes_per_vertex(), 8 + 8 + 4);

        let color = decl.attribute(2).copied().unwrap();
        assert_eq!(color.stride, 16);
        assert_eq!(color.name, StrHash::new("a_color"));
        assert!(color.normalized);
        assert!(!decl.attribute(0).unwrap().normalized);
    }

    #[test]
    fn test_vertex_skip_bytes() {
        let decl = VertexDeclaration::new()
            .add_attribute("a_position", 1, 3, AttributeType::F32, false)
            .skip_bytes(4)
            .add_attribute("a_weight", 1, 1, AttributeType::U16, false);

        assert_eq!(decl.attribute(1).unwrap().stride, 16);
        assert_eq!(decl.bytes_per_vertex(), 18);
    }

    #[test]
    fn test_matrix_attribute_size() {
        let decl = VertexDeclaration::new().add_attribute("a_matrix", 4, 4, AttributeType::F32, false);
        assert_eq!(decl.attribute(0).unwrap().row_size(), 16);
        assert_eq!(decl.bytes_per_vertex(), 64);
    }

    #[test]
    #[should_panic(expected = "limited to 8 attributes")]
    fn test_vertex_attribute_cap() {
        let mut decl = VertexDeclaration::new();
        for i in 0..=VertexDeclaration::MAX_ATTRIBUTES {
            decl = decl.add_attribute_of::<f32>(format!("a_{i}"));
        }
    }
}

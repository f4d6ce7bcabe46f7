//! Math helpers shared by the scene graph and the renderer

mod hash;
mod transform;

pub use hash::StrHash;
pub use transform::Transform2;

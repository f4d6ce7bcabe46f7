//! Core module
//!
//! Device configuration and scene snapshots

mod config;
mod scene;

pub use config::RenderConfig;
pub use scene::{SceneError, SceneSnapshot, SerializedNode};

//! Scene graph
//!
//! Reference-counted node tree with cached, lazily recomputed matrices.

mod node;
pub mod nodes;

pub use node::{Node, WeakNode};
pub use nodes::TraverseOptions;

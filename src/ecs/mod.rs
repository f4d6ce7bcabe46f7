//! Entity Component System module
//!
//! Built on top of the hecs ECS library. Each instance pairs an entity with
//! a scene [`Node`](crate::scene::Node) owned by the [`World`].

mod components;
mod world;

pub use components::Name;
pub use world::World;

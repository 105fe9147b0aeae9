pub mod api;
pub mod block;
pub mod chunk;
pub mod coords;
pub mod creature;
pub mod events;
pub mod geometry;
pub mod inventory;
pub mod mesh;
pub mod store;
pub mod worldgen;

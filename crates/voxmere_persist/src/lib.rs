pub mod compression;
pub mod versioning;
pub mod world_file;

pub use world_file::{PersistError, WorldFile};

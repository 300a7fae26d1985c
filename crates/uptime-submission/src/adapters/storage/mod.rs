//! Storage destinations implementing [`ObjectStore`](crate::ports::ObjectStore).

mod file;
mod memory;

pub use file::FileSystemStore;
pub use memory::MemoryStore;

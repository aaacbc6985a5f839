//! Reference store backends

mod filesystem;
mod memory;

pub use filesystem::FilesystemRefStore;
pub use memory::MemoryRefStore;

//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The core domain
//! depends only on these traits, not on concrete implementations.

mod cache;
mod directory;
mod renderer;
mod store;

pub use cache::{Cache, CacheEntry, CacheKey};
pub use directory::ClientDirectory;
pub use renderer::PdfRenderer;
pub use store::MovementStore;

//! # meshview core
//!
//! Vertex layout model and cooperative cancellation primitives shared by the
//! replay boundary and the mesh viewer pipeline.

pub mod compute;
pub mod mesh;
mod resource;

pub use resource::ResourceId;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}

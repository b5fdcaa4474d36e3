pub mod coordinate;

// Foundation crate: small, well-tested primitives only.
pub use coordinate::*;

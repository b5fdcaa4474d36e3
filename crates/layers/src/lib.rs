//! Presentation data derived from the current map center.
//!
//! Everything here is a pure function of `(center, mock source, seed)`:
//! recomputation replaces the previous output wholesale.

pub mod heatmap;
pub mod jitter;
pub mod layer;
pub mod markers;
pub mod source;
pub mod symbology;

pub use heatmap::*;
pub use jitter::*;
pub use layer::*;
pub use markers::*;
pub use source::*;
pub use symbology::*;

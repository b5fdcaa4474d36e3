//! Map view state and its coordination with location and derived overlays.

pub mod config;
pub mod controller;
pub mod recording;
pub mod renderer;
pub mod shared;
pub mod state;

pub use config::*;
pub use controller::*;
pub use recording::*;
pub use renderer::*;
pub use shared::*;
pub use state::*;

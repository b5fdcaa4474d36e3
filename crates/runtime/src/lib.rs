pub mod dispose;
pub mod event_bus;

pub use dispose::*;
pub use event_bus::*;

use foundation::Coordinate;
use layers::{Overlay, OverlayId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("map renderer failed to initialize: {0}")]
    Init(String),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

pub type ZoomListener = Box<dyn FnMut(u8)>;

/// A live map view owned by an external rendering library.
///
/// Zoom listeners must be invoked from the renderer's own event loop, never
/// from inside one of these methods.
pub trait MapHandle {
    /// Animated pan/zoom to `center`.
    fn fly_to(&mut self, center: &Coordinate, zoom: u8, duration_ms: u32);
    fn set_zoom(&mut self, zoom: u8);
    fn zoom(&self) -> u8;
    fn add_overlay(&mut self, overlay: &Overlay) -> OverlayId;
    /// Removing an unknown id is a no-op.
    fn remove_overlay(&mut self, id: OverlayId);
    /// Called with the new zoom after each zoom gesture ends.
    fn on_zoom(&mut self, listener: ZoomListener) -> ListenerId;
    fn off_zoom(&mut self, id: ListenerId);
}

pub trait MapRenderer {
    type Handle: MapHandle;

    fn create_view(&mut self, center: &Coordinate, zoom: u8) -> Result<Self::Handle, RenderError>;
}

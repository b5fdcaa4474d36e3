use foundation::Coordinate;
use layers::RenderPlan;
use serde::{Deserialize, Serialize};

/// Controller lifecycle.
///
/// `Uninitialized -> AwaitingLocation -> Ready`, each step taken once.
/// `Disposed` is terminal and reachable from every state.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Uninitialized,
    AwaitingLocation,
    Ready,
    Disposed,
}

/// View state owned by the controller.
#[derive(Debug)]
pub struct ViewState<H> {
    pub(crate) center: Coordinate,
    pub(crate) zoom_level: u8,
    pub(crate) map_handle: Option<H>,
}

impl<H> ViewState<H> {
    pub(crate) fn new(center: Coordinate, zoom_level: u8) -> Self {
        Self {
            center,
            zoom_level,
            map_handle: None,
        }
    }

    pub fn center(&self) -> &Coordinate {
        &self.center
    }

    pub fn zoom_level(&self) -> u8 {
        self.zoom_level
    }

    pub fn map_handle(&self) -> Option<&H> {
        self.map_handle.as_ref()
    }

    pub fn has_renderer(&self) -> bool {
        self.map_handle.is_some()
    }
}

/// Notifications published to view-state subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    LifecycleChanged { from: Lifecycle, to: Lifecycle },
    CenterChanged { center: Coordinate },
    ZoomChanged { zoom: u8 },
    MarkersRecomputed { seed: u64, count: usize },
    Recentered { center: Coordinate, zoom: u8 },
    RendererAttached,
    RendererReleased,
}

/// Serializable picture of the view for shells and logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewSnapshot {
    pub lifecycle: Lifecycle,
    pub center: Coordinate,
    pub zoom_level: u8,
    pub seed: u64,
    pub renderer_attached: bool,
    pub plan: RenderPlan,
}

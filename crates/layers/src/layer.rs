use foundation::Coordinate;
use serde::{Deserialize, Serialize};

use crate::heatmap::Heatmap;
use crate::markers::{DerivedMarker, DerivedMarkerSet};
use crate::symbology::MarkerIcon;

/// Renderer-assigned identifier for an overlay that has been added.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OverlayId(pub u64);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayKind {
    SelfMarker,
    Heatmap,
    Listener,
}

/// One thing to draw on top of the tile layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Overlay {
    SelfMarker { position: Coordinate, icon: MarkerIcon },
    Heatmap(Heatmap),
    Listener(DerivedMarker),
}

impl Overlay {
    pub fn kind(&self) -> OverlayKind {
        match self {
            Overlay::SelfMarker { .. } => OverlayKind::SelfMarker,
            Overlay::Heatmap(_) => OverlayKind::Heatmap,
            Overlay::Listener(_) => OverlayKind::Listener,
        }
    }
}

/// Full set of overlays for the current view, bottom to top.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RenderPlan {
    pub overlays: Vec<Overlay>,
}

impl RenderPlan {
    /// Heatmap first, then the user's dot, then listeners when zoomed in far enough.
    pub fn compose(
        position: &Coordinate,
        heatmap: &Heatmap,
        markers: &DerivedMarkerSet,
        zoom: u8,
        min_listener_zoom: u8,
    ) -> Self {
        let mut overlays = Vec::with_capacity(2 + markers.len());
        overlays.push(Overlay::Heatmap(heatmap.clone()));
        overlays.push(Overlay::SelfMarker {
            position: position.clone(),
            icon: MarkerIcon::UserDot,
        });
        overlays.extend(
            markers
                .visible_at(zoom, min_listener_zoom)
                .iter()
                .cloned()
                .map(Overlay::Listener),
        );
        Self { overlays }
    }

    pub fn count(&self, kind: OverlayKind) -> usize {
        self.overlays.iter().filter(|o| o.kind() == kind).count()
    }

    pub fn listeners(&self) -> impl Iterator<Item = &DerivedMarker> {
        self.overlays.iter().filter_map(|o| match o {
            Overlay::Listener(m) => Some(m),
            _ => None,
        })
    }
}

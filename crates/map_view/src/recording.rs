use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use foundation::Coordinate;
use layers::{Overlay, OverlayId, OverlayKind};
use tracing::debug;

use crate::renderer::{ListenerId, MapHandle, MapRenderer, RenderError, ZoomListener};

/// One call made against a [`RecordingMap`].
#[derive(Debug, Clone, PartialEq)]
pub enum MapCall {
    Open { center: Coordinate, zoom: u8 },
    FlyTo { center: Coordinate, zoom: u8, duration_ms: u32 },
    SetZoom(u8),
    AddOverlay(OverlayId, OverlayKind),
    RemoveOverlay(OverlayId),
    OnZoom(ListenerId),
    OffZoom(ListenerId),
}

#[derive(Default)]
struct MapLog {
    calls: Vec<MapCall>,
    live: BTreeMap<OverlayId, Overlay>,
    listeners: BTreeMap<ListenerId, ZoomListener>,
    /// Listeners handed out to a running gesture.
    dispatching: BTreeSet<ListenerId>,
    /// Dispatched listeners that were removed before they came back.
    dropped: BTreeSet<ListenerId>,
    zoom: u8,
    next_overlay: u64,
    next_listener: u64,
}

/// Headless map that records what it is asked to draw.
///
/// Used by the CLI shell and by tests; a [`MapProbe`] observes the same log
/// after the map itself has been handed to a controller.
pub struct RecordingMap {
    log: Rc<RefCell<MapLog>>,
}

impl RecordingMap {
    pub fn new(zoom: u8) -> Self {
        let log = MapLog {
            zoom,
            ..MapLog::default()
        };
        Self {
            log: Rc::new(RefCell::new(log)),
        }
    }

    fn open(center: &Coordinate, zoom: u8) -> Self {
        let map = Self::new(zoom);
        map.log.borrow_mut().calls.push(MapCall::Open {
            center: center.clone(),
            zoom,
        });
        map
    }

    pub fn probe(&self) -> MapProbe {
        MapProbe {
            log: Rc::clone(&self.log),
        }
    }
}

impl MapHandle for RecordingMap {
    fn fly_to(&mut self, center: &Coordinate, zoom: u8, duration_ms: u32) {
        debug!(%center, zoom, duration_ms, "map fly_to");
        let mut log = self.log.borrow_mut();
        log.zoom = zoom;
        log.calls.push(MapCall::FlyTo {
            center: center.clone(),
            zoom,
            duration_ms,
        });
    }

    fn set_zoom(&mut self, zoom: u8) {
        debug!(zoom, "map set_zoom");
        let mut log = self.log.borrow_mut();
        log.zoom = zoom;
        log.calls.push(MapCall::SetZoom(zoom));
    }

    fn zoom(&self) -> u8 {
        self.log.borrow().zoom
    }

    fn add_overlay(&mut self, overlay: &Overlay) -> OverlayId {
        let mut log = self.log.borrow_mut();
        log.next_overlay += 1;
        let id = OverlayId(log.next_overlay);
        debug!(id = id.0, kind = ?overlay.kind(), "map add_overlay");
        log.calls.push(MapCall::AddOverlay(id, overlay.kind()));
        log.live.insert(id, overlay.clone());
        id
    }

    fn remove_overlay(&mut self, id: OverlayId) {
        let mut log = self.log.borrow_mut();
        if log.live.remove(&id).is_some() {
            log.calls.push(MapCall::RemoveOverlay(id));
        }
    }

    fn on_zoom(&mut self, listener: ZoomListener) -> ListenerId {
        let mut log = self.log.borrow_mut();
        log.next_listener += 1;
        let id = ListenerId(log.next_listener);
        log.listeners.insert(id, listener);
        log.calls.push(MapCall::OnZoom(id));
        id
    }

    fn off_zoom(&mut self, id: ListenerId) {
        let mut log = self.log.borrow_mut();
        if log.listeners.remove(&id).is_some() {
            log.calls.push(MapCall::OffZoom(id));
        } else if log.dispatching.contains(&id) && log.dropped.insert(id) {
            log.calls.push(MapCall::OffZoom(id));
        }
    }
}

/// Read side of a [`RecordingMap`], plus a way to play user gestures.
#[derive(Clone)]
pub struct MapProbe {
    log: Rc<RefCell<MapLog>>,
}

impl MapProbe {
    pub fn calls(&self) -> Vec<MapCall> {
        self.log.borrow().calls.clone()
    }

    /// Where the map was created, if it came from a [`RecordingRenderer`].
    pub fn opened_at(&self) -> Option<(Coordinate, u8)> {
        self.log.borrow().calls.iter().find_map(|c| match c {
            MapCall::Open { center, zoom } => Some((center.clone(), *zoom)),
            _ => None,
        })
    }

    pub fn fly_tos(&self) -> Vec<(Coordinate, u8, u32)> {
        self.log
            .borrow()
            .calls
            .iter()
            .filter_map(|c| match c {
                MapCall::FlyTo {
                    center,
                    zoom,
                    duration_ms,
                } => Some((center.clone(), *zoom, *duration_ms)),
                _ => None,
            })
            .collect()
    }

    pub fn live_ids(&self) -> Vec<OverlayId> {
        self.log.borrow().live.keys().copied().collect()
    }

    /// Overlays currently on the map, in insertion order.
    pub fn live_overlays(&self) -> Vec<Overlay> {
        self.log.borrow().live.values().cloned().collect()
    }

    pub fn live_count(&self, kind: OverlayKind) -> usize {
        self.log
            .borrow()
            .live
            .values()
            .filter(|o| o.kind() == kind)
            .count()
    }

    pub fn zoom(&self) -> u8 {
        self.log.borrow().zoom
    }

    pub fn listener_count(&self) -> usize {
        self.log.borrow().listeners.len()
    }

    /// Simulate the end of a user zoom gesture.
    ///
    /// Listeners are taken out of the log while they run, so they may call
    /// back into a controller that owns the map.
    pub fn fire_zoom(&self, zoom: u8) {
        let mut listeners = {
            let mut log = self.log.borrow_mut();
            log.zoom = zoom;
            let listeners = std::mem::take(&mut log.listeners);
            log.dispatching = listeners.keys().copied().collect();
            listeners
        };
        for listener in listeners.values_mut() {
            listener(zoom);
        }
        let mut log = self.log.borrow_mut();
        log.dispatching.clear();
        let dropped = std::mem::take(&mut log.dropped);
        for (id, listener) in listeners {
            if !dropped.contains(&id) {
                log.listeners.entry(id).or_insert(listener);
            }
        }
    }
}

impl std::fmt::Debug for MapProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let log = self.log.borrow();
        f.debug_struct("MapProbe")
            .field("zoom", &log.zoom)
            .field("live", &log.live.len())
            .field("calls", &log.calls.len())
            .finish()
    }
}

/// Creates [`RecordingMap`]s, or fails like a browser without WebGL.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    fail_with: Option<String>,
    probes: Vec<MapProbe>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            fail_with: Some(reason.into()),
            probes: Vec::new(),
        }
    }

    pub fn last_probe(&self) -> Option<MapProbe> {
        self.probes.last().cloned()
    }
}

impl MapRenderer for RecordingRenderer {
    type Handle = RecordingMap;

    fn create_view(&mut self, center: &Coordinate, zoom: u8) -> Result<RecordingMap, RenderError> {
        if let Some(reason) = &self.fail_with {
            return Err(RenderError::Init(reason.clone()));
        }
        debug!(%center, zoom, "map created");
        let map = RecordingMap::open(center, zoom);
        self.probes.push(map.probe());
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use layers::{HeatmapConfig, MarkerIcon, derive_heatmap};
    use std::cell::Cell;

    fn self_marker() -> Overlay {
        Overlay::SelfMarker {
            position: Coordinate::landmark(),
            icon: MarkerIcon::UserDot,
        }
    }

    #[test]
    fn overlays_are_tracked_until_removed() {
        let mut map = RecordingMap::new(15);
        let probe = map.probe();
        let a = map.add_overlay(&self_marker());
        let b = map.add_overlay(&Overlay::Heatmap(derive_heatmap(&Coordinate::landmark(), &HeatmapConfig::default(), 0)));
        assert_ne!(a, b);
        map.remove_overlay(a);
        map.remove_overlay(a);
        assert_eq!(probe.live_ids(), vec![b]);
        assert_eq!(
            probe.calls().iter().filter(|c| matches!(c, MapCall::RemoveOverlay(_))).count(),
            1
        );
    }

    #[test]
    fn fire_zoom_reaches_listeners() {
        let mut map = RecordingMap::new(15);
        let probe = map.probe();
        let seen = Rc::new(Cell::new(0u8));
        let sink = Rc::clone(&seen);
        let id = map.on_zoom(Box::new(move |z| sink.set(z)));
        probe.fire_zoom(12);
        assert_eq!(seen.get(), 12);
        assert_eq!(map.zoom(), 12);

        map.off_zoom(id);
        probe.fire_zoom(9);
        assert_eq!(seen.get(), 12);
    }

    #[test]
    fn listener_removed_during_gesture_stays_removed() {
        let map = Rc::new(RefCell::new(RecordingMap::new(15)));
        let probe = map.borrow().probe();
        let hits = Rc::new(Cell::new(0));
        let own_id = Rc::new(Cell::new(None));

        let (sink, id_cell, handle) = (Rc::clone(&hits), Rc::clone(&own_id), Rc::clone(&map));
        let id = map.borrow_mut().on_zoom(Box::new(move |_| {
            sink.set(sink.get() + 1);
            if let Some(id) = id_cell.get() {
                handle.borrow_mut().off_zoom(id);
            }
        }));
        own_id.set(Some(id));

        probe.fire_zoom(12);
        probe.fire_zoom(9);
        assert_eq!(hits.get(), 1);
        assert_eq!(probe.listener_count(), 0);
        assert_eq!(
            probe.calls().iter().filter(|c| matches!(c, MapCall::OffZoom(_))).count(),
            1
        );
    }

    #[test]
    fn renderer_can_fail() {
        let mut r = RecordingRenderer::failing("no canvas");
        assert!(r.create_view(&Coordinate::landmark(), 15).is_err());
        assert!(r.last_probe().is_none());
    }
}

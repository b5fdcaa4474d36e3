use foundation::Coordinate;
use layers::{
    DerivedMarkerSet, Heatmap, MockSource, OverlayId, RenderPlan, derive_heatmap, derive_markers,
};
use runtime::{DisposeToken, EventBus, Recorded, SubscriptionId};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ViewConfig;
use crate::renderer::{ListenerId, MapHandle, MapRenderer, RenderError, ZoomListener};
use crate::state::{Lifecycle, ViewEvent, ViewSnapshot, ViewState};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("map view already mounted ({0:?})")]
    AlreadyMounted(Lifecycle),
    #[error("map view has been torn down")]
    Disposed,
}

/// Issued by [`MapViewController::mount`]; a location result is only applied
/// when presented with the ticket of a still-live mount.
#[derive(Debug, Clone)]
pub struct LocationTicket {
    token: DisposeToken,
}

impl LocationTicket {
    pub fn is_stale(&self) -> bool {
        self.token.is_disposed()
    }
}

/// Owns the map view state and keeps the renderer's overlays in step with it.
///
/// Single-threaded. Event subscribers run synchronously inside controller
/// methods and must not call back into the controller.
pub struct MapViewController<H: MapHandle> {
    config: ViewConfig,
    source: MockSource,
    view: ViewState<H>,
    lifecycle: Lifecycle,
    generation: u64,
    markers: DerivedMarkerSet,
    heatmap: Heatmap,
    placed: Vec<OverlayId>,
    zoom_listener: Option<ListenerId>,
    bus: EventBus<ViewEvent>,
    disposal: DisposeToken,
}

impl<H: MapHandle> MapViewController<H> {
    /// Derived overlays exist from the start, anchored on the initial center.
    pub fn new(config: ViewConfig, source: MockSource) -> Self {
        let center = config.initial_center.clone();
        let zoom = config.clamp_zoom(config.initial_zoom);
        let markers = derive_markers(&center, &source, &config.markers, config.base_seed);
        let heatmap = derive_heatmap(&center, &config.heatmap, config.base_seed);
        Self {
            view: ViewState::new(center, zoom),
            config,
            source,
            lifecycle: Lifecycle::Uninitialized,
            generation: 0,
            markers,
            heatmap,
            placed: Vec::new(),
            zoom_listener: None,
            bus: EventBus::new(),
            disposal: DisposeToken::new(),
        }
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn view(&self) -> &ViewState<H> {
        &self.view
    }

    pub fn markers(&self) -> &DerivedMarkerSet {
        &self.markers
    }

    pub fn heatmap(&self) -> &Heatmap {
        &self.heatmap
    }

    /// Seed used for the current derived overlays.
    pub fn seed(&self) -> u64 {
        self.config.base_seed.wrapping_add(self.generation)
    }

    /// Begin the view lifecycle. The returned ticket must accompany the
    /// location result.
    pub fn mount(&mut self) -> Result<LocationTicket, ControllerError> {
        match self.lifecycle {
            Lifecycle::Uninitialized => {}
            Lifecycle::Disposed => return Err(ControllerError::Disposed),
            other => return Err(ControllerError::AlreadyMounted(other)),
        }
        self.transition(Lifecycle::AwaitingLocation);
        Ok(LocationTicket {
            token: self.disposal.clone(),
        })
    }

    /// Apply the outcome of the mount-time location request.
    ///
    /// Returns `false` when the ticket belongs to a torn-down or foreign mount;
    /// the result is discarded without touching any state.
    pub fn apply_location(&mut self, ticket: &LocationTicket, coordinate: Coordinate) -> bool {
        if ticket.is_stale() || !ticket.token.same_as(&self.disposal) {
            debug!("discarding location for a torn-down view");
            return false;
        }
        self.update_location(coordinate)
    }

    /// Move the view to a newly resolved position.
    ///
    /// The first resolution takes the view to `Ready` and flies the map to it.
    /// Later ones (watch updates) move the center and overlays only.
    pub fn update_location(&mut self, coordinate: Coordinate) -> bool {
        let first = match self.lifecycle {
            Lifecycle::AwaitingLocation => true,
            Lifecycle::Ready => false,
            Lifecycle::Uninitialized => {
                warn!("location arrived before mount; ignored");
                return false;
            }
            Lifecycle::Disposed => {
                debug!("location arrived after teardown; ignored");
                return false;
            }
        };

        self.set_center(coordinate);
        if first {
            self.transition(Lifecycle::Ready);
            self.recenter();
        }
        true
    }

    /// Hand the controller a live map. Replaces (and releases) any previous one.
    ///
    /// A map attached after the location resolved is flown to the center.
    pub fn attach_renderer(&mut self, handle: H) -> bool {
        if self.lifecycle == Lifecycle::Disposed {
            debug!("renderer attached after teardown; dropped");
            return false;
        }
        if self.view.map_handle.is_some() {
            self.release_renderer();
        }
        self.view.map_handle = Some(handle);
        self.bus.emit(ViewEvent::RendererAttached);
        self.sync_overlays();
        if self.lifecycle == Lifecycle::Ready {
            // The location resolved before this map existed.
            self.recenter();
        }
        true
    }

    /// Create a map through `renderer` at the current center and attach it.
    pub fn create_view<R>(&mut self, renderer: &mut R) -> Result<bool, RenderError>
    where
        R: MapRenderer<Handle = H>,
    {
        if self.lifecycle == Lifecycle::Disposed {
            return Ok(false);
        }
        let handle = renderer
            .create_view(&self.view.center, self.view.zoom_level)
            .inspect_err(|err| warn!(error = %err, "map renderer unavailable"))?;
        Ok(self.attach_renderer(handle))
    }

    /// Register `listener` for the map's zoom-end notifications, replacing any
    /// earlier registration. Returns `false` without a renderer.
    pub fn listen_for_zoom(&mut self, listener: ZoomListener) -> bool {
        let Some(handle) = self.view.map_handle.as_mut() else {
            return false;
        };
        if let Some(old) = self.zoom_listener.take() {
            handle.off_zoom(old);
        }
        self.zoom_listener = Some(handle.on_zoom(listener));
        true
    }

    /// Detach the map, removing everything the controller placed on it.
    pub fn release_renderer(&mut self) -> Option<H> {
        let mut handle = self.view.map_handle.take()?;
        for id in self.placed.drain(..) {
            handle.remove_overlay(id);
        }
        if let Some(id) = self.zoom_listener.take() {
            handle.off_zoom(id);
        }
        self.bus.emit(ViewEvent::RendererReleased);
        Some(handle)
    }

    /// Fly the map back to the current center at the target zoom.
    ///
    /// A no-op returning `false` until a renderer is attached.
    pub fn recenter(&mut self) -> bool {
        let zoom = self.config.clamp_zoom(self.config.target_zoom);
        let duration = self.config.fly_duration_ms;
        let Some(handle) = self.view.map_handle.as_mut() else {
            debug!("recenter before the map exists; ignored");
            return false;
        };
        handle.fly_to(&self.view.center, zoom, duration);
        let center = self.view.center.clone();
        self.bus.emit(ViewEvent::Recentered { center, zoom });
        self.apply_zoom(zoom);
        true
    }

    /// Zoom-end notification from the renderer.
    pub fn on_zoom_changed(&mut self, zoom: u8) -> bool {
        if self.lifecycle == Lifecycle::Disposed {
            return false;
        }
        self.apply_zoom(zoom)
    }

    pub fn zoom_in(&mut self) -> bool {
        self.step_zoom(1)
    }

    pub fn zoom_out(&mut self) -> bool {
        self.step_zoom(-1)
    }

    fn step_zoom(&mut self, delta: i8) -> bool {
        if self.lifecycle == Lifecycle::Disposed {
            return false;
        }
        let target = self
            .config
            .clamp_zoom(self.view.zoom_level.saturating_add_signed(delta));
        if let Some(handle) = self.view.map_handle.as_mut() {
            handle.set_zoom(target);
        }
        self.apply_zoom(target)
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&ViewEvent) + 'static) -> SubscriptionId {
        self.bus.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// Recent events, oldest first.
    pub fn events(&self) -> impl Iterator<Item = &Recorded<ViewEvent>> {
        self.bus.events()
    }

    /// Overlays that should currently be on the map.
    pub fn render_plan(&self) -> RenderPlan {
        RenderPlan::compose(
            &self.view.center,
            &self.heatmap,
            &self.markers,
            self.view.zoom_level,
            self.config.min_listener_zoom,
        )
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            lifecycle: self.lifecycle,
            center: self.view.center.clone(),
            zoom_level: self.view.zoom_level,
            seed: self.seed(),
            renderer_attached: self.view.has_renderer(),
            plan: self.render_plan(),
        }
    }

    /// Release the renderer and invalidate every outstanding ticket.
    ///
    /// Idempotent; returns `true` on the first call only.
    pub fn teardown(&mut self) -> bool {
        if !self.disposal.dispose() {
            return false;
        }
        self.release_renderer();
        self.transition(Lifecycle::Disposed);
        self.bus.clear_listeners();
        info!("map view torn down");
        true
    }

    fn transition(&mut self, to: Lifecycle) {
        let from = self.lifecycle;
        if from == to {
            return;
        }
        self.lifecycle = to;
        debug!(?from, ?to, "map view lifecycle");
        self.bus.emit(ViewEvent::LifecycleChanged { from, to });
    }

    fn set_center(&mut self, center: Coordinate) {
        let moved = !center.same_position(&self.view.center);
        let relabeled = center.label() != self.view.center.label();
        if !moved && !relabeled {
            return;
        }
        self.view.center = center;
        let center = self.view.center.clone();
        self.bus.emit(ViewEvent::CenterChanged { center });
        if moved {
            self.recompute();
        }
        self.sync_overlays();
    }

    fn recompute(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        let seed = self.seed();
        self.markers = derive_markers(&self.view.center, &self.source, &self.config.markers, seed);
        self.heatmap = derive_heatmap(&self.view.center, &self.config.heatmap, seed);
        debug!(seed, count = self.markers.len(), "derived overlays recomputed");
        self.bus.emit(ViewEvent::MarkersRecomputed {
            seed,
            count: self.markers.len(),
        });
    }

    fn apply_zoom(&mut self, zoom: u8) -> bool {
        let zoom = self.config.clamp_zoom(zoom);
        let previous = self.view.zoom_level;
        if zoom == previous {
            return false;
        }
        self.view.zoom_level = zoom;
        self.bus.emit(ViewEvent::ZoomChanged { zoom });

        let gate = self.config.min_listener_zoom;
        if (previous >= gate) != (zoom >= gate) {
            self.sync_overlays();
        }
        true
    }

    /// Replace every overlay on the map with the current plan.
    fn sync_overlays(&mut self) {
        let plan = self.render_plan();
        let Some(handle) = self.view.map_handle.as_mut() else {
            self.placed.clear();
            return;
        };
        for id in self.placed.drain(..) {
            handle.remove_overlay(id);
        }
        self.placed = plan.overlays.iter().map(|o| handle.add_overlay(o)).collect();
    }
}

impl<H: MapHandle> Drop for MapViewController<H> {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<H: MapHandle> std::fmt::Debug for MapViewController<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapViewController")
            .field("lifecycle", &self.lifecycle)
            .field("center", &self.view.center)
            .field("zoom_level", &self.view.zoom_level)
            .field("seed", &self.seed())
            .field("placed", &self.placed.len())
            .finish()
    }
}

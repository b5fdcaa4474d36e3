use foundation::Coordinate;
use serde::{Deserialize, Serialize};

use crate::jitter::{Jitter, seeded_rng};
use crate::source::{ListenerRecord, MockSource, TrackLine};
use crate::symbology::MarkerIcon;

/// Label shown instead of a stranger's name.
pub const GENERIC_LABEL: &str = "Nearby listener";

/// Jitter radius for strangers, about +-100 m.
pub const DEFAULT_LISTENER_JITTER_DEG: f64 = 0.0009;

const MARKER_STREAM: u64 = 1;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerCategory {
    Friend,
    Stranger,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopupContent {
    pub title: String,
    pub track: TrackLine,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedMarker {
    pub position: Coordinate,
    pub category: MarkerCategory,
    pub icon: MarkerIcon,
    pub label: String,
    pub popup: PopupContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    pub jitter: Jitter,
    pub generic_label: String,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            jitter: Jitter::new(DEFAULT_LISTENER_JITTER_DEG),
            generic_label: GENERIC_LABEL.to_string(),
        }
    }
}

/// Listener markers for one map center, in source order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedMarkerSet {
    pub center: Coordinate,
    pub seed: u64,
    pub markers: Vec<DerivedMarker>,
}

impl DerivedMarkerSet {
    pub fn empty(center: Coordinate) -> Self {
        Self {
            center,
            seed: 0,
            markers: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Markers drawn at `zoom`; none below `min_zoom`.
    pub fn visible_at(&self, zoom: u8, min_zoom: u8) -> &[DerivedMarker] {
        visible_listeners(&self.markers, zoom, min_zoom)
    }
}

pub fn visible_listeners(markers: &[DerivedMarker], zoom: u8, min_zoom: u8) -> &[DerivedMarker] {
    if zoom < min_zoom { &[] } else { markers }
}

/// Build the listener markers around `center`.
///
/// Friends keep their exact source coordinate and real name. Everyone else
/// is moved by `config.jitter` and shown under `config.generic_label`.
pub fn derive_markers(
    center: &Coordinate,
    source: &MockSource,
    config: &MarkerConfig,
    seed: u64,
) -> DerivedMarkerSet {
    let mut rng = seeded_rng(seed, MARKER_STREAM);
    let markers = source
        .records()
        .iter()
        .map(|record| {
            let exact = record.placement.resolve(center);
            if record.friend {
                friend_marker(record, exact)
            } else {
                let position = config.jitter.apply(&exact, &mut rng);
                stranger_marker(record, position, &config.generic_label)
            }
        })
        .collect();

    DerivedMarkerSet {
        center: center.clone(),
        seed,
        markers,
    }
}

fn friend_marker(record: &ListenerRecord, position: Coordinate) -> DerivedMarker {
    DerivedMarker {
        position: position.with_label(record.display_name.clone()),
        category: MarkerCategory::Friend,
        icon: MarkerIcon::album_art_or_bubble(record.album_art_url.as_deref()),
        label: record.display_name.clone(),
        popup: PopupContent {
            title: record.display_name.clone(),
            track: record.track_line(),
        },
    }
}

fn stranger_marker(record: &ListenerRecord, position: Coordinate, label: &str) -> DerivedMarker {
    DerivedMarker {
        position,
        category: MarkerCategory::Stranger,
        icon: MarkerIcon::album_art_or_bubble(record.album_art_url.as_deref()),
        label: label.to_string(),
        popup: PopupContent {
            title: label.to_string(),
            track: record.track_line(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn berkeley() -> Coordinate {
        Coordinate::landmark()
    }

    #[test]
    fn count_is_stable_across_recomputations() {
        let src = MockSource::demo();
        let cfg = MarkerConfig::default();
        for seed in 0..20 {
            assert_eq!(derive_markers(&berkeley(), &src, &cfg, seed).len(), src.len());
        }
    }

    #[test]
    fn same_inputs_same_output() {
        let src = MockSource::demo();
        let cfg = MarkerConfig::default();
        assert_eq!(
            derive_markers(&berkeley(), &src, &cfg, 9),
            derive_markers(&berkeley(), &src, &cfg, 9)
        );
    }

    #[test]
    fn redaction_holds_for_every_entry_and_seed() {
        let src = MockSource::demo();
        let cfg = MarkerConfig::default();
        let center = berkeley();
        for seed in 0..50 {
            let set = derive_markers(&center, &src, &cfg, seed);
            for (record, marker) in src.records().iter().zip(&set.markers) {
                let exact = record.placement.resolve(&center);
                let (d_lat, d_lng) = marker.position.delta_from(&exact);
                if record.friend {
                    assert_eq!(marker.category, MarkerCategory::Friend);
                    assert!(marker.position.same_position(&exact));
                    assert_eq!(marker.label, record.display_name);
                    assert_eq!(marker.popup.title, record.display_name);
                } else {
                    assert_eq!(marker.category, MarkerCategory::Stranger);
                    assert!(d_lat.abs() <= cfg.jitter.max_offset_deg() + 1e-12);
                    assert!(d_lng.abs() <= cfg.jitter.max_offset_deg() + 1e-12);
                    assert!(d_lat != 0.0 || d_lng != 0.0);
                    assert_eq!(marker.label, GENERIC_LABEL);
                    assert_eq!(marker.popup.title, GENERIC_LABEL);
                    assert!(!format!("{marker:?}").contains(&record.display_name));
                }
            }
        }
    }

    #[test]
    fn positions_move_between_seeds() {
        let src = MockSource::demo();
        let cfg = MarkerConfig::default();
        let a = derive_markers(&berkeley(), &src, &cfg, 1);
        let b = derive_markers(&berkeley(), &src, &cfg, 2);
        assert_eq!(a.len(), b.len());
        assert_ne!(a.markers[0].position, b.markers[0].position);
    }

    #[test]
    fn gated_below_min_zoom() {
        let set = derive_markers(&berkeley(), &MockSource::demo(), &MarkerConfig::default(), 3);
        assert!(set.visible_at(13, 14).is_empty());
        assert_eq!(set.visible_at(14, 14).len(), set.len());
        assert_eq!(set.visible_at(18, 14).len(), set.len());
    }

    #[test]
    fn empty_source_gives_empty_set() {
        let set = derive_markers(
            &berkeley(),
            &MockSource::default(),
            &MarkerConfig::default(),
            0,
        );
        assert!(set.is_empty());
        assert_eq!(DerivedMarkerSet::empty(berkeley()).len(), 0);
    }
}

use std::collections::HashSet;

use foundation::Coordinate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("mock source is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate listener id {0:?}")]
    DuplicateId(String),
}

/// Where a mock listener sits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Placement {
    Absolute { coordinate: Coordinate },
    /// Degree offset from whatever the map is centered on.
    Relative { d_lat: f64, d_lng: f64 },
}

impl Placement {
    pub fn resolve(&self, center: &Coordinate) -> Coordinate {
        match self {
            Placement::Absolute { coordinate } => coordinate.clone(),
            Placement::Relative { d_lat, d_lng } => center.offset(*d_lat, *d_lng),
        }
    }
}

/// What a listener shows under their name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "title", rename_all = "snake_case")]
pub enum TrackLine {
    NowPlaying(String),
    Favorite(String),
}

impl std::fmt::Display for TrackLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackLine::NowPlaying(t) => write!(f, "Now: {t}"),
            TrackLine::Favorite(t) => write!(f, "Fav: {t}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListenerRecord {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub now_playing: Option<String>,
    pub favorite: String,
    #[serde(default)]
    pub album_art_url: Option<String>,
    #[serde(default)]
    pub friend: bool,
    pub placement: Placement,
}

impl ListenerRecord {
    /// The current track when one is playing, otherwise the favorite.
    pub fn track_line(&self) -> TrackLine {
        match self.now_playing.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => TrackLine::NowPlaying(t.to_string()),
            _ => TrackLine::Favorite(self.favorite.clone()),
        }
    }
}

/// Read-only collection of mock listeners, injected as configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MockSource {
    records: Vec<ListenerRecord>,
}

impl MockSource {
    pub fn new(records: Vec<ListenerRecord>) -> Result<Self, SourceError> {
        let mut seen = HashSet::with_capacity(records.len());
        for r in &records {
            if !seen.insert(r.id.as_str()) {
                return Err(SourceError::DuplicateId(r.id.clone()));
            }
        }
        Ok(Self { records })
    }

    /// A JSON array of listener records.
    pub fn from_json(raw: &str) -> Result<Self, SourceError> {
        let records: Vec<ListenerRecord> = serde_json::from_str(raw)?;
        Self::new(records)
    }

    pub fn records(&self) -> &[ListenerRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn friends(&self) -> impl Iterator<Item = &ListenerRecord> {
        self.records.iter().filter(|r| r.friend)
    }

    /// The built-in demo crowd.
    pub fn demo() -> Self {
        fn rec(
            id: &str,
            name: &str,
            now_playing: Option<&str>,
            favorite: &str,
            friend: bool,
            d_lat: f64,
            d_lng: f64,
        ) -> ListenerRecord {
            ListenerRecord {
                id: id.to_string(),
                display_name: name.to_string(),
                now_playing: now_playing.map(str::to_string),
                favorite: favorite.to_string(),
                album_art_url: Some(format!("https://i.scdn.co/image/demo-{id}")),
                friend,
                placement: Placement::Relative { d_lat, d_lng },
            }
        }

        Self {
            records: vec![
                rec("u1", "Maya", Some("FE!N - Travis Scott"), "Snooze - SZA", false, 0.0004, -0.0003),
                rec("u2", "Liam", None, "Nights - Frank Ocean", false, -0.0005, 0.0002),
                rec("u3", "Sofia", Some("On My Mama - Victoria Monet"), "Kill Bill - SZA", false, 0.0002, 0.0006),
                rec("u4", "Jay", None, "See You Again - Tyler, The Creator", false, -0.0003, -0.0006),
                rec("f1", "Ava", Some("Pink + White - Frank Ocean"), "Good Days - SZA", true, 0.0007, 0.0004),
                rec("f2", "Noah", None, "Redbone - Childish Gambino", true, -0.0006, 0.0008),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn track_line_prefers_now_playing() {
        let demo = MockSource::demo();
        let maya = &demo.records()[0];
        assert_eq!(maya.track_line().to_string(), "Now: FE!N - Travis Scott");
        let liam = &demo.records()[1];
        assert_eq!(liam.track_line(), TrackLine::Favorite("Nights - Frank Ocean".into()));
    }

    #[test]
    fn blank_now_playing_falls_back_to_favorite() {
        let mut r = MockSource::demo().records()[0].clone();
        r.now_playing = Some("  ".into());
        assert_eq!(r.track_line(), TrackLine::Favorite("Snooze - SZA".into()));
    }

    #[test]
    fn demo_has_friends_and_strangers() {
        let demo = MockSource::demo();
        assert_eq!(demo.len(), 6);
        assert_eq!(demo.friends().count(), 2);
    }

    #[test]
    fn parses_json_records() {
        let raw = r#"[
            {"id": "a", "display_name": "Ana", "favorite": "Song",
             "placement": {"kind": "relative", "d_lat": 0.001, "d_lng": 0.0}},
            {"id": "b", "display_name": "Ben", "favorite": "Tune", "friend": true,
             "placement": {"kind": "absolute", "coordinate": {"latitude": 1.0, "longitude": 2.0}}}
        ]"#;
        let src = MockSource::from_json(raw).unwrap();
        assert_eq!(src.len(), 2);
        assert!(!src.records()[0].friend);
        assert_eq!(src.records()[0].now_playing, None);

        let center = Coordinate::new(0.0, 0.0).unwrap();
        assert_eq!(src.records()[1].placement.resolve(&center).lat_lng(), [1.0, 2.0]);
    }

    #[test]
    fn rejects_duplicate_ids_and_bad_json() {
        let dup = r#"[
            {"id": "a", "display_name": "A", "favorite": "x", "placement": {"kind": "relative", "d_lat": 0, "d_lng": 0}},
            {"id": "a", "display_name": "B", "favorite": "y", "placement": {"kind": "relative", "d_lat": 0, "d_lng": 0}}
        ]"#;
        assert!(matches!(MockSource::from_json(dup), Err(SourceError::DuplicateId(id)) if id == "a"));
        assert!(matches!(MockSource::from_json("{"), Err(SourceError::Parse(_))));
    }
}

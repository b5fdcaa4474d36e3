use serde::{Deserialize, Serialize};

/// How a marker is drawn. The renderer owns the actual assets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarkerIcon {
    /// Blue dot with a white core for the user's own position.
    UserDot,
    /// Speech bubble with the listener's album cover.
    AlbumArt { url: String },
    /// Text-only bubble.
    Bubble,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconStyle {
    pub size_px: [u32; 2],
    pub anchor_px: [u32; 2],
    /// Fill color as RGB.
    pub fill: [u8; 3],
}

impl MarkerIcon {
    pub fn album_art_or_bubble(url: Option<&str>) -> Self {
        match url {
            Some(url) if !url.is_empty() => MarkerIcon::AlbumArt {
                url: url.to_string(),
            },
            _ => MarkerIcon::Bubble,
        }
    }

    pub fn style(&self) -> IconStyle {
        match self {
            MarkerIcon::UserDot => IconStyle {
                size_px: [24, 24],
                anchor_px: [12, 12],
                fill: [0x4A, 0x90, 0xE2],
            },
            MarkerIcon::AlbumArt { .. } | MarkerIcon::Bubble => IconStyle {
                size_px: [80, 80],
                anchor_px: [40, 40],
                fill: [0x1D, 0xB9, 0x54],
            },
        }
    }
}

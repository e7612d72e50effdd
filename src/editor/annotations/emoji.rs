use serde::{Deserialize, Serialize};

use super::{clamp_annotation_size, BoundingBox, Point};

pub const EMOJI_PALETTE: [&str; 12] = [
    "😀", "😂", "😍", "😎", "🤩", "🥳", "🔥", "✨", "❤️", "👍", "📸", "🌈",
];

const DEFAULT_EMOJI_SIZE: f32 = 48.0;

/// Sticker overlay. `position` is the top-left placement point on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmojiAnnotation {
    pub id: u64,
    pub glyph: String,
    pub position: Point,
    pub size: f32,
}

impl EmojiAnnotation {
    pub fn new(id: u64, glyph: impl Into<String>, position: Point) -> Self {
        Self {
            id,
            glyph: glyph.into(),
            position,
            size: DEFAULT_EMOJI_SIZE,
        }
    }

    pub fn apply_patch(&mut self, patch: &EmojiPatch) {
        if let Some(glyph) = &patch.glyph {
            self.glyph.clone_from(glyph);
        }
        if let Some(size) = patch.size {
            self.size = clamp_annotation_size(size, self.size);
        }
    }

    pub fn hit_box(&self) -> BoundingBox {
        BoundingBox::new(self.position.x, self.position.y, self.size, self.size)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmojiPatch {
    pub glyph: Option<String>,
    pub size: Option<f32>,
}

impl EmojiPatch {
    pub fn size(size: f32) -> Self {
        Self {
            size: Some(size),
            ..Self::default()
        }
    }
}

use serde::{Deserialize, Serialize};

use super::{clamp_annotation_size, BoundingBox, CanvasSize, Color, Point};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextFontFamily {
    Sans,
    Serif,
    Mono,
    Display,
    Handwriting,
}

impl TextFontFamily {
    pub const ALL: [TextFontFamily; 5] = [
        Self::Sans,
        Self::Serif,
        Self::Mono,
        Self::Display,
        Self::Handwriting,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Sans => "Sans",
            Self::Serif => "Serif",
            Self::Mono => "Mono",
            Self::Display => "Display",
            Self::Handwriting => "Handwriting",
        }
    }

    /// Average advance width relative to the font size, used for hit boxes.
    const fn advance_ratio(self) -> f32 {
        match self {
            Self::Mono => 0.62,
            Self::Display => 0.66,
            Self::Sans | Self::Serif | Self::Handwriting => 0.56,
        }
    }
}

pub const TEXT_COLOR_PALETTE: [Color; 8] = [
    Color::new(255, 255, 255),
    Color::new(0, 0, 0),
    Color::new(239, 68, 68),
    Color::new(249, 115, 22),
    Color::new(250, 204, 21),
    Color::new(34, 197, 94),
    Color::new(59, 130, 246),
    Color::new(168, 85, 247),
];

pub const DEFAULT_TEXT_CONTENT: &str = "Your text";
const DEFAULT_TEXT_SIZE: f32 = 32.0;
const TEXT_LINE_HEIGHT_RATIO: f32 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    pub color: Color,
    pub font_family: TextFontFamily,
    pub font_size: f32,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            color: TEXT_COLOR_PALETTE[0],
            font_family: TextFontFamily::Sans,
            font_size: DEFAULT_TEXT_SIZE,
        }
    }
}

/// Caption overlay. `position` is an offset from the canvas center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextAnnotation {
    pub id: u64,
    pub content: String,
    pub position: Point,
    pub style: TextStyle,
}

impl TextAnnotation {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            content: DEFAULT_TEXT_CONTENT.to_string(),
            position: Point::ORIGIN,
            style: TextStyle::default(),
        }
    }

    pub fn with_content(id: u64, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::new(id)
        }
    }

    pub fn apply_patch(&mut self, patch: &TextPatch) {
        if let Some(content) = &patch.content {
            self.content.clone_from(content);
        }
        if let Some(color) = patch.color {
            self.style.color = color;
        }
        if let Some(family) = patch.font_family {
            self.style.font_family = family;
        }
        if let Some(size) = patch.font_size {
            self.style.font_size = clamp_annotation_size(size, self.style.font_size);
        }
    }

    /// Where the text's center sits in top-left canvas coordinates.
    pub fn canvas_anchor(&self, canvas: CanvasSize) -> Point {
        canvas
            .center()
            .offset(self.position.x, self.position.y)
    }

    /// Approximate rendered box, wide enough to grab even when the text is empty.
    pub fn hit_box(&self, canvas: CanvasSize) -> BoundingBox {
        let size = self.style.font_size;
        let longest_line = self
            .content
            .split('\n')
            .map(|line| line.chars().count())
            .max()
            .unwrap_or(0)
            .max(1);
        let line_count = self.content.split('\n').count().max(1);
        let width = longest_line as f32 * size * self.style.font_family.advance_ratio();
        let height = line_count as f32 * size * TEXT_LINE_HEIGHT_RATIO;
        BoundingBox::centered_at(self.canvas_anchor(canvas), width, height)
    }
}

/// Partial update for a text annotation; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextPatch {
    pub content: Option<String>,
    pub color: Option<Color>,
    pub font_family: Option<TextFontFamily>,
    pub font_size: Option<f32>,
}

impl TextPatch {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_none()
            && self.color.is_none()
            && self.font_family.is_none()
            && self.font_size.is_none()
    }
}

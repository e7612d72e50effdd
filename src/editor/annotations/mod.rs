mod emoji;
mod placement;
mod text;

pub use crate::geometry::{BoundingBox, CanvasSize, Color, Point};
pub use emoji::{EmojiAnnotation, EmojiPatch, EMOJI_PALETTE};
pub use placement::clamp_position;
pub use text::{
    TextAnnotation, TextFontFamily, TextPatch, TextStyle, DEFAULT_TEXT_CONTENT,
    TEXT_COLOR_PALETTE,
};

pub const ANNOTATION_SIZE_MIN: f32 = 12.0;
pub const ANNOTATION_SIZE_MAX: f32 = 128.0;

/// Clamps a font or emoji size; NaN keeps `fallback`.
pub(crate) fn clamp_annotation_size(size: f32, fallback: f32) -> f32 {
    if size.is_nan() {
        return fallback;
    }
    size.clamp(ANNOTATION_SIZE_MIN, ANNOTATION_SIZE_MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnnotationKind {
    Text,
    Emoji,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    Text(TextAnnotation),
    Emoji(EmojiAnnotation),
}

impl Annotation {
    pub const fn id(&self) -> u64 {
        match self {
            Self::Text(text) => text.id,
            Self::Emoji(emoji) => emoji.id,
        }
    }

    pub const fn kind(&self) -> AnnotationKind {
        match self {
            Self::Text(_) => AnnotationKind::Text,
            Self::Emoji(_) => AnnotationKind::Emoji,
        }
    }

    pub const fn position(&self) -> Point {
        match self {
            Self::Text(text) => text.position,
            Self::Emoji(emoji) => emoji.position,
        }
    }

    pub fn hit_box(&self, canvas: CanvasSize) -> BoundingBox {
        match self {
            Self::Text(text) => text.hit_box(canvas),
            Self::Emoji(emoji) => emoji.hit_box(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annotation_exposes_shared_fields_for_both_kinds() {
        let text = Annotation::Text(TextAnnotation::new(1));
        let emoji = Annotation::Emoji(EmojiAnnotation::new(2, "🔥", Point::new(4.0, 5.0)));

        assert_eq!(text.id(), 1);
        assert_eq!(text.kind(), AnnotationKind::Text);
        assert_eq!(text.position(), Point::ORIGIN);

        assert_eq!(emoji.id(), 2);
        assert_eq!(emoji.kind(), AnnotationKind::Emoji);
        assert_eq!(emoji.position(), Point::new(4.0, 5.0));
    }

    #[test]
    fn size_clamp_handles_bounds_and_nan() {
        assert_eq!(clamp_annotation_size(0.0, 40.0), ANNOTATION_SIZE_MIN);
        assert_eq!(clamp_annotation_size(999.0, 40.0), ANNOTATION_SIZE_MAX);
        assert_eq!(clamp_annotation_size(64.0, 40.0), 64.0);
        assert_eq!(clamp_annotation_size(f32::NAN, 40.0), 40.0);
    }
}

use serde::{Deserialize, Serialize};

use super::annotations::{
    clamp_position, Annotation, AnnotationKind, CanvasSize, EmojiAnnotation, EmojiPatch, Point,
    TextAnnotation, TextPatch,
};
use super::filters::FilterSet;

/// Everything one undo step restores. Stored by value in the history log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorState {
    pub filters: FilterSet,
    pub texts: Vec<TextAnnotation>,
    pub emojis: Vec<EmojiAnnotation>,
}

impl EditorState {
    pub fn is_blank(&self) -> bool {
        self.filters.is_identity() && self.texts.is_empty() && self.emojis.is_empty()
    }

    pub fn annotation_count(&self) -> usize {
        self.texts.len() + self.emojis.len()
    }

    pub fn text(&self, id: u64) -> Option<&TextAnnotation> {
        self.texts.iter().find(|text| text.id == id)
    }

    pub fn emoji(&self, id: u64) -> Option<&EmojiAnnotation> {
        self.emojis.iter().find(|emoji| emoji.id == id)
    }

    fn text_mut(&mut self, id: u64) -> Option<&mut TextAnnotation> {
        self.texts.iter_mut().find(|text| text.id == id)
    }

    fn emoji_mut(&mut self, id: u64) -> Option<&mut EmojiAnnotation> {
        self.emojis.iter_mut().find(|emoji| emoji.id == id)
    }

    pub fn kind_of(&self, id: u64) -> Option<AnnotationKind> {
        if self.text(id).is_some() {
            Some(AnnotationKind::Text)
        } else if self.emoji(id).is_some() {
            Some(AnnotationKind::Emoji)
        } else {
            None
        }
    }

    pub fn position_of(&self, id: u64) -> Option<Point> {
        self.text(id)
            .map(|text| text.position)
            .or_else(|| self.emoji(id).map(|emoji| emoji.position))
    }

    pub(crate) fn push_text(&mut self, text: TextAnnotation) {
        self.texts.push(text);
    }

    pub(crate) fn push_emoji(&mut self, emoji: EmojiAnnotation) {
        self.emojis.push(emoji);
    }

    pub fn update_text(&mut self, id: u64, patch: &TextPatch) -> bool {
        match self.text_mut(id) {
            Some(text) => {
                text.apply_patch(patch);
                true
            }
            None => false,
        }
    }

    pub fn update_emoji(&mut self, id: u64, patch: &EmojiPatch) -> bool {
        match self.emoji_mut(id) {
            Some(emoji) => {
                emoji.apply_patch(patch);
                true
            }
            None => false,
        }
    }

    /// Moves an annotation, clamping its anchor to `canvas`. Returns the applied position.
    pub fn move_to(&mut self, id: u64, position: Point, canvas: CanvasSize) -> Option<Point> {
        let kind = self.kind_of(id)?;
        let bounded = clamp_position(kind, position, canvas)?;
        match kind {
            AnnotationKind::Text => self.text_mut(id)?.position = bounded,
            AnnotationKind::Emoji => self.emoji_mut(id)?.position = bounded,
        }
        Some(bounded)
    }

    pub fn remove(&mut self, id: u64) -> Option<Annotation> {
        if let Some(index) = self.texts.iter().position(|text| text.id == id) {
            return Some(Annotation::Text(self.texts.remove(index)));
        }
        let index = self.emojis.iter().position(|emoji| emoji.id == id)?;
        Some(Annotation::Emoji(self.emojis.remove(index)))
    }

    /// Topmost annotation under `point`: texts paint above emojis, later above earlier.
    pub fn hit_test(&self, point: Point, canvas: CanvasSize) -> Option<(u64, AnnotationKind)> {
        let text_hit = self
            .texts
            .iter()
            .rev()
            .find(|text| text.hit_box(canvas).contains(point))
            .map(|text| (text.id, AnnotationKind::Text));
        text_hit.or_else(|| {
            self.emojis
                .iter()
                .rev()
                .find(|emoji| emoji.hit_box().contains(point))
                .map(|emoji| (emoji.id, AnnotationKind::Emoji))
        })
    }

    pub fn max_annotation_id(&self) -> Option<u64> {
        self.texts
            .iter()
            .map(|text| text.id)
            .chain(self.emojis.iter().map(|emoji| emoji.id))
            .max()
    }
}

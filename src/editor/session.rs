use std::num::NonZeroUsize;
use std::time::{SystemTime, UNIX_EPOCH};

use image::RgbaImage;
use thiserror::Error;

use super::annotations::{
    clamp_position, Annotation, AnnotationKind, CanvasSize, EmojiAnnotation, EmojiPatch, Point,
    TextAnnotation, TextPatch,
};
use super::crop::{crop_image, CropError, CropRect};
use super::filters::{self, FilterField, FilterSet};
use super::history::{HistoryAction, HistoryError, HistoryLog};
use super::state::EditorState;
use crate::render::{composite, CompositeError, CompositeInput, GlyphRasterizer, RasterArtifact};
use crate::state::{SessionEvent, SessionPhase, StateError, StateMachine};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error("crop failed: {0}")]
    Crop(#[from] CropError),
    #[error("compositing failed: {0}")]
    Composite(#[from] CompositeError),
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error("image has no pixels")]
    EmptyImage,
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;

#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Stable identifier; generated from the clock when absent.
    pub id: Option<String>,
    pub history_limit: Option<NonZeroUsize>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Gesture {
    Drag { id: u64, origin: Point },
    Adjust,
}

/// One photo edit: the working image, the uncommitted working state and its
/// committed history.
///
/// Continuous gestures (drag, slider) only touch the working state; `commit`,
/// the `end_*` gesture calls and discrete actions (add, remove) push history.
#[derive(Debug)]
pub struct EditorSession {
    id: String,
    lifecycle: StateMachine,
    image: RgbaImage,
    canvas: CanvasSize,
    working: EditorState,
    history: HistoryLog<EditorState>,
    selection: Option<u64>,
    next_id: u64,
    gesture: Option<Gesture>,
}

fn generate_session_id() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("edit-{}", now.as_nanos())
}

impl EditorSession {
    pub fn start_session(image: RgbaImage, canvas: CanvasSize) -> SessionResult<Self> {
        Self::start_session_with(image, canvas, SessionOptions::default())
    }

    pub fn start_session_with(
        image: RgbaImage,
        canvas: CanvasSize,
        options: SessionOptions,
    ) -> SessionResult<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(SessionError::EmptyImage);
        }
        let mut lifecycle = StateMachine::new();
        lifecycle.transition(SessionEvent::Start)?;

        let mut history = HistoryLog::with_max_depth(options.history_limit);
        history.start(EditorState::default());

        let id = options.id.unwrap_or_else(generate_session_id);
        tracing::info!(
            session = %id,
            width = image.width(),
            height = image.height(),
            "edit session started"
        );
        Ok(Self {
            id,
            lifecycle,
            image,
            canvas,
            working: EditorState::default(),
            history,
            selection: None,
            next_id: 1,
            gesture: None,
        })
    }

    /// Decodes any format the `image` crate understands and starts a session on it.
    pub fn from_encoded(
        bytes: &[u8],
        canvas: CanvasSize,
        options: SessionOptions,
    ) -> SessionResult<Self> {
        let image = image::load_from_memory(bytes)?.to_rgba8();
        Self::start_session_with(image, canvas, options)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn phase(&self) -> SessionPhase {
        self.lifecycle.state()
    }

    pub fn lifecycle(&self) -> &StateMachine {
        &self.lifecycle
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn working_state(&self) -> &EditorState {
        &self.working
    }

    pub fn history(&self) -> &HistoryLog<EditorState> {
        &self.history
    }

    pub fn canvas_size(&self) -> CanvasSize {
        self.canvas
    }

    /// Records the displayed preview size. Existing positions are not remapped.
    pub fn set_canvas_size(&mut self, canvas: CanvasSize) {
        tracing::debug!(width = canvas.width, height = canvas.height, "canvas resized");
        self.canvas = canvas;
    }

    pub fn selection(&self) -> Option<u64> {
        self.selection
    }

    /// Selects an existing annotation or clears the selection. Unknown ids are ignored.
    pub fn select(&mut self, id: Option<u64>) -> bool {
        match id {
            Some(id) if self.working.kind_of(id).is_none() => {
                tracing::debug!(id, "select ignored; annotation not found");
                false
            }
            other => {
                self.selection = other;
                true
            }
        }
    }

    pub fn hit_test(&self, point: Point) -> Option<(u64, AnnotationKind)> {
        self.working.hit_test(point, self.canvas)
    }

    fn ensure_editing(&self) -> SessionResult<()> {
        self.lifecycle.ensure(SessionEvent::Edit)?;
        Ok(())
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    pub fn apply_filter_change(&mut self, field: FilterField, value: f32) -> SessionResult<f32> {
        self.ensure_editing()?;
        self.working.filters = filters::set_filter(self.working.filters, field, value);
        Ok(self.working.filters.get(field))
    }

    pub fn reset_filters(&mut self) -> SessionResult<&FilterSet> {
        self.ensure_editing()?;
        self.working.filters = filters::reset_filters();
        Ok(&self.working.filters)
    }

    pub fn add_text(&mut self) -> SessionResult<TextAnnotation> {
        self.ensure_editing()?;
        let text = TextAnnotation::new(self.allocate_id());
        self.working.push_text(text.clone());
        self.selection = Some(text.id);
        tracing::debug!(id = text.id, "text annotation added");
        self.commit()?;
        Ok(text)
    }

    pub fn add_emoji(&mut self, glyph: &str) -> SessionResult<EmojiAnnotation> {
        self.ensure_editing()?;
        let mut emoji = EmojiAnnotation::new(self.allocate_id(), glyph, Point::ORIGIN);
        emoji.position = self.default_emoji_position(emoji.size);
        self.working.push_emoji(emoji.clone());
        self.selection = Some(emoji.id);
        tracing::debug!(id = emoji.id, glyph, "emoji annotation added");
        self.commit()?;
        Ok(emoji)
    }

    /// Top-left corner that centers a new sticker on the canvas.
    fn default_emoji_position(&self, size: f32) -> Point {
        if !self.canvas.is_usable() {
            return Point::ORIGIN;
        }
        let center = self.canvas.center();
        let corner = center.offset(-size / 2.0, -size / 2.0);
        clamp_position(AnnotationKind::Emoji, corner, self.canvas).unwrap_or(Point::ORIGIN)
    }

    pub fn update_text(&mut self, id: u64, patch: &TextPatch) -> SessionResult<bool> {
        self.ensure_editing()?;
        let updated = self.working.update_text(id, patch);
        if !updated {
            tracing::debug!(id, "update_text ignored; annotation not found");
        }
        Ok(updated)
    }

    pub fn update_emoji(&mut self, id: u64, patch: &EmojiPatch) -> SessionResult<bool> {
        self.ensure_editing()?;
        let updated = self.working.update_emoji(id, patch);
        if !updated {
            tracing::debug!(id, "update_emoji ignored; annotation not found");
        }
        Ok(updated)
    }

    /// Moves an annotation inside the canvas. Returns the clamped position applied.
    pub fn move_annotation(&mut self, id: u64, position: Point) -> SessionResult<Option<Point>> {
        self.ensure_editing()?;
        let moved = self.working.move_to(id, position, self.canvas);
        if moved.is_none() {
            tracing::debug!(id, x = position.x, y = position.y, "move ignored");
        }
        Ok(moved)
    }

    pub fn remove(&mut self, id: u64) -> SessionResult<Option<Annotation>> {
        self.ensure_editing()?;
        let Some(removed) = self.working.remove(id) else {
            tracing::debug!(id, "remove ignored; annotation not found");
            return Ok(None);
        };
        if self.selection == Some(id) {
            self.selection = None;
        }
        if matches!(self.gesture, Some(Gesture::Drag { id: dragged, .. }) if dragged == id) {
            self.gesture = None;
        }
        self.commit()?;
        Ok(Some(removed))
    }

    /// Pointer-down on an annotation: selects it and starts an uncommitted move.
    pub fn begin_drag(&mut self, id: u64) -> SessionResult<bool> {
        self.ensure_editing()?;
        let Some(origin) = self.working.position_of(id) else {
            tracing::debug!(id, "drag ignored; annotation not found");
            return Ok(false);
        };
        self.selection = Some(id);
        self.gesture = Some(Gesture::Drag { id, origin });
        Ok(true)
    }

    pub fn drag_to(&mut self, position: Point) -> SessionResult<Option<Point>> {
        self.ensure_editing()?;
        let Some(Gesture::Drag { id, .. }) = self.gesture else {
            return Ok(None);
        };
        Ok(self.working.move_to(id, position, self.canvas))
    }

    /// Pointer-up: commits the drag once. Returns false when no drag was active.
    pub fn end_drag(&mut self) -> SessionResult<bool> {
        self.ensure_editing()?;
        let Some(Gesture::Drag { id, origin }) = self.gesture else {
            return Ok(false);
        };
        self.gesture = None;
        tracing::debug!(id, from_x = origin.x, from_y = origin.y, "drag settled");
        self.commit()?;
        Ok(true)
    }

    pub fn begin_adjust(&mut self) -> SessionResult<()> {
        self.ensure_editing()?;
        self.gesture = Some(Gesture::Adjust);
        Ok(())
    }

    pub fn adjust_filter(&mut self, field: FilterField, value: f32) -> SessionResult<f32> {
        if self.gesture != Some(Gesture::Adjust) {
            tracing::debug!(field = field.label(), "filter adjusted outside a slider gesture");
        }
        self.apply_filter_change(field, value)
    }

    /// Slider release: commits the adjustment once.
    pub fn end_adjust(&mut self) -> SessionResult<bool> {
        self.ensure_editing()?;
        if self.gesture != Some(Gesture::Adjust) {
            return Ok(false);
        }
        self.gesture = None;
        self.commit()?;
        Ok(true)
    }

    /// Pushes the working state onto the history. Returns the new cursor.
    pub fn commit(&mut self) -> SessionResult<usize> {
        self.ensure_editing()?;
        let cursor = self.history.commit(self.working.clone())?;
        tracing::debug!(cursor, entries = self.history.len(), "working state committed");
        Ok(cursor)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo(&mut self) -> SessionResult<bool> {
        self.step_history(HistoryAction::Undo)
    }

    pub fn redo(&mut self) -> SessionResult<bool> {
        self.step_history(HistoryAction::Redo)
    }

    fn step_history(&mut self, action: HistoryAction) -> SessionResult<bool> {
        self.ensure_editing()?;
        let Some(state) = self.history.step(action).cloned() else {
            tracing::debug!("{}", action.empty_message());
            return Ok(false);
        };
        self.working = state;
        self.gesture = None;
        if let Some(id) = self.selection {
            if self.working.kind_of(id).is_none() {
                self.selection = None;
            }
        }
        tracing::debug!(cursor = self.history.cursor(), "{}", action.applied_message());
        Ok(true)
    }

    /// Replaces the working image with the selected region and restarts editing.
    ///
    /// On failure nothing changes. On success annotations and filters are dropped
    /// and the history is reseeded with a single blank entry.
    pub fn apply_crop(&mut self, rect: CropRect) -> SessionResult<&RgbaImage> {
        self.lifecycle.ensure(SessionEvent::Crop)?;
        let (cropped, region) = crop_image(&self.image, rect, self.canvas).map_err(|err| {
            tracing::warn!(error = %err, "crop rejected; session unchanged");
            err
        })?;

        self.commit()?;
        self.lifecycle.transition(SessionEvent::Crop)?;
        self.image = cropped;
        self.working = EditorState::default();
        self.history.reset_to(EditorState::default());
        self.selection = None;
        self.gesture = None;
        if self.canvas.is_usable() {
            let aspect = region.height as f32 / region.width as f32;
            self.canvas = CanvasSize::new(self.canvas.width, self.canvas.width * aspect);
        }
        tracing::info!(
            session = %self.id,
            x = region.x,
            y = region.y,
            width = region.width,
            height = region.height,
            "crop applied; edit history reset"
        );
        Ok(&self.image)
    }

    /// Flattens the working state onto the image. One-shot: a successful call
    /// ends the session, a failed one leaves it editable.
    pub fn finalize(&mut self, glyphs: &dyn GlyphRasterizer) -> SessionResult<RasterArtifact> {
        self.lifecycle.ensure(SessionEvent::Finalize)?;
        let artifact = composite(
            CompositeInput {
                base: &self.image,
                filters: &self.working.filters,
                texts: &self.working.texts,
                emojis: &self.working.emojis,
                preview: self.canvas,
            },
            glyphs,
        )?;
        self.lifecycle.transition(SessionEvent::Finalize)?;
        self.gesture = None;
        self.selection = None;
        tracing::info!(
            session = %self.id,
            width = artifact.width(),
            height = artifact.height(),
            "edit session finalized"
        );
        Ok(artifact)
    }

    pub fn discard(&mut self) -> SessionResult<()> {
        self.lifecycle.transition(SessionEvent::Discard)?;
        self.gesture = None;
        self.selection = None;
        self.history.clear();
        tracing::info!(session = %self.id, "edit session discarded");
        Ok(())
    }
}

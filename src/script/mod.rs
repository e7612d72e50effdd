//! Recorded edit actions that can be replayed against a session.
//!
//! Annotation ids in a script are the ids the session hands out, which start at
//! 1 and increase by one per added annotation.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::editor::{CropRect, EditorSession, EmojiPatch, FilterField, SessionError, TextPatch};
use crate::geometry::{CanvasSize, Point};

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to read edit script {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid edit script: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("action #{index} ({action}) failed: {source}")]
    Action {
        index: usize,
        action: &'static str,
        #[source]
        source: SessionError,
    },
}

pub type ScriptResult<T> = std::result::Result<T, ScriptError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EditAction {
    SetFilter {
        field: FilterField,
        value: f32,
    },
    /// A slider gesture: every value is applied, then one commit.
    Adjust {
        field: FilterField,
        values: Vec<f32>,
    },
    ResetFilters,
    Commit,
    AddText {
        #[serde(default)]
        patch: Option<TextPatch>,
    },
    AddEmoji {
        glyph: String,
    },
    UpdateText {
        id: u64,
        patch: TextPatch,
    },
    UpdateEmoji {
        id: u64,
        patch: EmojiPatch,
    },
    Move {
        id: u64,
        x: f32,
        y: f32,
    },
    /// A pointer drag through `path`, committed once on release.
    Drag {
        id: u64,
        path: Vec<Point>,
    },
    Remove {
        id: u64,
    },
    Undo,
    Redo,
    Crop {
        rect: CropRect,
    },
}

impl EditAction {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SetFilter { .. } => "set_filter",
            Self::Adjust { .. } => "adjust",
            Self::ResetFilters => "reset_filters",
            Self::Commit => "commit",
            Self::AddText { .. } => "add_text",
            Self::AddEmoji { .. } => "add_emoji",
            Self::UpdateText { .. } => "update_text",
            Self::UpdateEmoji { .. } => "update_emoji",
            Self::Move { .. } => "move",
            Self::Drag { .. } => "drag",
            Self::Remove { .. } => "remove",
            Self::Undo => "undo",
            Self::Redo => "redo",
            Self::Crop { .. } => "crop",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditScript {
    /// Displayed preview size the positions were recorded against.
    #[serde(default)]
    pub canvas: Option<CanvasSize>,
    pub actions: Vec<EditAction>,
}

impl EditScript {
    pub fn from_json(contents: &str) -> ScriptResult<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn load(path: &Path) -> ScriptResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    pub applied: usize,
    /// Actions that were accepted but changed nothing (unknown ids, history at a boundary).
    pub ignored: usize,
    pub created_ids: Vec<u64>,
}

impl ReplayReport {
    fn record(&mut self, changed: bool) {
        if changed {
            self.applied += 1;
        } else {
            self.ignored += 1;
        }
    }
}

fn apply_action(
    session: &mut EditorSession,
    action: &EditAction,
    report: &mut ReplayReport,
) -> Result<(), SessionError> {
    match action {
        EditAction::SetFilter { field, value } => {
            session.apply_filter_change(*field, *value)?;
            report.record(true);
        }
        EditAction::Adjust { field, values } => {
            session.begin_adjust()?;
            for value in values {
                session.adjust_filter(*field, *value)?;
            }
            report.record(session.end_adjust()?);
        }
        EditAction::ResetFilters => {
            session.reset_filters()?;
            report.record(true);
        }
        EditAction::Commit => {
            session.commit()?;
            report.record(true);
        }
        EditAction::AddText { patch } => {
            let text = session.add_text()?;
            if let Some(patch) = patch.as_ref().filter(|patch| !patch.is_empty()) {
                session.update_text(text.id, patch)?;
                session.commit()?;
            }
            report.created_ids.push(text.id);
            report.record(true);
        }
        EditAction::AddEmoji { glyph } => {
            let emoji = session.add_emoji(glyph)?;
            report.created_ids.push(emoji.id);
            report.record(true);
        }
        EditAction::UpdateText { id, patch } => {
            report.record(session.update_text(*id, patch)?);
        }
        EditAction::UpdateEmoji { id, patch } => {
            report.record(session.update_emoji(*id, patch)?);
        }
        EditAction::Move { id, x, y } => {
            let moved = session.move_annotation(*id, Point::new(*x, *y))?;
            report.record(moved.is_some());
        }
        EditAction::Drag { id, path } => {
            if !session.begin_drag(*id)? {
                report.record(false);
                return Ok(());
            }
            for point in path {
                session.drag_to(*point)?;
            }
            report.record(session.end_drag()?);
        }
        EditAction::Remove { id } => {
            report.record(session.remove(*id)?.is_some());
        }
        EditAction::Undo => report.record(session.undo()?),
        EditAction::Redo => report.record(session.redo()?),
        EditAction::Crop { rect } => {
            session.apply_crop(*rect)?;
            report.record(true);
        }
    }
    Ok(())
}

/// Applies every action in order, stopping at the first one the session rejects.
pub fn replay(session: &mut EditorSession, script: &EditScript) -> ScriptResult<ReplayReport> {
    if let Some(canvas) = script.canvas {
        session.set_canvas_size(canvas);
    }
    let mut report = ReplayReport::default();
    for (index, action) in script.actions.iter().enumerate() {
        tracing::debug!(index, action = action.name(), "replaying edit action");
        apply_action(session, action, &mut report).map_err(|source| {
            tracing::warn!(index, action = action.name(), error = %source, "edit script aborted");
            ScriptError::Action {
                index,
                action: action.name(),
                source,
            }
        })?;
    }
    tracing::info!(
        applied = report.applied,
        ignored = report.ignored,
        "edit script replayed"
    );
    Ok(report)
}

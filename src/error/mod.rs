use crate::editor::SessionError;
use crate::render::GlyphError;
use crate::script::ScriptError;
use crate::state::StateError;
use crate::storage::StorageError;
use thiserror::Error;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Script(#[from] ScriptError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Glyph(#[from] GlyphError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("usage: {0}")]
    Usage(String),
}

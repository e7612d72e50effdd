//! Photo edit session: filters, annotations, history and the crop step.

pub mod annotations;
pub mod crop;
pub mod filters;
pub mod history;
pub mod session;
pub mod state;

pub use annotations::{
    Annotation, AnnotationKind, EmojiAnnotation, EmojiPatch, TextAnnotation, TextFontFamily,
    TextPatch, TextStyle, EMOJI_PALETTE, TEXT_COLOR_PALETTE,
};
pub use crop::{crop_image, CropError, CropRect};
pub use filters::{reset_filters, set_filter, FilterField, FilterSet};
pub use history::{HistoryAction, HistoryError, HistoryLog};
pub use session::{EditorSession, SessionError, SessionOptions, SessionResult};
pub use state::EditorState;

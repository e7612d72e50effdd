/// Lifecycle phase of one photo edit session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// No image selected yet.
    #[default]
    Idle,
    /// An image is loaded and edits are accepted.
    Editing,
    /// The final raster was produced; the session is spent.
    Finalized,
    /// The user abandoned the edit.
    Discarded,
}

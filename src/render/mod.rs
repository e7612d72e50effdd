//! Rasterization of an edit session into its submission image.

pub mod artifact;
pub mod compositor;
pub mod glyphs;
pub mod pipeline;

use thiserror::Error;

pub use artifact::{OutputFormat, RasterArtifact, DEFAULT_JPEG_QUALITY};
pub use compositor::{composite, CompositeInput, PreviewScale};
pub use glyphs::{FontLibrary, GlyphError, GlyphFace, GlyphRasterizer, GlyphRequest};
pub use pipeline::apply_filters;

#[derive(Debug, Error)]
pub enum CompositeError {
    #[error("preview canvas size {width}x{height} is not usable for scaling")]
    PreviewUnavailable { width: f32, height: f32 },
    #[error("annotation would rasterize at {px_size}px, beyond the {limit}px this image allows")]
    SpriteTooLarge { px_size: f32, limit: f32 },
    #[error("base image has no pixels")]
    EmptyImage,
    #[error("failed to encode raster: {0}")]
    Encode(#[from] image::ImageError),
}

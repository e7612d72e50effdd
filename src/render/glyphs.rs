use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ab_glyph::{point, Font, FontVec, GlyphId, GlyphImageFormat, PxScale, ScaleFont};
use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgba, RgbaImage};
use thiserror::Error;

use crate::editor::annotations::TextFontFamily;
use crate::geometry::Color;

/// Transparent margin around rasterized glyph runs so antialiasing is not clipped.
const GLYPH_PADDING_PX: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlyphFace {
    Text { family: TextFontFamily, bold: bool },
    Emoji,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphRequest<'a> {
    pub content: &'a str,
    pub face: GlyphFace,
    pub px_size: f32,
    /// `None` lets the rasterizer keep the glyph's own colors (emoji).
    pub color: Option<Color>,
}

/// Turns a run of text into a tightly sized RGBA sprite.
///
/// Returning `None` means nothing visible: empty content, missing fonts, or a
/// zero size.
pub trait GlyphRasterizer {
    fn rasterize(&self, request: &GlyphRequest<'_>) -> Option<RgbaImage>;
}

#[derive(Debug, Error)]
pub enum GlyphError {
    #[error("failed to read font {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid font data in {path}")]
    InvalidFont { path: PathBuf },
}

/// Font faces loaded at runtime, rasterized with `ab_glyph`.
pub struct FontLibrary {
    faces: HashMap<(TextFontFamily, bool), FontVec>,
    emoji: Option<FontVec>,
    monochrome_emoji_color: Color,
}

impl Default for FontLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl FontLibrary {
    pub fn new() -> Self {
        Self {
            faces: HashMap::new(),
            emoji: None,
            monochrome_emoji_color: Color::WHITE,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty() && self.emoji.is_none()
    }

    pub fn insert_face(
        &mut self,
        family: TextFontFamily,
        bold: bool,
        path: &Path,
    ) -> Result<(), GlyphError> {
        let font = load_font(path)?;
        self.faces.insert((family, bold), font);
        Ok(())
    }

    pub fn set_emoji_face(&mut self, path: &Path) -> Result<(), GlyphError> {
        self.emoji = Some(load_font(path)?);
        Ok(())
    }

    /// Outline emoji fonts carry no color; this tint is used for them.
    pub fn set_monochrome_emoji_color(&mut self, color: Color) {
        self.monochrome_emoji_color = color;
    }

    fn text_face(&self, family: TextFontFamily, bold: bool) -> Option<&FontVec> {
        [
            (family, bold),
            (family, !bold),
            (TextFontFamily::Sans, bold),
            (TextFontFamily::Sans, !bold),
        ]
        .iter()
        .find_map(|key| self.faces.get(key))
        .or_else(|| self.faces.values().next())
    }

    fn face_for(&self, face: GlyphFace) -> Option<&FontVec> {
        match face {
            GlyphFace::Text { family, bold } => self.text_face(family, bold),
            GlyphFace::Emoji => self
                .emoji
                .as_ref()
                .or_else(|| self.text_face(TextFontFamily::Sans, false)),
        }
    }
}

fn load_font(path: &Path) -> Result<FontVec, GlyphError> {
    let bytes = std::fs::read(path).map_err(|source| GlyphError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    FontVec::try_from_vec(bytes).map_err(|_| GlyphError::InvalidFont {
        path: path.to_path_buf(),
    })
}

fn line_width<F: Font>(font: &F, scale: PxScale, line: &str) -> f32 {
    let scaled = font.as_scaled(scale);
    let mut width = 0.0_f32;
    let mut previous: Option<GlyphId> = None;
    for ch in line.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = previous {
            width += scaled.kern(prev, id);
        }
        width += scaled.h_advance(id);
        previous = Some(id);
    }
    width
}

fn blend_coverage(canvas: &mut RgbaImage, x: i32, y: i32, coverage: f32, color: Color) {
    if x < 0 || y < 0 || x as u32 >= canvas.width() || y as u32 >= canvas.height() {
        return;
    }
    let alpha = (coverage.clamp(0.0, 1.0) * 255.0).round() as u8;
    let pixel = canvas.get_pixel_mut(x as u32, y as u32);
    if alpha > pixel.0[3] {
        *pixel = Rgba([color.r, color.g, color.b, alpha]);
    }
}

/// Upper bound on the pixels of one rasterized sprite or its shadow buffer.
pub(crate) const MAX_SPRITE_PIXELS: f64 = 64.0 * 1024.0 * 1024.0;

pub(crate) fn sprite_fits(width: f32, height: f32) -> bool {
    width.is_finite()
        && height.is_finite()
        && f64::from(width.max(0.0)) * f64::from(height.max(0.0)) <= MAX_SPRITE_PIXELS
}

fn rasterize_with<F: Font>(
    font: &F,
    content: &str,
    px_size: f32,
    color: Color,
) -> Option<RgbaImage> {
    let scale = PxScale::from(px_size);
    let scaled = font.as_scaled(scale);
    let line_height = scaled.height() + scaled.line_gap();
    let lines = content.split('\n').collect::<Vec<_>>();
    let widths = lines
        .iter()
        .map(|line| line_width(font, scale, line))
        .collect::<Vec<_>>();
    let max_width = widths.iter().copied().fold(0.0_f32, f32::max);
    if max_width <= 0.0 || line_height <= 0.0 {
        return None;
    }

    let width = (max_width + GLYPH_PADDING_PX * 2.0).ceil();
    let height = (line_height * lines.len() as f32 + GLYPH_PADDING_PX * 2.0).ceil();
    if !sprite_fits(width, height) {
        tracing::warn!(px_size, width, height, "glyph run too large to rasterize");
        return None;
    }
    let mut canvas = RgbaImage::new(width as u32, height as u32);
    let mut drew_any = false;

    for (index, (line, line_w)) in lines.iter().zip(&widths).enumerate() {
        let baseline = GLYPH_PADDING_PX + index as f32 * line_height + scaled.ascent();
        let mut caret = GLYPH_PADDING_PX + (max_width - line_w) / 2.0;
        let mut previous: Option<GlyphId> = None;
        for ch in line.chars() {
            let id = font.glyph_id(ch);
            if let Some(prev) = previous {
                caret += scaled.kern(prev, id);
            }
            let glyph = id.with_scale_and_position(scale, point(caret, baseline));
            if let Some(outlined) = font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                outlined.draw(|gx, gy, coverage| {
                    let x = bounds.min.x as i32 + gx as i32;
                    let y = bounds.min.y as i32 + gy as i32;
                    blend_coverage(&mut canvas, x, y, coverage, color);
                });
                drew_any = true;
            }
            caret += scaled.h_advance(id);
            previous = Some(id);
        }
    }

    if !drew_any {
        if !content.trim().is_empty() {
            tracing::warn!(content, "font has no outlines for glyph run; skipping draw");
        }
        return None;
    }
    Some(canvas)
}

/// Unpacks a 1/2/4/8-bit grayscale bitmap into one coverage byte per pixel.
fn unpack_coverage(
    data: &[u8],
    width: usize,
    height: usize,
    bits: usize,
    padded: bool,
) -> Option<Vec<u8>> {
    let max = (1_u16 << bits) - 1;
    let row_bits = width * bits;
    let stride_bits = if padded { row_bits.div_ceil(8) * 8 } else { row_bits };
    let mut coverage = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let bit = y * stride_bits + x * bits;
            let byte = *data.get(bit / 8)?;
            let shift = 8 - bits - bit % 8;
            let value = u16::from(byte >> shift) & max;
            coverage.push((value * 255 / max) as u8);
        }
    }
    Some(coverage)
}

/// Decodes an embedded glyph bitmap. Grayscale strikes are tinted with `color`.
fn decode_glyph_bitmap(
    format: &GlyphImageFormat,
    data: &[u8],
    width: u16,
    height: u16,
    color: Color,
) -> Option<RgbaImage> {
    let (w, h) = (usize::from(width), usize::from(height));
    let tinted = |bits: usize, padded: bool| {
        let coverage = unpack_coverage(data, w, h, bits, padded)?;
        let pixels = coverage
            .into_iter()
            .flat_map(|alpha| [color.r, color.g, color.b, alpha])
            .collect::<Vec<_>>();
        RgbaImage::from_raw(u32::from(width), u32::from(height), pixels)
    };
    match format {
        GlyphImageFormat::Png => image::load_from_memory_with_format(data, ImageFormat::Png)
            .map(|decoded| decoded.to_rgba8())
            .map_err(|err| tracing::warn!(%err, "undecodable png glyph bitmap"))
            .ok(),
        GlyphImageFormat::BitmapMono => tinted(1, true),
        GlyphImageFormat::BitmapMonoPacked => tinted(1, false),
        GlyphImageFormat::BitmapGray2 => tinted(2, true),
        GlyphImageFormat::BitmapGray2Packed => tinted(2, false),
        GlyphImageFormat::BitmapGray4 => tinted(4, true),
        GlyphImageFormat::BitmapGray4Packed => tinted(4, false),
        GlyphImageFormat::BitmapGray8 => tinted(8, false),
        GlyphImageFormat::BitmapPremulBgra32 => {
            let pixels = data
                .get(..w * h * 4)?
                .chunks_exact(4)
                .flat_map(|px| {
                    let [b, g, r, a] = [px[0], px[1], px[2], px[3]];
                    let unpremultiply = |channel: u8| {
                        if a == 0 {
                            0
                        } else {
                            (u16::from(channel) * 255 / u16::from(a)).min(255) as u8
                        }
                    };
                    [unpremultiply(r), unpremultiply(g), unpremultiply(b), a]
                })
                .collect::<Vec<_>>();
            RgbaImage::from_raw(u32::from(width), u32::from(height), pixels)
        }
        _ => None,
    }
}

struct PlacedBitmap {
    image: RgbaImage,
    left: f32,
    top: f32,
}

/// Lays out the embedded bitmaps of a run (color emoji strikes) on one line,
/// scaled from the strike's size to `px_size`. `None` when the font has no
/// bitmap for any glyph in the run.
fn rasterize_bitmaps<F: Font>(
    font: &F,
    content: &str,
    px_size: f32,
    color: Color,
) -> Option<RgbaImage> {
    let scaled = font.as_scaled(PxScale::from(px_size));
    let em_px = scaled.h_scale_factor() * font.units_per_em()?;
    let strike_request = em_px.round().clamp(1.0, f32::from(u16::MAX)) as u16;

    let mut placed = Vec::new();
    let mut caret = 0.0_f32;
    let mut previous: Option<GlyphId> = None;
    for ch in content.chars().filter(|ch| *ch != '\n') {
        let id = font.glyph_id(ch);
        if let Some(prev) = previous {
            caret += scaled.kern(prev, id);
        }
        if let Some(raster) = font.glyph_raster_image2(id, strike_request) {
            let bitmap = (raster.pixels_per_em > 0)
                .then(|| {
                    decode_glyph_bitmap(
                        &raster.format,
                        raster.data,
                        raster.width,
                        raster.height,
                        color,
                    )
                })
                .flatten();
            if let Some(bitmap) = bitmap {
                let ratio = em_px / f32::from(raster.pixels_per_em);
                let width = (bitmap.width() as f32 * ratio).round().max(1.0);
                let height = (bitmap.height() as f32 * ratio).round().max(1.0);
                if !sprite_fits(width, height) {
                    tracing::warn!(px_size, width, height, "glyph bitmap too large to scale");
                    return None;
                }
                let image = imageops::resize(
                    &bitmap,
                    width as u32,
                    height as u32,
                    FilterType::Triangle,
                );
                // Bitmap origins are the bottom-left corner relative to the pen position.
                placed.push(PlacedBitmap {
                    image,
                    left: caret + raster.origin.x * ratio,
                    top: scaled.ascent() - raster.origin.y * ratio - height,
                });
            }
        }
        caret += scaled.h_advance(id);
        previous = Some(id);
    }
    if placed.is_empty() {
        return None;
    }

    let min_left = placed.iter().map(|p| p.left).fold(f32::INFINITY, f32::min);
    let min_top = placed.iter().map(|p| p.top).fold(f32::INFINITY, f32::min);
    let max_right = placed
        .iter()
        .map(|p| p.left + p.image.width() as f32)
        .fold(f32::NEG_INFINITY, f32::max);
    let max_bottom = placed
        .iter()
        .map(|p| p.top + p.image.height() as f32)
        .fold(f32::NEG_INFINITY, f32::max);
    let width = (max_right - min_left + GLYPH_PADDING_PX * 2.0).ceil();
    let height = (max_bottom - min_top + GLYPH_PADDING_PX * 2.0).ceil();
    if !sprite_fits(width, height) {
        tracing::warn!(px_size, width, height, "bitmap run too large to rasterize");
        return None;
    }
    let mut canvas = RgbaImage::new(width as u32, height as u32);
    for bitmap in &placed {
        let x = (bitmap.left - min_left + GLYPH_PADDING_PX).round() as i64;
        let y = (bitmap.top - min_top + GLYPH_PADDING_PX).round() as i64;
        imageops::overlay(&mut canvas, &bitmap.image, x, y);
    }
    Some(canvas)
}

impl GlyphRasterizer for FontLibrary {
    fn rasterize(&self, request: &GlyphRequest<'_>) -> Option<RgbaImage> {
        if request.content.is_empty() || request.px_size.is_nan() || request.px_size <= 0.0 {
            return None;
        }
        let Some(font) = self.face_for(request.face) else {
            tracing::warn!(face = ?request.face, "no font loaded for glyph face; skipping draw");
            return None;
        };
        let color = request.color.unwrap_or(self.monochrome_emoji_color);
        if request.face == GlyphFace::Emoji {
            if let Some(sprite) = rasterize_bitmaps(font, request.content, request.px_size, color) {
                return Some(sprite);
            }
        }
        rasterize_with(font, request.content, request.px_size, color)
    }
}

use image::{imageops, Rgba, RgbaImage};

use super::glyphs::{sprite_fits, GlyphFace, GlyphRasterizer, GlyphRequest};
use super::pipeline::apply_filters;
use super::{CompositeError, RasterArtifact};
use crate::editor::annotations::{EmojiAnnotation, TextAnnotation};
use crate::editor::filters::FilterSet;
use crate::geometry::CanvasSize;

const SHADOW_OFFSET_PX: f32 = 2.0;
const SHADOW_BLUR_PX: f32 = 4.0;
const SHADOW_OPACITY: f32 = 0.5;
/// Glyph sizes are capped at this multiple of the longest native edge.
const MAX_SPRITE_EDGE_RATIO: f32 = 2.0;

/// Everything the compositor reads. Annotation positions are in preview pixels.
#[derive(Debug, Clone, Copy)]
pub struct CompositeInput<'a> {
    pub base: &'a RgbaImage,
    pub filters: &'a FilterSet,
    pub texts: &'a [TextAnnotation],
    pub emojis: &'a [EmojiAnnotation],
    pub preview: CanvasSize,
}

/// Preview-to-native mapping. Positions scale per axis, sizes by the smaller factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewScale {
    pub x: f32,
    pub y: f32,
}

impl PreviewScale {
    pub fn between(
        native_width: u32,
        native_height: u32,
        preview: CanvasSize,
    ) -> Result<Self, CompositeError> {
        if !preview.is_usable() {
            return Err(CompositeError::PreviewUnavailable {
                width: preview.width,
                height: preview.height,
            });
        }
        Ok(Self {
            x: native_width as f32 / preview.width,
            y: native_height as f32 / preview.height,
        })
    }

    pub fn uniform(self) -> f32 {
        self.x.min(self.y)
    }
}

struct Sprite {
    center_x: f32,
    center_y: f32,
    scale: f32,
}

/// Flattens filters, emojis and texts onto the base image at native resolution.
///
/// Emojis draw in insertion order, then texts in insertion order, so text is
/// always topmost.
pub fn composite(
    input: CompositeInput<'_>,
    glyphs: &dyn GlyphRasterizer,
) -> Result<RasterArtifact, CompositeError> {
    let (native_width, native_height) = input.base.dimensions();
    if native_width == 0 || native_height == 0 {
        return Err(CompositeError::EmptyImage);
    }
    let scale = PreviewScale::between(native_width, native_height, input.preview)?;
    let size_scale = scale.uniform();

    let limit = native_width.max(native_height) as f32 * MAX_SPRITE_EDGE_RATIO;
    let sizes = input
        .emojis
        .iter()
        .map(|emoji| emoji.size)
        .chain(input.texts.iter().map(|text| text.style.font_size));
    for size in sizes {
        let px_size = size * size_scale;
        if px_size.is_nan() || px_size > limit {
            return Err(CompositeError::SpriteTooLarge { px_size, limit });
        }
    }

    let mut output = apply_filters(input.base, input.filters);

    for emoji in input.emojis {
        let request = GlyphRequest {
            content: &emoji.glyph,
            face: GlyphFace::Emoji,
            px_size: emoji.size * size_scale,
            color: None,
        };
        let sprite = Sprite {
            center_x: emoji.position.x * scale.x,
            center_y: emoji.position.y * scale.y,
            scale: size_scale,
        };
        draw_request(&mut output, glyphs, &request, &sprite);
    }

    for text in input.texts {
        let request = GlyphRequest {
            content: &text.content,
            face: GlyphFace::Text {
                family: text.style.font_family,
                bold: true,
            },
            px_size: text.style.font_size * size_scale,
            color: Some(text.style.color),
        };
        let sprite = Sprite {
            center_x: native_width as f32 / 2.0 + text.position.x * scale.x,
            center_y: native_height as f32 / 2.0 + text.position.y * scale.y,
            scale: size_scale,
        };
        draw_request(&mut output, glyphs, &request, &sprite);
    }

    tracing::debug!(
        width = native_width,
        height = native_height,
        emojis = input.emojis.len(),
        texts = input.texts.len(),
        "composited submission raster"
    );
    Ok(RasterArtifact::new(output))
}

fn draw_request(
    target: &mut RgbaImage,
    glyphs: &dyn GlyphRasterizer,
    request: &GlyphRequest<'_>,
    sprite: &Sprite,
) {
    let Some(glyph) = glyphs.rasterize(request) else {
        tracing::trace!(content = request.content, "glyph run rendered nothing");
        return;
    };
    let left = (sprite.center_x - glyph.width() as f32 / 2.0).round() as i64;
    let top = (sprite.center_y - glyph.height() as f32 / 2.0).round() as i64;

    if let Some((shadow, padding)) = drop_shadow(&glyph, SHADOW_BLUR_PX * sprite.scale) {
        let offset = (SHADOW_OFFSET_PX * sprite.scale).round() as i64;
        imageops::overlay(target, &shadow, left - padding + offset, top - padding + offset);
    }
    imageops::overlay(target, &glyph, left, top);
}

/// Black silhouette of `glyph`, padded and blurred. Returns the padding used, or
/// `None` when the padded buffer would be too large to allocate.
fn drop_shadow(glyph: &RgbaImage, blur_px: f32) -> Option<(RgbaImage, i64)> {
    // Canvas shadow blur is twice the gaussian standard deviation.
    let sigma = blur_px / 2.0;
    let padding = (sigma * 3.0).ceil().max(0.0);
    let width = glyph.width() as f32 + padding * 2.0;
    let height = glyph.height() as f32 + padding * 2.0;
    if !sprite_fits(width, height) {
        tracing::warn!(width, height, "drop shadow too large; drawing sprite without it");
        return None;
    }
    let padding = padding as u32;
    let mut shadow = RgbaImage::new(width as u32, height as u32);
    for (x, y, pixel) in glyph.enumerate_pixels() {
        let alpha = (f32::from(pixel.0[3]) * SHADOW_OPACITY).round() as u8;
        shadow.put_pixel(x + padding, y + padding, Rgba([0, 0, 0, alpha]));
    }
    if sigma > 0.0 {
        shadow = imageops::blur(&shadow, sigma);
    }
    Some((shadow, i64::from(padding)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::annotations::{Color, Point};
    use crate::editor::filters::FilterField;
    use crate::render::glyphs::test_support::{BoxRasterizer, EMOJI_A, EMOJI_B};

    fn base(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([40, 80, 120, 255]))
    }

    fn rgba(color: Color) -> Rgba<u8> {
        Rgba([color.r, color.g, color.b, 255])
    }

    #[test]
    fn default_filters_without_annotations_are_identity() {
        let image = RgbaImage::from_fn(32, 24, |x, y| Rgba([x as u8 * 7, y as u8 * 9, 3, 255]));
        let artifact = composite(
            CompositeInput {
                base: &image,
                filters: &FilterSet::default(),
                texts: &[],
                emojis: &[],
                preview: CanvasSize::new(16.0, 12.0),
            },
            &BoxRasterizer::default(),
        )
        .expect("composite should succeed");
        assert_eq!(artifact.image(), &image);
    }

    #[test]
    fn zero_preview_size_fails_instead_of_dividing() {
        let image = base(10, 10);
        let err = composite(
            CompositeInput {
                base: &image,
                filters: &FilterSet::default(),
                texts: &[],
                emojis: &[],
                preview: CanvasSize::new(0.0, 10.0),
            },
            &BoxRasterizer::default(),
        )
        .expect_err("zero preview width should fail");
        assert!(matches!(err, CompositeError::PreviewUnavailable { .. }));
    }

    #[test]
    fn later_emoji_draws_over_earlier_and_text_draws_over_both() {
        let image = base(200, 200);
        let emojis = [
            EmojiAnnotation::new(1, "A", Point::new(50.0, 50.0)),
            EmojiAnnotation::new(2, "B", Point::new(50.0, 50.0)),
        ];
        let rasterizer = BoxRasterizer::default();
        let artifact = composite(
            CompositeInput {
                base: &image,
                filters: &FilterSet::default(),
                texts: &[],
                emojis: &emojis,
                preview: CanvasSize::new(100.0, 100.0),
            },
            &rasterizer,
        )
        .expect("composite should succeed");
        assert_eq!(artifact.image().get_pixel(100, 100), &rgba(EMOJI_B));

        // Text centered on the same native pixel: canvas center offset (0, 0) maps to
        // (100, 100), and so does emoji position (50, 50) at scale 2.
        let mut text = TextAnnotation::with_content(3, "T");
        text.style.color = Color::new(0, 255, 0);
        let texts = [text];
        let artifact = composite(
            CompositeInput {
                base: &image,
                filters: &FilterSet::default(),
                texts: &texts,
                emojis: &emojis,
                preview: CanvasSize::new(100.0, 100.0),
            },
            &rasterizer,
        )
        .expect("composite should succeed");
        assert_eq!(artifact.image().get_pixel(100, 100), &Rgba([0, 255, 0, 255]));
        assert_ne!(artifact.image().get_pixel(100, 100), &rgba(EMOJI_A));
    }

    #[test]
    fn draw_calls_follow_emoji_then_text_insertion_order_with_scaled_sizes() {
        let image = base(400, 200);
        let emojis = [
            EmojiAnnotation::new(1, "A", Point::new(10.0, 10.0)),
            EmojiAnnotation::new(2, "B", Point::new(20.0, 20.0)),
        ];
        let texts = [
            TextAnnotation::with_content(3, "first"),
            TextAnnotation::with_content(4, ""),
        ];
        let rasterizer = BoxRasterizer::default();
        composite(
            CompositeInput {
                base: &image,
                filters: &FilterSet::default(),
                texts: &texts,
                emojis: &emojis,
                preview: CanvasSize::new(200.0, 50.0),
            },
            &rasterizer,
        )
        .expect("composite should succeed");

        let calls = rasterizer.calls.borrow();
        let order = calls.iter().map(|(content, _)| content.as_str()).collect::<Vec<_>>();
        assert_eq!(order, vec!["A", "B", "first", ""]);
        // scale_x = 2, scale_y = 4; sizes use the smaller factor.
        assert_eq!(calls[0].1, emojis[0].size * 2.0);
        assert_eq!(calls[2].1, texts[0].style.font_size * 2.0);
    }

    #[test]
    fn positions_scale_per_axis() {
        let image = base(400, 200);
        let emojis = [EmojiAnnotation {
            size: 12.0,
            ..EmojiAnnotation::new(1, "A", Point::new(100.0, 10.0))
        }];
        let artifact = composite(
            CompositeInput {
                base: &image,
                filters: &FilterSet::default(),
                texts: &[],
                emojis: &emojis,
                preview: CanvasSize::new(200.0, 50.0),
            },
            &BoxRasterizer::default(),
        )
        .expect("composite should succeed");
        // Native center is (100 * 2, 10 * 4).
        assert_eq!(artifact.image().get_pixel(200, 40), &rgba(EMOJI_A));
        assert_eq!(artifact.image().get_pixel(200, 80), &Rgba([40, 80, 120, 255]));
    }

    #[test]
    fn shadow_darkens_pixels_below_right_of_sprite() {
        let image = RgbaImage::from_pixel(100, 100, Rgba([255, 255, 255, 255]));
        let emojis = [EmojiAnnotation {
            size: 20.0,
            ..EmojiAnnotation::new(1, "A", Point::new(50.0, 50.0))
        }];
        let artifact = composite(
            CompositeInput {
                base: &image,
                filters: &FilterSet::default(),
                texts: &[],
                emojis: &emojis,
                preview: CanvasSize::new(100.0, 100.0),
            },
            &BoxRasterizer::default(),
        )
        .expect("composite should succeed");
        // Sprite covers 40..60; the shadow is offset by 2px.
        let just_outside = artifact.image().get_pixel(61, 61).0;
        assert!(just_outside[0] < 255, "shadow should darken {just_outside:?}");
        assert_eq!(artifact.image().get_pixel(5, 5), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn filters_apply_before_annotations() {
        let image = base(20, 20);
        let filters = FilterSet::default().with(FilterField::Invert, 100.0);
        let artifact = composite(
            CompositeInput {
                base: &image,
                filters: &filters,
                texts: &[],
                emojis: &[],
                preview: CanvasSize::new(20.0, 20.0),
            },
            &BoxRasterizer::default(),
        )
        .expect("composite should succeed");
        assert_eq!(artifact.image().get_pixel(0, 0), &Rgba([215, 175, 135, 255]));
    }

    #[test]
    fn tiny_preview_is_refused_before_any_glyph_is_rasterized() {
        let image = base(400, 300);
        let texts = [TextAnnotation::with_content(1, "Hi")];
        let rasterizer = BoxRasterizer::default();
        let err = composite(
            CompositeInput {
                base: &image,
                filters: &FilterSet::default(),
                texts: &texts,
                emojis: &[],
                preview: CanvasSize::new(0.05, 0.05),
            },
            &rasterizer,
        )
        .expect_err("a 6000x scale cannot be drawn");
        assert!(matches!(
            err,
            CompositeError::SpriteTooLarge { limit, .. } if limit == 800.0
        ));
        assert!(rasterizer.calls.borrow().is_empty());

        // Without annotations the same preview still flattens the filters.
        composite(
            CompositeInput {
                base: &image,
                filters: &FilterSet::default(),
                texts: &[],
                emojis: &[],
                preview: CanvasSize::new(0.05, 0.05),
            },
            &rasterizer,
        )
        .expect("filters alone never allocate sprites");
    }

    #[test]
    fn drop_shadow_refuses_buffers_beyond_the_sprite_budget() {
        let glyph = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        let (shadow, padding) = drop_shadow(&glyph, 4.0).expect("small shadow fits");
        assert_eq!(padding, 6);
        assert_eq!(shadow.dimensions(), (16, 16));
        assert!(drop_shadow(&glyph, 1.0e6).is_none());
    }

    #[test]
    fn preview_scale_uses_smaller_axis_for_sizes() {
        let scale = PreviewScale::between(300, 100, CanvasSize::new(100.0, 100.0))
            .expect("preview is usable");
        assert_eq!(scale, PreviewScale { x: 3.0, y: 1.0 });
        assert_eq!(scale.uniform(), 1.0);
    }
}

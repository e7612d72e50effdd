use image::{imageops, RgbaImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{CanvasSize, PixelRect};

/// Crop selection as reported by the crop UI.
///
/// `Display` coordinates are preview pixels of the displayed image and are scaled
/// to the native raster. `Normalized` coordinates are fractions of the image size.
/// Corners may be given in either order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "unit", rename_all = "camelCase")]
pub enum CropRect {
    Display {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    Normalized {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CropError {
    #[error("crop selection contains non-finite coordinates")]
    NonFinite,
    #[error("crop selection has zero area")]
    EmptySelection,
    #[error("crop selection lies outside the image")]
    OutsideImage,
    #[error("displayed image size is unavailable")]
    PreviewUnavailable,
    #[error("working image is empty")]
    EmptyImage,
}

impl CropRect {
    fn components(self) -> (f32, f32, f32, f32) {
        match self {
            Self::Display {
                x,
                y,
                width,
                height,
            }
            | Self::Normalized {
                x,
                y,
                width,
                height,
            } => (x, y, width, height),
        }
    }

    /// Resolves the selection to an integer rectangle clamped inside the native image.
    pub fn resolve(
        self,
        image_width: u32,
        image_height: u32,
        displayed: CanvasSize,
    ) -> Result<PixelRect, CropError> {
        if image_width == 0 || image_height == 0 {
            return Err(CropError::EmptyImage);
        }
        let (x, y, width, height) = self.components();
        if ![x, y, width, height].iter().all(|value| value.is_finite()) {
            return Err(CropError::NonFinite);
        }

        let (scale_x, scale_y) = match self {
            Self::Display { .. } => {
                if !displayed.is_usable() {
                    return Err(CropError::PreviewUnavailable);
                }
                (
                    image_width as f32 / displayed.width,
                    image_height as f32 / displayed.height,
                )
            }
            Self::Normalized { .. } => (image_width as f32, image_height as f32),
        };

        let left = (x.min(x + width) * scale_x).round();
        let right = (x.max(x + width) * scale_x).round();
        let top = (y.min(y + height) * scale_y).round();
        let bottom = (y.max(y + height) * scale_y).round();

        if right <= left || bottom <= top {
            return Err(CropError::EmptySelection);
        }

        let max_x = image_width as f32;
        let max_y = image_height as f32;
        let left = left.clamp(0.0, max_x);
        let right = right.clamp(0.0, max_x);
        let top = top.clamp(0.0, max_y);
        let bottom = bottom.clamp(0.0, max_y);

        if right <= left || bottom <= top {
            return Err(CropError::OutsideImage);
        }

        Ok(PixelRect::new(
            left as u32,
            top as u32,
            (right - left) as u32,
            (bottom - top) as u32,
        ))
    }
}

/// Copies the selected region into a new raster; the source is left untouched.
pub fn crop_image(
    image: &RgbaImage,
    rect: CropRect,
    displayed: CanvasSize,
) -> Result<(RgbaImage, PixelRect), CropError> {
    let region = rect.resolve(image.width(), image.height(), displayed)?;
    let cropped =
        imageops::crop_imm(image, region.x, region.y, region.width, region.height).to_image();
    if cropped.width() == 0 || cropped.height() == 0 {
        return Err(CropError::EmptySelection);
    }
    Ok((cropped, region))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| Rgba([x as u8, y as u8, 0, 255]))
    }

    #[test]
    fn display_rect_scales_to_native_pixels() {
        let region = CropRect::Display {
            x: 10.0,
            y: 5.0,
            width: 20.0,
            height: 10.0,
        }
        .resolve(200, 100, CanvasSize::new(100.0, 50.0))
        .expect("rect should resolve");
        assert_eq!(region, PixelRect::new(20, 10, 40, 20));
    }

    #[test]
    fn normalized_rect_accepts_reversed_corners() {
        let region = CropRect::Normalized {
            x: 0.75,
            y: 0.5,
            width: -0.5,
            height: -0.5,
        }
        .resolve(100, 80, CanvasSize::default())
        .expect("rect should resolve");
        assert_eq!(region, PixelRect::new(25, 0, 50, 40));
    }

    #[test]
    fn rect_is_clamped_to_image_edges() {
        let region = CropRect::Normalized {
            x: 0.5,
            y: -0.25,
            width: 1.0,
            height: 0.5,
        }
        .resolve(100, 100, CanvasSize::default())
        .expect("rect should resolve");
        assert_eq!(region, PixelRect::new(50, 0, 50, 25));
    }

    #[test]
    fn degenerate_and_invalid_rects_are_rejected() {
        let zero = CropRect::Normalized {
            x: 0.2,
            y: 0.2,
            width: 0.0,
            height: 0.5,
        };
        assert_eq!(
            zero.resolve(100, 100, CanvasSize::default()),
            Err(CropError::EmptySelection)
        );

        let outside = CropRect::Normalized {
            x: 1.5,
            y: 0.0,
            width: 0.5,
            height: 0.5,
        };
        assert_eq!(
            outside.resolve(100, 100, CanvasSize::default()),
            Err(CropError::OutsideImage)
        );

        let nan = CropRect::Display {
            x: f32::NAN,
            y: 0.0,
            width: 1.0,
            height: 1.0,
        };
        assert_eq!(
            nan.resolve(100, 100, CanvasSize::new(10.0, 10.0)),
            Err(CropError::NonFinite)
        );

        let no_preview = CropRect::Display {
            x: 0.0,
            y: 0.0,
            width: 5.0,
            height: 5.0,
        };
        assert_eq!(
            no_preview.resolve(100, 100, CanvasSize::default()),
            Err(CropError::PreviewUnavailable)
        );
    }

    #[test]
    fn crop_image_copies_selected_pixels() {
        let image = gradient(64, 32);
        let (cropped, region) = crop_image(
            &image,
            CropRect::Display {
                x: 8.0,
                y: 4.0,
                width: 16.0,
                height: 8.0,
            },
            CanvasSize::new(64.0, 32.0),
        )
        .expect("crop should succeed");
        assert_eq!(region, PixelRect::new(8, 4, 16, 8));
        assert_eq!(cropped.dimensions(), (16, 8));
        assert_eq!(cropped.get_pixel(0, 0), &Rgba([8, 4, 0, 255]));
        assert_eq!(cropped.get_pixel(15, 7), &Rgba([23, 11, 0, 255]));
    }

    #[test]
    fn crop_rect_deserializes_with_unit_tag() {
        let rect: CropRect = serde_json::from_str(
            r#"{"unit": "normalized", "x": 0.1, "y": 0.2, "width": 0.3, "height": 0.4}"#,
        )
        .expect("crop json should parse");
        assert!(matches!(rect, CropRect::Normalized { .. }));
    }
}

//! Filter pipeline matching the CSS filter-effects primitives.
//!
//! Color operators run on straight (non-premultiplied) RGB in `0.0..=1.0`, clamping
//! after every step, in the fixed order brightness, contrast, saturate, grayscale,
//! sepia, invert, hue-rotate. Blur runs last on the whole raster.

use image::{imageops, Rgba, RgbaImage};

use crate::editor::filters::{FilterField, FilterSet};

type Matrix = [[f32; 3]; 3];

#[derive(Debug, Clone, Copy, PartialEq)]
enum ColorOp {
    Linear { slope: f32, intercept: f32 },
    Matrix(Matrix),
}

impl ColorOp {
    fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        let out = match self {
            Self::Linear { slope, intercept } => rgb.map(|channel| channel * slope + intercept),
            Self::Matrix(m) => [
                m[0][0] * rgb[0] + m[0][1] * rgb[1] + m[0][2] * rgb[2],
                m[1][0] * rgb[0] + m[1][1] * rgb[1] + m[1][2] * rgb[2],
                m[2][0] * rgb[0] + m[2][1] * rgb[1] + m[2][2] * rgb[2],
            ],
        };
        out.map(|channel| channel.clamp(0.0, 1.0))
    }
}

fn saturate_matrix(s: f32) -> Matrix {
    [
        [0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s],
    ]
}

fn grayscale_matrix(amount: f32) -> Matrix {
    let s = 1.0 - amount;
    [
        [0.2126 + 0.7874 * s, 0.7152 - 0.7152 * s, 0.0722 - 0.0722 * s],
        [0.2126 - 0.2126 * s, 0.7152 + 0.2848 * s, 0.0722 - 0.0722 * s],
        [0.2126 - 0.2126 * s, 0.7152 - 0.7152 * s, 0.0722 + 0.9278 * s],
    ]
}

fn sepia_matrix(amount: f32) -> Matrix {
    let s = 1.0 - amount;
    [
        [0.393 + 0.607 * s, 0.769 - 0.769 * s, 0.189 - 0.189 * s],
        [0.349 - 0.349 * s, 0.686 + 0.314 * s, 0.168 - 0.168 * s],
        [0.272 - 0.272 * s, 0.534 - 0.534 * s, 0.131 + 0.869 * s],
    ]
}

fn hue_rotate_matrix(degrees: f32) -> Matrix {
    let (sin, cos) = degrees.to_radians().sin_cos();
    [
        [
            0.213 + cos * 0.787 - sin * 0.213,
            0.715 - cos * 0.715 - sin * 0.715,
            0.072 - cos * 0.072 + sin * 0.928,
        ],
        [
            0.213 - cos * 0.213 + sin * 0.143,
            0.715 + cos * 0.285 + sin * 0.140,
            0.072 - cos * 0.072 - sin * 0.283,
        ],
        [
            0.213 - cos * 0.213 - sin * 0.787,
            0.715 - cos * 0.715 + sin * 0.715,
            0.072 + cos * 0.928 + sin * 0.072,
        ],
    ]
}

fn color_op(field: FilterField, value: f32) -> Option<ColorOp> {
    let amount = value / 100.0;
    match field {
        FilterField::Brightness => Some(ColorOp::Linear {
            slope: amount,
            intercept: 0.0,
        }),
        FilterField::Contrast => Some(ColorOp::Linear {
            slope: amount,
            intercept: 0.5 - 0.5 * amount,
        }),
        FilterField::Saturate => Some(ColorOp::Matrix(saturate_matrix(amount))),
        FilterField::Grayscale => Some(ColorOp::Matrix(grayscale_matrix(amount))),
        FilterField::Sepia => Some(ColorOp::Matrix(sepia_matrix(amount))),
        FilterField::Invert => Some(ColorOp::Linear {
            slope: 1.0 - 2.0 * amount,
            intercept: amount,
        }),
        FilterField::HueRotate => Some(ColorOp::Matrix(hue_rotate_matrix(value))),
        FilterField::Blur => None,
    }
}

/// Color operators for every non-neutral field, in application order.
fn color_ops(filters: &FilterSet) -> Vec<ColorOp> {
    FilterField::ALL
        .into_iter()
        .filter(|field| !filters.is_neutral(*field))
        .filter_map(|field| color_op(field, filters.get(field)))
        .collect()
}

fn to_unit(channel: u8) -> f32 {
    f32::from(channel) / 255.0
}

fn from_unit(channel: f32) -> u8 {
    (channel * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Renders `image` through `filters`. Neutral fields are skipped, so the default
/// set returns a pixel-identical copy.
pub fn apply_filters(image: &RgbaImage, filters: &FilterSet) -> RgbaImage {
    let filters = filters.sanitized();
    if filters.is_identity() {
        return image.clone();
    }

    let ops = color_ops(&filters);
    let mut output = image.clone();
    if !ops.is_empty() {
        for pixel in output.pixels_mut() {
            let [r, g, b, a] = pixel.0;
            let rgb = ops
                .iter()
                .fold([to_unit(r), to_unit(g), to_unit(b)], |rgb, op| op.apply(rgb));
            *pixel = Rgba([from_unit(rgb[0]), from_unit(rgb[1]), from_unit(rgb[2]), a]);
        }
    }

    if !filters.is_neutral(FilterField::Blur) && filters.blur > 0.0 {
        output = imageops::blur(&output, filters.blur);
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(4, 4, Rgba(color))
    }

    fn with(field: FilterField, value: f32) -> FilterSet {
        FilterSet::default().with(field, value)
    }

    #[test]
    fn default_filters_are_pixel_identical() {
        let image = RgbaImage::from_fn(16, 8, |x, y| Rgba([x as u8 * 13, y as u8 * 29, 77, 200]));
        assert_eq!(apply_filters(&image, &FilterSet::default()), image);
    }

    #[test]
    fn brightness_scales_and_clamps_channels() {
        let image = solid([100, 200, 0, 255]);
        let out = apply_filters(&image, &with(FilterField::Brightness, 200.0));
        assert_eq!(out.get_pixel(0, 0), &Rgba([200, 255, 0, 255]));

        let dark = apply_filters(&image, &with(FilterField::Brightness, 0.0));
        assert_eq!(dark.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn zero_contrast_flattens_to_mid_gray() {
        let image = solid([10, 240, 90, 255]);
        let out = apply_filters(&image, &with(FilterField::Contrast, 0.0));
        assert_eq!(out.get_pixel(0, 0), &Rgba([128, 128, 128, 255]));
    }

    #[test]
    fn full_invert_flips_channels_and_keeps_alpha() {
        let image = solid([0, 100, 255, 90]);
        let out = apply_filters(&image, &with(FilterField::Invert, 100.0));
        assert_eq!(out.get_pixel(0, 0), &Rgba([255, 155, 0, 90]));
    }

    #[test]
    fn full_grayscale_equalizes_channels() {
        let image = solid([200, 40, 90, 255]);
        let out = apply_filters(&image, &with(FilterField::Grayscale, 100.0));
        let [r, g, b, _] = out.get_pixel(0, 0).0;
        assert!(r.abs_diff(g) <= 1 && g.abs_diff(b) <= 1, "got {r},{g},{b}");
    }

    #[test]
    fn full_hue_rotation_is_near_identity() {
        let image = solid([180, 60, 30, 255]);
        let out = apply_filters(&image, &with(FilterField::HueRotate, 360.0));
        let [r, g, b, _] = out.get_pixel(0, 0).0;
        assert!(r.abs_diff(180) <= 2 && g.abs_diff(60) <= 2 && b.abs_diff(30) <= 2);
    }

    #[test]
    fn operator_order_is_fixed() {
        // Brightness before invert: invert(brightness(0.2 * 2)) = 0.6, the reverse gives 1.0.
        let image = solid([51, 51, 51, 255]);
        let filters = FilterSet::default()
            .with(FilterField::Invert, 100.0)
            .with(FilterField::Brightness, 200.0);
        let out = apply_filters(&image, &filters);
        assert_eq!(out.get_pixel(0, 0).0[0], 153);
    }

    #[test]
    fn blur_preserves_dimensions_and_softens_edges() {
        let mut image = solid([0, 0, 0, 255]);
        image.put_pixel(2, 2, Rgba([255, 255, 255, 255]));
        let out = apply_filters(&image, &with(FilterField::Blur, 1.5));
        assert_eq!(out.dimensions(), image.dimensions());
        assert!(out.get_pixel(2, 2).0[0] < 255);
        assert!(out.get_pixel(1, 2).0[0] > 0);
    }
}

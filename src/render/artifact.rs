use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};

use super::CompositeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
}

impl OutputFormat {
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }

    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }
}

pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Flattened submission image at the base image's native resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterArtifact {
    image: RgbaImage,
}

impl RasterArtifact {
    pub(crate) fn new(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Encodes the raster into a blob for upload. JPEG drops the alpha channel.
    pub fn encode(
        &self,
        format: OutputFormat,
        jpeg_quality: u8,
    ) -> Result<Vec<u8>, CompositeError> {
        let mut bytes = Vec::new();
        match format {
            OutputFormat::Png => {
                self.image
                    .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
            }
            OutputFormat::Jpeg => {
                let rgb = DynamicImage::ImageRgba8(self.image.clone()).to_rgb8();
                let mut encoder =
                    JpegEncoder::new_with_quality(&mut bytes, jpeg_quality.clamp(1, 100));
                encoder.encode_image(&rgb)?;
            }
        }
        Ok(bytes)
    }
}

//! Image transformer - loads, transforms and encodes images with the `image` crate

use std::io::Cursor;
use std::path::Path;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use stowage_core::{Error, FlipDirection, Result};

use super::operation::ImageOperation;

pub struct ImageTransformer;

impl ImageTransformer {
    /// Decode the image stored at `path`, guessing the format from its content
    pub fn load(path: &Path) -> Result<DynamicImage> {
        let reader = ImageReader::open(path)?.with_guessed_format()?;
        reader.decode().map_err(image_error)
    }

    pub fn apply(img: DynamicImage, operation: &ImageOperation) -> Result<DynamicImage> {
        match *operation {
            ImageOperation::Resize {
                width,
                height,
                aspect_ratio,
                prevent_upscale,
            } => Ok(Self::resize(img, width, height, aspect_ratio, prevent_upscale)),
            ImageOperation::Fit {
                width,
                height,
                prevent_upscale,
            } => Ok(Self::fit(img, width, height, prevent_upscale)),
            ImageOperation::Crop { width, height, x, y } => Self::crop(img, width, height, x, y),
            ImageOperation::Flip(FlipDirection::Horizontal) => Ok(img.fliph()),
            ImageOperation::Flip(FlipDirection::Vertical) => Ok(img.flipv()),
        }
    }

    pub fn resize(
        img: DynamicImage,
        width: u32,
        height: u32,
        aspect_ratio: bool,
        prevent_upscale: bool,
    ) -> DynamicImage {
        let (orig_width, orig_height) = img.dimensions();

        let (target_width, target_height) = if aspect_ratio {
            let scale = (width as f64 / orig_width as f64).min(height as f64 / orig_height as f64);
            let scale = if prevent_upscale { scale.min(1.0) } else { scale };
            (
                ((orig_width as f64 * scale).round() as u32).max(1),
                ((orig_height as f64 * scale).round() as u32).max(1),
            )
        } else if prevent_upscale {
            (width.min(orig_width), height.min(orig_height))
        } else {
            (width, height)
        };

        if (target_width, target_height) == (orig_width, orig_height) {
            return img;
        }

        let filter = Self::select_filter(orig_width, orig_height, target_width, target_height);
        img.resize_exact(target_width, target_height, filter)
    }

    pub fn fit(img: DynamicImage, width: u32, height: u32, prevent_upscale: bool) -> DynamicImage {
        let (orig_width, orig_height) = img.dimensions();

        if prevent_upscale && (width > orig_width || height > orig_height) {
            // Largest box with the target proportions that fits the original
            let scale = (orig_width as f64 / width as f64)
                .min(orig_height as f64 / height as f64)
                .min(1.0);
            let crop_width = ((width as f64 * scale).round() as u32).clamp(1, orig_width);
            let crop_height = ((height as f64 * scale).round() as u32).clamp(1, orig_height);
            let x = (orig_width - crop_width) / 2;
            let y = (orig_height - crop_height) / 2;
            return img.crop_imm(x, y, crop_width, crop_height);
        }

        let filter = Self::select_filter(orig_width, orig_height, width, height);
        img.resize_to_fill(width, height, filter)
    }

    pub fn crop(
        img: DynamicImage,
        width: u32,
        height: u32,
        x: Option<u32>,
        y: Option<u32>,
    ) -> Result<DynamicImage> {
        let (orig_width, orig_height) = img.dimensions();
        let x = x.unwrap_or_else(|| orig_width.saturating_sub(width) / 2);
        let y = y.unwrap_or_else(|| orig_height.saturating_sub(height) / 2);

        if x >= orig_width || y >= orig_height {
            return Err(Error::InvalidArgument(format!(
                "crop origin {}x{} is outside the {}x{} image",
                x, y, orig_width, orig_height
            )));
        }

        Ok(img.crop_imm(x, y, width, height))
    }

    /// Select appropriate filter type based on resize ratio
    pub fn select_filter(
        orig_width: u32,
        orig_height: u32,
        new_width: u32,
        new_height: u32,
    ) -> FilterType {
        let width_ratio = orig_width as f32 / new_width as f32;
        let height_ratio = orig_height as f32 / new_height as f32;
        let max_ratio = width_ratio.max(height_ratio);

        if max_ratio > 2.0 {
            FilterType::Triangle
        } else if max_ratio > 1.5 {
            FilterType::CatmullRom
        } else {
            FilterType::Lanczos3
        }
    }

    /// Output format from the file extension, falling back to the content type
    pub fn output_format(extension: Option<&str>, content_type: &str) -> Result<ImageFormat> {
        if let Some(format) = extension.and_then(ImageFormat::from_extension) {
            return Ok(format);
        }

        match content_type {
            "image/jpeg" | "image/jpg" => Ok(ImageFormat::Jpeg),
            "image/png" => Ok(ImageFormat::Png),
            "image/gif" => Ok(ImageFormat::Gif),
            "image/webp" => Ok(ImageFormat::WebP),
            other => Err(Error::ImageProcessing(format!(
                "no encoder for content type `{}`",
                other
            ))),
        }
    }

    /// Encode `img`; `quality` applies to JPEG only
    pub fn encode(img: &DynamicImage, format: ImageFormat, quality: u8) -> Result<Bytes> {
        let (width, height) = img.dimensions();
        let mut buffer = Vec::with_capacity(width as usize * height as usize * 3);

        match format {
            ImageFormat::Jpeg => {
                let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
                DynamicImage::ImageRgb8(img.to_rgb8())
                    .write_with_encoder(encoder)
                    .map_err(image_error)?;
            }
            _ => {
                let mut cursor = Cursor::new(&mut buffer);
                img.write_to(&mut cursor, format).map_err(image_error)?;
            }
        }

        Ok(Bytes::from(buffer))
    }
}

fn image_error(err: image::ImageError) -> Error {
    Error::ImageProcessing(err.to_string())
}

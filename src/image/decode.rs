//! Grayscale decoding for template files and embedded PDF images.
//!
//! Encoded streams go through the `image` crate; raw samples are converted
//! here. Color is reduced with the same Rec. 709 luma weights `image` uses, so
//! a template loaded from disk and the same pixels embedded raw in a PDF
//! decode to identical gray values.

use crate::image::OwnedImage;
use crate::pdf::{EmbeddedImage, RawColor, RawImage};
use crate::util::{SymMatchError, SymMatchResult};
use std::path::Path;

/// Largest embedded image, in pixels, that is decoded for matching.
pub const MAX_IMAGE_PIXELS: usize = 1 << 26;

/// Decodes an embedded image payload to a grayscale raster.
///
/// Images above [`MAX_IMAGE_PIXELS`] fail with `ImageDecode`.
pub fn decode_grayscale(payload: &EmbeddedImage) -> SymMatchResult<OwnedImage> {
    match payload {
        EmbeddedImage::Encoded(bytes) => {
            let img = decode_encoded(bytes)?;
            check_pixels(img.width(), img.height())?;
            Ok(img)
        }
        EmbeddedImage::Raw(raw) => decode_raw(raw),
    }
}

/// Returns the pixel count, failing on overflow or above [`MAX_IMAGE_PIXELS`].
fn check_pixels(width: usize, height: usize) -> SymMatchResult<usize> {
    width
        .checked_mul(height)
        .filter(|&pixels| pixels <= MAX_IMAGE_PIXELS)
        .ok_or_else(|| SymMatchError::ImageDecode {
            reason: format!("image too large: {width}x{height}"),
        })
}

/// Decodes an encoded image (PNG, JPEG, ...) held in memory.
pub fn decode_encoded(bytes: &[u8]) -> SymMatchResult<OwnedImage> {
    let img = image::load_from_memory(bytes).map_err(|err| SymMatchError::ImageDecode {
        reason: err.to_string(),
    })?;
    owned_from_dynamic_image(&img)
}

/// Creates an owned image from a grayscale image buffer.
pub fn owned_from_gray_image(img: &image::GrayImage) -> SymMatchResult<OwnedImage> {
    let width = img.width() as usize;
    let height = img.height() as usize;
    OwnedImage::new(img.as_raw().clone(), width, height)
}

/// Creates an owned grayscale image from a dynamic image.
pub fn owned_from_dynamic_image(img: &image::DynamicImage) -> SymMatchResult<OwnedImage> {
    let gray = img.to_luma8();
    owned_from_gray_image(&gray)
}

/// Loads an image from disk and converts it to a grayscale owned image.
pub fn load_gray_image<P: AsRef<Path>>(path: P) -> SymMatchResult<OwnedImage> {
    let img = image::open(path).map_err(|err| SymMatchError::ImageDecode {
        reason: err.to_string(),
    })?;
    owned_from_dynamic_image(&img)
}

/// Converts raw samples to 8-bit gray.
pub fn decode_raw(raw: &RawImage) -> SymMatchResult<OwnedImage> {
    let width = raw.width;
    let height = raw.height;
    if width == 0 || height == 0 {
        return Err(SymMatchError::InvalidDimensions { width, height });
    }
    let bpc = raw.bits_per_component as usize;
    if !matches!(bpc, 1 | 2 | 4 | 8) {
        return Err(SymMatchError::ImageDecode {
            reason: format!("unsupported bits per component: {bpc}"),
        });
    }
    if let RawColor::Indexed { base, .. } = &raw.color {
        if matches!(**base, RawColor::Indexed { .. }) {
            return Err(SymMatchError::ImageDecode {
                reason: "nested indexed color space".to_owned(),
            });
        }
    }

    let pixels = check_pixels(width, height)?;
    let components = raw.color.components();
    let row_bytes = width
        .checked_mul(components * bpc)
        .ok_or_else(|| SymMatchError::ImageDecode {
            reason: format!("image too large: {width}x{height}"),
        })?
        .div_ceil(8);
    let needed = row_bytes
        .checked_mul(height)
        .ok_or(SymMatchError::InvalidDimensions { width, height })?;
    if raw.samples.len() < needed {
        return Err(SymMatchError::ImageDecode {
            reason: format!(
                "truncated samples: needed {needed} bytes, got {}",
                raw.samples.len()
            ),
        });
    }

    let max = (1u32 << bpc) - 1;
    let mut gray = Vec::with_capacity(pixels);
    let mut pixel = [0u8; 4];
    for row in raw.samples[..needed].chunks_exact(row_bytes) {
        for x in 0..width {
            for (c, slot) in pixel.iter_mut().enumerate().take(components) {
                let sample = read_sample(row, x * components + c, bpc);
                *slot = match raw.color {
                    RawColor::Indexed { .. } => sample as u8,
                    _ => ((sample * 255 + max / 2) / max) as u8,
                };
            }
            let value = match &raw.color {
                RawColor::Indexed { base, palette } => {
                    let base_components = base.components();
                    let start = pixel[0] as usize * base_components;
                    let entry = palette.get(start..start + base_components).ok_or_else(|| {
                        SymMatchError::ImageDecode {
                            reason: format!("palette index {} out of range", pixel[0]),
                        }
                    })?;
                    to_gray(base, entry)
                }
                color => to_gray(color, &pixel[..components]),
            };
            gray.push(if raw.invert { 255 - value } else { value });
        }
    }

    OwnedImage::new(gray, width, height)
}

/// Reads the `index`-th `bpc`-bit sample of a byte row, MSB first.
fn read_sample(row: &[u8], index: usize, bpc: usize) -> u32 {
    if bpc == 8 {
        return row[index] as u32;
    }
    let bit = index * bpc;
    let byte = row[bit / 8] as u32;
    let shift = 8 - bpc - (bit % 8);
    (byte >> shift) & ((1 << bpc) - 1)
}

fn to_gray(color: &RawColor, px: &[u8]) -> u8 {
    match color {
        RawColor::Gray | RawColor::Indexed { .. } => px[0],
        RawColor::Rgb => luma(px[0], px[1], px[2]),
        RawColor::Cmyk => {
            let k = 255 - px[3] as u32;
            let channel = |c: u8| ((255 - c as u32) * k / 255) as u8;
            luma(channel(px[0]), channel(px[1]), channel(px[2]))
        }
    }
}

fn luma(r: u8, g: u8, b: u8) -> u8 {
    let l = 2126 * r as u32 + 7152 * g as u32 + 722 * b as u32;
    ((l + 5000) / 10000) as u8
}

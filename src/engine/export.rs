// ============================================================================
// EXPORTER — flatten image + overlay into one raster
// ============================================================================

use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::error::{Error, Result};

/// A flattened export, ready to be encoded.
#[derive(Clone, Debug)]
pub struct ExportedImage {
    /// Suggested file name (`<original stem>.png`).
    pub file_name: String,
    pub raster: RgbaImage,
}

impl ExportedImage {
    pub fn to_png(&self) -> Result<Vec<u8>> {
        crate::io::encode_png(&self.raster)
    }
}

/// Source-over blend of `top` onto `base`, with `top`'s alpha scaled by `opacity`.
pub fn blend_over(base: Rgba<u8>, top: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    if top[3] == 0 || opacity <= 0.0 {
        return base;
    }
    if opacity >= 1.0 && top[3] == 255 {
        return top;
    }

    let top_a = (top[3] as f32 / 255.0) * opacity.min(1.0);
    let base_a = base[3] as f32 / 255.0;
    let out_a = top_a + base_a * (1.0 - top_a);
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let channel = |b: u8, t: u8| -> u8 {
        let c = (t as f32 * top_a + b as f32 * base_a * (1.0 - top_a)) / out_a;
        c.round().clamp(0.0, 255.0) as u8
    };
    Rgba([
        channel(base[0], top[0]),
        channel(base[1], top[1]),
        channel(base[2], top[2]),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

/// Draw `overlay` over `image` at `opacity`. Both must have the same size;
/// the overlay is never rescaled.
pub fn flatten(image: &RgbaImage, overlay: &RgbaImage, opacity: f32) -> Result<RgbaImage> {
    if image.dimensions() != overlay.dimensions() {
        return Err(Error::ShapeMismatch {
            mask_width: overlay.width(),
            mask_height: overlay.height(),
            image_width: image.width(),
            image_height: image.height(),
        });
    }

    let mut out = image.clone();
    let row_bytes = image.width() as usize * 4;
    if row_bytes == 0 {
        return Ok(out);
    }
    let top = overlay.as_raw();
    let buf: &mut [u8] = &mut out;
    buf.par_chunks_mut(row_bytes)
        .zip(top.par_chunks(row_bytes))
        .for_each(|(dst_row, top_row)| {
            for (dst, src) in dst_row.chunks_exact_mut(4).zip(top_row.chunks_exact(4)) {
                let blended = blend_over(
                    Rgba([dst[0], dst[1], dst[2], dst[3]]),
                    Rgba([src[0], src[1], src[2], src[3]]),
                    opacity,
                );
                dst.copy_from_slice(&blended.0);
            }
        });
    Ok(out)
}

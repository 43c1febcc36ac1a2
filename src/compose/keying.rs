//! Luminance keying and shape recoloring for generated line art.
//!
//! Generated subjects are white shapes on a black background. For any
//! background mode other than "original" the black has to go and the white
//! may be remapped to an arbitrary hue, while anti-aliased gray edges keep
//! their shading.

use rayon::prelude::*;

use crate::compose::raster::Raster;
use crate::compose::settings::Rgb8;
use crate::foundation::math::mul_div255;

/// Channel floor above which a pixel counts as part of the drawn shape.
const SHAPE_CUTOFF: u8 = 200;

/// Key out dark background pixels and recolor shape pixels in place.
///
/// - all channels strictly below `threshold`: fully transparent
/// - all channels strictly above 200: recolored to `shape_color`, scaled by
///   the pixel's average brightness so white maps to the exact target and
///   slightly-dimmer pixels keep their ratio
/// - anything else (edges, midtones) is left untouched
///
/// Runs row-parallel; each rayon task owns a disjoint row range.
#[tracing::instrument(skip(subject))]
pub fn key_and_recolor(subject: &mut Raster, threshold: u8, shape_color: Rgb8) {
    let row_bytes = (subject.width as usize) * 4;
    if row_bytes == 0 {
        return;
    }
    subject
        .data
        .par_chunks_mut(row_bytes)
        .for_each(|row| key_row(row, threshold, shape_color));
}

fn key_row(row: &mut [u8], threshold: u8, shape_color: Rgb8) {
    for px in row.chunks_exact_mut(4) {
        let (r, g, b) = (px[0], px[1], px[2]);
        if r < threshold && g < threshold && b < threshold {
            px[3] = 0;
        } else if r > SHAPE_CUTOFF && g > SHAPE_CUTOFF && b > SHAPE_CUTOFF {
            let brightness = (u16::from(r) + u16::from(g) + u16::from(b)) / 3;
            px[0] = mul_div255(brightness, u16::from(shape_color[0]));
            px[1] = mul_div255(brightness, u16::from(shape_color[1]));
            px[2] = mul_div255(brightness, u16::from(shape_color[2]));
        }
    }
}

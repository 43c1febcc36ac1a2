//! Background layer synthesis: the first full-canvas pass of every render.

use crate::compose::raster::Raster;
use crate::compose::settings::{BackgroundMode, Rgb8};
use crate::foundation::math::{Rng64, lerp_u8};

/// Gradient stops for the "shiny" radial mode: three dark grays to black.
const SHINY_STOPS: [(f32, Rgb8); 4] = [
    (0.0, [58, 58, 58]),
    (0.35, [36, 36, 36]),
    (0.7, [18, 18, 18]),
    (1.0, [0, 0, 0]),
];

/// Stops for the "metal" diagonal mode: alternating near-black banding.
const METAL_STOPS: [(f32, Rgb8); 5] = [
    (0.0, [24, 24, 24]),
    (0.25, [8, 8, 8]),
    (0.5, [30, 30, 30]),
    (0.75, [10, 10, 10]),
    (1.0, [20, 20, 20]),
];

const SCRATCH_BASE: Rgb8 = [10, 10, 10];
const SCRATCH_COUNT: usize = 50;
const SCRATCH_ALPHA: f32 = 0.05;

/// Paint the background for `mode` over the whole canvas.
///
/// `rng` only matters for [`BackgroundMode::Scratched`]; scratch placement
/// is not required to be reproducible, just visually similar run to run.
pub fn paint(canvas: &mut Raster, mode: BackgroundMode, custom: Rgb8, rng: &mut Rng64) {
    match mode {
        BackgroundMode::Original => canvas.fill([0, 0, 0]),
        BackgroundMode::Custom => canvas.fill(custom),
        BackgroundMode::Shiny => paint_shiny(canvas),
        BackgroundMode::Metal => paint_metal(canvas),
        BackgroundMode::Scratched => paint_scratched(canvas, rng),
    }
}

fn sample_stops(stops: &[(f32, Rgb8)], t: f32) -> Rgb8 {
    let t = t.clamp(0.0, 1.0);
    let mut prev = stops[0];
    for &stop in stops {
        if t <= stop.0 {
            let span = stop.0 - prev.0;
            let local = if span > 0.0 { (t - prev.0) / span } else { 1.0 };
            return [
                lerp_u8(prev.1[0], stop.1[0], local),
                lerp_u8(prev.1[1], stop.1[1], local),
                lerp_u8(prev.1[2], stop.1[2], local),
            ];
        }
        prev = stop;
    }
    stops[stops.len() - 1].1
}

/// Radial gradient centered at one-third height, radius = longer dimension.
fn paint_shiny(canvas: &mut Raster) {
    let (w, h) = (canvas.width as f32, canvas.height as f32);
    let (cx, cy) = (w / 2.0, h / 3.0);
    let radius = w.max(h);
    for y in 0..canvas.height {
        for x in 0..canvas.width {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            let t = (dx * dx + dy * dy).sqrt() / radius;
            let c = sample_stops(&SHINY_STOPS, t);
            canvas.put_pixel(x, y, [c[0], c[1], c[2], 255]);
        }
    }
}

/// Five-stop linear gradient projected along the canvas diagonal.
fn paint_metal(canvas: &mut Raster) {
    let (w, h) = (canvas.width as f32, canvas.height as f32);
    let norm = w * w + h * h;
    for y in 0..canvas.height {
        for x in 0..canvas.width {
            let t = (x as f32 * w + y as f32 * h) / norm;
            let c = sample_stops(&METAL_STOPS, t);
            canvas.put_pixel(x, y, [c[0], c[1], c[2], 255]);
        }
    }
}

/// Near-black base plus fifty faint scratch segments at random angles.
fn paint_scratched(canvas: &mut Raster, rng: &mut Rng64) {
    canvas.fill(SCRATCH_BASE);
    let (w, h) = (f64::from(canvas.width), f64::from(canvas.height));
    for _ in 0..SCRATCH_COUNT {
        let x0 = rng.next_range(0.0, w);
        let y0 = rng.next_range(0.0, h);
        let angle = rng.next_range(0.0, std::f64::consts::PI);
        let len = rng.next_range(50.0, 200.0);
        let (dx, dy) = (angle.cos(), angle.sin());
        let steps = len.round() as u32;
        for i in 0..steps {
            let px = x0 + dx * f64::from(i);
            let py = y0 + dy * f64::from(i);
            canvas.blend_pixel(
                px.round() as i64,
                py.round() as i64,
                [255, 255, 255],
                SCRATCH_ALPHA,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas() -> Raster {
        Raster::new(64, 96)
    }

    #[test]
    fn original_is_solid_black() {
        let mut c = canvas();
        paint(&mut c, BackgroundMode::Original, [90, 1, 2], &mut Rng64::new(1));
        assert!(c.data.chunks_exact(4).all(|p| p == [0, 0, 0, 255]));
    }

    #[test]
    fn custom_uses_chosen_color() {
        let mut c = canvas();
        paint(&mut c, BackgroundMode::Custom, [12, 34, 56], &mut Rng64::new(1));
        assert_eq!(c.pixel(10, 10), [12, 34, 56, 255]);
    }

    #[test]
    fn shiny_is_brightest_near_center_third() {
        let mut c = canvas();
        paint(&mut c, BackgroundMode::Shiny, [0, 0, 0], &mut Rng64::new(1));
        let center = c.pixel(32, 32)[0];
        let corner = c.pixel(0, 95)[0];
        assert!(center > corner, "center {center} should exceed corner {corner}");
    }

    #[test]
    fn metal_stays_near_black() {
        let mut c = canvas();
        paint(&mut c, BackgroundMode::Metal, [0, 0, 0], &mut Rng64::new(1));
        assert!(c.data.chunks_exact(4).all(|p| p[0] <= 40 && p[3] == 255));
        // Banding: gradient is not a constant fill.
        assert_ne!(c.pixel(0, 0), c.pixel(32, 48));
    }

    #[test]
    fn scratched_adds_faint_texture_over_base() {
        let mut c = canvas();
        paint(&mut c, BackgroundMode::Scratched, [0, 0, 0], &mut Rng64::new(9));
        let brightened = c
            .data
            .chunks_exact(4)
            .filter(|p| p[0] > SCRATCH_BASE[0])
            .count();
        assert!(brightened > 0, "scratches should brighten some pixels");
        // Faint noise, not a repaint: mean brightness stays near the base.
        let sum: u64 = c.data.chunks_exact(4).map(|p| u64::from(p[0])).sum();
        let mean = sum / (u64::from(c.width) * u64::from(c.height));
        assert!(mean < 40, "mean red channel {mean} too bright for scratches");
    }

    #[test]
    fn scratched_is_reproducible_for_a_fixed_seed() {
        let mut a = canvas();
        let mut b = canvas();
        paint(&mut a, BackgroundMode::Scratched, [0, 0, 0], &mut Rng64::new(5));
        paint(&mut b, BackgroundMode::Scratched, [0, 0, 0], &mut Rng64::new(5));
        assert_eq!(a.data, b.data);
    }

    #[test]
    fn stop_sampling_hits_endpoints() {
        assert_eq!(sample_stops(&SHINY_STOPS, 0.0), [58, 58, 58]);
        assert_eq!(sample_stops(&SHINY_STOPS, 1.0), [0, 0, 0]);
        assert_eq!(sample_stops(&METAL_STOPS, 2.0), [20, 20, 20]);
    }
}

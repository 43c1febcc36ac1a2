//! The poster compositor: one synchronous pass from settings to pixels.
//!
//! Every settings change re-renders from scratch onto a fresh canvas; there
//! is no partial redraw and therefore no stale-layer state to invalidate.
//! Pass order is fixed: background, subject, guides, vignette, caption,
//! quote. Export re-renders once with guides forcibly suppressed.

use crate::compose::background;
use crate::compose::keying::key_and_recolor;
use crate::compose::raster::Raster;
use crate::compose::settings::{BackgroundMode, PosterSettings};
use crate::compose::text::{self, TextEngine, caption_size_px, quote_size_px};
use crate::foundation::error::PosterResult;
use crate::foundation::math::Rng64;
use crate::metaphor::model::MetaphorResult;

const CAPTION_OPACITY: f32 = 0.85;
const GUIDE_GREEN: [u8; 3] = [0, 255, 128];
const GUIDE_SNAP_PCT: f32 = 2.0;
const GRID_ALPHA: f32 = 0.12;
const GRID_INSET: f32 = 0.05;
const DASH_ON: u32 = 12;
const DASH_OFF: u32 = 8;
const VIGNETTE_START: f32 = 0.4;
const VIGNETTE_MAX_ALPHA: f32 = 0.75;

/// Scaled size and draw origin for the subject layer.
///
/// The subject is centered on its normalized position:
/// `draw_x = canvas_w * x% - scaled_w / 2`, same for y. The origin may be
/// negative; blitting clips.
pub fn placement(
    canvas_w: u32,
    canvas_h: u32,
    nat_w: u32,
    nat_h: u32,
    scale: f32,
    x_pct: f32,
    y_pct: f32,
) -> (i64, i64, u32, u32) {
    let scaled_w = ((nat_w as f32) * scale).round().max(1.0) as u32;
    let scaled_h = ((nat_h as f32) * scale).round().max(1.0) as u32;
    let x = ((canvas_w as f32) * x_pct / 100.0 - (scaled_w as f32) / 2.0).round() as i64;
    let y = ((canvas_h as f32) * y_pct / 100.0 - (scaled_h as f32) / 2.0).round() as i64;
    (x, y, scaled_w, scaled_h)
}

pub struct PosterCompositor {
    text: TextEngine,
    rng: Rng64,
}

impl Default for PosterCompositor {
    fn default() -> Self {
        Self::new()
    }
}

impl PosterCompositor {
    pub fn new() -> Self {
        Self {
            text: TextEngine::new(),
            rng: Rng64::from_entropy(),
        }
    }

    /// Seeded variant; scratched backgrounds become reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            text: TextEngine::new(),
            rng: Rng64::new(seed),
        }
    }

    /// Render one poster frame.
    ///
    /// `subject` is `None` when no image is available (never loaded, or the
    /// decode failed upstream); the poster still renders without it.
    /// `font_bytes` may be empty as long as no text layer has content.
    #[tracing::instrument(skip_all)]
    pub fn render(
        &mut self,
        metaphor: &MetaphorResult,
        subject: Option<&Raster>,
        settings: &PosterSettings,
        font_bytes: &[u8],
    ) -> PosterResult<Raster> {
        settings.validate()?;

        let (width, height) = settings.aspect.dimensions();
        let mut canvas = Raster::new(width, height);

        background::paint(
            &mut canvas,
            settings.background,
            settings.bg_color,
            &mut self.rng,
        );

        if let Some(subject) = subject {
            self.draw_subject(&mut canvas, subject, settings)?;
        }

        if settings.show_guides {
            draw_guides(&mut canvas, settings);
        }

        draw_vignette(&mut canvas);

        if settings.show_caption && !settings.caption.trim().is_empty() {
            let size = caption_size_px(width, height);
            let y = (height as f32) * settings.caption_y_pct / 100.0;
            text::draw_text_block(
                &mut canvas,
                &mut self.text,
                font_bytes,
                &[settings.caption.as_str()],
                size,
                y,
                [255, 255, 255],
                CAPTION_OPACITY,
            )?;
        }

        let quote = quote_lines(metaphor, settings);
        if !quote.is_empty() {
            let size = quote_size_px(width, height);
            let y = (height as f32) * settings.quote_y_pct / 100.0;
            let refs: Vec<&str> = quote.iter().map(String::as_str).collect();
            text::draw_text_block(
                &mut canvas,
                &mut self.text,
                font_bytes,
                &refs,
                size,
                y,
                [255, 255, 255],
                1.0,
            )?;
        }

        Ok(canvas)
    }

    /// Render with guides forcibly suppressed and encode as PNG.
    pub fn export_png(
        &mut self,
        metaphor: &MetaphorResult,
        subject: Option<&Raster>,
        settings: &PosterSettings,
        font_bytes: &[u8],
    ) -> PosterResult<Vec<u8>> {
        let mut clean = settings.clone();
        clean.show_guides = false;
        let frame = self.render(metaphor, subject, &clean, font_bytes)?;
        frame.encode_png()
    }

    fn draw_subject(
        &mut self,
        canvas: &mut Raster,
        subject: &Raster,
        settings: &PosterSettings,
    ) -> PosterResult<()> {
        // Keying operates on a full-resolution copy before any scaling so
        // edge pixels are classified at native precision.
        let prepared = if settings.background == BackgroundMode::Original {
            subject.clone()
        } else {
            let mut keyed = subject.clone();
            key_and_recolor(&mut keyed, settings.threshold, settings.shape_color);
            keyed
        };

        let (x, y, w, h) = placement(
            canvas.width,
            canvas.height,
            subject.width,
            subject.height,
            settings.scale,
            settings.x_pct,
            settings.y_pct,
        );
        let scaled = if (w, h) == (prepared.width, prepared.height) {
            prepared
        } else {
            prepared.resized(w, h)?
        };
        canvas.blit_over(&scaled, (x, y));
        Ok(())
    }
}

// Per-line fallback: each override replaces only its own line, the other
// keeps the metaphor's best quote. An override of "" blanks a line.
fn quote_lines(metaphor: &MetaphorResult, settings: &PosterSettings) -> Vec<String> {
    let line1 = settings
        .quote_line1
        .clone()
        .unwrap_or_else(|| metaphor.step4_best.line1.clone());
    let line2 = settings
        .quote_line2
        .clone()
        .unwrap_or_else(|| metaphor.step4_best.line2.clone());
    [line1, line2]
        .into_iter()
        .filter(|l| !l.trim().is_empty())
        .collect()
}

fn draw_vignette(canvas: &mut Raster) {
    let h = canvas.height as f32;
    let start = h * VIGNETTE_START;
    let span = h - start;
    for y in 0..canvas.height {
        let fy = y as f32;
        if fy < start {
            continue;
        }
        let alpha = VIGNETTE_MAX_ALPHA * (fy - start) / span;
        for x in 0..canvas.width {
            canvas.blend_pixel(i64::from(x), i64::from(y), [0, 0, 0], alpha);
        }
    }
}

fn draw_guides(canvas: &mut Raster, settings: &PosterSettings) {
    let (w, h) = (canvas.width, canvas.height);

    // Always-on faint grid: center cross plus thirds, inset from the edges.
    let x_span = ((w as f32 * GRID_INSET) as u32, (w as f32 * (1.0 - GRID_INSET)) as u32);
    let y_span = ((h as f32 * GRID_INSET) as u32, (h as f32 * (1.0 - GRID_INSET)) as u32);
    for x in [w / 2, w / 3, 2 * w / 3] {
        draw_vline(canvas, x, y_span.0, y_span.1, [255, 255, 255], GRID_ALPHA, None);
    }
    for y in [h / 2, h / 3, 2 * h / 3] {
        draw_hline(canvas, y, x_span.0, x_span.1, [255, 255, 255], GRID_ALPHA, None);
    }

    // Snap indicator: dashed crosshair on any axis within 2 points of center.
    if (settings.x_pct - 50.0).abs() <= GUIDE_SNAP_PCT {
        draw_vline(canvas, w / 2, 0, h, GUIDE_GREEN, 0.9, Some((DASH_ON, DASH_OFF)));
    }
    if (settings.y_pct - 50.0).abs() <= GUIDE_SNAP_PCT {
        draw_hline(canvas, h / 2, 0, w, GUIDE_GREEN, 0.9, Some((DASH_ON, DASH_OFF)));
    }
}

fn draw_vline(
    canvas: &mut Raster,
    x: u32,
    y0: u32,
    y1: u32,
    color: [u8; 3],
    alpha: f32,
    dash: Option<(u32, u32)>,
) {
    for y in y0..y1 {
        if let Some((on, off)) = dash {
            if (y - y0) % (on + off) >= on {
                continue;
            }
        }
        canvas.blend_pixel(i64::from(x), i64::from(y), color, alpha);
    }
}

fn draw_hline(
    canvas: &mut Raster,
    y: u32,
    x0: u32,
    x1: u32,
    color: [u8; 3],
    alpha: f32,
    dash: Option<(u32, u32)>,
) {
    for x in x0..x1 {
        if let Some((on, off)) = dash {
            if (x - x0) % (on + off) >= on {
                continue;
            }
        }
        canvas.blend_pixel(i64::from(x), i64::from(y), color, alpha);
    }
}

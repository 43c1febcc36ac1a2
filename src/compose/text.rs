//! Text layers: parley shaping, vello_cpu glyph rasterization.
//!
//! Both overlays (caption and quote) are centered horizontally; the quote is
//! additionally centered as a block around its target Y so one- and two-line
//! quotes sit on the same visual anchor. Glyphs are filled into a transparent
//! pixmap and composited over the canvas in one premultiplied pass.

use crate::compose::raster::Raster;
use crate::compose::settings::Rgb8;
use crate::foundation::error::{PosterError, PosterResult};

/// Caption font size as a fraction of the shorter canvas dimension.
pub const CAPTION_SIZE_RATIO: f32 = 0.024;
/// Quote font size as a fraction of the shorter canvas dimension.
pub const QUOTE_SIZE_RATIO: f32 = 0.032;
/// Line height multiplier for multi-line quote blocks.
pub const LINE_SPACING: f32 = 1.3;

pub fn caption_size_px(width: u32, height: u32) -> f32 {
    (width.min(height) as f32) * CAPTION_SIZE_RATIO
}

pub fn quote_size_px(width: u32, height: u32) -> f32 {
    (width.min(height) as f32) * QUOTE_SIZE_RATIO
}

/// Baseline Y of each line in a block of `count` lines anchored on
/// `center_y`: the first baseline sits at `center_y - total/2`, each
/// following baseline one `line_height` below it.
pub fn block_baselines(center_y: f32, count: usize, line_height: f32) -> Vec<f32> {
    let total = line_height * count as f32;
    (0..count)
        .map(|i| center_y - total / 2.0 + line_height * i as f32)
        .collect()
}

/// Translation Y that puts a laid-out line's baseline at `baseline`. The
/// layout origin is its top edge, one ascent above the baseline.
pub fn line_top(baseline: f32, ascent: f32) -> f32 {
    baseline - ascent
}

/// RGBA8 brush carried through Parley layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextBrush {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl TextBrush {
    pub fn opaque(c: Rgb8) -> Self {
        Self {
            r: c[0],
            g: c[1],
            b: c[2],
            a: 255,
        }
    }
}

/// Shaping/layout engine; owns the Parley contexts so font registration is
/// amortized across layers of one render.
pub struct TextEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrush>,
}

impl Default for TextEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextEngine {
    pub fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
        }
    }

    /// Shape and lay out a single line with the provided font bytes.
    pub fn layout_line(
        &mut self,
        text: &str,
        font_bytes: &[u8],
        size_px: f32,
        brush: TextBrush,
    ) -> PosterResult<parley::Layout<TextBrush>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(PosterError::render("text size_px must be finite and > 0"));
        }

        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.to_vec()), None);
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            PosterError::render("no font families registered from font bytes")
        })?;
        let family_name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| PosterError::render("registered font family has no name"))?
            .to_string();

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family_name)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrush> = builder.build(text);
        layout.break_all_lines(None);
        Ok(layout)
    }
}

/// Rasterize `lines` as one block and composite it over the canvas.
///
/// Each line is centered horizontally on its own; the block is centered
/// vertically on `center_y`. Empty lines are skipped; if nothing remains the
/// call is a no-op and no font is touched.
pub fn draw_text_block(
    canvas: &mut Raster,
    engine: &mut TextEngine,
    font_bytes: &[u8],
    lines: &[&str],
    size_px: f32,
    center_y: f32,
    color: Rgb8,
    opacity: f32,
) -> PosterResult<()> {
    let lines: Vec<&str> = lines
        .iter()
        .copied()
        .filter(|l| !l.trim().is_empty())
        .collect();
    if lines.is_empty() {
        return Ok(());
    }
    if font_bytes.is_empty() {
        // Text was requested but no font is available: an environment
        // precondition failure, not bad input data.
        return Err(PosterError::render("font bytes required to draw text"));
    }

    let width: u16 = canvas
        .width
        .try_into()
        .map_err(|_| PosterError::render("canvas width exceeds u16"))?;
    let height: u16 = canvas
        .height
        .try_into()
        .map_err(|_| PosterError::render("canvas height exceeds u16"))?;

    let line_height = size_px * LINE_SPACING;
    let baselines = block_baselines(center_y, lines.len(), line_height);
    let brush = TextBrush::opaque(color);
    let font =
        vello_cpu::peniko::FontData::new(vello_cpu::peniko::Blob::from(font_bytes.to_vec()), 0);

    let mut ctx = vello_cpu::RenderContext::new(width, height);
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);

    for (text, baseline) in lines.iter().zip(baselines) {
        let layout = engine.layout_line(text, font_bytes, size_px, brush)?;
        let ascent = layout
            .lines()
            .next()
            .map(|l| l.metrics().ascent)
            .unwrap_or(0.0);
        let x = (canvas.width as f32 - layout.width()) / 2.0;
        ctx.set_transform(vello_cpu::kurbo::Affine::translate((
            f64::from(x),
            f64::from(line_top(baseline, ascent)),
        )));

        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let b = run.style().brush;
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(b.r, b.g, b.b, b.a));
                let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                ctx.glyph_run(&font)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }
    }

    let mut pixmap = vello_cpu::Pixmap::new(width, height);
    ctx.flush();
    ctx.render_to_pixmap(&mut pixmap);
    canvas.blend_premul_layer(pixmap.data_as_u8_slice(), opacity)
}

//! User-driven composition settings and the persisted preset format.

use crate::foundation::error::{PosterError, PosterResult};

/// Output canvas presets. All share a 1080px width.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AspectRatio {
    #[default]
    Square,
    Portrait45,
    Portrait916,
}

impl AspectRatio {
    /// Pixel dimensions of the output canvas.
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            Self::Square => (1080, 1080),
            Self::Portrait45 => (1080, 1350),
            Self::Portrait916 => (1080, 1920),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundMode {
    /// Solid black; the subject image is drawn untouched.
    #[default]
    Original,
    /// Solid fill with the user-chosen color.
    Custom,
    /// Radial gradient centered at one-third height.
    Shiny,
    /// Five-stop diagonal gradient, brushed-metal banding.
    Metal,
    /// Near-black base with faint random scratches.
    Scratched,
}

/// RGB color, no alpha. Alpha is a per-layer concern in the compositor.
pub type Rgb8 = [u8; 3];

/// Parse `#rrggbb` (leading `#` optional).
pub fn parse_hex_color(s: &str) -> Option<Rgb8> {
    let hex = s.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some([r, g, b])
}

/// Format a color as `#rrggbb`.
pub fn hex_color(c: Rgb8) -> String {
    format!("#{:02x}{:02x}{:02x}", c[0], c[1], c[2])
}

/// The full snapshot of settings a render reads.
///
/// These are ephemeral and user-driven; presets persist them as a
/// [`SettingsPatch`], never as domain truth.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PosterSettings {
    pub aspect: AspectRatio,
    /// Subject scale factor relative to its native resolution.
    pub scale: f32,
    /// Subject center, percent of canvas width.
    pub x_pct: f32,
    /// Subject center, percent of canvas height.
    pub y_pct: f32,
    /// Caption ("top text") line.
    pub caption: String,
    pub show_caption: bool,
    pub caption_y_pct: f32,
    /// Quote overrides; `None` falls back to the metaphor's best quote.
    pub quote_line1: Option<String>,
    pub quote_line2: Option<String>,
    pub quote_y_pct: f32,
    /// Font label, resolved to font bytes by the caller.
    pub font: String,
    pub background: BackgroundMode,
    pub bg_color: Rgb8,
    /// Recolor target for "shape" (near-white) subject pixels.
    pub shape_color: Rgb8,
    /// Luminance keying cutoff: pixels with all channels strictly below
    /// this become transparent in non-original background modes.
    pub threshold: u8,
    /// Alignment guides; forcibly suppressed on export.
    pub show_guides: bool,
}

impl Default for PosterSettings {
    fn default() -> Self {
        Self {
            aspect: AspectRatio::Square,
            scale: 1.0,
            x_pct: 50.0,
            y_pct: 50.0,
            caption: String::new(),
            show_caption: false,
            caption_y_pct: 10.0,
            quote_line1: None,
            quote_line2: None,
            quote_y_pct: 82.0,
            font: "Helvetica".to_string(),
            background: BackgroundMode::Original,
            bg_color: [0, 0, 0],
            shape_color: [255, 255, 255],
            threshold: 40,
            show_guides: true,
        }
    }
}

impl PosterSettings {
    pub fn validate(&self) -> PosterResult<()> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(PosterError::render("scale must be finite and > 0"));
        }
        for (name, v) in [
            ("x", self.x_pct),
            ("y", self.y_pct),
            ("caption_y", self.caption_y_pct),
            ("quote_y", self.quote_y_pct),
        ] {
            if !v.is_finite() {
                return Err(PosterError::render(format!(
                    "{name} position must be finite"
                )));
            }
        }
        Ok(())
    }
}

/// A fully-optional settings patch: the persisted preset payload.
///
/// Field names match the historical on-disk format. Missing fields leave
/// the corresponding live setting unchanged, which keeps old presets
/// loadable forever.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
    /// Legacy single-string quote text; superseded by `quoteLine1/2`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bg: Option<BackgroundMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bg_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clean: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_top_text: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_text_y: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_line1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_line2: Option<String>,
}

impl SettingsPatch {
    /// Merge this patch into live settings, overwriting only present fields.
    ///
    /// Color strings that fail to parse are treated as absent.
    pub fn apply(&self, s: &mut PosterSettings) {
        if let Some(v) = self.scale {
            s.scale = v;
        }
        if let Some(v) = self.x {
            s.x_pct = v;
        }
        if let Some(v) = self.y {
            s.y_pct = v;
        }
        // The legacy `text` field predates the two-line quote; it maps to
        // line 1 and clears line 2, then explicit line fields win.
        if let Some(v) = &self.text {
            s.quote_line1 = Some(v.clone());
            s.quote_line2 = Some(String::new());
        }
        if let Some(v) = &self.font {
            s.font = v.clone();
        }
        if let Some(v) = self.bg {
            s.background = v;
        }
        if let Some(c) = self.bg_color.as_deref().and_then(parse_hex_color) {
            s.bg_color = c;
        }
        if let Some(c) = self.shape_color.as_deref().and_then(parse_hex_color) {
            s.shape_color = c;
        }
        if let Some(v) = self.clean {
            s.threshold = v;
        }
        if let Some(v) = &self.top_text {
            s.caption = v.clone();
        }
        if let Some(v) = self.show_top_text {
            s.show_caption = v;
        }
        if let Some(v) = self.top_text_y {
            s.caption_y_pct = v;
        }
        if let Some(v) = &self.quote_line1 {
            s.quote_line1 = Some(v.clone());
        }
        if let Some(v) = &self.quote_line2 {
            s.quote_line2 = Some(v.clone());
        }
    }
}

/// A named, persisted bundle of compositor settings.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Preset {
    pub name: String,
    pub settings: SettingsPatch,
}

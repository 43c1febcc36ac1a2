//! Straight-alpha RGBA8 pixel buffers and the blend/blit primitives the
//! compositor is built on.
//!
//! The canvas is opaque end-to-end (the background pass fills every pixel),
//! so the over operators here take the opaque-destination fast path. Subject
//! and text layers carry real alpha on the source side only.

use anyhow::Context as _;

use crate::compose::settings::Rgb8;
use crate::foundation::error::{PosterError, PosterResult};
use crate::foundation::math::mul_div255;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    /// Row-major straight-alpha RGBA8.
    pub data: Vec<u8>,
}

impl Raster {
    /// Fully transparent buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; (width as usize) * (height as usize) * 4],
        }
    }

    /// Opaque buffer filled with one color.
    pub fn filled(width: u32, height: u32, color: Rgb8) -> Self {
        let mut r = Self::new(width, height);
        r.fill(color);
        r
    }

    pub fn from_rgba8(width: u32, height: u32, data: Vec<u8>) -> PosterResult<Self> {
        let expect = (width as usize) * (height as usize) * 4;
        if data.len() != expect {
            return Err(PosterError::decode(format!(
                "rgba8 buffer is {} bytes, expected {expect} for {width}x{height}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Decode encoded image bytes (PNG/JPEG) into straight-alpha RGBA8.
    pub fn decode(bytes: &[u8]) -> PosterResult<Self> {
        let dyn_img = image::load_from_memory(bytes)
            .map_err(|e| PosterError::decode(format!("image decode failed: {e}")))?;
        let rgba = dyn_img.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Self {
            width,
            height,
            data: rgba.into_raw(),
        })
    }

    /// Encode as PNG (the one lossless export format).
    pub fn encode_png(&self) -> PosterResult<Vec<u8>> {
        let img = image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| PosterError::render("raster buffer size mismatch"))?;
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png)
            .context("encode poster png")?;
        Ok(out.into_inner())
    }

    /// Resample to a new size (triangle filter).
    pub fn resized(&self, width: u32, height: u32) -> PosterResult<Self> {
        let img = image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| PosterError::render("raster buffer size mismatch"))?;
        let scaled =
            image::imageops::resize(&img, width, height, image::imageops::FilterType::Triangle);
        Ok(Self {
            width,
            height,
            data: scaled.into_raw(),
        })
    }

    pub fn fill(&mut self, color: Rgb8) {
        for px in self.data.chunks_exact_mut(4) {
            px[0] = color[0];
            px[1] = color[1];
            px[2] = color[2];
            px[3] = 255;
        }
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        ((y as usize) * (self.width as usize) + (x as usize)) * 4
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.index(x, y);
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    pub fn put_pixel(&mut self, x: u32, y: u32, px: [u8; 4]) {
        let i = self.index(x, y);
        self.data[i..i + 4].copy_from_slice(&px);
    }

    /// Blend one straight-alpha pixel over the (opaque) canvas.
    ///
    /// Out-of-bounds coordinates are ignored, which keeps line and guide
    /// drawing free of bounds bookkeeping.
    pub fn blend_pixel(&mut self, x: i64, y: i64, color: Rgb8, alpha: f32) {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return;
        }
        let a = ((alpha.clamp(0.0, 1.0) * 255.0).round() as u32).min(255) as u16;
        if a == 0 {
            return;
        }
        let i = self.index(x as u32, y as u32);
        let inv = 255 - a;
        for c in 0..3 {
            let s = mul_div255(u16::from(color[c]), a);
            let d = mul_div255(u16::from(self.data[i + c]), inv);
            self.data[i + c] = s.saturating_add(d);
        }
        self.data[i + 3] = 255;
    }

    /// Src-over blit of a straight-alpha raster at `origin` (may be negative
    /// or extend past the canvas; out-of-range rows/columns are clipped).
    pub fn blit_over(&mut self, src: &Raster, origin: (i64, i64)) {
        for sy in 0..src.height {
            let dy = origin.1 + i64::from(sy);
            if dy < 0 || dy >= i64::from(self.height) {
                continue;
            }
            for sx in 0..src.width {
                let dx = origin.0 + i64::from(sx);
                if dx < 0 || dx >= i64::from(self.width) {
                    continue;
                }
                let [r, g, b, a] = src.pixel(sx, sy);
                if a == 0 {
                    continue;
                }
                let di = self.index(dx as u32, dy as u32);
                if a == 255 {
                    self.data[di] = r;
                    self.data[di + 1] = g;
                    self.data[di + 2] = b;
                    self.data[di + 3] = 255;
                    continue;
                }
                let a16 = u16::from(a);
                let inv = 255 - a16;
                for (c, s) in [r, g, b].into_iter().enumerate() {
                    let sc = mul_div255(u16::from(s), a16);
                    let dc = mul_div255(u16::from(self.data[di + c]), inv);
                    self.data[di + c] = sc.saturating_add(dc);
                }
                self.data[di + 3] = 255;
            }
        }
    }

    /// Composite a same-sized premultiplied RGBA8 layer over the canvas,
    /// scaled by `opacity`. Used for rasterized text layers.
    pub fn blend_premul_layer(&mut self, premul: &[u8], opacity: f32) -> PosterResult<()> {
        if premul.len() != self.data.len() {
            return Err(PosterError::render(
                "premultiplied layer size does not match canvas",
            ));
        }
        let op = ((opacity.clamp(0.0, 1.0) * 255.0).round() as u32).min(255) as u16;
        if op == 0 {
            return Ok(());
        }
        for (d, s) in self.data.chunks_exact_mut(4).zip(premul.chunks_exact(4)) {
            let sa = mul_div255(u16::from(s[3]), op);
            if sa == 0 {
                continue;
            }
            let inv = 255 - u16::from(sa);
            for c in 0..3 {
                let sc = mul_div255(u16::from(s[c]), op);
                let dc = mul_div255(u16::from(d[c]), inv);
                d[c] = sc.saturating_add(dc);
            }
            d[3] = 255;
        }
        Ok(())
    }
}

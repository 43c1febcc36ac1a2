//! Metaposter turns a described situation into a printable metaphor poster.
//!
//! The pipeline has three stages:
//!
//! 1. **Generate**: a text model produces a structured metaphor (or a
//!    rejection) for the user's situation; an image model optionally renders
//!    the metaphor's object as artwork.
//! 2. **Parse**: model output is recovered into a typed [`MetaphorResult`]
//!    through a fallback chain that tolerates fenced blocks, smart
//!    punctuation, and prose around the JSON.
//! 3. **Compose**: the artwork is keyed, recolored, and placed on a styled
//!    canvas with caption and quote layers, then exported as PNG.
//!
//! Design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Deterministic rendering**: given the same settings, image, and seed,
//!   a render is byte-for-byte reproducible.
//! - **No IO in the compositor**: network and disk access live in
//!   [`client`] and [`store`]; [`compose`] works on bytes in memory.
#![forbid(unsafe_code)]

pub mod client;
pub mod compose;
pub mod foundation;
pub mod metaphor;
pub mod store;

pub use client::api::{GeneratedImage, GenerationClient};
pub use client::track::{RequestToken, RequestTracker};
pub use compose::poster::{PosterCompositor, placement};
pub use compose::raster::Raster;
pub use compose::settings::{
    AspectRatio, BackgroundMode, PosterSettings, Preset, Rgb8, SettingsPatch, hex_color,
    parse_hex_color,
};
pub use foundation::error::{PosterError, PosterResult};
pub use metaphor::model::{MetaphorResponse, MetaphorResult, Step1};
pub use metaphor::parse::{ParseError, parse};
pub use metaphor::prompt::metaphor_prompt;
pub use store::library::{HistoryEntry, Library, Status};

pub mod background;
pub mod keying;
pub mod poster;
pub mod raster;
pub mod settings;
pub mod text;

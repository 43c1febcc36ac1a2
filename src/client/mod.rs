pub mod api;
pub mod track;

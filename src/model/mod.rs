pub mod pattern;
pub mod song;
pub mod track;

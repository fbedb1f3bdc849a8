//! Pad-loop pattern engine, timeline layout and block-move planner, with a
//! REPL front end for editing songs built from them.

pub mod config;
pub mod console;
pub mod editor;
pub mod model;
pub mod pattern;
pub mod repl;
pub mod storage;

//! The pad-loop pattern engine.
//!
//! Data flows one way per edit: a selection or drag decision calls a store
//! mutation, which yields a new pattern snapshot, from which the timeline is
//! derived again for display.

pub mod check;
pub mod drag;
pub mod duration;
pub mod notation;
pub mod pause;
pub mod planner;
pub mod schedule;
pub mod selection;
pub mod store;
pub mod timeline;

pub use drag::{Drag, Proposal};
pub use duration::{duration_of, quantize, snap_to_grid, PadLengths, Resolver};
pub use planner::{apply_block_move, materialize_block_move, plan_block_move, MoveMode, MovePlan};
pub use selection::Selections;
pub use timeline::{build_timeline, Timeline, Token};

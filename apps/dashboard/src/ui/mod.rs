//! Text rendering of dashboard frames.

pub mod render;

pub use render::{render, HELP};

//! Controller layer: operator commands typed at the prompt.

pub mod commands;

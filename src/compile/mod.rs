mod engine;
mod precedence;

pub use engine::{compile, Compiled};

//! External process execution.

mod lines;
mod runner;

pub use lines::LineSplitter;
pub use runner::{ExitKind, OutputSource, ProcessRunner, RunOutput, RunState};

// Header grouping CLI library
// Exposes the script runner for integration tests

pub mod script;

pub use script::{render_header, run, Replay, Script, ScriptError, ScriptOp, StepReport};

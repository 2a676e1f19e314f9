//! Workflow Module
//!
//! Glues session, capture, artifacts, synthesis and output into the `start`
//! and `compile` operations.

pub mod compiler;
pub mod recorder;
pub mod recording;

pub use compiler::{CompileOptions, CompileOutcome, Compiler, PreparedCompile};
pub use recorder::{read_summary, wait_for_release, Recorder};
pub use recording::{list_tasks, RecordedTask, TaskListing};

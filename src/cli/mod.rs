//! # Command-Line Interface
//!
//! Thin command surface over the domain layer. Commands parse arguments,
//! load the store through a [`Session`](session::Session), call into
//! [`crate::domain`] and render the result. No graph logic lives here.
//!
//! ## Command Groups
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Core | Project setup, work selection | `init`, `next` |
//! | Task | Task and subtask lifecycle | `task add`, `task status`, `task promote` |
//! | Deps | Dependency edges and integrity | `deps add`, `deps validate`, `deps fix` |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Logging
//!
//! Diagnostics go to stderr through `tracing`. Use `--verbose` (or `-v`)
//! for debug output, or set `TASKMAP_LOG`:
//! ```bash
//! TASKMAP_LOG=taskmap=info taskmap deps repair
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod output;
mod session;
mod task;
mod deps;

pub use app::{Cli, Commands, run};
pub use output::{Output, OutputFormat};

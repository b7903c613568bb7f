//! # Storage Layer
//!
//! Persistence for taskmap. The domain layer never touches the filesystem;
//! everything here turns files into a [`TasksDocument`](crate::domain::TasksDocument)
//! and back.
//!
//! ## Storage Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Tasks | JSON document | `.taskmap/tasks.json` |
//! | Project config | TOML | `.taskmap/config.toml` |
//! | Global config | TOML | platform config dir, `taskmap/config.toml` |
//!
//! ## Concurrency Safety
//!
//! - [`TaskFile`] takes `fs2` locks around reads and writes
//! - Writes are atomic (temp file + rename)
//!
//! ## Key Types
//!
//! - [`Project`] - Entry point for a taskmap project
//! - [`TaskFile`] - Read/write the task document
//! - [`Config`] - Project and global configuration

mod json;
mod config;
mod project;

pub use json::{StorageError, TaskFile};
pub use config::{Config, ConfigError, GlobalConfig, OutputFormat, ProjectConfig, RepairConfig, PROJECT_DIR};
pub use project::{Project, ProjectError};

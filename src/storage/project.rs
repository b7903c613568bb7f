//! Project management
//!
//! Handles project initialization and locates the task document.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::debug;

use super::config::{Config, ProjectConfig, PROJECT_DIR};
use super::json::TaskFile;
use crate::domain::TasksDocument;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Not in a taskmap project. Run 'taskmap init' first.")]
    NotInProject,

    #[error("Failed to create project: {0}")]
    CreateFailed(String),
}

/// A taskmap project: a directory containing `.taskmap/`
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    /// Opens an existing project at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        if !root.join(PROJECT_DIR).is_dir() {
            return Err(ProjectError::NotInProject.into());
        }

        let config = Config::for_project(&root)?;

        Ok(Self { root, config })
    }

    /// Opens the project at the current directory or a parent
    pub fn open_current() -> Result<Self> {
        let root = Config::find_project_root().ok_or(ProjectError::NotInProject)?;

        Self::open(root)
    }

    /// Initializes a new project at the given path
    ///
    /// Existing files are left alone, so running it twice is harmless.
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let project_dir = root.join(PROJECT_DIR);

        fs::create_dir_all(&project_dir).with_context(|| {
            format!(
                "Failed to create {} directory: {}",
                PROJECT_DIR,
                project_dir.display()
            )
        })?;

        let config_path = project_dir.join("config.toml");
        if !config_path.exists() {
            let defaults = toml::to_string_pretty(&ProjectConfig::default())
                .map_err(|e| ProjectError::CreateFailed(e.to_string()))?;
            let content = format!("# taskmap project configuration\n\n{}", defaults);
            fs::write(&config_path, content)
                .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
        }

        let project = Self::open(root)?;

        let task_file = project.task_file();
        if !task_file.exists() {
            task_file
                .save(&TasksDocument::default())
                .context("Failed to create task file")?;
        }

        debug!(root = %project.root.display(), "project initialized");
        Ok(project)
    }

    /// Returns the project root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the .taskmap directory path
    pub fn project_dir(&self) -> PathBuf {
        self.root.join(PROJECT_DIR)
    }

    /// Returns the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the gateway for this project's task document
    pub fn task_file(&self) -> TaskFile {
        TaskFile::new(self.project_dir().join(&self.config.project.tasks_file))
    }
}

//! Per-invocation state shared by the commands
//!
//! Resolves which task file to operate on and which repair settings apply,
//! then loads and saves the store around each command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::domain::{repair, RepairOptions, TaskStore};
use crate::storage::{Config, Project, RepairConfig, TaskFile};

pub struct Session {
    file: TaskFile,
    repair: RepairConfig,
}

impl Session {
    /// Uses `file` when given, otherwise the task file of the enclosing project
    pub fn open(file: Option<PathBuf>, config: &Config, no_enforce_progress: bool) -> Result<Self> {
        let file = match file {
            Some(path) => TaskFile::new(path),
            None => Project::open(config.require_project_root()?)?.task_file(),
        };

        let mut repair = config.project.repair.clone();
        if no_enforce_progress {
            repair.enforce_progress = false;
        }

        debug!(path = %file.path().display(), ?repair, "session opened");
        Ok(Self { file, repair })
    }

    pub fn repair_options(&self) -> RepairOptions {
        self.repair.options()
    }

    /// Loads and indexes the task document
    pub fn load(&self) -> Result<TaskStore> {
        let doc = self
            .file
            .load()
            .with_context(|| format!("Failed to load {}", self.file.path().display()))?;

        TaskStore::new(doc).with_context(|| format!("Invalid task file {}", self.file.path().display()))
    }

    /// Writes the store back, running the structural repair passes first when
    /// `auto_repair_on_save` is set
    pub fn save(&self, mut store: TaskStore) -> Result<()> {
        if self.repair.auto_repair_on_save {
            let report = repair(&mut store, self.repair_options());
            if report.changed() {
                info!(
                    duplicates = report.duplicates_removed,
                    containment = report.containment_edges_removed,
                    "repaired before save"
                );
            }
        }

        self.file
            .save(store.document())
            .with_context(|| format!("Failed to save {}", self.file.path().display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewTask, NodeId, Task};
    use crate::storage::{GlobalConfig, ProjectConfig};
    use tempfile::TempDir;

    fn config(repair: RepairConfig) -> Config {
        Config {
            project: ProjectConfig {
                repair,
                ..ProjectConfig::default()
            },
            global: GlobalConfig::default(),
            project_root: None,
        }
    }

    #[test]
    fn outside_project_without_file_fails() {
        let result = Session::open(None, &config(RepairConfig::default()), false);
        assert!(result.is_err());
    }

    #[test]
    fn flag_disables_progress_enforcement() {
        let dir = TempDir::new().unwrap();
        let session = Session::open(
            Some(dir.path().join("tasks.json")),
            &config(RepairConfig::default()),
            true,
        )
        .unwrap();

        assert!(!session.repair_options().enforce_progress);
    }

    #[test]
    fn auto_repair_runs_before_save() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.json");
        let session = Session::open(
            Some(path.clone()),
            &config(RepairConfig {
                enforce_progress: true,
                auto_repair_on_save: true,
            }),
            false,
        )
        .unwrap();

        let mut task = Task::new(1, "parent");
        task.dependencies = vec![NodeId::task(2), NodeId::task(2)];
        let mut store = TaskStore::from_tasks(vec![task]).unwrap();
        store.add_task(NewTask::new("dep"));
        session.save(store).unwrap();

        let loaded = session.load().unwrap();
        assert_eq!(loaded.dependencies_of(NodeId::task(1)).unwrap(), &[NodeId::task(2)]);
    }
}

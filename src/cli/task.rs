//! Task CLI commands

use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Subcommand;

use super::output::Output;
use super::session::Session;
use crate::domain::{
    add_dependency, is_eligible, DependencyGraph, NewTask, Node, NodeId, Priority, TaskStatus,
};

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Add a task, or a subtask with --parent
    ///
    /// Examples:
    ///   taskmap task add "Set up CI"
    ///   taskmap task add "Write routes" --parent 3 --depends-on 3.1
    Add {
        /// Task title
        title: String,

        /// Parent task ID (creates a subtask)
        #[arg(long)]
        parent: Option<u32>,

        /// Longer description
        #[arg(long, short, default_value = "")]
        description: String,

        /// Priority (high, medium, low)
        #[arg(long, short, default_value = "medium")]
        priority: Priority,

        /// Dependencies (repeatable), e.g. 2 or 3.1
        #[arg(long = "depends-on", value_name = "ID")]
        depends_on: Vec<NodeId>,
    },

    /// List tasks and their subtasks
    List {
        /// Only show nodes with this status
        #[arg(long)]
        status: Option<TaskStatus>,
    },

    /// Show task details
    Show {
        /// Task or subtask ID
        id: NodeId,
    },

    /// Set the status of a task or subtask
    ///
    /// Marking a task done also completes its subtasks.
    Status {
        /// Task or subtask ID
        id: NodeId,

        /// New status (pending, in-progress, done, review, deferred, cancelled)
        status: TaskStatus,
    },

    /// Remove a task or subtask and every reference to it
    Remove {
        /// Task or subtask ID
        id: NodeId,
    },

    /// Turn a subtask into a top-level task
    Promote {
        /// Subtask ID, e.g. 3.2
        id: NodeId,
    },

    /// Turn a task without subtasks into a subtask of another task
    Demote {
        /// Task to move
        task: u32,

        /// New parent task
        parent: u32,
    },
}

pub fn run(cmd: TaskCommands, session: &Session, output: &Output) -> Result<ExitCode> {
    match cmd {
        TaskCommands::Add {
            title,
            parent,
            description,
            priority,
            depends_on,
        } => {
            let new = NewTask {
                title,
                description,
                priority,
            };
            add_task(session, output, new, parent, &depends_on)?
        }
        TaskCommands::List { status } => list_tasks(session, output, status)?,
        TaskCommands::Show { id } => show_task(session, output, id)?,
        TaskCommands::Status { id, status } => set_status(session, output, id, status)?,
        TaskCommands::Remove { id } => remove_task(session, output, id)?,
        TaskCommands::Promote { id } => promote(session, output, id)?,
        TaskCommands::Demote { task, parent } => demote(session, output, task, parent)?,
    }

    Ok(ExitCode::SUCCESS)
}

fn add_task(
    session: &Session,
    output: &Output,
    new: NewTask,
    parent: Option<u32>,
    depends_on: &[NodeId],
) -> Result<()> {
    let mut store = session.load()?;
    let title = new.title.clone();

    let id = match parent {
        Some(parent) => store.add_subtask(parent, new)?,
        None => NodeId::task(store.add_task(new)),
    };

    // Nothing is saved unless every dependency passes the same checks as `deps add`
    for dep in depends_on {
        add_dependency(&mut store, id, *dep)
            .with_context(|| format!("Cannot add dependency {} -> {}", id, dep))?;
    }

    let dependencies = store.dependencies_of(id)?.to_vec();
    session.save(store)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "id": id,
            "title": title,
            "parent_id": id.parent(),
            "dependencies": dependencies,
        }));
    } else {
        output.success(&format!("Created task: {} - {}", id, title));
    }

    Ok(())
}

fn list_tasks(session: &Session, output: &Output, status: Option<TaskStatus>) -> Result<()> {
    let store = session.load()?;
    let wanted = |s: TaskStatus| status.map_or(true, |want| want == s);

    let nodes: Vec<Node<'_>> = store
        .node_ids()
        .into_iter()
        .filter_map(|id| store.resolve(id).ok())
        .filter(|node| wanted(node.status()))
        .collect();

    if output.is_json() {
        let items: Vec<_> = nodes
            .iter()
            .map(|node| {
                serde_json::json!({
                    "id": node.id(),
                    "title": node.title(),
                    "status": node.status(),
                    "priority": node.priority(),
                    "dependencies": node.dependencies(),
                    "parent_id": node.id().parent(),
                    "eligible": is_eligible(&store, node),
                })
            })
            .collect();
        output.data(&items);
    } else if nodes.is_empty() {
        println!("No tasks");
    } else {
        println!("{:<8} {:<12} {:<8} {:<16} TITLE", "ID", "STATUS", "PRIORITY", "DEPENDS ON");
        println!("{}", "-".repeat(70));

        for node in &nodes {
            let indent = if node.id().is_subtask() { "  " } else { "" };
            println!(
                "{:<8} {:<12} {:<8} {:<16} {}",
                node.id().to_string(),
                node.status(),
                node.priority(),
                join_ids(node.dependencies()),
                indent.to_string() + node.title()
            );
        }
    }

    Ok(())
}

fn show_task(session: &Session, output: &Output, id: NodeId) -> Result<()> {
    let store = session.load()?;
    let node = store.resolve(id)?;
    let dependents = DependencyGraph::from_store(&store).dependents(id);
    let eligible = is_eligible(&store, &node);

    if output.is_json() {
        let subtasks: Vec<NodeId> = match node {
            Node::Task(task) => task.subtask_ids().collect(),
            Node::Subtask { .. } => Vec::new(),
        };
        output.data(&serde_json::json!({
            "id": id,
            "title": node.title(),
            "status": node.status(),
            "priority": node.priority(),
            "description": description(&node),
            "dependencies": node.dependencies(),
            "dependents": dependents,
            "parent_id": id.parent(),
            "subtasks": subtasks,
            "eligible": eligible,
        }));
        return Ok(());
    }

    println!("Task: {}", id);
    println!("Title: {}", node.title());
    println!("Status: {}", node.status());
    println!("Priority: {}", node.priority());
    if let Some(parent) = node.parent() {
        println!("Parent: {} - {}", parent.id, parent.title);
    }

    let desc = description(&node);
    if !desc.is_empty() {
        println!("\nDescription:");
        println!("{}", desc);
    }

    if !node.dependencies().is_empty() {
        println!("\nDepends on:");
        for dep in node.dependencies() {
            match store.resolve(*dep) {
                Ok(d) => println!("  {} ({}) {}", dep, d.status(), d.title()),
                Err(_) => println!("  {} (missing)", dep),
            }
        }
    }

    if !dependents.is_empty() {
        println!("\nBlocks: {}", join_ids(&dependents));
    }

    if let Node::Task(task) = node {
        if !task.subtasks.is_empty() {
            println!("\nSubtasks:");
            for subtask in &task.subtasks {
                println!("  {}.{} ({}) {}", task.id, subtask.id, subtask.status, subtask.title);
            }
        }
    }

    println!();
    if eligible {
        println!("READY (all dependencies done)");
    } else if !node.status().is_complete() {
        println!("BLOCKED (waiting on dependencies)");
    }

    Ok(())
}

fn set_status(session: &Session, output: &Output, id: NodeId, status: TaskStatus) -> Result<()> {
    let mut store = session.load()?;
    let changed = store.set_status(id, status)?;
    session.save(store)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "id": id,
            "status": status,
            "changed": changed,
        }));
    } else if changed.is_empty() {
        output.success(&format!("{} is already {}", id, status));
    } else {
        output.success(&format!("Set {} to {} ({} updated)", id, status, changed.len()));
    }

    Ok(())
}

fn remove_task(session: &Session, output: &Output, id: NodeId) -> Result<()> {
    let mut store = session.load()?;
    let purged = store.remove_node(id)?;
    session.save(store)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "removed": id,
            "references_purged": purged,
        }));
    } else {
        output.success(&format!("Removed {} ({} reference(s) purged)", id, purged));
    }

    Ok(())
}

fn promote(session: &Session, output: &Output, id: NodeId) -> Result<()> {
    let NodeId::Subtask { parent, local } = id else {
        bail!("{} is already a task; pass a subtask ID such as {}.1", id, id);
    };

    let mut store = session.load()?;
    let new_id = store.convert_subtask_to_task(parent, local)?;
    session.save(store)?;

    report_move(output, id, NodeId::task(new_id));
    Ok(())
}

fn demote(session: &Session, output: &Output, task: u32, parent: u32) -> Result<()> {
    let mut store = session.load()?;
    let local = store.convert_task_to_subtask(task, parent)?;
    session.save(store)?;

    report_move(output, NodeId::task(task), NodeId::subtask(parent, local));
    Ok(())
}

fn report_move(output: &Output, old: NodeId, new: NodeId) {
    if output.is_json() {
        output.data(&serde_json::json!({ "old_id": old, "new_id": new }));
    } else {
        output.success(&format!("Moved {} to {}", old, new));
    }
}

fn description<'a>(node: &Node<'a>) -> &'a str {
    match *node {
        Node::Task(task) => &task.description,
        Node::Subtask { subtask, .. } => &subtask.description,
    }
}

fn join_ids(ids: &[NodeId]) -> String {
    if ids.is_empty() {
        return "-".to_string();
    }
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

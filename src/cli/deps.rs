//! Dependency CLI commands

use std::process::ExitCode;

use anyhow::Result;
use clap::Subcommand;

use super::output::Output;
use super::session::Session;
use crate::domain::{
    add_dependency, fix_dependencies, remove_dependency, repair, validate, DependencyChange,
    Issue, NodeId, RepairReport, Scope,
};

#[derive(Subcommand)]
pub enum DepsCommands {
    /// Make a task or subtask depend on another
    Add {
        /// Node that will be blocked
        id: NodeId,

        /// Node that must be done first
        dependency: NodeId,
    },

    /// Remove a dependency
    Remove {
        /// Node to unblock
        id: NodeId,

        /// Dependency to remove
        dependency: NodeId,
    },

    /// Report missing, self and circular dependencies
    Validate {
        /// Only check the subtasks of this task, treating outside references as missing
        #[arg(long, value_name = "PARENT")]
        siblings_of: Option<u32>,
    },

    /// Remove missing and self dependencies, then repair
    Fix,

    /// Deduplicate, drop redundant subtask edges and keep subtrees startable
    Repair,
}

pub fn run(cmd: DepsCommands, session: &Session, output: &Output) -> Result<ExitCode> {
    match cmd {
        DepsCommands::Add { id, dependency } => {
            let mut store = session.load()?;
            let change = add_dependency(&mut store, id, dependency)?;
            if change.is_change() {
                session.save(store)?;
            }
            report_change(output, id, dependency, change);
            Ok(ExitCode::SUCCESS)
        }
        DepsCommands::Remove { id, dependency } => {
            let mut store = session.load()?;
            let change = remove_dependency(&mut store, id, dependency)?;
            if change.is_change() {
                session.save(store)?;
            }
            report_change(output, id, dependency, change);
            Ok(ExitCode::SUCCESS)
        }
        DepsCommands::Validate { siblings_of } => {
            let store = session.load()?;
            let scope = siblings_of.map_or(Scope::All, Scope::SiblingsOf);
            let issues = validate(&store, scope);
            print_validation(output, &issues);
            Ok(exit_code(issues.is_empty()))
        }
        DepsCommands::Fix => {
            let mut store = session.load()?;
            let report = fix_dependencies(&mut store, session.repair_options());
            if report.changed() {
                session.save(store)?;
            }
            print_report(output, "fix", &report);
            Ok(exit_code(report.is_clean()))
        }
        DepsCommands::Repair => {
            let mut store = session.load()?;
            let report = repair(&mut store, session.repair_options());
            if report.changed() {
                session.save(store)?;
            }
            print_report(output, "repair", &report);
            Ok(exit_code(report.is_clean()))
        }
    }
}

fn exit_code(clean: bool) -> ExitCode {
    if clean {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn report_change(output: &Output, id: NodeId, dependency: NodeId, change: DependencyChange) {
    if output.is_json() {
        output.data(&serde_json::json!({
            "id": id,
            "dependency": dependency,
            "change": change,
        }));
        return;
    }

    let message = match change {
        DependencyChange::Added => format!("{} now depends on {}", id, dependency),
        DependencyChange::AlreadyPresent => format!("{} already depends on {}", id, dependency),
        DependencyChange::Removed => format!("{} no longer depends on {}", id, dependency),
        DependencyChange::NotPresent => format!("{} does not depend on {}", id, dependency),
    };
    output.success(&message);
}

fn print_validation(output: &Output, issues: &[Issue]) {
    if output.is_json() {
        output.data(&serde_json::json!({
            "valid": issues.is_empty(),
            "issues": issues,
        }));
    } else if issues.is_empty() {
        println!("No dependency issues found");
    } else {
        println!("Found {} dependency issue(s):", issues.len());
        print_issues(issues);
    }
}

fn print_issues(issues: &[Issue]) {
    for issue in issues {
        let tag = match issue {
            Issue::Missing { .. } => "missing",
            Issue::SelfDependency { .. } => "self",
            Issue::Circular { .. } => "circular",
        };
        println!("  [{}] {}", tag, issue);
    }
}

fn print_report(output: &Output, action: &str, report: &RepairReport) {
    if output.is_json() {
        output.data(report);
        return;
    }

    if !report.changed() {
        println!("Nothing to {}", action);
    }
    for issue in &report.fixed {
        println!("Fixed: {}", issue);
    }
    if report.duplicates_removed > 0 {
        println!("Removed {} duplicate dependency(ies)", report.duplicates_removed);
    }
    if report.containment_edges_removed > 0 {
        println!(
            "Removed {} dependency(ies) of tasks on their own subtasks",
            report.containment_edges_removed
        );
    }
    for id in &report.subtasks_made_independent {
        println!("Cleared dependencies of {} so its task can start", id);
    }

    if !report.is_clean() {
        println!(
            "{} issue(s) remain and must be resolved manually:",
            report.remaining.len()
        );
        print_issues(&report.remaining);
    }
}

//! Node identifiers for tasks and subtasks
//!
//! ID Format:
//! - Task IDs: a positive integer (e.g., `7`)
//! - Subtask IDs: `{parent}.{local}` (e.g., `7.2`)
//!
//! Subtask local IDs are only unique within their parent, so a subtask is
//! always addressed through its parent. The canonical string form is used
//! for equality, sorting and persistence.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::error::ErrorKind;

#[derive(Debug, Error, PartialEq)]
pub enum IdError {
    #[error("Invalid ID format: expected '{{task}}' or '{{task}}.{{subtask}}', got '{0}'")]
    InvalidFormat(String),

    #[error("Invalid ID segment: '{0}' is not a positive integer")]
    InvalidSegment(String),
}

impl IdError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

/// Identifier of a node in the task hierarchy
///
/// Tasks order before subtasks; tasks compare by value and subtasks by
/// `(parent, local)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeId {
    /// A top-level task
    Task(u32),
    /// A subtask addressed through its parent task
    Subtask { parent: u32, local: u32 },
}

impl NodeId {
    /// Creates a task reference
    pub fn task(id: u32) -> Self {
        NodeId::Task(id)
    }

    /// Creates a subtask reference
    pub fn subtask(parent: u32, local: u32) -> Self {
        NodeId::Subtask { parent, local }
    }

    /// Parses a raw string ID
    pub fn parse(raw: &str) -> Result<Self, IdError> {
        raw.parse()
    }

    /// Converts a raw integer ID into a task reference
    pub fn from_int(raw: i64) -> Result<Self, IdError> {
        u32::try_from(raw)
            .ok()
            .filter(|id| *id > 0)
            .map(NodeId::Task)
            .ok_or_else(|| IdError::InvalidSegment(raw.to_string()))
    }

    /// Returns true if this is a subtask reference
    pub fn is_subtask(&self) -> bool {
        matches!(self, NodeId::Subtask { .. })
    }

    /// Returns the parent task ID for subtasks, or None for tasks
    pub fn parent(&self) -> Option<u32> {
        match self {
            NodeId::Task(_) => None,
            NodeId::Subtask { parent, .. } => Some(*parent),
        }
    }

    /// Returns the ID of the top-level task that owns this node
    pub fn root_task(&self) -> u32 {
        match self {
            NodeId::Task(id) => *id,
            NodeId::Subtask { parent, .. } => *parent,
        }
    }
}

fn parse_segment(raw: &str) -> Result<u32, IdError> {
    match raw.parse::<u32>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(IdError::InvalidSegment(raw.to_string())),
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Task(id) => write!(f, "{}", id),
            NodeId::Subtask { parent, local } => write!(f, "{}.{}", parent, local),
        }
    }
}

impl FromStr for NodeId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(IdError::InvalidFormat(s.to_string()));
        }

        let parts: Vec<&str> = s.split('.').collect();
        match parts.as_slice() {
            [task] => Ok(NodeId::Task(parse_segment(task)?)),
            [parent, local] => Ok(NodeId::Subtask {
                parent: parse_segment(parent)?,
                local: parse_segment(local)?,
            }),
            _ => Err(IdError::InvalidFormat(s.to_string())),
        }
    }
}

impl From<u32> for NodeId {
    fn from(id: u32) -> Self {
        NodeId::Task(id)
    }
}

impl Serialize for NodeId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Task references persist as bare integers, subtasks as "parent.local"
        match self {
            NodeId::Task(id) => serializer.serialize_u32(*id),
            NodeId::Subtask { .. } => serializer.serialize_str(&self.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct NodeIdVisitor;

        impl<'de> Visitor<'de> for NodeIdVisitor {
            type Value = NodeId;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a positive integer or a \"task.subtask\" string")
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                NodeId::from_int(value).map_err(E::custom)
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                let value = i64::try_from(value).map_err(E::custom)?;
                NodeId::from_int(value).map_err(E::custom)
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                value.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(NodeIdVisitor)
    }
}

//! The in-memory representation of a workload spec.

use serde_yaml::Value;
use std::fmt;

use crate::error::{FlowctlError, SpecError, Result};

/// The declared kind of a workload spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadKind {
    /// A multi-executor pipeline.
    Flow,
    /// A single-executor serving deployment.
    Deployment,
}

impl WorkloadKind {
    /// Parses a `kind` discriminator value, case-insensitively.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "flow" => Some(Self::Flow),
            "deployment" => Some(Self::Deployment),
            _ => None,
        }
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flow => write!(f, "flow"),
            Self::Deployment => write!(f, "deployment"),
        }
    }
}

/// A parsed workload spec.
///
/// The tree is an untyped YAML value on purpose: the resolver must walk
/// arbitrary user-defined shapes, and the service validates the schema.
#[derive(Debug, Clone)]
pub struct SpecDocument {
    kind: WorkloadKind,
    tree: Value,
}

impl SpecDocument {
    /// Wraps an already-parsed tree.
    #[must_use]
    pub const fn new(kind: WorkloadKind, tree: Value) -> Self {
        Self { kind, tree }
    }

    /// Returns the declared workload kind.
    #[must_use]
    pub const fn kind(&self) -> WorkloadKind {
        self.kind
    }

    /// Returns the spec tree.
    #[must_use]
    pub const fn tree(&self) -> &Value {
        &self.tree
    }

    /// Returns the spec tree for in-place mutation.
    pub fn tree_mut(&mut self) -> &mut Value {
        &mut self.tree
    }

    /// Returns the top-level `name` field, when present and a string.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.tree.get("name").and_then(Value::as_str)
    }

    /// Serializes the spec back to YAML for submission.
    ///
    /// # Errors
    ///
    /// Returns an error if the tree cannot be serialized.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(&self.tree).map_err(|e| {
            FlowctlError::Spec(SpecError::ParseError {
                message: format!("Failed to serialize spec: {e}"),
                location: None,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse_is_case_insensitive() {
        assert_eq!(WorkloadKind::parse("Flow"), Some(WorkloadKind::Flow));
        assert_eq!(
            WorkloadKind::parse("DEPLOYMENT"),
            Some(WorkloadKind::Deployment)
        );
        assert_eq!(WorkloadKind::parse("pod"), None);
    }

    #[test]
    fn test_name_reads_top_level_field() {
        let tree: Value = serde_yaml::from_str("name: demo\nkind: flow").unwrap();
        let doc = SpecDocument::new(WorkloadKind::Flow, tree);
        assert_eq!(doc.name(), Some("demo"));
    }
}

//! Loading spec documents and env files from disk.

use serde_yaml::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{FlowctlError, Result, SpecError};

use super::document::{SpecDocument, WorkloadKind};

/// Loads spec documents from YAML files.
#[derive(Debug, Default)]
pub struct SpecLoader {
    /// Base path for resolving relative spec paths.
    base_path: Option<PathBuf>,
}

impl SpecLoader {
    /// Creates a new spec loader.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative spec paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads a spec document from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// `kind` discriminator is missing or unknown.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<SpecDocument> {
        let path = self.resolve_path(path.as_ref());
        info!("Loading spec from: {}", path.display());

        if !path.exists() {
            return Err(FlowctlError::Spec(SpecError::FileNotFound { path }));
        }

        let content = std::fs::read_to_string(&path).map_err(|e| {
            FlowctlError::Spec(SpecError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(&path))
    }

    /// Parses a spec document from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid or the `kind` discriminator
    /// is missing or unknown.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<SpecDocument> {
        debug!("Parsing YAML spec");

        let tree: Value = serde_yaml::from_str(content).map_err(|e| {
            FlowctlError::Spec(SpecError::ParseError {
                message: format!("YAML parse error: {e}"),
                location: source.map(|p| p.display().to_string()),
            })
        })?;

        let Some(kind_field) = tree.get("kind").and_then(Value::as_str) else {
            return Err(FlowctlError::Spec(SpecError::MissingKind));
        };
        let Some(kind) = WorkloadKind::parse(kind_field) else {
            return Err(FlowctlError::Spec(SpecError::UnknownKind {
                kind: kind_field.to_string(),
            }));
        };

        debug!("Successfully parsed {kind} spec");
        Ok(SpecDocument::new(kind, tree))
    }

    /// Reads `KEY=VALUE` bindings from env files, later files winning.
    ///
    /// The process environment is never touched; the bindings are returned
    /// for the caller to feed into a resolution context.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be read or contains a malformed
    /// line.
    pub fn load_env_files(
        &self,
        paths: &[impl AsRef<Path>],
    ) -> Result<Vec<(String, String)>> {
        let mut bindings = Vec::new();
        for path in paths {
            let path = self.resolve_path(path.as_ref());
            debug!("Loading env file: {}", path.display());
            for entry in dotenvy::from_path_iter(&path).map_err(|e| env_file_error(&path, &e))? {
                let (key, value) = entry.map_err(|e| env_file_error(&path, &e))?;
                bindings.push((key, value));
            }
        }
        Ok(bindings)
    }

    /// Resolves a possibly-relative path against the base path.
    fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.base_path {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

fn env_file_error(path: &Path, err: &dotenvy::Error) -> FlowctlError {
    FlowctlError::Spec(SpecError::EnvFile {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

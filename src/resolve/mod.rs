//! Placeholder resolution for spec documents.
//!
//! A loaded spec may carry placeholders in three grammars: context
//! variables, environment variables (modern and deprecated syntax), and
//! internal cross-document references. [`Resolver`] expands all of them in
//! a bounded number of passes; [`ResolutionContext`] carries the variable
//! bindings for one resolution.

mod coerce;
mod engine;
mod path;

pub use coerce::coerce_scalar;
pub use engine::{Resolver, DEFAULT_PASSES};
pub use path::{RefPath, RefRoot, Segment};

use std::collections::HashMap;

/// Variable bindings for one resolution run.
///
/// Immutable once handed to [`Resolver::resolve`]; the resolver never
/// touches process-wide environment state.
#[derive(Debug, Clone, Default)]
pub struct ResolutionContext {
    /// Bindings for `${{ name }}` and `${{ CONTEXT.name }}` placeholders.
    pub context_vars: HashMap<String, String>,
    /// Bindings for `${{ ENV.name }}` and deprecated `$name` placeholders.
    pub env_vars: HashMap<String, String>,
}

impl ResolutionContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context whose env bindings snapshot the current process
    /// environment.
    #[must_use]
    pub fn from_process_env() -> Self {
        Self {
            context_vars: HashMap::new(),
            env_vars: std::env::vars().collect(),
        }
    }

    /// Adds a context variable binding.
    #[must_use]
    pub fn with_context_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.context_vars.insert(name.into(), value.into());
        self
    }

    /// Adds an env variable binding.
    #[must_use]
    pub fn with_env_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(name.into(), value.into());
        self
    }

    /// Overlays env bindings, later entries winning over existing ones.
    pub fn extend_env(&mut self, vars: impl IntoIterator<Item = (String, String)>) {
        self.env_vars.extend(vars);
    }
}

//! Multi-pass placeholder expansion over a spec tree.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::Value;
use std::collections::HashMap;
use tracing::warn;

use crate::error::{ResolveError, Result};
use crate::spec::SpecDocument;

use super::coerce::coerce_scalar;
use super::path::RefPath;
use super::ResolutionContext;

/// Number of reference passes run by default.
///
/// Three passes resolve at least two levels of reference indirection;
/// deeper chains stay partially unresolved. No convergence or cycle
/// detection is attempted, the cost stays bounded instead.
pub const DEFAULT_PASSES: usize = 3;

/// `${{ ENV.NAME }}` / `${{ env.NAME }}`, spaces required.
static ENV_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{\{\s(?:ENV|env)\.([A-Za-z0-9_]+)\s\}\}").expect("hard-coded pattern")
});

/// `${{ CONTEXT.NAME }}` / `${{ context.NAME }}`, spaces required.
static CONTEXT_DOT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{\{\s(?:CONTEXT|context)\.([A-Za-z0-9_]+)\s\}\}").expect("hard-coded pattern")
});

/// Bare `${{ NAME }}`, spaces required.
static CONTEXT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{\{\s([A-Za-z0-9_]+)\s\}\}").expect("hard-coded pattern")
});

/// Deprecated `$NAME` shorthand.
static DEPRECATED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$([A-Za-z0-9_]+)").expect("hard-coded pattern"));

/// Internal reference `${{path}}`. No spaces, so it never collides with
/// the spaced variable grammars above.
static REF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{\{([\w\[\].]+)\}\}").expect("hard-coded pattern"));

/// Stand-in for mirror nodes that no longer exist after a substitution.
static ABSENT: Value = Value::Null;

/// Expands placeholders in a spec tree.
///
/// Variables are substituted in a single pass, then internal references
/// are resolved in a fixed number of passes against a fresh snapshot of
/// the tree each time.
#[derive(Debug, Clone)]
pub struct Resolver {
    passes: usize,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    /// Creates a resolver with [`DEFAULT_PASSES`] reference passes.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            passes: DEFAULT_PASSES,
        }
    }

    /// Overrides the number of reference passes.
    #[must_use]
    pub const fn with_passes(mut self, passes: usize) -> Self {
        self.passes = passes;
        self
    }

    /// Expands all placeholders in the document.
    ///
    /// # Errors
    ///
    /// Returns a [`ResolveError::Template`] for structurally malformed
    /// reference expressions. Unbound variables and unresolvable paths are
    /// left as literals, never errors.
    pub fn resolve(&self, doc: &mut SpecDocument, ctx: &ResolutionContext) -> Result<()> {
        self.resolve_tree(doc.tree_mut(), ctx)
    }

    /// Expands all placeholders in a bare YAML tree.
    ///
    /// # Errors
    ///
    /// Same as [`Self::resolve`].
    pub fn resolve_tree(&self, tree: &mut Value, ctx: &ResolutionContext) -> Result<()> {
        apply_bindings(tree, ctx);

        for _ in 0..self.passes {
            // Substitutions of the previous pass must be visible, so the
            // lookup snapshot is rebuilt every pass.
            let mirror = tree.clone();
            resolve_refs(tree, &mirror, &mirror, &ctx.env_vars)?;
        }

        Ok(())
    }
}

/// Applies the env and context variable grammars to every scalar string.
fn apply_bindings(node: &mut Value, ctx: &ResolutionContext) {
    match node {
        Value::Mapping(map) => {
            for (_, child) in map.iter_mut() {
                apply_bindings(child, ctx);
            }
        }
        Value::Sequence(items) => {
            for child in items {
                apply_bindings(child, ctx);
            }
        }
        Value::String(s) => {
            let mut changed = false;
            let mut out = substitute_vars(&ENV_RE, s, &ctx.env_vars, &mut changed);
            out = substitute_vars(&CONTEXT_DOT_RE, &out, &ctx.context_vars, &mut changed);
            out = substitute_vars(&CONTEXT_RE, &out, &ctx.context_vars, &mut changed);

            // The shorthand only applies when no modern form is present in
            // the same string.
            if !s.contains("${{")
                && let Some(m) = DEPRECATED_RE.find(&out)
            {
                let name = &m.as_str()[1..];
                warn!(
                    "`${name}` syntax is deprecated, use `${{{{ ENV.{name} }}}}` instead"
                );
                out = substitute_vars(&DEPRECATED_RE, &out, &ctx.env_vars, &mut changed);
            }

            if changed {
                *node = coerce_scalar(&out);
            }
        }
        _ => {}
    }
}

/// Replaces every bound match of `re` in `s`; unbound names stay literal.
fn substitute_vars(
    re: &Regex,
    s: &str,
    vars: &HashMap<String, String>,
    changed: &mut bool,
) -> String {
    re.replace_all(s, |caps: &regex::Captures<'_>| match vars.get(&caps[1]) {
        Some(value) => {
            *changed = true;
            value.clone()
        }
        None => caps[0].to_string(),
    })
    .into_owned()
}

/// Applies the reference grammar to every scalar string, looking paths up
/// against the pass snapshot.
fn resolve_refs(
    node: &mut Value,
    mirror_node: &Value,
    root: &Value,
    env_vars: &HashMap<String, String>,
) -> std::result::Result<(), ResolveError> {
    match node {
        Value::Mapping(map) => {
            for (key, child) in map.iter_mut() {
                let mirror_child = mirror_node
                    .as_mapping()
                    .and_then(|m| m.get(key))
                    .unwrap_or(&ABSENT);
                match child {
                    Value::Mapping(_) | Value::Sequence(_) => {
                        resolve_refs(child, mirror_child, root, env_vars)?;
                    }
                    Value::String(s) => {
                        // `this` is the container holding the scalar.
                        let replacement = substitute_refs(s, root, mirror_node, env_vars)?;
                        if let Some(new) = replacement {
                            *child = new;
                        }
                    }
                    _ => {}
                }
            }
        }
        Value::Sequence(items) => {
            for (idx, child) in items.iter_mut().enumerate() {
                let mirror_child = mirror_node
                    .as_sequence()
                    .and_then(|s| s.get(idx))
                    .unwrap_or(&ABSENT);
                match child {
                    Value::Mapping(_) | Value::Sequence(_) => {
                        resolve_refs(child, mirror_child, root, env_vars)?;
                    }
                    Value::String(s) => {
                        let replacement = substitute_refs(s, root, mirror_node, env_vars)?;
                        if let Some(new) = replacement {
                            *child = new;
                        }
                    }
                    _ => {}
                }
            }
        }
        Value::String(s) => {
            let replacement = substitute_refs(s, root, mirror_node, env_vars)?;
            if let Some(new) = replacement {
                *node = new;
            }
        }
        _ => {}
    }

    Ok(())
}

/// Substitutes reference placeholders inside one scalar string.
///
/// A placeholder spanning the whole scalar may pull in a container value;
/// placeholders embedded in a longer string only accept scalars.
fn substitute_refs(
    s: &str,
    root: &Value,
    this: &Value,
    env_vars: &HashMap<String, String>,
) -> std::result::Result<Option<Value>, ResolveError> {
    let matches: Vec<regex::Match<'_>> = REF_RE.find_iter(s).collect();
    let Some(first) = matches.first() else {
        return Ok(None);
    };

    if matches.len() == 1 && first.start() == 0 && first.end() == s.len() {
        let expr = expr_of(first.as_str());
        let Some(path) = RefPath::parse(expr)? else {
            return Ok(None);
        };
        let Some(value) = path.lookup(expr, root, this, env_vars)? else {
            return Ok(None);
        };
        return Ok(Some(match render_scalar(&value) {
            Some(text) => coerce_scalar(&text),
            None => value,
        }));
    }

    let mut out = String::with_capacity(s.len());
    let mut last = 0;
    let mut changed = false;
    for m in &matches {
        out.push_str(&s[last..m.start()]);
        let expr = expr_of(m.as_str());
        let rendered = match RefPath::parse(expr)? {
            Some(path) => path
                .lookup(expr, root, this, env_vars)?
                .and_then(|v| render_scalar(&v)),
            None => None,
        };
        match rendered {
            Some(text) => {
                changed = true;
                out.push_str(&text);
            }
            None => out.push_str(m.as_str()),
        }
        last = m.end();
    }
    out.push_str(&s[last..]);

    if changed {
        Ok(Some(coerce_scalar(&out)))
    } else {
        Ok(None)
    }
}

/// Strips the `${{` and `}}` delimiters off a matched placeholder.
fn expr_of(matched: &str) -> &str {
    &matched[3..matched.len() - 2]
}

/// Renders a scalar value as substitution text. Containers render as
/// `None`.
fn render_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}

//! Dotted/bracketed path expressions for internal cross-references.

use serde_yaml::Value;
use std::collections::HashMap;

use crate::error::ResolveError;

/// Where a reference path starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefRoot {
    /// The document root.
    Root,
    /// The container holding the referencing scalar.
    This,
    /// The env variable bindings.
    Env,
}

/// One step of a reference path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Map key lookup.
    Key(String),
    /// Sequence index lookup.
    Index(usize),
}

/// A parsed reference path such as `root.executors[0].image`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefPath {
    /// The lookup starting point.
    pub root: RefRoot,
    /// The lookup steps after the root.
    pub segments: Vec<Segment>,
}

impl RefPath {
    /// Parses a path expression.
    ///
    /// Returns `Ok(None)` when the first segment is not a known root, so
    /// the caller leaves the placeholder untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Template`] for expressions that are
    /// structurally malformed, like empty segments or non-numeric indices.
    pub fn parse(expr: &str) -> Result<Option<Self>, ResolveError> {
        let mut parts = expr.split('.');
        let Some(head) = parts.next() else {
            return Err(ResolveError::template(expr, "empty path expression"));
        };

        let root = match head {
            "root" => RefRoot::Root,
            "this" => RefRoot::This,
            "ENV" | "env" => RefRoot::Env,
            _ => return Ok(None),
        };

        let mut segments = Vec::new();
        for part in parts {
            if part.is_empty() {
                return Err(ResolveError::template(expr, "empty path segment"));
            }
            parse_segment(expr, part, &mut segments)?;
        }

        if segments.is_empty() {
            return Err(ResolveError::template(expr, "path names no field"));
        }

        Ok(Some(Self { root, segments }))
    }

    /// Looks the path up against the document mirror.
    ///
    /// Returns `Ok(None)` when a key or index is simply absent, so forward
    /// references can wait for a later pass.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Template`] when the path mixes scalar and
    /// container access, like indexing into a scalar.
    pub fn lookup<'a>(
        &self,
        expr: &str,
        root: &'a Value,
        this: &'a Value,
        env_vars: &HashMap<String, String>,
    ) -> Result<Option<Value>, ResolveError> {
        if self.root == RefRoot::Env {
            let [Segment::Key(name)] = self.segments.as_slice() else {
                return Err(ResolveError::template(
                    expr,
                    "env references take a single variable name",
                ));
            };
            return Ok(env_vars.get(name).map(|v| Value::String(v.clone())));
        }

        let mut current = if self.root == RefRoot::This { this } else { root };

        for segment in &self.segments {
            match segment {
                Segment::Key(key) => match current {
                    Value::Mapping(map) => {
                        let Some(next) = map.get(key.as_str()) else {
                            return Ok(None);
                        };
                        current = next;
                    }
                    Value::Null => return Ok(None),
                    _ => {
                        return Err(ResolveError::template(
                            expr,
                            format!("cannot look up key `{key}` in a non-mapping value"),
                        ));
                    }
                },
                Segment::Index(idx) => match current {
                    Value::Sequence(items) => {
                        let Some(next) = items.get(*idx) else {
                            return Ok(None);
                        };
                        current = next;
                    }
                    Value::Null => return Ok(None),
                    _ => {
                        return Err(ResolveError::template(
                            expr,
                            format!("cannot index `[{idx}]` into a non-sequence value"),
                        ));
                    }
                },
            }
        }

        Ok(Some(current.clone()))
    }
}

/// Parses one dotted part, which may carry trailing `[idx]` lookups.
fn parse_segment(
    expr: &str,
    part: &str,
    segments: &mut Vec<Segment>,
) -> Result<(), ResolveError> {
    let (name, brackets) = match part.find('[') {
        Some(pos) => (&part[..pos], &part[pos..]),
        None => (part, ""),
    };

    if name.is_empty() {
        return Err(ResolveError::template(expr, "index without a field name"));
    }
    segments.push(Segment::Key(name.to_string()));

    let mut rest = brackets;
    while !rest.is_empty() {
        let Some(inner) = rest.strip_prefix('[') else {
            return Err(ResolveError::template(expr, "malformed index brackets"));
        };
        let Some(close) = inner.find(']') else {
            return Err(ResolveError::template(expr, "unclosed index bracket"));
        };
        let idx: usize = inner[..close].parse().map_err(|_| {
            ResolveError::template(expr, format!("invalid index `{}`", &inner[..close]))
        })?;
        segments.push(Segment::Index(idx));
        rest = &inner[close + 1..];
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Value {
        serde_yaml::from_str(
            "
            name: demo
            executors:
              - image: worker:v1
                replicas: 2
              - image: gateway:v1
            ",
        )
        .unwrap()
    }

    #[test]
    fn test_parse_root_path_with_index() {
        let path = RefPath::parse("root.executors[0].image").unwrap().unwrap();
        assert_eq!(path.root, RefRoot::Root);
        assert_eq!(
            path.segments,
            vec![
                Segment::Key(String::from("executors")),
                Segment::Index(0),
                Segment::Key(String::from("image")),
            ]
        );
    }

    #[test]
    fn test_unknown_root_is_not_a_path() {
        assert!(RefPath::parse("executors[0].image").unwrap().is_none());
        assert!(RefPath::parse("REPLICAS").unwrap().is_none());
    }

    #[test]
    fn test_invalid_index_is_malformed() {
        assert!(RefPath::parse("root.executors[x]").is_err());
        assert!(RefPath::parse("root..image").is_err());
    }

    #[test]
    fn test_lookup_existing_value() {
        let tree = doc();
        let path = RefPath::parse("root.executors[0].image").unwrap().unwrap();
        let value = path
            .lookup("root.executors[0].image", &tree, &tree, &HashMap::new())
            .unwrap();
        assert_eq!(value, Some(Value::String(String::from("worker:v1"))));
    }

    #[test]
    fn test_missing_key_is_none() {
        let tree = doc();
        let path = RefPath::parse("root.gateway.image").unwrap().unwrap();
        let value = path
            .lookup("root.gateway.image", &tree, &tree, &HashMap::new())
            .unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn test_indexing_a_scalar_fails() {
        let tree = doc();
        let path = RefPath::parse("root.name[0]").unwrap().unwrap();
        let err = path.lookup("root.name[0]", &tree, &tree, &HashMap::new());
        assert!(err.is_err());
    }

    #[test]
    fn test_env_lookup() {
        let tree = Value::Null;
        let mut env = HashMap::new();
        env.insert(String::from("TOKEN"), String::from("secret"));

        let path = RefPath::parse("ENV.TOKEN").unwrap().unwrap();
        let value = path.lookup("ENV.TOKEN", &tree, &tree, &env).unwrap();
        assert_eq!(value, Some(Value::String(String::from("secret"))));
    }
}

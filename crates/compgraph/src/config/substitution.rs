//! Substitution engine for $(arg ..) and $(env ..) patterns in graph configs

use regex::{Captures, Regex};
use serde_yaml::Value;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Regex for matching substitution patterns: $(type value)
static SUBSTITUTION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\((\w+)\s+([^)]+)\)").unwrap());

/// Upper bound on nested substitution passes
const MAX_PASSES: usize = 10;

/// Variables available to `$(..)` patterns
#[derive(Debug, Clone, Default)]
pub struct SubstitutionContext {
    /// Values for `$(arg NAME)`
    pub args: HashMap<String, String>,
    /// Overrides consulted before the process environment for `$(env NAME)`
    pub env: HashMap<String, String>,
}

impl SubstitutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_arg(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.insert(name.into(), value.into());
        self
    }

    pub fn with_args(mut self, args: HashMap<String, String>) -> Self {
        self.args.extend(args);
        self
    }

    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(name.into(), value.into());
        self
    }

    /// Substitute every string scalar inside a YAML value, in place.
    /// Mapping keys are left untouched.
    pub fn substitute_value(&self, value: &mut Value) -> Result<(), SubstitutionError> {
        match value {
            Value::String(s) if s.contains("$(") => {
                *s = self.substitute(s)?;
            }
            Value::Sequence(items) => {
                for item in items {
                    self.substitute_value(item)?;
                }
            }
            Value::Mapping(map) => {
                for (_, item) in map.iter_mut() {
                    self.substitute_value(item)?;
                }
            }
            Value::Tagged(tagged) => self.substitute_value(&mut tagged.value)?,
            _ => {}
        }
        Ok(())
    }

    /// Substitute all patterns in a string, following nested references
    pub fn substitute(&self, input: &str) -> Result<String, SubstitutionError> {
        let mut result = input.to_string();

        for _ in 0..MAX_PASSES {
            let next = self.substitute_once(&result)?;
            if next == result {
                return Ok(result);
            }
            result = next;
        }

        Err(SubstitutionError::MaxIterationsExceeded(input.to_string()))
    }

    fn substitute_once(&self, input: &str) -> Result<String, SubstitutionError> {
        let mut error: Option<SubstitutionError> = None;

        let result = SUBSTITUTION_PATTERN.replace_all(input, |caps: &Captures| {
            if error.is_some() {
                return String::new();
            }
            match self.resolve(&caps[1], caps[2].trim()) {
                Ok(value) => value,
                Err(e) => {
                    error = Some(e);
                    String::new()
                }
            }
        });

        match error {
            Some(e) => Err(e),
            None => Ok(result.into_owned()),
        }
    }

    fn resolve(&self, kind: &str, name: &str) -> Result<String, SubstitutionError> {
        match kind {
            "arg" => {
                // `$(arg NAME DEFAULT)` falls back to DEFAULT when NAME is unset
                let (name, default) = match name.split_once(char::is_whitespace) {
                    Some((name, default)) => (name, Some(default.trim())),
                    None => (name, None),
                };
                self.args
                    .get(name)
                    .cloned()
                    .or_else(|| default.map(str::to_string))
                    .ok_or_else(|| SubstitutionError::UndefinedArg(name.to_string()))
            }
            "env" => match self.env.get(name) {
                Some(value) => Ok(value.clone()),
                None => std::env::var(name)
                    .map_err(|_| SubstitutionError::UndefinedEnv(name.to_string())),
            },
            _ => Err(SubstitutionError::UnknownType(kind.to_string())),
        }
    }
}

/// Errors that can occur during substitution
#[derive(Debug, thiserror::Error)]
pub enum SubstitutionError {
    #[error("Unknown substitution type: {0}")]
    UnknownType(String),

    #[error("Undefined argument: {0}")]
    UndefinedArg(String),

    #[error("Undefined environment variable: {0}")]
    UndefinedEnv(String),

    #[error("Maximum substitution passes exceeded for: {0}")]
    MaxIterationsExceeded(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arg_substitution() {
        let ctx = SubstitutionContext::new().with_arg("level", "debug");
        assert_eq!(ctx.substitute("$(arg level)").unwrap(), "debug");
    }

    #[test]
    fn test_arg_default() {
        let ctx = SubstitutionContext::new().with_arg("level", "debug");
        assert_eq!(ctx.substitute("$(arg level info)").unwrap(), "debug");
        assert_eq!(ctx.substitute("$(arg as_of 2023-01-02)").unwrap(), "2023-01-02");
    }

    #[test]
    fn test_env_override() {
        let ctx = SubstitutionContext::new().with_env("COMPGRAPH_TZ", "+02:00");
        assert_eq!(ctx.substitute("tz=$(env COMPGRAPH_TZ)").unwrap(), "tz=+02:00");
    }

    #[test]
    fn test_undefined_arg_error() {
        let ctx = SubstitutionContext::new();
        assert!(matches!(
            ctx.substitute("$(arg undefined)"),
            Err(SubstitutionError::UndefinedArg(_))
        ));
    }

    #[test]
    fn test_unknown_type_error() {
        let ctx = SubstitutionContext::new();
        assert!(matches!(
            ctx.substitute("$(find pkg)"),
            Err(SubstitutionError::UnknownType(_))
        ));
    }

    #[test]
    fn test_nested_substitution() {
        let ctx = SubstitutionContext::new()
            .with_arg("outer", "$(arg inner)")
            .with_arg("inner", "resolved");
        assert_eq!(ctx.substitute("$(arg outer)").unwrap(), "resolved");
    }

    #[test]
    fn test_self_reference_is_bounded() {
        let ctx = SubstitutionContext::new().with_arg("loop", "x$(arg loop)");
        assert!(matches!(
            ctx.substitute("$(arg loop)"),
            Err(SubstitutionError::MaxIterationsExceeded(_))
        ));
    }

    #[test]
    fn test_substitute_value_walks_tree() {
        let mut value: Value = serde_yaml::from_str(
            r#"
level: "$(arg level)"
holidays: ["$(arg day)", "2023-12-25"]
count: 3
"#,
        )
        .unwrap();
        let ctx = SubstitutionContext::new()
            .with_arg("level", "warn")
            .with_arg("day", "2023-01-02");
        ctx.substitute_value(&mut value).unwrap();

        assert_eq!(value["level"].as_str(), Some("warn"));
        assert_eq!(value["holidays"][0].as_str(), Some("2023-01-02"));
        assert_eq!(value["count"].as_u64(), Some(3));
    }
}

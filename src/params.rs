//! Parameter types available to step expressions.
//!
//! A parameter type pairs a regular expression fragment with a transform
//! that turns the captured text into a typed [`Value`]. Expressions refer
//! to parameter types by name, for example `a value of {int}`.
//!
//! The registry is keyed by name and re-registering a name replaces the
//! earlier entry. Every change bumps a generation counter so compiled
//! expressions cached elsewhere can be invalidated.
//!
//! ```rust
//! use serde_json::Value;
//! use tsukemono::params::{ParamType, ParamTypeRegistry};
//!
//! let mut registry = ParamTypeRegistry::default();
//! registry.register(ParamType::new("colour", "red|green|blue", |raw| {
//!     Ok(Value::from(raw.to_uppercase()))
//! }));
//! let colour = registry.get("colour").expect("registered");
//! assert_eq!(colour.transform("red").expect("transform"), Value::from("RED"));
//! ```

use anyhow::{Context, anyhow};
use indexmap::IndexMap;
use serde_json::{Number, Value};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Function converting captured text into a typed value.
pub type Transform = Arc<dyn Fn(&str) -> anyhow::Result<Value> + Send + Sync>;

/// A named parameter type.
#[derive(Clone)]
pub struct ParamType {
    name: String,
    regex: String,
    transform: Transform,
}

impl ParamType {
    /// Create a parameter type from its name, regex fragment and transform.
    pub fn new<F>(name: impl Into<String>, regex: impl Into<String>, transform: F) -> Self
    where
        F: Fn(&str) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            regex: regex.into(),
            transform: Arc::new(transform),
        }
    }

    /// Name used inside `{}` placeholders.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Regular expression fragment matched by the placeholder.
    #[must_use]
    pub fn regex(&self) -> &str {
        &self.regex
    }

    /// Convert captured text into a value.
    ///
    /// # Errors
    ///
    /// Returns the transform's error when the text cannot be converted.
    pub fn transform(&self, raw: &str) -> anyhow::Result<Value> {
        (self.transform)(raw)
    }
}

impl fmt::Debug for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamType")
            .field("name", &self.name)
            .field("regex", &self.regex)
            .finish_non_exhaustive()
    }
}

fn strip_quotes(raw: &str) -> &str {
    ['"', '\'']
        .iter()
        .find_map(|quote| raw.strip_prefix(*quote)?.strip_suffix(*quote))
        .unwrap_or(raw)
}

/// Parameter types every registry starts with.
#[must_use]
pub fn builtin_types() -> Vec<ParamType> {
    vec![
        ParamType::new("int", r"-?\d+", |raw| {
            let value: i64 = raw
                .parse()
                .with_context(|| format!("`{raw}` is not an integer"))?;
            Ok(Value::from(value))
        }),
        ParamType::new("float", r"-?\d*\.?\d+(?:[eE][-+]?\d+)?", |raw| {
            let value: f64 = raw
                .parse()
                .with_context(|| format!("`{raw}` is not a number"))?;
            Number::from_f64(value)
                .map(Value::Number)
                .ok_or_else(|| anyhow!("`{raw}` is not a finite number"))
        }),
        ParamType::new("word", r"[^\s]+", |raw| Ok(Value::from(raw))),
        ParamType::new("string", r#""[^"]*"|'[^']*'"#, |raw| {
            Ok(Value::from(strip_quotes(raw)))
        }),
        ParamType::new("any", r".*", |raw| Ok(Value::from(raw))),
    ]
}

/// Registry of parameter types keyed by name.
#[derive(Debug, Clone)]
pub struct ParamTypeRegistry {
    types: IndexMap<String, ParamType>,
    generation: u64,
}

impl Default for ParamTypeRegistry {
    fn default() -> Self {
        let mut registry = Self {
            types: IndexMap::new(),
            generation: 0,
        };
        registry.reset();
        registry
    }
}

impl ParamTypeRegistry {
    /// Insert `param_type`, replacing any entry with the same name.
    ///
    /// Returns the replaced entry, if any.
    pub fn register(&mut self, param_type: ParamType) -> Option<ParamType> {
        debug!(
            target: "tsukemono::params",
            name = param_type.name(),
            regex = param_type.regex(),
            "registering parameter type"
        );
        self.generation = self.generation.wrapping_add(1);
        self.types.insert(param_type.name.clone(), param_type)
    }

    /// All registered types by name, in registration order.
    #[must_use]
    pub const fn types(&self) -> &IndexMap<String, ParamType> {
        &self.types
    }

    /// Look up a type by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamType> {
        self.types.get(name)
    }

    /// Counter bumped on every change to the registry.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Drop custom types and restore the built-in set.
    pub fn reset(&mut self) {
        self.types.clear();
        for param_type in builtin_types() {
            self.types.insert(param_type.name.clone(), param_type);
        }
        self.generation = self.generation.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("int", "42", Value::from(42))]
    #[case("int", "-7", Value::from(-7))]
    #[case("float", "1.5", Value::from(1.5))]
    #[case("word", "banana", Value::from("banana"))]
    #[case("string", "\"two words\"", Value::from("two words"))]
    #[case("string", "'single'", Value::from("single"))]
    #[case("any", "anything at all", Value::from("anything at all"))]
    fn builtin_transforms(#[case] name: &str, #[case] raw: &str, #[case] expected: Value) {
        let registry = ParamTypeRegistry::default();
        let param = registry.get(name).expect("builtin");
        assert_eq!(param.transform(raw).expect("transform"), expected);
    }

    #[rstest]
    fn int_transform_rejects_overflow() {
        let registry = ParamTypeRegistry::default();
        let int = registry.get("int").expect("builtin");
        assert!(int.transform("99999999999999999999").is_err());
    }

    #[rstest]
    fn re_registering_replaces_last_write_wins() {
        let mut registry = ParamTypeRegistry::default();
        let before = registry.generation();
        let replaced = registry.register(ParamType::new("int", r"\d+", |_| Ok(Value::from(0))));
        assert!(replaced.is_some());
        assert_eq!(registry.get("int").expect("int").regex(), r"\d+");
        assert!(registry.generation() != before);
        assert_eq!(registry.types().len(), builtin_types().len());
    }

    #[rstest]
    fn reset_restores_builtins() {
        let mut registry = ParamTypeRegistry::default();
        registry.register(ParamType::new("colour", "red", |raw| Ok(Value::from(raw))));
        registry.reset();
        assert!(registry.get("colour").is_none());
        assert!(registry.get("int").is_some());
    }
}

//! Bind step text to step definitions.
//!
//! A definition's pattern is either a raw regular expression, used
//! verbatim, or an expression such as `a value of {int}` compiled against
//! the [`ParamTypeRegistry`]. Lookup walks definitions in registration
//! order and returns the first match; definition order decides which of
//! several matching patterns wins.
//!
//! Compiled expressions are cached per registry generation, so registering
//! a parameter type makes earlier compilations unreachable.

mod error;
mod expression;

pub use error::MatchError;

use crate::params::ParamTypeRegistry;
use crate::steps::StepDefinition;
use lru::LruCache;
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, trace};

/// Number of compiled expressions kept in memory.
pub const CACHE_CAPACITY: usize = 256;

/// Pattern attached to a step definition.
#[derive(Debug, Clone)]
pub enum StepPattern {
    /// Expression syntax with `{type}` placeholders, `(optional)` text and
    /// `a/b` alternation.
    Expression(String),
    /// Regular expression used verbatim; each capture group yields a raw
    /// string argument.
    Regex(Regex),
}

impl StepPattern {
    /// Source text of the pattern.
    #[must_use]
    pub fn source(&self) -> &str {
        match self {
            Self::Expression(source) => source,
            Self::Regex(regex) => regex.as_str(),
        }
    }
}

impl fmt::Display for StepPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.source())
    }
}

impl From<&str> for StepPattern {
    fn from(source: &str) -> Self {
        Self::Expression(source.to_owned())
    }
}

impl From<String> for StepPattern {
    fn from(source: String) -> Self {
        Self::Expression(source)
    }
}

impl From<Regex> for StepPattern {
    fn from(regex: Regex) -> Self {
        Self::Regex(regex)
    }
}

/// A pattern ready for matching.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    regex: Regex,
    params: Option<Vec<String>>,
}

impl CompiledPattern {
    fn from_regex(regex: Regex) -> Self {
        Self {
            regex,
            params: None,
        }
    }

    /// The anchored regular expression.
    #[must_use]
    pub const fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Parameter type names in placeholder order; `None` for raw regexes.
    #[must_use]
    pub fn param_names(&self) -> Option<&[String]> {
        self.params.as_deref()
    }

    /// Captured text for each argument, or `None` when `text` does not
    /// match.
    #[must_use]
    pub fn captures(&self, text: &str) -> Option<Vec<Option<String>>> {
        let caps = self.regex.captures(text)?;
        let owned = |m: regex::Match<'_>| m.as_str().to_owned();
        let values = match &self.params {
            Some(params) => (0..params.len())
                .map(|index| caps.name(&expression::group_name(index)).map(owned))
                .collect(),
            None => caps.iter().skip(1).map(|group| group.map(owned)).collect(),
        };
        Some(values)
    }

    /// Convert captured text into argument values.
    ///
    /// Expression placeholders go through their parameter type's
    /// transform; raw regex groups become strings, or `null` when the group
    /// did not participate.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::UnknownParamType`] when a placeholder's type
    /// has been removed from `registry`, and [`MatchError::Transform`] when
    /// a transform rejects the text.
    pub fn arguments(
        &self,
        captures: &[Option<String>],
        registry: &ParamTypeRegistry,
    ) -> Result<Vec<Value>, MatchError> {
        let Some(params) = &self.params else {
            return Ok(captures
                .iter()
                .map(|raw| raw.as_deref().map_or(Value::Null, Value::from))
                .collect());
        };
        params
            .iter()
            .zip(captures)
            .map(|(name, raw)| {
                let Some(text) = raw.as_deref() else {
                    return Ok(Value::Null);
                };
                let param = registry
                    .get(name)
                    .ok_or_else(|| MatchError::UnknownParamType {
                        name: name.clone(),
                        pattern: self.regex.as_str().to_owned(),
                    })?;
                param.transform(text).map_err(|err| MatchError::Transform {
                    name: name.clone(),
                    raw: text.to_owned(),
                    message: format!("{err:#}"),
                })
            })
            .collect()
    }
}

/// The definition selected for a step and the text it captured.
#[derive(Debug, Clone)]
pub struct StepMatch<'d> {
    /// The matching definition.
    pub definition: &'d StepDefinition,
    /// Compiled form of the definition's pattern.
    pub pattern: Arc<CompiledPattern>,
    /// Captured text per argument.
    pub captures: Vec<Option<String>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
    generation: u64,
    source: String,
}

/// Compiles patterns and finds the definition matching a step.
pub struct ExpressionMatcher {
    cache: Mutex<LruCache<CacheKey, Arc<CompiledPattern>>>,
}

impl Default for ExpressionMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ExpressionMatcher {
    /// Clones start with an empty cache since they may be paired with a
    /// different registry.
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl fmt::Debug for ExpressionMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpressionMatcher")
            .field("cached", &self.lock_cache().len())
            .finish()
    }
}

const fn cache_capacity() -> NonZeroUsize {
    match NonZeroUsize::new(CACHE_CAPACITY) {
        Some(capacity) => capacity,
        None => NonZeroUsize::MIN,
    }
}

impl ExpressionMatcher {
    /// Create a matcher with an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(LruCache::new(cache_capacity())),
        }
    }

    /// Compile `pattern` against `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::UnknownParamType`] when the expression names a
    /// type missing from `registry` and [`MatchError::InvalidPattern`] when
    /// the resulting regex is malformed.
    pub fn compile(
        &self,
        pattern: &StepPattern,
        registry: &ParamTypeRegistry,
    ) -> Result<Arc<CompiledPattern>, MatchError> {
        let source = match pattern {
            StepPattern::Regex(regex) => {
                return Ok(Arc::new(CompiledPattern::from_regex(regex.clone())));
            }
            StepPattern::Expression(source) => source,
        };
        let key = CacheKey {
            generation: registry.generation(),
            source: source.clone(),
        };
        if let Some(cached) = self.try_cache(&key) {
            return Ok(cached);
        }
        let compiled = expression::compile(source, registry)?;
        trace!(
            target: "tsukemono::matcher",
            pattern = %source,
            regex = %compiled.source,
            "compiled step expression"
        );
        let regex = Regex::new(&compiled.source).map_err(|err| MatchError::InvalidPattern {
            pattern: source.clone(),
            message: err.to_string(),
        })?;
        let entry = Arc::new(CompiledPattern {
            regex,
            params: Some(compiled.params),
        });
        self.store(key, Arc::clone(&entry));
        Ok(entry)
    }

    /// Return the first definition, in registration order, whose pattern
    /// matches `text`.
    ///
    /// # Errors
    ///
    /// A definition whose pattern fails to compile never matches. When no
    /// definition matches, returns the compilation error of the first such
    /// definition, or [`MatchError::NoMatch`] when every pattern compiled.
    pub fn find<'d>(
        &self,
        definitions: &'d [StepDefinition],
        text: &str,
        registry: &ParamTypeRegistry,
    ) -> Result<StepMatch<'d>, MatchError> {
        let mut broken: Option<MatchError> = None;
        for definition in definitions {
            let pattern = match self.compile(definition.pattern(), registry) {
                Ok(pattern) => pattern,
                Err(err) => {
                    debug!(
                        target: "tsukemono::matcher",
                        pattern = %definition.pattern(),
                        error = %err,
                        "step definition does not compile"
                    );
                    broken.get_or_insert(err);
                    continue;
                }
            };
            if let Some(captures) = pattern.captures(text) {
                trace!(
                    target: "tsukemono::matcher",
                    step = text,
                    pattern = %definition.pattern(),
                    "matched step definition"
                );
                return Ok(StepMatch {
                    definition,
                    pattern,
                    captures,
                });
            }
        }
        Err(broken.unwrap_or_else(|| MatchError::NoMatch {
            text: text.to_owned(),
        }))
    }

    /// Transform the captures of `matched` into positional arguments.
    ///
    /// # Errors
    ///
    /// See [`CompiledPattern::arguments`].
    pub fn extract(
        &self,
        matched: &StepMatch<'_>,
        registry: &ParamTypeRegistry,
    ) -> Result<Vec<Value>, MatchError> {
        matched.pattern.arguments(&matched.captures, registry)
    }

    fn try_cache(&self, key: &CacheKey) -> Option<Arc<CompiledPattern>> {
        self.lock_cache().get(key).map(Arc::clone)
    }

    fn store(&self, key: CacheKey, pattern: Arc<CompiledPattern>) {
        self.lock_cache().put(key, pattern);
    }

    fn lock_cache(&self) -> MutexGuard<'_, LruCache<CacheKey, Arc<CompiledPattern>>> {
        match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

//! The registries a feature run draws on.
//!
//! [`Definitions`] bundles parameter types, step definitions, feature
//! hooks and the matcher that ties step text to definitions. It is an
//! explicit value passed by reference into the runner; nothing here is
//! global, and [`Definitions::reset`] returns it to its initial state.

use crate::hooks::HookRegistry;
use crate::matcher::{ExpressionMatcher, MatchError};
use crate::params::{ParamType, ParamTypeRegistry};
use crate::steps::{StepDefinition, StepRegistry};
use serde_json::Value;

/// A step definition bound to the arguments extracted from a step line.
#[derive(Debug, Clone)]
pub struct BoundStep {
    /// The matching definition.
    pub definition: StepDefinition,
    /// Transformed arguments in placeholder order.
    pub args: Vec<Value>,
}

/// Parameter types, steps and hooks used by a run.
#[derive(Debug, Clone, Default)]
pub struct Definitions {
    params: ParamTypeRegistry,
    steps: StepRegistry,
    hooks: HookRegistry,
    matcher: ExpressionMatcher,
}

impl Definitions {
    /// Create definitions holding only the built-in parameter types.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered parameter types.
    #[must_use]
    pub const fn params(&self) -> &ParamTypeRegistry {
        &self.params
    }

    /// Register or replace a parameter type.
    pub fn register_param_type(&mut self, param_type: ParamType) -> Option<ParamType> {
        self.params.register(param_type)
    }

    /// Registered step definitions.
    #[must_use]
    pub const fn steps(&self) -> &StepRegistry {
        &self.steps
    }

    /// Append step definitions in order.
    pub fn register_steps(&mut self, definitions: impl IntoIterator<Item = StepDefinition>) {
        self.steps.register_steps(definitions);
    }

    /// Feature-level hooks.
    #[must_use]
    pub const fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    /// Mutable access to feature-level hooks.
    pub const fn hooks_mut(&mut self) -> &mut HookRegistry {
        &mut self.hooks
    }

    /// The matcher used for lookups.
    #[must_use]
    pub const fn matcher(&self) -> &ExpressionMatcher {
        &self.matcher
    }

    /// Bind `text` to the first matching definition and extract its
    /// arguments.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError`] when no definition matches, a pattern fails to
    /// compile, or an argument transform fails.
    pub fn find(&self, text: &str) -> Result<BoundStep, MatchError> {
        let matched = self
            .matcher
            .find(self.steps.definitions(), text, &self.params)?;
        let args = self.matcher.extract(&matched, &self.params)?;
        Ok(BoundStep {
            definition: matched.definition.clone(),
            args,
        })
    }

    /// Drop custom parameter types, steps and hooks.
    pub fn reset(&mut self) {
        self.params.reset();
        self.steps.reset();
        self.hooks.reset();
    }
}

//! Step definitions and the ordered registry holding them.
//!
//! All five keywords share one collection. The keyword recorded on a
//! definition is cosmetic: lookup only ever compares the pattern with the
//! step text, so a `Given` definition also serves `And`, `When` or `Then`
//! steps.
//!
//! Every step action receives its transformed arguments followed by a
//! [`StepContext`], whether its pattern is an expression or a raw regex.
//!
//! ```rust
//! use tsukemono::steps::{StepDefinition, StepRegistry};
//!
//! let mut registry = StepRegistry::default();
//! registry.register_steps([
//!     StepDefinition::given("a value of {int}", |args, ctx| async move {
//!         ctx.world.set("value", args[0].clone());
//!         Ok(())
//!     }),
//! ]);
//! assert_eq!(registry.len(), 1);
//! ```

use crate::ast::{Step, StepKeyword, Table};
use crate::matcher::StepPattern;
use crate::world::World;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// Future returned by step actions.
pub type StepFuture = BoxFuture<'static, anyhow::Result<()>>;

/// Type-erased step implementation.
pub type StepAction = Arc<dyn Fn(Vec<Value>, StepContext) -> StepFuture + Send + Sync>;

/// Trailing argument handed to every step action.
#[derive(Debug, Clone)]
pub struct StepContext {
    /// Shared World of the run.
    pub world: World,
    /// The step being executed.
    pub step: Step,
    /// The step's data table, if any.
    pub table: Option<Table>,
    /// The step's doc string, if any.
    pub doc: Option<String>,
}

impl StepContext {
    /// Build the context for `step` within `world`.
    #[must_use]
    pub fn new(world: World, step: &Step) -> Self {
        Self {
            world,
            table: step.table.clone(),
            doc: step.doc_string.clone(),
            step: step.clone(),
        }
    }
}

/// A pattern bound to an implementation.
#[derive(Clone)]
pub struct StepDefinition {
    keyword: StepKeyword,
    pattern: StepPattern,
    action: StepAction,
}

impl fmt::Debug for StepDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepDefinition")
            .field("keyword", &self.keyword)
            .field("pattern", &self.pattern.source())
            .finish_non_exhaustive()
    }
}

impl StepDefinition {
    /// Define a step for `keyword` matching `pattern`.
    pub fn new<F, Fut>(keyword: StepKeyword, pattern: impl Into<StepPattern>, action: F) -> Self
    where
        F: Fn(Vec<Value>, StepContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            keyword,
            pattern: pattern.into(),
            action: Arc::new(move |args, ctx| action(args, ctx).boxed()),
        }
    }

    /// Define a `Given` step.
    pub fn given<F, Fut>(pattern: impl Into<StepPattern>, action: F) -> Self
    where
        F: Fn(Vec<Value>, StepContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::new(StepKeyword::Given, pattern, action)
    }

    /// Define a `When` step.
    pub fn when<F, Fut>(pattern: impl Into<StepPattern>, action: F) -> Self
    where
        F: Fn(Vec<Value>, StepContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::new(StepKeyword::When, pattern, action)
    }

    /// Define a `Then` step.
    pub fn then<F, Fut>(pattern: impl Into<StepPattern>, action: F) -> Self
    where
        F: Fn(Vec<Value>, StepContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::new(StepKeyword::Then, pattern, action)
    }

    /// Keyword the definition was registered under.
    #[must_use]
    pub const fn keyword(&self) -> StepKeyword {
        self.keyword
    }

    /// Pattern matched against step text.
    #[must_use]
    pub const fn pattern(&self) -> &StepPattern {
        &self.pattern
    }

    /// Run the action with `args` and the trailing `context`.
    #[must_use]
    pub fn invoke(&self, args: Vec<Value>, context: StepContext) -> StepFuture {
        (self.action)(args, context)
    }
}

/// Ordered collection of step definitions.
#[derive(Debug, Clone, Default)]
pub struct StepRegistry {
    definitions: Vec<StepDefinition>,
}

impl StepRegistry {
    /// Append `definitions`, preserving their order.
    pub fn register_steps(&mut self, definitions: impl IntoIterator<Item = StepDefinition>) {
        for definition in definitions {
            self.register(definition);
        }
    }

    /// Append a single definition.
    pub fn register(&mut self, definition: StepDefinition) {
        debug!(
            target: "tsukemono::steps",
            keyword = %definition.keyword,
            pattern = definition.pattern.source(),
            "registering step definition"
        );
        self.definitions.push(definition);
    }

    /// Definitions in registration order.
    #[must_use]
    pub fn definitions(&self) -> &[StepDefinition] {
        &self.definitions
    }

    /// Number of registered definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether no definition is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Remove every definition.
    pub fn reset(&mut self) {
        self.definitions.clear();
    }
}

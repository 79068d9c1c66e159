//! Incrementally built tree of describes, tests and hooks.
//!
//! Registration calls attach nodes at the current cursor. The cursor is an
//! explicit stack: [`TestTree::describe`] pushes the new node, runs the
//! body so nested calls attach beneath it, then pops back to the parent
//! even when the body fails.
//!
//! ```rust
//! use tsukemono::tree::{TestTree, action};
//!
//! let mut tree = TestTree::new("root");
//! tree.describe("maths", |tree| {
//!     tree.before_each(action(|| async { Ok(()) }));
//!     tree.test("adds", action(|| async { Ok(()) }))?;
//!     tree.describe("nested", |tree| tree.test("deep", action(|| async { Ok(()) })))
//! })
//! .expect("registration");
//! assert_eq!(tree.len(), 4);
//! ```

mod error;
mod node;

pub use error::ConfigurationError;
pub use node::{Describe, DescribeId, Mode, TestLeaf, TestMeta};

use crate::hooks::HookKind;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;
use tracing::trace;

/// Future returned by test and hook actions.
pub type ActionFuture = BoxFuture<'static, anyhow::Result<()>>;

/// Type-erased test or hook body. Each call starts a fresh attempt.
pub type Action = Arc<dyn Fn() -> ActionFuture + Send + Sync>;

/// Wrap an async closure as an [`Action`].
pub fn action<F, Fut>(f: F) -> Action
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

/// Which kinds of node have been registered with `only`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OnlyMode {
    /// A test was registered with `only`.
    pub tests: bool,
    /// A describe was registered with `only`.
    pub describes: bool,
}

impl OnlyMode {
    /// Whether any node was registered with `only`.
    #[must_use]
    pub const fn is_active(self) -> bool {
        self.tests || self.describes
    }
}

/// Arena-backed test tree with a registration cursor.
#[derive(Debug, Clone)]
pub struct TestTree {
    nodes: Vec<Describe>,
    cursor: Vec<DescribeId>,
    only: OnlyMode,
}

impl Default for TestTree {
    fn default() -> Self {
        Self::new("root")
    }
}

fn require_description(kind: &'static str, description: &str) -> Result<(), ConfigurationError> {
    if description.trim().is_empty() {
        return Err(ConfigurationError::EmptyDescription { kind });
    }
    Ok(())
}

impl TestTree {
    /// Create an empty tree whose root carries `description`.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            nodes: vec![Describe::new(description.into(), None)],
            cursor: vec![DescribeId::ROOT],
            only: OnlyMode::default(),
        }
    }

    /// Discard every node and reset only-mode, keeping the root description.
    pub fn clear(&mut self) {
        let description = self.root().map(|root| root.description.clone()).unwrap_or_default();
        *self = Self::new(description);
    }

    /// Replace the root description.
    pub fn set_description(&mut self, description: impl Into<String>) {
        if let Some(root) = self.nodes.first_mut() {
            root.description = description.into();
        }
    }

    /// The root node.
    #[must_use]
    pub fn root(&self) -> Option<&Describe> {
        self.nodes.first()
    }

    /// Look up a describe node.
    #[must_use]
    pub fn node(&self, id: DescribeId) -> Option<&Describe> {
        self.nodes.get(id.index())
    }

    /// Node new registrations attach to.
    #[must_use]
    pub fn cursor(&self) -> DescribeId {
        self.cursor.last().copied().unwrap_or(DescribeId::ROOT)
    }

    /// Current only-mode flags.
    #[must_use]
    pub const fn only_mode(&self) -> OnlyMode {
        self.only
    }

    /// Number of registered describes and tests, excluding the root.
    #[must_use]
    pub fn len(&self) -> usize {
        let tests: usize = self.nodes.iter().map(|node| node.tests.len()).sum();
        self.nodes.len().saturating_sub(1) + tests
    }

    /// Whether nothing but the root exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn current_mut(&mut self) -> Option<&mut Describe> {
        let id = self.cursor();
        self.nodes.get_mut(id.index())
    }

    fn bubble_only_child(&mut self, from: Option<DescribeId>) {
        let mut next = from;
        while let Some(id) = next {
            let Some(node) = self.nodes.get_mut(id.index()) else {
                break;
            };
            node.only_child = true;
            next = node.parent;
        }
    }

    /// Register a describe block and run `body` beneath it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] when the description is empty or
    /// `body` fails.
    pub fn describe<F>(&mut self, description: &str, body: F) -> Result<(), ConfigurationError>
    where
        F: FnOnce(&mut Self) -> Result<(), ConfigurationError>,
    {
        self.describe_with(description, Mode::Normal, Map::new(), body)
    }

    /// Register an exclusive describe block.
    ///
    /// # Errors
    ///
    /// As for [`TestTree::describe`].
    pub fn describe_only<F>(&mut self, description: &str, body: F) -> Result<(), ConfigurationError>
    where
        F: FnOnce(&mut Self) -> Result<(), ConfigurationError>,
    {
        self.describe_with(description, Mode::Only, Map::new(), body)
    }

    /// Register a skipped describe block.
    ///
    /// # Errors
    ///
    /// As for [`TestTree::describe`].
    pub fn describe_skip<F>(&mut self, description: &str, body: F) -> Result<(), ConfigurationError>
    where
        F: FnOnce(&mut Self) -> Result<(), ConfigurationError>,
    {
        self.describe_with(description, Mode::Skip, Map::new(), body)
    }

    /// Register a describe block with an explicit mode and result metadata.
    ///
    /// # Errors
    ///
    /// As for [`TestTree::describe`].
    pub fn describe_with<F>(
        &mut self,
        description: &str,
        mode: Mode,
        meta: Map<String, Value>,
        body: F,
    ) -> Result<(), ConfigurationError>
    where
        F: FnOnce(&mut Self) -> Result<(), ConfigurationError>,
    {
        require_description("describe", description)?;
        let parent = self.cursor();
        let id = DescribeId::new(self.nodes.len());
        let mut node = Describe::new(description.to_owned(), Some(parent));
        node.meta = meta;
        node.only = mode == Mode::Only;
        node.skip = mode == Mode::Skip;
        self.nodes.push(node);
        if let Some(parent_node) = self.nodes.get_mut(parent.index()) {
            parent_node.describes.push(id);
        }
        if mode == Mode::Only {
            self.only.describes = true;
            self.bubble_only_child(Some(parent));
        }
        trace!(target: "tsukemono::tree", description, depth = self.cursor.len(), "describe");
        self.cursor.push(id);
        let outcome = body(self);
        self.cursor.pop();
        outcome
    }

    /// Register a test in the current describe.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::TestOutsideDescribe`] when called at
    /// the root and [`ConfigurationError::EmptyDescription`] for an empty
    /// description.
    pub fn test(&mut self, description: &str, action: Action) -> Result<(), ConfigurationError> {
        self.test_with(description, action, TestMeta::default(), Mode::Normal)
    }

    /// Register an exclusive test.
    ///
    /// # Errors
    ///
    /// As for [`TestTree::test`].
    pub fn test_only(&mut self, description: &str, action: Action) -> Result<(), ConfigurationError> {
        self.test_with(description, action, TestMeta::default(), Mode::Only)
    }

    /// Register a skipped test.
    ///
    /// # Errors
    ///
    /// As for [`TestTree::test`].
    pub fn test_skip(&mut self, description: &str, action: Action) -> Result<(), ConfigurationError> {
        self.test_with(description, action, TestMeta::default(), Mode::Skip)
    }

    /// Register a test with per-test overrides and an explicit mode.
    ///
    /// # Errors
    ///
    /// As for [`TestTree::test`].
    pub fn test_with(
        &mut self,
        description: &str,
        action: Action,
        meta: TestMeta,
        mode: Mode,
    ) -> Result<(), ConfigurationError> {
        require_description("test", description)?;
        let leaf = TestLeaf {
            description: description.to_owned(),
            action: Some(action),
            meta,
            only: mode == Mode::Only,
            skip: mode == Mode::Skip,
            disabled: false,
        };
        self.attach(leaf)?;
        if mode == Mode::Only {
            self.only.tests = true;
            self.bubble_only_child(Some(self.cursor()));
        }
        Ok(())
    }

    /// Register a disabled test. No action is needed and the description
    /// is not validated.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::TestOutsideDescribe`] when called at
    /// the root.
    pub fn xtest(&mut self, description: &str) -> Result<(), ConfigurationError> {
        self.attach(TestLeaf {
            description: description.to_owned(),
            action: None,
            meta: TestMeta::default(),
            only: false,
            skip: true,
            disabled: true,
        })
    }

    fn attach(&mut self, leaf: TestLeaf) -> Result<(), ConfigurationError> {
        if self.cursor() == DescribeId::ROOT {
            return Err(ConfigurationError::TestOutsideDescribe {
                description: leaf.description,
            });
        }
        trace!(target: "tsukemono::tree", description = %leaf.description, "test");
        if let Some(node) = self.current_mut() {
            node.tests.push(leaf);
        }
        Ok(())
    }

    /// Append `hook` to the current node's `kind` list.
    pub fn hook(&mut self, kind: HookKind, hook: Action) {
        if let Some(node) = self.current_mut() {
            node.hooks.push(kind, hook);
        }
    }

    /// Run `hook` once before the current node's children.
    pub fn before_all(&mut self, hook: Action) {
        self.hook(HookKind::BeforeAll, hook);
    }

    /// Run `hook` before each test of the current node.
    pub fn before_each(&mut self, hook: Action) {
        self.hook(HookKind::BeforeEach, hook);
    }

    /// Run `hook` once after the current node's children.
    pub fn after_all(&mut self, hook: Action) {
        self.hook(HookKind::AfterAll, hook);
    }

    /// Run `hook` after each test of the current node.
    pub fn after_each(&mut self, hook: Action) {
        self.hook(HookKind::AfterEach, hook);
    }
}

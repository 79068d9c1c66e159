//! Lifecycle hooks.
//!
//! [`Hooks`] holds the four hook lists of a describe node. The
//! [`HookRegistry`] holds feature-level hooks registered alongside step
//! definitions: `before_all`/`after_all` run around each feature and
//! `before_each`/`after_each` run around each scenario.

use crate::tree::Action;
use serde::Serialize;
use std::fmt;

/// The four hook positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HookKind {
    /// Once before a suite's children.
    BeforeAll,
    /// Before every test of a suite.
    BeforeEach,
    /// Once after a suite's children.
    AfterAll,
    /// After every test of a suite.
    AfterEach,
}

impl HookKind {
    /// Every hook kind in declaration order.
    pub const ALL: [Self; 4] = [
        Self::BeforeAll,
        Self::BeforeEach,
        Self::AfterAll,
        Self::AfterEach,
    ];

    /// Name used in results and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BeforeAll => "beforeAll",
            Self::BeforeEach => "beforeEach",
            Self::AfterAll => "afterAll",
            Self::AfterEach => "afterEach",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hook lists keyed by [`HookKind`].
#[derive(Clone, Default)]
pub struct Hooks {
    before_all: Vec<Action>,
    before_each: Vec<Action>,
    after_all: Vec<Action>,
    after_each: Vec<Action>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("before_all", &self.before_all.len())
            .field("before_each", &self.before_each.len())
            .field("after_all", &self.after_all.len())
            .field("after_each", &self.after_each.len())
            .finish()
    }
}

impl Hooks {
    /// Append `hook` to the `kind` list.
    pub fn push(&mut self, kind: HookKind, hook: Action) {
        self.list_mut(kind).push(hook);
    }

    /// Hooks registered for `kind`, in registration order.
    #[must_use]
    pub fn get(&self, kind: HookKind) -> &[Action] {
        match kind {
            HookKind::BeforeAll => &self.before_all,
            HookKind::BeforeEach => &self.before_each,
            HookKind::AfterAll => &self.after_all,
            HookKind::AfterEach => &self.after_each,
        }
    }

    /// Whether no hook of any kind is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        HookKind::ALL.iter().all(|kind| self.get(*kind).is_empty())
    }

    /// Drop every hook.
    pub fn clear(&mut self) {
        for kind in HookKind::ALL {
            self.list_mut(kind).clear();
        }
    }

    const fn list_mut(&mut self, kind: HookKind) -> &mut Vec<Action> {
        match kind {
            HookKind::BeforeAll => &mut self.before_all,
            HookKind::BeforeEach => &mut self.before_each,
            HookKind::AfterAll => &mut self.after_all,
            HookKind::AfterEach => &mut self.after_each,
        }
    }
}

/// Feature-level hooks applied by the feature runner.
#[derive(Debug, Clone, Default)]
pub struct HookRegistry {
    hooks: Hooks,
}

impl HookRegistry {
    /// Run `hook` before each feature.
    pub fn before_all(&mut self, hook: Action) {
        self.hooks.push(HookKind::BeforeAll, hook);
    }

    /// Run `hook` after each feature.
    pub fn after_all(&mut self, hook: Action) {
        self.hooks.push(HookKind::AfterAll, hook);
    }

    /// Run `hook` before each scenario.
    pub fn before_each(&mut self, hook: Action) {
        self.hooks.push(HookKind::BeforeEach, hook);
    }

    /// Run `hook` after each scenario.
    pub fn after_each(&mut self, hook: Action) {
        self.hooks.push(HookKind::AfterEach, hook);
    }

    /// Hooks registered for `kind`.
    #[must_use]
    pub fn registered(&self, kind: HookKind) -> &[Action] {
        self.hooks.get(kind)
    }

    /// Drop every hook.
    pub fn reset(&mut self) {
        self.hooks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::action;
    use rstest::rstest;

    #[rstest]
    fn registry_routes_hooks_by_kind() {
        let mut registry = HookRegistry::default();
        registry.before_all(action(|| async { Ok(()) }));
        registry.after_each(action(|| async { Ok(()) }));
        registry.after_each(action(|| async { Ok(()) }));
        assert_eq!(registry.registered(HookKind::BeforeAll).len(), 1);
        assert_eq!(registry.registered(HookKind::AfterEach).len(), 2);
        assert!(registry.registered(HookKind::BeforeEach).is_empty());
        registry.reset();
        assert!(registry.hooks.is_empty());
    }

    #[rstest]
    #[case(HookKind::BeforeAll, "beforeAll")]
    #[case(HookKind::AfterEach, "afterEach")]
    fn hook_names(#[case] kind: HookKind, #[case] name: &str) {
        assert_eq!(kind.to_string(), name);
    }
}

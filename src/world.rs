//! Shared World context handed to every step.
//!
//! The World is a JSON object behind a shared lock. Cloning a [`World`]
//! clones the handle, so every step of a run observes the writes of the
//! steps before it.

use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors building a World from arbitrary JSON.
#[derive(Debug, Error)]
pub enum WorldError {
    /// The initial World value was not a JSON object.
    #[error("world must be a JSON object, found {found}")]
    NotAnObject {
        /// JSON type found instead.
        found: &'static str,
    },
}

/// Cloneable handle to the shared World object.
#[derive(Debug, Clone, Default)]
pub struct World {
    inner: Arc<Mutex<Map<String, Value>>>,
}

const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl World {
    /// Create an empty World.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a World holding `map`.
    #[must_use]
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(map)),
        }
    }

    /// Create a World from a JSON value, which must be an object.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::NotAnObject`] for any other JSON type.
    pub fn from_value(value: Value) -> Result<Self, WorldError> {
        match value {
            Value::Object(map) => Ok(Self::from_map(map)),
            other => Err(WorldError::NotAnObject {
                found: type_name(&other),
            }),
        }
    }

    /// Clone of the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.lock().get(key).cloned()
    }

    /// Store `value` under `key`, returning the previous value.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.lock().insert(key.into(), value.into())
    }

    /// Remove `key`, returning its value.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.lock().remove(key)
    }

    /// Run `f` with exclusive access to the underlying object.
    pub fn update<R>(&self, f: impl FnOnce(&mut Map<String, Value>) -> R) -> R {
        f(&mut self.lock())
    }

    /// Copy of the current contents.
    #[must_use]
    pub fn snapshot(&self) -> Map<String, Value> {
        self.lock().clone()
    }

    /// Whether two handles share the same storage.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn lock(&self) -> MutexGuard<'_, Map<String, Value>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

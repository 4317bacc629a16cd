//! The mutable container threaded through every step of one run.

use crate::error::{ChainError, Result};
use crate::exception::Exception;
use crate::types::{EXCEPTION, RESERVED_NAMES};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// Shared state for one run of a chain.
///
/// Fields are kept in insertion order. The pending exception lives in its
/// own slot rather than in the field map.
#[derive(Clone, Debug, Default)]
pub struct State {
    fields: Map<String, Value>,
    exception: Option<Exception>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a state from a JSON object.
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => {
                let mut state = State::new();
                for (name, value) in map {
                    state.set(name, value)?;
                }
                Ok(state)
            }
            other => Err(ChainError::Serialization(format!(
                "state must be a JSON object, got {}",
                other
            ))),
        }
    }

    /// Whether a field with this name is present.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Raw value of a field.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Typed value of a field.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        match self.fields.get(name) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    /// Set a field, returning the previous value.
    ///
    /// Fails for reserved names; use the exception accessors for the
    /// exception slot.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Result<Option<Value>> {
        let name = name.into();
        if RESERVED_NAMES.contains(&name.as_str()) {
            return Err(ChainError::ReservedName(name));
        }
        Ok(self.fields.insert(name, value.into()))
    }

    /// Serialize a value into a field.
    pub fn set_serialized<T: Serialize>(
        &mut self,
        name: impl Into<String>,
        value: &T,
    ) -> Result<Option<Value>> {
        let value = serde_json::to_value(value)?;
        self.set(name, value)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.fields.shift_remove(name)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    // --- Exception slot ---

    /// The pending exception, if any.
    pub fn exception(&self) -> Option<&Exception> {
        self.exception.as_ref()
    }

    pub fn has_exception(&self) -> bool {
        self.exception.is_some()
    }

    /// Replace the pending exception, returning the previous one.
    pub fn set_exception(&mut self, exception: Exception) -> Option<Exception> {
        self.exception.replace(exception)
    }

    /// Mark the pending exception as handled.
    pub fn clear_exception(&mut self) -> Option<Exception> {
        self.exception.take()
    }

    /// Merge a step's returned updates into the state.
    ///
    /// Nothing is written if any field name is reserved.
    pub fn merge(&mut self, updates: Updates) -> Result<()> {
        if let Some((name, _)) = updates
            .fields
            .iter()
            .find(|(name, _)| RESERVED_NAMES.contains(&name.as_str()))
        {
            return Err(ChainError::ReservedName(name.clone()));
        }
        for (name, value) in updates.fields {
            self.fields.insert(name, value);
        }
        if updates.clear_exception {
            self.exception = None;
        }
        Ok(())
    }

    /// Fields as a JSON object, with the exception rendered as its message.
    pub fn to_json(&self) -> Value {
        let mut map = self.fields.clone();
        let exception = match &self.exception {
            Some(e) => Value::String(e.to_string()),
            None => Value::Null,
        };
        map.insert(EXCEPTION.to_string(), exception);
        Value::Object(map)
    }
}

impl PartialEq for State {
    /// Field-wise equality; exceptions compare by identity.
    fn eq(&self, other: &Self) -> bool {
        let exceptions_match = match (&self.exception, &other.exception) {
            (None, None) => true,
            (Some(a), Some(b)) => a.same_as(b),
            _ => false,
        };
        exceptions_match && self.fields == other.fields
    }
}

/// Changes a step asks to apply to the state.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Updates {
    fields: Vec<(String, Value)>,
    clear_exception: bool,
}

impl Updates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn set_serialized<T: Serialize>(self, name: impl Into<String>, value: &T) -> Result<Self> {
        let value = serde_json::to_value(value)?;
        Ok(self.set(name, value))
    }

    /// Mark the pending exception as handled once these updates are merged.
    pub fn clear_exception(mut self) -> Self {
        self.clear_exception = true;
        self
    }

    /// Build updates from a JSON object.
    ///
    /// `"exception": null` clears the pending exception.
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Object(mut map) => {
                let clear_exception = matches!(map.get(EXCEPTION), Some(Value::Null));
                if clear_exception {
                    map.shift_remove(EXCEPTION);
                }
                Ok(Self {
                    fields: map.into_iter().collect(),
                    clear_exception,
                })
            }
            other => Err(ChainError::Serialization(format!(
                "updates must be a JSON object, got {}",
                other
            ))),
        }
    }

    pub fn clears_exception(&self) -> bool {
        self.clear_exception
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && !self.clear_exception
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Updates {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            clear_exception: false,
        }
    }
}

//! Data sources a template can be connected to

use std::cell::RefCell;

use serde_json::{Map, Value};

use super::events::{EventEmitter, Observable};

/// Event emitted by [`Store`] whenever a field changes
pub const CHANGE: &str = "change";

/// Data a template reads from while rendering.
///
/// Plain sources only provide a snapshot. Sources that also expose an
/// [`Observable`] are watched while connected.
pub trait DataSource {
    /// Value exposed to the render context under `data_source`
    fn snapshot(&self) -> Value;

    /// Event capability of this source, if any
    fn observable(&self) -> Option<&dyn Observable> {
        None
    }
}

impl DataSource for Value {
    fn snapshot(&self) -> Value {
        self.clone()
    }
}

/// A JSON object that announces its changes
#[derive(Debug, Default)]
pub struct Store {
    data: RefCell<Map<String, Value>>,
    events: EventEmitter,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with the fields of a JSON object
    pub fn from_value(value: Value) -> Self {
        let data = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            data: RefCell::new(data),
            events: EventEmitter::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.data.borrow().get(key).cloned()
    }

    /// Set a field and emit `change` with `{key: value}` as payload
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        self.data.borrow_mut().insert(key.clone(), value.clone());

        let mut change = Map::new();
        change.insert(key, value);
        self.events.emit(CHANGE, Some(Value::Object(change)));
    }

    pub fn events(&self) -> &EventEmitter {
        &self.events
    }
}

impl DataSource for Store {
    fn snapshot(&self) -> Value {
        Value::Object(self.data.borrow().clone())
    }

    fn observable(&self) -> Option<&dyn Observable> {
        Some(&self.events)
    }
}

//! Per-render data bag handed to generators and the interpolator

use serde_json::{Map, Value};

/// Key holding the instance options
pub const OPTION_KEY: &str = "option";
/// Key holding the snapshot of the bound data source
pub const DATA_SOURCE_KEY: &str = "data_source";
/// Key holding the draw counter
pub const DRAW_KEY: &str = "draw";
/// Key holding the element identifier
pub const DOM_ID_KEY: &str = "dom_id";

/// Data available to one render call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderContext {
    data: Map<String, Value>,
}

impl RenderContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Look up a dotted path such as `user.name` or `items.0`
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let root = self.data.get(segments.next()?)?;
        segments.try_fold(root, |value, segment| match value {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.data.insert(key.into(), value.into())
    }

    /// Merge `other` on top of this context; its keys win
    pub fn merge(&mut self, other: Map<String, Value>) {
        self.data.extend(other);
    }

    /// Merge a JSON value if it is an object; anything else is ignored
    pub fn merge_value(&mut self, value: &Value) {
        if let Value::Object(map) = value {
            self.merge(map.clone());
        }
    }

    /// The draw counter recorded in this context
    pub fn draw(&self) -> Option<u64> {
        self.get(DRAW_KEY).and_then(Value::as_u64)
    }

    /// The element identifier recorded in this context
    pub fn dom_id(&self) -> Option<&str> {
        self.get(DOM_ID_KEY).and_then(Value::as_str)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.data)
    }
}

impl From<Map<String, Value>> for RenderContext {
    fn from(data: Map<String, Value>) -> Self {
        Self { data }
    }
}

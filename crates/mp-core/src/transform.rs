use crate::convert::Converter;
use crate::error::Result;
use crate::schema::{Field, Schema};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Caller-supplied transform. May produce a value from an absent input.
pub type TransformFn = Arc<dyn Fn(Option<&Value>) -> Result<Option<Value>> + Send + Sync>;

/// Rewrites a payload before any field of a schema is read.
pub type Preprocessor = Arc<dyn Fn(&Value) -> Result<Value> + Send + Sync>;

/// Picks the transform for a field from the resolved value itself.
pub type ConstructFn = Arc<dyn Fn(Option<&Value>) -> Result<Constructed> + Send + Sync>;

/// How a resolved value becomes an output value.
#[derive(Clone)]
pub enum Transform {
    Convert(Converter),
    Function(TransformFn),
    Schema(Arc<Schema>),
}

impl Transform {
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(Option<&Value>) -> Result<Option<Value>> + Send + Sync + 'static,
    {
        Transform::Function(Arc::new(f))
    }

    /// Look up a converter by name.
    pub fn named(name: &str) -> Result<Self> {
        name.parse().map(Transform::Convert)
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Transform::Function(_))
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transform::Convert(c) => f.debug_tuple("Convert").field(c).finish(),
            Transform::Function(_) => f.write_str("Function(..)"),
            Transform::Schema(s) => f.debug_tuple("Schema").field(s).finish(),
        }
    }
}

impl From<Converter> for Transform {
    fn from(c: Converter) -> Self {
        Transform::Convert(c)
    }
}

impl From<Schema> for Transform {
    fn from(s: Schema) -> Self {
        Transform::Schema(Arc::new(s))
    }
}

impl From<Arc<Schema>> for Transform {
    fn from(s: Arc<Schema>) -> Self {
        Transform::Schema(s)
    }
}

impl From<Vec<Field>> for Transform {
    fn from(fields: Vec<Field>) -> Self {
        Transform::Schema(Arc::new(Schema::new(fields)))
    }
}

/// Result of a `construct_transform` callback.
#[derive(Debug, Clone, Default)]
pub struct Constructed {
    pub transform: Option<Transform>,
    /// Replacement for the resolved value; `None` keeps it.
    pub value: Option<Value>,
}

impl Constructed {
    pub fn new(transform: impl Into<Transform>) -> Self {
        Self {
            transform: Some(transform.into()),
            value: None,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }
}

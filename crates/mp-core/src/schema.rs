use crate::access::FieldPath;
use crate::error::{Error, Result};
use crate::transform::{ConstructFn, Constructed, Preprocessor, Transform};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// One schema entry: where to read a value and how to emit it.
#[derive(Clone, Default)]
pub struct Field {
    pub(crate) path: FieldPath,
    pub(crate) name: Option<String>,
    pub(crate) is_array: bool,
    pub(crate) transform: Option<Transform>,
    pub(crate) construct: Option<ConstructFn>,
}

impl Field {
    pub fn new(path: impl Into<FieldPath>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Output key; defaults to the first path segment.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn array(mut self) -> Self {
        self.is_array = true;
        self
    }

    pub fn transform(mut self, transform: impl Into<Transform>) -> Self {
        self.transform = Some(transform.into());
        self
    }

    pub fn function<F>(self, f: F) -> Self
    where
        F: Fn(Option<&Value>) -> Result<Option<Value>> + Send + Sync + 'static,
    {
        self.transform(Transform::function(f))
    }

    pub fn construct_transform<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<&Value>) -> Result<Constructed> + Send + Sync + 'static,
    {
        self.construct = Some(Arc::new(f));
        self
    }

    pub(crate) fn with_construct(mut self, f: ConstructFn) -> Self {
        self.construct = Some(f);
        self
    }

    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    pub fn is_array(&self) -> bool {
        self.is_array
    }

    pub fn output_key(&self) -> Option<&str> {
        self.name.as_deref().or_else(|| self.path.first())
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("path", &self.path)
            .field("name", &self.name)
            .field("is_array", &self.is_array)
            .field("transform", &self.transform)
            .field("construct", &self.construct.as_ref().map(|_| ".."))
            .finish()
    }
}

/// Ordered field list, optionally preceded by a preprocessor.
#[derive(Clone, Default)]
pub struct Schema {
    pub(crate) fields: Vec<Field>,
    pub(crate) preprocessor: Option<Preprocessor>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            fields,
            preprocessor: None,
        }
    }

    pub fn with_preprocessor<F>(self, f: F) -> Self
    where
        F: Fn(&Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.with_preprocessor_fn(Arc::new(f))
    }

    pub(crate) fn with_preprocessor_fn(mut self, f: Preprocessor) -> Self {
        self.preprocessor = Some(f);
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn has_preprocessor(&self) -> bool {
        self.preprocessor.is_some()
    }

    /// Static checks: every entry has a `field` and output keys are unique,
    /// recursively. Schemas picked by `construct_transform` are checked when parsed.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for (index, field) in self.fields.iter().enumerate() {
            let Some(key) = field.output_key() else {
                return Err(Error::MissingField { index });
            };
            if !seen.insert(key) {
                return Err(Error::DuplicateField {
                    name: key.to_string(),
                });
            }
            if let Some(Transform::Schema(nested)) = &field.transform {
                nested.validate()?;
            }
        }
        Ok(())
    }
}

impl From<Vec<Field>> for Schema {
    fn from(fields: Vec<Field>) -> Self {
        Self::new(fields)
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("fields", &self.fields)
            .field("preprocessor", &self.preprocessor.is_some())
            .finish()
    }
}

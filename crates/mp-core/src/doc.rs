// Schemas authored as JSON documents.
// A document names converters, registered functions and preprocessors by
// string; compiling it against a `Registry` yields a `Schema`.
use crate::access::FieldPath;
use crate::convert::Converter;
use crate::error::{Error, Result};
use crate::schema::{Field, Schema};
use crate::transform::{ConstructFn, Constructed, Preprocessor, Transform, TransformFn};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PathDoc {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDoc {
    #[serde(default)]
    pub field: Option<PathDoc>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_array: bool,
    #[serde(default)]
    pub transform: Option<Value>,
    #[serde(default)]
    pub construct_transform: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SchemaDoc {
    Plain(Vec<FieldDoc>),
    Wrapped {
        #[serde(default)]
        preprocessor: Option<String>,
        schema: Vec<FieldDoc>,
    },
}

impl SchemaDoc {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn compile(&self, registry: &Registry) -> Result<Schema> {
        match self {
            SchemaDoc::Plain(fields) => compile_fields(fields, registry).map(Schema::new),
            SchemaDoc::Wrapped {
                preprocessor,
                schema,
            } => {
                let compiled = Schema::new(compile_fields(schema, registry)?);
                match preprocessor {
                    Some(name) => Ok(compiled.with_preprocessor_fn(registry.preprocessor(name)?)),
                    None => Ok(compiled),
                }
            }
        }
    }
}

fn compile_fields(fields: &[FieldDoc], registry: &Registry) -> Result<Vec<Field>> {
    fields.iter().map(|f| compile_field(f, registry)).collect()
}

fn compile_field(doc: &FieldDoc, registry: &Registry) -> Result<Field> {
    // A missing `field` compiles to an empty path and fails when parsed.
    let path = match &doc.field {
        Some(PathDoc::One(s)) => FieldPath::from(s.as_str()),
        Some(PathDoc::Many(v)) => FieldPath::from(v.clone()),
        None => FieldPath::default(),
    };
    let mut field = Field::new(path);
    if let Some(name) = &doc.name {
        field = field.name(name.as_str());
    }
    if doc.is_array {
        field = field.array();
    }
    if let Some(spec) = &doc.transform {
        field = field.transform(compile_transform(spec, registry)?);
    }
    if let Some(name) = &doc.construct_transform {
        field = field.with_construct(registry.constructor(name)?);
    }
    Ok(field)
}

/// Resolve a transform spec: a converter or function name, a nested field
/// list, or a `{ "schema" }` object with an optional `"preprocessor"`.
pub fn compile_transform(spec: &Value, registry: &Registry) -> Result<Transform> {
    match spec {
        Value::String(name) => {
            if let Ok(c) = name.parse::<Converter>() {
                return Ok(Transform::Convert(c));
            }
            match registry.functions.get(name) {
                Some(f) => Ok(Transform::Function(f.clone())),
                None => Err(Error::InvalidTransform(spec.to_string())),
            }
        }
        Value::Array(_) => {
            let fields: Vec<FieldDoc> = serde_json::from_value(spec.clone())
                .map_err(|e| Error::InvalidTransform(format!("{spec}: {e}")))?;
            Ok(Schema::new(compile_fields(&fields, registry)?).into())
        }
        Value::Object(map) if map.contains_key("schema") => {
            let doc: SchemaDoc = serde_json::from_value(spec.clone())
                .map_err(|e| Error::InvalidTransform(format!("{spec}: {e}")))?;
            Ok(doc.compile(registry)?.into())
        }
        other => Err(Error::InvalidTransform(other.to_string())),
    }
}

/// Named functions available to schema documents.
#[derive(Clone, Default)]
pub struct Registry {
    functions: HashMap<String, TransformFn>,
    preprocessors: HashMap<String, Preprocessor>,
    constructors: HashMap<String, ConstructFn>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with `split-lines` and the `identity` preprocessor.
    pub fn with_builtins() -> Self {
        let mut r = Self::new();
        r.register_function("split-lines", |v| {
            Ok(match v {
                Some(Value::String(s)) if !s.is_empty() => {
                    Some(Value::Array(s.split('\n').map(Value::from).collect()))
                }
                _ => None,
            })
        });
        r.register_preprocessor("identity", |v| Ok(v.clone()));
        r
    }

    pub fn register_function<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(Option<&Value>) -> Result<Option<Value>> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(f));
        self
    }

    pub fn register_preprocessor<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.preprocessors.insert(name.into(), Arc::new(f));
        self
    }

    pub fn register_constructor<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(Option<&Value>) -> Result<Constructed> + Send + Sync + 'static,
    {
        self.constructors.insert(name.into(), Arc::new(f));
        self
    }

    fn preprocessor(&self, name: &str) -> Result<Preprocessor> {
        self.preprocessors
            .get(name)
            .cloned()
            .ok_or_else(|| Error::Unregistered {
                kind: "preprocessor",
                name: name.to_string(),
            })
    }

    fn constructor(&self, name: &str) -> Result<ConstructFn> {
        self.constructors
            .get(name)
            .cloned()
            .ok_or_else(|| Error::Unregistered {
                kind: "transform constructor",
                name: name.to_string(),
            })
    }
}

use crate::access;
use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingSink, UNPARSED_KEY, UNPARSED_PROPERTIES};
use crate::error::{Error, Result, kind_name};
use crate::schema::{Field, Schema};
use crate::track::{AccessLog, Origin};
use crate::transform::Transform;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Clone, Copy, Debug)]
pub struct ParserOptions {
    /// Report payload properties that no field read.
    pub track_unparsed: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            track_unparsed: true,
        }
    }
}

impl ParserOptions {
    /// Shaped output only: no `$unparsed` key and no diagnostics.
    pub fn suppressed() -> Self {
        Self {
            track_unparsed: false,
        }
    }
}

/// A compiled schema, reusable across payloads and threads.
#[derive(Clone)]
pub struct Parser {
    schema: Arc<Schema>,
    options: ParserOptions,
    sink: Arc<dyn DiagnosticSink>,
}

pub fn compile(schema: impl Into<Schema>, options: ParserOptions) -> Parser {
    Parser::compile(schema, options)
}

impl Parser {
    pub fn compile(schema: impl Into<Schema>, options: ParserOptions) -> Self {
        Self::from_shared(Arc::new(schema.into()), options)
    }

    pub fn from_shared(schema: Arc<Schema>, options: ParserOptions) -> Self {
        tracing::debug!(
            fields = schema.fields.len(),
            preprocessor = schema.has_preprocessor(),
            track_unparsed = options.track_unparsed,
            "compiled parser"
        );
        Self {
            schema,
            options,
            sink: Arc::new(TracingSink),
        }
    }

    pub fn with_sink(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn options(&self) -> ParserOptions {
        self.options
    }

    /// Parse a response body; an empty body gives an empty object.
    pub fn parse_str(&self, payload: &str) -> Result<Map<String, Value>> {
        if payload.is_empty() {
            return Ok(Map::new());
        }
        let value: Value = serde_json::from_str(payload)?;
        self.parse(&value)
    }

    pub fn parse(&self, payload: &Value) -> Result<Map<String, Value>> {
        let decoded;
        let payload = match payload {
            Value::String(s) if s.is_empty() => return Ok(Map::new()),
            Value::String(s) => {
                decoded = serde_json::from_str::<Value>(s)?;
                &decoded
            }
            other => other,
        };
        if !self.options.track_unparsed {
            return apply_schema(&self.schema, payload, &Scope::untracked());
        }

        let prepared = match &self.schema.preprocessor {
            Some(pre) => Cow::Owned(pre(payload)?),
            None => Cow::Borrowed(payload),
        };
        let log = AccessLog::new();
        let scope = Scope {
            log: Some(&log),
            base: Some(Vec::new()),
        };
        let mut out = apply_fields(&self.schema.fields, &prepared, &scope)?;
        if let Some(unparsed) = log.unparsed(&prepared) {
            if out.contains_key(UNPARSED_KEY) {
                return Err(Error::DuplicateField {
                    name: UNPARSED_KEY.to_string(),
                });
            }
            self.sink.publish(&Diagnostic {
                event: UNPARSED_PROPERTIES,
                unparsed: unparsed.clone(),
                raw: payload.clone(),
            });
            out.insert(UNPARSED_KEY.to_string(), unparsed);
        }
        Ok(out)
    }
}

/// Where the current input sits in the top-level payload, when tracked.
struct Scope<'a> {
    log: Option<&'a AccessLog>,
    base: Option<Origin>,
}

impl<'a> Scope<'a> {
    fn untracked() -> Self {
        Self {
            log: None,
            base: None,
        }
    }

    fn child(&self, base: Option<Origin>) -> Scope<'a> {
        Scope {
            log: self.log,
            base,
        }
    }

    fn lookup<'v>(&self, data: &'v Value, path: &[String]) -> (Option<&'v Value>, Option<Origin>) {
        let origin = match (self.log, &self.base) {
            (Some(log), Some(base)) => log.record(base, data, path),
            _ => None,
        };
        (access::get_value(data, path), origin)
    }
}

fn apply_schema(schema: &Schema, data: &Value, scope: &Scope<'_>) -> Result<Map<String, Value>> {
    match &schema.preprocessor {
        Some(pre) => {
            let prepared = pre(data)?;
            apply_fields(&schema.fields, &prepared, &scope.child(None))
        }
        None => apply_fields(&schema.fields, data, scope),
    }
}

fn apply_fields(fields: &[Field], data: &Value, scope: &Scope<'_>) -> Result<Map<String, Value>> {
    if !data.is_object() {
        return Err(Error::NotAnObject {
            found: kind_name(data),
        });
    }
    if let Some(index) = fields.iter().position(|f| f.path.is_empty()) {
        return Err(Error::MissingField { index });
    }
    let mut out = Map::new();
    let mut claimed = HashSet::new();
    for (index, field) in fields.iter().enumerate() {
        parse_field_at(data, field, index, &mut out, &mut claimed, scope)?;
    }
    Ok(out)
}

/// Apply one field to `data`, writing into `out`. Nothing is tracked.
/// Keys already present in `out` count as taken.
pub fn parse_field(data: &Value, field: &Field, out: &mut Map<String, Value>) -> Result<()> {
    let mut claimed = out.keys().cloned().collect();
    parse_field_at(data, field, 0, out, &mut claimed, &Scope::untracked())
}

fn parse_field_at(
    data: &Value,
    field: &Field,
    index: usize,
    out: &mut Map<String, Value>,
    claimed: &mut HashSet<String>,
    scope: &Scope<'_>,
) -> Result<()> {
    if !data.is_object() {
        return Err(Error::NotAnObject {
            found: kind_name(data),
        });
    }
    let Some(key) = field.output_key() else {
        return Err(Error::MissingField { index });
    };
    let (found, mut origin) = scope.lookup(data, field.path.segments());
    let mut value = found.map(Cow::Borrowed);

    let constructed;
    let transform = match &field.construct {
        Some(construct) => {
            let built = construct(value.as_deref())?;
            if let Some(replacement) = built.value {
                value = Some(Cow::Owned(replacement));
                origin = None;
            }
            constructed = built.transform;
            constructed.as_ref()
        }
        None => field.transform.as_ref(),
    };

    let result = if field.is_array {
        let from_list = matches!(value.as_deref(), Some(Value::Array(_)));
        let items = access::force_array(value.as_deref());
        let mut values = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let v = match transform {
                Some(t) => {
                    let item_origin = origin.as_ref().map(|o| {
                        let mut o = o.clone();
                        if from_list {
                            o.push(i.to_string());
                        }
                        o
                    });
                    resolve(Some(item), item_origin, t, scope)?.unwrap_or(Value::Null)
                }
                None => item.clone(),
            };
            values.push(v);
        }
        Some(Value::Array(values))
    } else {
        match transform {
            Some(t) if value.is_some() || t.is_function() => {
                resolve(value.as_deref(), origin, t, scope)?
            }
            _ => value.map(Cow::into_owned),
        }
    };

    // Claimed even when nothing is written, so an absent first entry still conflicts.
    if !claimed.insert(key.to_string()) {
        return Err(Error::DuplicateField {
            name: key.to_string(),
        });
    }
    match result {
        Some(v) => {
            tracing::trace!(field = key, "parsed field");
            out.insert(key.to_string(), v);
        }
        None => tracing::trace!(field = key, "omitted absent field"),
    }
    Ok(())
}

/// Apply `transform` to a single value. Nested schemas are parsed untracked.
pub fn transform_value(value: Option<&Value>, transform: &Transform) -> Result<Option<Value>> {
    resolve(value, None, transform, &Scope::untracked())
}

fn resolve(
    value: Option<&Value>,
    origin: Option<Origin>,
    transform: &Transform,
    scope: &Scope<'_>,
) -> Result<Option<Value>> {
    match transform {
        Transform::Convert(c) => c.apply(value).map(Some),
        Transform::Function(f) => f(value),
        Transform::Schema(schema) => {
            let Some(value) = value else {
                return Ok(None);
            };
            let parsed = apply_schema(schema, value, &scope.child(origin))?;
            Ok(Some(Value::Object(parsed)))
        }
    }
}

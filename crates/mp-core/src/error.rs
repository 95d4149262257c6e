use thiserror::Error as ThisError;

/// Broad category of a parse failure.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// Mistake in a schema definition (missing field, duplicate key, bad transform).
    Schema,
    /// A converter or transform function rejected a value.
    Conversion,
    /// The payload itself has the wrong shape or is not JSON.
    Payload,
    Io,
}

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("schema entry #{index} has no `field`")]
    MissingField { index: usize },

    #[error("duplicate \"{name}\" in parsing model")]
    DuplicateField { name: String },

    #[error("invalid transform: {0}")]
    InvalidTransform(String),

    #[error("no {kind} registered as \"{name}\"")]
    Unregistered { kind: &'static str, name: String },

    #[error("failed converting {value} to {target}")]
    Conversion { target: &'static str, value: String },

    #[error("transform failed: {0}")]
    Transform(String),

    #[error("cannot parse a non-object (found {found})")]
    NotAnObject { found: &'static str },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MissingField { .. }
            | Error::DuplicateField { .. }
            | Error::InvalidTransform(_)
            | Error::Unregistered { .. } => ErrorKind::Schema,
            Error::Conversion { .. } | Error::Transform(_) => ErrorKind::Conversion,
            Error::NotAnObject { .. } | Error::Json(_) => ErrorKind::Payload,
            Error::Io { .. } => ErrorKind::Io,
        }
    }

    pub(crate) fn conversion(target: &'static str, value: Option<&serde_json::Value>) -> Self {
        let value = match value {
            Some(v) => v.to_string(),
            None => "<absent>".to_string(),
        };
        Error::Conversion { target, value }
    }

    /// Failure raised by a caller-supplied transform function.
    pub fn transform(message: impl Into<String>) -> Self {
        Error::Transform(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Short JSON type name used in error messages.
pub(crate) fn kind_name(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

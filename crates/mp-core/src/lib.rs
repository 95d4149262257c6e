//! mp-core: declarative model parsing for XML-derived JSON payloads
//!
//! A schema is an ordered list of `Field`s. Compiling it gives a `Parser`
//! that turns loosely-typed payloads (attributes as `@name`, text as `#text`,
//! one child as an object and many as a list) into normalized objects:
//! - `access`: path lookup with the `#text` unwrap rule, `force_array`
//! - `convert`: `boolean`, `date`, `number`, `integer`, `json` converters
//! - `parser`: field application, transform resolution, compiled parsers
//! - `track`/`diagnostics`: report payload properties no field read
//! - `doc`: schemas written as JSON documents plus a name registry
//!
pub mod access;
pub mod convert;
pub mod diagnostics;
pub mod doc;
pub mod error;
pub mod parser;
pub mod schema;
mod track;
pub mod transform;

pub use access::{FieldPath, TEXT_NODE, force_array, get_value};
pub use convert::Converter;
pub use diagnostics::{
    Diagnostic, DiagnosticSink, NullSink, TracingSink, UNPARSED_KEY, UNPARSED_PROPERTIES,
};
pub use doc::{Registry, SchemaDoc};
pub use error::{Error, ErrorKind, Result};
pub use parser::{Parser, ParserOptions, compile, parse_field, transform_value};
pub use schema::{Field, Schema};
pub use transform::{Constructed, Transform};

// Structural lookup over XML-derived JSON.
// - Paths are ordered literal keys; `date.modified` is one key, not two.
// - Only objects are descended; anything else resolves to absent.
// - `#text` as the last segment also matches a parent that is already a string.
use serde_json::Value;
use std::borrow::Cow;

/// Key used by the XML bridge for element text content.
pub const TEXT_NODE: &str = "#text";

/// Ordered path segments locating a value in a payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for FieldPath {
    fn from(s: &str) -> Self {
        Self(vec![s.to_string()])
    }
}

impl From<String> for FieldPath {
    fn from(s: String) -> Self {
        Self(vec![s])
    }
}

impl From<Vec<String>> for FieldPath {
    fn from(v: Vec<String>) -> Self {
        Self(v)
    }
}

impl From<Vec<&str>> for FieldPath {
    fn from(v: Vec<&str>) -> Self {
        Self::new(v)
    }
}

impl From<&[&str]> for FieldPath {
    fn from(v: &[&str]) -> Self {
        Self::new(v.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for FieldPath {
    fn from(v: [&str; N]) -> Self {
        Self::new(v)
    }
}

/// Resolve `path` against `root`, or `None` when any step is missing.
pub fn get_value<'a, S: AsRef<str>>(root: &'a Value, path: &[S]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let child = root.as_object()?.get(first.as_ref())?;
    if rest.is_empty() {
        return Some(child);
    }
    if rest.len() == 1 && rest[0].as_ref() == TEXT_NODE && child.is_string() {
        return Some(child);
    }
    get_value(child, rest)
}

/// Number of leading segments of `path` that `get_value` walks as real keys.
/// Equals `path.len()` unless the text-node rule short-circuited the lookup.
pub(crate) fn resolved_depth<S: AsRef<str>>(root: &Value, path: &[S]) -> usize {
    let mut cur = root;
    for (i, seg) in path.iter().enumerate() {
        let Some(next) = cur.as_object().and_then(|m| m.get(seg.as_ref())) else {
            return i;
        };
        if i + 2 == path.len() && path[i + 1].as_ref() == TEXT_NODE && next.is_string() {
            return i + 1;
        }
        cur = next;
    }
    path.len()
}

/// Normalize a "scalar or list" value into a list.
/// Absent and `""` give an empty list; an existing list is borrowed as-is.
pub fn force_array(value: Option<&Value>) -> Cow<'_, [Value]> {
    match value {
        None => Cow::Owned(Vec::new()),
        Some(Value::String(s)) if s.is_empty() => Cow::Owned(Vec::new()),
        Some(Value::Array(items)) => Cow::Borrowed(items.as_slice()),
        Some(other) => Cow::Owned(vec![other.clone()]),
    }
}

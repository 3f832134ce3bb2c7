//! Typed values: [`Value`], [`TagSet`] and [`Instant`].

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::datetime::{DateParseError, DateParser};
use crate::error::CollaboratorError;
use crate::tags::DualCased;
use crate::types::DomainType;

/// A resolved point in time (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Instant(DateTime<Utc>);

impl Instant {
    /// Wraps a UTC date-time.
    pub fn new(datetime: DateTime<Utc>) -> Self {
        Self(datetime)
    }

    /// Resolves free-form text through a [`DateParser`].
    pub fn parse(text: &str, parser: &dyn DateParser) -> Result<Self, DateParseError> {
        parser.parse(text)
    }

    /// Returns the underlying date-time.
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl From<DateTime<Utc>> for Instant {
    fn from(datetime: DateTime<Utc>) -> Self {
        Self(datetime)
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }
}

/// One record's values under one tag name.
///
/// Both the original spelling and the lower-cased spelling of every value are
/// kept so that case-insensitive tests do not lower-case on every evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    original: BTreeSet<String>,
    lowered: BTreeSet<String>,
}

impl TagSet {
    /// Builds a tag set from values; duplicates collapse.
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let original: BTreeSet<String> = values.into_iter().map(Into::into).collect();
        let lowered = original.iter().map(|v| v.to_lowercase()).collect();
        Self { original, lowered }
    }

    /// Wraps a pair returned by a tag store, rejecting pairs whose lower-cased
    /// side does not match the original side.
    pub fn from_dual(
        dual: DualCased,
        tag: &str,
        handle: i64,
    ) -> Result<Self, CollaboratorError> {
        let expected: BTreeSet<String> = dual.original.iter().map(|v| v.to_lowercase()).collect();
        if expected != dual.lowered {
            return Err(CollaboratorError::InconsistentTagSet {
                tag: tag.to_string(),
                handle,
            });
        }
        Ok(Self {
            original: dual.original,
            lowered: dual.lowered,
        })
    }

    /// Parses the bracket literal syntax: `[a, b, c]`.
    ///
    /// Items are comma separated and trimmed. An item starting with `"` is
    /// quoted: it runs to the closing `"`, keeps its commas, brackets and
    /// spaces, and a doubled `""` stands for one quote. Returns `None` when
    /// the text is not fully bracketed or the interior leaves an unreadable
    /// fragment (an empty item, a stray bracket or an unclosed quote).
    ///
    /// ```
    /// use vidlib_filter::TagSet;
    ///
    /// let set = TagSet::parse("[a, b, b]").unwrap();
    /// assert_eq!(set.len(), 2);
    /// assert!(TagSet::parse(r#"["Sci-Fi, Drama", War]"#).unwrap().contains("Sci-Fi, Drama"));
    /// assert!(TagSet::parse("[a").is_none());
    /// ```
    pub fn parse(text: &str) -> Option<Self> {
        let interior = text.strip_prefix('[')?.strip_suffix(']')?;
        if interior.trim().is_empty() {
            return Some(Self::default());
        }

        let mut items = Vec::new();
        let mut rest = interior;
        loop {
            let (item, next) = split_item(rest)?;
            items.push(item);
            match next {
                Some(next) => rest = next,
                None => return Some(Self::new(items)),
            }
        }
    }

    /// Case-sensitive containment.
    pub fn contains(&self, value: &str) -> bool {
        self.original.contains(value)
    }

    /// Case-insensitive containment.
    pub fn contains_ignore_case(&self, value: &str) -> bool {
        self.lowered.contains(&value.to_lowercase())
    }

    /// Case-sensitive set equality.
    pub fn same_values(&self, other: &TagSet) -> bool {
        self.original == other.original
    }

    /// Case-insensitive set equality.
    pub fn same_values_ignore_case(&self, other: &TagSet) -> bool {
        self.lowered == other.lowered
    }

    /// Number of distinct original values.
    pub fn len(&self) -> usize {
        self.original.len()
    }

    /// Returns true if the set has no values.
    pub fn is_empty(&self) -> bool {
        self.original.is_empty()
    }

    /// Iterates the original values in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.original.iter().map(String::as_str)
    }

    /// The lower-cased values.
    pub fn lowered(&self) -> &BTreeSet<String> {
        &self.lowered
    }
}

/// Reads one item off the front of a tag list interior. Returns the item and
/// the text after its comma, or `None` for the text when it was the last item.
fn split_item(text: &str) -> Option<(String, Option<&str>)> {
    let text = text.trim_start();
    let (item, rest) = match text.strip_prefix('"') {
        Some(quoted) => {
            let mut item = String::new();
            let mut chars = quoted.char_indices().peekable();
            let rest = loop {
                let (i, c) = chars.next()?;
                if c != '"' {
                    item.push(c);
                } else if chars.next_if(|&(_, c)| c == '"').is_some() {
                    item.push('"');
                } else {
                    break &quoted[i + 1..];
                }
            };
            (item, rest.trim_start())
        }
        None => {
            let end = text.find(',').unwrap_or(text.len());
            let item = text[..end].trim_end();
            if item.is_empty() || item.contains(['[', ']']) {
                return None;
            }
            (item.to_string(), &text[end..])
        }
    };
    match rest.strip_prefix(',') {
        Some(next) => Some((item, Some(next))),
        None if rest.is_empty() => Some((item, None)),
        None => None,
    }
}

/// Returns true if a tag value must be quoted to survive [`TagSet::parse`].
fn needs_quotes(value: &str) -> bool {
    value.is_empty()
        || value.starts_with('"')
        || value.contains([',', '[', ']'])
        || value.trim() != value
}

impl Serialize for TagSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.original)
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, value) in self.original.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if needs_quotes(value) {
                write!(f, "\"{}\"", value.replace('"', "\"\""))?;
            } else {
                f.write_str(value)?;
            }
        }
        f.write_str("]")
    }
}

/// A typed value. The variant always matches the owning node's [`DomainType`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    String(String),
    Integer(i64),
    Double(f64),
    Boolean(bool),
    TimeStamp(Instant),
    Tag(TagSet),
}

impl Value {
    /// The domain type of this value.
    pub fn domain_type(&self) -> DomainType {
        match self {
            Value::String(_) => DomainType::String,
            Value::Integer(_) => DomainType::Integer,
            Value::Double(_) => DomainType::Double,
            Value::Boolean(_) => DomainType::Boolean,
            Value::TimeStamp(_) => DomainType::TimeStamp,
            Value::Tag(_) => DomainType::Tag,
        }
    }

    /// Returns the boolean payload, if any.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the string payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns a numeric payload promoted to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<Instant> for Value {
    fn from(value: Instant) -> Self {
        Value::TimeStamp(value)
    }
}

impl From<TagSet> for Value {
    fn from(value: TagSet) -> Self {
        Value::Tag(value)
    }
}

/// Renders the value as filter-text literal syntax.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "\"{}\"", s.replace('"', "\"\"")),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Double(d) => {
                let text = d.to_string();
                if text.contains('.') || !d.is_finite() {
                    f.write_str(&text)
                } else {
                    write!(f, "{text}.0")
                }
            }
            Value::Boolean(true) => f.write_str("TRUE"),
            Value::Boolean(false) => f.write_str("FALSE"),
            Value::TimeStamp(instant) => write!(f, "#{instant}#"),
            Value::Tag(tags) => write!(f, "{tags}"),
        }
    }
}

// src/expression/term.rs

//! Terms: an identifier plus an ordered bag of options
//!
//! Terms are immutable. [`Term::with_option`] returns a new term; the option
//! list is shared between terms until one of them changes it.

use std::fmt;
use std::sync::Arc;

/// Ordered, immutable `key=value` options of a term
///
/// Keys are case-sensitive. Setting an existing key replaces its value in
/// place (last write wins, first position kept).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Options {
    entries: Arc<Vec<(String, String)>>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a copy with `key` set to `value`
    pub fn with(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.set(key.into(), value.into());
        next
    }

    fn set(&mut self, key: String, value: String) {
        let entries = Arc::make_mut(&mut self.entries);
        match entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Options {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut options = Options::new();
        for (k, v) in iter {
            options.set(k.into(), v.into());
        }
        options
    }
}

/// One node of an expression: a repository, project space or editor name
/// together with its options
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Term {
    pub identifier: String,
    pub options: Options,
}

impl Term {
    /// Create a term.
    ///
    /// The identifier must be non-empty; the parser guarantees this for
    /// parsed terms, programmatic callers are checked in debug builds.
    pub fn new(identifier: impl Into<String>, options: Options) -> Self {
        let identifier = identifier.into();
        debug_assert!(!identifier.is_empty(), "term identifier must be non-empty");
        Self { identifier, options }
    }

    pub fn named(identifier: impl Into<String>) -> Self {
        Self::new(identifier, Options::new())
    }

    pub fn with_option(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            identifier: self.identifier.clone(),
            options: self.options.with(key, value),
        }
    }

    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key)
    }
}

/// Characters allowed in identifiers and unquoted values
pub(crate) fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | '/' | ':' | '@' | '+' | '~' | '*')
}

/// Render a value, quoting it when it is not a plain word
fn write_value(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    if !value.is_empty() && value.chars().all(is_word_char) {
        return f.write_str(value);
    }
    f.write_str("\"")?;
    for c in value.chars() {
        if c == '"' || c == '\\' {
            f.write_str("\\")?;
        }
        write!(f, "{}", c)?;
    }
    f.write_str("\"")
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier)?;
        if self.options.is_empty() {
            return Ok(());
        }
        f.write_str("(")?;
        for (i, (key, value)) in self.options.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}=", key)?;
            write_value(f, value)?;
        }
        f.write_str(")")
    }
}

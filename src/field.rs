//! Field specifications
//!
//! A field binds one output key of a record to a relative element path,
//! an attribute, or both.

use std::fmt;
use std::str::FromStr;

use crate::error::ExtractError;

/// How text matched by a field is folded into the record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldMode {
    /// Last matching text wins
    Text,
    /// Every matching text is appended to a list
    Sequence,
    /// Matching texts are keyed by their element name
    Composite,
    /// Text combined with an attribute of the matched element
    Attribute,
    // Declared numeric/boolean types capture plain text, same as `Text`
    Integer,
    Float,
    Boolean,
}

impl FieldMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldMode::Text => "string",
            FieldMode::Sequence => "array",
            FieldMode::Composite => "object",
            FieldMode::Attribute => "attribute",
            FieldMode::Integer => "integer",
            FieldMode::Float => "float",
            FieldMode::Boolean => "boolean",
        }
    }
}

impl FromStr for FieldMode {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" | "text" => Ok(FieldMode::Text),
            "array" | "sequence" => Ok(FieldMode::Sequence),
            "object" | "composite" => Ok(FieldMode::Composite),
            "attribute" => Ok(FieldMode::Attribute),
            "integer" => Ok(FieldMode::Integer),
            "float" => Ok(FieldMode::Float),
            "boolean" => Ok(FieldMode::Boolean),
            other => Err(ExtractError::config(format!(
                "unknown field type '{}'. Valid types: string, array, object, attribute, integer, float, boolean",
                other
            ))),
        }
    }
}

impl fmt::Display for FieldMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One output field of an item mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub mode: FieldMode,
    /// Slash-joined element suffix; empty only for attribute shorthand
    pub relative_path: String,
    /// Attribute read by `Attribute` fields; empty when unused
    pub attribute_name: String,
}

impl FieldSpec {
    /// Plain text field bound to `path`
    pub fn text(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::with_mode(name, FieldMode::Text, path)
    }

    pub fn with_mode(name: impl Into<String>, mode: FieldMode, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mode,
            relative_path: path.into(),
            attribute_name: String::new(),
        }
    }

    /// Attribute of a descendant element, optionally paired with its text
    pub fn attribute(
        name: impl Into<String>,
        path: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            mode: FieldMode::Attribute,
            relative_path: path.into(),
            attribute_name: attribute.into(),
        }
    }

    /// `"@attr"` form: attribute of the item element itself
    pub fn item_attribute(name: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mode: FieldMode::Attribute,
            relative_path: String::new(),
            attribute_name: attribute.into(),
        }
    }

    pub fn is_item_attribute(&self) -> bool {
        self.mode == FieldMode::Attribute && self.relative_path.is_empty()
    }

    /// Suffix match of this field's relative path against the current path.
    /// Shorthand fields never match by path.
    pub fn matches_path(&self, current_path: &str) -> bool {
        !self.relative_path.is_empty() && suffix_matches(current_path, &self.relative_path)
    }
}

/// True when `path` equals `suffix` or ends with `"/" + suffix`
pub fn suffix_matches(path: &str, suffix: &str) -> bool {
    match path.strip_suffix(suffix) {
        Some(rest) => rest.is_empty() || rest.ends_with('/'),
        None => false,
    }
}

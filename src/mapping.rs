//! Declarative mapping definitions
//!
//! A mapping names the item element and the fields to pull out of each item.
//! Definitions come from YAML or JSON and are validated into an
//! [`ItemMapping`] before any document is touched:
//!
//! ```yaml
//! parsers:
//!   products:
//!     item_element: product
//!     fields:
//!       id: "@id"
//!       name: name
//!       price:
//!         type: attribute
//!         path: price
//!         attribute: currency
//!       tags:
//!         type: array
//!         path: tags/tag
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;

use crate::error::{ExtractError, Result};
use crate::field::{suffix_matches, FieldMode, FieldSpec};

/// Raw, unvalidated mapping for one item type
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MappingDefinition {
    #[serde(default, alias = "itemElement")]
    pub item_element: Option<String>,
    /// Accepted for compatibility, never consulted during extraction
    #[serde(default, alias = "rootElement")]
    pub root_element: Option<String>,
    #[serde(default)]
    pub fields: Option<FieldDefinitions>,
}

impl MappingDefinition {
    pub fn new(item_element: impl Into<String>) -> Self {
        Self {
            item_element: Some(item_element.into()),
            root_element: None,
            fields: Some(FieldDefinitions::default()),
        }
    }

    /// Append a field, keeping declaration order
    pub fn field(mut self, name: impl Into<String>, definition: FieldDefinition) -> Self {
        self.fields
            .get_or_insert_with(FieldDefinitions::default)
            .0
            .push((name.into(), definition));
        self
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml_ng::from_str(yaml)
            .map_err(|e| ExtractError::config(format!("invalid YAML mapping: {}", e)))
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| ExtractError::config(format!("invalid JSON mapping: {}", e)))
    }
}

/// Field definitions in declaration order
#[derive(Debug, Clone, Default)]
pub struct FieldDefinitions(pub Vec<(String, FieldDefinition)>);

impl<'de> Deserialize<'de> for FieldDefinitions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = FieldDefinitions;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a mapping of field names to field definitions")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut fields = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(name) = map.next_key::<String>()? {
                    let definition = map.next_value::<FieldDefinition>().map_err(|e| {
                        de::Error::custom(format!(
                            "field '{}' must be a string or a mapping: {}",
                            name, e
                        ))
                    })?;
                    fields.push((name, definition));
                }
                Ok(FieldDefinitions(fields))
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

/// A field as written in the mapping document
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FieldDefinition {
    /// `"name"` (relative path) or `"@id"` (item attribute)
    Shorthand(String),
    Detailed(DetailedField),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetailedField {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    /// Alternative spelling of `path`
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub attribute: Option<String>,
}

impl FieldDefinition {
    pub fn path(path: impl Into<String>) -> Self {
        FieldDefinition::Shorthand(path.into())
    }

    pub fn typed(kind: &str, path: impl Into<String>) -> Self {
        FieldDefinition::Detailed(DetailedField {
            kind: Some(kind.to_string()),
            path: Some(path.into()),
            ..Default::default()
        })
    }

    pub fn attribute(path: impl Into<String>, attribute: impl Into<String>) -> Self {
        FieldDefinition::Detailed(DetailedField {
            kind: Some("attribute".to_string()),
            path: Some(path.into()),
            attribute: Some(attribute.into()),
            ..Default::default()
        })
    }

    fn to_spec(&self, name: &str) -> Result<FieldSpec> {
        match self {
            FieldDefinition::Shorthand(s) => match s.strip_prefix('@') {
                Some("") => Err(ExtractError::config(format!(
                    "field '{}' names an empty attribute",
                    name
                ))),
                Some(attr) => Ok(FieldSpec::item_attribute(name, attr)),
                None => Ok(FieldSpec::text(name, normalize_path(name, s)?)),
            },
            FieldDefinition::Detailed(detailed) => {
                let mode = match detailed.kind.as_deref() {
                    Some(kind) => kind.parse::<FieldMode>().map_err(|e| match e {
                        ExtractError::ConfigInvalid(msg) => {
                            ExtractError::config(format!("field '{}' has invalid type: {}", name, msg))
                        }
                        other => other,
                    })?,
                    None => FieldMode::Text,
                };
                let raw_path = detailed
                    .path
                    .as_deref()
                    .or(detailed.source.as_deref())
                    .unwrap_or("");
                let mut spec = FieldSpec::with_mode(name, mode, normalize_path(name, raw_path)?);
                if let Some(attr) = &detailed.attribute {
                    spec.attribute_name = attr.clone();
                }
                Ok(spec)
            }
        }
    }
}

fn normalize_path(name: &str, path: &str) -> Result<String> {
    let path = path.trim().trim_matches('/');
    if path.is_empty() {
        return Err(missing_path(name));
    }
    Ok(path.to_lowercase())
}

// Older configs could carry a pathless field that silently never matched.
fn missing_path(name: &str) -> ExtractError {
    ExtractError::config(format!(
        "field '{}' must declare a non-empty path; pathless fields never match \
         any element and are rejected instead of ignored (add a `path` or remove the field)",
        name
    ))
}

/// Validated mapping, immutable for the duration of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemMapping {
    item_element: String,
    root_element: Option<String>,
    fields: Vec<FieldSpec>,
}

impl ItemMapping {
    pub fn new(item_element: &str, fields: Vec<FieldSpec>) -> Result<Self> {
        let item_element = item_element.trim().to_lowercase();
        if item_element.is_empty() {
            return Err(ExtractError::config("mapping must specify item_element"));
        }
        for field in &fields {
            if field.relative_path.is_empty() && !field.is_item_attribute() {
                return Err(missing_path(&field.name));
            }
        }

        Ok(Self {
            item_element,
            root_element: None,
            fields,
        })
    }

    pub fn item_element(&self) -> &str {
        &self.item_element
    }

    pub fn root_element(&self) -> Option<&str> {
        self.root_element.as_deref()
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Same predicate opens and closes an item, so self-nesting item
    /// elements close the outer item early.
    pub fn is_item_boundary(&self, path: &str) -> bool {
        suffix_matches(path, &self.item_element)
    }
}

impl TryFrom<&MappingDefinition> for ItemMapping {
    type Error = ExtractError;

    fn try_from(definition: &MappingDefinition) -> Result<Self> {
        let item_element = definition
            .item_element
            .as_deref()
            .ok_or_else(|| ExtractError::config("mapping must specify item_element"))?;
        let fields = definition
            .fields
            .as_ref()
            .ok_or_else(|| ExtractError::config("mapping must specify fields"))?;

        let specs = fields
            .0
            .iter()
            .map(|(name, def)| def.to_spec(name))
            .collect::<Result<Vec<_>>>()?;

        let mut mapping = ItemMapping::new(item_element, specs)?;
        mapping.root_element = definition.root_element.clone();
        Ok(mapping)
    }
}

#[derive(Debug, Deserialize)]
struct RawParsersConfig {
    #[serde(default)]
    parsers: Option<HashMap<String, MappingDefinition>>,
}

/// Named table of validated mappings
#[derive(Debug, Clone, Default)]
pub struct ParsersConfig {
    parsers: HashMap<String, ItemMapping>,
}

impl ParsersConfig {
    pub fn from_definitions(definitions: HashMap<String, MappingDefinition>) -> Result<Self> {
        let mut parsers = HashMap::with_capacity(definitions.len());
        for (name, definition) in definitions {
            let mapping = ItemMapping::try_from(&definition).map_err(|e| match e {
                ExtractError::ConfigInvalid(msg) => {
                    ExtractError::config(format!("parser '{}': {}", name, msg))
                }
                other => other,
            })?;
            parsers.insert(name, mapping);
        }
        Ok(Self { parsers })
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let raw: RawParsersConfig = serde_yaml_ng::from_str(yaml)
            .map_err(|e| ExtractError::config(format!("invalid YAML configuration: {}", e)))?;
        Self::from_raw(raw)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: RawParsersConfig = serde_json::from_str(json)
            .map_err(|e| ExtractError::config(format!("invalid JSON configuration: {}", e)))?;
        Self::from_raw(raw)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ExtractError::config(format!(
                "failed to read configuration file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml_str(&content)
    }

    fn from_raw(raw: RawParsersConfig) -> Result<Self> {
        let definitions = raw
            .parsers
            .ok_or_else(|| ExtractError::config("configuration must contain a \"parsers\" mapping"))?;
        Self::from_definitions(definitions)
    }

    pub fn get(&self, name: &str) -> Result<&ItemMapping> {
        self.parsers
            .get(name)
            .ok_or_else(|| ExtractError::UnknownParser(name.to_string()))
    }

    pub fn insert(&mut self, name: impl Into<String>, mapping: ItemMapping) {
        self.parsers.insert(name.into(), mapping);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.parsers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }
}

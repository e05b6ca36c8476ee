//! Extracted records

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

/// Value held by one field of a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    /// Accumulated texts of a sequence field, in document order
    List(Vec<String>),
    /// Child tag name -> text, in first-seen order
    Map(Vec<(String, String)>),
    /// Element text paired with one of its attributes.
    /// Serialized as `{"value": .., "<attribute>": ..}`; an attribute named
    /// `value` shares the single `value` slot with the text.
    Attributed {
        value: String,
        attribute: String,
        attribute_value: String,
    },
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FieldValue::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Entry of a composite value
    pub fn get(&self, key: &str) -> Option<&str> {
        match self {
            FieldValue::Map(entries) => entries
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            FieldValue::Attributed {
                value,
                attribute,
                attribute_value,
            } => {
                if key == "value" {
                    Some(value.as_str())
                } else if key == attribute {
                    Some(attribute_value.as_str())
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::List(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
            FieldValue::Map(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect(),
            ),
            FieldValue::Attributed {
                value,
                attribute,
                attribute_value,
            } => {
                let mut obj = serde_json::Map::new();
                obj.insert("value".to_string(), Value::String(value.clone()));
                if attribute != "value" {
                    obj.insert(attribute.clone(), Value::String(attribute_value.clone()));
                }
                Value::Object(obj)
            }
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Text(s) => serializer.serialize_str(s),
            FieldValue::List(items) => items.serialize(serializer),
            FieldValue::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            FieldValue::Attributed {
                value,
                attribute,
                attribute_value,
            } => {
                if attribute == "value" {
                    let mut map = serializer.serialize_map(Some(1))?;
                    map.serialize_entry("value", value)?;
                    return map.end();
                }
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("value", value)?;
                map.serialize_entry(attribute, attribute_value)?;
                map.end()
            }
        }
    }
}

/// One extracted item: field name -> value, in first-write order.
/// Overwriting a field keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, FieldValue)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut FieldValue> {
        self.fields
            .iter_mut()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    /// Shortcut for text fields
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_text)
    }

    pub fn insert(&mut self, name: &str, value: FieldValue) {
        match self.get_mut(name) {
            Some(slot) => *slot = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_overwrites_in_place() {
        let mut record = Record::new();
        record.insert("id", "1".into());
        record.insert("name", "first".into());
        record.insert("id", "2".into());

        assert_eq!(record.len(), 2);
        assert_eq!(record.text("id"), Some("2"));

        let keys: Vec<&str> = record.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["id", "name"]);
    }

    #[test]
    fn test_serialize_keeps_field_order() {
        let mut record = Record::new();
        record.insert("zeta", "z".into());
        record.insert("alpha", FieldValue::List(vec!["a".into(), "b".into()]));
        record.insert(
            "height",
            FieldValue::Attributed {
                value: "20".into(),
                attribute: "unit".into(),
                attribute_value: "m".into(),
            },
        );

        let out = serde_json::to_string(&record).unwrap();
        assert_eq!(
            out,
            r#"{"zeta":"z","alpha":["a","b"],"height":{"value":"20","unit":"m"}}"#
        );
    }

    #[test]
    fn test_to_json_keeps_field_order() {
        let mut record = Record::new();
        record.insert("zeta", "1".into());
        record.insert("alpha", "2".into());

        let json = record.to_json();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
        assert_eq!(json.to_string(), serde_json::to_string(&record).unwrap());
    }

    #[test]
    fn test_value_attribute_shares_value_slot() {
        let mut record = Record::new();
        record.insert(
            "opt",
            FieldValue::Attributed {
                value: "Label".into(),
                attribute: "value".into(),
                attribute_value: "x".into(),
            },
        );

        assert_eq!(serde_json::to_string(&record).unwrap(), r#"{"opt":{"value":"Label"}}"#);
        assert_eq!(record.to_json(), json!({"opt": {"value": "Label"}}));
        assert_eq!(record.get("opt").unwrap().get("value"), Some("Label"));
    }

    #[test]
    fn test_to_json() {
        let mut record = Record::new();
        record.insert(
            "taxonomy",
            FieldValue::Map(vec![
                ("family".into(), "Fagaceae".into()),
                ("genus".into(), "Quercus".into()),
            ]),
        );

        assert_eq!(
            record.to_json(),
            json!({"taxonomy": {"family": "Fagaceae", "genus": "Quercus"}})
        );
        assert_eq!(record.get("taxonomy").unwrap().get("genus"), Some("Quercus"));
    }
}

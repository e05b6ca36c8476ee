//! Record extraction engine
//!
//! Replays open/text/close events against an [`ItemMapping`]. The engine is
//! either idle or inside an item; an item starts when an element matching the
//! item boundary opens and is committed when a boundary element closes.
//!
//! Field resolution is first-match in declaration order. With fields `h` and
//! `c/h`, text at `.../c/h` goes to whichever was declared first.

use std::mem;

use tracing::trace;

use crate::context::Attributes;
use crate::field::{FieldMode, FieldSpec};
use crate::mapping::ItemMapping;
use crate::record::{FieldValue, Record};

#[derive(Debug)]
enum EngineState {
    Idle,
    InsideItem(Record),
}

#[derive(Debug)]
pub struct ExtractionEngine {
    mapping: ItemMapping,
    state: EngineState,
    records: Vec<Record>,
}

impl ExtractionEngine {
    pub fn new(mapping: ItemMapping) -> Self {
        Self {
            mapping,
            state: EngineState::Idle,
            records: Vec::new(),
        }
    }

    pub fn mapping(&self) -> &ItemMapping {
        &self.mapping
    }

    pub fn is_inside_item(&self) -> bool {
        matches!(self.state, EngineState::InsideItem(_))
    }

    /// Item currently being filled, if any
    pub fn current_record(&self) -> Option<&Record> {
        match &self.state {
            EngineState::InsideItem(record) => Some(record),
            EngineState::Idle => None,
        }
    }

    /// Element opened at `path` (already pushed onto the path context)
    pub fn on_open(&mut self, path: &str, attributes: &Attributes) {
        if self.mapping.is_item_boundary(path) {
            self.start_item(attributes);
            return;
        }

        let EngineState::InsideItem(record) = &mut self.state else {
            return;
        };

        // Only the first attribute field bound to this path is considered
        if let Some(field) = self
            .mapping
            .fields()
            .iter()
            .find(|f| f.mode == FieldMode::Attribute && f.matches_path(path))
        {
            if let Some(attr_value) = attributes.get(&field.attribute_name) {
                // An attribute named `value` occupies the text slot until text arrives
                let value = if field.attribute_name == "value" {
                    attr_value.clone()
                } else {
                    String::new()
                };
                record.insert(
                    &field.name,
                    FieldValue::Attributed {
                        value,
                        attribute: field.attribute_name.clone(),
                        attribute_value: attr_value.clone(),
                    },
                );
            }
        }
    }

    /// Character data inside the element at `path`
    pub fn on_text(&mut self, path: &str, data: &str) {
        let EngineState::InsideItem(record) = &mut self.state else {
            return;
        };
        let text = data.trim();
        if text.is_empty() {
            return;
        }

        let Some(field) = self.mapping.fields().iter().find(|f| f.matches_path(path)) else {
            return;
        };
        apply_text(record, field, path, text);
    }

    /// Element at `path` is about to close (still on the path context)
    pub fn on_close(&mut self, path: &str) {
        if !self.mapping.is_item_boundary(path) {
            return;
        }

        if let EngineState::InsideItem(record) = mem::replace(&mut self.state, EngineState::Idle) {
            if record.is_empty() {
                trace!(path, "discarding empty item");
            } else {
                trace!(path, fields = record.len(), "committing item");
                self.records.push(record);
            }
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    /// Drop the in-progress item and every committed record
    pub fn reset(&mut self) {
        self.records.clear();
        self.state = EngineState::Idle;
    }

    fn start_item(&mut self, attributes: &Attributes) {
        let mut record = Record::new();
        for field in self.mapping.fields().iter().filter(|f| f.is_item_attribute()) {
            if let Some(value) = attributes.get(&field.attribute_name) {
                record.insert(&field.name, FieldValue::Text(value.clone()));
            }
        }
        self.state = EngineState::InsideItem(record);
    }
}

fn apply_text(record: &mut Record, field: &FieldSpec, path: &str, text: &str) {
    match field.mode {
        FieldMode::Text | FieldMode::Integer | FieldMode::Float | FieldMode::Boolean => {
            record.insert(&field.name, FieldValue::Text(text.to_string()));
        }
        FieldMode::Sequence => match record.get_mut(&field.name) {
            Some(FieldValue::List(items)) => items.push(text.to_string()),
            _ => record.insert(&field.name, FieldValue::List(vec![text.to_string()])),
        },
        FieldMode::Composite => {
            let key = path.rsplit('/').next().unwrap_or(path).to_string();
            match record.get_mut(&field.name) {
                Some(FieldValue::Map(entries)) => {
                    match entries.iter_mut().find(|(k, _)| *k == key) {
                        Some(entry) => entry.1 = text.to_string(),
                        None => entries.push((key, text.to_string())),
                    }
                }
                _ => record.insert(&field.name, FieldValue::Map(vec![(key, text.to_string())])),
            }
        }
        FieldMode::Attribute => match record.get_mut(&field.name) {
            Some(FieldValue::Attributed { value, .. }) => *value = text.to_string(),
            _ => record.insert(&field.name, FieldValue::Text(text.to_string())),
        },
    }
}

//! Streaming XML record extraction
//!
//! Replays a declarative field mapping against tokenizer events to turn an
//! XML document into an ordered list of records:
//! - Path tracking over element open/close events
//! - Item boundary detection by element-path suffix
//! - Text, sequence, composite and attribute fields
//! - YAML/JSON mapping tables with named parsers
//! - C ABI returning records as JSON

pub mod context;
pub mod engine;
pub mod error;
pub mod extract;
pub mod ffi;
pub mod field;
pub mod mapping;
pub mod record;
pub mod tokenizer;

pub use context::{Attributes, PathContext, PathFrame};
pub use engine::ExtractionEngine;
pub use error::{ExtractError, Result};
pub use extract::*;
pub use ffi::*;
pub use field::{FieldMode, FieldSpec};
pub use mapping::{FieldDefinition, ItemMapping, MappingDefinition, ParsersConfig};
pub use record::{FieldValue, Record};
pub use tokenizer::{tokenize, MarkupHandler};

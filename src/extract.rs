//! Top-level extraction
//!
//! Wires tokenizer callbacks to the path context and the extraction engine,
//! and resolves document sources and mappings.

use std::fs::{self, File};
use std::io::{self, ErrorKind, Read};
use std::path::Path;

use tracing::{debug, warn};

use crate::context::{Attributes, PathContext};
use crate::engine::ExtractionEngine;
use crate::error::{ExtractError, Result};
use crate::mapping::{ItemMapping, MappingDefinition, ParsersConfig};
use crate::record::Record;
use crate::tokenizer::{tokenize, MarkupHandler};

/// Event adapter: every open pushes before the engine sees it,
/// every close reaches the engine before the pop.
struct Extractor {
    context: PathContext,
    engine: ExtractionEngine,
}

impl Extractor {
    fn new(mapping: ItemMapping) -> Self {
        Self {
            context: PathContext::new(),
            engine: ExtractionEngine::new(mapping),
        }
    }
}

impl MarkupHandler for Extractor {
    fn on_open(&mut self, name: &str, attributes: Attributes) -> Result<()> {
        self.context.push_element(name, attributes);
        if let Some(frame) = self.context.current_frame() {
            self.engine.on_open(&frame.full_path, &frame.attributes);
        }
        Ok(())
    }

    fn on_close(&mut self, _name: &str) -> Result<()> {
        self.engine.on_close(self.context.current_path());
        self.context.pop_element()?;
        Ok(())
    }

    fn on_text(&mut self, data: &str) -> Result<()> {
        self.engine.on_text(self.context.current_path(), data);
        Ok(())
    }
}

/// Extract records from any byte stream
pub fn extract_reader<R: Read>(source: R, mapping: &ItemMapping) -> Result<Vec<Record>> {
    let mut extractor = Extractor::new(mapping.clone());
    if let Err(e) = tokenize(source, &mut extractor) {
        warn!(item_element = mapping.item_element(), error = %e, "extraction aborted");
        return Err(e);
    }
    Ok(extractor.engine.into_records())
}

pub fn extract_str(xml: &str, mapping: &ItemMapping) -> Result<Vec<Record>> {
    extract_reader(xml.as_bytes(), mapping)
}

/// Extract records from the XML file at `path`
pub fn extract(path: impl AsRef<Path>, mapping: &ItemMapping) -> Result<Vec<Record>> {
    let path = path.as_ref();
    let file = open_source(path)?;

    debug!(
        path = %path.display(),
        item_element = mapping.item_element(),
        "extracting records"
    );
    let records = extract_reader(file, mapping).map_err(|e| match e {
        ExtractError::SourceUnreadable { source, .. } => ExtractError::SourceUnreadable {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })?;
    debug!(path = %path.display(), records = records.len(), "extraction finished");

    Ok(records)
}

/// Validate a raw mapping, then extract
pub fn extract_with_definition(
    path: impl AsRef<Path>,
    definition: &MappingDefinition,
) -> Result<Vec<Record>> {
    let mapping = ItemMapping::try_from(definition)?;
    extract(path, &mapping)
}

/// Extract using the mapping registered under `parser_name`
pub fn extract_with_parser(
    path: impl AsRef<Path>,
    parser_name: &str,
    config: &ParsersConfig,
) -> Result<Vec<Record>> {
    let mapping = config.get(parser_name)?;
    extract(path, mapping)
}

fn open_source(path: &Path) -> Result<File> {
    let unreadable = |source: io::Error| ExtractError::SourceUnreadable {
        path: path.to_path_buf(),
        source,
    };

    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ExtractError::SourceNotFound(path.to_path_buf()))
        }
        Err(e) => return Err(unreadable(e)),
    };
    if metadata.is_dir() {
        return Err(unreadable(io::Error::other("path is a directory")));
    }

    File::open(path).map_err(unreadable)
}

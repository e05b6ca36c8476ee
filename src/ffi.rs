//! FFI interface for C++ interop
//!
//! Provides C-compatible functions for extracting records from XML.
//! Mappings go in as JSON (or YAML for parser tables), records come back as
//! a JSON array.

use std::ffi::{c_char, CStr, CString};
use std::ptr;

use crate::error::ExtractError;
use crate::extract::{extract, extract_reader, extract_with_parser};
use crate::mapping::{ItemMapping, MappingDefinition, ParsersConfig};
use crate::record::Record;

/// Result struct returned to C++
/// Both pointers are owned by Rust and must be freed via free_extraction_result
#[repr(C)]
pub struct ExtractionResultFFI {
    /// JSON array of records (null-terminated)
    pub json_ptr: *mut c_char,
    /// Error message if extraction failed (null-terminated), or null on success
    pub error_ptr: *mut c_char,
}

/// Extract records from the XML file at `path` using a JSON mapping definition.
///
/// # Arguments
/// * `path` - Null-terminated UTF-8 file path
/// * `mapping_json` - JSON-serialized mapping (`{"item_element": .., "fields": {..}}`)
///
/// # Returns
/// ExtractionResultFFI with either json_ptr set (success) or error_ptr set (failure)
///
/// # Safety
/// - `path` and `mapping_json` must be valid null-terminated C strings
/// - Caller must free the result via `free_extraction_result`
#[no_mangle]
pub unsafe extern "C" fn extract_records_ffi(
    path: *const c_char,
    mapping_json: *const c_char,
) -> ExtractionResultFFI {
    let path = match c_str_arg(path, "path") {
        Ok(s) => s,
        Err(msg) => return make_error_result(&msg),
    };
    let mapping = match parse_mapping(mapping_json) {
        Ok(m) => m,
        Err(msg) => return make_error_result(&msg),
    };

    make_records_result(extract(path, &mapping))
}

/// Extract records from an in-memory XML buffer.
///
/// # Safety
/// - `xml_ptr` must point to valid memory of at least `xml_len` bytes
/// - `mapping_json` must be a valid null-terminated C string
/// - Caller must free the result via `free_extraction_result`
#[no_mangle]
pub unsafe extern "C" fn extract_records_from_buffer_ffi(
    xml_ptr: *const c_char,
    xml_len: usize,
    mapping_json: *const c_char,
) -> ExtractionResultFFI {
    let xml: &[u8] = if xml_ptr.is_null() || xml_len == 0 {
        &[]
    } else {
        std::slice::from_raw_parts(xml_ptr as *const u8, xml_len)
    };
    let mapping = match parse_mapping(mapping_json) {
        Ok(m) => m,
        Err(msg) => return make_error_result(&msg),
    };

    make_records_result(extract_reader(xml, &mapping))
}

/// Extract records with a named parser from a YAML parser table.
///
/// # Safety
/// - All arguments must be valid null-terminated C strings
/// - Caller must free the result via `free_extraction_result`
#[no_mangle]
pub unsafe extern "C" fn extract_with_parser_ffi(
    path: *const c_char,
    parser_name: *const c_char,
    config_yaml: *const c_char,
) -> ExtractionResultFFI {
    let path = match c_str_arg(path, "path") {
        Ok(s) => s,
        Err(msg) => return make_error_result(&msg),
    };
    let parser_name = match c_str_arg(parser_name, "parser name") {
        Ok(s) => s,
        Err(msg) => return make_error_result(&msg),
    };
    let config_yaml = match c_str_arg(config_yaml, "config") {
        Ok(s) => s,
        Err(msg) => return make_error_result(&msg),
    };

    let config = match ParsersConfig::from_yaml_str(config_yaml) {
        Ok(c) => c,
        Err(e) => return make_error_result(&e.to_string()),
    };

    make_records_result(extract_with_parser(path, parser_name, &config))
}

/// Free an ExtractionResultFFI returned by any of the extract functions
///
/// # Safety
/// - `result` must have been returned by one of the extract functions
/// - Must only be called once per result
#[no_mangle]
pub unsafe extern "C" fn free_extraction_result(result: ExtractionResultFFI) {
    if !result.json_ptr.is_null() {
        drop(CString::from_raw(result.json_ptr));
    }
    if !result.error_ptr.is_null() {
        drop(CString::from_raw(result.error_ptr));
    }
}

unsafe fn c_str_arg<'a>(ptr: *const c_char, what: &str) -> Result<&'a str, String> {
    if ptr.is_null() {
        return Err(format!("{} is null", what));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| format!("Invalid UTF-8 in {}", what))
}

unsafe fn parse_mapping(mapping_json: *const c_char) -> Result<ItemMapping, String> {
    let json = c_str_arg(mapping_json, "mapping JSON")?;
    MappingDefinition::from_json_str(json)
        .and_then(|def| ItemMapping::try_from(&def))
        .map_err(|e| e.to_string())
}

fn make_records_result(records: Result<Vec<Record>, ExtractError>) -> ExtractionResultFFI {
    let records = match records {
        Ok(r) => r,
        Err(e) => return make_error_result(&e.to_string()),
    };

    match serde_json::to_string(&records) {
        Ok(json) => match CString::new(json) {
            Ok(cstr) => ExtractionResultFFI {
                json_ptr: cstr.into_raw(),
                error_ptr: ptr::null_mut(),
            },
            Err(_) => make_error_result("Result JSON contains null bytes"),
        },
        Err(e) => make_error_result(&format!("Failed to serialize result: {}", e)),
    }
}

// Helper to create error result
fn make_error_result(msg: &str) -> ExtractionResultFFI {
    let error_cstr = CString::new(msg.replace('\0', " ")).unwrap_or_default();
    ExtractionResultFFI {
        json_ptr: ptr::null_mut(),
        error_ptr: error_cstr.into_raw(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MAPPING: &str = r#"{"item_element": "product", "fields": {"id": "@id", "name": "name"}}"#;

    unsafe fn take(result: ExtractionResultFFI) -> Result<String, String> {
        let out = if result.error_ptr.is_null() {
            Ok(CStr::from_ptr(result.json_ptr).to_string_lossy().into_owned())
        } else {
            Err(CStr::from_ptr(result.error_ptr).to_string_lossy().into_owned())
        };
        free_extraction_result(result);
        out
    }

    #[test]
    fn test_buffer_extraction() {
        let xml = r#"<products><product id="501"><name>Ektorp Sofa</name></product></products>"#;
        let mapping = CString::new(MAPPING).unwrap();

        let json = unsafe {
            take(extract_records_from_buffer_ffi(
                xml.as_ptr() as *const c_char,
                xml.len(),
                mapping.as_ptr(),
            ))
        }
        .unwrap();
        assert_eq!(json, r#"[{"id":"501","name":"Ektorp Sofa"}]"#);
    }

    #[test]
    fn test_file_extraction_errors() {
        let path = CString::new("/non/existent/file.xml").unwrap();
        let mapping = CString::new(MAPPING).unwrap();
        let err = unsafe { take(extract_records_ffi(path.as_ptr(), mapping.as_ptr())) }.unwrap_err();
        assert!(err.contains("XML file not found"));

        let bad_mapping = CString::new(r#"{"fields": {}}"#).unwrap();
        let err = unsafe { take(extract_records_ffi(path.as_ptr(), bad_mapping.as_ptr())) }.unwrap_err();
        assert!(err.contains("item_element"));

        let err = unsafe { take(extract_records_ffi(ptr::null(), mapping.as_ptr())) }.unwrap_err();
        assert_eq!(err, "path is null");
    }

    #[test]
    fn test_parser_table_extraction() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"<products><product id=\"9\"><name>Lack</name></product></products>")
            .unwrap();

        let path = CString::new(file.path().to_str().unwrap()).unwrap();
        let name = CString::new("products").unwrap();
        let yaml = CString::new(
            "parsers:\n  products:\n    item_element: product\n    fields:\n      id: \"@id\"\n      name: name\n",
        )
        .unwrap();

        let json = unsafe {
            take(extract_with_parser_ffi(path.as_ptr(), name.as_ptr(), yaml.as_ptr()))
        }
        .unwrap();
        assert_eq!(json, r#"[{"id":"9","name":"Lack"}]"#);

        let unknown = CString::new("missing").unwrap();
        let err = unsafe {
            take(extract_with_parser_ffi(path.as_ptr(), unknown.as_ptr(), yaml.as_ptr()))
        }
        .unwrap_err();
        assert_eq!(err, "parser config 'missing' not found");
    }
}

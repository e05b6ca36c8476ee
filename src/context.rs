//! Element path tracking
//!
//! Mirrors the open/close events of the tokenizer as a stack of frames.
//! Each frame carries its full slash-joined path so the current path is
//! always available without walking the stack.

use std::collections::HashMap;

use crate::error::{ExtractError, Result};

/// Attribute map of a single element
pub type Attributes = HashMap<String, String>;

/// One open element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathFrame {
    pub element_name: String,
    pub attributes: Attributes,
    pub full_path: String,
}

#[derive(Debug, Default)]
pub struct PathContext {
    frames: Vec<PathFrame>,
}

impl PathContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push an element. Names are compared case-sensitively here, so callers
    /// fold case before pushing.
    pub fn push_element(&mut self, name: &str, attributes: Attributes) {
        let full_path = match self.frames.last() {
            Some(parent) => format!("{}/{}", parent.full_path, name),
            None => name.to_string(),
        };

        self.frames.push(PathFrame {
            element_name: name.to_string(),
            attributes,
            full_path,
        });
    }

    pub fn pop_element(&mut self) -> Result<String> {
        self.frames
            .pop()
            .map(|frame| frame.element_name)
            .ok_or(ExtractError::EmptyStack)
    }

    /// Full path of the innermost open element, empty at document level
    pub fn current_path(&self) -> &str {
        self.frames
            .last()
            .map(|frame| frame.full_path.as_str())
            .unwrap_or("")
    }

    pub fn current_frame(&self) -> Option<&PathFrame> {
        self.frames.last()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_builds_full_path() {
        let mut ctx = PathContext::new();
        assert_eq!(ctx.current_path(), "");

        ctx.push_element("products", Attributes::new());
        assert_eq!(ctx.current_path(), "products");

        let mut attrs = Attributes::new();
        attrs.insert("id".to_string(), "501".to_string());
        ctx.push_element("product", attrs);
        assert_eq!(ctx.current_path(), "products/product");
        assert_eq!(ctx.depth(), 2);

        let frame = ctx.current_frame().unwrap();
        assert_eq!(frame.element_name, "product");
        assert_eq!(frame.attributes["id"], "501");
    }

    #[test]
    fn test_pop_restores_parent_path() {
        let mut ctx = PathContext::new();
        ctx.push_element("a", Attributes::new());
        ctx.push_element("b", Attributes::new());
        ctx.push_element("c", Attributes::new());

        assert_eq!(ctx.pop_element().unwrap(), "c");
        assert_eq!(ctx.current_path(), "a/b");
        assert_eq!(ctx.pop_element().unwrap(), "b");
        assert_eq!(ctx.pop_element().unwrap(), "a");
        assert_eq!(ctx.current_path(), "");
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_pop_on_empty_stack_fails() {
        let mut ctx = PathContext::new();
        assert!(matches!(ctx.pop_element(), Err(ExtractError::EmptyStack)));

        ctx.push_element("a", Attributes::new());
        ctx.pop_element().unwrap();
        assert!(matches!(ctx.pop_element(), Err(ExtractError::EmptyStack)));
    }
}

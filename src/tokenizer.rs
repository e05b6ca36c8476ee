//! Streaming XML tokenizer
//!
//! Pulls events out of quick-xml in bounded chunks and forwards them to a
//! [`MarkupHandler`] as open/close/text callbacks. Element names are folded to
//! lower case before dispatch; attribute names are passed through untouched.

use std::io::{self, BufRead, BufReader, Read};
use std::path::PathBuf;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::context::Attributes;
use crate::error::{ExtractError, Result};

/// Bytes requested from the source per read
pub const CHUNK_SIZE: usize = 4096;

/// Receiver of tokenizer events, invoked in document order
pub trait MarkupHandler {
    fn on_open(&mut self, name: &str, attributes: Attributes) -> Result<()>;
    fn on_close(&mut self, name: &str) -> Result<()>;
    fn on_text(&mut self, data: &str) -> Result<()>;
}

/// Buffered reader that remembers where every consumed line starts,
/// so byte offsets reported by quick-xml can be turned into line/column.
struct LineTracker<R> {
    inner: BufReader<R>,
    consumed: u64,
    newlines: Vec<u64>,
}

impl<R: Read> LineTracker<R> {
    fn new(source: R) -> Self {
        Self {
            inner: BufReader::with_capacity(CHUNK_SIZE, source),
            consumed: 0,
            newlines: Vec::new(),
        }
    }

    /// 1-based line and column of a byte offset
    fn locate(&self, offset: u64) -> (u64, u64) {
        let idx = self.newlines.partition_point(|&n| n < offset);
        let line_start = match idx {
            0 => 0,
            i => self.newlines[i - 1] + 1,
        };
        (idx as u64 + 1, offset - line_start + 1)
    }
}

impl<R: Read> Read for LineTracker<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let n = {
            let available = self.fill_buf()?;
            let n = available.len().min(out.len());
            out[..n].copy_from_slice(&available[..n]);
            n
        };
        self.consume(n);
        Ok(n)
    }
}

impl<R: Read> BufRead for LineTracker<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        let buffered = self.inner.buffer();
        let amt = amt.min(buffered.len());
        let start = self.consumed;
        self.newlines.extend(
            buffered[..amt]
                .iter()
                .enumerate()
                .filter(|(_, b)| **b == b'\n')
                .map(|(i, _)| start + i as u64),
        );
        self.consumed += amt as u64;
        self.inner.consume(amt);
    }
}

fn syntax_error<R: Read>(tracker: &LineTracker<R>, offset: u64, message: String) -> ExtractError {
    let (line, column) = tracker.locate(offset);
    ExtractError::Syntax {
        message,
        line,
        column,
    }
}

fn element_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).to_lowercase()
}

fn decode_attributes(start: &BytesStart) -> std::result::Result<Attributes, String> {
    let mut attributes = Attributes::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(|e| e.to_string())?;
        attributes.insert(key, value.into_owned());
    }
    Ok(attributes)
}

/// Feed `source` through the tokenizer until end of input.
///
/// Stops at the first syntax error or handler error; events already
/// delivered are not rolled back.
pub fn tokenize<R: Read, H: MarkupHandler>(source: R, handler: &mut H) -> Result<()> {
    let mut reader = Reader::from_reader(LineTracker::new(source));
    reader.config_mut().trim_text(true);

    let mut buf = Vec::with_capacity(CHUNK_SIZE);
    let mut depth = 0usize;
    let mut seen_element = false;
    let mut root_closed = false;

    loop {
        let event = match reader.read_event_into(&mut buf) {
            Ok(event) => event,
            Err(quick_xml::Error::Io(e)) => {
                return Err(ExtractError::SourceUnreadable {
                    path: PathBuf::new(),
                    source: io::Error::new(e.kind(), e.to_string()),
                });
            }
            Err(e) => {
                let offset = reader.error_position() as u64;
                return Err(syntax_error(reader.get_ref(), offset, e.to_string()));
            }
        };

        let junk = || {
            syntax_error(
                reader.get_ref(),
                reader.buffer_position() as u64,
                "junk after document element".to_string(),
            )
        };

        match event {
            Event::Start(_) | Event::Empty(_) if root_closed => return Err(junk()),
            Event::Start(e) => {
                let name = element_name(e.name().as_ref());
                let attributes = decode_attributes(&e).map_err(|msg| {
                    syntax_error(reader.get_ref(), reader.buffer_position() as u64, msg)
                })?;
                depth += 1;
                seen_element = true;
                handler.on_open(&name, attributes)?;
            }
            Event::Empty(e) => {
                let name = element_name(e.name().as_ref());
                let attributes = decode_attributes(&e).map_err(|msg| {
                    syntax_error(reader.get_ref(), reader.buffer_position() as u64, msg)
                })?;
                seen_element = true;
                root_closed = depth == 0;
                handler.on_open(&name, attributes)?;
                handler.on_close(&name)?;
            }
            Event::End(e) => {
                depth = depth.saturating_sub(1);
                root_closed = depth == 0;
                handler.on_close(&element_name(e.name().as_ref()))?;
            }
            Event::Text(e) => {
                let text = e.unescape().map_err(|err| {
                    syntax_error(reader.get_ref(), reader.buffer_position() as u64, err.to_string())
                })?;
                if root_closed && !text.trim().is_empty() {
                    return Err(junk());
                }
                handler.on_text(&text)?;
            }
            Event::CData(e) => {
                if root_closed {
                    return Err(junk());
                }
                let data = e.into_inner();
                handler.on_text(&String::from_utf8_lossy(&data))?;
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    let end = reader.buffer_position() as u64;
    if depth > 0 {
        return Err(syntax_error(
            reader.get_ref(),
            end,
            format!("{} element(s) left unclosed at end of input", depth),
        ));
    }
    if !seen_element && reader.get_ref().consumed > 0 {
        return Err(syntax_error(reader.get_ref(), end, "no element found".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl MarkupHandler for Recorder {
        fn on_open(&mut self, name: &str, attributes: Attributes) -> Result<()> {
            let mut attrs: Vec<_> = attributes.into_iter().collect();
            attrs.sort();
            let rendered: Vec<String> = attrs.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            self.events.push(format!("open {} [{}]", name, rendered.join(",")));
            Ok(())
        }

        fn on_close(&mut self, name: &str) -> Result<()> {
            self.events.push(format!("close {}", name));
            Ok(())
        }

        fn on_text(&mut self, data: &str) -> Result<()> {
            self.events.push(format!("text {}", data));
            Ok(())
        }
    }

    fn run(xml: &str) -> Result<Vec<String>> {
        let mut recorder = Recorder::default();
        tokenize(xml.as_bytes(), &mut recorder)?;
        Ok(recorder.events)
    }

    #[test]
    fn test_event_stream() {
        let events = run(
            r#"<?xml version="1.0"?>
            <!-- catalog -->
            <Products>
                <Product ID="501" kind="a &amp; b"><Name>Sofa &lt;3</Name><Img src="x.png"/></Product>
                <Note><![CDATA[raw <text>]]></Note>
            </Products>"#,
        )
        .unwrap();

        assert_eq!(
            events,
            vec![
                "open products []",
                "open product [ID=501,kind=a & b]",
                "open name []",
                "text Sofa <3",
                "close name",
                "open img [src=x.png]",
                "close img",
                "close product",
                "open note []",
                "text raw <text>",
                "close note",
                "close products",
            ]
        );
    }

    #[test]
    fn test_empty_input_produces_no_events() {
        assert!(run("").unwrap().is_empty());
    }

    #[test]
    fn test_input_without_elements_fails() {
        let err = run("   \n  ").unwrap_err();
        assert!(matches!(err, ExtractError::Syntax { .. }), "{err:?}");
    }

    #[test]
    fn test_mismatched_end_tag_reports_position() {
        let err = run("<a>\n  <b>text</c>\n</a>").unwrap_err();
        match err {
            ExtractError::Syntax { line, column, .. } => {
                assert_eq!(line, 2);
                assert!(column > 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[rstest]
    #[case::second_root("<a/><b/>")]
    #[case::second_root_with_children("<a><x>1</x></a>\n<a><x>2</x></a>")]
    #[case::trailing_text("<a/>junk")]
    #[case::trailing_cdata("<a></a><![CDATA[x]]>")]
    fn test_content_after_root_fails(#[case] xml: &str) {
        match run(xml).unwrap_err() {
            ExtractError::Syntax { message, .. } => {
                assert_eq!(message, "junk after document element")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_trailing_markup_after_root_is_allowed() {
        let events = run("<a>x</a>\n<!-- done -->\n<?pi ok?>\n").unwrap();
        assert_eq!(events, vec!["open a []", "text x", "close a"]);
    }

    #[test]
    fn test_second_root_reports_position() {
        match run("<a>\n</a>\n  <b/>").unwrap_err() {
            ExtractError::Syntax { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unclosed_element_fails() {
        let err = run("<a><b></b>").unwrap_err();
        assert!(matches!(err, ExtractError::Syntax { .. }), "{err:?}");
    }

    #[test]
    fn test_text_larger_than_chunk() {
        let long = "x".repeat(CHUNK_SIZE * 3);
        let events = run(&format!("<a>{}</a>", long)).unwrap();
        assert_eq!(events[1], format!("text {}", long));
    }

    #[test]
    fn test_locate() {
        let mut tracker = LineTracker::new("ab\ncd\n\nef".as_bytes());
        tracker.fill_buf().unwrap();
        tracker.consume(10);
        assert_eq!(tracker.locate(0), (1, 1));
        assert_eq!(tracker.locate(1), (1, 2));
        assert_eq!(tracker.locate(3), (2, 1));
        assert_eq!(tracker.locate(7), (4, 1));
        assert_eq!(tracker.locate(8), (4, 2));
    }
}

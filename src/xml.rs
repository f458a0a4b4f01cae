//! Minimal XML document model built on quick-xml events.
//!
//! The reader, version converter, and include resolver all operate on this
//! tree rather than on streaming events so that subtrees can be rewritten
//! and spliced before schema validation. Each node remembers the line it
//! started on for diagnostics.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{ErrorCode, SdfError};

/// A parsed XML element: name, attributes in document order, collapsed
/// text content, and child elements in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    /// Tag name.
    pub name: String,
    /// Attributes as (name, value) pairs, in document order.
    pub attributes: Vec<(String, String)>,
    /// Concatenated, whitespace-trimmed text content.
    pub text: Option<String>,
    /// Child elements in document order.
    pub children: Vec<XmlElement>,
    /// Line number of the opening tag.
    pub line: Option<u64>,
}

impl XmlElement {
    /// Create an empty element with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
            line: None,
        }
    }

    /// Look up an attribute value by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set or replace an attribute.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(entry) = self.attributes.iter_mut().find(|(k, _)| k == name) {
            entry.1 = value;
        } else {
            self.attributes.push((name.to_string(), value));
        }
    }

    /// Remove an attribute, returning its previous value.
    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let idx = self.attributes.iter().position(|(k, _)| k == name)?;
        Some(self.attributes.remove(idx).1)
    }

    /// First child element with the given name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Mutable first child element with the given name.
    pub fn child_mut(&mut self, name: &str) -> Option<&mut XmlElement> {
        self.children.iter_mut().find(|c| c.name == name)
    }

    /// All child elements with the given name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Remove all children with the given name, returning them.
    pub fn take_children_named(&mut self, name: &str) -> Vec<XmlElement> {
        let (taken, kept) = std::mem::take(&mut self.children)
            .into_iter()
            .partition(|c| c.name == name);
        self.children = kept;
        taken
    }
}

/// Tracks (byte offset → line number) incrementally while reading events.
struct LineCounter<'a> {
    input: &'a [u8],
    offset: usize,
    line: u64,
}

impl<'a> LineCounter<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            offset: 0,
            line: 1,
        }
    }

    fn line_at(&mut self, offset: usize) -> u64 {
        let offset = offset.min(self.input.len());
        if offset >= self.offset {
            self.line += self.input[self.offset..offset]
                .iter()
                .filter(|&&b| b == b'\n')
                .count() as u64;
            self.offset = offset;
        }
        self.line
    }
}

/// Parse an XML string into a single root [`XmlElement`].
///
/// # Errors
///
/// Returns [`ErrorCode::Parsing`] if the input is not well-formed XML or
/// has no root element.
pub fn parse_str(xml: &str) -> Result<XmlElement, SdfError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut lines = LineCounter::new(xml);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let event = reader.read_event();
        // The position after the event lands inside the tag's own line
        // (tags rarely span lines); sampling before the read would blame
        // the preceding whitespace.
        let offset = usize::try_from(reader.buffer_position()).unwrap_or(usize::MAX);
        match event {
            Ok(Event::Start(ref e)) => {
                let elem = element_from_start(e, lines.line_at(offset))?;
                stack.push(elem);
            }
            Ok(Event::Empty(ref e)) => {
                let elem = element_from_start(e, lines.line_at(offset))?;
                attach(&mut stack, &mut root, elem)?;
            }
            Ok(Event::End(_)) => {
                let elem = stack.pop().ok_or_else(|| {
                    SdfError::new(ErrorCode::Parsing, "unbalanced closing tag")
                })?;
                attach(&mut stack, &mut root, elem)?;
            }
            Ok(Event::Text(ref t)) => {
                if let Some(parent) = stack.last_mut() {
                    let decoded = t.unescape().map_err(|e| {
                        SdfError::new(ErrorCode::Parsing, format!("text decode error: {e}"))
                    })?;
                    let collapsed = collapse_whitespace(&decoded);
                    if !collapsed.is_empty() {
                        match parent.text {
                            Some(ref mut existing) => {
                                existing.push(' ');
                                existing.push_str(&collapsed);
                            }
                            None => parent.text = Some(collapsed),
                        }
                    }
                }
            }
            Ok(Event::CData(ref c)) => {
                if let Some(parent) = stack.last_mut() {
                    let content = collapse_whitespace(&String::from_utf8_lossy(c));
                    if !content.is_empty() {
                        parent.text = Some(content);
                    }
                }
            }
            Ok(Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_)) => {}
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(SdfError::new(
                    ErrorCode::Parsing,
                    format!("XML parse error: {e}"),
                ));
            }
        }
    }

    if !stack.is_empty() {
        return Err(SdfError::new(ErrorCode::Parsing, "unexpected end of input"));
    }
    root.ok_or_else(|| SdfError::new(ErrorCode::Parsing, "document has no root element"))
}

/// Collapse runs of whitespace into single spaces and trim the ends,
/// matching whitespace-collapsing XML parse behavior.
fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_from_start(
    e: &quick_xml::events::BytesStart,
    line: u64,
) -> Result<XmlElement, SdfError> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut elem = XmlElement::new(name);
    elem.line = Some(line);
    for attr in e.attributes() {
        let attr = attr.map_err(|e| {
            SdfError::new(ErrorCode::Parsing, format!("malformed attribute: {e}"))
        })?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| SdfError::new(ErrorCode::Parsing, format!("attribute decode: {e}")))?
            .into_owned();
        elem.attributes.push((key, value));
    }
    Ok(elem)
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    elem: XmlElement,
) -> Result<(), SdfError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(elem);
        Ok(())
    } else if root.is_none() {
        *root = Some(elem);
        Ok(())
    } else {
        Err(SdfError::new(
            ErrorCode::Parsing,
            "document has more than one root element",
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let root = parse_str(r#"<sdf version="1.9"><world name="w"/></sdf>"#).unwrap();
        assert_eq!(root.name, "sdf");
        assert_eq!(root.attribute("version"), Some("1.9"));
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].attribute("name"), Some("w"));
    }

    #[test]
    fn test_text_content_collapsed() {
        let root = parse_str("<pose>\n  1 2 3\n  0 0 0\n</pose>").unwrap();
        assert_eq!(root.text.as_deref(), Some("1 2 3 0 0 0"));
    }

    #[test]
    fn test_line_numbers() {
        let xml = "<sdf version=\"1.9\">\n  <model name=\"m\">\n    <link name=\"l\"/>\n  </model>\n</sdf>";
        let root = parse_str(xml).unwrap();
        assert_eq!(root.line, Some(1));
        let model = root.child("model").unwrap();
        assert_eq!(model.line, Some(2));
        assert_eq!(model.child("link").unwrap().line, Some(3));
    }

    #[test]
    fn test_malformed_rejected() {
        assert!(parse_str("<sdf><model></sdf>").is_err());
        assert!(parse_str("not xml at all").is_err());
        assert!(parse_str("").is_err());
    }

    #[test]
    fn test_attribute_mutation() {
        let mut elem = XmlElement::new("pose");
        elem.set_attribute("relative_to", "base");
        assert_eq!(elem.attribute("relative_to"), Some("base"));
        elem.set_attribute("relative_to", "world");
        assert_eq!(elem.attribute("relative_to"), Some("world"));
        assert_eq!(elem.remove_attribute("relative_to").as_deref(), Some("world"));
        assert!(elem.attribute("relative_to").is_none());
    }

    #[test]
    fn test_take_children_named() {
        let mut root = parse_str("<m><link/><joint/><link/></m>").unwrap();
        let links = root.take_children_named("link");
        assert_eq!(links.len(), 2);
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].name, "joint");
    }
}

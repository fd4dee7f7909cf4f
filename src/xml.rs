//! Generic XML element tree
//!
//! The schema document is held as a plain element tree so that content the
//! cube model does not describe (shared dimensions, `<SQL>` snippets,
//! annotations, comments) survives a load/persist cycle untouched.
//!
//! [`write_document`] is the only place that decides on-disk formatting:
//! UTF-8 declaration, two-space indentation, attributes in stored order,
//! self-closing empty elements and a trailing newline. Parsing drops
//! whitespace-only text and keeps all other text verbatim, so writing a
//! parsed canonical document reproduces it byte for byte.

use std::borrow::Cow;

use quick_xml::escape::escape;
use quick_xml::events::attributes::{AttrError, Attribute};
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::QName;
use quick_xml::{Reader, Writer};
use thiserror::Error;

/// Deepest element nesting accepted by [`parse`]
pub const MAX_DEPTH: usize = 256;

/// Errors raised while tokenizing or writing XML
#[derive(Error, Debug)]
pub enum XmlError {
    #[error("{0}")]
    Syntax(#[from] quick_xml::Error),

    #[error("bad attribute: {0}")]
    Attribute(#[from] AttrError),

    #[error("invalid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("elements nested deeper than {0} levels")]
    TooDeep(usize),

    #[error("element <{0}> is never closed")]
    Unclosed(String),

    #[error("closing tag without a matching opening tag")]
    UnexpectedEnd,

    #[error("document has no root element")]
    NoRoot,

    #[error("document has more than one root element")]
    MultipleRoots,

    #[error("text outside the root element")]
    TextOutsideRoot,
}

/// A child of an element, kept in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
}

/// An XML element with ordered attributes and children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder form of [`Element::set_attr`]
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Get an attribute value by name
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, keeping its position if it already exists
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.attributes.push((key, value)),
        }
    }

    /// Append a child element
    pub fn push(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    /// Child elements, skipping text and comments
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            _ => None,
        })
    }
}

/// Parse XML text into its root element
pub fn parse(text: &str) -> Result<Element, XmlError> {
    let mut reader = Reader::from_str(text);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                check_depth(&stack)?;
                stack.push(element_from_start(&start)?);
            }
            Event::Empty(start) => {
                check_depth(&stack)?;
                let el = element_from_start(&start)?;
                attach(&mut stack, &mut root, el)?;
            }
            Event::End(_) => {
                let el = stack.pop().ok_or(XmlError::UnexpectedEnd)?;
                attach(&mut stack, &mut root, el)?;
            }
            Event::Text(text) => {
                let unescaped = text.unescape()?;
                // Indentation between elements.
                if unescaped.trim().is_empty() {
                    continue;
                }
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Text(unescaped.into_owned())),
                    None => return Err(XmlError::TextOutsideRoot),
                }
            }
            Event::CData(data) => {
                let raw = data.into_inner();
                let content = std::str::from_utf8(&raw)?.to_string();
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::CData(content)),
                    None => return Err(XmlError::TextOutsideRoot),
                }
            }
            Event::Comment(comment) => {
                // Comments outside the root are not kept.
                if let Some(parent) = stack.last_mut() {
                    let content = std::str::from_utf8(&comment)?.to_string();
                    parent.children.push(Node::Comment(content));
                }
            }
            Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            Event::Eof => break,
        }
    }

    if let Some(open) = stack.pop() {
        return Err(XmlError::Unclosed(open.name));
    }
    root.ok_or(XmlError::NoRoot)
}

fn check_depth(stack: &[Element]) -> Result<(), XmlError> {
    if stack.len() >= MAX_DEPTH {
        return Err(XmlError::TooDeep(MAX_DEPTH));
    }
    Ok(())
}

fn element_from_start(start: &BytesStart<'_>) -> Result<Element, XmlError> {
    let mut el = Element::new(std::str::from_utf8(start.name().as_ref())?);
    for attr in start.attributes() {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
        let value = attr.unescape_value()?.into_owned();
        el.attributes.push((key, value));
    }
    Ok(el)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, el: Element) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some(parent) => parent.push(el),
        None if root.is_some() => return Err(XmlError::MultipleRoots),
        None => *root = Some(el),
    }
    Ok(())
}

/// Serialize a whole document in canonical form
pub fn write_document(root: &Element) -> Result<Vec<u8>, XmlError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    write_element(&mut writer, root)?;
    let mut out = writer.into_inner();
    out.push(b'\n');
    Ok(out)
}

/// Serialize a single element, without declaration, in canonical form
pub fn write_fragment(el: &Element) -> Result<String, XmlError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    write_element(&mut writer, el)?;
    let out = writer.into_inner();
    Ok(std::str::from_utf8(&out)?.to_string())
}

/// Escape markup characters plus the whitespace that attribute-value
/// normalization would otherwise turn into plain spaces
fn escape_attribute(value: &str) -> String {
    let escaped = escape(value);
    if !escaped.contains(['\n', '\r', '\t']) {
        return escaped.into_owned();
    }
    let mut out = String::with_capacity(escaped.len() + 8);
    for ch in escaped.chars() {
        match ch {
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            '\t' => out.push_str("&#9;"),
            other => out.push(other),
        }
    }
    out
}

fn write_element(writer: &mut Writer<Vec<u8>>, el: &Element) -> Result<(), XmlError> {
    let mut start = BytesStart::new(el.name.as_str());
    for (key, value) in &el.attributes {
        start.push_attribute(Attribute {
            key: QName(key.as_bytes()),
            value: Cow::Owned(escape_attribute(value).into_bytes()),
        });
    }

    if el.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for child in &el.children {
        match child {
            Node::Element(child) => write_element(writer, child)?,
            Node::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
            Node::CData(data) => writer.write_event(Event::CData(BytesCData::new(data.as_str())))?,
            Node::Comment(text) => {
                writer.write_event(Event::Comment(BytesText::from_escaped(text.as_str())))?
            }
        }
    }
    writer.write_event(Event::End(BytesEnd::new(el.name.as_str())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANONICAL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Schema name="Monza">
  <!-- fact tables live in the warehouse -->
  <Cube name="Sales">
    <Table name="sales"/>
    <Measure name="Units" column="units" aggregator="sum"/>
  </Cube>
  <Cube name="Calls">
    <View alias="calls">
      <SQL dialect="generic">select * from calls where a &lt; b</SQL>
    </View>
  </Cube>
</Schema>
"#;

    #[test]
    fn test_parse_keeps_order_and_attributes() {
        let root = parse(CANONICAL).unwrap();
        assert_eq!(root.name, "Schema");
        assert_eq!(root.attr("name"), Some("Monza"));
        let names: Vec<_> = root.elements().filter_map(|e| e.attr("name")).collect();
        assert_eq!(names, vec!["Sales", "Calls"]);
        assert!(matches!(&root.children[0], Node::Comment(c) if c.contains("fact tables")));
    }

    #[test]
    fn test_canonical_output_is_stable() {
        let root = parse(CANONICAL).unwrap();
        let written = write_document(&root).unwrap();
        assert_eq!(String::from_utf8(written).unwrap(), CANONICAL);
    }

    #[test]
    fn test_hand_written_input_is_canonicalized() {
        let input = "<Schema   name='Monza'><Cube name=\"A\" ><Table name=\"t\"></Table></Cube>\n\n</Schema>";
        let once = write_document(&parse(input).unwrap()).unwrap();
        let twice = write_document(&parse(std::str::from_utf8(&once).unwrap()).unwrap()).unwrap();
        assert_eq!(once, twice);
        assert!(std::str::from_utf8(&once).unwrap().contains("    <Table name=\"t\"/>\n"));
    }

    #[test]
    fn test_attribute_values_are_escaped() {
        let el = Element::new("Measure").with_attr("formatString", "\"$\"#,##0.00 & more");
        let text = write_fragment(&el).unwrap();
        let back = parse(&text).unwrap();
        assert_eq!(back.attr("formatString"), Some("\"$\"#,##0.00 & more"));
    }

    #[test]
    fn test_attribute_whitespace_uses_char_refs() {
        let el = Element::new("Annotation").with_attr("value", "line one\nline two\r\tend");
        let text = write_fragment(&el).unwrap();
        assert_eq!(
            text,
            "<Annotation value=\"line one&#10;line two&#13;&#9;end\"/>"
        );
        assert_eq!(parse(&text).unwrap().attr("value"), Some("line one\nline two\r\tend"));
    }

    #[test]
    fn test_mixed_content_keeps_spaces() {
        let input = "<Annotation>hello <b>x</b> tail</Annotation>";
        let root = parse(input).unwrap();
        assert_eq!(root.children[0], Node::Text("hello ".to_string()));
        assert_eq!(root.children[2], Node::Text(" tail".to_string()));

        let written = write_fragment(&root).unwrap();
        assert_eq!(written, input);
        assert_eq!(parse(&written).unwrap(), root);
    }

    #[test]
    fn test_nesting_depth_is_limited() {
        let nested = |depth: usize| format!("{}{}", "<a>".repeat(depth), "</a>".repeat(depth));

        assert!(parse(&nested(MAX_DEPTH)).is_ok());
        assert!(matches!(
            parse(&nested(MAX_DEPTH + 1)).unwrap_err(),
            XmlError::TooDeep(MAX_DEPTH)
        ));
        assert!(matches!(
            parse(&nested(200_000)).unwrap_err(),
            XmlError::TooDeep(_)
        ));
    }

    #[test]
    fn test_set_attr_keeps_position() {
        let mut el = Element::new("Cube").with_attr("name", "A").with_attr("cache", "true");
        el.set_attr("name", "B");
        assert_eq!(el.attributes[0], ("name".to_string(), "B".to_string()));
        assert_eq!(el.attributes.len(), 2);
    }

    #[test]
    fn test_unclosed_element_is_rejected() {
        let err = parse("<Schema><Cube name=\"A\">").unwrap_err();
        assert!(matches!(err, XmlError::Unclosed(_) | XmlError::Syntax(_)));
    }

    #[test]
    fn test_mismatched_end_is_rejected() {
        assert!(parse("<Schema><Cube></Schema></Cube>").is_err());
    }

    #[test]
    fn test_empty_input_has_no_root() {
        assert!(matches!(parse("   ").unwrap_err(), XmlError::NoRoot));
    }

    #[test]
    fn test_second_root_is_rejected() {
        assert!(matches!(parse("<A/><B/>").unwrap_err(), XmlError::MultipleRoots));
    }
}

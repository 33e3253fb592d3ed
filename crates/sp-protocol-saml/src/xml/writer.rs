//! Element-at-a-time XML writer.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::{SamlError, SamlResult};

/// Thin wrapper over [`quick_xml::Writer`] that keeps attribute order as
/// given and escapes every attribute value and text node.
pub struct XmlWriter {
    inner: Writer<Vec<u8>>,
}

impl Default for XmlWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlWriter {
    /// Compact output, no whitespace between elements.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Writer::new(Vec::new()),
        }
    }

    /// Output indented by two spaces per level.
    #[must_use]
    pub fn indented() -> Self {
        Self {
            inner: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    /// Writes `<?xml version="1.0"?>`.
    pub fn declaration(&mut self) -> SamlResult<()> {
        self.write(Event::Decl(BytesDecl::new("1.0", None, None)))
    }

    /// Opens an element.
    pub fn start(&mut self, name: &str, attributes: &[(&str, &str)]) -> SamlResult<()> {
        self.write(Event::Start(element(name, attributes)))
    }

    /// Writes a self-closing element.
    pub fn empty(&mut self, name: &str, attributes: &[(&str, &str)]) -> SamlResult<()> {
        self.write(Event::Empty(element(name, attributes)))
    }

    /// Writes an element whose only content is `text`.
    pub fn text_element(
        &mut self,
        name: &str,
        attributes: &[(&str, &str)],
        text: &str,
    ) -> SamlResult<()> {
        self.start(name, attributes)?;
        self.text(text)?;
        self.end(name)
    }

    /// Writes escaped character data.
    pub fn text(&mut self, text: &str) -> SamlResult<()> {
        self.write(Event::Text(BytesText::new(text)))
    }

    /// Writes markup verbatim. The caller guarantees it is well-formed.
    pub fn raw(&mut self, markup: &str) -> SamlResult<()> {
        self.write(Event::Text(BytesText::from_escaped(markup)))
    }

    /// Closes an element.
    pub fn end(&mut self, name: &str) -> SamlResult<()> {
        self.write(Event::End(BytesEnd::new(name)))
    }

    /// Returns the document text.
    pub fn finish(self) -> SamlResult<String> {
        String::from_utf8(self.inner.into_inner()).map_err(|e| SamlError::Internal(e.to_string()))
    }

    fn write(&mut self, event: Event<'_>) -> SamlResult<()> {
        self.inner
            .write_event(event)
            .map_err(|e| SamlError::Internal(format!("XML writer error: {e}")))
    }
}

fn element<'a>(name: &'a str, attributes: &[(&'a str, &'a str)]) -> BytesStart<'a> {
    let mut start = BytesStart::new(name);
    for attribute in attributes {
        start.push_attribute(*attribute);
    }
    start
}

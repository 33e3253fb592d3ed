//! Lookup helpers over parsed `roxmltree` documents.
//!
//! SAML elements are always matched by namespace URI and local name, never
//! by prefix.

use base64::Engine;
use roxmltree::{Document, Node, ParsingOptions};

use crate::error::{SamlError, SamlResult};

/// Parses a document. DTDs are rejected.
pub fn parse_document(xml: &str) -> SamlResult<Document<'_>> {
    let options = ParsingOptions {
        allow_dtd: false,
        ..ParsingOptions::default()
    };
    Ok(Document::parse_with_options(xml, options)?)
}

/// Returns `true` if `node` is the element `{ns}local`.
#[must_use]
pub fn is_element(node: Node<'_, '_>, ns: &str, local: &str) -> bool {
    node.is_element() && node.tag_name().name() == local && node.tag_name().namespace() == Some(ns)
}

/// First child element `{ns}local`.
#[must_use]
pub fn child<'a, 'input>(node: Node<'a, 'input>, ns: &str, local: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| is_element(*n, ns, local))
}

/// All child elements `{ns}local`, in document order.
pub fn children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    ns: &'a str,
    local: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children().filter(move |n| is_element(*n, ns, local))
}

/// All descendant elements `{ns}local`, excluding `node` itself.
pub fn descendants<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    ns: &'a str,
    local: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.descendants()
        .skip(1)
        .filter(move |n| is_element(*n, ns, local))
}

/// Concatenated character data of `node` and its descendants.
#[must_use]
pub fn text_content(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(Node::is_text)
        .filter_map(|n| n.text())
        .collect()
}

/// Text of the first child element `{ns}local`.
#[must_use]
pub fn child_text(node: Node<'_, '_>, ns: &str, local: &str) -> Option<String> {
    child(node, ns, local).map(text_content)
}

/// The element exactly as it appears in the source document.
#[must_use]
pub fn source_text<'input>(node: Node<'_, 'input>) -> &'input str {
    &node.document().input_text()[node.range()]
}

/// Prefix of an element's qualified name as written in the source, `""`
/// for unprefixed names.
#[must_use]
pub fn element_prefix<'input>(node: Node<'_, 'input>) -> &'input str {
    let raw = source_text(node);
    let raw = raw.strip_prefix('<').unwrap_or(raw);
    let end = raw
        .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
        .unwrap_or(raw.len());
    raw[..end].split_once(':').map_or("", |(prefix, _)| prefix)
}

/// Decodes base64 element content, ignoring embedded whitespace.
pub fn decode_base64_text(text: &str) -> SamlResult<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(SamlError::from)
}

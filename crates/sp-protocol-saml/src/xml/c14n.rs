//! XML canonicalization of element subtrees.
//!
//! Supports Canonical XML 1.0 and Exclusive Canonical XML 1.0, each with
//! and without comments. Only what XML-DSig needs is covered: the input is
//! always one element (the signed one, or `SignedInfo`) with an optional
//! descendant excluded, which is how the enveloped-signature transform is
//! applied.

use std::collections::BTreeMap;

use roxmltree::{Node, NodeId, NodeType};

use super::parse::element_prefix;

const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Canonicalization algorithm URIs.
pub mod uris {
    /// Canonical XML 1.0.
    pub const C14N: &str = "http://www.w3.org/TR/2001/REC-xml-c14n-20010315";
    /// Canonical XML 1.0 with comments.
    pub const C14N_WITH_COMMENTS: &str =
        "http://www.w3.org/TR/2001/REC-xml-c14n-20010315#WithComments";
    /// Exclusive Canonical XML 1.0.
    pub const EXC_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";
    /// Exclusive Canonical XML 1.0 with comments.
    pub const EXC_C14N_WITH_COMMENTS: &str = "http://www.w3.org/2001/10/xml-exc-c14n#WithComments";
}

/// Canonicalization method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum C14nMethod {
    /// Canonical XML 1.0.
    Inclusive,
    /// Canonical XML 1.0 with comments.
    InclusiveWithComments,
    /// Exclusive Canonical XML 1.0.
    #[default]
    Exclusive,
    /// Exclusive Canonical XML 1.0 with comments.
    ExclusiveWithComments,
}

impl C14nMethod {
    /// Algorithm URI.
    #[must_use]
    pub const fn uri(self) -> &'static str {
        match self {
            Self::Inclusive => uris::C14N,
            Self::InclusiveWithComments => uris::C14N_WITH_COMMENTS,
            Self::Exclusive => uris::EXC_C14N,
            Self::ExclusiveWithComments => uris::EXC_C14N_WITH_COMMENTS,
        }
    }

    /// Parses an algorithm URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            uris::C14N => Some(Self::Inclusive),
            uris::C14N_WITH_COMMENTS => Some(Self::InclusiveWithComments),
            uris::EXC_C14N => Some(Self::Exclusive),
            uris::EXC_C14N_WITH_COMMENTS => Some(Self::ExclusiveWithComments),
            _ => None,
        }
    }

    /// Whether comment nodes are kept.
    #[must_use]
    pub const fn with_comments(self) -> bool {
        matches!(self, Self::InclusiveWithComments | Self::ExclusiveWithComments)
    }

    /// Whether only visibly utilized namespaces are rendered.
    #[must_use]
    pub const fn is_exclusive(self) -> bool {
        matches!(self, Self::Exclusive | Self::ExclusiveWithComments)
    }
}

/// Canonicalizes the subtree rooted at `apex`.
///
/// `exclude` drops one descendant subtree from the output (the enveloped
/// `Signature`). `inclusive_prefixes` is the exclusive-C14N
/// `InclusiveNamespaces PrefixList`, where `#default` names the default
/// namespace; it is ignored by inclusive canonicalization.
#[must_use]
pub fn canonicalize(
    apex: Node<'_, '_>,
    method: C14nMethod,
    exclude: Option<NodeId>,
    inclusive_prefixes: &[String],
) -> String {
    let mut canonicalizer = Canonicalizer {
        method,
        exclude,
        inclusive_prefixes: inclusive_prefixes
            .iter()
            .map(|p| if p == "#default" { String::new() } else { p.clone() })
            .collect(),
        out: String::new(),
    };
    canonicalizer.node(apex, &BTreeMap::new());
    canonicalizer.out
}

struct Canonicalizer {
    method: C14nMethod,
    exclude: Option<NodeId>,
    inclusive_prefixes: Vec<String>,
    out: String,
}

impl Canonicalizer {
    fn node(&mut self, node: Node<'_, '_>, rendered: &BTreeMap<String, String>) {
        if Some(node.id()) == self.exclude {
            return;
        }
        match node.node_type() {
            NodeType::Root => {
                for child in node.children() {
                    self.node(child, rendered);
                }
            }
            NodeType::Element => self.element(node, rendered),
            NodeType::Text => {
                if let Some(text) = node.text() {
                    escape_text(text, &mut self.out);
                }
            }
            NodeType::Comment => {
                if self.method.with_comments() {
                    self.out.push_str("<!--");
                    self.out.push_str(node.text().unwrap_or_default());
                    self.out.push_str("-->");
                }
            }
            NodeType::PI => {
                if let Some(pi) = node.pi() {
                    self.out.push_str("<?");
                    self.out.push_str(pi.target);
                    if let Some(value) = pi.value.filter(|v| !v.is_empty()) {
                        self.out.push(' ');
                        self.out.push_str(&value.replace('\r', "&#xD;"));
                    }
                    self.out.push_str("?>");
                }
            }
        }
    }

    fn element(&mut self, node: Node<'_, '_>, rendered: &BTreeMap<String, String>) {
        let in_scope: BTreeMap<&str, &str> = node
            .namespaces()
            .filter(|ns| ns.name() != Some("xml"))
            .map(|ns| (ns.name().unwrap_or(""), ns.uri()))
            .collect();
        let prefix = element_prefix(node);

        let candidates: Vec<&str> = if self.method.is_exclusive() {
            let mut utilized = vec![prefix];
            utilized.extend(
                node.attributes()
                    .filter_map(|a| a.namespace())
                    .filter(|ns| *ns != XML_NS)
                    .filter_map(|ns| attribute_prefix(node, ns)),
            );
            utilized.extend(self.inclusive_prefixes.iter().map(String::as_str));
            utilized
        } else {
            let mut all: Vec<&str> = in_scope.keys().copied().collect();
            all.push("");
            all
        };

        // BTreeMap ordering puts the default namespace ("") first
        let mut declarations: BTreeMap<String, String> = BTreeMap::new();
        for candidate in candidates {
            match in_scope.get(candidate) {
                Some(uri) => {
                    if rendered.get(candidate).map(String::as_str) != Some(*uri) {
                        declarations.insert(candidate.to_string(), (*uri).to_string());
                    }
                }
                None if candidate.is_empty() => {
                    if rendered.get("").is_some_and(|uri| !uri.is_empty()) {
                        declarations.insert(String::new(), String::new());
                    }
                }
                None => {}
            }
        }

        let mut attributes: Vec<(&str, &str, String, &str)> = node
            .attributes()
            .map(|a| {
                let ns = a.namespace().unwrap_or("");
                let qname = match a.namespace() {
                    Some(XML_NS) => format!("xml:{}", a.name()),
                    Some(ns) => match attribute_prefix(node, ns) {
                        Some(p) => format!("{p}:{}", a.name()),
                        None => a.name().to_string(),
                    },
                    None => a.name().to_string(),
                };
                (ns, a.name(), qname, a.value())
            })
            .collect();
        attributes.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        let qname = if prefix.is_empty() {
            node.tag_name().name().to_string()
        } else {
            format!("{prefix}:{}", node.tag_name().name())
        };

        self.out.push('<');
        self.out.push_str(&qname);
        for (ns_prefix, uri) in &declarations {
            if ns_prefix.is_empty() {
                self.out.push_str(" xmlns=\"");
            } else {
                self.out.push_str(" xmlns:");
                self.out.push_str(ns_prefix);
                self.out.push_str("=\"");
            }
            escape_attr(uri, &mut self.out);
            self.out.push('"');
        }
        for (_, _, name, value) in &attributes {
            self.out.push(' ');
            self.out.push_str(name);
            self.out.push_str("=\"");
            escape_attr(value, &mut self.out);
            self.out.push('"');
        }
        self.out.push('>');

        let mut child_rendered = rendered.clone();
        child_rendered.extend(declarations);
        for child in node.children() {
            self.node(child, &child_rendered);
        }

        self.out.push_str("</");
        self.out.push_str(&qname);
        self.out.push('>');
    }
}

fn attribute_prefix<'a>(node: Node<'a, '_>, ns_uri: &str) -> Option<&'a str> {
    node.namespaces()
        .find(|ns| ns.uri() == ns_uri && ns.name().is_some())
        .and_then(|ns| ns.name())
}

fn escape_text(s: &str, out: &mut String) {
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(ch),
        }
    }
}

fn escape_attr(s: &str, out: &mut String) {
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(ch),
        }
    }
}

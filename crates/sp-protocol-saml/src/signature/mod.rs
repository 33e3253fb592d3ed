//! XML Signature support for SAML.
//!
//! Inbound documents are verified with [`verify_node_signature`], which
//! only accepts a signature that covers exactly the element it is asked
//! about. Outbound documents are signed with [`XmlSigner`].
//!
//! # Signature wrapping
//!
//! A signature is considered to protect an element only when:
//!
//! - the element carries an `ID` that no other element in the document
//!   shares,
//! - exactly one `ds:Signature` below it references `#ID`,
//! - that signature's `SignedInfo` has a single `Reference`, and
//! - the reference uses at most two transforms.
//!
//! Anything else is treated as unsigned.

mod signer;
mod validator;

pub use signer::XmlSigner;
pub use validator::verify_node_signature;

use roxmltree::Node;
use tracing::debug;

use crate::error::{SamlError, SamlResult};
use crate::types::XMLDSIG_NS;
use crate::xml::{child, children, descendants, is_element};

/// Enveloped signature transform URI.
pub const ENVELOPED_SIGNATURE: &str = "http://www.w3.org/2000/09/xmldsig#enveloped-signature";

/// Exclusive C14N `InclusiveNamespaces` namespace.
pub const EXC_C14N_NS: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";

const MAX_TRANSFORMS: usize = 2;

/// The signature protecting an element, and its single reference.
#[derive(Debug, Clone, Copy)]
pub struct ScopedSignature<'a, 'input> {
    /// The `ds:Signature` element.
    pub signature: Node<'a, 'input>,
    /// The `ds:Reference` pointing at the signed element.
    pub reference: Node<'a, 'input>,
}

/// Finds the signature that covers `target` and nothing else.
///
/// Returns `Ok(None)` when there is no such signature.
///
/// ## Errors
///
/// Returns [`SamlError::InvalidSignature`] when the reference carries more
/// transforms than the enveloped signature and canonicalization steps.
pub fn find_scoped_signature<'a, 'input>(
    target: Node<'a, 'input>,
) -> SamlResult<Option<ScopedSignature<'a, 'input>>> {
    let Some(id) = target.attribute("ID") else {
        debug!(element = target.tag_name().name(), "element has no ID");
        return Ok(None);
    };
    let uri = format!("#{id}");

    let mut signatures = descendants(target, XMLDSIG_NS, "Signature").filter(|signature| {
        descendants(*signature, XMLDSIG_NS, "Reference")
            .any(|reference| reference.attribute("URI") == Some(uri.as_str()))
    });
    let (Some(signature), None) = (signatures.next(), signatures.next()) else {
        debug!(id, "expected exactly one signature referencing element");
        return Ok(None);
    };

    let transforms = descendants(signature, XMLDSIG_NS, "Transform")
        .filter(|transform| {
            transform.ancestors().any(|ancestor| {
                is_element(ancestor, XMLDSIG_NS, "Reference")
                    && ancestor.attribute("URI") == Some(uri.as_str())
            })
        })
        .count();
    if transforms > MAX_TRANSFORMS {
        return Err(SamlError::InvalidSignature(
            "Invalid signature, too many transforms".to_string(),
        ));
    }

    let Some(signed_info) = child(signature, XMLDSIG_NS, "SignedInfo") else {
        debug!(id, "signature has no SignedInfo");
        return Ok(None);
    };
    let mut references = children(signed_info, XMLDSIG_NS, "Reference");
    let (Some(reference), None) = (references.next(), references.next()) else {
        debug!(id, "SignedInfo must hold exactly one Reference");
        return Ok(None);
    };
    if reference.attribute("URI") != Some(uri.as_str()) {
        debug!(id, "Reference does not point at the element");
        return Ok(None);
    }

    let same_id = target
        .document()
        .descendants()
        .filter(|node| {
            node.is_element()
                && ["ID", "Id", "id"]
                    .iter()
                    .any(|name| node.attribute(*name) == Some(id))
        })
        .count();
    if same_id != 1 {
        debug!(id, count = same_id, "element ID is not unique in document");
        return Ok(None);
    }

    Ok(Some(ScopedSignature {
        signature,
        reference,
    }))
}

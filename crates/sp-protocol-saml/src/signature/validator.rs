//! XML Signature validation.
//!
//! Verifies an enveloped signature against the identity provider's
//! certificates. Certificates embedded in `KeyInfo` are never trusted.

use roxmltree::Node;
use sp_crypto::signature::verify_with_any;
use sp_crypto::{digest, Certificate, HashAlgorithm, SignatureAlgorithm};
use tracing::debug;

use crate::error::SamlResult;
use crate::types::XMLDSIG_NS;
use crate::xml::{c14n::canonicalize, child, child_text, children, decode_base64_text, C14nMethod};

use super::{find_scoped_signature, ScopedSignature, ENVELOPED_SIGNATURE, EXC_C14N_NS};

/// Checks that `target` carries a valid signature from one of
/// `certificates`.
///
/// Returns `Ok(false)` for a missing, misplaced or non-verifying
/// signature. The reason is logged at debug level.
///
/// ## Errors
///
/// Fails only on the structural wrapping checks of
/// [`find_scoped_signature`].
pub fn verify_node_signature(target: Node<'_, '_>, certificates: &[Certificate]) -> SamlResult<bool> {
    let Some(scoped) = find_scoped_signature(target)? else {
        return Ok(false);
    };
    match check(target, scoped, certificates) {
        Ok(()) => Ok(true),
        Err(reason) => {
            debug!(
                element = target.tag_name().name(),
                reason, "signature rejected"
            );
            Ok(false)
        }
    }
}

fn check(
    target: Node<'_, '_>,
    scoped: ScopedSignature<'_, '_>,
    certificates: &[Certificate],
) -> Result<(), &'static str> {
    let signature = scoped.signature;
    let reference = scoped.reference;
    let signed_info =
        child(signature, XMLDSIG_NS, "SignedInfo").ok_or("missing SignedInfo")?;

    let c14n_node = child(signed_info, XMLDSIG_NS, "CanonicalizationMethod")
        .ok_or("missing CanonicalizationMethod")?;
    let signed_info_method = c14n_node
        .attribute("Algorithm")
        .and_then(C14nMethod::from_uri)
        .ok_or("unsupported CanonicalizationMethod")?;
    let signed_info_prefixes = inclusive_prefixes(c14n_node);

    let algorithm = child(signed_info, XMLDSIG_NS, "SignatureMethod")
        .and_then(|n| n.attribute("Algorithm"))
        .ok_or("missing SignatureMethod")?;
    let algorithm =
        SignatureAlgorithm::from_uri(algorithm).map_err(|_| "unsupported SignatureMethod")?;

    let digest_algorithm = child(reference, XMLDSIG_NS, "DigestMethod")
        .and_then(|n| n.attribute("Algorithm"))
        .ok_or("missing DigestMethod")?;
    let digest_algorithm =
        HashAlgorithm::from_digest_uri(digest_algorithm).map_err(|_| "unsupported DigestMethod")?;

    let mut exclude = None;
    let mut method = C14nMethod::Inclusive;
    let mut prefixes = Vec::new();
    if let Some(transforms) = child(reference, XMLDSIG_NS, "Transforms") {
        for transform in children(transforms, XMLDSIG_NS, "Transform") {
            match transform.attribute("Algorithm") {
                Some(ENVELOPED_SIGNATURE) => exclude = Some(signature.id()),
                Some(uri) => {
                    method = C14nMethod::from_uri(uri).ok_or("unsupported Transform")?;
                    prefixes = inclusive_prefixes(transform);
                }
                None => return Err("Transform without Algorithm"),
            }
        }
    }

    let expected = child_text(reference, XMLDSIG_NS, "DigestValue")
        .ok_or("missing DigestValue")
        .and_then(|text| decode_base64_text(&text).map_err(|_| "DigestValue is not base64"))?;
    let canonical = canonicalize(target, method, exclude, &prefixes);
    if digest(digest_algorithm, canonical.as_bytes()) != expected {
        return Err("digest mismatch");
    }

    let signature_value = child_text(signature, XMLDSIG_NS, "SignatureValue")
        .ok_or("missing SignatureValue")
        .and_then(|text| decode_base64_text(&text).map_err(|_| "SignatureValue is not base64"))?;
    let canonical_signed_info =
        canonicalize(signed_info, signed_info_method, None, &signed_info_prefixes);
    verify_with_any(
        algorithm,
        certificates,
        canonical_signed_info.as_bytes(),
        &signature_value,
    )
    .map(|_| ())
    .ok_or("no certificate verifies the signature")
}

fn inclusive_prefixes(method: Node<'_, '_>) -> Vec<String> {
    child(method, EXC_C14N_NS, "InclusiveNamespaces")
        .and_then(|n| n.attribute("PrefixList"))
        .map(|list| list.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

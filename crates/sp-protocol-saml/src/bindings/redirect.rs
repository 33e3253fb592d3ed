//! HTTP-Redirect Binding implementation.
//!
//! Messages travel as raw DEFLATE + base64 query parameters. The query
//! signature covers the literal `SAMLRequest`/`SAMLResponse`, `RelayState`
//! and `SigAlg` tokens, so the signed text is exactly the text placed in
//! the URL, and verification works on the original query string rather
//! than on re-encoded values.

use std::io::{Read, Write};

use base64::Engine;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use sp_crypto::signature::verify_with_any;
use sp_crypto::{sign, Certificate, PrivateKey, SignatureAlgorithm};
use tracing::debug;

use crate::error::{SamlError, SamlResult};

use super::{param, SamlMessageType, RESERVED};

/// Compresses data using DEFLATE (raw, no zlib header).
pub fn deflate(data: &[u8]) -> SamlResult<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Decompresses raw DEFLATE data.
pub fn inflate(data: &[u8]) -> SamlResult<Vec<u8>> {
    let mut decoder = DeflateDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder.read_to_end(&mut decompressed)?;
    Ok(decompressed)
}

/// Base64-encodes `xml`, deflating it first when `compress` is set.
pub fn encode_message(xml: &str, compress: bool) -> SamlResult<String> {
    let bytes = if compress {
        deflate(xml.as_bytes())?
    } else {
        xml.as_bytes().to_vec()
    };
    Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
}

/// Decodes a redirect-binding message: base64, then inflate.
pub fn decode_message(encoded: &str) -> SamlResult<String> {
    let compressed = base64::engine::general_purpose::STANDARD.decode(encoded.trim())?;
    Ok(String::from_utf8(inflate(&compressed)?)?)
}

/// Decodes a message that may or may not be deflated.
pub fn decode_lenient(encoded: &str) -> SamlResult<String> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD.decode(compact)?;
    match inflate(&bytes).map(String::from_utf8) {
        Ok(Ok(xml)) if xml.trim_start().starts_with('<') => Ok(xml),
        _ => Ok(String::from_utf8(bytes)?),
    }
}

/// Key and algorithm used to sign redirect-binding queries.
#[derive(Debug, Clone, Copy)]
pub struct QuerySigner<'a> {
    /// Signing key.
    pub key: &'a PrivateKey,
    /// Signature algorithm, also sent as `SigAlg`.
    pub algorithm: SignatureAlgorithm,
}

/// Builds a redirect URL carrying an encoded message.
///
/// Query order is the message, `RelayState`, `SigAlg`, `Signature`, then
/// the remaining parameters. Reserved names in `params` are ignored.
///
/// ## Errors
///
/// Fails when `target` is not an absolute URL or signing fails.
pub fn build_redirect_url(
    target: &str,
    message_type: SamlMessageType,
    encoded: &str,
    params: &[(String, String)],
    signer: Option<QuerySigner<'_>>,
) -> SamlResult<String> {
    url::Url::parse(target)
        .map_err(|e| SamlError::Configuration(format!("invalid URL {target}: {e}")))?;

    let mut query = vec![token(message_type.param(), encoded)];
    if let Some(relay_state) = param(params, "RelayState") {
        query.push(token("RelayState", relay_state));
    }
    if let Some(signer) = signer {
        query.push(token("SigAlg", signer.algorithm.uri()));
        let signature = sign(signer.algorithm, signer.key, query.join("&").as_bytes())?;
        query.push(token(
            "Signature",
            &base64::engine::general_purpose::STANDARD.encode(signature),
        ));
    }

    query.extend(
        params
            .iter()
            .filter(|(k, _)| k != "RelayState" && !RESERVED.contains(&k.as_str()))
            .map(|(k, v)| token(k, v)),
    );

    let separator = if target.contains('?') { '&' } else { '?' };
    Ok(format!("{target}{separator}{}", query.join("&")))
}

fn token(key: &str, value: &str) -> String {
    format!("{}={}", urlencoding::encode(key), urlencoding::encode(value))
}

/// Protocol parameters of an inbound redirect, read from the raw query.
///
/// `signed` is the exact text the sender signed; the other fields are the
/// decoded values of the very tokens it contains, so the message that gets
/// processed is always the one the signature covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedQuery {
    /// `SAMLRequest=..[&RelayState=..]&SigAlg=..`, still URL-encoded.
    pub signed: String,
    /// Decoded `SAMLRequest` or `SAMLResponse` value.
    pub message: String,
    /// Decoded `RelayState`.
    pub relay_state: Option<String>,
    /// Decoded `SigAlg`.
    pub sig_alg: String,
    /// Decoded `Signature`, base64.
    pub signature: String,
}

/// Parameters covered by, or carrying, the query signature.
const SIGNED_PARAMS: [&str; 5] = ["SAMLRequest", "SAMLResponse", "RelayState", "SigAlg", "Signature"];

/// Splits an inbound redirect query into its signed portion and the
/// decoded protocol values.
///
/// ## Errors
///
/// - [`SamlError::MalformedMessage`] when the message token is missing or
///   any protocol parameter appears more than once.
/// - [`SamlError::InvalidSignature`] when `SigAlg` or `Signature` is
///   missing.
pub fn signed_query(original_query: &str, message_type: SamlMessageType) -> SamlResult<SignedQuery> {
    let original_query = original_query.strip_prefix('?').unwrap_or(original_query);

    let mut tokens: Vec<(&'static str, &str, String)> = Vec::new();
    for token in original_query.split('&').filter(|t| !t.is_empty()) {
        let Some((key, value)) = url::form_urlencoded::parse(token.as_bytes()).next() else {
            continue;
        };
        let Some(name) = SIGNED_PARAMS.into_iter().find(|name| *name == key) else {
            continue;
        };
        if tokens.iter().any(|(seen, _, _)| *seen == name) {
            return Err(SamlError::MalformedMessage(format!(
                "{name} appears more than once in query"
            )));
        }
        tokens.push((name, token, value.into_owned()));
    }

    let find = |name: &str| tokens.iter().find(|(seen, _, _)| *seen == name);
    let (_, message_token, message) = find(message_type.param()).ok_or_else(|| {
        SamlError::MalformedMessage(format!("{} missing from query", message_type.param()))
    })?;
    let missing_signature = || SamlError::InvalidSignature("Missing query signature".to_string());
    let (_, sig_alg_token, sig_alg) = find("SigAlg").ok_or_else(missing_signature)?;
    let (_, _, signature) = find("Signature").ok_or_else(missing_signature)?;
    let relay_state = find("RelayState");

    let mut signed = (*message_token).to_string();
    if let Some((_, token, _)) = relay_state {
        signed.push('&');
        signed.push_str(token);
    }
    signed.push('&');
    signed.push_str(sig_alg_token);

    Ok(SignedQuery {
        signed,
        message: message.clone(),
        relay_state: relay_state.map(|(_, _, value)| value.clone()),
        sig_alg: sig_alg.clone(),
        signature: signature.clone(),
    })
}

/// Verifies a detached query signature against any of `certificates`.
///
/// `signature` is the decoded `Signature` parameter value (base64).
///
/// ## Errors
///
/// Returns [`SamlError::InvalidSignature`] for an unsupported `SigAlg` or
/// when no certificate verifies.
pub fn verify_query_signature(
    signed: &str,
    sig_alg: &str,
    signature: &str,
    certificates: &[Certificate],
) -> SamlResult<()> {
    let algorithm = SignatureAlgorithm::from_sig_alg(sig_alg)
        .map_err(|e| SamlError::InvalidSignature(e.to_string()))?;
    let compact: String = signature.chars().filter(|c| !c.is_whitespace()).collect();
    let signature = base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|_| SamlError::InvalidSignature("Invalid query signature".to_string()))?;

    match verify_with_any(algorithm, certificates, signed.as_bytes(), &signature) {
        Some(_) => Ok(()),
        None => {
            debug!(sig_alg, "no certificate verifies query signature");
            Err(SamlError::InvalidSignature("Invalid query signature".to_string()))
        }
    }
}

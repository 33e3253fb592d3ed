//! Random identifiers.

use rand::Rng;

/// Generates `len` cryptographically secure random bytes.
#[must_use]
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut rng = rand::rng();
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes[..]);
    bytes
}

/// Generates a SAML request identifier.
///
/// The identifier is an underscore followed by 20 lowercase hex digits
/// (80 bits of entropy). The leading underscore keeps it a valid `xs:ID`.
#[must_use]
pub fn generate_request_id() -> String {
    let hex: String = random_bytes(10).iter().map(|b| format!("{b:02x}")).collect();
    format!("_{hex}")
}

//! XML plumbing: a typed writer for outbound messages, lookup helpers for
//! inbound documents, and canonicalization for signatures.
//!
//! Outbound documents are produced with `quick-xml`; inbound documents are
//! parsed with `roxmltree`, which rejects DTDs, so entity expansion attacks
//! never reach the validators.

pub mod c14n;
mod parse;
mod writer;

pub use c14n::{canonicalize, C14nMethod};
pub use parse::*;
pub use writer::XmlWriter;

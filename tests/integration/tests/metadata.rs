//! Metadata tests.

use sp_integration_tests::{SP_ACS_URL, SP_CERT, SP_KEY, SP_SLO_URL};
use sp_protocol_saml::{SamlError, METADATA_NS};

use crate::common::TestEnv;

/// Tests that the metadata advertises the configured endpoints and keys.
#[tokio::test]
async fn test_metadata_describes_service_provider() -> anyhow::Result<()> {
    let env = TestEnv::with_config(|config| config.with_signing(SP_KEY, SP_CERT))?;
    let xml = env.sp.metadata(None, None)?;

    let doc = roxmltree::Document::parse(&xml)?;
    let root = doc.root_element();
    assert!(root.has_tag_name((METADATA_NS, "EntityDescriptor")));

    let locations: Vec<_> = root
        .descendants()
        .filter_map(|n| n.attribute("Location"))
        .collect();
    assert_eq!(locations, [SP_SLO_URL, SP_ACS_URL]);

    let uses: Vec<_> = root
        .descendants()
        .filter(|n| n.has_tag_name((METADATA_NS, "KeyDescriptor")))
        .filter_map(|n| n.attribute("use"))
        .collect();
    assert_eq!(uses, ["signing", "encryption"]);

    Ok(())
}

/// Tests that a decryption key without its certificate is reported.
#[tokio::test]
async fn test_metadata_requires_certificates() -> anyhow::Result<()> {
    let env = TestEnv::with_config(|mut config| {
        config.decryption_cert = None;
        config
    })?;
    let err = env.sp.metadata(None, None).unwrap_err();
    assert!(matches!(err, SamlError::MissingCredential(_)), "got {err:?}");
    assert!(env.sp.metadata(Some(SP_CERT), None).is_ok());
    Ok(())
}

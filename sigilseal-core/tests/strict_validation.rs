//! Integration tests for strict-mode resolution.
//!
//! These tests cover:
//! - Trust anchors contributed by the credential store itself
//! - Explicit and default trust stores, and how their failures are handled
//! - Rejection of expired and non-code-signing leaves
//! - Anchor de-duplication

mod common;

use common::{
    Fixture, STORE_PASS, code_signing_leaf, expired_leaf, hermetic_builder, intermediate_ca, pem,
    root_ca, self_signed_signer, tls_leaf,
};
use sigilseal_core::{
    IdentityDefaults, IdentityError, Passphrase, ProviderRegistry, StoreLocation,
    TrustAnchorAssembler, load_store,
};

fn reason(err: IdentityError) -> String {
    match err {
        IdentityError::PathValidationFailed { reason } => reason,
        other => panic!("expected PathValidationFailed, got {other:?}"),
    }
}

#[test]
fn test_self_signed_without_trust_store() {
    let fx = Fixture::new();
    let signer = self_signed_signer("Solo Signer");
    let keystore = fx.keystore("solo", &signer, &[], STORE_PASS);

    let identity = hermetic_builder()
        .key_store(&keystore)
        .unwrap()
        .alias("solo")
        .unwrap()
        .store_pass(Passphrase::new(STORE_PASS))
        .strict(true)
        .build()
        .unwrap();

    assert_eq!(identity.certificate_path().len(), 1);
}

#[test]
fn test_ca_signed_without_anchors_fails() {
    let fx = Fixture::new();
    let root = root_ca("Test Root");
    let leaf = code_signing_leaf("Signer", &root);
    // The root is linked into the key entry's chain, so it is not an alias.
    let keystore = fx.keystore("signer", &leaf, &[&root.cert], STORE_PASS);
    let pass = Passphrase::new(STORE_PASS);

    let err = hermetic_builder()
        .key_store(&keystore)
        .unwrap()
        .alias("signer")
        .unwrap()
        .store_pass(pass.clone())
        .strict(true)
        .build()
        .unwrap_err();

    assert_eq!(reason(err), "no trust anchors available");
    assert!(pass.is_destroyed());
}

#[test]
fn test_non_strict_skips_validation() {
    let fx = Fixture::new();
    let root = root_ca("Test Root");
    let leaf = tls_leaf("TLS Server", &root);
    let keystore = fx.keystore("tls", &leaf, &[&root.cert], STORE_PASS);

    let result = hermetic_builder()
        .key_store(&keystore)
        .unwrap()
        .alias("tls")
        .unwrap()
        .store_pass(Passphrase::new(STORE_PASS))
        .build();

    assert!(result.is_ok());
}

#[test]
fn test_explicit_trust_store_validates_chain() {
    let fx = Fixture::new();
    let root = root_ca("Test Root");
    let leaf = code_signing_leaf("Signer", &root);
    let keystore = fx.keystore("signer", &leaf, &[&root.cert], STORE_PASS);
    let trust = fx.write("trust.pem", &pem(&[&root.cert]));

    let identity = hermetic_builder()
        .key_store(&keystore)
        .unwrap()
        .trust_store(&trust)
        .unwrap()
        .alias("signer")
        .unwrap()
        .store_pass(Passphrase::new(STORE_PASS))
        .strict(true)
        .build()
        .unwrap();

    assert_eq!(identity.certificate_path().len(), 2);
}

#[test]
fn test_intermediate_chain_with_trusted_entry_anchor() {
    let fx = Fixture::new();
    let root = root_ca("Test Root");
    let issuing = intermediate_ca("Issuing CA", &root);
    let leaf = code_signing_leaf("Signer", &issuing);
    // The root does not issue the leaf directly, so it stays a trusted entry.
    let keystore = fx.keystore("signer", &leaf, &[&root.cert], STORE_PASS);
    let chain = fx.write("chain.pem", &pem(&[&leaf.cert, &issuing.cert]));

    let identity = hermetic_builder()
        .key_store(&keystore)
        .unwrap()
        .certificate_path(&chain)
        .unwrap()
        .alias("signer")
        .unwrap()
        .store_pass(Passphrase::new(STORE_PASS))
        .strict(true)
        .build()
        .unwrap();

    assert_eq!(identity.certificate_path().len(), 2);
}

#[test]
fn test_default_trust_store_is_used() {
    let fx = Fixture::new();
    let root = root_ca("Test Root");
    let leaf = code_signing_leaf("Signer", &root);
    let keystore = fx.keystore("signer", &leaf, &[&root.cert], STORE_PASS);
    let system = fx.write("system.pem", &pem(&[&root.cert]));

    let result = hermetic_builder()
        .defaults(IdentityDefaults::none().with_trust_store(&system))
        .key_store(&keystore)
        .unwrap()
        .alias("signer")
        .unwrap()
        .store_pass(Passphrase::new(STORE_PASS))
        .strict(true)
        .build();

    assert!(result.is_ok());
}

#[test]
fn test_missing_default_trust_store_is_not_fatal() {
    let fx = Fixture::new();
    let signer = self_signed_signer("Solo Signer");
    let keystore = fx.keystore("solo", &signer, &[], STORE_PASS);

    let result = hermetic_builder()
        .defaults(IdentityDefaults::none().with_trust_store(fx.missing("system.pem")))
        .key_store(&keystore)
        .unwrap()
        .alias("solo")
        .unwrap()
        .store_pass(Passphrase::new(STORE_PASS))
        .strict(true)
        .build();

    assert!(result.is_ok());
}

#[test]
fn test_missing_explicit_trust_store_fails_at_setter() {
    let fx = Fixture::new();

    let err = hermetic_builder()
        .trust_store(fx.missing("trust.pem"))
        .unwrap_err();

    assert!(matches!(err, IdentityError::NotFound { what: "Truststore", .. }));
}

#[test]
fn test_corrupt_explicit_trust_store_is_fatal() {
    let fx = Fixture::new();
    let signer = self_signed_signer("Solo Signer");
    let keystore = fx.keystore("solo", &signer, &[], STORE_PASS);
    let corrupt = fx.write("trust.bin", b"\x00\x01\x02 definitely not certificates");
    let pass = Passphrase::new(STORE_PASS);

    let result = hermetic_builder()
        .key_store(&keystore)
        .unwrap()
        .trust_store(&corrupt)
        .unwrap()
        .alias("solo")
        .unwrap()
        .store_pass(pass.clone())
        .strict(true)
        .build();

    assert!(matches!(result, Err(IdentityError::StoreLoad { .. })));
    assert!(pass.is_destroyed());
}

#[test]
fn test_server_auth_leaf_rejected() {
    let fx = Fixture::new();
    let root = root_ca("Test Root");
    let leaf = tls_leaf("TLS Server", &root);
    let keystore = fx.keystore("tls", &leaf, &[&root.cert], STORE_PASS);
    let trust = fx.write("trust.pem", &pem(&[&root.cert]));

    let err = hermetic_builder()
        .key_store(&keystore)
        .unwrap()
        .trust_store(&trust)
        .unwrap()
        .alias("tls")
        .unwrap()
        .store_pass(Passphrase::new(STORE_PASS))
        .strict(true)
        .build()
        .unwrap_err();

    assert!(reason(err).contains("not permitted for code signing"));
}

#[test]
fn test_expired_leaf_rejected() {
    let fx = Fixture::new();
    let root = root_ca("Test Root");
    let leaf = expired_leaf("Stale Signer", &root);
    let keystore = fx.keystore("stale", &leaf, &[&root.cert], STORE_PASS);
    let trust = fx.write("trust.pem", &pem(&[&root.cert]));

    let err = hermetic_builder()
        .key_store(&keystore)
        .unwrap()
        .trust_store(&trust)
        .unwrap()
        .alias("stale")
        .unwrap()
        .store_pass(Passphrase::new(STORE_PASS))
        .strict(true)
        .build()
        .unwrap_err();

    assert!(reason(err).contains("expired"));
}

#[test]
fn test_anchor_from_both_tiers_counted_once() {
    let fx = Fixture::new();
    let signer = self_signed_signer("Solo Signer");
    let keystore = fx.keystore("solo", &signer, &[], STORE_PASS);
    let system = fx.write("system.pem", &pem(&[&signer.cert]));

    let store = load_store(
        &ProviderRegistry::with_defaults(),
        &StoreLocation::from_path(&keystore),
        "PKCS12",
        None,
        Some(&Passphrase::new(STORE_PASS)),
    )
    .unwrap();

    let anchors = TrustAnchorAssembler::new()
        .default_location(Some(system))
        .assemble(store.as_ref())
        .unwrap();

    assert_eq!(anchors.len(), 1);
    assert!(anchors.contains(&signer.cert));
}

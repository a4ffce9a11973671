//! Certificate fixtures for unit tests.

use std::time::{SystemTime, UNIX_EPOCH};

use openssl::asn1::Asn1Time;
use openssl::bn::{BigNum, MsbOption};
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkcs12::Pkcs12;
use openssl::pkey::{PKey, Private};
use openssl::stack::Stack;
use openssl::x509::extension::{BasicConstraints, ExtendedKeyUsage, KeyUsage};
use openssl::x509::{X509, X509Builder, X509Extension, X509NameBuilder};

const DAY: i64 = 86_400;

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

pub(crate) fn new_key() -> PKey<Private> {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap()
}

fn build(
    cn: &str,
    key: &PKey<Private>,
    issuer: Option<(&PKey<Private>, &X509)>,
    extensions: Vec<X509Extension>,
    validity: (i64, i64),
) -> X509 {
    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", cn).unwrap();
    let name = name.build();

    let mut serial = BigNum::new().unwrap();
    serial.rand(64, MsbOption::MAYBE_ZERO, false).unwrap();

    let mut builder = X509Builder::new().unwrap();
    builder.set_version(2).unwrap();
    builder
        .set_serial_number(&serial.to_asn1_integer().unwrap())
        .unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_pubkey(key).unwrap();
    builder
        .set_not_before(&Asn1Time::from_unix(validity.0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::from_unix(validity.1).unwrap())
        .unwrap();
    for ext in extensions {
        builder.append_extension(ext).unwrap();
    }

    match issuer {
        Some((issuer_key, issuer_cert)) => {
            builder.set_issuer_name(issuer_cert.subject_name()).unwrap();
            builder.sign(issuer_key, MessageDigest::sha256()).unwrap();
        }
        None => {
            builder.set_issuer_name(&name).unwrap();
            builder.sign(key, MessageDigest::sha256()).unwrap();
        }
    }
    builder.build()
}

fn current() -> (i64, i64) {
    (now() - DAY, now() + 365 * DAY)
}

/// A self-signed CA certificate that may also sign code.
pub(crate) fn self_signed(cn: &str) -> (PKey<Private>, X509) {
    let key = new_key();
    let extensions = vec![
        BasicConstraints::new().critical().ca().build().unwrap(),
        KeyUsage::new()
            .critical()
            .digital_signature()
            .key_cert_sign()
            .crl_sign()
            .build()
            .unwrap(),
    ];
    let cert = build(cn, &key, None, extensions, current());
    (key, cert)
}

/// A code-signing leaf issued by `issuer`.
pub(crate) fn ca_signed(cn: &str, issuer_key: &PKey<Private>, issuer: &X509) -> (PKey<Private>, X509) {
    issue(
        cn,
        issuer_key,
        issuer,
        vec![
            KeyUsage::new().critical().digital_signature().build().unwrap(),
            ExtendedKeyUsage::new().code_signing().build().unwrap(),
        ],
    )
}

/// A leaf issued by `issuer` carrying exactly `extensions`.
pub(crate) fn issue(
    cn: &str,
    issuer_key: &PKey<Private>,
    issuer: &X509,
    extensions: Vec<X509Extension>,
) -> (PKey<Private>, X509) {
    let key = new_key();
    let cert = build(cn, &key, Some((issuer_key, issuer)), extensions, current());
    (key, cert)
}

/// A code-signing leaf whose validity ended yesterday.
pub(crate) fn expired(cn: &str, issuer_key: &PKey<Private>, issuer: &X509) -> (PKey<Private>, X509) {
    let key = new_key();
    let extensions = vec![KeyUsage::new().digital_signature().build().unwrap()];
    let cert = build(
        cn,
        &key,
        Some((issuer_key, issuer)),
        extensions,
        (now() - 30 * DAY, now() - DAY),
    );
    (key, cert)
}

/// Encode a PKCS#12 file holding one key entry named `name`.
pub(crate) fn pkcs12_der(
    name: &str,
    key: &PKey<Private>,
    cert: &X509,
    ca: &[X509],
    passphrase: &str,
) -> Vec<u8> {
    let mut builder = Pkcs12::builder();
    builder.name(name).pkey(key).cert(cert);
    if !ca.is_empty() {
        let mut stack = Stack::new().unwrap();
        for c in ca {
            stack.push(c.clone()).unwrap();
        }
        builder.ca(stack);
    }
    builder.build2(passphrase).unwrap().to_der().unwrap()
}

//! Shared fixtures for integration tests.
//!
//! Certificates and key stores are generated per test into a temporary
//! directory.

#![allow(dead_code)]

use std::path::PathBuf;
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
use sigilseal_core::{IdentityBuilder, IdentityDefaults};
use tempfile::TempDir;

pub const STORE_PASS: &str = "changeit";

const DAY: i64 = 86_400;

/// A key and the certificate issued for it.
pub struct Issued {
    pub key: PKey<Private>,
    pub cert: X509,
}

fn now() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs() as i64
}

fn issue(
    cn: &str,
    issuer: Option<&Issued>,
    extensions: Vec<X509Extension>,
    not_before: i64,
    not_after: i64,
) -> Issued {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    let key = PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap();

    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("O", "Sigilseal Tests").unwrap();
    name.append_entry_by_text("CN", cn).unwrap();
    let name = name.build();

    let mut serial = BigNum::new().unwrap();
    serial.rand(64, MsbOption::MAYBE_ZERO, false).unwrap();

    let mut builder = X509Builder::new().unwrap();
    builder.set_version(2).unwrap();
    builder.set_serial_number(&serial.to_asn1_integer().unwrap()).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_pubkey(&key).unwrap();
    builder.set_not_before(&Asn1Time::from_unix(not_before).unwrap()).unwrap();
    builder.set_not_after(&Asn1Time::from_unix(not_after).unwrap()).unwrap();
    for ext in extensions {
        builder.append_extension(ext).unwrap();
    }
    match issuer {
        Some(issuer) => {
            builder.set_issuer_name(issuer.cert.subject_name()).unwrap();
            builder.sign(&issuer.key, MessageDigest::sha256()).unwrap();
        }
        None => {
            builder.set_issuer_name(&name).unwrap();
            builder.sign(&key, MessageDigest::sha256()).unwrap();
        }
    }

    Issued {
        key,
        cert: builder.build(),
    }
}

fn ca_extensions() -> Vec<X509Extension> {
    vec![
        BasicConstraints::new().critical().ca().build().unwrap(),
        KeyUsage::new().critical().key_cert_sign().crl_sign().build().unwrap(),
    ]
}

fn signing_extensions() -> Vec<X509Extension> {
    vec![
        KeyUsage::new().critical().digital_signature().build().unwrap(),
        ExtendedKeyUsage::new().code_signing().build().unwrap(),
    ]
}

fn valid_now() -> (i64, i64) {
    (now() - DAY, now() + 365 * DAY)
}

pub fn root_ca(cn: &str) -> Issued {
    let (from, to) = valid_now();
    issue(cn, None, ca_extensions(), from, to)
}

pub fn intermediate_ca(cn: &str, issuer: &Issued) -> Issued {
    let (from, to) = valid_now();
    issue(cn, Some(issuer), ca_extensions(), from, to)
}

pub fn code_signing_leaf(cn: &str, issuer: &Issued) -> Issued {
    let (from, to) = valid_now();
    issue(cn, Some(issuer), signing_extensions(), from, to)
}

/// A self-signed certificate usable for code signing.
pub fn self_signed_signer(cn: &str) -> Issued {
    let (from, to) = valid_now();
    issue(cn, None, signing_extensions(), from, to)
}

/// A leaf restricted to TLS server authentication.
pub fn tls_leaf(cn: &str, issuer: &Issued) -> Issued {
    let (from, to) = valid_now();
    let extensions = vec![
        KeyUsage::new().critical().digital_signature().key_encipherment().build().unwrap(),
        ExtendedKeyUsage::new().server_auth().build().unwrap(),
    ];
    issue(cn, Some(issuer), extensions, from, to)
}

pub fn expired_leaf(cn: &str, issuer: &Issued) -> Issued {
    issue(cn, Some(issuer), signing_extensions(), now() - 60 * DAY, now() - DAY)
}

/// Concatenated PEM encoding of `certs`.
pub fn pem(certs: &[&X509]) -> Vec<u8> {
    certs.iter().flat_map(|c| c.to_pem().unwrap()).collect()
}

/// A temporary directory holding generated files.
pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn write(&self, name: &str, data: &[u8]) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, data).unwrap();
        path
    }

    pub fn missing(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write a PKCS#12 key store holding `signer` under `alias`, plus `extra`
    /// certificates, protected by `pass`.
    pub fn keystore(&self, alias: &str, signer: &Issued, extra: &[&X509], pass: &str) -> PathBuf {
        let mut builder = Pkcs12::builder();
        builder.name(alias).pkey(&signer.key).cert(&signer.cert);
        if !extra.is_empty() {
            let mut ca = Stack::new().unwrap();
            for cert in extra {
                ca.push((*cert).clone()).unwrap();
            }
            builder.ca(ca);
        }
        let der = builder.build2(pass).unwrap().to_der().unwrap();
        self.write(&format!("{alias}.p12"), &der)
    }
}

/// A builder that never consults the host's key or trust stores.
pub fn hermetic_builder() -> IdentityBuilder {
    IdentityBuilder::new().defaults(IdentityDefaults::none())
}

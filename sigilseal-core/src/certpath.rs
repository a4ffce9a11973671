//! Certification paths.
//!
//! This module provides:
//! - [`CertificationPath`] - An ordered, non-empty leaf-to-issuer certificate sequence
//! - [`decode_certificates`] - Decoder for the supported path encodings
//! - [`CertificateSummary`] - A serialisable description of one certificate
//!
//! # Supported encodings
//!
//! - PEM `CERTIFICATE` blocks, concatenated
//! - PEM `PKCS7` signed-data container
//! - DER PKCS#7 signed-data container
//! - DER certificates, concatenated

use std::path::Path;

use chrono::{DateTime, Utc};
use openssl::asn1::{Asn1Time, Asn1TimeRef};
use openssl::error::ErrorStack;
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkcs7::Pkcs7;
use openssl::x509::{X509, X509NameRef, X509Ref};
use serde::{Deserialize, Serialize};

use crate::error::{IdentityError, Result};

const PEM_MARKER: &[u8] = b"-----BEGIN";
const PEM_PKCS7_MARKER: &str = "-----BEGIN PKCS7-----";

/// An ordered sequence of certificates, leaf first.
///
/// Never empty: element 0 is always the subject certificate.
#[derive(Clone)]
pub struct CertificationPath {
    certificates: Vec<X509>,
}

impl CertificationPath {
    /// Create a path from certificates ordered leaf to issuer.
    pub fn new(certificates: Vec<X509>) -> Result<Self> {
        if certificates.is_empty() {
            return Err(IdentityError::EmptyCertificationPath);
        }
        Ok(Self { certificates })
    }

    /// Create a path from a key entry's embedded chain, preserving order.
    pub fn from_chain(chain: &[X509]) -> Result<Self> {
        Self::new(chain.to_vec())
    }

    /// Read and decode a certification path file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|_| IdentityError::not_found("CertPath", path))?;
        Self::parse(&data)
    }

    /// Decode a certification path from any supported encoding.
    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::new(decode_certificates(data)?)
    }

    /// The subject certificate.
    pub fn leaf(&self) -> &X509 {
        &self.certificates[0]
    }

    /// All certificates, leaf first.
    pub fn certificates(&self) -> &[X509] {
        &self.certificates
    }

    /// Certificates above the leaf.
    pub fn issuers(&self) -> &[X509] {
        &self.certificates[1..]
    }

    /// Number of certificates in the path.
    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    /// Encode the path as concatenated PEM certificates.
    pub fn to_pem(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        for cert in &self.certificates {
            out.extend(cert.to_pem().map_err(parse_error)?);
        }
        Ok(out)
    }

    /// Summaries of every certificate, leaf first.
    pub fn summaries(&self) -> Result<Vec<CertificateSummary>> {
        self.certificates
            .iter()
            .map(|cert| CertificateSummary::from_x509(cert))
            .collect()
    }
}

impl std::fmt::Debug for CertificationPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let subjects: Vec<String> = self
            .certificates
            .iter()
            .map(|c| display_name(c.subject_name()))
            .collect();
        f.debug_struct("CertificationPath")
            .field("subjects", &subjects)
            .finish()
    }
}

/// Decode every certificate in `data`.
///
/// Empty input decodes to an empty vector; input that is not one of the
/// supported encodings fails with [`IdentityError::CertificateParse`].
pub fn decode_certificates(data: &[u8]) -> Result<Vec<X509>> {
    let trimmed = data.trim_ascii_start();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if trimmed.starts_with(PEM_MARKER) {
        if String::from_utf8_lossy(trimmed).contains(PEM_PKCS7_MARKER) {
            let pkcs7 = Pkcs7::from_pem(trimmed).map_err(parse_error)?;
            return pkcs7_certificates(&pkcs7);
        }
        return X509::stack_from_pem(trimmed).map_err(parse_error);
    }

    if let Ok(pkcs7) = Pkcs7::from_der(trimmed) {
        return pkcs7_certificates(&pkcs7);
    }

    decode_der_sequence(trimmed)
}

fn pkcs7_certificates(pkcs7: &Pkcs7) -> Result<Vec<X509>> {
    let certs = pkcs7
        .signed()
        .and_then(|signed| signed.certificates())
        .map(|stack| stack.iter().map(|cert| cert.to_owned()).collect())
        .unwrap_or_default();
    Ok(certs)
}

fn decode_der_sequence(mut rest: &[u8]) -> Result<Vec<X509>> {
    let mut certs = Vec::new();
    while !rest.is_empty() {
        let (remaining, _) = x509_parser::parse_x509_certificate(rest).map_err(|e| {
            IdentityError::CertificateParse {
                message: format!("certificate {} is not valid DER: {e}", certs.len()),
            }
        })?;
        let consumed = rest.len() - remaining.len();
        certs.push(X509::from_der(&rest[..consumed]).map_err(parse_error)?);
        rest = remaining;
    }
    Ok(certs)
}

fn parse_error(err: ErrorStack) -> IdentityError {
    IdentityError::CertificateParse {
        message: err.to_string(),
    }
}

/// Lowercase hex SHA-256 of the certificate's DER encoding.
pub fn fingerprint(cert: &X509Ref) -> std::result::Result<String, ErrorStack> {
    Ok(hex::encode(cert.digest(MessageDigest::sha256())?))
}

/// Whether the certificate's subject equals its issuer.
pub fn is_self_signed(cert: &X509Ref) -> bool {
    same_name(cert.subject_name(), cert.issuer_name())
}

pub(crate) fn same_name(a: &X509NameRef, b: &X509NameRef) -> bool {
    match (a.to_der(), b.to_der()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

pub(crate) fn common_name(cert: &X509Ref) -> Option<String> {
    cert.subject_name()
        .entries_by_nid(Nid::COMMONNAME)
        .next()
        .and_then(|entry| entry.data().to_string().ok())
}

/// Render a name as `CN=..., O=...`.
pub fn display_name(name: &X509NameRef) -> String {
    name.entries()
        .map(|entry| {
            let key = entry.object().nid().short_name().unwrap_or("?");
            let value = entry.data().to_string().unwrap_or_default();
            format!("{key}={value}")
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Human-facing description of a certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateSummary {
    pub subject: String,
    pub issuer: String,
    /// Serial number, uppercase hex.
    pub serial: String,
    /// SHA-256 fingerprint, lowercase hex.
    pub fingerprint: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub self_signed: bool,
}

impl CertificateSummary {
    /// Describe `cert`.
    pub fn from_x509(cert: &X509Ref) -> Result<Self> {
        let serial = cert
            .serial_number()
            .to_bn()
            .and_then(|bn| bn.to_hex_str().map(|s| s.to_string()))
            .map_err(parse_error)?;

        Ok(Self {
            subject: display_name(cert.subject_name()),
            issuer: display_name(cert.issuer_name()),
            serial,
            fingerprint: fingerprint(cert).map_err(parse_error)?,
            not_before: to_utc(cert.not_before())?,
            not_after: to_utc(cert.not_after())?,
            self_signed: is_self_signed(cert),
        })
    }

    /// Whether `not_after` lies in the past.
    pub fn is_expired(&self) -> bool {
        self.not_after < Utc::now()
    }
}

fn to_utc(time: &Asn1TimeRef) -> Result<DateTime<Utc>> {
    let epoch = Asn1Time::from_unix(0).map_err(parse_error)?;
    let diff = epoch.diff(time).map_err(parse_error)?;
    from_epoch_offset(i64::from(diff.days), i64::from(diff.secs))
}

fn from_epoch_offset(days: i64, secs: i64) -> Result<DateTime<Utc>> {
    days.checked_mul(86_400)
        .and_then(|d| d.checked_add(secs))
        .and_then(|total| DateTime::from_timestamp(total, 0))
        .ok_or_else(|| IdentityError::CertificateParse {
            message: format!("validity time out of range ({days} days from the epoch)"),
        })
}

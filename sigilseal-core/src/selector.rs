//! Code-signing certificate policy.
//!
//! [`CodeSigningCertSelector`] decides whether a certificate may act as the
//! target (leaf) of a code-signing path. It is applied to the leaf only;
//! intermediates and roots are governed by the chain validator.

use openssl::x509::X509Ref;
use x509_parser::certificate::X509Certificate;
use x509_parser::extensions::ParsedExtension;
use x509_parser::oid_registry::{OID_X509_EXT_EXTENDED_KEY_USAGE, OID_X509_EXT_KEY_USAGE};
use x509_parser::parse_x509_certificate;

/// A predicate over a single certificate.
pub trait CertSelector: Send + Sync {
    /// Whether `cert` is acceptable.
    fn matches(&self, cert: &X509Ref) -> bool;
}

/// Accepts certificates usable for code signing.
///
/// Both conditions must hold:
/// - key usage, when present, asserts `digitalSignature` or `nonRepudiation`;
/// - extended key usage, when present, lists `anyExtendedKeyUsage` or
///   `codeSigning`.
///
/// An absent extension places no restriction. An extension that cannot be
/// parsed rejects the certificate.
#[derive(Debug, Default, Clone, Copy)]
pub struct CodeSigningCertSelector;

impl CodeSigningCertSelector {
    /// Apply the policy to a DER-encoded certificate.
    pub fn matches_der(&self, der: &[u8]) -> bool {
        match parse_x509_certificate(der) {
            Ok((_, cert)) => permits_signature(&cert) && permits_code_signing(&cert),
            Err(e) => {
                tracing::debug!(error = %e, "Certificate rejected: not parseable");
                false
            }
        }
    }
}

impl CertSelector for CodeSigningCertSelector {
    fn matches(&self, cert: &X509Ref) -> bool {
        match cert.to_der() {
            Ok(der) => self.matches_der(&der),
            Err(_) => false,
        }
    }
}

fn permits_signature(cert: &X509Certificate<'_>) -> bool {
    cert.extensions()
        .iter()
        .filter(|ext| ext.oid == OID_X509_EXT_KEY_USAGE)
        .all(|ext| match ext.parsed_extension() {
            ParsedExtension::KeyUsage(ku) => ku.digital_signature() || ku.non_repudiation(),
            _ => false,
        })
}

fn permits_code_signing(cert: &X509Certificate<'_>) -> bool {
    cert.extensions()
        .iter()
        .filter(|ext| ext.oid == OID_X509_EXT_EXTENDED_KEY_USAGE)
        .all(|ext| match ext.parsed_extension() {
            ParsedExtension::ExtendedKeyUsage(eku) => eku.any || eku.code_signing,
            _ => false,
        })
}

//! The resolved signing identity.

use openssl::pkey::{PKey, Private};
use openssl::x509::X509;

use crate::certpath::{CertificateSummary, CertificationPath, display_name};
use crate::error::Result;

/// A signing identity: an alias name, a private key and the certification
/// path of the key's certificate.
///
/// Immutable once built.
#[derive(Clone)]
pub struct Identity {
    name: String,
    private_key: PKey<Private>,
    path: CertificationPath,
}

impl Identity {
    pub fn new(name: impl Into<String>, private_key: PKey<Private>, path: CertificationPath) -> Self {
        Self {
            name: name.into(),
            private_key,
            path,
        }
    }

    /// The alias the identity was resolved from.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn private_key(&self) -> &PKey<Private> {
        &self.private_key
    }

    /// The signing (leaf) certificate.
    pub fn certificate(&self) -> &X509 {
        self.path.leaf()
    }

    pub fn certificate_path(&self) -> &CertificationPath {
        &self.path
    }

    /// Summaries of every certificate in the path, leaf first.
    pub fn summary(&self) -> Result<Vec<CertificateSummary>> {
        self.path.summaries()
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("name", &self.name)
            .field("private_key", &"[REDACTED]")
            .field("subject", &display_name(self.certificate().subject_name()))
            .field("path_len", &self.path.len())
            .finish()
    }
}

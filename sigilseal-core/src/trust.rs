//! Trust anchor assembly.
//!
//! Anchors come from two tiers plus the credential store itself:
//!
//! 1. The trust store: an explicitly configured file, or else the platform
//!    default. An explicit file that cannot be read or decoded is fatal; a
//!    default that cannot be used is logged and contributes nothing.
//! 2. Every trusted-certificate entry and every self-signed certificate in
//!    the credential store that holds the signing key.
//!
//! Anchors are de-duplicated by SHA-256 fingerprint.

use std::path::{Path, PathBuf};

use openssl::pkcs12::Pkcs12;
use openssl::x509::X509;
use tracing::{debug, warn};

use crate::certpath::{fingerprint, is_self_signed};
use crate::error::{IdentityError, Result};
use crate::secret::Passphrase;
use crate::store::{CertificateBundle, CredentialStore, Pkcs12Store, ensure_readable};

/// A certificate trusted without further verification.
#[derive(Clone)]
pub struct TrustAnchor {
    certificate: X509,
    fingerprint: String,
}

impl TrustAnchor {
    pub fn certificate(&self) -> &X509 {
        &self.certificate
    }

    /// Lowercase hex SHA-256 fingerprint.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

impl std::fmt::Debug for TrustAnchor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustAnchor")
            .field("subject", &crate::certpath::display_name(self.certificate.subject_name()))
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

/// An insertion-ordered set of trust anchors.
#[derive(Debug, Clone, Default)]
pub struct TrustAnchorSet {
    anchors: Vec<TrustAnchor>,
}

impl TrustAnchorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `certificate` unless an anchor with the same fingerprint exists.
    ///
    /// Returns whether the certificate was added.
    pub fn insert(&mut self, certificate: X509) -> Result<bool> {
        let fingerprint = fingerprint(&certificate).map_err(|e| IdentityError::CertificateParse {
            message: e.to_string(),
        })?;
        if self.anchors.iter().any(|a| a.fingerprint == fingerprint) {
            return Ok(false);
        }
        self.anchors.push(TrustAnchor {
            certificate,
            fingerprint,
        });
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrustAnchor> {
        self.anchors.iter()
    }

    /// Whether an anchor with the same fingerprint as `certificate` exists.
    pub fn contains(&self, certificate: &X509) -> bool {
        fingerprint(certificate)
            .map(|fp| self.anchors.iter().any(|a| a.fingerprint == fp))
            .unwrap_or(false)
    }
}

/// Open a trust store file.
///
/// PEM input loads as a [`CertificateBundle`]. Binary input is tried as
/// PKCS#12 (with `passphrase`, or the empty passphrase) and then as DER
/// certificates or a PKCS#7 container.
pub fn load_trust_store(
    path: &Path,
    passphrase: Option<&Passphrase>,
) -> Result<Box<dyn CredentialStore>> {
    ensure_readable("Truststore", path)?;
    let data = std::fs::read(path)?;

    if !data.trim_ascii_start().starts_with(b"-----BEGIN") && Pkcs12::from_der(&data).is_ok() {
        debug!(path = %path.display(), "Trust store is PKCS#12");
        return Ok(Box::new(Pkcs12Store::from_der(&data, passphrase)?));
    }

    let bundle = CertificateBundle::from_bytes(&data)?;
    debug!(path = %path.display(), certificates = bundle.len(), "Trust store is a certificate bundle");
    Ok(Box::new(bundle))
}

/// Builds the anchor set used by strict validation.
#[derive(Debug, Clone, Default)]
pub struct TrustAnchorAssembler {
    explicit: Option<PathBuf>,
    default_location: Option<PathBuf>,
    passphrase: Option<Passphrase>,
}

impl TrustAnchorAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// An explicitly configured trust store. Takes precedence over the default.
    pub fn explicit(mut self, path: Option<PathBuf>) -> Self {
        self.explicit = path;
        self
    }

    /// The platform default trust store.
    pub fn default_location(mut self, path: Option<PathBuf>) -> Self {
        self.default_location = path;
        self
    }

    /// Passphrase for a PKCS#12 trust store.
    pub fn passphrase(mut self, passphrase: Option<Passphrase>) -> Self {
        self.passphrase = passphrase;
        self
    }

    /// Collect anchors from the trust store tier and from `credentials`.
    pub fn assemble(&self, credentials: &dyn CredentialStore) -> Result<TrustAnchorSet> {
        let mut anchors = TrustAnchorSet::new();

        match (&self.explicit, &self.default_location) {
            (Some(path), _) => {
                let store = load_trust_store(path, self.passphrase.as_ref())?;
                add_certificates(&mut anchors, store.as_ref(), |_, _| true);
            }
            (None, Some(path)) => match load_trust_store(path, self.passphrase.as_ref()) {
                Ok(store) => add_certificates(&mut anchors, store.as_ref(), |_, _| true),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Default trust store unusable, ignoring");
                }
            },
            (None, None) => debug!("No trust store configured"),
        }
        let from_trust_store = anchors.len();

        add_certificates(&mut anchors, credentials, |store, (alias, cert)| {
            store.is_certificate_entry(alias) || is_self_signed(cert)
        });

        debug!(
            from_trust_store,
            from_credentials = anchors.len() - from_trust_store,
            "Assembled trust anchors"
        );
        Ok(anchors)
    }
}

fn add_certificates(
    anchors: &mut TrustAnchorSet,
    store: &dyn CredentialStore,
    accept: impl Fn(&dyn CredentialStore, (&str, &X509)) -> bool,
) {
    for alias in store.aliases() {
        let cert = match store.certificate(&alias) {
            Ok(Some(cert)) => cert,
            Ok(None) => continue,
            Err(e) => {
                debug!(alias = %alias, error = %e, "Skipping alias");
                continue;
            }
        };
        if accept(store, (&alias, &cert)) {
            if let Err(e) = anchors.insert(cert) {
                debug!(alias = %alias, error = %e, "Skipping alias");
            }
        }
    }
}

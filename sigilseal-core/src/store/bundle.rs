//! Certificate bundle store (PEM or concatenated DER).

use openssl::x509::X509;

use super::{CredentialStore, EntryKind, PrivateKeyEntry, StoreError};
use crate::certpath::decode_certificates;
use crate::secret::Passphrase;

/// A read-only bundle of trusted certificates.
///
/// Every certificate is a trusted-certificate entry named `cert-N`, in file
/// order. System trust stores such as `/etc/ssl/certs/ca-certificates.crt`
/// load as bundles.
#[derive(Clone)]
pub struct CertificateBundle {
    certificates: Vec<X509>,
}

impl CertificateBundle {
    /// Store type identifier.
    pub const TYPE: &'static str = "PEM";

    /// Decode a bundle. Empty input yields an empty bundle.
    pub fn from_bytes(data: &[u8]) -> Result<Self, StoreError> {
        let certificates = decode_certificates(data).map_err(|e| StoreError::Load {
            message: format!("not a certificate bundle: {e}"),
        })?;
        Ok(Self { certificates })
    }

    /// Wrap already decoded certificates.
    pub fn from_certificates(certificates: Vec<X509>) -> Self {
        Self { certificates }
    }

    /// Number of certificates.
    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    /// Whether the bundle holds no certificates.
    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    fn index_of(alias: &str) -> Option<usize> {
        alias.strip_prefix("cert-")?.parse().ok()
    }

    fn get(&self, alias: &str) -> Option<&X509> {
        Self::index_of(alias).and_then(|i| self.certificates.get(i))
    }
}

impl std::fmt::Debug for CertificateBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateBundle")
            .field("certificates", &self.certificates.len())
            .finish()
    }
}

impl CredentialStore for CertificateBundle {
    fn store_type(&self) -> &str {
        Self::TYPE
    }

    fn aliases(&self) -> Vec<String> {
        (0..self.certificates.len()).map(|i| format!("cert-{i}")).collect()
    }

    fn entry_kind(&self, alias: &str) -> Option<EntryKind> {
        self.get(alias).map(|_| EntryKind::TrustedCertificate)
    }

    fn certificate(&self, alias: &str) -> Result<Option<X509>, StoreError> {
        Ok(self.get(alias).cloned())
    }

    fn private_key_entry(
        &self,
        alias: &str,
        _passphrase: Option<&Passphrase>,
    ) -> Result<PrivateKeyEntry, StoreError> {
        match self.get(alias) {
            Some(_) => Err(StoreError::WrongEntryType {
                alias: alias.to_string(),
                found: EntryKind::TrustedCertificate,
            }),
            None => Err(StoreError::AliasNotFound {
                alias: alias.to_string(),
            }),
        }
    }
}

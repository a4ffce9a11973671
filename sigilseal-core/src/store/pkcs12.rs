//! PKCS#12 file-backed credential store.

use openssl::error::ErrorStack;
use openssl::pkcs12::Pkcs12;
use openssl::x509::X509;

use super::{CredentialStore, EntryKind, PrivateKeyEntry, StoreError};
use crate::certpath::{common_name, is_self_signed, same_name};
use crate::secret::Passphrase;

/// A PKCS#12 credential store.
///
/// The store passphrase is checked when the file is loaded. Key entries are
/// decrypted again on lookup with the entry passphrase, so a wrong key
/// passphrase surfaces as [`StoreError::UnrecoverableKey`] rather than a load
/// failure.
///
/// Aliases are compared case-insensitively. The key entry is named by its
/// `friendlyName`; bundled certificates that are not part of the key's chain
/// become trusted-certificate entries named by their `friendlyName`, their
/// subject common name, or `cert-N`.
pub struct Pkcs12Store {
    der: Vec<u8>,
    key_alias: Option<String>,
    chain: Vec<X509>,
    certificates: Vec<(String, X509)>,
}

impl Pkcs12Store {
    /// Store type identifier.
    pub const TYPE: &'static str = "PKCS12";

    /// Open a DER-encoded PKCS#12 blob, verifying it with `passphrase`.
    ///
    /// An absent passphrase is treated as the empty password.
    pub fn from_der(data: &[u8], passphrase: Option<&Passphrase>) -> Result<Self, StoreError> {
        let pkcs12 = Pkcs12::from_der(data).map_err(load_error)?;
        let parsed = with_password(passphrase, |p| pkcs12.parse2(p))?.map_err(load_error)?;

        let mut bundled: Vec<X509> = parsed.ca.map(|ca| ca.into_iter().collect()).unwrap_or_default();

        let (key_alias, chain) = match (parsed.pkey, parsed.cert) {
            (Some(_), Some(leaf)) => {
                let alias = friendly_name(&leaf)
                    .or_else(|| common_name(&leaf).map(|cn| cn.to_lowercase()))
                    .unwrap_or_else(|| "key-0".to_string());
                let chain = link_chain(leaf, &mut bundled);
                (Some(alias), chain)
            }
            (Some(_), None) => {
                tracing::debug!("PKCS#12 key bag has no matching certificate; ignoring key");
                (None, Vec::new())
            }
            _ => (None, Vec::new()),
        };

        let mut certificates: Vec<(String, X509)> = Vec::with_capacity(bundled.len());
        for (index, cert) in bundled.into_iter().enumerate() {
            let base = friendly_name(&cert)
                .or_else(|| common_name(&cert).map(|cn| cn.to_lowercase()))
                .unwrap_or_else(|| format!("cert-{index}"));
            let alias = unique_alias(base, key_alias.as_deref(), &certificates);
            certificates.push((alias, cert));
        }

        Ok(Self {
            der: data.to_vec(),
            key_alias,
            chain,
            certificates,
        })
    }

    fn find_certificate(&self, alias: &str) -> Option<&X509> {
        self.certificates
            .iter()
            .find(|(name, _)| name == alias)
            .map(|(_, cert)| cert)
    }
}

impl std::fmt::Debug for Pkcs12Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pkcs12Store")
            .field("key_alias", &self.key_alias)
            .field("chain_len", &self.chain.len())
            .field("certificates", &self.certificates.len())
            .finish()
    }
}

impl CredentialStore for Pkcs12Store {
    fn store_type(&self) -> &str {
        Self::TYPE
    }

    fn aliases(&self) -> Vec<String> {
        self.key_alias
            .iter()
            .cloned()
            .chain(self.certificates.iter().map(|(alias, _)| alias.clone()))
            .collect()
    }

    fn entry_kind(&self, alias: &str) -> Option<EntryKind> {
        let alias = alias.to_lowercase();
        if self.key_alias.as_deref() == Some(alias.as_str()) {
            Some(EntryKind::PrivateKey)
        } else if self.find_certificate(&alias).is_some() {
            Some(EntryKind::TrustedCertificate)
        } else {
            None
        }
    }

    fn certificate(&self, alias: &str) -> Result<Option<X509>, StoreError> {
        let alias = alias.to_lowercase();
        if self.key_alias.as_deref() == Some(alias.as_str()) {
            return Ok(self.chain.first().cloned());
        }
        Ok(self.find_certificate(&alias).cloned())
    }

    fn private_key_entry(
        &self,
        alias: &str,
        passphrase: Option<&Passphrase>,
    ) -> Result<PrivateKeyEntry, StoreError> {
        let normalized = alias.to_lowercase();
        if self.key_alias.as_deref() != Some(normalized.as_str()) {
            return match self.find_certificate(&normalized) {
                Some(_) => Err(StoreError::WrongEntryType {
                    alias: alias.to_string(),
                    found: EntryKind::TrustedCertificate,
                }),
                None => Err(StoreError::AliasNotFound {
                    alias: alias.to_string(),
                }),
            };
        }

        let unrecoverable = || StoreError::UnrecoverableKey {
            alias: alias.to_string(),
        };
        let pkcs12 = Pkcs12::from_der(&self.der).map_err(load_error)?;
        let parsed = with_password(passphrase, |p| pkcs12.parse2(p))?.map_err(|_| unrecoverable())?;
        let private_key = parsed.pkey.ok_or_else(unrecoverable)?;

        PrivateKeyEntry::new(private_key, self.chain.clone())
    }
}

fn with_password<R>(passphrase: Option<&Passphrase>, f: impl FnOnce(&str) -> R) -> Result<R, StoreError> {
    match passphrase {
        Some(pass) => pass.expose(f),
        None => Ok(f("")),
    }
}

fn load_error(err: ErrorStack) -> StoreError {
    StoreError::Load {
        message: format!("keystore password was incorrect or data is not PKCS#12 ({err})"),
    }
}

fn friendly_name(cert: &X509) -> Option<String> {
    cert.alias()
        .map(|raw| String::from_utf8_lossy(raw).to_lowercase())
        .filter(|name| !name.is_empty())
}

/// Pull the issuers of `leaf` out of `bundled`, leaf first.
fn link_chain(leaf: X509, bundled: &mut Vec<X509>) -> Vec<X509> {
    let mut chain = vec![leaf];
    loop {
        let Some(current) = chain.last() else { break };
        if is_self_signed(current) {
            break;
        }
        let position = bundled
            .iter()
            .position(|candidate| same_name(candidate.subject_name(), current.issuer_name()));
        match position {
            Some(index) => chain.push(bundled.remove(index)),
            None => break,
        }
    }
    chain
}

fn unique_alias(base: String, key_alias: Option<&str>, taken: &[(String, X509)]) -> String {
    let clashes = |candidate: &str| {
        key_alias == Some(candidate) || taken.iter().any(|(alias, _)| alias == candidate)
    };
    if !clashes(&base) {
        return base;
    }
    (1..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !clashes(candidate))
        .unwrap_or(base)
}

//! In-memory credential store implementation.

use std::collections::BTreeMap;

use openssl::x509::X509;
use parking_lot::RwLock;
use zeroize::Zeroizing;

use super::{CredentialStore, EntryKind, PrivateKeyEntry, StoreError};
use crate::secret::Passphrase;

enum MemoryEntry {
    PrivateKey {
        entry: PrivateKeyEntry,
        passphrase: Option<Zeroizing<String>>,
    },
    TrustedCertificate(X509),
    SecretKey(Zeroizing<Vec<u8>>),
}

impl MemoryEntry {
    fn kind(&self) -> EntryKind {
        match self {
            Self::PrivateKey { .. } => EntryKind::PrivateKey,
            Self::TrustedCertificate(_) => EntryKind::TrustedCertificate,
            Self::SecretKey(_) => EntryKind::SecretKey,
        }
    }
}

/// In-memory credential store.
///
/// Useful for tests and as the backing store of provider-managed tokens.
/// Aliases are returned in sorted order.
///
/// # Thread Safety
///
/// This implementation uses interior mutability via `RwLock` and is
/// safe to share across threads.
pub struct MemoryStore {
    store_type: String,
    data: RwLock<BTreeMap<String, MemoryEntry>>,
}

impl MemoryStore {
    /// Create a new empty memory store with type `MEMORY`.
    pub fn new() -> Self {
        Self::with_type("MEMORY")
    }

    /// Create a new empty memory store reporting the given type.
    pub fn with_type(store_type: impl Into<String>) -> Self {
        Self {
            store_type: store_type.into(),
            data: RwLock::new(BTreeMap::new()),
        }
    }

    /// Store a private-key entry.
    ///
    /// When `passphrase` is `Some`, lookups must present the same value.
    pub fn set_private_key(&self, alias: &str, entry: PrivateKeyEntry, passphrase: Option<&str>) {
        self.data.write().insert(
            alias.to_string(),
            MemoryEntry::PrivateKey {
                entry,
                passphrase: passphrase.map(|p| Zeroizing::new(p.to_string())),
            },
        );
    }

    /// Store a trusted-certificate entry.
    pub fn set_certificate(&self, alias: &str, certificate: X509) {
        self.data
            .write()
            .insert(alias.to_string(), MemoryEntry::TrustedCertificate(certificate));
    }

    /// Store a secret-key entry.
    pub fn set_secret_key(&self, alias: &str, key: impl Into<Vec<u8>>) {
        self.data
            .write()
            .insert(alias.to_string(), MemoryEntry::SecretKey(Zeroizing::new(key.into())));
    }

    /// A copy of the secret-key bytes under `alias`, if it holds one.
    pub fn secret_key(&self, alias: &str) -> Option<Zeroizing<Vec<u8>>> {
        match self.data.read().get(alias) {
            Some(MemoryEntry::SecretKey(key)) => Some(key.clone()),
            _ => None,
        }
    }

    /// Remove an entry. Removing an unknown alias is a no-op.
    pub fn delete(&self, alias: &str) {
        self.data.write().remove(alias);
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("store_type", &self.store_type)
            .field("entries", &self.len())
            .finish()
    }
}

impl CredentialStore for MemoryStore {
    fn store_type(&self) -> &str {
        &self.store_type
    }

    fn aliases(&self) -> Vec<String> {
        self.data.read().keys().cloned().collect()
    }

    fn entry_kind(&self, alias: &str) -> Option<EntryKind> {
        self.data.read().get(alias).map(MemoryEntry::kind)
    }

    fn certificate(&self, alias: &str) -> Result<Option<X509>, StoreError> {
        let data = self.data.read();
        Ok(match data.get(alias) {
            Some(MemoryEntry::PrivateKey { entry, .. }) => Some(entry.certificate().clone()),
            Some(MemoryEntry::TrustedCertificate(cert)) => Some(cert.clone()),
            Some(MemoryEntry::SecretKey(_)) | None => None,
        })
    }

    fn private_key_entry(
        &self,
        alias: &str,
        passphrase: Option<&Passphrase>,
    ) -> Result<PrivateKeyEntry, StoreError> {
        let data = self.data.read();
        match data.get(alias) {
            None => Err(StoreError::AliasNotFound {
                alias: alias.to_string(),
            }),
            Some(MemoryEntry::PrivateKey {
                entry,
                passphrase: expected,
            }) => {
                if let Some(expected) = expected {
                    let matches = match passphrase {
                        Some(pass) => pass.expose(|p| p == expected.as_str())?,
                        None => false,
                    };
                    if !matches {
                        return Err(StoreError::UnrecoverableKey {
                            alias: alias.to_string(),
                        });
                    }
                }
                Ok(entry.clone())
            }
            Some(other) => Err(StoreError::WrongEntryType {
                alias: alias.to_string(),
                found: other.kind(),
            }),
        }
    }
}

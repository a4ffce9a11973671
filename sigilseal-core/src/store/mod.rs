//! Credential store abstraction.
//!
//! This module provides:
//! - [`CredentialStore`] - Trait for alias-addressed key and certificate containers
//! - [`PrivateKeyEntry`] - A private key together with its certificate chain
//! - [`MemoryStore`] - In-memory implementation for testing and token providers
//! - [`Pkcs12Store`] - PKCS#12 file-backed implementation
//! - [`CertificateBundle`] - PEM/DER certificate bundle, used for trust stores
//! - [`load_store`] - Opens a store from a file or a provider-managed location
//!
//! # Example
//!
//! ```rust,ignore
//! use sigilseal_core::store::{load_store, StoreLocation};
//! use sigilseal_core::{Passphrase, ProviderRegistry};
//!
//! let registry = ProviderRegistry::with_defaults();
//! let location = StoreLocation::from_path("release.p12");
//! let pass = Passphrase::new("changeit");
//!
//! let store = load_store(&registry, &location, "PKCS12", None, Some(&pass))?;
//! for alias in store.aliases() {
//!     println!("{alias}: {:?}", store.entry_kind(&alias));
//! }
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use openssl::pkey::{PKey, Private};
use openssl::x509::X509;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::error::IdentityError;
use crate::provider::ProviderRegistry;
use crate::secret::Passphrase;

mod bundle;
mod memory;
mod pkcs12;

pub use bundle::CertificateBundle;
pub use memory::MemoryStore;
pub use pkcs12::Pkcs12Store;

/// Path value that means "no backing file; the provider manages the store".
pub const PROVIDER_MANAGED: &str = "NONE";

/// Kind of entry held under an alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// A private key with its certificate chain.
    PrivateKey,
    /// A certificate trusted on its own, without a key.
    TrustedCertificate,
    /// A symmetric secret key.
    SecretKey,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrivateKey => write!(f, "private key"),
            Self::TrustedCertificate => write!(f, "trusted certificate"),
            Self::SecretKey => write!(f, "secret key"),
        }
    }
}

/// Error type for credential store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No entry exists under the alias.
    #[error("alias not found: {alias}")]
    AliasNotFound { alias: String },

    /// The entry exists but has a different kind than requested.
    #[error("alias {alias} holds a {found} entry")]
    WrongEntryType { alias: String, found: EntryKind },

    /// The entry passphrase does not unlock the key.
    #[error("cannot recover key for alias {alias}")]
    UnrecoverableKey { alias: String },

    /// The store data could not be opened.
    #[error("load failed: {message}")]
    Load { message: String },

    /// The store type or location is not supported by the provider.
    #[error("unsupported: {message}")]
    Unsupported { message: String },

    /// A certificate held by the store could not be decoded.
    #[error("certificate error: {message}")]
    Certificate { message: String },

    /// A passphrase was used after destruction.
    #[error("passphrase destroyed")]
    PassphraseDestroyed,
}

/// A private key and its certificate chain, leaf first.
#[derive(Clone)]
pub struct PrivateKeyEntry {
    private_key: PKey<Private>,
    chain: Vec<X509>,
}

impl PrivateKeyEntry {
    /// Create an entry. The chain must hold at least the leaf certificate.
    pub fn new(private_key: PKey<Private>, chain: Vec<X509>) -> Result<Self, StoreError> {
        if chain.is_empty() {
            return Err(StoreError::Certificate {
                message: "private key entry has an empty certificate chain".to_string(),
            });
        }
        Ok(Self { private_key, chain })
    }

    /// The private key handle.
    pub fn private_key(&self) -> &PKey<Private> {
        &self.private_key
    }

    /// The embedded chain, leaf first.
    pub fn chain(&self) -> &[X509] {
        &self.chain
    }

    /// The leaf certificate.
    pub fn certificate(&self) -> &X509 {
        &self.chain[0]
    }

    /// Split into key and chain.
    pub fn into_parts(self) -> (PKey<Private>, Vec<X509>) {
        (self.private_key, self.chain)
    }
}

impl fmt::Debug for PrivateKeyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKeyEntry")
            .field("private_key", &"[REDACTED]")
            .field("chain_len", &self.chain.len())
            .finish()
    }
}

/// A loaded, alias-addressed container of keys and certificates.
///
/// Implementations include:
/// - [`MemoryStore`] - In-memory storage for tests and token providers
/// - [`Pkcs12Store`] - PKCS#12 files
/// - [`CertificateBundle`] - PEM or DER certificate bundles
///
/// A value of this trait only exists once the backing data has been
/// successfully loaded.
pub trait CredentialStore: Send + Sync {
    /// The store type identifier (e.g. `PKCS12`).
    fn store_type(&self) -> &str;

    /// All aliases, in a stable order.
    fn aliases(&self) -> Vec<String>;

    /// The kind of entry held under `alias`, if any.
    fn entry_kind(&self, alias: &str) -> Option<EntryKind>;

    /// The certificate associated with `alias`.
    ///
    /// For private-key entries this is the leaf of the chain. Returns
    /// `Ok(None)` for aliases without a certificate.
    fn certificate(&self, alias: &str) -> Result<Option<X509>, StoreError>;

    /// Recover the private-key entry under `alias` using `passphrase`.
    fn private_key_entry(
        &self,
        alias: &str,
        passphrase: Option<&Passphrase>,
    ) -> Result<PrivateKeyEntry, StoreError>;

    /// Whether `alias` holds a trusted-certificate entry.
    fn is_certificate_entry(&self, alias: &str) -> bool {
        self.entry_kind(alias) == Some(EntryKind::TrustedCertificate)
    }

    /// Whether an entry exists under `alias`.
    fn contains_alias(&self, alias: &str) -> bool {
        self.entry_kind(alias).is_some()
    }
}

/// Where a credential store lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// A file on disk.
    File(PathBuf),
    /// No backing file; the provider loads the store through a passphrase callback.
    ProviderManaged,
}

impl StoreLocation {
    /// Interpret a configured path, mapping the `NONE` sentinel to
    /// [`StoreLocation::ProviderManaged`].
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if path.as_os_str() == PROVIDER_MANAGED {
            Self::ProviderManaged
        } else {
            Self::File(path.to_path_buf())
        }
    }
}

impl fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::ProviderManaged => write!(f, "{}", PROVIDER_MANAGED),
        }
    }
}

/// Callback through which a provider obtains the store passphrase.
pub type PassphraseCallback<'a> = &'a dyn Fn() -> Option<Passphrase>;

/// Open a credential store.
///
/// File locations must exist and be readable, otherwise this fails with
/// [`IdentityError::NotFound`] before any decryption is attempted. Provider
/// managed locations hand the provider a passphrase callback and no data.
///
/// When `provider` is `None` the first registered provider supporting
/// `store_type` is used.
pub fn load_store(
    registry: &ProviderRegistry,
    location: &StoreLocation,
    store_type: &str,
    provider: Option<&str>,
    passphrase: Option<&Passphrase>,
) -> Result<Box<dyn CredentialStore>, IdentityError> {
    let provider = match provider {
        Some(name) => registry
            .get(name)
            .ok_or_else(|| IdentityError::NoProviderFound {
                name: name.to_string(),
            })?,
        None => registry
            .find_for_type(store_type)
            .ok_or_else(|| IdentityError::StoreLoad {
                message: format!("{} not found: no provider supports this store type", store_type),
            })?,
    };

    let callback = || passphrase.cloned();

    let store = match location {
        StoreLocation::ProviderManaged => {
            debug!(provider = provider.name(), store_type, "Loading provider-managed store");
            provider.load(store_type, None, &callback)?
        }
        StoreLocation::File(path) => {
            ensure_readable("Keystore", path)?;
            debug!(provider = provider.name(), store_type, path = %path.display(), "Loading store file");
            let data = std::fs::read(path)?;
            provider.load(store_type, Some(data.as_slice()), &callback)?
        }
    };

    Ok(store)
}

/// Check that `path` exists and can be opened for reading.
pub(crate) fn ensure_readable(what: &'static str, path: &Path) -> Result<(), IdentityError> {
    match std::fs::File::open(path) {
        Ok(file) => match file.metadata() {
            Ok(meta) if meta.is_file() => Ok(()),
            _ => Err(IdentityError::not_found(what, path)),
        },
        Err(_) => Err(IdentityError::not_found(what, path)),
    }
}

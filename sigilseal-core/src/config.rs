//! Ambient defaults for identity resolution.

use std::path::PathBuf;

use directories::BaseDirs;

use crate::store::Pkcs12Store;

/// Environment variable naming the default trust store.
pub const TRUST_STORE_ENV: &str = "SIGILSEAL_TRUST_STORE";

/// Well-known system CA bundle locations, probed in order.
const SYSTEM_TRUST_STORES: &[&str] = &[
    "/etc/ssl/certs/ca-certificates.crt",
    "/etc/pki/tls/certs/ca-bundle.crt",
    "/etc/pki/ca-trust/extracted/pem/tls-ca-bundle.pem",
    "/etc/ssl/ca-bundle.pem",
    "/etc/ssl/cert.pem",
    "/usr/local/etc/openssl/cert.pem",
];

/// Values the builder falls back to when a setting is not configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityDefaults {
    /// Key store used when none is configured.
    pub key_store: Option<PathBuf>,
    /// Trust store used in strict mode when none is configured.
    pub trust_store: Option<PathBuf>,
    /// Store type used when none is configured.
    pub store_type: String,
}

impl Default for IdentityDefaults {
    /// Platform defaults: `~/.keystore`, the system trust store, `PKCS12`.
    fn default() -> Self {
        Self {
            key_store: BaseDirs::new().map(|dirs| dirs.home_dir().join(".keystore")),
            trust_store: platform_trust_store(),
            store_type: Pkcs12Store::TYPE.to_string(),
        }
    }
}

impl IdentityDefaults {
    /// Defaults that never touch the environment: no key store and no trust store.
    pub fn none() -> Self {
        Self {
            key_store: None,
            trust_store: None,
            store_type: Pkcs12Store::TYPE.to_string(),
        }
    }

    pub fn with_key_store(mut self, path: impl Into<PathBuf>) -> Self {
        self.key_store = Some(path.into());
        self
    }

    pub fn with_trust_store(mut self, path: impl Into<PathBuf>) -> Self {
        self.trust_store = Some(path.into());
        self
    }

    pub fn with_store_type(mut self, store_type: impl Into<String>) -> Self {
        self.store_type = store_type.into();
        self
    }
}

/// Locate the platform trust store.
///
/// Checks `$SIGILSEAL_TRUST_STORE`, then `$SSL_CERT_FILE`, then the first
/// existing well-known bundle. The environment values are returned even if
/// the file does not exist; the trust assembler decides what to do with them.
pub fn platform_trust_store() -> Option<PathBuf> {
    [TRUST_STORE_ENV, "SSL_CERT_FILE"]
        .iter()
        .filter_map(|var| std::env::var_os(var))
        .find(|value| !value.is_empty())
        .map(PathBuf::from)
        .or_else(|| {
            SYSTEM_TRUST_STORES
                .iter()
                .map(PathBuf::from)
                .find(|path| path.is_file())
        })
}

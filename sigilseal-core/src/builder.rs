//! Fluent configuration and resolution of a signing [`Identity`].
//!
//! Setters that take a location or a provider name validate it immediately
//! and return `Err` on failure, so configuration mistakes surface before any
//! decryption is attempted. [`IdentityBuilder::build`] then runs the
//! resolution pipeline:
//!
//! 1. open the credential store;
//! 2. recover the private-key entry under the alias;
//! 3. take the certification path from a file or from the entry's chain;
//! 4. in strict mode, assemble trust anchors and validate the path.
//!
//! Every passphrase handed to the builder is destroyed when `build` returns,
//! whatever the outcome.
//!
//! # Example
//!
//! ```rust,ignore
//! use sigilseal_core::{IdentityBuilder, Passphrase};
//!
//! let identity = IdentityBuilder::new()
//!     .key_store("release.p12")?
//!     .alias("release")?
//!     .store_pass(Passphrase::new("changeit"))
//!     .strict(true)
//!     .build()?;
//!
//! println!("signing as {}", identity.name());
//! ```

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::certpath::{CertificationPath, display_name};
use crate::config::IdentityDefaults;
use crate::error::{IdentityError, Result};
use crate::identity::Identity;
use crate::provider::ProviderRegistry;
use crate::secret::{Passphrase, PassphraseGuard};
use crate::selector::CodeSigningCertSelector;
use crate::store::{StoreLocation, ensure_readable, load_store};
use crate::trust::TrustAnchorAssembler;
use crate::validate::PathValidator;

/// Builder for [`Identity`].
#[derive(Debug)]
pub struct IdentityBuilder {
    alias: Option<String>,
    strict: bool,
    key_store: Option<StoreLocation>,
    trust_store: Option<PathBuf>,
    store_type: Option<String>,
    provider: Option<String>,
    certificate_path: Option<PathBuf>,
    key_pass: Option<Passphrase>,
    store_pass: Option<Passphrase>,
    trust_pass: Option<Passphrase>,
    registry: ProviderRegistry,
    defaults: IdentityDefaults,
}

impl IdentityBuilder {
    /// A builder with the built-in providers and platform defaults.
    pub fn new() -> Self {
        Self {
            alias: None,
            strict: false,
            key_store: None,
            trust_store: None,
            store_type: None,
            provider: None,
            certificate_path: None,
            key_pass: None,
            store_pass: None,
            trust_pass: None,
            registry: ProviderRegistry::with_defaults(),
            defaults: IdentityDefaults::default(),
        }
    }

    /// The alias of the private-key entry to resolve. Required.
    pub fn alias(mut self, alias: impl Into<String>) -> Result<Self> {
        let alias = alias.into();
        if alias.trim().is_empty() {
            return Err(IdentityError::InvalidConfiguration {
                message: "alias must not be blank".to_string(),
            });
        }
        self.alias = Some(alias);
        Ok(self)
    }

    /// Validate the certification path against trust anchors.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// The credential store location, or `NONE` for a provider-managed store.
    pub fn key_store(mut self, path: impl AsRef<Path>) -> Result<Self> {
        let location = StoreLocation::from_path(path);
        if let StoreLocation::File(file) = &location {
            ensure_readable("Keystore", file)?;
        }
        self.key_store = Some(location);
        Ok(self)
    }

    /// A trust store to use instead of the platform default.
    pub fn trust_store(mut self, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        ensure_readable("Truststore", path)?;
        self.trust_store = Some(path.to_path_buf());
        Ok(self)
    }

    pub fn store_type(mut self, store_type: impl Into<String>) -> Self {
        self.store_type = Some(store_type.into());
        self
    }

    /// Set the store type and the provider that must open it.
    ///
    /// The provider is looked up in the registry configured so far, so call
    /// [`registry`](Self::registry) first when using a custom one.
    pub fn store_type_with_provider(
        mut self,
        store_type: impl Into<String>,
        provider: impl Into<String>,
    ) -> Result<Self> {
        let provider = provider.into();
        if !self.registry.contains(&provider) {
            return Err(IdentityError::NoProviderFound { name: provider });
        }
        self.store_type = Some(store_type.into());
        self.provider = Some(provider);
        Ok(self)
    }

    /// A file holding the certification path, overriding the entry's chain.
    pub fn certificate_path(mut self, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        ensure_readable("CertPath", path)?;
        self.certificate_path = Some(path.to_path_buf());
        Ok(self)
    }

    /// Passphrase of the key entry. Defaults to the store passphrase.
    pub fn key_pass(mut self, passphrase: Passphrase) -> Self {
        self.key_pass = Some(passphrase);
        self
    }

    pub fn store_pass(mut self, passphrase: Passphrase) -> Self {
        self.store_pass = Some(passphrase);
        self
    }

    /// Passphrase of a PKCS#12 trust store.
    pub fn trust_store_pass(mut self, passphrase: Passphrase) -> Self {
        self.trust_pass = Some(passphrase);
        self
    }

    pub fn registry(mut self, registry: ProviderRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn defaults(mut self, defaults: IdentityDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Resolve the identity.
    ///
    /// Consumes the builder. All passphrases are destroyed before this
    /// returns, on success and on failure.
    pub fn build(self) -> Result<Identity> {
        let _wipe = PassphraseGuard::new(
            [&self.store_pass, &self.key_pass, &self.trust_pass]
                .into_iter()
                .flatten()
                .cloned(),
        );
        self.resolve()
    }

    fn resolve(&self) -> Result<Identity> {
        let alias = self.alias.as_deref().ok_or_else(|| IdentityError::InvalidConfiguration {
            message: "alias is required".to_string(),
        })?;
        let location = match (&self.key_store, &self.defaults.key_store) {
            (Some(location), _) => location.clone(),
            (None, Some(path)) => StoreLocation::File(path.clone()),
            (None, None) => {
                return Err(IdentityError::InvalidConfiguration {
                    message: "no key store configured".to_string(),
                });
            }
        };
        let store_type = self.store_type.as_deref().unwrap_or(&self.defaults.store_type);

        let store = load_store(
            &self.registry,
            &location,
            store_type,
            self.provider.as_deref(),
            self.store_pass.as_ref(),
        )?;
        debug!(%location, store_type = store.store_type(), "Credential store loaded");

        let entry = store.private_key_entry(alias, self.key_pass.as_ref().or(self.store_pass.as_ref()))?;
        debug!(alias, chain_len = entry.chain().len(), "Private key entry recovered");

        let path = match &self.certificate_path {
            Some(file) => CertificationPath::from_file(file)?,
            None => CertificationPath::from_chain(entry.chain())?,
        };
        debug!(path_len = path.len(), external = self.certificate_path.is_some(), "Certification path resolved");

        if self.strict {
            let anchors = TrustAnchorAssembler::new()
                .explicit(self.trust_store.clone())
                .default_location(self.defaults.trust_store.clone())
                .passphrase(self.trust_pass.clone())
                .assemble(store.as_ref())?;
            PathValidator::new(&anchors, &CodeSigningCertSelector).validate(&path)?;
        }

        let (private_key, _) = entry.into_parts();
        let identity = Identity::new(alias, private_key, path);
        info!(
            alias,
            subject = %display_name(identity.certificate().subject_name()),
            strict = self.strict,
            "Resolved signing identity"
        );
        Ok(identity)
    }
}

impl Default for IdentityBuilder {
    fn default() -> Self {
        Self::new()
    }
}

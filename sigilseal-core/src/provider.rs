//! Credential store providers and registry.
//!
//! This module provides:
//! - [`StoreProvider`] - A named factory that opens one or more store types
//! - [`BuiltinProvider`] - File-backed `PKCS12` and `PEM` stores
//! - [`ProviderRegistry`] - Registry of available providers
//!
//! Providers that manage their own storage (hardware tokens, OS key stores)
//! receive no data and obtain the store passphrase through the callback.
//!
//! # Example
//!
//! ```
//! use sigilseal_core::provider::ProviderRegistry;
//!
//! let registry = ProviderRegistry::with_defaults();
//! let builtin = registry.get("builtin").unwrap();
//! assert!(builtin.supports("pkcs12"));
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::store::{
    CertificateBundle, CredentialStore, PassphraseCallback, Pkcs12Store, StoreError,
};

/// A named factory for credential stores.
pub trait StoreProvider: Send + Sync {
    /// Unique provider name used for lookups.
    fn name(&self) -> &str;

    /// Store types this provider can open, uppercase.
    fn store_types(&self) -> Vec<String>;

    /// Open a store.
    ///
    /// `data` is `None` for provider-managed locations.
    fn load(
        &self,
        store_type: &str,
        data: Option<&[u8]>,
        passphrase: PassphraseCallback<'_>,
    ) -> Result<Box<dyn CredentialStore>, StoreError>;

    /// Whether `store_type` is supported, ignoring case.
    fn supports(&self, store_type: &str) -> bool {
        self.store_types()
            .iter()
            .any(|t| t.eq_ignore_ascii_case(store_type))
    }
}

/// Provider for the file formats Sigilseal reads natively.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinProvider;

impl BuiltinProvider {
    /// Registry name.
    pub const NAME: &'static str = "builtin";
}

impl StoreProvider for BuiltinProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn store_types(&self) -> Vec<String> {
        vec![Pkcs12Store::TYPE.to_string(), CertificateBundle::TYPE.to_string()]
    }

    fn load(
        &self,
        store_type: &str,
        data: Option<&[u8]>,
        passphrase: PassphraseCallback<'_>,
    ) -> Result<Box<dyn CredentialStore>, StoreError> {
        let Some(data) = data else {
            return Err(StoreError::Unsupported {
                message: format!("{store_type} stores require a backing file"),
            });
        };

        if store_type.eq_ignore_ascii_case(Pkcs12Store::TYPE) {
            let pass = passphrase();
            Ok(Box::new(Pkcs12Store::from_der(data, pass.as_ref())?))
        } else if store_type.eq_ignore_ascii_case(CertificateBundle::TYPE) {
            Ok(Box::new(CertificateBundle::from_bytes(data)?))
        } else {
            Err(StoreError::Unsupported {
                message: format!("{store_type} not found"),
            })
        }
    }
}

/// Registry of store providers.
///
/// Lookups by name are case-insensitive. When no provider is named, the
/// first registered provider supporting the store type wins.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn StoreProvider>>,
    order: Vec<String>,
}

impl ProviderRegistry {
    /// Create a new empty provider registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with [`BuiltinProvider`] registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(BuiltinProvider);
        registry
    }

    /// Register a provider.
    ///
    /// If a provider with the same name already exists, it will be replaced
    /// and keep its original precedence.
    pub fn register(&mut self, provider: impl StoreProvider + 'static) {
        let key = provider.name().to_lowercase();
        if !self.providers.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.providers.insert(key, Arc::new(provider));
    }

    /// Look up a provider by name.
    pub fn get(&self, name: &str) -> Option<&dyn StoreProvider> {
        self.providers.get(&name.to_lowercase()).map(|p| p.as_ref())
    }

    /// Whether a provider with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// First registered provider supporting `store_type`.
    pub fn find_for_type(&self, store_type: &str) -> Option<&dyn StoreProvider> {
        self.order
            .iter()
            .filter_map(|name| self.providers.get(name))
            .find(|p| p.supports(store_type))
            .map(|p| p.as_ref())
    }

    /// Registered provider names, in registration order.
    pub fn names(&self) -> &[String] {
        &self.order
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.order)
            .finish()
    }
}

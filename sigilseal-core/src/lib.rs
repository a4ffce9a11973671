//! # Sigilseal Core
//!
//! Core library for resolving code-signing identities.
//!
//! This crate provides:
//! - Credential stores (PKCS#12 files, certificate bundles, provider-managed tokens)
//! - Certification path decoding and trust anchor assembly
//! - Strict path validation under a code-signing certificate policy
//! - [`IdentityBuilder`], which ties the pipeline together and wipes passphrases
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sigilseal_core::{IdentityBuilder, Passphrase};
//!
//! fn signing_identity() -> Result<sigilseal_core::Identity, sigilseal_core::IdentityError> {
//!     IdentityBuilder::new()
//!         .key_store("release.p12")?
//!         .alias("release")?
//!         .store_pass(Passphrase::new("changeit"))
//!         .strict(true)
//!         .build()
//! }
//! ```

pub mod builder;
pub mod certpath;
pub mod config;
pub mod error;
pub mod identity;
pub mod provider;
pub mod secret;
pub mod selector;
pub mod store;
pub mod trust;
pub mod validate;

#[cfg(test)]
mod test_support;

// Re-export commonly used types at crate root
pub use builder::IdentityBuilder;

pub use certpath::{
    CertificateSummary,
    CertificationPath,
};

pub use config::IdentityDefaults;

pub use error::{
    IdentityError,
    Result,
};

pub use identity::Identity;

pub use provider::{
    BuiltinProvider,
    ProviderRegistry,
    StoreProvider,
};

pub use secret::{
    Passphrase,
    PassphraseGuard,
};

pub use selector::{
    CertSelector,
    CodeSigningCertSelector,
};

pub use store::{
    CredentialStore,
    EntryKind,
    MemoryStore,
    PrivateKeyEntry,
    StoreError,
    StoreLocation,
    load_store,
};

pub use trust::{
    TrustAnchor,
    TrustAnchorAssembler,
    TrustAnchorSet,
    load_trust_store,
};

pub use validate::PathValidator;

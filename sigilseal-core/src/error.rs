//! Top-level error types for Sigilseal.

use std::path::PathBuf;

use thiserror::Error;

use crate::store::{EntryKind, StoreError};

/// Error type for identity resolution.
///
/// Setter validation errors (`NotFound`, `NoProviderFound`,
/// `InvalidConfiguration`) are raised while the builder is being configured;
/// every other variant comes out of [`IdentityBuilder::build`](crate::IdentityBuilder::build).
#[derive(Debug, Error)]
pub enum IdentityError {
    /// A configured file is missing or unreadable.
    #[error("{what} {} not found or is unreadable", path.display())]
    NotFound { what: &'static str, path: PathBuf },

    /// The named store provider is not registered.
    #[error("no provider {name} found")]
    NoProviderFound { name: String },

    /// The builder configuration is structurally invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// The credential store could not be opened (wrong passphrase, corrupt
    /// data, unsupported type).
    #[error("failed to load credential store: {message}")]
    StoreLoad { message: String },

    /// No entry exists under the alias.
    #[error("alias {alias} not found in credential store")]
    AliasNotFound { alias: String },

    /// The alias exists but is not a private-key entry.
    #[error("alias {alias} entry is not a private key entry (found {found})")]
    WrongEntryType { alias: String, found: EntryKind },

    /// The private key could not be recovered with the supplied passphrase.
    #[error("cannot recover private key for alias {alias}")]
    UnrecoverableKey { alias: String },

    /// A certificate or certification path could not be decoded.
    #[error("certificate parse error: {message}")]
    CertificateParse { message: String },

    /// The resolved certification path holds no certificates.
    #[error("no signing certificate found")]
    EmptyCertificationPath,

    /// Strict validation rejected the certification path.
    #[error("certification path validation failed: {reason}")]
    PathValidationFailed { reason: String },

    /// A passphrase was used after it had been destroyed.
    #[error("passphrase has already been destroyed")]
    PassphraseDestroyed,

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IdentityError {
    /// Whether the error was raised by configuration-time validation.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::NoProviderFound { .. } | Self::InvalidConfiguration { .. }
        )
    }

    pub(crate) fn not_found(what: &'static str, path: impl Into<PathBuf>) -> Self {
        Self::NotFound {
            what,
            path: path.into(),
        }
    }
}

impl From<StoreError> for IdentityError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AliasNotFound { alias } => Self::AliasNotFound { alias },
            StoreError::WrongEntryType { alias, found } => Self::WrongEntryType { alias, found },
            StoreError::UnrecoverableKey { alias } => Self::UnrecoverableKey { alias },
            StoreError::PassphraseDestroyed => Self::PassphraseDestroyed,
            StoreError::Certificate { message } => Self::CertificateParse { message },
            StoreError::Load { message } | StoreError::Unsupported { message } => {
                Self::StoreLoad { message }
            }
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, IdentityError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_mapping() {
        let err: IdentityError = StoreError::WrongEntryType {
            alias: "ca".to_string(),
            found: EntryKind::TrustedCertificate,
        }
        .into();
        assert!(matches!(err, IdentityError::WrongEntryType { .. }));

        let err: IdentityError = StoreError::Load {
            message: "mac verify failure".to_string(),
        }
        .into();
        assert!(matches!(err, IdentityError::StoreLoad { .. }));
    }

    #[test]
    fn test_configuration_errors() {
        assert!(IdentityError::not_found("Keystore", "/nope").is_configuration_error());
        assert!(!IdentityError::EmptyCertificationPath.is_configuration_error());
    }

    #[test]
    fn test_not_found_message() {
        let err = IdentityError::not_found("Truststore", "/tmp/missing.p12");
        assert_eq!(
            err.to_string(),
            "Truststore /tmp/missing.p12 not found or is unreadable"
        );
    }
}

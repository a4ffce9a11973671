//! Passphrase protection.
//!
//! This module provides:
//! - [`Passphrase`] - A shared handle to password material that can be destroyed
//! - [`PassphraseGuard`] - Destroys a set of passphrases when dropped
//!
//! A [`Passphrase`] is cheap to clone; every clone refers to the same
//! material, so destroying one clone makes all of them unusable. The
//! [`IdentityBuilder`](crate::IdentityBuilder) relies on this: it destroys the
//! passphrases it was given when `build()` returns, and the caller can observe
//! that through its own clone.
//!
//! # Example
//!
//! ```
//! use sigilseal_core::Passphrase;
//!
//! let pass = Passphrase::new("changeit");
//! let shared = pass.clone();
//!
//! assert_eq!(pass.expose(|p| p.len()).unwrap(), 8);
//! shared.destroy();
//! assert!(pass.is_destroyed());
//! ```

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use zeroize::Zeroizing;

use crate::store::StoreError;

/// Password material guarding a store or key entry.
///
/// Debug and Display implementations show `[REDACTED]` instead of the value.
#[derive(Clone)]
pub struct Passphrase {
    inner: Arc<Mutex<Option<Zeroizing<String>>>>,
}

impl Passphrase {
    /// Create a new passphrase from a string value.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(Zeroizing::new(value.into())))),
        }
    }

    /// Run `f` with the passphrase exposed.
    ///
    /// Fails once the passphrase has been destroyed. Never log the value.
    pub fn expose<R>(&self, f: impl FnOnce(&str) -> R) -> Result<R, StoreError> {
        let guard = self.inner.lock();
        match guard.as_ref() {
            Some(value) => Ok(f(value.as_str())),
            None => Err(StoreError::PassphraseDestroyed),
        }
    }

    /// Zero the passphrase. Calling this more than once is harmless.
    pub fn destroy(&self) {
        // Dropping the Zeroizing wrapper wipes the buffer.
        self.inner.lock().take();
    }

    /// Whether [`destroy`](Self::destroy) has been called on any clone.
    pub fn is_destroyed(&self) -> bool {
        self.inner.lock().is_none()
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_destroyed() {
            write!(f, "Passphrase([DESTROYED])")
        } else {
            write!(f, "Passphrase([REDACTED])")
        }
    }
}

impl fmt::Display for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl From<&str> for Passphrase {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Passphrase {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Destroys every held passphrase when dropped.
///
/// Runs on normal return, early `?` return and unwinding alike.
pub struct PassphraseGuard {
    held: Vec<Passphrase>,
}

impl PassphraseGuard {
    /// Guard the given passphrases.
    pub fn new(passphrases: impl IntoIterator<Item = Passphrase>) -> Self {
        Self {
            held: passphrases.into_iter().collect(),
        }
    }
}

impl Drop for PassphraseGuard {
    fn drop(&mut self) {
        for pass in &self.held {
            pass.destroy();
        }
        tracing::trace!(count = self.held.len(), "Destroyed passphrase material");
    }
}

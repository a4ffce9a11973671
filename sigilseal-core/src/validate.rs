//! Strict certification path validation.

use openssl::error::ErrorStack;
use openssl::stack::Stack;
use openssl::x509::store::{X509Store, X509StoreBuilder};
use openssl::x509::verify::X509VerifyFlags;
use openssl::x509::{X509, X509StoreContext};
use tracing::debug;

use crate::certpath::{CertificationPath, display_name};
use crate::error::{IdentityError, Result};
use crate::selector::CertSelector;
use crate::trust::TrustAnchorSet;

/// Validates a certification path against a set of trust anchors.
///
/// Any anchor terminates the path, whether or not it is self-signed.
/// Signature chaining, validity periods and basic constraints are enforced
/// by the OpenSSL verifier. The supplied path must then follow the verified
/// chain in order: every certificate up to the anchor, with nothing after
/// it. The selector is applied to the leaf last. Revocation is not checked.
pub struct PathValidator<'a> {
    anchors: &'a TrustAnchorSet,
    selector: &'a dyn CertSelector,
}

impl<'a> PathValidator<'a> {
    pub fn new(anchors: &'a TrustAnchorSet, selector: &'a dyn CertSelector) -> Self {
        Self { anchors, selector }
    }

    pub fn validate(&self, path: &CertificationPath) -> Result<()> {
        if self.anchors.is_empty() {
            return Err(failed("no trust anchors available"));
        }
        debug!(
            anchors = self.anchors.len(),
            path_len = path.len(),
            "Validating certification path (revocation checking disabled)"
        );

        let store = self.trusted_store().map_err(verifier_error)?;
        let mut untrusted = Stack::<X509>::new().map_err(verifier_error)?;
        for cert in path.issuers() {
            untrusted.push(cert.clone()).map_err(verifier_error)?;
        }

        let mut context = X509StoreContext::new().map_err(verifier_error)?;
        let (verified, error, depth, chain) = context
            .init(&store, path.leaf(), &untrusted, |ctx| {
                let verified = ctx.verify_cert()?;
                let mut chain = Vec::new();
                if let Some(built) = ctx.chain().filter(|_| verified) {
                    for cert in built.iter() {
                        chain.push(cert.to_der()?);
                    }
                }
                Ok((verified, ctx.error(), ctx.error_depth(), chain))
            })
            .map_err(verifier_error)?;

        if !verified {
            return Err(failed(format!(
                "{} (at depth {depth})",
                error.error_string()
            )));
        }
        follows_chain(path, &chain)?;

        if !self.selector.matches(path.leaf()) {
            return Err(failed(format!(
                "certificate {} is not permitted for code signing",
                display_name(path.leaf().subject_name())
            )));
        }

        debug!("Certification path validated");
        Ok(())
    }

    fn trusted_store(&self) -> std::result::Result<X509Store, ErrorStack> {
        let mut builder = X509StoreBuilder::new()?;
        for anchor in self.anchors.iter() {
            builder.add_cert(anchor.certificate().clone())?;
        }
        builder.set_flags(X509VerifyFlags::PARTIAL_CHAIN)?;
        Ok(builder.build())
    }
}

/// The verifier builds its own chain from the untrusted pool, so the supplied
/// path must be a prefix of that chain.
fn follows_chain(path: &CertificationPath, chain: &[Vec<u8>]) -> Result<()> {
    for (depth, (cert, verified)) in path.certificates().iter().zip(chain).enumerate() {
        if cert.to_der().map_err(verifier_error)? != *verified {
            return Err(failed(format!(
                "certification path does not chain in order (at depth {depth})"
            )));
        }
    }
    if path.len() > chain.len() {
        return Err(failed(
            "certification path does not chain in order (extends past the anchor)",
        ));
    }
    Ok(())
}

fn failed(reason: impl Into<String>) -> IdentityError {
    IdentityError::PathValidationFailed {
        reason: reason.into(),
    }
}

fn verifier_error(err: ErrorStack) -> IdentityError {
    failed(err.to_string())
}

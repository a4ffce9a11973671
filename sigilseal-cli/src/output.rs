//! Rendering of command results.

use anyhow::Result;
use chrono::Utc;
use clap::ValueEnum;
use serde::Serialize;
use sigilseal_core::CertificateSummary;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Format {
    #[default]
    Text,
    Json,
}

/// A resolved identity as printed by `resolve`.
#[derive(Debug, Serialize)]
pub struct IdentityReport {
    pub alias: String,
    pub strict: bool,
    pub certificates: Vec<CertificateSummary>,
}

/// One trust anchor as printed by `anchors`.
#[derive(Debug, Serialize)]
pub struct AnchorReport {
    pub subject: String,
    pub fingerprint: String,
}

/// The outcome of `check-cert`.
#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub certificate: CertificateSummary,
    pub code_signing: bool,
}

pub fn identity(report: &IdentityReport, format: Format) -> Result<String> {
    if format == Format::Json {
        return Ok(serde_json::to_string_pretty(report)?);
    }

    let mut out = format!(
        "Identity: {}\n  Validated: {}\n  Certification path:\n",
        report.alias,
        if report.strict { "yes" } else { "no (non-strict)" }
    );
    for (depth, cert) in report.certificates.iter().enumerate() {
        out.push_str(&format!("    [{depth}] {}\n", certificate_line(cert)));
    }
    Ok(out)
}

pub fn anchors(report: &[AnchorReport], format: Format) -> Result<String> {
    if format == Format::Json {
        return Ok(serde_json::to_string_pretty(report)?);
    }

    if report.is_empty() {
        return Ok("No trust anchors available\n".to_string());
    }
    let mut out = format!("Trust anchors ({}):\n", report.len());
    for anchor in report {
        out.push_str(&format!("  {}  {}\n", anchor.fingerprint, anchor.subject));
    }
    Ok(out)
}

pub fn check(report: &CheckReport, format: Format) -> Result<String> {
    if format == Format::Json {
        return Ok(serde_json::to_string_pretty(report)?);
    }

    let verdict = if report.code_signing {
        "permitted for code signing"
    } else {
        "NOT permitted for code signing"
    };
    Ok(format!("{}\n  {verdict}\n", certificate_line(&report.certificate)))
}

fn certificate_line(cert: &CertificateSummary) -> String {
    let validity = if cert.is_expired() {
        format!("expired {}", cert.not_after.format("%Y-%m-%d"))
    } else {
        let days = (cert.not_after - Utc::now()).num_days();
        format!("valid until {} ({days} days)", cert.not_after.format("%Y-%m-%d"))
    };
    format!("{} (issuer: {}; {validity})", cert.subject, cert.issuer)
}

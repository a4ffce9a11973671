//! Sigilseal CLI
//!
//! Command-line interface for resolving and checking code-signing identities.
//!
//! # Usage
//!
//! ```bash
//! # Resolve an identity from a PKCS#12 key store and validate its chain
//! sigilseal resolve --keystore release.p12 --alias release --storepass-env RELEASE_PASS --strict
//!
//! # List the trust anchors strict validation would use
//! sigilseal anchors --keystore release.p12 --storepass-file ~/.release-pass
//!
//! # Check whether a certificate may sign code
//! sigilseal check-cert signer.pem
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use sigilseal_core::certpath::display_name;
use sigilseal_core::{
    CertSelector, CertificateSummary, CertificationPath, CodeSigningCertSelector, IdentityBuilder,
    IdentityDefaults, PassphraseGuard, ProviderRegistry, StoreLocation, TrustAnchorAssembler,
    load_store,
};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt};

mod config;
mod output;
mod passphrase;

use config::CliConfig;
use output::{AnchorReport, CheckReport, Format, IdentityReport};
use passphrase::{KeyPassArgs, StorePassArgs};

#[derive(Parser)]
#[command(name = "sigilseal")]
#[command(about = "Resolve and validate code-signing identities")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = Format::Text)]
    format: Format,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a signing identity from a key store
    Resolve(ResolveArgs),

    /// List the trust anchors strict validation would use
    Anchors(StoreArgs),

    /// Check whether a certificate is permitted for code signing
    CheckCert {
        /// Certificate or certification path file (PEM, DER or PKCS#7)
        path: PathBuf,
    },
}

/// Options selecting and opening a key store.
#[derive(Args)]
struct StoreArgs {
    /// Key store path, or NONE for a provider-managed store
    #[arg(long, value_name = "PATH|NONE")]
    keystore: Option<PathBuf>,

    /// Key store type (e.g. PKCS12)
    #[arg(long, value_name = "TYPE")]
    storetype: Option<String>,

    /// Provider that must open the key store
    #[arg(long, value_name = "NAME")]
    provider: Option<String>,

    /// Trust store used instead of the platform default
    #[arg(long, value_name = "PATH")]
    truststore: Option<PathBuf>,

    #[command(flatten)]
    storepass: StorePassArgs,
}

#[derive(Args)]
struct ResolveArgs {
    #[command(flatten)]
    store: StoreArgs,

    /// Alias of the private key entry
    #[arg(long)]
    alias: String,

    /// Certification path file overriding the key entry's chain
    #[arg(long, value_name = "PATH")]
    certchain: Option<PathBuf>,

    /// Validate the certification path against trust anchors
    #[arg(long, overrides_with = "no_strict")]
    strict: bool,

    /// Skip validation even when the config file enables it
    #[arg(long, overrides_with = "strict")]
    no_strict: bool,

    #[command(flatten)]
    keypass: KeyPassArgs,

    /// Write the resolved certification path as PEM
    #[arg(long, value_name = "PATH")]
    export_chain: Option<PathBuf>,
}

impl ResolveArgs {
    /// Flags win over the config file; the last of `--strict`/`--no-strict` wins.
    fn strict(&self, config: &CliConfig) -> bool {
        if self.no_strict {
            return false;
        }
        self.strict || config.strict
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load_config()?;

    init_logging(cli.verbose, &config);
    if let Some(path) = &config.config_path {
        debug!("Loaded configuration from {:?}", path);
    }

    let rendered = match cli.command {
        Commands::Resolve(args) => resolve(args, &config, cli.format)?,
        Commands::Anchors(args) => list_anchors(args, &config, cli.format)?,
        Commands::CheckCert { path } => check_cert(&path, cli.format)?,
    };
    print!("{rendered}");
    Ok(())
}

fn init_logging(verbose: bool, config: &CliConfig) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_level()))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Store settings after applying config file defaults.
struct StoreSettings {
    keystore: Option<PathBuf>,
    storetype: Option<String>,
    provider: Option<String>,
    truststore: Option<PathBuf>,
}

impl StoreSettings {
    fn merge(args: &StoreArgs, config: &CliConfig) -> Self {
        Self {
            keystore: args.keystore.clone().or_else(|| config.keystore.clone()),
            storetype: args.storetype.clone().or_else(|| config.storetype.clone()),
            provider: args.provider.clone().or_else(|| config.provider.clone()),
            truststore: args.truststore.clone().or_else(|| config.truststore.clone()),
        }
    }
}

fn resolve(args: ResolveArgs, config: &CliConfig, format: Format) -> Result<String> {
    let settings = StoreSettings::merge(&args.store, config);
    let strict = args.strict(config);

    let mut builder = IdentityBuilder::new().strict(strict).alias(&args.alias)?;
    if let Some(keystore) = &settings.keystore {
        builder = builder.key_store(keystore)?;
    }
    if let Some(truststore) = &settings.truststore {
        builder = builder.trust_store(truststore)?;
    }
    if let Some(certchain) = &args.certchain {
        builder = builder.certificate_path(certchain)?;
    }
    builder = match (&settings.storetype, &settings.provider) {
        (Some(store_type), Some(provider)) => builder.store_type_with_provider(store_type, provider)?,
        (None, Some(provider)) => {
            let store_type = IdentityDefaults::default().store_type;
            builder.store_type_with_provider(store_type, provider)?
        }
        (Some(store_type), None) => builder.store_type(store_type),
        (None, None) => builder,
    };
    if let Some(pass) = args.store.storepass.resolve()? {
        builder = builder.store_pass(pass);
    }
    if let Some(pass) = args.keypass.resolve()? {
        builder = builder.key_pass(pass);
    }

    let identity = builder
        .build()
        .with_context(|| format!("Failed to resolve identity {}", args.alias))?;

    if let Some(path) = &args.export_chain {
        let pem = identity.certificate_path().to_pem()?;
        std::fs::write(path, pem)
            .with_context(|| format!("Failed to write certification path to {:?}", path))?;
        info!("Certification path written to {:?}", path);
    }

    let report = IdentityReport {
        alias: identity.name().to_string(),
        strict,
        certificates: identity.summary()?,
    };
    output::identity(&report, format)
}

fn list_anchors(args: StoreArgs, config: &CliConfig, format: Format) -> Result<String> {
    let settings = StoreSettings::merge(&args, config);
    let defaults = IdentityDefaults::default();

    let storepass = args.storepass.resolve()?;
    let _wipe = PassphraseGuard::new(storepass.clone());

    let keystore = settings
        .keystore
        .or(defaults.key_store)
        .context("No key store given; use --keystore or set keystore in the config file")?;
    let location = StoreLocation::from_path(&keystore);
    let store_type = settings.storetype.unwrap_or(defaults.store_type);

    let store = load_store(
        &ProviderRegistry::with_defaults(),
        &location,
        &store_type,
        settings.provider.as_deref(),
        storepass.as_ref(),
    )
    .with_context(|| format!("Failed to open key store {location}"))?;

    let anchors = TrustAnchorAssembler::new()
        .explicit(settings.truststore)
        .default_location(defaults.trust_store)
        .assemble(store.as_ref())?;

    let report: Vec<AnchorReport> = anchors
        .iter()
        .map(|anchor| AnchorReport {
            subject: display_name(anchor.certificate().subject_name()),
            fingerprint: anchor.fingerprint().to_string(),
        })
        .collect();
    output::anchors(&report, format)
}

fn check_cert(path: &Path, format: Format) -> Result<String> {
    let chain = CertificationPath::from_file(path)
        .with_context(|| format!("Failed to read certificate from {:?}", path))?;
    let leaf = chain.leaf();

    let report = CheckReport {
        certificate: CertificateSummary::from_x509(leaf)?,
        code_signing: CodeSigningCertSelector.matches(leaf),
    };
    let rendered = output::check(&report, format)?;

    if !report.code_signing {
        print!("{rendered}");
        bail!("{} is not permitted for code signing", report.certificate.subject);
    }
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve_args(flags: &[&str]) -> ResolveArgs {
        let argv = ["sigilseal", "resolve", "--alias", "release"]
            .into_iter()
            .chain(flags.iter().copied());
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Resolve(args) => args,
            _ => panic!("expected resolve"),
        }
    }

    fn strict_config() -> CliConfig {
        CliConfig {
            strict: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_strict_defaults_to_config() {
        assert!(!resolve_args(&[]).strict(&CliConfig::default()));
        assert!(resolve_args(&[]).strict(&strict_config()));
        assert!(resolve_args(&["--strict"]).strict(&CliConfig::default()));
    }

    #[test]
    fn test_no_strict_overrides_config() {
        assert!(!resolve_args(&["--no-strict"]).strict(&strict_config()));
    }

    #[test]
    fn test_last_strict_flag_wins() {
        assert!(!resolve_args(&["--strict", "--no-strict"]).strict(&strict_config()));
        assert!(resolve_args(&["--no-strict", "--strict"]).strict(&CliConfig::default()));
    }
}

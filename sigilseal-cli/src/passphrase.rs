//! Passphrase sources for command-line use.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use sigilseal_core::Passphrase;

/// Where the key store passphrase comes from.
#[derive(Debug, Default, Args)]
pub struct StorePassArgs {
    /// Key store passphrase (visible in the process list; prefer the alternatives)
    #[arg(long, value_name = "PASS")]
    pub storepass: Option<String>,

    /// Read the key store passphrase from an environment variable
    #[arg(long, value_name = "VAR")]
    pub storepass_env: Option<String>,

    /// Read the key store passphrase from the first line of a file
    #[arg(long, value_name = "PATH")]
    pub storepass_file: Option<PathBuf>,
}

/// Where the key entry passphrase comes from.
#[derive(Debug, Default, Args)]
pub struct KeyPassArgs {
    /// Key entry passphrase; defaults to the key store passphrase
    #[arg(long, value_name = "PASS")]
    pub keypass: Option<String>,

    /// Read the key entry passphrase from an environment variable
    #[arg(long, value_name = "VAR")]
    pub keypass_env: Option<String>,

    /// Read the key entry passphrase from the first line of a file
    #[arg(long, value_name = "PATH")]
    pub keypass_file: Option<PathBuf>,
}

impl StorePassArgs {
    pub fn resolve(self) -> Result<Option<Passphrase>> {
        resolve("storepass", self.storepass, self.storepass_env, self.storepass_file)
    }
}

impl KeyPassArgs {
    pub fn resolve(self) -> Result<Option<Passphrase>> {
        resolve("keypass", self.keypass, self.keypass_env, self.keypass_file)
    }
}

fn resolve(
    flag: &str,
    value: Option<String>,
    env: Option<String>,
    file: Option<PathBuf>,
) -> Result<Option<Passphrase>> {
    match (value, env, file) {
        (None, None, None) => Ok(None),
        (Some(value), None, None) => Ok(Some(Passphrase::new(value))),
        (None, Some(var), None) => {
            let value = std::env::var(&var)
                .with_context(|| format!("--{flag}-env: environment variable {var} is not set"))?;
            Ok(Some(Passphrase::new(value)))
        }
        (None, None, Some(path)) => {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("--{flag}-file: failed to read {:?}", path))?;
            let first = contents.lines().next().unwrap_or_default();
            Ok(Some(Passphrase::new(first)))
        }
        _ => bail!("--{flag}, --{flag}-env and --{flag}-file are mutually exclusive"),
    }
}

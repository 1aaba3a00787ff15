//! Text formats for key material at rest
//!
//! Key pair file: the decimal integers `N`, `E`, `D`, one per line. Any
//! whitespace between them is accepted on read.
//!
//! Wrapped session key file: a single decimal integer.

use num_bigint::BigUint;
use std::io::Write;
use std::path::Path;
use tracing::debug;

use hsc_core::{HscError, HscResult};

use crate::rsa::{RsaKeyPair, WrappedKey};

/// Plain ASCII digits only: no sign, no `_` separators.
fn parse_decimal(token: &str, what: &str) -> HscResult<BigUint> {
    let not_decimal = || HscError::KeyFormat(format!("{what} is not a decimal integer"));
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(not_decimal());
    }
    BigUint::parse_bytes(token.as_bytes(), 10).ok_or_else(not_decimal)
}

/// Write `content` to `path`, owner read/write only on unix.
fn write_private(path: &Path, content: &str) -> HscResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()?;
    Ok(())
}

impl RsaKeyPair {
    pub fn to_text(&self) -> String {
        format!(
            "{}\n{}\n{}\n",
            self.modulus(),
            self.public_exponent(),
            self.private_exponent()
        )
    }

    /// Parse exactly three whitespace-separated decimal integers.
    pub fn from_text(text: &str) -> HscResult<Self> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let [n, e, d] = tokens.as_slice() else {
            return Err(HscError::KeyFormat(format!(
                "expected 3 integers (N, E, D), found {}",
                tokens.len()
            )));
        };
        Self::from_parts(
            parse_decimal(n, "modulus")?,
            parse_decimal(e, "public exponent")?,
            parse_decimal(d, "private exponent")?,
        )
    }

    pub fn save(&self, path: &Path) -> HscResult<()> {
        write_private(path, &self.to_text())?;
        debug!(path = %path.display(), modulus_bits = self.modulus_bits(), "saved key pair");
        Ok(())
    }

    pub fn load(path: &Path) -> HscResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let keypair = Self::from_text(&text)?;
        debug!(path = %path.display(), modulus_bits = keypair.modulus_bits(), "loaded key pair");
        Ok(keypair)
    }
}

impl WrappedKey {
    pub fn to_text(&self) -> String {
        self.as_integer().to_string()
    }

    pub fn from_text(text: &str) -> HscResult<Self> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let [value] = tokens.as_slice() else {
            return Err(HscError::KeyFormat(format!(
                "expected a single integer, found {} tokens",
                tokens.len()
            )));
        };
        parse_decimal(value, "wrapped session key").map(Self::from_integer)
    }

    pub fn save(&self, path: &Path) -> HscResult<()> {
        write_private(path, &self.to_text())
    }

    pub fn load(path: &Path) -> HscResult<Self> {
        Self::from_text(&std::fs::read_to_string(path)?)
    }
}

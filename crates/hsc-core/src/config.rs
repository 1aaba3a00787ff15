use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{HscError, HscResult};
use crate::types::PaddingPolicy;

/// Smallest modulus size accepted by key generation
pub const MIN_MODULUS_BITS: u64 = 256;

/// Top-level configuration (loaded from hsc.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HscConfig {
    pub keys: KeysConfig,
    pub cipher: CipherConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    /// RSA modulus size for keygen (default: 1024)
    pub modulus_bits: u64,
    /// Session key length in bits (default: 256)
    pub session_bits: u64,
    /// Directory holding key files and default outputs (default: data)
    pub data_dir: PathBuf,
    /// Key pair file name inside data_dir
    pub keypair_file: String,
    /// Wrapped session key file name inside data_dir
    pub session_key_file: String,
    /// Deterministic keygen seed. Demo only: never set this in production.
    /// Session keys always come from OS entropy.
    pub rng_seed: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CipherConfig {
    /// Padding check on decrypt: "strict" or "lenient"
    pub padding: PaddingPolicy,
    /// Process blocks on the rayon thread pool
    pub parallel: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            modulus_bits: 1024,
            session_bits: 256,
            data_dir: PathBuf::from("data"),
            keypair_file: "rsa_keypair.txt".into(),
            session_key_file: "session.key".into(),
            rng_seed: None,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl KeysConfig {
    pub fn keypair_path(&self) -> PathBuf {
        self.data_dir.join(&self.keypair_file)
    }

    pub fn session_key_path(&self) -> PathBuf {
        self.data_dir.join(&self.session_key_file)
    }
}

impl HscConfig {
    /// Load configuration from `path`, falling back to defaults when the
    /// file does not exist.
    pub fn load(path: &Path) -> HscResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| HscError::Config(format!("reading {}: {e}", path.display())))?;
        let config = Self::from_toml(&content)
            .map_err(|e| HscError::Config(format!("{}: {e}", path.display())))?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> HscResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| HscError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> HscResult<String> {
        toml::to_string(self).map_err(|e| HscError::Config(e.to_string()))
    }

    pub fn validate(&self) -> HscResult<()> {
        if self.keys.modulus_bits < MIN_MODULUS_BITS {
            return Err(HscError::Config(format!(
                "keys.modulus_bits must be at least {MIN_MODULUS_BITS}, got {}",
                self.keys.modulus_bits
            )));
        }
        if self.keys.session_bits == 0 || self.keys.session_bits >= self.keys.modulus_bits {
            return Err(HscError::Config(format!(
                "keys.session_bits must be in 1..{}, got {}",
                self.keys.modulus_bits, self.keys.session_bits
            )));
        }
        if !matches!(self.log.format.as_str(), "json" | "text") {
            return Err(HscError::Config(format!(
                "log.format must be \"json\" or \"text\", got {:?}",
                self.log.format
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[keys]
modulus_bits = 2048
session_bits = 256
data_dir = "/var/lib/hsc"
keypair_file = "team.key"
session_key_file = "transfer.key"
rng_seed = 7

[cipher]
padding = "lenient"
parallel = true

[log]
level = "debug"
format = "json"
"#;
        let config = HscConfig::from_toml(toml_str).unwrap();

        assert_eq!(config.keys.modulus_bits, 2048);
        assert_eq!(config.keys.rng_seed, Some(7));
        assert_eq!(config.keys.keypair_path(), PathBuf::from("/var/lib/hsc/team.key"));
        assert_eq!(
            config.keys.session_key_path(),
            PathBuf::from("/var/lib/hsc/transfer.key")
        );
        assert_eq!(config.cipher.padding, PaddingPolicy::Lenient);
        assert!(config.cipher.parallel);
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.format, "json");
    }

    #[test]
    fn test_parse_defaults() {
        let config = HscConfig::from_toml("").unwrap();

        assert_eq!(config.keys.modulus_bits, 1024);
        assert_eq!(config.keys.session_bits, 256);
        assert_eq!(config.keys.keypair_path(), PathBuf::from("data/rsa_keypair.txt"));
        assert_eq!(config.keys.rng_seed, None);
        assert_eq!(config.cipher.padding, PaddingPolicy::Strict);
        assert!(!config.cipher.parallel);
        assert_eq!(config.log.level, "info");
        assert_eq!(config.log.format, "text");
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r#"
[cipher]
parallel = true
"#;
        let config = HscConfig::from_toml(toml_str).unwrap();

        // Overridden
        assert!(config.cipher.parallel);
        // Defaults
        assert_eq!(config.cipher.padding, PaddingPolicy::Strict);
        assert_eq!(config.keys.modulus_bits, 1024);
    }

    #[test]
    fn test_rejects_small_modulus() {
        let err = HscConfig::from_toml("[keys]\nmodulus_bits = 128\n").unwrap_err();
        assert!(matches!(err, HscError::Config(_)));
    }

    #[test]
    fn test_rejects_session_not_below_modulus() {
        let toml_str = "[keys]\nmodulus_bits = 512\nsession_bits = 512\n";
        assert!(HscConfig::from_toml(toml_str).is_err());
    }

    #[test]
    fn test_rejects_unknown_log_format() {
        assert!(HscConfig::from_toml("[log]\nformat = \"xml\"\n").is_err());
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = HscConfig::default();
        let toml_str = config.to_toml().unwrap();
        let parsed = HscConfig::from_toml(&toml_str).unwrap();

        assert_eq!(config.keys.data_dir, parsed.keys.data_dir);
        assert_eq!(config.cipher.padding, parsed.cipher.padding);
        assert_eq!(config.log.format, parsed.log.format);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = HscConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.keys.modulus_bits, 1024);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hsc.toml");
        std::fs::write(&path, "[keys]\nsession_bits = 128\n").unwrap();

        let config = HscConfig::load(&path).unwrap();
        assert_eq!(config.keys.session_bits, 128);
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hsc.toml");
        std::fs::write(&path, "[keys\n").unwrap();

        assert!(matches!(HscConfig::load(&path), Err(HscError::Config(_))));
    }
}

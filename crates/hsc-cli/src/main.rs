//! hsc: hybrid RSA + Serpent file encryption CLI
//!
//! Commands:
//!   keygen                 - generate an RSA key pair and save it
//!   encrypt <input>        - encrypt a file under a fresh, RSA-wrapped session key
//!   decrypt <input>        - unwrap the session key and decrypt a file
//!   selftest               - run the block cipher component self-test
//!   hash <file>...         - print BLAKE3 digests
//!   config show            - display the effective configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use hsc_core::config::HscConfig;
use hsc_crypto::{
    entropy_rng, generate_keypair, HybridSession, RsaKeyPair, SerpentCipher, SessionOptions,
    WrappedKey,
};

/// Extension appended to encrypted outputs
const CIPHERTEXT_EXT: &str = "serpent";

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "hsc",
    version,
    about = "Hybrid RSA + Serpent file encryption",
    long_about = "hsc: wrap a random session key with RSA and encrypt files with Serpent"
)]
struct Cli {
    /// Path to hsc.toml configuration file
    #[arg(long, short = 'c', env = "HSC_CONFIG", default_value = "hsc.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, env = "HSC_LOG")]
    log: Option<String>,

    /// Log format; overrides the config file
    #[arg(long, env = "HSC_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug, ValueEnum, PartialEq)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate an RSA key pair and save it
    Keygen {
        /// Modulus size in bits (default: keys.modulus_bits)
        #[arg(long, short = 'b')]
        bits: Option<u64>,
        /// Key pair file (default: <data_dir>/<keypair_file>)
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
        /// Overwrite an existing key pair file
        #[arg(long)]
        force: bool,
    },

    /// Encrypt a file under a fresh session key
    ///
    /// The session key is wrapped with the RSA public exponent and written
    /// to the session key file; keep it next to the ciphertext.
    Encrypt {
        /// Plaintext file
        input: PathBuf,
        /// Ciphertext file (default: <input>.serpent)
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
        /// Key pair file (default: <data_dir>/<keypair_file>)
        #[arg(long, short = 'k')]
        key: Option<PathBuf>,
        /// Wrapped session key output (default: <data_dir>/<session_key_file>)
        #[arg(long, short = 's')]
        session_key: Option<PathBuf>,
        /// Overwrite an existing session key file
        #[arg(long)]
        force: bool,
    },

    /// Decrypt a file using a wrapped session key
    Decrypt {
        /// Ciphertext file
        input: PathBuf,
        /// Plaintext file (default: <input> without .serpent, or <input>.dec)
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
        /// Key pair file (default: <data_dir>/<keypair_file>)
        #[arg(long, short = 'k')]
        key: Option<PathBuf>,
        /// Wrapped session key input (default: <data_dir>/<session_key_file>)
        #[arg(long, short = 's')]
        session_key: Option<PathBuf>,
    },

    /// Run the block cipher component self-test
    Selftest,

    /// Print BLAKE3 digests of files
    Hash {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    let level = cli.log.clone().unwrap_or_else(|| config.log.level.clone());
    let format = cli.log_format.clone().unwrap_or_else(|| {
        if config.log.format == "json" {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    });
    init_logging(&level, &format);

    match cli.command {
        Commands::Keygen { bits, out, force } => cmd_keygen(&config, bits, out, force),
        Commands::Encrypt {
            input,
            out,
            key,
            session_key,
            force,
        } => cmd_encrypt(&config, &input, out, key, session_key, force),
        Commands::Decrypt {
            input,
            out,
            key,
            session_key,
        } => cmd_decrypt(&config, &input, out, key, session_key),
        Commands::Selftest => cmd_selftest(),
        Commands::Hash { files } => cmd_hash(&files),
        Commands::Config {
            action: ConfigAction::Show,
        } => cmd_config_show(&config, &cli.config),
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

// ── Config loading ────────────────────────────────────────────────────────────

fn load_config(path: &Path) -> Result<HscConfig> {
    let config = HscConfig::load(path)
        .with_context(|| format!("loading config: {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("validating config: {}", path.display()))?;
    Ok(config)
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating dir: {}", parent.display()))?;
            info!(dir = %parent.display(), "created data directory");
        }
    }
    Ok(())
}

fn encrypted_path(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_owned();
    name.push(".");
    name.push(CIPHERTEXT_EXT);
    PathBuf::from(name)
}

fn decrypted_path(input: &Path) -> PathBuf {
    if input.extension().is_some_and(|ext| ext == CIPHERTEXT_EXT) {
        input.with_extension("")
    } else {
        let mut name = input.as_os_str().to_owned();
        name.push(".dec");
        PathBuf::from(name)
    }
}

fn load_session(config: &HscConfig, key: Option<PathBuf>) -> Result<HybridSession> {
    let key_path = key.unwrap_or_else(|| config.keys.keypair_path());
    let keypair = RsaKeyPair::load(&key_path)
        .with_context(|| format!("loading key pair: {}", key_path.display()))?;
    HybridSession::new(keypair, SessionOptions::from(config)).context("starting session")
}

// ── `hsc keygen` ──────────────────────────────────────────────────────────────

fn cmd_keygen(
    config: &HscConfig,
    bits: Option<u64>,
    out: Option<PathBuf>,
    force: bool,
) -> Result<()> {
    let bits = bits.unwrap_or(config.keys.modulus_bits);
    let out = out.unwrap_or_else(|| config.keys.keypair_path());
    if out.exists() && !force {
        anyhow::bail!(
            "key pair file already exists: {}\nPass --force to overwrite it.",
            out.display()
        );
    }

    let mut rng = entropy_rng(config.keys.rng_seed);
    info!(bits, "generating RSA key pair");
    let keypair = generate_keypair(bits, &mut rng).context("generating key pair")?;

    ensure_parent(&out)?;
    keypair
        .save(&out)
        .with_context(|| format!("saving key pair: {}", out.display()))?;

    println!("Key pair: {}", out.display());
    println!("  modulus:  {} bits", keypair.modulus_bits());
    println!("  exponent: {}", keypair.public_exponent());
    Ok(())
}

// ── `hsc encrypt` ─────────────────────────────────────────────────────────────

fn cmd_encrypt(
    config: &HscConfig,
    input: &Path,
    out: Option<PathBuf>,
    key: Option<PathBuf>,
    session_key: Option<PathBuf>,
    force: bool,
) -> Result<()> {
    let session = load_session(config, key)?;
    let out = out.unwrap_or_else(|| encrypted_path(input));
    let wrapped_path = session_key.unwrap_or_else(|| config.keys.session_key_path());
    if wrapped_path.exists() && !force {
        anyhow::bail!(
            "session key file already exists: {}\n\
             It may be needed to decrypt an earlier file. Pass --session-key to \
             choose another path or --force to overwrite it.",
            wrapped_path.display()
        );
    }

    // keys.rng_seed only drives keygen: session keys always come from OS entropy
    let mut rng = entropy_rng(None);
    let (sealed_key, wrapped) = session
        .seal_session_key(&mut rng)
        .context("sealing session key")?;

    ensure_parent(&wrapped_path)?;
    wrapped
        .save(&wrapped_path)
        .with_context(|| format!("saving session key: {}", wrapped_path.display()))?;

    ensure_parent(&out)?;
    let report = match session.encrypt_file_with_key(&sealed_key, input, &out) {
        Ok(report) => report,
        Err(err) => {
            if let Err(cleanup) = std::fs::remove_file(&wrapped_path) {
                warn!(
                    path = %wrapped_path.display(),
                    %cleanup,
                    "could not remove unused session key"
                );
            }
            return Err(err).with_context(|| format!("encrypting: {}", input.display()));
        }
    };

    println!("Encrypted: {} -> {}", input.display(), out.display());
    println!(
        "  {} bytes in, {} bytes out ({} blocks)",
        report.bytes_read, report.bytes_written, report.blocks
    );
    println!(
        "  session key: {} ({} bits)",
        wrapped_path.display(),
        session.options().session_bits
    );
    Ok(())
}

// ── `hsc decrypt` ─────────────────────────────────────────────────────────────

fn cmd_decrypt(
    config: &HscConfig,
    input: &Path,
    out: Option<PathBuf>,
    key: Option<PathBuf>,
    session_key: Option<PathBuf>,
) -> Result<()> {
    let session = load_session(config, key)?;
    let out = out.unwrap_or_else(|| decrypted_path(input));
    let wrapped_path = session_key.unwrap_or_else(|| config.keys.session_key_path());

    let wrapped = WrappedKey::load(&wrapped_path)
        .with_context(|| format!("loading session key: {}", wrapped_path.display()))?;

    ensure_parent(&out)?;
    let report = session
        .decrypt_file(&wrapped, input, &out)
        .with_context(|| format!("decrypting: {}", input.display()))?;

    if let hsc_crypto::PaddingStatus::Anomalous(byte) = report.padding {
        warn!(pad_byte = byte, "padding was invalid; output kept untruncated");
    }

    println!("Decrypted: {} -> {}", input.display(), out.display());
    println!(
        "  {} bytes in, {} bytes out",
        report.bytes_read, report.bytes_written
    );
    Ok(())
}

// ── `hsc selftest` ────────────────────────────────────────────────────────────

fn cmd_selftest() -> Result<()> {
    let report = SerpentCipher::self_test();
    println!("{report}");
    if !report.passed() {
        anyhow::bail!("cipher self-test failed");
    }
    Ok(())
}

// ── `hsc hash` ────────────────────────────────────────────────────────────────

fn cmd_hash(files: &[PathBuf]) -> Result<()> {
    for path in files {
        let data =
            std::fs::read(path).with_context(|| format!("reading: {}", path.display()))?;
        println!("{}  {}", blake3::hash(&data).to_hex(), path.display());
    }
    Ok(())
}

// ── `hsc config show` ─────────────────────────────────────────────────────────

fn cmd_config_show(config: &HscConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    println!();
    let rendered = config.to_toml().context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}

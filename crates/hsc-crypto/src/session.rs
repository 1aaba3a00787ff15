//! Hybrid session: RSA-wrapped session key plus Serpent bulk encryption
//!
//! Sender: draw a session key, wrap it with the public exponent, check that
//! the private exponent recovers it, then encrypt the payload under it.
//! Receiver: unwrap the stored key and decrypt.

use num_bigint::BigUint;
use rand::{CryptoRng, RngCore};
use std::path::Path;
use tracing::{debug, info, warn};

use hsc_core::config::HscConfig;
use hsc_core::{HscError, HscResult};

use crate::cipher::SerpentCipher;
use crate::codec::{CodecOptions, Decrypted, FileCodec, FileReport};
use crate::rsa::{generate_keypair, unwrap_key, wrap_key, RsaKeyPair, SessionKey, WrappedKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Length of each freshly drawn session key
    pub session_bits: u64,
    pub codec: CodecOptions,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            session_bits: 256,
            codec: CodecOptions::default(),
        }
    }
}

impl From<&HscConfig> for SessionOptions {
    fn from(config: &HscConfig) -> Self {
        Self {
            session_bits: config.keys.session_bits,
            codec: CodecOptions::from(&config.cipher),
        }
    }
}

/// In-memory encryption result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedBytes {
    pub wrapped_key: WrappedKey,
    pub ciphertext: Vec<u8>,
}

/// File encryption result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedFile {
    pub wrapped_key: WrappedKey,
    pub report: FileReport,
}

/// Owns the key pair used to wrap and unwrap session keys.
#[derive(Debug, Clone)]
pub struct HybridSession {
    keypair: RsaKeyPair,
    options: SessionOptions,
}

impl HybridSession {
    /// Fails with `InvalidParameter` unless `1 <= session_bits < modulus bits`,
    /// since a session key must stay below the modulus to survive wrapping.
    pub fn new(keypair: RsaKeyPair, options: SessionOptions) -> HscResult<Self> {
        let modulus_bits = keypair.modulus_bits();
        if options.session_bits == 0 || options.session_bits >= modulus_bits {
            return Err(HscError::InvalidParameter(format!(
                "session key length {} bits must be in [1, {modulus_bits})",
                options.session_bits
            )));
        }
        Ok(Self { keypair, options })
    }

    /// Generate a fresh key pair of `bits` bits and start a session on it.
    pub fn generate<R: RngCore + CryptoRng>(
        bits: u64,
        options: SessionOptions,
        rng: &mut R,
    ) -> HscResult<Self> {
        let keypair = generate_keypair(bits, rng)?;
        Self::new(keypair, options)
    }

    pub fn keypair(&self) -> &RsaKeyPair {
        &self.keypair
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Draw a session key, wrap it, and verify that unwrapping recovers it.
    pub fn seal_session_key<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
    ) -> HscResult<(SessionKey, WrappedKey)> {
        let session = SessionKey::generate(self.options.session_bits, rng)?;
        let wrapped = wrap_key(&self.keypair, &session)?;
        let recovered = unwrap_key(&self.keypair, &wrapped)?;
        if recovered != session {
            warn!("unwrapped session key differs from the drawn key");
            return Err(HscError::SessionKeyMismatch);
        }
        debug!(session_bits = session.bits(), "sealed session key");
        Ok((session, wrapped))
    }

    pub fn open_session_key(&self, wrapped: &WrappedKey) -> HscResult<SessionKey> {
        unwrap_key(&self.keypair, wrapped)
    }

    fn cipher_for(&self, session: &BigUint) -> SerpentCipher {
        let mut cipher = SerpentCipher::new();
        let fit = cipher.set_key(session);
        if fit.is_lossy() {
            warn!(
                session_bits = self.options.session_bits,
                "session keys longer than 256 bits only contribute their low-order bytes"
            );
        } else {
            debug!(?fit, "keyed block cipher");
        }
        cipher
    }

    pub fn encrypt_bytes<R: RngCore + CryptoRng>(
        &self,
        plaintext: &[u8],
        rng: &mut R,
    ) -> HscResult<SealedBytes> {
        let (session, wrapped_key) = self.seal_session_key(rng)?;
        let cipher = self.cipher_for(session.as_integer());
        let ciphertext = FileCodec::new(&cipher, self.options.codec).encrypt_stream(plaintext)?;
        Ok(SealedBytes {
            wrapped_key,
            ciphertext,
        })
    }

    pub fn decrypt_bytes(&self, wrapped: &WrappedKey, ciphertext: &[u8]) -> HscResult<Decrypted> {
        let session = self.open_session_key(wrapped)?;
        let cipher = self.cipher_for(session.as_integer());
        FileCodec::new(&cipher, self.options.codec).decrypt_stream(ciphertext)
    }

    /// Encrypt `input` to `output` under a fresh session key. The caller
    /// stores the returned wrapped key alongside the ciphertext.
    pub fn encrypt_file<R: RngCore + CryptoRng>(
        &self,
        input: &Path,
        output: &Path,
        rng: &mut R,
    ) -> HscResult<SealedFile> {
        let (session, wrapped_key) = self.seal_session_key(rng)?;
        let report = self.encrypt_file_with_key(&session, input, output)?;
        Ok(SealedFile {
            wrapped_key,
            report,
        })
    }

    /// Encrypt `input` to `output` under an already sealed session key.
    pub fn encrypt_file_with_key(
        &self,
        session: &SessionKey,
        input: &Path,
        output: &Path,
    ) -> HscResult<FileReport> {
        let cipher = self.cipher_for(session.as_integer());
        let report = FileCodec::new(&cipher, self.options.codec).encrypt_file(input, output)?;
        info!(
            input = %input.display(),
            output = %output.display(),
            bytes = report.bytes_read,
            blocks = report.blocks,
            "encrypted file"
        );
        Ok(report)
    }

    pub fn decrypt_file(
        &self,
        wrapped: &WrappedKey,
        input: &Path,
        output: &Path,
    ) -> HscResult<FileReport> {
        let session = self.open_session_key(wrapped)?;
        let cipher = self.cipher_for(session.as_integer());
        let report = FileCodec::new(&cipher, self.options.codec).decrypt_file(input, output)?;
        info!(
            input = %input.display(),
            output = %output.display(),
            bytes = report.bytes_written,
            padding = ?report.padding,
            "decrypted file"
        );
        Ok(report)
    }
}

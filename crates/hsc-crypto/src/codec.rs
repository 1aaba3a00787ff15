//! Byte-stream and file encryption over independent 16-byte blocks
//!
//! Ciphertext format (binary, no header):
//! ```text
//! [16 bytes: block 0][16 bytes: block 1]...[16 bytes: block n-1]
//! ```
//!
//! Plaintext is padded with `L = 16 - (len mod 16)` copies of the byte `L`,
//! so the padded length is always a positive multiple of 16 and an aligned
//! plaintext gains one full block. Each block is read as four little-endian
//! words, passed through the cipher, and written back little-endian.

use rayon::prelude::*;
use std::path::Path;
use tracing::{debug, warn};

use hsc_core::config::CipherConfig;
use hsc_core::{HscError, HscResult, PaddingPolicy};

use crate::cipher::{RoundKeys, SerpentCipher};
use crate::{Block, BLOCK_SIZE};

/// What happened to the padding of a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaddingStatus {
    /// Encryption appended this many pad bytes
    Added(usize),
    /// Decryption removed this many pad bytes
    Stripped(usize),
    /// Lenient decryption found this invalid trailing byte and kept the buffer
    Anomalous(u8),
    /// Lenient decryption of an empty ciphertext
    Empty,
}

/// Decrypted plaintext plus the padding outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decrypted {
    pub plaintext: Vec<u8>,
    pub padding: PaddingStatus,
}

/// Summary of one file transform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub blocks: u64,
    pub padding: PaddingStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CodecOptions {
    pub padding: PaddingPolicy,
    /// Transform blocks on the rayon thread pool (output order is unchanged)
    pub parallel: bool,
}

impl From<&CipherConfig> for CodecOptions {
    fn from(config: &CipherConfig) -> Self {
        Self {
            padding: config.padding,
            parallel: config.parallel,
        }
    }
}

/// Append `L` copies of the byte `L`, where `L = 16 - (len mod 16)`.
pub fn pad(data: &[u8]) -> Vec<u8> {
    let pad_len = BLOCK_SIZE - data.len() % BLOCK_SIZE;
    let mut buf = Vec::with_capacity(data.len() + pad_len);
    buf.extend_from_slice(data);
    buf.resize(data.len() + pad_len, pad_len as u8);
    buf
}

/// Remove the padding added by [`pad`].
///
/// `Strict` requires `1 <= L <= 16`, `L <= len`, and every pad byte equal to
/// `L`. `Lenient` checks only the range of the last byte and returns the
/// buffer untruncated when it is out of range.
pub fn unpad(mut buf: Vec<u8>, policy: PaddingPolicy) -> HscResult<Decrypted> {
    let Some(&last) = buf.last() else {
        return match policy {
            PaddingPolicy::Strict => Err(HscError::MalformedInput(
                "no padding block present".into(),
            )),
            PaddingPolicy::Lenient => Ok(Decrypted {
                plaintext: buf,
                padding: PaddingStatus::Empty,
            }),
        };
    };

    let pad_len = last as usize;
    let in_range = (1..=BLOCK_SIZE).contains(&pad_len) && pad_len <= buf.len();

    match policy {
        PaddingPolicy::Strict => {
            let consistent =
                in_range && buf[buf.len() - pad_len..].iter().all(|&b| b == last);
            if !consistent {
                return Err(HscError::PaddingAnomaly(last));
            }
        }
        PaddingPolicy::Lenient => {
            if !in_range {
                warn!(
                    pad_byte = last,
                    "invalid padding after decryption: output left untruncated"
                );
                return Ok(Decrypted {
                    plaintext: buf,
                    padding: PaddingStatus::Anomalous(last),
                });
            }
        }
    }

    buf.truncate(buf.len() - pad_len);
    Ok(Decrypted {
        plaintext: buf,
        padding: PaddingStatus::Stripped(pad_len),
    })
}

fn load_block(bytes: &[u8]) -> Block {
    let mut block = [0u32; 4];
    for (word, chunk) in block.iter_mut().zip(bytes.chunks_exact(4)) {
        *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    block
}

fn store_block(block: &Block, out: &mut [u8]) {
    for (word, chunk) in block.iter().zip(out.chunks_exact_mut(4)) {
        chunk.copy_from_slice(&word.to_le_bytes());
    }
}

/// Run `op` over every 16-byte block of `data` in place.
fn transform_blocks(
    keys: &RoundKeys,
    data: &mut [u8],
    parallel: bool,
    op: fn(&RoundKeys, Block) -> Block,
) {
    let apply = |chunk: &mut [u8]| {
        let out = op(keys, load_block(chunk));
        store_block(&out, chunk);
    };
    if parallel {
        data.par_chunks_exact_mut(BLOCK_SIZE).for_each(apply);
    } else {
        data.chunks_exact_mut(BLOCK_SIZE).for_each(apply);
    }
}

/// Drives a keyed [`SerpentCipher`] over whole buffers and files.
pub struct FileCodec<'a> {
    cipher: &'a SerpentCipher,
    options: CodecOptions,
}

impl<'a> FileCodec<'a> {
    pub fn new(cipher: &'a SerpentCipher, options: CodecOptions) -> Self {
        Self { cipher, options }
    }

    /// Pad and encrypt a byte stream.
    pub fn encrypt_stream(&self, plaintext: &[u8]) -> HscResult<Vec<u8>> {
        let keys = self.cipher.schedule()?;
        let mut buf = pad(plaintext);
        transform_blocks(keys, &mut buf, self.options.parallel, RoundKeys::encrypt);
        debug!(
            plaintext_bytes = plaintext.len(),
            blocks = buf.len() / BLOCK_SIZE,
            parallel = self.options.parallel,
            "encrypted stream"
        );
        Ok(buf)
    }

    /// Decrypt a byte stream and remove its padding.
    ///
    /// The length is validated before any block is processed.
    pub fn decrypt_stream(&self, ciphertext: &[u8]) -> HscResult<Decrypted> {
        if ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(HscError::MalformedInput(format!(
                "ciphertext length {} is not a multiple of {BLOCK_SIZE}",
                ciphertext.len()
            )));
        }
        if ciphertext.is_empty() && self.options.padding == PaddingPolicy::Strict {
            return Err(HscError::MalformedInput("ciphertext is empty".into()));
        }

        let keys = self.cipher.schedule()?;
        let mut buf = ciphertext.to_vec();
        transform_blocks(keys, &mut buf, self.options.parallel, RoundKeys::decrypt);
        let decrypted = unpad(buf, self.options.padding)?;
        debug!(
            ciphertext_bytes = ciphertext.len(),
            plaintext_bytes = decrypted.plaintext.len(),
            padding = ?decrypted.padding,
            "decrypted stream"
        );
        Ok(decrypted)
    }

    /// Encrypt `input` into `output`. Files are read and written as raw bytes.
    pub fn encrypt_file(&self, input: &Path, output: &Path) -> HscResult<FileReport> {
        let plaintext = std::fs::read(input)?;
        let ciphertext = self.encrypt_stream(&plaintext)?;
        std::fs::write(output, &ciphertext)?;

        Ok(FileReport {
            bytes_read: plaintext.len() as u64,
            bytes_written: ciphertext.len() as u64,
            blocks: (ciphertext.len() / BLOCK_SIZE) as u64,
            padding: PaddingStatus::Added(ciphertext.len() - plaintext.len()),
        })
    }

    /// Decrypt `input` into `output`.
    ///
    /// `output` is only created once decryption and the padding check have
    /// succeeded.
    pub fn decrypt_file(&self, input: &Path, output: &Path) -> HscResult<FileReport> {
        let ciphertext = std::fs::read(input)?;
        let decrypted = self.decrypt_stream(&ciphertext)?;
        std::fs::write(output, &decrypted.plaintext)?;

        Ok(FileReport {
            bytes_read: ciphertext.len() as u64,
            bytes_written: decrypted.plaintext.len() as u64,
            blocks: (ciphertext.len() / BLOCK_SIZE) as u64,
            padding: decrypted.padding,
        })
    }
}

//! Serpent block cipher engine: key schedule, 32-round encrypt/decrypt,
//! component self-test
//!
//! An engine starts without a key. [`SerpentCipher::set_key`] derives the 33
//! round keys and may be called again at any time; the previous schedule is
//! zeroized when it is replaced, cleared, or dropped. Round keys are written
//! directly into their heap allocation and never move afterwards.
//!
//! Block operations take `&self` and may run concurrently; rekeying takes
//! `&mut self`, so it cannot overlap an in-flight block operation on the same
//! engine.

use num_bigint::BigUint;
use tracing::{debug, warn};
use zeroize::Zeroize;

use hsc_core::{HscError, HscResult, KeyFit};

use crate::bitslice::{inverse_linear_transform, inverse_transpose, linear_transform, transpose};
use crate::sbox::{apply_inverse_sbox, apply_sbox, SBOX_COUNT};
use crate::{Block, KEY_SIZE, ROUNDS, SUBKEY_COUNT};

/// Fractional part of the golden ratio
const PHI: u32 = 0x9e37_79b9;

/// Prekey words: 8 key words followed by 4 words per round key
const PREKEY_WORDS: usize = 8 + 4 * SUBKEY_COUNT;

/// The 33 round keys of one engine. Zeroized on drop.
pub(crate) struct RoundKeys {
    keys: [Block; SUBKEY_COUNT],
}

impl RoundKeys {
    /// Expand a 256-bit key into a boxed schedule.
    fn derive(key: &[u8; KEY_SIZE]) -> Box<Self> {
        let mut w = [0u32; PREKEY_WORDS];
        for (word, bytes) in w.iter_mut().zip(key.chunks_exact(4)) {
            *word = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        }
        for i in 8..PREKEY_WORDS {
            let mixed = w[i - 8] ^ w[i - 5] ^ w[i - 3] ^ w[i - 1] ^ PHI ^ (i as u32 - 8);
            w[i] = mixed.rotate_left(11);
        }

        let mut schedule = Box::new(Self {
            keys: [[0u32; 4]; SUBKEY_COUNT],
        });
        for (i, subkey) in schedule.keys.iter_mut().enumerate() {
            let base = 4 * i + 8;
            subkey.copy_from_slice(&w[base..base + 4]);
            apply_sbox(schedule_sbox(i), subkey);
        }
        w.zeroize();

        schedule
    }

    pub(crate) fn encrypt(&self, block: Block) -> Block {
        let mut x = block;
        transpose(&mut x);
        for round in 0..ROUNDS {
            xor_key(&mut x, &self.keys[round]);
            apply_sbox(round, &mut x);
            if round < ROUNDS - 1 {
                linear_transform(&mut x);
            } else {
                xor_key(&mut x, &self.keys[ROUNDS]);
            }
        }
        inverse_transpose(&mut x);
        x
    }

    pub(crate) fn decrypt(&self, block: Block) -> Block {
        let mut x = block;
        transpose(&mut x);
        xor_key(&mut x, &self.keys[ROUNDS]);
        for round in (0..ROUNDS).rev() {
            if round < ROUNDS - 1 {
                inverse_linear_transform(&mut x);
            }
            apply_inverse_sbox(round, &mut x);
            xor_key(&mut x, &self.keys[round]);
        }
        inverse_transpose(&mut x);
        x
    }
}

impl Drop for RoundKeys {
    fn drop(&mut self) {
        self.keys.zeroize();
    }
}

/// S-box used for round key `i`: S3, S2, S1, S0, S7, S6, S5, S4, S3, ...
fn schedule_sbox(i: usize) -> usize {
    (SBOX_COUNT + 3 - (i % SBOX_COUNT)) % SBOX_COUNT
}

fn xor_key(x: &mut Block, key: &Block) {
    for (word, k) in x.iter_mut().zip(key) {
        *word ^= k;
    }
}

/// Serpent block cipher engine operating on 128-bit blocks.
#[derive(Default)]
pub struct SerpentCipher {
    schedule: Option<Box<RoundKeys>>,
}

impl SerpentCipher {
    /// An engine with no key. Block operations fail with `NotKeyed` until
    /// [`set_key`](Self::set_key) is called.
    pub fn new() -> Self {
        Self::default()
    }

    /// An engine keyed from a session integer.
    pub fn with_key(session: &BigUint) -> Self {
        let mut cipher = Self::new();
        cipher.set_key(session);
        cipher
    }

    /// Key the engine from a non-negative integer.
    ///
    /// The integer is written big-endian, left-padded with zeros to 32 bytes,
    /// or cut to its last 32 bytes when longer. Cutting loses key material;
    /// the returned [`KeyFit`] reports it and a warning is logged.
    pub fn set_key(&mut self, session: &BigUint) -> KeyFit {
        let mut raw = session.to_bytes_be();
        let mut key = [0u8; KEY_SIZE];

        let fit = match raw.len() {
            len if len > KEY_SIZE => {
                key.copy_from_slice(&raw[len - KEY_SIZE..]);
                KeyFit::Truncated { dropped: len - KEY_SIZE }
            }
            len if len < KEY_SIZE => {
                key[KEY_SIZE - len..].copy_from_slice(&raw);
                KeyFit::Padded { missing: KEY_SIZE - len }
            }
            _ => {
                key.copy_from_slice(&raw);
                KeyFit::Exact
            }
        };
        raw.zeroize();

        self.set_key_bytes(&key);
        key.zeroize();

        if let KeyFit::Truncated { dropped } = fit {
            warn!(
                dropped_bytes = dropped,
                "session key exceeds 256 bits: high-order bytes discarded"
            );
        }
        fit
    }

    /// Key the engine from raw 256-bit key bytes.
    pub fn set_key_bytes(&mut self, key: &[u8; KEY_SIZE]) {
        self.schedule = Some(RoundKeys::derive(key));
        debug!("derived {SUBKEY_COUNT} round keys");
    }

    /// Drop the key schedule; the engine returns to the unkeyed state.
    pub fn clear(&mut self) {
        self.schedule = None;
    }

    pub fn is_keyed(&self) -> bool {
        self.schedule.is_some()
    }

    /// Round key `i` (0..=32), for known-answer checks.
    pub fn round_key(&self, i: usize) -> Option<Block> {
        self.schedule.as_ref()?.keys.get(i).copied()
    }

    /// Encrypt one 128-bit block.
    pub fn encrypt_block(&self, block: Block) -> HscResult<Block> {
        Ok(self.schedule()?.encrypt(block))
    }

    /// Decrypt one 128-bit block.
    pub fn decrypt_block(&self, block: Block) -> HscResult<Block> {
        Ok(self.schedule()?.decrypt(block))
    }

    pub(crate) fn schedule(&self) -> HscResult<&RoundKeys> {
        self.schedule.as_deref().ok_or(HscError::NotKeyed)
    }

    /// Check that every layer inverts cleanly on sample data.
    ///
    /// Covers transpose/inverse transpose, the linear layer and its inverse,
    /// and all eight S-box/inverse pairs over every nibble value.
    pub fn self_test() -> SelfTestReport {
        let samples: [Block; 2] = [
            [0x1122_3344, 0x5566_7788, 0x99aa_bbcc, 0xddee_ff00],
            // each of the 32 S-box instances sees 0..15 twice
            [0xaaaa_aaaa, 0xcccc_cccc, 0xf0f0_f0f0, 0xff00_ff00],
        ];

        let transpose_ok = samples.iter().all(|&sample| {
            let mut x = sample;
            transpose(&mut x);
            inverse_transpose(&mut x);
            x == sample
        });

        let linear_ok = samples.iter().all(|&sample| {
            let mut x = sample;
            linear_transform(&mut x);
            inverse_linear_transform(&mut x);
            x == sample
        });

        let sbox_failures: Vec<usize> = (0..SBOX_COUNT)
            .filter(|&index| {
                !samples.iter().all(|&sample| {
                    let mut x = sample;
                    apply_sbox(index, &mut x);
                    apply_inverse_sbox(index, &mut x);
                    x == sample
                })
            })
            .collect();

        let report = SelfTestReport {
            transpose: transpose_ok,
            linear: linear_ok,
            sbox_failures,
        };
        if report.passed() {
            debug!("cipher self-test passed");
        } else {
            warn!(?report, "cipher self-test failed");
        }
        report
    }
}

impl std::fmt::Debug for SerpentCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerpentCipher")
            .field("keyed", &self.is_keyed())
            .field("round_keys", &"[REDACTED]")
            .finish()
    }
}

/// Outcome of [`SerpentCipher::self_test`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelfTestReport {
    pub transpose: bool,
    pub linear: bool,
    /// S-box indices whose inverse did not restore the input
    pub sbox_failures: Vec<usize>,
}

impl SelfTestReport {
    pub fn passed(&self) -> bool {
        self.transpose && self.linear && self.sbox_failures.is_empty()
    }
}

impl std::fmt::Display for SelfTestReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = |ok: bool| if ok { "PASS" } else { "FAIL" };
        writeln!(f, "[{}] transpose / inverse transpose", status(self.transpose))?;
        writeln!(f, "[{}] linear transform / inverse", status(self.linear))?;
        if self.sbox_failures.is_empty() {
            write!(f, "[PASS] S-boxes 0-7 / inverses")
        } else {
            write!(f, "[FAIL] S-boxes {:?} do not invert", self.sbox_failures)
        }
    }
}

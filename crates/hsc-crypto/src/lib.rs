//! hsc-crypto: hybrid file encryption for hsc
//!
//! An RSA key pair transports a random session key; the session key drives a
//! bitsliced Serpent block cipher over 16-byte blocks of the file.
//!
//! Pipeline:
//! ```text
//! sender:   session key ← random_bits(256)
//!           wrapped     ← session^e mod n            (stored next to the file)
//!           check        wrapped^d mod n == session
//!           ciphertext  ← Serpent(session) over pad(plaintext), block by block
//! receiver: session     ← wrapped^d mod n
//!           plaintext   ← unpad(Serpent⁻¹(session) over ciphertext)
//! ```
//!
//! Block cipher structure (per block, 32 rounds):
//! ```text
//! transpose → [ ⊕K[r] → S[r mod 8] → LT ] × 31 → ⊕K[31] → S[7] → ⊕K[32] → inverse transpose
//! ```
//!
//! Blocks are independent: identical plaintext blocks under one session key
//! produce identical ciphertext blocks. The format carries no header, IV or
//! authentication tag.

pub mod bitslice;
pub mod cipher;
pub mod codec;
pub mod keyfile;
pub mod prime;
pub mod rsa;
pub mod sbox;
pub mod session;

pub use cipher::{SelfTestReport, SerpentCipher};
pub use codec::{pad, unpad, CodecOptions, Decrypted, FileCodec, FileReport, PaddingStatus};
pub use prime::{entropy_rng, random_bits};
pub use rsa::{
    decrypt_integer, encrypt_integer, generate_keypair, unwrap_key, wrap_key, RsaKeyPair,
    SessionKey, WrappedKey,
};
pub use session::{HybridSession, SealedBytes, SealedFile, SessionOptions};

/// One cipher block: 128 bits as four 32-bit words
pub type Block = [u32; 4];

/// Size of a cipher block in bytes
pub const BLOCK_SIZE: usize = 16;

/// Size of the cipher key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Number of cipher rounds
pub const ROUNDS: usize = 32;

/// Number of round keys (one per round plus the final whitening key)
pub const SUBKEY_COUNT: usize = ROUNDS + 1;

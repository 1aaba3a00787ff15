//! RSA key exchange: key pair generation, integer encrypt/decrypt, and
//! session-key wrapping
//!
//! The modulus is the product of two independently drawn primes of about
//! `bits / 2` bits each. The public exponent is 65537 whenever it is coprime
//! to φ(n); otherwise a random odd exponent is drawn until one is.

use num_bigint::{BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::{CryptoRng, RngCore};
use tracing::debug;

use hsc_core::config::MIN_MODULUS_BITS;
use hsc_core::{HscError, HscResult};

use crate::prime::{mod_inverse, next_prime, random_bits};

/// Fixed public exponent tried first during key generation
pub const DEFAULT_PUBLIC_EXPONENT: u32 = 65537;

/// An RSA key pair `(n, e, d)`. Immutable once built.
#[derive(Clone, PartialEq, Eq)]
pub struct RsaKeyPair {
    n: BigUint,
    e: BigUint,
    d: BigUint,
}

impl RsaKeyPair {
    /// Assemble a key pair from stored parts.
    ///
    /// Only structural checks are possible here: the factors of `n` are not
    /// retained, so `e·d ≡ 1 (mod φ(n))` cannot be verified.
    pub fn from_parts(n: BigUint, e: BigUint, d: BigUint) -> HscResult<Self> {
        if n <= BigUint::one() {
            return Err(HscError::KeyFormat("modulus must be greater than 1".into()));
        }
        if e.is_zero() || e >= n {
            return Err(HscError::KeyFormat("public exponent must be in [1, n)".into()));
        }
        if d.is_zero() || d >= n {
            return Err(HscError::KeyFormat("private exponent must be in [1, n)".into()));
        }
        Ok(Self { n, e, d })
    }

    pub fn modulus(&self) -> &BigUint {
        &self.n
    }

    pub fn public_exponent(&self) -> &BigUint {
        &self.e
    }

    pub fn private_exponent(&self) -> &BigUint {
        &self.d
    }

    /// Significant bits of the modulus
    pub fn modulus_bits(&self) -> u64 {
        self.n.bits()
    }

    /// `m^e mod n`
    pub fn encrypt(&self, m: &BigUint) -> HscResult<BigUint> {
        encrypt_integer(m, self)
    }

    /// `c^d mod n`
    pub fn decrypt(&self, c: &BigUint) -> HscResult<BigUint> {
        decrypt_integer(c, self)
    }
}

impl std::fmt::Debug for RsaKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaKeyPair")
            .field("modulus_bits", &self.n.bits())
            .field("e", &self.e)
            .field("d", &"[REDACTED]")
            .finish()
    }
}

/// Generate a key pair with a modulus of about `bits` bits.
///
/// Fails with `InvalidParameter` when `bits < 256`, and with `KeyDerivation`
/// when the chosen exponent has no inverse (no partial pair is returned).
pub fn generate_keypair<R: RngCore + CryptoRng>(bits: u64, rng: &mut R) -> HscResult<RsaKeyPair> {
    if bits < MIN_MODULUS_BITS {
        return Err(HscError::InvalidParameter(format!(
            "modulus size {bits} bits is below the minimum of {MIN_MODULUS_BITS}"
        )));
    }

    let half = bits / 2;
    let p = prime_of_bits(half, rng);
    let mut q = prime_of_bits(bits - half, rng);
    while p == q {
        q = prime_of_bits(bits - half, rng);
    }

    let n = &p * &q;
    let phi = (&p - BigUint::one()) * (&q - BigUint::one());

    let e = choose_public_exponent(&phi, rng);
    let d = mod_inverse(&e, &phi).ok_or_else(|| {
        HscError::KeyDerivation("public exponent has no inverse modulo phi(n)".into())
    })?;

    debug!(bits, modulus_bits = n.bits(), e = %e, "generated RSA key pair");
    Ok(RsaKeyPair { n, e, d })
}

/// Random odd candidate with the top bit set, advanced to the next prime.
fn prime_of_bits<R: RngCore + CryptoRng>(bits: u64, rng: &mut R) -> BigUint {
    let mut candidate = random_bits(bits, rng);
    candidate |= BigUint::one();
    next_prime(&candidate, rng)
}

/// 65537 if coprime to `phi`, else random odd exponents in `[2, phi)`.
pub(crate) fn choose_public_exponent<R: RngCore + CryptoRng>(
    phi: &BigUint,
    rng: &mut R,
) -> BigUint {
    let e = BigUint::from(DEFAULT_PUBLIC_EXPONENT);
    if e.gcd(phi).is_one() {
        return e;
    }

    let two = BigUint::from(2u32);
    loop {
        let mut e = rng.gen_biguint_range(&two, phi);
        if e.is_even() {
            e += 1u32;
        }
        if e.gcd(phi).is_one() {
            debug!("65537 shares a factor with phi(n); using a random public exponent");
            return e;
        }
    }
}

/// `m^e mod n`. Requires `m < n`.
pub fn encrypt_integer(m: &BigUint, key: &RsaKeyPair) -> HscResult<BigUint> {
    if *m >= key.n {
        return Err(HscError::InvalidParameter(
            "message must be smaller than the modulus".into(),
        ));
    }
    Ok(m.modpow(&key.e, &key.n))
}

/// `c^d mod n`. Requires `c < n`.
pub fn decrypt_integer(c: &BigUint, key: &RsaKeyPair) -> HscResult<BigUint> {
    if *c >= key.n {
        return Err(HscError::InvalidParameter(
            "ciphertext must be smaller than the modulus".into(),
        ));
    }
    Ok(c.modpow(&key.d, &key.n))
}

/// Symmetric key material for one transfer. Drawn fresh per session.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey(BigUint);

impl SessionKey {
    /// Draw a session key of exactly `bits` bits.
    pub fn generate<R: RngCore + CryptoRng>(bits: u64, rng: &mut R) -> HscResult<Self> {
        if bits == 0 {
            return Err(HscError::InvalidParameter(
                "session key length must be at least 1 bit".into(),
            ));
        }
        Ok(Self(random_bits(bits, rng)))
    }

    pub fn from_integer(value: BigUint) -> Self {
        Self(value)
    }

    pub fn as_integer(&self) -> &BigUint {
        &self.0
    }

    pub fn bits(&self) -> u64 {
        self.0.bits()
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKey")
            .field("bits", &self.0.bits())
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// A session key encrypted under an RSA public exponent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedKey(BigUint);

impl WrappedKey {
    pub fn from_integer(value: BigUint) -> Self {
        Self(value)
    }

    pub fn as_integer(&self) -> &BigUint {
        &self.0
    }
}

/// Wrap (encrypt) a session key with the public half of `keypair`.
pub fn wrap_key(keypair: &RsaKeyPair, key: &SessionKey) -> HscResult<WrappedKey> {
    encrypt_integer(key.as_integer(), keypair).map(WrappedKey)
}

/// Unwrap (decrypt) a session key with the private half of `keypair`.
pub fn unwrap_key(keypair: &RsaKeyPair, wrapped: &WrappedKey) -> HscResult<SessionKey> {
    decrypt_integer(wrapped.as_integer(), keypair).map(SessionKey)
}

//! Entropy source, random integers, probable primes, modular inverse
//!
//! Every function takes its random source explicitly. There is no
//! process-wide generator: callers build one with [`entropy_rng`] and pass
//! it down.

use num_bigint::{BigInt, BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::rngs::StdRng;
use rand::{CryptoRng, RngCore, SeedableRng};

/// Miller-Rabin witnesses per candidate (error bound 4^-32)
const MILLER_RABIN_ROUNDS: usize = 32;

/// Trial divisors applied before Miller-Rabin
const SMALL_PRIMES: [u32; 54] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89,
    97, 101, 103, 107, 109, 113, 127, 131, 137, 139, 149, 151, 157, 163, 167, 173, 179, 181, 191,
    193, 197, 199, 211, 223, 227, 229, 233, 239, 241, 251,
];

/// Build the random source for key material.
///
/// `None` seeds from the operating system CSPRNG. `Some(seed)` gives a
/// reproducible stream for demos and tests; keys drawn from it are
/// predictable to anyone who knows the seed.
pub fn entropy_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => {
            tracing::warn!(seed, "deterministic RNG seed in use: not suitable for production keys");
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    }
}

/// Uniform integer with exactly `bits` significant bits (top bit forced).
///
/// `bits == 0` yields zero.
pub fn random_bits<R: RngCore + CryptoRng>(bits: u64, rng: &mut R) -> BigUint {
    if bits == 0 {
        return BigUint::zero();
    }
    let mut x = rng.gen_biguint(bits);
    x |= BigUint::one() << (bits - 1);
    x
}

/// Miller-Rabin probable-prime test with trial division by small primes.
pub fn is_probable_prime<R: RngCore + CryptoRng>(n: &BigUint, rng: &mut R) -> bool {
    let two = BigUint::from(2u32);
    if *n < two {
        return false;
    }
    for &p in SMALL_PRIMES.iter() {
        if *n == BigUint::from(p) {
            return true;
        }
        if (n % p).is_zero() {
            return false;
        }
    }

    let n_minus_one = n - BigUint::one();
    let s = n_minus_one.trailing_zeros().unwrap_or(0);
    let d = &n_minus_one >> s;

    'witness: for _ in 0..MILLER_RABIN_ROUNDS {
        let a = rng.gen_biguint_range(&two, &n_minus_one);
        let mut x = a.modpow(&d, n);
        if x.is_one() || x == n_minus_one {
            continue;
        }
        for _ in 1..s {
            x = x.modpow(&two, n);
            if x == n_minus_one {
                continue 'witness;
            }
            if x.is_one() {
                return false;
            }
        }
        return false;
    }
    true
}

/// Smallest probable prime greater than or equal to `from`.
///
/// Terminates for every input (primes are unbounded); the expected number of
/// candidates is about `ln(from) / 2`.
pub fn next_prime<R: RngCore + CryptoRng>(from: &BigUint, rng: &mut R) -> BigUint {
    let two = BigUint::from(2u32);
    if *from <= two {
        return two;
    }
    let mut candidate = from.clone();
    if candidate.is_even() {
        candidate += 1u32;
    }
    while !is_probable_prime(&candidate, rng) {
        candidate += 2u32;
    }
    candidate
}

/// Inverse of `a` modulo `m`, or `None` when `gcd(a, m) != 1`.
pub fn mod_inverse(a: &BigUint, m: &BigUint) -> Option<BigUint> {
    if m.is_zero() {
        return None;
    }
    let a = BigInt::from(a.clone());
    let m = BigInt::from(m.clone());

    let egcd = a.extended_gcd(&m);
    if !egcd.gcd.is_one() {
        return None;
    }
    egcd.x.mod_floor(&m).to_biguint()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0x5eed)
    }

    #[test]
    fn test_random_bits_exact_length() {
        let mut rng = rng();
        for bits in [1u64, 2, 7, 8, 63, 64, 65, 256, 1000] {
            for _ in 0..8 {
                assert_eq!(random_bits(bits, &mut rng).bits(), bits);
            }
        }
    }

    #[test]
    fn test_random_bits_zero() {
        assert!(random_bits(0, &mut rng()).is_zero());
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let a = random_bits(256, &mut entropy_rng(Some(9)));
        let b = random_bits(256, &mut entropy_rng(Some(9)));
        let c = random_bits(256, &mut entropy_rng(Some(10)));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_known_primes() {
        let mut rng = rng();
        for p in [2u64, 3, 5, 251, 257, 65537, 2_147_483_647, 2_305_843_009_213_693_951] {
            assert!(is_probable_prime(&BigUint::from(p), &mut rng), "{p} is prime");
        }
        let m127 = (BigUint::one() << 127u32) - BigUint::one();
        assert!(is_probable_prime(&m127, &mut rng), "2^127 - 1 is prime");
    }

    #[test]
    fn test_known_composites() {
        let mut rng = rng();
        // Carmichael numbers fool Fermat but not Miller-Rabin
        for c in [0u64, 1, 4, 561, 1105, 41041, 65535, 4_294_967_297] {
            assert!(!is_probable_prime(&BigUint::from(c), &mut rng), "{c} is composite");
        }
        let f7 = (BigUint::one() << 128u32) + BigUint::one();
        assert!(!is_probable_prime(&f7, &mut rng), "2^128 + 1 is composite");
    }

    #[test]
    fn test_next_prime() {
        let mut rng = rng();
        let cases = [(0u32, 2u32), (2, 2), (3, 3), (14, 17), (17, 17), (90, 97), (65536, 65537)];
        for (from, expected) in cases {
            assert_eq!(
                next_prime(&BigUint::from(from), &mut rng),
                BigUint::from(expected),
                "next_prime({from})"
            );
        }
    }

    #[test]
    fn test_mod_inverse() {
        assert_eq!(
            mod_inverse(&BigUint::from(3u32), &BigUint::from(11u32)),
            Some(BigUint::from(4u32))
        );
        assert_eq!(
            mod_inverse(&BigUint::from(17u32), &BigUint::from(3120u32)),
            Some(BigUint::from(2753u32))
        );
        assert_eq!(mod_inverse(&BigUint::from(6u32), &BigUint::from(9u32)), None);
        assert_eq!(mod_inverse(&BigUint::from(5u32), &BigUint::zero()), None);
    }

    proptest! {
        #[test]
        fn mod_inverse_is_inverse(a in 1u64..u64::MAX, m in 2u64..u64::MAX) {
            let a = BigUint::from(a);
            let m = BigUint::from(m);
            match mod_inverse(&a, &m) {
                Some(inv) => {
                    prop_assert!(inv < m);
                    prop_assert!(((&a * &inv) % &m).is_one());
                }
                None => prop_assert!(!a.gcd(&m).is_one()),
            }
        }
    }
}

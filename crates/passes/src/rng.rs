//! Per-pass randomness: each pass gets its own pseudo-random generator,
//! seeded from the system entropy pool or from an optional user seed for
//! deterministic tests; once seeded, a pass's output is reproducible.
//! Threading an explicit context through each transformer replaces the
//! reference implementation's process-wide `random` module state and
//! `replacements` dict.

use num_bigint::BigUint;
use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::{Rng, SeedableRng};

/// First character of a fresh identifier: letters, `$`, `_` -- never a digit.
const IDENT_START: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz$_";
/// Remaining characters of a fresh identifier.
const IDENT_CONT: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789$_";

/// A seeded RNG handed to exactly one pass invocation. CFF additionally
/// seeds its own per-function generator from this one.
pub struct PassContext {
    rng: StdRng,
}

impl PassContext {
    pub fn from_seed(seed: u64) -> PassContext {
        PassContext { rng: StdRng::seed_from_u64(seed) }
    }

    pub fn from_entropy() -> PassContext {
        PassContext { rng: StdRng::from_os_rng() }
    }

    /// A positive integer occupying exactly `bits - 1` bits, i.e. uniform
    /// over `[2^(bits-2), 2^(bits-1) - 1]`, matching the reference's
    /// `random_number(bits)`. OCONST's anchor constants and the blinding
    /// term `k` both use `bits = 128`, yielding 127-bit magnitudes.
    pub fn random_number(&mut self, bits: u32) -> BigUint {
        let lo = BigUint::from(1u32) << (bits - 2);
        let span = BigUint::from(1u32) << (bits - 2); // [lo, 2*lo - 1] has 2^(bits-2) values
        let offset = self.random_biguint_below(&span);
        lo + offset
    }

    /// Uniform `BigUint` in `[0, bound)`. Rejection-sampled over the
    /// smallest byte width that covers `bound`.
    pub fn random_biguint_below(&mut self, bound: &BigUint) -> BigUint {
        if bound.bits() == 0 {
            return BigUint::from(0u32);
        }
        let bytes = bound.bits().div_ceil(8) as usize;
        loop {
            let mut buf = vec![0u8; bytes];
            self.rng.fill(buf.as_mut_slice());
            let candidate = BigUint::from_bytes_be(&buf);
            if candidate < *bound {
                return candidate;
            }
        }
    }

    /// Uniform `u128` with the top bit set, i.e. `[2^127, 2^128 - 1]` --
    /// CFF's state-token range.
    pub fn random_state(&mut self) -> u128 {
        self.rng.random::<u128>() | (1u128 << 127)
    }

    /// Fresh identifier starting with a letter/`$`/`_`, matching the
    /// reference's `random_name`: a random start character followed by a
    /// sample (no repeats) of `length - 1` more identifier characters.
    pub fn random_name(&mut self, length: usize) -> String {
        let mut name = String::with_capacity(length);
        name.push(*IDENT_START.choose(&mut self.rng).unwrap() as char);
        let sample_size = (length.saturating_sub(1)).min(IDENT_CONT.len());
        let mut pool: Vec<u8> = IDENT_CONT.to_vec();
        pool.shuffle(&mut self.rng);
        for &byte in pool.iter().take(sample_size) {
            name.push(byte as char);
        }
        name
    }

    pub fn inner(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_number_is_within_the_documented_range() {
        let mut ctx = PassContext::from_seed(7);
        let lo = BigUint::from(1u32) << 126;
        let hi = (BigUint::from(1u32) << 127) - BigUint::from(1u32);
        for _ in 0..64 {
            let n = ctx.random_number(128);
            assert!(n >= lo && n <= hi, "{n} out of [2^126, 2^127-1]");
        }
    }

    #[test]
    fn random_name_starts_with_a_non_digit_and_has_the_requested_length() {
        let mut ctx = PassContext::from_seed(11);
        for _ in 0..32 {
            let name = ctx.random_name(16);
            assert_eq!(name.len(), 16);
            assert!(!name.chars().next().unwrap().is_ascii_digit());
        }
    }

    #[test]
    fn same_seed_reproduces_the_same_stream() {
        let mut a = PassContext::from_seed(42);
        let mut b = PassContext::from_seed(42);
        assert_eq!(a.random_name(10), b.random_name(10));
        assert_eq!(a.random_state(), b.random_state());
    }
}

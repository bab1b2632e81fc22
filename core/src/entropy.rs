// Seedable randomness service
//
// All random-number-driven control flow (metric jitter, log vocabulary
// picks, deployment outcomes, id tokens) goes through one Entropy handle
// so tests can inject a fixed seed and force deterministic behavior.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

const TOKEN_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

pub struct Entropy {
    rng: Mutex<StdRng>,
}

impl Entropy {
    /// OS-seeded source for production use
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic source for tests
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// `base` plus a uniform offset in `[-spread, spread]`
    pub fn jitter(&self, base: i64, spread: i64) -> i64 {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        base + rng.gen_range(-spread..=spread)
    }

    /// `base` plus a uniform offset in `[-spread, spread)`
    pub fn jitter_f(&self, base: f64, spread: f64) -> f64 {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        base + rng.gen_range(-spread..spread)
    }

    /// Uniform value in `[lo, hi)`
    pub fn range_f(&self, lo: f64, hi: f64) -> f64 {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.gen_range(lo..hi)
    }

    /// True with probability `p`. `p >= 1.0` always passes, `p <= 0.0`
    /// never does, which is how tests force outcomes.
    pub fn chance(&self, p: f64) -> bool {
        if p >= 1.0 {
            return true;
        }
        if p <= 0.0 {
            return false;
        }
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.gen::<f64>() < p
    }

    /// Uniform pick from a non-empty slice
    pub fn pick<'a, T>(&self, items: &'a [T]) -> &'a T {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        &items[rng.gen_range(0..items.len())]
    }

    /// Lowercase alphanumeric token, used for ids and commit hashes
    pub fn token(&self, len: usize) -> String {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        (0..len)
            .map(|_| TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())] as char)
            .collect()
    }
}

impl Default for Entropy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_sources_agree() {
        let a = Entropy::seeded(7);
        let b = Entropy::seeded(7);
        assert_eq!(a.token(7), b.token(7));
        assert_eq!(a.jitter(68, 10), b.jitter(68, 10));
    }

    #[test]
    fn jitter_stays_in_bounds() {
        let entropy = Entropy::seeded(42);
        for _ in 0..200 {
            let v = entropy.jitter(68, 10);
            assert!((58..=78).contains(&v), "jitter escaped bounds: {v}");
        }
    }

    #[test]
    fn chance_extremes_are_deterministic() {
        let entropy = Entropy::new();
        assert!(entropy.chance(1.0));
        assert!(!entropy.chance(0.0));
    }

    #[test]
    fn token_is_lowercase_alphanumeric() {
        let entropy = Entropy::seeded(1);
        let token = entropy.token(7);
        assert_eq!(token.len(), 7);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }
}

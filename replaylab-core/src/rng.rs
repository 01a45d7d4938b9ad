//! Deterministic per-symbol seeding.
//!
//! A master seed is expanded into one sub-seed per symbol via BLAKE3, so a
//! generated universe does not depend on the order symbols are requested in.

use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Debug, Clone, Copy)]
pub struct SeedTree {
    master_seed: u64,
}

impl SeedTree {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn sub_seed(&self, symbol: &str) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(symbol.as_bytes());
        let hash = hasher.finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(head)
    }

    pub fn rng_for(&self, symbol: &str) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(symbol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_seeds_are_deterministic() {
        let tree = SeedTree::new(42);
        assert_eq!(tree.sub_seed("SPY"), tree.sub_seed("SPY"));
    }

    #[test]
    fn symbols_and_masters_diverge() {
        let tree = SeedTree::new(42);
        assert_ne!(tree.sub_seed("SPY"), tree.sub_seed("QQQ"));
        assert_ne!(tree.sub_seed("SPY"), SeedTree::new(43).sub_seed("SPY"));
    }
}

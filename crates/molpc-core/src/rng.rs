//! RNG keys for reproducible sampling.
//!
//! A key is a `u64` seed. `into_rng` turns it into the ChaCha8 stream that
//! sampling calls consume, so two runs from the same key draw identical
//! samples however the request is chunked.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RngKey(pub u64);

impl RngKey {
    pub fn new(seed: u64) -> Self {
        RngKey(seed)
    }

    /// The random stream for this key.
    pub fn into_rng(self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.0)
    }
}

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use rand_distr::Uniform;

/// Base seed shared by everything that draws random numbers
/// main.rs sets it to the iteration index so repeated runs explore different streams
pub static RAND_SEED: AtomicU64 = AtomicU64::new(0);

/// When set, every clearing writes a CSV line at LogEvent::Auction
pub static VERBOSE_AUCTION: AtomicBool = AtomicBool::new(false);

/// Number of auctions cleared since the counter was last reset
pub static TOTAL_AUCTION_RUNS: AtomicU64 = AtomicU64::new(0);

/// Derive a seed for one random concern (group sampling, tie breaking, ...)
/// Different offsets give independent streams for the same base seed
pub fn get_seed(offset: u64) -> u64 {
    RAND_SEED.load(Ordering::Relaxed).wrapping_add(offset)
}

/// Uniform distribution over [low, high), falling back to a point mass when the range is empty
pub fn uniform_dist(low: f64, high: f64) -> Uniform<f64> {
    if high > low {
        Uniform::new(low, high)
    } else {
        Uniform::new_inclusive(low, low)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use rand_distr::Distribution;

    #[test]
    fn test_get_seed_offsets_base() {
        let base = RAND_SEED.load(Ordering::Relaxed);
        assert_eq!(get_seed(7), base.wrapping_add(7));
        assert_ne!(get_seed(1), get_seed(2));
    }

    #[test]
    fn test_uniform_dist_degenerate_range() {
        let mut rng = StdRng::seed_from_u64(3);
        let dist = uniform_dist(0.4, 0.4);
        for _ in 0..10 {
            assert_eq!(dist.sample(&mut rng), 0.4);
        }
        let dist = uniform_dist(0.1, 0.9);
        for _ in 0..100 {
            let x = dist.sample(&mut rng);
            assert!((0.1..0.9).contains(&x));
        }
    }
}

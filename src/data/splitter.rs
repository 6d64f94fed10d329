// ============================================================
// Layer 4 — Train/Validation/Test Splitter
// ============================================================
// Shuffles with a seeded RNG so the same seed always produces
// the same split, then cuts at
//
//   train_end = floor(n * train_ratio)
//   val_end   = train_end + floor(n * val_ratio)
//
// The test set takes whatever remains, so no item is ever lost.

use anyhow::{ensure, Result};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

#[derive(Debug, Clone, Copy)]
pub struct SplitRatios {
    pub train: f64,
    pub val:   f64,
    pub test:  f64,
}

impl Default for SplitRatios {
    fn default() -> Self {
        Self { train: 0.7, val: 0.2, test: 0.1 }
    }
}

impl SplitRatios {
    pub fn validate(&self) -> Result<()> {
        for (name, r) in [("train", self.train), ("val", self.val), ("test", self.test)] {
            ensure!((0.0..=1.0).contains(&r), "{name} ratio {r} is outside [0, 1]");
        }
        let sum = self.train + self.val + self.test;
        ensure!((sum - 1.0).abs() < 1e-6, "split ratios must sum to 1, got {sum}");
        Ok(())
    }
}

#[derive(Debug)]
pub struct Split<T> {
    pub train: Vec<T>,
    pub val:   Vec<T>,
    pub test:  Vec<T>,
}

pub fn split_dataset<T>(mut samples: Vec<T>, ratios: SplitRatios, seed: u64) -> Result<Split<T>> {
    ratios.validate()?;

    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total = samples.len();
    let train_end = ((total as f64) * ratios.train).floor() as usize;
    let val_end = (train_end + ((total as f64) * ratios.val).floor() as usize).min(total);

    let test = samples.split_off(val_end);
    let val = samples.split_off(train_end);

    tracing::debug!(
        "Dataset split: {} train, {} val, {} test",
        samples.len(),
        val.len(),
        test.len()
    );

    Ok(Split { train: samples, val, test })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_split_sizes() {
        let items: Vec<usize> = (0..100).collect();
        let split = split_dataset(items, SplitRatios::default(), 42).unwrap();
        assert_eq!(split.train.len(), 70);
        assert_eq!(split.val.len(), 20);
        assert_eq!(split.test.len(), 10);
    }

    #[test]
    fn test_floor_boundaries_keep_every_item() {
        let items: Vec<usize> = (0..11).collect();
        let split = split_dataset(items, SplitRatios::default(), 42).unwrap();
        // floor(7.7) = 7, floor(2.2) = 2, remainder 2
        assert_eq!((split.train.len(), split.val.len(), split.test.len()), (7, 2, 2));

        let mut all: Vec<usize> = split.train.into_iter().chain(split.val).chain(split.test).collect();
        all.sort();
        assert_eq!(all, (0..11).collect::<Vec<_>>());
    }

    #[test]
    fn test_same_seed_same_split() {
        let a = split_dataset((0..50).collect::<Vec<usize>>(), SplitRatios::default(), 7).unwrap();
        let b = split_dataset((0..50).collect::<Vec<usize>>(), SplitRatios::default(), 7).unwrap();
        assert_eq!(a.train, b.train);
        assert_eq!(a.test, b.test);
    }

    #[test]
    fn test_ratios_must_sum_to_one() {
        let ratios = SplitRatios { train: 0.8, val: 0.2, test: 0.1 };
        assert!(split_dataset(vec![1, 2, 3], ratios, 42).is_err());
    }

    #[test]
    fn test_empty_dataset() {
        let split = split_dataset(Vec::<usize>::new(), SplitRatios::default(), 42).unwrap();
        assert!(split.train.is_empty() && split.val.is_empty() && split.test.is_empty());
    }
}

use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::SamplerError;

/// Nearest non-empty bucket to `target`.
///
/// Searches outward by offset 1, 2, ..., trying `target + offset` before
/// `target - offset` at each step.
pub fn find_bucket<T>(buckets: &[Vec<T>], target: usize) -> Result<usize, SamplerError> {
    if target >= buckets.len() {
        return Err(SamplerError::InvalidBucket {
            target,
            buckets: buckets.len(),
        });
    }

    if !buckets[target].is_empty() {
        return Ok(target);
    }

    for offset in 1..buckets.len() {
        let up = target + offset;
        if up < buckets.len() && !buckets[up].is_empty() {
            return Ok(up);
        }
        if let Some(down) = target.checked_sub(offset) {
            if !buckets[down].is_empty() {
                return Ok(down);
            }
        }
    }

    Err(SamplerError::Exhausted)
}

/// Cycles through ordered buckets in random order without repeats.
///
/// Every element of a bucket is returned once per cycle. Entering a bucket
/// (or finishing a cycle) restarts it with a fresh shuffle.
#[derive(Debug, Clone)]
pub struct BucketSampler<T> {
    buckets: Vec<Vec<T>>,
    cursors: Vec<usize>,
    last_used: Option<usize>,
    rng: StdRng,
}

impl<T> BucketSampler<T> {
    pub fn new(buckets: Vec<Vec<T>>) -> Self {
        Self::with_rng(buckets, StdRng::from_entropy())
    }

    /// Deterministic sampler for reproducible runs
    pub fn with_seed(buckets: Vec<Vec<T>>, seed: u64) -> Self {
        Self::with_rng(buckets, StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(mut buckets: Vec<Vec<T>>, mut rng: StdRng) -> Self {
        for bucket in &mut buckets {
            bucket.shuffle(&mut rng);
        }
        let cursors = vec![0; buckets.len()];
        Self {
            buckets,
            cursors,
            last_used: None,
            rng,
        }
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn bucket_sizes(&self) -> Vec<usize> {
        self.buckets.iter().map(Vec::len).collect()
    }

    pub fn last_used(&self) -> Option<usize> {
        self.last_used
    }

    pub fn is_exhausted(&self) -> bool {
        self.buckets.iter().all(Vec::is_empty)
    }
}

impl<T: Clone> BucketSampler<T> {
    /// Next element for `target`, falling back to the nearest non-empty
    /// bucket. Returns the bucket actually used alongside the element.
    pub fn get_next(&mut self, target: usize) -> Result<(usize, T), SamplerError> {
        let chosen = find_bucket(&self.buckets, target)?;

        if self.last_used != Some(chosen) {
            debug!(
                "Bucket changed from {:?} to {}, reshuffling",
                self.last_used, chosen
            );
            self.cursors[chosen] = 0;
            self.buckets[chosen].shuffle(&mut self.rng);
            self.last_used = Some(chosen);
        }

        let item = self.buckets[chosen][self.cursors[chosen]].clone();
        self.cursors[chosen] += 1;

        if self.cursors[chosen] >= self.buckets[chosen].len() {
            debug!("Reached end of bucket {}, reshuffling", chosen);
            self.cursors[chosen] = 0;
            self.buckets[chosen].shuffle(&mut self.rng);
        }

        Ok((chosen, item))
    }

    /// One-off uniform pick with the same fallback, leaving cursors untouched
    pub fn pick_random(&mut self, target: usize) -> Result<(usize, T), SamplerError> {
        let chosen = find_bucket(&self.buckets, target)?;
        let item = self.buckets[chosen]
            .choose(&mut self.rng)
            .cloned()
            .ok_or(SamplerError::Exhausted)?;
        Ok((chosen, item))
    }
}

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::ImageRecord;

#[derive(Debug, Default)]
struct AggregateState {
    records: Vec<ImageRecord>,
    invalid: usize,
    // insertion order is display order
    group_counts: Vec<(String, usize)>,
}

/// Point-in-time counters for reporting
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateSnapshot {
    pub processed: usize,
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub group_counts: Vec<(String, usize)>,
}

/// Collects results from every worker.
///
/// All writes go through one mutex; the processed counter is also mirrored in
/// an atomic so the progress loop can poll it without taking the lock.
#[derive(Debug)]
pub struct ResultAggregator {
    state: Mutex<AggregateState>,
    processed: AtomicUsize,
    total: usize,
}

impl ResultAggregator {
    pub fn new(total: usize) -> Self {
        Self {
            state: Mutex::new(AggregateState {
                records: Vec::with_capacity(total),
                ..AggregateState::default()
            }),
            processed: AtomicUsize::new(0),
            total,
        }
    }

    /// Pre-register group names so live counters list them, zero included
    pub fn with_groups<I, S>(total: usize, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let aggregator = Self::new(total);
        {
            let mut state = aggregator.lock();
            state.group_counts = groups.into_iter().map(|name| (name.into(), 0)).collect();
        }
        aggregator
    }

    fn lock(&self) -> MutexGuard<'_, AggregateState> {
        // a worker that panicked mid-record cannot leave the vec half-written
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Publish one result. Safe to call from any worker.
    pub fn record(&self, record: ImageRecord) {
        let mut state = self.lock();

        if !record.result.is_valid() {
            state.invalid += 1;
        }

        if let Some(name) = record.result.group_name() {
            match state.group_counts.iter_mut().find(|(group, _)| group == name) {
                Some((_, count)) => *count += 1,
                None => state.group_counts.push((name.to_string(), 1)),
            }
        }

        state.records.push(record);
        self.processed.fetch_add(1, Ordering::Release);
    }

    /// Lock-free read used by the progress loop
    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::Acquire)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn snapshot(&self) -> AggregateSnapshot {
        let state = self.lock();
        let processed = state.records.len();
        AggregateSnapshot {
            processed,
            total: self.total,
            valid: processed - state.invalid,
            invalid: state.invalid,
            group_counts: state.group_counts.clone(),
        }
    }

    /// Take ownership of every record once the pool has finished
    pub fn into_records(self) -> Vec<ImageRecord> {
        match self.state.into_inner() {
            Ok(state) => state.records,
            Err(poisoned) => poisoned.into_inner().records,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClassificationResult;
    use std::path::Path;
    use std::sync::Arc;
    use std::thread;

    fn group(name: &str) -> ClassificationResult {
        ClassificationResult::GroupAssignment {
            group_name: name.to_string(),
            group_id: 1,
            score: 0.8,
        }
    }

    #[test]
    fn test_counts_follow_records() {
        let aggregator = ResultAggregator::with_groups(4, ["Blue_Cool", "Red_Warm"]);
        aggregator.record(ImageRecord::new(Path::new("a.jpg"), group("Red_Warm")));
        aggregator.record(ImageRecord::new(Path::new("b.jpg"), group("Red_Warm")));
        aggregator.record(ImageRecord::new(Path::new("c.jpg"), group("Earth_Tones")));
        aggregator.record(ImageRecord::new(
            Path::new("d.jpg"),
            ClassificationResult::Unreadable { reason: "bad".into() },
        ));

        let snapshot = aggregator.snapshot();
        assert_eq!(snapshot.processed, 4);
        assert_eq!(snapshot.invalid, 1);
        assert_eq!(snapshot.valid, 3);
        assert_eq!(
            snapshot.group_counts,
            vec![
                ("Blue_Cool".to_string(), 0),
                ("Red_Warm".to_string(), 2),
                ("Earth_Tones".to_string(), 1),
            ]
        );
        assert_eq!(aggregator.processed(), 4);
    }

    #[test]
    fn test_concurrent_records_are_all_kept() {
        let aggregator = Arc::new(ResultAggregator::new(800));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let aggregator = Arc::clone(&aggregator);
                thread::spawn(move || {
                    for i in 0..100 {
                        let path = format!("{}_{}.png", t, i);
                        aggregator.record(ImageRecord::new(
                            Path::new(&path),
                            ClassificationResult::DarknessScore { score: 0.5 },
                        ));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let aggregator = Arc::try_unwrap(aggregator).unwrap();
        assert_eq!(aggregator.processed(), 800);
        assert_eq!(aggregator.into_records().len(), 800);
    }
}

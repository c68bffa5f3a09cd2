//! Experience replay memory

use std::collections::VecDeque;

use rand::Rng;
use rand::seq::index;

/// One decision-to-decision transition
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: Vec<f32>,
    pub action: usize,
    pub reward: f64,
    pub next_state: Vec<f32>,
}

/// Bounded FIFO of transitions; the oldest sample is evicted when full
#[derive(Debug, Clone)]
pub struct ReplayMemory {
    samples: VecDeque<Transition>,
    size_max: usize,
    size_min: usize,
}

impl ReplayMemory {
    pub fn new(size_max: usize, size_min: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(size_max.min(4096)),
            size_max,
            size_min,
        }
    }

    pub fn add(&mut self, transition: Transition) {
        if self.size_max == 0 {
            return;
        }
        if self.samples.len() >= self.size_max {
            self.samples.pop_front();
        }
        self.samples.push_back(transition);
    }

    /// Up to `batch_size` distinct random samples.
    ///
    /// Empty until at least `size_min` samples have been stored.
    pub fn sample<R: Rng>(&self, batch_size: usize, rng: &mut R) -> Vec<&Transition> {
        if self.samples.len() < self.size_min {
            return Vec::new();
        }

        let amount = batch_size.min(self.samples.len());
        index::sample(rng, self.samples.len(), amount)
            .iter()
            .map(|i| &self.samples[i])
            .collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn transition(action: usize) -> Transition {
        Transition {
            state: vec![0.0; 4],
            action,
            reward: action as f64,
            next_state: vec![1.0; 4],
        }
    }

    #[test]
    fn test_sample_below_minimum_is_empty() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut memory = ReplayMemory::new(10, 5);
        for a in 0..4 {
            memory.add(transition(a));
        }
        assert!(memory.sample(2, &mut rng).is_empty());

        memory.add(transition(4));
        assert_eq!(memory.sample(2, &mut rng).len(), 2);
    }

    #[test]
    fn test_sample_is_capped_by_len() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut memory = ReplayMemory::new(10, 0);
        for a in 0..3 {
            memory.add(transition(a));
        }
        let batch = memory.sample(100, &mut rng);
        assert_eq!(batch.len(), 3);

        let mut actions: Vec<usize> = batch.iter().map(|t| t.action).collect();
        actions.sort();
        assert_eq!(actions, vec![0, 1, 2]);
    }

    #[test]
    fn test_oldest_sample_is_evicted() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut memory = ReplayMemory::new(3, 0);
        for a in 0..5 {
            memory.add(transition(a));
        }
        assert_eq!(memory.len(), 3);

        let mut actions: Vec<usize> = memory.sample(3, &mut rng).iter().map(|t| t.action).collect();
        actions.sort();
        assert_eq!(actions, vec![2, 3, 4]);
    }
}

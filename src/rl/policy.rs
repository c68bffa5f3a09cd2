//! Action selection - the predictor seam and exploration strategies

use std::error::Error;
use std::path::Path;

use rand::Rng;

/// Function approximator mapping a state vector to per-action values
pub trait Predictor {
    fn input_dim(&self) -> usize;

    fn output_dim(&self) -> usize;

    fn predict_one(&self, state: &[f32]) -> Vec<f32>;

    fn predict_batch(&self, states: &[Vec<f32>]) -> Vec<Vec<f32>>;

    /// Fit one step towards `targets`, returning the batch loss
    fn train_batch(&mut self, states: &[Vec<f32>], targets: &[Vec<f32>]) -> f32;

    fn save(&self, path: &Path) -> Result<(), Box<dyn Error>>;
}

/// How the agent turns predicted action values into a decision
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExplorationPolicy {
    /// Always take the highest valued action (evaluation)
    Greedy,
    /// Take a uniformly random action with probability `epsilon` (training)
    EpsilonGreedy { epsilon: f64 },
}

impl ExplorationPolicy {
    /// Linearly decaying exploration: fully random on the first episode
    pub fn for_episode(episode: usize, total_episodes: usize) -> Self {
        let epsilon = if total_episodes == 0 {
            0.0
        } else {
            1.0 - episode as f64 / total_episodes as f64
        };
        ExplorationPolicy::EpsilonGreedy {
            epsilon: epsilon.clamp(0.0, 1.0),
        }
    }

    pub fn epsilon(&self) -> f64 {
        match self {
            ExplorationPolicy::Greedy => 0.0,
            ExplorationPolicy::EpsilonGreedy { epsilon } => *epsilon,
        }
    }

    /// Pick an action in `0..num_actions`.
    ///
    /// `q_values` is only evaluated when the policy exploits.
    pub fn choose<R, F>(&self, num_actions: usize, rng: &mut R, q_values: F) -> usize
    where
        R: Rng,
        F: FnOnce() -> Vec<f32>,
    {
        if let ExplorationPolicy::EpsilonGreedy { epsilon } = self
            && num_actions > 0
            && rng.random::<f64>() < *epsilon
        {
            return rng.random_range(0..num_actions);
        }

        let q = q_values();
        argmax(&q[..q.len().min(num_actions)])
    }
}

/// Index of the largest value; ties and NaNs resolve to the lowest index
pub fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn test_argmax() {
        assert_eq!(argmax(&[0.1, 0.7, 0.3, -1.0]), 1);
        assert_eq!(argmax(&[2.0, 2.0, 1.0]), 0);
        assert_eq!(argmax(&[-3.0, -1.0, -2.0]), 1);
        assert_eq!(argmax(&[]), 0);
    }

    #[test]
    fn test_greedy_never_explores() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let action =
                ExplorationPolicy::Greedy.choose(4, &mut rng, || vec![0.0, 0.0, 5.0, 1.0]);
            assert_eq!(action, 2);
        }
    }

    #[test]
    fn test_full_exploration_skips_prediction() {
        let mut rng = StdRng::seed_from_u64(7);
        let policy = ExplorationPolicy::EpsilonGreedy { epsilon: 1.0 };
        let mut seen = [false; 4];
        for _ in 0..200 {
            let action = policy.choose(4, &mut rng, || panic!("predictor should not be queried"));
            seen[action] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_zero_epsilon_exploits() {
        let mut rng = StdRng::seed_from_u64(1);
        let policy = ExplorationPolicy::EpsilonGreedy { epsilon: 0.0 };
        for _ in 0..50 {
            assert_eq!(policy.choose(4, &mut rng, || vec![0.0, 1.0, 0.0, 0.0]), 1);
        }
    }

    #[test]
    fn test_epsilon_schedule() {
        assert_eq!(ExplorationPolicy::for_episode(0, 100).epsilon(), 1.0);
        assert!((ExplorationPolicy::for_episode(25, 100).epsilon() - 0.75).abs() < 1e-12);
        assert!((ExplorationPolicy::for_episode(99, 100).epsilon() - 0.01).abs() < 1e-12);
        assert_eq!(ExplorationPolicy::Greedy.epsilon(), 0.0);
    }
}

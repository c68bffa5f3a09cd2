//! DQN training loop - epsilon-greedy episodes followed by experience replay

use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::infra::{Simulator, SimulatorError};

use super::env::{EnvConfig, Simulation};
use super::memory::{ReplayMemory, Transition};
use super::metrics::SessionMetrics;
use super::policy::{ExplorationPolicy, Predictor};

/// Training configuration
#[derive(Debug, Clone)]
pub struct TrainConfig {
    /// Number of training episodes
    pub total_episodes: usize,
    /// Discount factor for the Q-learning target
    pub gamma: f32,
    /// Transitions per replay batch
    pub batch_size: usize,
    /// Replay rounds after each episode
    pub training_epochs: usize,
    /// Replay memory capacity
    pub memory_size_max: usize,
    /// Samples required before replay starts
    pub memory_size_min: usize,
    /// Seed for exploration and replay sampling; episode `e` runs the
    /// simulator with demand seed `seed + e`
    pub seed: Option<u64>,
    /// Environment config
    pub env_config: EnvConfig,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            total_episodes: 100,
            gamma: 0.75,
            batch_size: 100,
            training_epochs: 800,
            memory_size_max: 50000,
            memory_size_min: 600,
            seed: None,
            env_config: EnvConfig::default(),
        }
    }
}

/// Wall-clock time spent in one episode
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EpisodeTimings {
    pub simulation: Duration,
    pub training: Duration,
}

impl EpisodeTimings {
    pub fn total(&self) -> Duration {
        self.simulation + self.training
    }
}

/// Q-learning targets for a replay batch.
///
/// Each row starts from the current prediction; only the taken action is moved
/// to `reward + gamma * max_a' Q(next_state, a')`.
pub fn q_targets(
    batch: &[&Transition],
    q_values: Vec<Vec<f32>>,
    next_q_values: &[Vec<f32>],
    gamma: f32,
) -> Vec<Vec<f32>> {
    batch
        .iter()
        .zip(q_values)
        .zip(next_q_values)
        .map(|((transition, mut q), next_q)| {
            let best_next = next_q.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let best_next = if best_next.is_finite() { best_next } else { 0.0 };
            if let Some(value) = q.get_mut(transition.action) {
                *value = transition.reward as f32 + gamma * best_next;
            }
            q
        })
        .collect()
}

/// Trains a predictor by alternating simulated episodes and replay
pub struct Trainer<P: Predictor> {
    predictor: P,
    memory: ReplayMemory,
    simulation: Simulation,
    config: TrainConfig,
    metrics: SessionMetrics,
    rng: StdRng,
}

impl<P: Predictor> Trainer<P> {
    pub fn new(predictor: P, config: TrainConfig) -> Self {
        let memory = ReplayMemory::new(config.memory_size_max, config.memory_size_min);
        let simulation = Simulation::new(config.env_config.clone(), config.seed);
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
            None => StdRng::from_os_rng(),
        };

        Self {
            predictor,
            memory,
            simulation,
            config,
            metrics: SessionMetrics::new(10),
            rng,
        }
    }

    /// Run training episode `episode` (zero based) and the replay rounds after it
    pub async fn run_episode<S: Simulator>(
        &mut self,
        sim: &mut S,
        episode: usize,
    ) -> Result<EpisodeTimings, SimulatorError> {
        let policy = ExplorationPolicy::for_episode(episode, self.config.total_episodes);

        // Each episode gets its own traffic demand
        let demand_seed = self.config.seed.unwrap_or(0).wrapping_add(episode as u64);
        sim.set_seed(Some(demand_seed));

        let simulation = self
            .simulation
            .run(sim, &self.predictor, policy, Some(&mut self.memory))
            .await?;

        let summary = self.simulation.summary();
        self.metrics.record_episode(&summary);

        tracing::info!(
            "Total reward: {:.1} - Epsilon: {:.2} - Avg queue: {:.2}",
            summary.negative_reward,
            policy.epsilon(),
            summary.avg_queue_length
        );

        let training_start = Instant::now();
        let mut losses = 0.0;
        let mut rounds = 0;
        for _ in 0..self.config.training_epochs {
            if let Some(loss) = self.replay() {
                losses += loss;
                rounds += 1;
            }
        }
        if rounds > 0 {
            self.metrics.record_loss(losses / rounds as f32);
        } else {
            tracing::debug!(
                "Replay skipped: {} of {} required samples",
                self.memory.len(),
                self.config.memory_size_min
            );
        }

        Ok(EpisodeTimings {
            simulation,
            training: training_start.elapsed(),
        })
    }

    /// Run all configured episodes against one simulator
    pub async fn train<S: Simulator>(&mut self, sim: &mut S) -> Result<(), SimulatorError> {
        for episode in 0..self.config.total_episodes {
            tracing::info!(
                "----- Episode {} of {}",
                episode + 1,
                self.config.total_episodes
            );
            let timings = self.run_episode(sim, episode).await?;
            log_timings(&timings);
        }

        self.metrics.log_summary();
        Ok(())
    }

    /// One replay round. Returns the loss, or `None` when the memory is not
    /// yet large enough to sample from.
    pub fn replay(&mut self) -> Option<f32> {
        let batch = self.memory.sample(self.config.batch_size, &mut self.rng);
        if batch.is_empty() {
            return None;
        }

        let states: Vec<Vec<f32>> = batch.iter().map(|t| t.state.clone()).collect();
        let next_states: Vec<Vec<f32>> = batch.iter().map(|t| t.next_state.clone()).collect();

        let q_values = self.predictor.predict_batch(&states);
        let next_q_values = self.predictor.predict_batch(&next_states);
        let targets = q_targets(&batch, q_values, &next_q_values, self.config.gamma);

        Some(self.predictor.train_batch(&states, &targets))
    }

    pub fn predictor(&self) -> &P {
        &self.predictor
    }

    pub fn memory(&self) -> &ReplayMemory {
        &self.memory
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    pub fn metrics(&self) -> &SessionMetrics {
        &self.metrics
    }
}

fn log_timings(timings: &EpisodeTimings) {
    tracing::info!(
        "Simulation time: {:.1}s - Training time: {:.1}s - Total: {:.1}s",
        timings.simulation.as_secs_f64(),
        timings.training.as_secs_f64(),
        timings.total().as_secs_f64()
    );
}

//! Episode loop - drives one simulation run decision by decision

use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::infra::{Intersection, Simulator, SimulatorError};

use super::encoder::StateEncoder;
use super::memory::{ReplayMemory, Transition};
use super::phase::PhaseController;
use super::policy::{ExplorationPolicy, Predictor};
use super::waiting::{WaitingTimeTracker, reward};

/// Environment configuration
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// Simulated ticks per episode
    pub max_steps: usize,
    /// Ticks a chosen green phase is held
    pub green_duration: usize,
    /// Ticks of clearance between two different greens
    pub yellow_duration: usize,
    /// Length of the state vector
    pub num_states: usize,
    /// Number of green phases the agent chooses from
    pub num_actions: usize,
    /// Intersection layout
    pub layout: Intersection,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            max_steps: 5400,
            green_duration: 10,
            yellow_duration: 4,
            num_states: 80,
            num_actions: 4,
            layout: Intersection::default(),
        }
    }
}

/// Aggregates of one finished episode
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EpisodeSummary {
    /// Sum of the negative rewards
    pub negative_reward: f64,
    /// Halted vehicles summed over every tick (vehicle-seconds queued)
    pub cumulative_wait: f64,
    /// Mean halted vehicles per tick
    pub avg_queue_length: f64,
}

/// Single-intersection episode runner.
///
/// Owns the per-episode waiting-time table and telemetry; both are reset at the
/// start of every `run`.
pub struct Simulation {
    config: EnvConfig,
    encoder: StateEncoder,
    waiting: WaitingTimeTracker,
    phases: PhaseController,
    step: usize,
    reward_episode: Vec<f64>,
    queue_length_episode: Vec<u32>,
    cumulative_wait_episode: Vec<u64>,
    rng: StdRng,
}

impl Simulation {
    pub fn new(config: EnvConfig, seed: Option<u64>) -> Self {
        let encoder = StateEncoder::new(config.layout.clone(), config.num_states);
        let phases = PhaseController::new(config.layout.tls_id.clone());
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Self {
            config,
            encoder,
            waiting: WaitingTimeTracker::new(),
            phases,
            step: 0,
            reward_episode: Vec::new(),
            queue_length_episode: Vec::new(),
            cumulative_wait_episode: Vec::new(),
            rng,
        }
    }

    /// Run one full episode and return the wall-clock simulation time.
    ///
    /// With a replay memory, a transition is stored for every decision after the
    /// first. The simulator is closed on every exit path.
    pub async fn run<S, P>(
        &mut self,
        sim: &mut S,
        predictor: &P,
        policy: ExplorationPolicy,
        memory: Option<&mut ReplayMemory>,
    ) -> Result<Duration, SimulatorError>
    where
        S: Simulator,
        P: Predictor,
    {
        let start_time = Instant::now();
        self.reset();

        tracing::info!("Simulating (epsilon {:.3}) ...", policy.epsilon());

        let result = match sim.start().await {
            Ok(()) => self.run_decisions(sim, predictor, policy, memory).await,
            Err(err) => Err(err),
        };
        let closed = sim.close().await;

        match (result, closed) {
            (Err(err), Err(close_err)) => {
                tracing::warn!("Closing simulator after failure also failed: {}", close_err);
                Err(err)
            }
            (Err(err), Ok(())) | (Ok(()), Err(err)) => Err(err),
            (Ok(()), Ok(())) => {
                let elapsed = start_time.elapsed();
                tracing::debug!(
                    "Episode finished: {} decisions, {} ticks in {:.1}s",
                    self.reward_episode.len(),
                    self.step,
                    elapsed.as_secs_f64()
                );
                Ok(elapsed)
            }
        }
    }

    fn reset(&mut self) {
        self.step = 0;
        self.waiting.clear();
        self.phases.reset();
        self.reward_episode.clear();
        self.queue_length_episode.clear();
        self.cumulative_wait_episode.clear();
    }

    async fn run_decisions<S, P>(
        &mut self,
        sim: &mut S,
        predictor: &P,
        policy: ExplorationPolicy,
        mut memory: Option<&mut ReplayMemory>,
    ) -> Result<(), SimulatorError>
    where
        S: Simulator,
        P: Predictor,
    {
        let mut previous: Option<(Vec<f32>, usize)> = None;
        let mut previous_total = 0.0;

        while self.step < self.config.max_steps {
            let vehicles = sim.vehicles().await?;
            let state = self.encoder.encode(&vehicles);

            let current_total = self.waiting.collect(&self.config.layout, &vehicles);
            let reward = reward(previous_total, current_total);

            if let (Some(memory), Some((old_state, old_action))) =
                (memory.as_deref_mut(), previous.take())
            {
                memory.add(Transition {
                    state: old_state,
                    action: old_action,
                    reward,
                    next_state: state.clone(),
                });
            }

            let action = policy.choose(self.config.num_actions, &mut self.rng, || {
                predictor.predict_one(&state)
            });

            if let Some(previous_action) = self.phases.last_action()
                && self.phases.needs_yellow(action)
            {
                self.phases.set_yellow(sim, previous_action).await?;
                self.simulate(sim, self.config.yellow_duration).await?;
            }

            self.phases.set_green(sim, action).await?;
            self.simulate(sim, self.config.green_duration).await?;

            previous = Some((state, action));
            previous_total = current_total;
            self.reward_episode.push(reward);
        }

        Ok(())
    }

    /// Advance up to `steps_todo` ticks, never past `max_steps`, sampling the
    /// queue length after each one. Returns the number of ticks simulated.
    async fn simulate<S: Simulator>(
        &mut self,
        sim: &mut S,
        steps_todo: usize,
    ) -> Result<usize, SimulatorError> {
        let remaining = self.config.max_steps.saturating_sub(self.step);
        let steps = steps_todo.min(remaining);

        for _ in 0..steps {
            sim.step().await?;
            self.step += 1;

            let queue_length = self.queue_length(sim).await?;
            let cumulative = self.cumulative_wait_episode.last().copied().unwrap_or(0)
                + u64::from(queue_length);
            self.queue_length_episode.push(queue_length);
            self.cumulative_wait_episode.push(cumulative);
        }

        Ok(steps)
    }

    /// Halted vehicles over all monitored approaches
    async fn queue_length<S: Simulator>(&self, sim: &mut S) -> Result<u32, SimulatorError> {
        let mut total = 0;
        for edge in &self.config.layout.incoming_edges {
            total += sim.halting_number(edge).await?;
        }
        Ok(total)
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    /// Ticks simulated so far in the current episode
    pub fn step(&self) -> usize {
        self.step
    }

    pub fn reward_episode(&self) -> &[f64] {
        &self.reward_episode
    }

    pub fn queue_length_episode(&self) -> &[u32] {
        &self.queue_length_episode
    }

    pub fn cumulative_wait_episode(&self) -> &[u64] {
        &self.cumulative_wait_episode
    }

    pub fn summary(&self) -> EpisodeSummary {
        let negative_reward = self.reward_episode.iter().filter(|&&r| r < 0.0).sum();
        let cumulative_wait = self.cumulative_wait_episode.last().copied().unwrap_or(0) as f64;
        let avg_queue_length = if self.config.max_steps > 0 {
            cumulative_wait / self.config.max_steps as f64
        } else {
            0.0
        };

        EpisodeSummary {
            negative_reward,
            cumulative_wait,
            avg_queue_length,
        }
    }
}

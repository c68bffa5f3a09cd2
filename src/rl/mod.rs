//! Reinforcement Learning agent for a single signalised intersection
//!
//! This module provides the decision loop of a DQN traffic-light controller:
//! - Occupancy-grid state encoding of the approach lanes
//! - Reward from the change in accumulated waiting time
//! - Mandatory yellow clearance between different green phases
//! - Epsilon-greedy exploration with experience replay
//! - Burn framework Q-network (feature `rl`)
//!
//! # Architecture
//!
//! ```text
//! Simulator (vehicles, halting counts)
//!     │
//!     ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  StateEncoder / WaitingTimeTracker                          │
//! │  - 80-cell occupancy vector (8 lane groups x 10 cells)      │
//! │  - reward = previous total wait - current total wait        │
//! └─────────────────────────────────────────────────────────────┘
//!     │
//!     ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  ExplorationPolicy + Predictor                              │
//! │  - Greedy (evaluation) or EpsilonGreedy (training)          │
//! └─────────────────────────────────────────────────────────────┘
//!     │
//!     ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  PhaseController                                            │
//! │  - yellow 2a+1 when the action changes, then green 2a       │
//! └─────────────────────────────────────────────────────────────┘
//!     │
//!     ▼
//! Simulator (advance ticks, sample queue length)
//! ```

pub mod encoder;
pub mod env;
pub mod memory;
pub mod metrics;
#[cfg(feature = "rl")]
pub mod model;
pub mod phase;
pub mod policy;
pub mod train;
pub mod waiting;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use encoder::StateEncoder;
pub use env::{EnvConfig, EpisodeSummary, Simulation};
pub use memory::{ReplayMemory, Transition};
pub use metrics::{RecentEpisodes, SessionMetrics};
#[cfg(feature = "rl")]
pub use model::{DqnModel, ModelConfig, QNetwork};
pub use phase::PhaseController;
pub use policy::{ExplorationPolicy, Predictor, argmax};
pub use train::{EpisodeTimings, TrainConfig, Trainer};
pub use waiting::WaitingTimeTracker;

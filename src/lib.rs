pub mod config;
pub mod infra;
pub mod rl;

// Re-export commonly used types for convenience
pub use config::{ConfigError, Settings};
pub use infra::{Intersection, Simulator, SimulatorConnection, SimulatorError};
pub use rl::{ExplorationPolicy, Predictor, Simulation, Trainer};

// Re-export proto interface
pub mod simulator_interface {
    tonic::include_proto!("traffic.simulator");
}

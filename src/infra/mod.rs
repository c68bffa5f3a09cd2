mod connection;
mod intersection;
mod simulator;

pub use connection::{LaunchOptions, SimulatorConnection};
pub use intersection::Intersection;
pub use simulator::{Simulator, SimulatorError, VehicleInfo};

use std::error::Error;
use std::fmt;

use crate::simulator_interface::StartResult;

/// Snapshot of one live vehicle
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleInfo {
    pub id: String,
    pub lane_id: String,
    /// Position along the current lane, measured from the lane start
    pub lane_position: f64,
    /// Seconds spent below the halting speed, accumulated by the simulator
    pub accumulated_waiting_time: f64,
    pub road_id: String,
}

#[derive(Debug)]
pub enum SimulatorError {
    StartFailed { result: StartResult },
    NotStarted,
    Connect(tonic::transport::Error),
    Rpc(tonic::Status),
}

impl fmt::Display for SimulatorError {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SimulatorError::StartFailed { result } => {
                write!(formatter, "Start failed (result {})", result.as_str_name())
            }
            SimulatorError::NotStarted => write!(formatter, "Simulation is not running"),
            SimulatorError::Connect(err) => write!(formatter, "Connection failed: {}", err),
            SimulatorError::Rpc(status) => write!(formatter, "Simulator call failed: {}", status),
        }
    }
}

impl Error for SimulatorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SimulatorError::Connect(err) => Some(err),
            SimulatorError::Rpc(status) => Some(status),
            _ => None,
        }
    }
}

impl From<tonic::Status> for SimulatorError {
    fn from(status: tonic::Status) -> Self {
        SimulatorError::Rpc(status)
    }
}

impl From<tonic::transport::Error> for SimulatorError {
    fn from(err: tonic::transport::Error) -> Self {
        SimulatorError::Connect(err)
    }
}

/// Stepping/query interface of a microscopic traffic simulator.
///
/// The episode loop is the only writer: phase changes go through `set_phase`
/// and time only moves through `step`.
#[allow(async_fn_in_trait)]
pub trait Simulator {
    /// Launch a fresh simulation run
    async fn start(&mut self) -> Result<(), SimulatorError>;

    /// Seed of the traffic demand used by the next `start`
    fn set_seed(&mut self, _seed: Option<u64>) {}

    /// Advance the simulation by one tick
    async fn step(&mut self) -> Result<(), SimulatorError>;

    /// All vehicles currently in the network
    async fn vehicles(&mut self) -> Result<Vec<VehicleInfo>, SimulatorError>;

    /// Number of halted vehicles on an edge during the last tick
    async fn halting_number(&mut self, edge_id: &str) -> Result<u32, SimulatorError>;

    async fn set_phase(&mut self, tls_id: &str, phase: u32) -> Result<(), SimulatorError>;

    /// Release the running simulation. Must be safe to call more than once.
    async fn close(&mut self) -> Result<(), SimulatorError>;
}

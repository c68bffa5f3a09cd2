//! In-memory simulator double for episode tests

use crate::infra::{Simulator, SimulatorError, VehicleInfo};

type VehicleScript = Box<dyn Fn(usize) -> Vec<VehicleInfo>>;
type HaltingScript = Box<dyn Fn(usize, &str) -> u32>;

/// Scripted simulator: vehicles and halting counts are functions of the tick
pub struct ScriptedSimulator {
    pub tick: usize,
    pub running: bool,
    pub starts: usize,
    pub closes: usize,
    /// (tick at which the phase was set, phase code)
    pub phases: Vec<(usize, u32)>,
    /// Seeds requested before each start
    pub seeds: Vec<Option<u64>>,
    pub fail_start: bool,
    pub fail_step_at: Option<usize>,
    vehicles: VehicleScript,
    halting: HaltingScript,
}

impl ScriptedSimulator {
    pub fn new() -> Self {
        Self {
            tick: 0,
            running: false,
            starts: 0,
            closes: 0,
            phases: Vec::new(),
            seeds: Vec::new(),
            fail_start: false,
            fail_step_at: None,
            vehicles: Box::new(|_| Vec::new()),
            halting: Box::new(|_, _| 0),
        }
    }

    pub fn with_vehicles(mut self, script: impl Fn(usize) -> Vec<VehicleInfo> + 'static) -> Self {
        self.vehicles = Box::new(script);
        self
    }

    pub fn with_halting(mut self, script: impl Fn(usize, &str) -> u32 + 'static) -> Self {
        self.halting = Box::new(script);
        self
    }

    fn ensure_running(&self) -> Result<(), SimulatorError> {
        if self.running {
            Ok(())
        } else {
            Err(SimulatorError::NotStarted)
        }
    }
}

impl Simulator for ScriptedSimulator {
    fn set_seed(&mut self, seed: Option<u64>) {
        self.seeds.push(seed);
    }

    async fn start(&mut self) -> Result<(), SimulatorError> {
        self.starts += 1;
        if self.fail_start {
            return Err(SimulatorError::Rpc(tonic::Status::unavailable("no simulator")));
        }
        self.running = true;
        self.tick = 0;
        Ok(())
    }

    async fn step(&mut self) -> Result<(), SimulatorError> {
        self.ensure_running()?;
        if self.fail_step_at == Some(self.tick) {
            return Err(SimulatorError::Rpc(tonic::Status::internal("simulation crashed")));
        }
        self.tick += 1;
        Ok(())
    }

    async fn vehicles(&mut self) -> Result<Vec<VehicleInfo>, SimulatorError> {
        self.ensure_running()?;
        Ok((self.vehicles)(self.tick))
    }

    async fn halting_number(&mut self, edge_id: &str) -> Result<u32, SimulatorError> {
        self.ensure_running()?;
        Ok((self.halting)(self.tick, edge_id))
    }

    async fn set_phase(&mut self, _tls_id: &str, phase: u32) -> Result<(), SimulatorError> {
        self.ensure_running()?;
        self.phases.push((self.tick, phase));
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SimulatorError> {
        if self.running {
            self.closes += 1;
        }
        self.running = false;
        Ok(())
    }
}

pub fn vehicle(id: &str, lane_id: &str, lane_position: f64, wait: f64) -> VehicleInfo {
    VehicleInfo {
        id: id.to_string(),
        lane_id: lane_id.to_string(),
        lane_position,
        accumulated_waiting_time: wait,
        road_id: lane_id.rsplit_once('_').map(|(road, _)| road).unwrap_or(lane_id).to_string(),
    }
}

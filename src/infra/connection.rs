use tonic::transport::Channel;

use crate::simulator_interface::simulator_service_client::SimulatorServiceClient;
use crate::simulator_interface::{
    CloseRequest, EdgeHaltingRequest, SetPhaseRequest, StartRequest, StartResult, StepRequest,
    VehiclesRequest,
};

use super::simulator::{Simulator, SimulatorError, VehicleInfo};

/// Launch parameters forwarded to the simulator bridge on every `start`
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub config_file: String,
    pub gui: bool,
    pub max_steps: u32,
    pub seed: Option<u64>,
}

/// Simulator adapter talking to a simulation bridge over gRPC
pub struct SimulatorConnection {
    options: LaunchOptions,
    client: SimulatorServiceClient<Channel>,
    session_id: Option<String>,
}

impl SimulatorConnection {
    pub async fn new(host: &str, options: LaunchOptions) -> Result<Self, SimulatorError> {
        let client = SimulatorServiceClient::connect(format!("http://{}", host)).await?;
        Ok(SimulatorConnection {
            options,
            client,
            session_id: None,
        })
    }

    fn session(&self) -> Result<String, SimulatorError> {
        self.session_id.clone().ok_or(SimulatorError::NotStarted)
    }
}

impl Simulator for SimulatorConnection {
    fn set_seed(&mut self, seed: Option<u64>) {
        self.options.seed = seed;
    }

    async fn start(&mut self) -> Result<(), SimulatorError> {
        if self.session_id.is_some() {
            self.close().await?;
        }

        loop {
            let request = StartRequest {
                config_file: self.options.config_file.clone(),
                gui: self.options.gui,
                max_steps: self.options.max_steps,
                seed: self.options.seed,
            };
            let response = self.client.start(request).await?.into_inner();

            let result = StartResult::try_from(response.result)
                .unwrap_or(StartResult::LaunchFailed);

            match (result, response.session_id) {
                (StartResult::Ok, Some(session_id)) => {
                    tracing::debug!("Simulation session {} started", session_id);
                    self.session_id = Some(session_id);
                    return Ok(());
                }
                (StartResult::Busy, _) => {
                    tracing::info!("Simulator busy, retrying ...");
                }
                (StartResult::Ok, None) => {
                    return Err(SimulatorError::StartFailed {
                        result: StartResult::LaunchFailed,
                    });
                }
                (result, _) => {
                    return Err(SimulatorError::StartFailed { result });
                }
            }
        }
    }

    async fn step(&mut self) -> Result<(), SimulatorError> {
        let request = StepRequest {
            session_id: self.session()?,
        };
        self.client.step(request).await?;
        Ok(())
    }

    async fn vehicles(&mut self) -> Result<Vec<VehicleInfo>, SimulatorError> {
        let request = VehiclesRequest {
            session_id: self.session()?,
        };
        let response = self.client.vehicles(request).await?.into_inner();

        Ok(response
            .vehicles
            .into_iter()
            .map(|v| VehicleInfo {
                id: v.id,
                lane_id: v.lane_id,
                lane_position: v.lane_position,
                accumulated_waiting_time: v.accumulated_waiting_time,
                road_id: v.road_id,
            })
            .collect())
    }

    async fn halting_number(&mut self, edge_id: &str) -> Result<u32, SimulatorError> {
        let request = EdgeHaltingRequest {
            session_id: self.session()?,
            edge_id: edge_id.to_string(),
        };
        let response = self.client.edge_halting(request).await?.into_inner();
        Ok(response.halting)
    }

    async fn set_phase(&mut self, tls_id: &str, phase: u32) -> Result<(), SimulatorError> {
        let request = SetPhaseRequest {
            session_id: self.session()?,
            tls_id: tls_id.to_string(),
            phase,
        };
        self.client.set_phase(request).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SimulatorError> {
        // The session is forgotten even when the close call fails
        let Some(session_id) = self.session_id.take() else {
            return Ok(());
        };
        self.client.close(CloseRequest { session_id }).await?;
        Ok(())
    }
}

//! Signal phase state machine
//!
//! Phase codes alternate green and yellow per direction: action `a` is green
//! `2a` and its clearance phase is yellow `2a + 1`. A yellow is interposed
//! only between two different consecutive green actions.

use crate::infra::{Intersection, Simulator, SimulatorError};

#[derive(Debug, Clone)]
pub struct PhaseController {
    tls_id: String,
    phase: Option<u32>,
    last_action: Option<usize>,
}

impl PhaseController {
    pub fn new(tls_id: impl Into<String>) -> Self {
        Self {
            tls_id: tls_id.into(),
            phase: None,
            last_action: None,
        }
    }

    /// Forget the previous green; the next decision is treated as the first
    pub fn reset(&mut self) {
        self.phase = None;
        self.last_action = None;
    }

    pub fn phase(&self) -> Option<u32> {
        self.phase
    }

    pub fn last_action(&self) -> Option<usize> {
        self.last_action
    }

    /// Whether switching to `action` needs a clearance phase first.
    ///
    /// Never true for the first decision or when the action repeats.
    pub fn needs_yellow(&self, action: usize) -> bool {
        matches!(self.last_action, Some(previous) if previous != action)
    }

    pub async fn set_yellow<S: Simulator>(
        &mut self,
        sim: &mut S,
        previous_action: usize,
    ) -> Result<(), SimulatorError> {
        let code = Intersection::yellow_phase(previous_action);
        sim.set_phase(&self.tls_id, code).await?;
        self.phase = Some(code);
        Ok(())
    }

    pub async fn set_green<S: Simulator>(
        &mut self,
        sim: &mut S,
        action: usize,
    ) -> Result<(), SimulatorError> {
        let code = Intersection::green_phase(action);
        sim.set_phase(&self.tls_id, code).await?;
        self.phase = Some(code);
        self.last_action = Some(action);
        Ok(())
    }
}

//! State encoder for RL - converts the live vehicle set to an occupancy vector

use crate::infra::{Intersection, VehicleInfo};

/// State encoder for converting vehicle snapshots to flat feature vectors.
///
/// Each entry of the output is 1.0 when at least one vehicle occupies the
/// (lane group, distance cell) it stands for, 0.0 otherwise.
#[derive(Debug, Clone)]
pub struct StateEncoder {
    layout: Intersection,
    num_states: usize,
}

impl StateEncoder {
    pub fn new(layout: Intersection, num_states: usize) -> Self {
        Self { layout, num_states }
    }

    pub fn num_states(&self) -> usize {
        self.num_states
    }

    /// Flat index for one vehicle, or `None` when it is not on a monitored lane
    pub fn cell_index(&self, vehicle: &VehicleInfo) -> Option<usize> {
        let group = self.layout.lane_group(&vehicle.lane_id)?;
        let distance = self.layout.distance_to_stop_line(vehicle.lane_position);
        let cell = self.layout.distance_cell(distance)?;
        let index = self.layout.flat_index(group, cell);
        (index < self.num_states).then_some(index)
    }

    /// Encode the current vehicle set, rebuilt from scratch every call
    pub fn encode(&self, vehicles: &[VehicleInfo]) -> Vec<f32> {
        let mut state = vec![0.0; self.num_states];

        for index in vehicles.iter().filter_map(|v| self.cell_index(v)) {
            state[index] = 1.0;
        }

        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vehicle(id: &str, lane_id: &str, lane_position: f64) -> VehicleInfo {
        VehicleInfo {
            id: id.to_string(),
            lane_id: lane_id.to_string(),
            lane_position,
            accumulated_waiting_time: 0.0,
            road_id: lane_id.split('_').next().unwrap_or_default().to_string(),
        }
    }

    fn encoder() -> StateEncoder {
        StateEncoder::new(Intersection::default(), 80)
    }

    #[test]
    fn test_empty_network_encodes_zeros() {
        let state = encoder().encode(&[]);
        assert_eq!(state.len(), 80);
        assert!(state.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_vehicle_at_stop_line() {
        // 745m along a 750m lane is 5m from the stop line: first cell
        let state = encoder().encode(&[vehicle("a", "W2TL_0", 745.0)]);
        assert_eq!(state[0], 1.0);
        assert_eq!(state.iter().sum::<f32>(), 1.0);
    }

    #[test]
    fn test_group_and_cell_layout() {
        let enc = encoder();
        // N2TL_1 is group 3; 750 - 700 = 50m is cell 5
        assert_eq!(enc.cell_index(&vehicle("a", "N2TL_1", 700.0)), Some(35));
        // S2TL_1 is group 7; lane start is 750m away, last cell
        assert_eq!(enc.cell_index(&vehicle("b", "S2TL_1", 0.0)), Some(79));
        // E2TL_0 is group 4; 750 - 740 = 10m is cell 1
        assert_eq!(enc.cell_index(&vehicle("c", "E2TL_0", 740.0)), Some(41));
    }

    #[test]
    fn test_unrecognized_lane_is_dropped() {
        let enc = encoder();
        let state = enc.encode(&[vehicle("a", ":TL_0_0", 3.0), vehicle("b", "TL2N_0", 100.0)]);
        assert!(state.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_same_cell_collapses_to_one_bit() {
        let state = encoder().encode(&[
            vehicle("a", "E2TL_1", 745.0),
            vehicle("b", "E2TL_1", 747.5),
        ]);
        assert_eq!(state[50], 1.0);
        assert_eq!(state.iter().sum::<f32>(), 1.0);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let enc = encoder();
        let vehicles = vec![
            vehicle("a", "W2TL_1", 600.0),
            vehicle("b", "S2TL_0", 20.0),
            vehicle("c", "N2TL_0", 749.0),
        ];
        let first = enc.encode(&vehicles);
        let second = enc.encode(&vehicles);
        assert_eq!(first, second);
        assert_eq!(first.iter().sum::<f32>(), 3.0);
    }

    #[test]
    fn test_index_beyond_num_states_is_dropped() {
        let enc = StateEncoder::new(Intersection::default(), 40);
        assert_eq!(enc.cell_index(&vehicle("a", "S2TL_1", 745.0)), None);
        assert_eq!(enc.encode(&[vehicle("a", "S2TL_1", 745.0)]).len(), 40);
    }
}

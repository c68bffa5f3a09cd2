//! Waiting-time table of the monitored approaches and the reward derived from it

use std::collections::{HashMap, HashSet};

use crate::infra::{Intersection, VehicleInfo};

/// Accumulated waiting time of vehicles currently on a monitored approach.
///
/// A vehicle is forgotten as soon as it leaves the incoming edges or the
/// network, even though the simulator keeps counting its wait. If it comes back
/// it is re-added with whatever the simulator reports at that moment.
#[derive(Debug, Clone, Default)]
pub struct WaitingTimeTracker {
    waiting_times: HashMap<String, f64>,
}

impl WaitingTimeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.waiting_times.clear();
    }

    /// Update the table from a vehicle snapshot and return the current total
    pub fn collect(&mut self, layout: &Intersection, vehicles: &[VehicleInfo]) -> f64 {
        for vehicle in vehicles {
            if layout.is_incoming(&vehicle.road_id) {
                self.waiting_times
                    .insert(vehicle.id.clone(), vehicle.accumulated_waiting_time);
            } else {
                self.waiting_times.remove(&vehicle.id);
            }
        }

        let live: HashSet<&str> = vehicles.iter().map(|v| v.id.as_str()).collect();
        self.waiting_times.retain(|id, _| live.contains(id.as_str()));

        self.total()
    }

    pub fn total(&self) -> f64 {
        self.waiting_times.values().sum()
    }

    pub fn contains(&self, vehicle_id: &str) -> bool {
        self.waiting_times.contains_key(vehicle_id)
    }

    pub fn len(&self) -> usize {
        self.waiting_times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiting_times.is_empty()
    }
}

/// Reward for a decision point: positive when aggregate waiting went down
pub fn reward(previous_total: f64, current_total: f64) -> f64 {
    previous_total - current_total
}

#[cfg(test)]
mod tests {
    use super::*;

    fn on_road(id: &str, road_id: &str, wait: f64) -> VehicleInfo {
        VehicleInfo {
            id: id.to_string(),
            lane_id: format!("{}_0", road_id),
            lane_position: 100.0,
            accumulated_waiting_time: wait,
            road_id: road_id.to_string(),
        }
    }

    #[test]
    fn test_collect_sums_incoming_only() {
        let layout = Intersection::default();
        let mut tracker = WaitingTimeTracker::new();

        let total = tracker.collect(
            &layout,
            &[
                on_road("a", "N2TL", 3.0),
                on_road("b", "E2TL", 4.5),
                on_road("c", "TL2S", 20.0),
            ],
        );

        assert!((total - 7.5).abs() < 1e-9);
        assert_eq!(tracker.len(), 2);
        assert!(!tracker.contains("c"));
    }

    #[test]
    fn test_vehicle_leaving_is_forgotten() {
        let layout = Intersection::default();
        let mut tracker = WaitingTimeTracker::new();

        tracker.collect(&layout, &[on_road("a", "W2TL", 12.0)]);
        assert!(tracker.contains("a"));

        let total = tracker.collect(&layout, &[on_road("a", "TL2E", 12.0)]);
        assert!(!tracker.contains("a"));
        assert_eq!(total, 0.0);
    }

    #[test]
    fn test_vehicle_reentering_is_readded() {
        let layout = Intersection::default();
        let mut tracker = WaitingTimeTracker::new();

        tracker.collect(&layout, &[on_road("a", "S2TL", 5.0)]);
        tracker.collect(&layout, &[on_road("a", ":TL_1_0", 6.0)]);
        let total = tracker.collect(&layout, &[on_road("a", "S2TL", 9.0)]);

        assert!(tracker.contains("a"));
        assert!((total - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_vehicle_gone_from_network_is_forgotten() {
        let layout = Intersection::default();
        let mut tracker = WaitingTimeTracker::new();

        tracker.collect(&layout, &[on_road("a", "N2TL", 2.0), on_road("b", "E2TL", 1.0)]);
        let total = tracker.collect(&layout, &[on_road("b", "E2TL", 3.0)]);
        assert!(!tracker.contains("a"));
        assert!((total - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_reward_sign() {
        let totals = [100.0, 80.0, 95.0];
        let rewards: Vec<f64> = totals.windows(2).map(|w| reward(w[0], w[1])).collect();
        assert_eq!(rewards, vec![20.0, -15.0]);
    }
}

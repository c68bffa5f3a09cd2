/// Static layout of the controlled four-way intersection.
///
/// The lane-group table, approach length and distance-cell bounds are hand-tuned
/// values a trained network depends on. They are kept as data so a different
/// junction can be described without touching the encoder.
#[derive(Debug, Clone, PartialEq)]
pub struct Intersection {
    /// Traffic light id used for phase actuation
    pub tls_id: String,
    /// Monitored incoming approach edges
    pub incoming_edges: Vec<String>,
    /// Lane id to lane-group index, in group order
    pub lane_groups: Vec<String>,
    /// Length of each approach in meters
    pub lane_length: f64,
    /// Upper bounds of the distance cells, measured from the stop line
    pub cell_bounds: Vec<f64>,
}

impl Default for Intersection {
    fn default() -> Self {
        Self {
            tls_id: "TL".to_string(),
            incoming_edges: ["N2TL", "E2TL", "S2TL", "W2TL"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
            lane_groups: [
                "W2TL_0", "W2TL_1", "N2TL_0", "N2TL_1", "E2TL_0", "E2TL_1", "S2TL_0", "S2TL_1",
            ]
            .iter()
            .map(|l| l.to_string())
            .collect(),
            lane_length: 750.0,
            cell_bounds: vec![
                7.0, 14.0, 21.0, 28.0, 40.0, 60.0, 100.0, 160.0, 400.0, 750.0,
            ],
        }
    }
}

impl Intersection {
    pub fn num_groups(&self) -> usize {
        self.lane_groups.len()
    }

    pub fn cells_per_group(&self) -> usize {
        self.cell_bounds.len()
    }

    /// Size of the flattened (group, cell) index space
    pub fn num_cells(&self) -> usize {
        self.num_groups() * self.cells_per_group()
    }

    pub fn lane_group(&self, lane_id: &str) -> Option<usize> {
        self.lane_groups.iter().position(|l| l == lane_id)
    }

    pub fn is_incoming(&self, road_id: &str) -> bool {
        self.incoming_edges.iter().any(|e| e == road_id)
    }

    /// Distance from the stop line for a vehicle at `lane_position` along the lane
    pub fn distance_to_stop_line(&self, lane_position: f64) -> f64 {
        self.lane_length - lane_position
    }

    /// Bucket a stop-line distance into a cell.
    ///
    /// Cells are half-open `[prev, bound)` except the last, which also includes
    /// its upper bound. Distances outside `[0, last bound]` have no cell.
    pub fn distance_cell(&self, distance: f64) -> Option<usize> {
        if distance.is_nan() || distance < 0.0 {
            return None;
        }
        if let Some(cell) = self.cell_bounds.iter().position(|&bound| distance < bound) {
            return Some(cell);
        }
        match self.cell_bounds.last() {
            Some(&last) if distance <= last => Some(self.cell_bounds.len() - 1),
            _ => None,
        }
    }

    /// Flatten (group, cell) into a single state index.
    ///
    /// Layout contract: `group * cells_per_group + cell`. Group 0 maps to the
    /// bare cell index, and with ten cells the result equals the
    /// "group digit followed by cell digit" numbering older networks were trained on.
    pub fn flat_index(&self, group: usize, cell: usize) -> usize {
        group * self.cells_per_group() + cell
    }

    /// Green phase code for an action
    pub fn green_phase(action: usize) -> u32 {
        (action * 2) as u32
    }

    /// Yellow (clearance) phase code following the green of `action`
    pub fn yellow_phase(action: usize) -> u32 {
        (action * 2 + 1) as u32
    }
}

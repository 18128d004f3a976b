// Per-node samples of one field over the steps in which that field had data.
//
// Nodes are identified by their position in the dump, so `nodes[i]` is the
// series of node `i`. `times` is this field's own axis; velocity and pressure
// axes may differ when one field is missing from some steps.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FieldSeries {
    pub times: Vec<f64>,
    pub nodes: Vec<Vec<f64>>,
}

impl FieldSeries {
    /// Appends one step. Returns `false` when the step's node count differs
    /// from the nodes already seen, in which case columns no longer line up
    /// with `times`.
    pub fn push_step(&mut self, time: f64, samples: &[f64]) -> bool {
        let aligned = self.nodes.is_empty() || samples.len() == self.nodes.len();

        self.times.push(time);
        if samples.len() > self.nodes.len() {
            self.nodes.resize_with(samples.len(), Vec::new);
        }
        for (node, &value) in self.nodes.iter_mut().zip(samples) {
            node.push(value);
        }

        aligned
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn step_count(&self) -> usize {
        self.times.len()
    }

    pub fn value(&self, node: usize, step: usize) -> Option<f64> {
        self.nodes.get(node).and_then(|series| series.get(step)).copied()
    }
}

// Drag and lift coefficients logged by the solver, sorted by time
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ForceCoefficients {
    pub times: Vec<f64>,
    pub drag: Vec<f64>,
    pub lift: Vec<f64>,
}

impl ForceCoefficients {
    /// Builds the series from `(time, drag, lift)` triples in any order.
    /// Equal times keep their input order.
    pub fn from_samples(mut samples: Vec<(f64, f64, f64)>) -> Self {
        samples.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut coefficients = ForceCoefficients::default();
        for (time, drag, lift) in samples {
            coefficients.times.push(time);
            coefficients.drag.push(drag);
            coefficients.lift.push(lift);
        }
        coefficients
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// Constants for the drag estimate derived from the pressure spread of a step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragEstimate {
    pub density: f64,
    pub inlet_velocity: f64,
    pub area: f64,
}

impl Default for DragEstimate {
    fn default() -> Self {
        DragEstimate {
            density: 1.0,
            inlet_velocity: 1.0,
            area: 1.0,
        }
    }
}

impl DragEstimate {
    pub fn with_inlet_velocity(inlet_velocity: f64) -> Self {
        DragEstimate {
            inlet_velocity,
            ..Self::default()
        }
    }

    /// `2F / (rho U^2 A)` with `F = (p_max - p_min) A`. `None` for an empty step.
    pub fn coefficient(&self, pressures: &[f64]) -> Option<f64> {
        let (min, max) = pressures
            .iter()
            .fold(None, |acc: Option<(f64, f64)>, &p| match acc {
                None => Some((p, p)),
                Some((lo, hi)) => Some((lo.min(p), hi.max(p))),
            })?;

        let force = (max - min) * self.area;
        Some(2.0 * force / (self.density * self.inlet_velocity * self.inlet_velocity * self.area))
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct DragSeries {
    pub times: Vec<f64>,
    pub drag: Vec<f64>,
}

impl DragSeries {
    pub fn push(&mut self, time: f64, drag: f64) {
        self.times.push(time);
        self.drag.push(drag);
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

// Everything extracted from one case directory
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CaseData {
    pub velocity: FieldSeries,
    pub pressure: FieldSeries,
    pub forces: ForceCoefficients,
    pub drag_estimate: DragSeries,
}

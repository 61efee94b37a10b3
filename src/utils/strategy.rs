use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::component::{Evaluation, Objective, TrafficAssignment};


const P_MIN: f64 = 0.2;
const P_MAX: f64 = 0.8;

/// Where the annealing currently stands.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Schedule {
    pub temperature: f64,
    pub level: usize,
    pub levels: usize,
    pub tmax: f64,
}

/// Neighbour statistics of one chain over one temperature level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Counters {
    /// neighbours that dominated the current solution
    pub dominating: usize,
    /// neighbours incomparable to the current solution
    pub incomparable: usize,
    pub iterations: usize,
}

/// Switches steering the weighted neighbour selection.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Weights {
    /// 使用 viterbi 加權選擇，否則完全隨機
    pub use_weights: bool,
    pub use_delay: bool,
    pub use_hops: bool,
}

impl Default for Weights {
    fn default() -> Self {
        Weights { use_weights: true, use_delay: true, use_hops: true }
    }
}

impl Weights {
    /// How strongly a flow should be considered for rerouting.
    pub fn flow_weight(&self, assignment: &TrafficAssignment) -> f64 {
        match (self.use_delay, self.use_hops) {
            (true, true)   => assignment.delay_index() + assignment.hops_index(),
            (true, false)  => assignment.delay_index(),
            (false, true)  => assignment.hops_index(),
            (false, false) => 1.0,
        }
    }
}

pub type Probability = Arc<dyn Fn(&Schedule) -> f64 + Send + Sync>;
pub type Acceptance = Arc<dyn Fn(&Schedule, &Counters) -> f64 + Send + Sync>;
pub type Projection = Arc<dyn Fn(&Evaluation) -> Vec<f64> + Send + Sync>;

/// The replaceable functions the optimizer is parameterized with.
#[derive(Clone)]
pub struct Strategy {
    pub p_reassign_vnf: Probability,
    pub p_new_instance: Probability,
    pub accept_worse: Acceptance,
    pub accept_incomparable: Acceptance,
    pub objective_vector: Projection,
    pub unfeasible_vector: Projection,
    pub weights: Weights,
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy {
            p_reassign_vnf: Arc::new(p_reassign_vnf),
            p_new_instance: Arc::new(|schedule: &Schedule| p_reassign_vnf(schedule) / 2.0),
            accept_worse: Arc::new(|schedule: &Schedule, counters: &Counters| {
                let heat = schedule.temperature / schedule.tmax;
                f64::min(heat * 1.1 * quotient(counters.dominating, counters.iterations), 0.25)
            }),
            accept_incomparable: Arc::new(|schedule: &Schedule, counters: &Counters| {
                let heat = schedule.temperature / schedule.tmax;
                f64::min(heat * 1.2 * quotient(counters.dominating, counters.incomparable), 0.5)
            }),
            objective_vector: Arc::new(|eval: &Evaluation| vec![
                eval.get(Objective::MeanDelayIndex),
                eval.get(Objective::UsedResource(0)),
                eval.get(Objective::VnfInstances),
            ]),
            unfeasible_vector: Arc::new(|eval: &Evaluation| vec![
                eval.get(Objective::MeanDelayIndex),
                eval.get(Objective::MeanHopsIndex),
                eval.get(Objective::MeanInverseLoadIndex),
                eval.get(Objective::DelayViolations)
                    + eval.get(Objective::ResourceViolations)
                    + eval.get(Objective::CongestedLinks),
                eval.get(Objective::OverloadedVnfCapacity),
                eval.get(Objective::RootedExcessiveVnfCapacity),
            ]),
            weights: Weights::default(),
        }
    }
}

impl Strategy {
    pub fn with_weights(mut self, weights: Weights) -> Self {
        self.weights = weights;
        self
    }
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Strategy")
            .field("weights", &self.weights)
            .finish()
    }
}

/// Linear decrease from `P_MAX` to `P_MIN` between 20% and 80% of the levels.
fn p_reassign_vnf(schedule: &Schedule) -> f64 {
    let levels = schedule.levels.max(1) as f64;
    let (i1, i2) = (0.2 * levels, 0.8 * levels);
    let level = schedule.level as f64;
    let p = (i2 - level) / (i2 - i1) * (P_MAX - P_MIN) + P_MIN;
    num::clamp(p, P_MIN, P_MAX)
}

fn quotient(x: usize, y: usize) -> f64 {
    if y == 0 { 0.0 } else { x as f64 / y as f64 }
}

mod assignment;
mod evaluator;
mod frontier;
mod solution;

pub mod overview;

pub use assignment::{NodeAssignment, TrafficAssignment};
pub use evaluator::{Evaluation, Objective};
pub use frontier::{dominance, Frontier};
pub use solution::Solution;

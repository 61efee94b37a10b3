mod heap;
mod shortest;

pub use shortest::{Metric, ShortestPaths, Step, Tree};

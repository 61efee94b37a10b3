use std::cmp::Reverse;
use ordered_float::OrderedFloat;
use priority_queue::PriorityQueue;


pub type MyMinHeap<I> = PriorityQueue<I, Priority>;


/// Smaller cost pops first; equal costs pop by smaller tie-breaker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Priority (Reverse<(OrderedFloat<f64>, usize)>);

impl Priority {
    pub fn new(cost: f64, tie: usize) -> Self {
        Self (Reverse((OrderedFloat(cost), tie)))
    }
    pub fn cost(self) -> f64 {
        ((self.0).0).0.into_inner()
    }
}

use ordered_float::OrderedFloat;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;


/// 空集合的平均值為 0
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// The ((n-1)/2)-th smallest value, or 0 for no values.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by_key(|&x| OrderedFloat(x));
    sorted[(sorted.len() - 1) / 2]
}

pub fn max(values: &[f64]) -> f64 {
    values.iter().cloned().fold(0.0, f64::max)
}

/// Draws an index with probability proportional to its weight. Falls back to
/// a uniform draw when the weights cannot form a distribution (all zero, or
/// any negative or non-finite).
pub fn weighted_choice<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> Option<usize> {
    if weights.is_empty() {
        return None;
    }
    match WeightedIndex::new(weights) {
        Ok(dist) => Some(dist.sample(rng)),
        Err(_)   => Some(rng.gen_range(0..weights.len())),
    }
}

use once_cell::unsync::OnceCell;

use super::Solution;


/// +1 if `a` is nowhere larger than `b` and somewhere smaller, -1 for the
/// reverse, 0 if the vectors are equal or incomparable.
pub fn dominance(a: &[f64], b: &[f64]) -> i32 {
    debug_assert_eq!(a.len(), b.len());
    let mut smaller = false;
    let mut larger = false;
    for (x, y) in a.iter().zip(b) {
        if x < y {
            smaller = true;
        } else if x > y {
            larger = true;
        }
    }
    match (smaller, larger) {
        (true, false) => 1,
        (false, true) => -1,
        _             => 0,
    }
}


/// A set of mutually non-dominated solutions, compared by their frontier
/// vectors.
#[derive(Clone, Debug, Default)]
pub struct Frontier {
    members: Vec<Solution>,
    min: OnceCell<Vec<f64>>,
    max: OnceCell<Vec<f64>>,
}

impl Frontier {
    pub fn new() -> Self {
        Frontier::default()
    }
    /// Seeds a frontier from a small population by pairwise comparison. Of
    /// several equal vectors only the first survives.
    pub fn brute_force(solutions: Vec<Solution>) -> Self {
        let dominated: Vec<bool> = solutions.iter().enumerate()
            .map(|(i, s)| {
                let v = s.frontier_vector();
                solutions.iter().enumerate().any(|(j, other)| {
                    let w = other.frontier_vector();
                    dominance(w, v) == 1 || (j < i && w == v)
                })
            })
            .collect();
        let members = solutions.into_iter()
            .zip(dominated)
            .filter(|(_, dominated)| !dominated)
            .map(|(s, _)| s)
            .collect();
        Frontier { members, ..Default::default() }
    }
    /// Tries to insert `candidate`. Returns `None` if a member dominates or
    /// equals it, otherwise the members it pushed out.
    pub fn update(&mut self, candidate: Solution) -> Option<Vec<Solution>> {
        let vector = candidate.frontier_vector();
        let rejected = self.members.iter().any(|m| {
            let v = m.frontier_vector();
            v == vector || dominance(v, vector) == 1
        });
        if rejected {
            return None;
        }
        let mut removed = vec![];
        let mut i = 0;
        while i < self.members.len() {
            if dominance(vector, self.members[i].frontier_vector()) == 1 {
                removed.push(self.members.swap_remove(i));
            } else {
                i += 1;
            }
        }
        if removed.is_empty() {
            if let Some(min) = self.min.get_mut() {
                min.iter_mut().zip(vector).for_each(|(m, &x)| *m = m.min(x));
            }
            if let Some(max) = self.max.get_mut() {
                max.iter_mut().zip(vector).for_each(|(m, &x)| *m = m.max(x));
            }
        } else {
            self.min = OnceCell::new();
            self.max = OnceCell::new();
        }
        self.members.push(candidate);
        Some(removed)
    }
    /// Inserts every member of `other`.
    pub fn merge(&mut self, other: &Frontier) {
        for member in other.iter() {
            self.update(member.clone());
        }
    }
    /// Per-coordinate minimum over the members; empty for an empty frontier.
    pub fn get_min(&self) -> &[f64] {
        self.min.get_or_init(|| self.fold(f64::min))
    }
    pub fn get_max(&self) -> &[f64] {
        self.max.get_or_init(|| self.fold(f64::max))
    }
    fn fold(&self, f: fn(f64, f64) -> f64) -> Vec<f64> {
        let mut members = self.members.iter();
        let mut acc = match members.next() {
            Some(first) => first.frontier_vector().to_vec(),
            None        => return vec![],
        };
        for member in members {
            acc.iter_mut()
                .zip(member.frontier_vector())
                .for_each(|(a, &x)| *a = f(*a, x));
        }
        acc
    }
    pub fn feasible_subfront(&self) -> Vec<&Solution> {
        self.members.iter().filter(|s| s.is_feasible()).collect()
    }
    /// Euclidean distance between the objective vectors of two solutions.
    pub fn distance(a: &Solution, b: &Solution) -> f64 {
        a.objective_vector().iter()
            .zip(b.objective_vector())
            .map(|(x, y)| (x - y).powi(2))
            .sum::<f64>()
            .sqrt()
    }
    pub fn iter(&self) -> impl Iterator<Item=&Solution> {
        self.members.iter()
    }
    pub fn len(&self) -> usize {
        self.members.len()
    }
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
    pub fn into_vec(self) -> Vec<Solution> {
        self.members
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::algorithm::base::Metric;
    use crate::component::{Evaluation, Objective, TrafficAssignment};
    use crate::network::samples;
    use crate::utils::strategy::Strategy;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaChaRng;

    /// Solutions of the ring problem judged by two easily varied objectives.
    fn population(count: usize, seed: u64) -> Vec<Solution> {
        let problem = Arc::new(samples::ring());
        let mut strategy = Strategy::default();
        strategy.objective_vector = Arc::new(|eval: &Evaluation| vec![
            eval.get(Objective::TotalDelay),
            eval.get(Objective::VnfInstances),
        ]);
        let strategy = Arc::new(strategy);
        let mut rng = ChaChaRng::seed_from_u64(seed);
        let hosts = problem.host_nodes().to_vec();
        (0..count)
            .map(|_| {
                let assignments = problem.request_indices()
                    .map(|r| {
                        let order: Vec<_> = problem.request(r).chain.iter()
                            .map(|_| hosts[rng.gen_range(0..hosts.len())])
                            .collect();
                        TrafficAssignment::from_vnf_sequence(&problem, r, &order, Metric::Delay)
                            .unwrap()
                    })
                    .collect();
                Solution::new(Arc::clone(&problem), Arc::clone(&strategy), assignments).unwrap()
            })
            .collect()
    }

    fn assert_non_dominated(frontier: &Frontier) {
        for a in frontier.iter() {
            for b in frontier.iter() {
                assert_eq!(dominance(a.frontier_vector(), b.frontier_vector()), 0);
            }
        }
    }

    #[test]
    fn it_compares_vectors() {
        assert_eq!(dominance(&[1.0, 2.0], &[1.0, 3.0]), 1);
        assert_eq!(dominance(&[1.0, 3.0], &[1.0, 2.0]), -1);
        assert_eq!(dominance(&[1.0, 3.0], &[2.0, 2.0]), 0);
        assert_eq!(dominance(&[1.0, 2.0], &[1.0, 2.0]), 0);
    }

    #[test]
    fn it_is_antisymmetric() {
        let population = population(12, 1);
        for a in population.iter() {
            for b in population.iter() {
                let (a, b) = (a.frontier_vector(), b.frontier_vector());
                if a == b {
                    assert_eq!(dominance(a, b), 0);
                } else {
                    assert_eq!(dominance(a, b), -dominance(b, a));
                }
            }
        }
    }

    #[test]
    fn it_keeps_members_non_dominated() {
        let mut frontier = Frontier::new();
        for solution in population(40, 2) {
            frontier.update(solution);
            assert_non_dominated(&frontier);
        }
        assert!(!frontier.is_empty());
        let seeded = Frontier::brute_force(population(40, 2));
        assert_non_dominated(&seeded);
        assert_eq!(seeded.len(), frontier.len());
    }

    #[test]
    fn it_rejects_duplicates_and_dominated() {
        let solution = population(1, 3).remove(0);
        let mut frontier = Frontier::new();
        assert_eq!(frontier.update(solution.clone()).map(|r| r.len()), Some(0));
        assert!(frontier.update(solution.clone()).is_none());
        assert_eq!(frontier.len(), 1);

        let mut frontier = Frontier::new();
        for candidate in population(30, 4) {
            frontier.update(candidate);
        }
        let before: Vec<Vec<f64>> = frontier.iter().map(|s| s.frontier_vector().to_vec()).collect();
        for candidate in population(30, 4) {
            let dominated = frontier.iter()
                .any(|m| dominance(m.frontier_vector(), candidate.frontier_vector()) == 1);
            if dominated {
                assert!(frontier.update(candidate).is_none());
            }
        }
        let after: Vec<Vec<f64>> = frontier.iter().map(|s| s.frontier_vector().to_vec()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn it_caches_bounds() {
        let mut frontier = Frontier::new();
        assert!(frontier.get_min().is_empty());
        for solution in population(25, 5) {
            frontier.update(solution);
            let min = frontier.get_min().to_vec();
            let max = frontier.get_max().to_vec();
            for member in frontier.iter() {
                for (k, &x) in member.frontier_vector().iter().enumerate() {
                    assert!(min[k] <= x && x <= max[k]);
                }
            }
            assert_eq!(min, frontier.fold(f64::min));
            assert_eq!(max, frontier.fold(f64::max));
        }
        let feasible = frontier.feasible_subfront();
        assert!(feasible.iter().all(|s| s.is_feasible()));
        let first = frontier.iter().next().unwrap();
        assert_eq!(Frontier::distance(first, first), 0.0);
    }
}

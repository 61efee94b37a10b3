use std::collections::BTreeSet;
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;

use super::base::Metric;
use super::viterbi;
use crate::component::{Objective, Solution, TrafficAssignment};
use crate::network::{NodeIndex, RequestIndex, VnfIndex};
use crate::utils::error::{Error, Result};
use crate::utils::stats::weighted_choice;


/// Reroutes a single flow. Delay violators are picked first, then flows on
/// congested links, otherwise flows are drawn by their delay/hops indices.
pub fn replace_one_flow<R: Rng + ?Sized>(solution: &Solution, p_new: f64, rng: &mut R)
    -> Result<Solution> {
    let problem = solution.problem();
    let eval = solution.evaluation();
    let assignments: Vec<&Arc<TrafficAssignment>> = solution.assignments().collect();
    if assignments.is_empty() {
        return Ok(solution.clone());
    }

    let mut choices: Vec<&Arc<TrafficAssignment>> = vec![];
    if eval.get(Objective::DelayViolations) > 0.0 {
        choices = assignments.iter()
            .filter(|a| a.delay() > problem.request(a.request()).max_delay)
            .cloned()
            .collect();
    } else if eval.get(Objective::CongestedLinks) > 0.0 {
        choices = assignments.iter()
            .filter(|a| a.links().any(|l| solution.link(l).is_congested()))
            .cloned()
            .collect();
    }
    let draw = match choices.choose(rng) {
        Some(assignment) => assignment.request(),
        None => {
            let weights = solution.strategy().weights;
            let weights: Vec<f64> = assignments.iter()
                .map(|a| weights.flow_weight(a))
                .collect();
            match weighted_choice(&weights, rng) {
                Some(i) => assignments[i].request(),
                None    => return Ok(solution.clone()),
            }
        },
    };
    let removed = std::iter::once(draw).collect();
    reassign(solution, removed, p_new, rng)
}

/// Reroutes all flows of one vnf instance. Instances of types exceeding their
/// maximum count are picked first, then instances on overloaded nodes,
/// otherwise instances are drawn by the weights of the flows they serve.
pub fn replace_one_instance<R: Rng + ?Sized>(solution: &Solution, p_new: f64, rng: &mut R)
    -> Result<Solution> {
    let catalog = solution.problem().catalog();
    let eval = solution.evaluation();
    let instances: Vec<(NodeIndex, VnfIndex)> = solution.nodes()
        .flat_map(|(node, overview)| overview.all_instances()
            .filter(|(_, inst)| inst.count() > 0)
            .map(move |(vnf, _)| (node, vnf)))
        .collect();
    if instances.is_empty() {
        return replace_one_flow(solution, p_new, rng);
    }

    let mut choices: Vec<(NodeIndex, VnfIndex)> = vec![];
    if eval.get(Objective::ExcessiveVnfs) > 0.0 {
        choices = instances.iter()
            .filter(|&&(_, vnf)| catalog.vnf(vnf).max_instances
                .map_or(false, |max| solution.vnf_type(vnf).total() > max))
            .cloned()
            .collect();
    } else if eval.get(Objective::ResourceViolations) > 0.0 {
        choices = instances.iter()
            .filter(|&&(node, _)| solution.node(node).violates_resources())
            .cloned()
            .collect();
    }
    let (node, vnf) = match choices.choose(rng) {
        Some(&choice) => choice,
        None => {
            let weights: Vec<f64> = instances.iter()
                .map(|&(node, vnf)| instance_weight(solution, node, vnf))
                .collect();
            match weighted_choice(&weights, rng) {
                Some(i) => instances[i],
                None    => return Ok(solution.clone()),
            }
        },
    };
    replace_all_flows_of_instance(solution, node, vnf, p_new, rng)
}

/// Average weight of the flows applying `vnf` on `node`, times the number of
/// instances there.
fn instance_weight(solution: &Solution, node: NodeIndex, vnf: VnfIndex) -> f64 {
    let weights = solution.strategy().weights;
    let overview = solution.node(node);
    let flows: Vec<f64> = overview.placements(vnf).iter()
        .filter_map(|&(request, _)| solution.assignment(request))
        .map(|a| weights.flow_weight(a))
        .collect();
    if flows.is_empty() {
        return 0.0;
    }
    flows.iter().sum::<f64>() / flows.len() as f64 * overview.instance_count(vnf) as f64
}

/// 不斷移除隨機的流量，直到該節點上此類型的實例數量確實減少為止
fn replace_all_flows_of_instance<R: Rng + ?Sized>(solution: &Solution, node: NodeIndex,
                                                  vnf: VnfIndex, p_new: f64, rng: &mut R)
    -> Result<Solution> {
    let overview = solution.node(node);
    let original = overview.instance_count(vnf);
    let mut removed = BTreeSet::new();
    if original <= 1 {
        removed.extend(overview.placements(vnf).iter().map(|&(request, _)| request));
    } else {
        let mut copy = overview.clone();
        while copy.instance_count(vnf) == original {
            let request = match copy.placements(vnf).choose(rng) {
                Some(&(request, _)) => request,
                None                => break,
            };
            copy.remove_request(request);
            copy.refresh(solution.problem(), node);
            removed.insert(request);
        }
    }
    reassign(solution, removed, p_new, rng)
}

/// Drops the assignments of `removed` and derives new ones for them.
fn reassign<R: Rng + ?Sized>(solution: &Solution, removed: BTreeSet<RequestIndex>,
                             p_new: f64, rng: &mut R) -> Result<Solution> {
    let reduced = solution.remove_assignments(&removed)?;
    let requests: Vec<RequestIndex> = removed.into_iter().collect();
    if solution.strategy().weights.use_weights {
        viterbi::weighted_selection(&reduced, &requests, p_new, rng)
    } else {
        random_selection(&reduced, &requests, rng)
    }
}

/// Places every vnf of `requests` on a uniformly drawn host node and routes
/// along a randomly chosen metric.
pub fn random_selection<R: Rng + ?Sized>(solution: &Solution, requests: &[RequestIndex],
                                         rng: &mut R) -> Result<Solution> {
    let problem = Arc::clone(solution.problem());
    let hosts: Vec<NodeIndex> = if problem.host_nodes().is_empty() {
        problem.network().nodes().collect()
    } else {
        problem.host_nodes().to_vec()
    };
    let mut current = solution.clone();
    for &request in requests {
        let mut order = vec![];
        for _ in problem.request(request).chain.iter() {
            order.push(*hosts.choose(rng).ok_or(Error::NoHostNode)?);
        }
        let assignment = TrafficAssignment::from_vnf_sequence(
            &problem, request, &order, Metric::random(rng))?;
        current = current.add_assignments(vec![assignment])?;
    }
    Ok(current)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::samples;
    use crate::utils::strategy::{Strategy, Weights};
    use rand::SeedableRng;
    use rand_chacha::ChaChaRng;

    fn random_solution(weights: Weights, seed: u64) -> (Solution, ChaChaRng) {
        let problem = Arc::new(samples::ring());
        let strategy = Arc::new(Strategy::default().with_weights(weights));
        let mut rng = ChaChaRng::seed_from_u64(seed);
        let requests: Vec<_> = problem.request_indices().collect();
        let empty = Solution::empty(problem, strategy);
        let solution = random_selection(&empty, &requests, &mut rng).unwrap();
        (solution, rng)
    }

    fn changed(a: &Solution, b: &Solution) -> usize {
        a.problem().request_indices()
            .filter(|&r| a.assignment(r) != b.assignment(r))
            .count()
    }

    #[test]
    fn it_selects_random_hosts() {
        let (solution, _) = random_solution(Weights::default(), 1);
        assert!(solution.is_complete());
        let hosts = solution.problem().host_nodes();
        for assignment in solution.assignments() {
            assert!(assignment.hosts().iter().all(|h| hosts.contains(h)));
        }
    }

    #[test]
    fn it_replaces_one_flow() {
        for &use_weights in &[true, false] {
            let weights = Weights { use_weights, ..Default::default() };
            let (mut solution, mut rng) = random_solution(weights, 2);
            for _ in 0..30 {
                let neighbour = replace_one_flow(&solution, 0.3, &mut rng).unwrap();
                assert!(neighbour.is_complete());
                if !use_weights {
                    assert!(changed(&solution, &neighbour) <= 1);
                }
                solution = neighbour;
            }
        }
    }

    #[test]
    fn it_replaces_one_instance() {
        for &use_weights in &[true, false] {
            let weights = Weights { use_weights, ..Default::default() };
            let (mut solution, mut rng) = random_solution(weights, 3);
            for _ in 0..30 {
                let neighbour = replace_one_instance(&solution, 0.3, &mut rng).unwrap();
                assert!(neighbour.is_complete());
                assert_eq!(neighbour.assignments().count(), solution.assignments().count());
                solution = neighbour;
            }
        }
    }

    #[test]
    fn it_targets_delay_violations_first() {
        let (solution, mut rng) = random_solution(Weights { use_weights: false, ..Default::default() }, 4);
        let problem = Arc::clone(solution.problem());
        let violators: Vec<RequestIndex> = solution.assignments()
            .filter(|a| a.delay() > problem.request(a.request()).max_delay)
            .map(|a| a.request())
            .collect();
        if violators.is_empty() {
            return;
        }
        for _ in 0..20 {
            let neighbour = replace_one_flow(&solution, 0.0, &mut rng).unwrap();
            let moved: Vec<RequestIndex> = problem.request_indices()
                .filter(|&r| solution.assignment(r) != neighbour.assignment(r))
                .collect();
            assert!(moved.iter().all(|r| violators.contains(r)));
        }
    }

    #[test]
    fn it_keeps_empty_solution() {
        let problem = Arc::new(samples::line());
        let empty = Solution::empty(problem, Arc::new(Strategy::default()));
        let mut rng = ChaChaRng::seed_from_u64(5);
        let neighbour = replace_one_instance(&empty, 0.5, &mut rng).unwrap();
        assert_eq!(neighbour.assignments().count(), 0);
    }
}

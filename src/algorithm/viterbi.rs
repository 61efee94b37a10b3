use std::collections::BTreeSet;
use std::f64::INFINITY as INF;
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;

use super::base::Metric;
use crate::component::{Solution, TrafficAssignment};
use crate::network::{NodeIndex, Problem, RequestIndex, VnfIndex};
use crate::utils::error::{Error, Result};
use crate::utils::stats::{self, weighted_choice};
use crate::utils::strategy::Weights;


/// A node considered for one chain position, with the best delay and hop
/// count of any connection reaching it from the previous stage.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Candidate {
    node: NodeIndex,
    delay: f64,
    hops: f64,
}

/// Assigns `requests` one after another. For every chain position a stage of
/// candidate nodes is built forward, then the positions are drawn backward
/// from the egress, favouring nodes with low remaining delay and hops.
/// Afterwards, flows that would profit from the vnf instances created here
/// are moved onto them.
pub fn weighted_selection<R: Rng + ?Sized>(solution: &Solution, requests: &[RequestIndex],
                                           p_new: f64, rng: &mut R) -> Result<Solution> {
    let problem = Arc::clone(solution.problem());
    let weights = solution.strategy().weights;
    let mut current = solution.clone();
    let mut created: Vec<(NodeIndex, VnfIndex)> = vec![];

    for &request in requests {
        let req = problem.request(request);
        let mut force_new = false;
        let order = loop {
            let create_new = force_new || rng.gen::<f64>() <= p_new / requests.len() as f64;
            let stages = build_stages(&current, request, create_new)?;
            match backtrack(&problem, weights, request, &stages, create_new, rng) {
                Some(order) => break order,
                // 沒有任何節點滿足延遲限制，強制建立新實例後重來
                None if !create_new => force_new = true,
                None => return Err(Error::Unreachable(req.ingress.index(), req.egress.index())),
            }
        };

        let assignment = TrafficAssignment::from_vnf_sequence(
            &problem, request, &order, Metric::random(rng))?;
        let next = current.add_assignments(vec![assignment])?;
        for (&node, &vnf) in order.iter().zip(req.chain.iter()) {
            let before = current.node(node).instance_count(vnf);
            if next.node(node).instance_count(vnf) != before && !created.contains(&(node, vnf)) {
                created.push((node, vnf));
            }
        }
        current = next;
    }

    improve_flows(&current, &created)
}

/// Stage 0 holds the ingress alone, stage i + 1 the candidates of chain
/// position i.
fn build_stages(solution: &Solution, request: RequestIndex, create_new: bool)
    -> Result<Vec<Vec<Candidate>>> {
    let problem = solution.problem();
    let req = problem.request(request);
    let mut stages = vec![vec![Candidate { node: req.ingress, delay: 0.0, hops: 0.0 }]];
    for position in 0..req.chain.len() {
        let pair = match position {
            0 => None,
            _ => problem.catalog().pair_latency(req.chain[position - 1], req.chain[position]),
        };
        let mut stage = build_stage(solution, request, position, &stages[position], create_new, pair);
        if stage.is_empty() && pair.is_some() {
            stage = build_stage(solution, request, position, &stages[position], create_new, None);
        }
        if stage.is_empty() {
            return Err(Error::Unreachable(req.ingress.index(), req.egress.index()));
        }
        stages.push(stage);
    }
    Ok(stages)
}

/// Candidates for one chain position, from the first non-empty tier:
/// existing instances with room left, nodes whose remaining resources fit a
/// new instance, nodes whose total resources fit one, any node. With
/// `create_new` the third tier goes first.
fn build_stage(solution: &Solution, request: RequestIndex, position: usize,
               previous: &[Candidate], create_new: bool, pair: Option<f64>) -> Vec<Candidate> {
    let problem = solution.problem();
    let network = problem.network();
    let weights = solution.strategy().weights;
    let req = problem.request(request);
    let vnf_ix = req.chain[position];
    let vnf = problem.catalog().vnf(vnf_ix);

    let connect = |nodes: Vec<NodeIndex>| -> Vec<Candidate> {
        nodes.into_iter()
            .filter_map(|node| best_connection(problem, weights, previous, node, pair))
            .collect()
    };
    let capable = || -> Vec<NodeIndex> {
        network.nodes()
            .filter(|&n| vnf.fits(network.node(n).resources()))
            .collect()
    };

    let mut stage = vec![];
    if create_new {
        stage = connect(capable());
    }
    if stage.is_empty() {
        stage = connect(solution.vnf_type(vnf_ix).locations()
            .map(|(node, _)| node)
            .filter(|&node| solution.node(node).instances(vnf_ix)
                .map_or(false, |inst| inst.has_room(vnf.capacity, req.bandwidth)))
            .collect());
    }
    if stage.is_empty() {
        stage = connect(network.nodes()
            .filter(|&n| vnf.fits(solution.node(n).remaining()))
            .collect());
    }
    if stage.is_empty() {
        stage = connect(capable());
    }
    if stage.is_empty() {
        stage = connect(network.nodes().collect());
    }
    stage
}

/// The best way to reach `node` from any candidate of the previous stage.
/// With both or neither of delay and hops weighted, both are compared
/// normalized by their medians.
fn best_connection(problem: &Problem, weights: Weights, previous: &[Candidate],
                   node: NodeIndex, pair: Option<f64>) -> Option<Candidate> {
    let delays: Vec<f64> = previous.iter()
        .map(|p| p.delay + problem.distance(Metric::Delay, p.node, node))
        .collect();
    let hops: Vec<f64> = previous.iter()
        .map(|p| p.hops + problem.distance(Metric::Hops, p.node, node))
        .collect();

    let balanced = weights.use_delay == weights.use_hops;
    let (mut med_delay, mut med_hops) = (1.0, 1.0);
    if balanced {
        med_delay = stats::median(&delays);
        med_hops = stats::median(&hops);
        if med_delay == 0.0 { med_delay = 1.0; }
        if med_hops == 0.0 { med_hops = 1.0; }
    }

    let (mut best_delay, mut best_hops) = (INF, INF);
    for (j, prev) in previous.iter().enumerate() {
        if let Some(latency) = pair {
            if problem.distance(Metric::Delay, prev.node, node) > latency {
                continue;
            }
        }
        let better = (balanced
                && delays[j] / med_delay + hops[j] / med_hops < best_delay / med_delay + best_hops / med_hops)
            || (weights.use_hops && hops[j] < best_hops)
            || (weights.use_delay && delays[j] < best_delay);
        if better {
            best_delay = delays[j];
            best_hops = hops[j];
        }
    }
    if best_delay < INF && best_hops < INF {
        Some(Candidate { node, delay: best_delay, hops: best_hops })
    } else {
        None
    }
}

/// Draws the hosting nodes from the last chain position back to the first.
/// Returns `None` if some stage has no candidate within the delay limit and
/// no new instance may be created.
fn backtrack<R: Rng + ?Sized>(problem: &Problem, weights: Weights, request: RequestIndex,
                              stages: &[Vec<Candidate>], create_new: bool, rng: &mut R)
    -> Option<Vec<NodeIndex>> {
    let catalog = problem.catalog();
    let req = problem.request(request);
    let n = req.chain.len();
    let mut order = vec![req.egress; n];
    let mut delay_so_far: f64 = req.chain.iter().map(|&v| catalog.vnf(v).delay).sum();
    let mut hops_so_far = 0.0;

    for o in (1..=n).rev() {
        let last = if o < n { order[o] } else { req.egress };
        let mut pool: Vec<Candidate> = stages[o].iter()
            .map(|c| Candidate {
                node: c.node,
                delay: c.delay + delay_so_far + problem.distance(Metric::Delay, c.node, last),
                hops: c.hops + hops_so_far + problem.distance(Metric::Hops, c.node, last),
            })
            .collect();
        let within: Vec<Candidate> = pool.iter()
            .filter(|c| c.delay <= req.max_delay)
            .cloned()
            .collect();
        if within.is_empty() && !create_new {
            return None;
        }
        if !within.is_empty() {
            pool = within;
        }

        let min_delay = pool.iter()
            .map(|c| c.delay)
            .filter(|&d| d > 0.0)
            .fold(INF, f64::min);
        let min_delay = if min_delay < INF { min_delay } else { 1.0 };
        pool.shuffle(rng);
        for c in pool.iter_mut() {
            if c.delay == 0.0 { c.delay = min_delay / 2.0; }
            if c.hops == 0.0 { c.hops = 0.5; }
        }

        let draws: Vec<f64> = match (weights.use_delay, weights.use_hops) {
            (true, false)  => pool.iter().map(|c| 1.0 / c.delay).collect(),
            (false, true)  => pool.iter().map(|c| 1.0 / c.hops).collect(),
            (true, true)   => {
                let delays: Vec<f64> = pool.iter().map(|c| c.delay).collect();
                let hops: Vec<f64> = pool.iter().map(|c| c.hops).collect();
                let (med_delay, med_hops) = (stats::median(&delays), stats::median(&hops));
                pool.iter().map(|c| 1.0 / (c.delay / med_delay + c.hops / med_hops)).collect()
            },
            (false, false) => vec![1.0; pool.len()],
        };
        let chosen = pool[weighted_choice(&draws, rng)?].node;
        order[o - 1] = chosen;
        delay_so_far += problem.distance(Metric::Delay, chosen, last);
        hops_so_far += problem.distance(Metric::Hops, chosen, last);
    }
    Some(order)
}

/// Moves flows of the same vnf type from other nodes onto the freshly
/// created instances, whenever the new route is at least as good in delay
/// and in hops.
fn improve_flows(solution: &Solution, created: &[(NodeIndex, VnfIndex)]) -> Result<Solution> {
    let problem = Arc::clone(solution.problem());
    let mut current = solution.clone();

    for &(node, vnf) in created {
        let capacity = problem.catalog().vnf(vnf).capacity;
        // 實例可能已被後續的流量填入，取目前的負載
        let mut loads = match current.node(node).instances(vnf) {
            Some(instances) => instances.loads().to_vec(),
            None            => continue,
        };
        let mut removed = BTreeSet::new();
        let mut added = vec![];

        let others: Vec<NodeIndex> = current.vnf_type(vnf).locations()
            .map(|(other, _)| other)
            .filter(|&other| other != node)
            .collect();
        for other in others {
            for &(request, bandwidth) in current.node(other).placements(vnf) {
                if removed.contains(&request) {
                    continue;
                }
                let slot = match loads.iter().position(|&load| load + bandwidth <= capacity) {
                    Some(slot) => slot,
                    None       => continue,
                };
                let assignment = match current.assignment(request) {
                    Some(assignment) => assignment,
                    None             => continue,
                };
                let mut order = assignment.hosts();
                let chain = &problem.request(request).chain;
                let moved = order.iter().zip(chain.iter())
                    .position(|(&host, &v)| host == other && v == vnf);
                match moved {
                    Some(i) => order[i] = node,
                    None    => continue,
                }
                for &metric in &[Metric::Hops, Metric::Delay] {
                    let rerouted = TrafficAssignment::from_vnf_sequence(&problem, request, &order, metric)?;
                    if rerouted.delay() <= assignment.delay() && rerouted.hops() <= assignment.hops() {
                        removed.insert(request);
                        added.push(rerouted);
                        loads[slot] += bandwidth;
                        break;
                    }
                }
            }
        }

        if !removed.is_empty() {
            log::trace!("moved {} flows onto new instance at node {}", removed.len(), node.index());
            current = current.remove_assignments(&removed)?.add_assignments(added)?;
        }
    }
    Ok(current)
}

//! Deterministic and near-deterministic constructions of a single complete
//! solution, used to seed the annealing.

use std::collections::BTreeMap;
use std::f64::INFINITY as INF;
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;

use super::base::Metric;
use crate::component::overview::pack;
use crate::component::{Solution, TrafficAssignment};
use crate::network::{NodeIndex, Problem, RequestIndex, VnfIndex};
use crate::utils::error::{Error, Result};
use crate::utils::strategy::Strategy;


/// Puts the whole chain of every request on one random host node of its
/// least-delay detour over a single host. Ignores all capacities.
pub fn least_delay<R: Rng + ?Sized>(problem: &Arc<Problem>, strategy: &Arc<Strategy>,
                                    rng: &mut R) -> Result<Solution> {
    let hosts = problem.host_nodes();
    let mut assignments = vec![];
    for request in problem.request_indices() {
        let req = problem.request(request);
        if req.chain.is_empty() {
            assignments.push(TrafficAssignment::from_vnf_sequence(
                problem, request, &[], Metric::Delay)?);
            continue;
        }
        let middle = problem.best_stop(Metric::Delay, req.ingress, req.egress, hosts)
            .ok_or(Error::NoHostNode)?;
        let mut on_path: Vec<NodeIndex> = problem.path(Metric::Delay, req.ingress, middle)?
            .into_iter()
            .map(|(node, _)| node)
            .collect();
        on_path.extend(problem.path(Metric::Delay, middle, req.egress)?
            .into_iter()
            .skip(1)
            .map(|(node, _)| node));
        on_path.retain(|&node| problem.network().node(node).is_host());

        let pick = *on_path.choose(rng).ok_or(Error::NoHostNode)?;
        let order = vec![pick; req.chain.len()];
        assignments.push(TrafficAssignment::from_vnf_sequence(
            problem, request, &order, Metric::Delay)?);
    }
    Solution::new(Arc::clone(problem), Arc::clone(strategy), assignments)
}


/// A node of one layer of the per-request placement graph.
#[derive(Clone, Copy, Debug)]
enum Choice {
    Ingress,
    /// the i-th instance already distributed for the vnf type
    Existing(usize),
    /// a new instance on this node
    Fresh(NodeIndex),
}

#[derive(Clone, Copy, Debug)]
struct Layered {
    choice: Choice,
    node: NodeIndex,
    cost: f64,
    pred: usize,
}

/// Saves resources by reusing few, central instances. The instance count of
/// every type is packed as if all its flows shared one unbounded node. Each
/// instance then goes to the host crossed most often by the shortest detours
/// of the flows still unserved. Finally every request takes the least-delay
/// sequence of instances with room left, opening new ones where none fits.
pub fn centrality(problem: &Arc<Problem>, strategy: &Arc<Strategy>) -> Result<Solution> {
    let network = problem.network();
    let catalog = problem.catalog();
    let hosts = problem.host_nodes();

    let mut demands: BTreeMap<VnfIndex, Vec<(RequestIndex, f64)>> = BTreeMap::new();
    for request in problem.request_indices() {
        let req = problem.request(request);
        for &vnf in req.chain.iter() {
            demands.entry(vnf).or_default().push((request, req.bandwidth));
        }
    }
    if demands.is_empty() {
        log::debug!("no request demands any vnf, routing along shortest paths");
    }

    // 每條請求經過單一主機的最短路徑，以及路徑上各主機被經過的次數
    let mut weights: BTreeMap<VnfIndex, BTreeMap<NodeIndex, f64>> = BTreeMap::new();
    let mut shortest_flows: BTreeMap<VnfIndex, Vec<Arc<TrafficAssignment>>> = BTreeMap::new();
    for request in problem.request_indices() {
        let req = problem.request(request);
        if req.chain.is_empty() {
            continue;
        }
        let middle = problem.best_stop(Metric::Delay, req.ingress, req.egress, hosts)
            .ok_or(Error::NoHostNode)?;
        let order = vec![middle; req.chain.len()];
        let shortest = Arc::new(TrafficAssignment::from_vnf_sequence(
            problem, request, &order, Metric::Delay)?);
        for &vnf in req.chain.iter() {
            let counts = weights.entry(vnf).or_default();
            for step in shortest.path() {
                if network.node(step.node).is_host() {
                    *counts.entry(step.node).or_insert(0.0) += 1.0;
                }
            }
            let flows = shortest_flows.entry(vnf).or_default();
            if !flows.iter().any(|f| f.request() == request) {
                flows.push(Arc::clone(&shortest));
            }
        }
    }

    let mut used = vec![vec![0.0; catalog.dimensions()]; network.node_count()];
    let mut locations: BTreeMap<VnfIndex, Vec<(NodeIndex, f64)>> = BTreeMap::new();
    for (&vnf_ix, demand) in demands.iter() {
        let vnf = catalog.vnf(vnf_ix);
        let (loads, _) = pack(vnf.capacity, demand.clone());
        let counts = weights.entry(vnf_ix).or_default();
        let flows = shortest_flows.entry(vnf_ix).or_default();
        let slots = locations.entry(vnf_ix).or_default();

        for _ in 0..loads.len() {
            let fits = |node: NodeIndex| {
                used[node.index()].iter()
                    .zip(vnf.resources.iter())
                    .zip(network.node(node).resources())
                    .all(|((u, need), cap)| u + need <= *cap)
            };
            let location = heaviest(counts, fits)
                .or_else(|| heaviest(counts, |_| true))
                .ok_or(Error::NoHostNode)?;
            for (u, need) in used[location.index()].iter_mut().zip(vnf.resources.iter()) {
                *u += need;
            }
            slots.push((location, 0.0));

            // 這個實例預期服務的流量不再替路徑上的其他主機加權
            let mut bandwidth = 0.0;
            let mut i = 0;
            while i < flows.len() {
                bandwidth += problem.request(flows[i].request()).bandwidth;
                if bandwidth > vnf.capacity {
                    break;
                }
                if flows[i].path().iter().any(|step| step.node == location) {
                    for step in flows[i].path() {
                        if let Some(weight) = counts.get_mut(&step.node) {
                            *weight -= 1.0;
                        }
                    }
                    flows.remove(i);
                } else {
                    i += 1;
                }
            }
        }
    }

    let mut assignments = vec![];
    for request in problem.request_indices() {
        let order = cheapest_sequence(problem, request, &mut locations, &mut used)?;
        assignments.push(TrafficAssignment::from_vnf_sequence(
            problem, request, &order, Metric::Delay)?);
    }
    Solution::new(Arc::clone(problem), Arc::clone(strategy), assignments)
}

/// The accepted node of highest weight; the first one wins on ties.
fn heaviest<F: Fn(NodeIndex) -> bool>(counts: &BTreeMap<NodeIndex, f64>, accept: F)
    -> Option<NodeIndex> {
    let mut best: Option<(NodeIndex, f64)> = None;
    for (&node, &weight) in counts.iter() {
        if !accept(node) { continue; }
        if best.map_or(true, |(_, w)| weight > w) {
            best = Some((node, weight));
        }
    }
    best.map(|(node, _)| node)
}

/// Layered shortest path from the ingress over one candidate per chain
/// position to the egress. Updates the loads of the chosen instances and
/// the resources used by newly opened ones.
fn cheapest_sequence(problem: &Problem, request: RequestIndex,
                     locations: &mut BTreeMap<VnfIndex, Vec<(NodeIndex, f64)>>,
                     used: &mut [Vec<f64>]) -> Result<Vec<NodeIndex>> {
    let network = problem.network();
    let catalog = problem.catalog();
    let req = problem.request(request);
    let unreachable = || Error::Unreachable(req.ingress.index(), req.egress.index());

    let mut layers = vec![vec![Layered { choice: Choice::Ingress, node: req.ingress, cost: 0.0, pred: 0 }]];
    for (position, &vnf_ix) in req.chain.iter().enumerate() {
        let vnf = catalog.vnf(vnf_ix);
        let pair = match position {
            0 => None,
            _ => catalog.pair_latency(req.chain[position - 1], vnf_ix),
        };
        let slots = locations.get(&vnf_ix).map(|s| s.as_slice()).unwrap_or(&[]);

        let mut candidates: Vec<(Choice, NodeIndex)> = slots.iter().enumerate()
            .filter(|(_, &(_, load))| load + req.bandwidth <= vnf.capacity)
            .map(|(i, &(node, _))| (Choice::Existing(i), node))
            .collect();
        if candidates.is_empty() {
            candidates = network.nodes()
                .filter(|&n| used[n.index()].iter()
                    .zip(vnf.resources.iter())
                    .zip(network.node(n).resources())
                    .all(|((u, need), cap)| u + need <= *cap))
                .map(|n| (Choice::Fresh(n), n))
                .collect();
        }

        let previous = &layers[position];
        let mut layer = vec![];
        for repetition in 0..2 {
            // 容量不足時忽略資源限制，改用所有主機
            if candidates.is_empty() {
                candidates = problem.host_nodes().iter()
                    .map(|&n| (Choice::Fresh(n), n))
                    .collect();
            }
            if candidates.is_empty() {
                return Err(Error::NoHostNode);
            }
            layer = candidates.iter()
                .filter_map(|&(choice, node)| {
                    let mut best: Option<(f64, usize)> = None;
                    for (p, prev) in previous.iter().enumerate() {
                        let latency = problem.distance(Metric::Delay, prev.node, node);
                        if pair.map_or(false, |limit| latency > limit) {
                            continue;
                        }
                        let cost = prev.cost + latency;
                        if best.map_or(true, |(c, _)| cost < c) {
                            best = Some((cost, p));
                        }
                    }
                    best.map(|(cost, pred)| Layered { choice, node, cost, pred })
                })
                .collect();
            if !layer.is_empty() {
                break;
            }
            if repetition > 0 {
                return Err(unreachable());
            }
            candidates.clear();
        }
        layers.push(layer);
    }

    let last = &layers[layers.len() - 1];
    let mut end = None;
    let mut end_cost = INF;
    for (i, candidate) in last.iter().enumerate() {
        let cost = candidate.cost + problem.distance(Metric::Delay, candidate.node, req.egress);
        if cost < end_cost {
            end = Some(i);
            end_cost = cost;
        }
    }
    let mut index = end.ok_or_else(unreachable)?;

    let mut order = vec![req.ingress; req.chain.len()];
    for position in (0..req.chain.len()).rev() {
        let chosen = layers[position + 1][index];
        let vnf_ix = req.chain[position];
        let slots = locations.entry(vnf_ix).or_default();
        match chosen.choice {
            Choice::Existing(i) => slots[i].1 += req.bandwidth,
            Choice::Fresh(node) => {
                slots.push((node, req.bandwidth));
                for (u, need) in used[node.index()].iter_mut().zip(catalog.vnf(vnf_ix).resources.iter()) {
                    *u += need;
                }
            },
            Choice::Ingress => {},
        }
        order[position] = chosen.node;
        index = chosen.pred;
    }
    Ok(order)
}

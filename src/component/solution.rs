use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use itertools::Itertools;

use crate::network::{LinkIndex, NodeIndex, Problem, RequestIndex, VnfIndex};
use crate::utils::error::{Error, Result};
use crate::utils::strategy::Strategy;
use super::evaluator::{evaluate, Evaluation, Objective};
use super::overview::{LinkOverview, NodeOverview, VnfTypeOverview};
use super::TrafficAssignment;


/// 這個結構預期會被複製很多次，因此每個 overview 都以 `Arc` 共享，只有被
/// 新增或移除的流量碰到的項目才會被複製後修改
#[derive(Clone, Debug)]
pub struct Solution {
    problem: Arc<Problem>,
    strategy: Arc<Strategy>,
    assignments: Vec<Option<Arc<TrafficAssignment>>>,
    nodes: Vec<Arc<NodeOverview>>,
    links: Vec<Arc<LinkOverview>>,
    vnfs: Vec<Arc<VnfTypeOverview>>,
    evaluation: Evaluation,
    objective: Vec<f64>,
    unfeasible: Vec<f64>,
    frontier: Vec<f64>,
}

#[derive(Default)]
struct Touched {
    nodes: BTreeSet<NodeIndex>,
    links: BTreeSet<LinkIndex>,
}

impl Solution {
    /// A solution without any assignment.
    pub fn empty(problem: Arc<Problem>, strategy: Arc<Strategy>) -> Self {
        let network = problem.network();
        let nodes = network.nodes()
            .map(|n| Arc::new(NodeOverview::new(network.node(n).resources())))
            .collect();
        let links = network.links()
            .map(|l| Arc::new(LinkOverview::new(network.link(l).bandwidth())))
            .collect();
        let vnfs = problem.catalog().vnfs()
            .map(|_| Arc::new(VnfTypeOverview::default()))
            .collect();
        let assignments = vec![None; problem.requests().len()];
        let mut solution = Solution {
            problem, strategy, assignments, nodes, links, vnfs,
            evaluation: Evaluation::default(),
            objective: vec![],
            unfeasible: vec![],
            frontier: vec![],
        };
        solution.evaluate();
        solution
    }
    /// Builds a solution from scratch; every request needs exactly one
    /// assignment.
    pub fn new(problem: Arc<Problem>, strategy: Arc<Strategy>,
               assignments: Vec<TrafficAssignment>) -> Result<Self> {
        let solution = Solution::empty(problem, strategy)
            .add_assignments(assignments)?;
        if let Some(missing) = solution.assignments.iter().position(Option::is_none) {
            return Err(Error::MissingAssignment(missing));
        }
        Ok(solution)
    }
    /// Derives a child holding the parent's assignments plus `added`.
    pub fn add_assignments(&self, added: Vec<TrafficAssignment>) -> Result<Self> {
        let mut child = self.clone();
        let mut touched = Touched::default();
        for assignment in added {
            let request = assignment.request();
            match child.assignments.get(request.index()) {
                None          => return Err(Error::UnknownRequest(request.index())),
                Some(Some(_)) => return Err(Error::DuplicateAssignment(request.index())),
                Some(None)    => {},
            }
            let bandwidth = child.problem.request(request).bandwidth;
            for (node, vnf) in assignment.placements() {
                Arc::make_mut(&mut child.nodes[node.index()]).add(vnf, request, bandwidth);
                touched.nodes.insert(node);
            }
            for link in assignment.links() {
                Arc::make_mut(&mut child.links[link.index()]).add(request);
                touched.links.insert(link);
            }
            child.assignments[request.index()] = Some(Arc::new(assignment));
        }
        child.refresh(touched);
        Ok(child)
    }
    /// Derives a child without the assignments of `removed`.
    pub fn remove_assignments(&self, removed: &BTreeSet<RequestIndex>) -> Result<Self> {
        let mut child = self.clone();
        let mut touched = Touched::default();
        for &request in removed {
            let assignment = child.assignments.get_mut(request.index())
                .ok_or(Error::UnknownRequest(request.index()))?
                .take()
                .ok_or(Error::MissingAssignment(request.index()))?;
            for (node, _) in assignment.placements() {
                Arc::make_mut(&mut child.nodes[node.index()]).remove_request(request);
                touched.nodes.insert(node);
            }
            for link in assignment.links() {
                Arc::make_mut(&mut child.links[link.index()]).remove(request);
                touched.links.insert(link);
            }
        }
        child.refresh(touched);
        Ok(child)
    }
    fn refresh(&mut self, touched: Touched) {
        let problem = Arc::clone(&self.problem);
        for node in touched.nodes {
            let overview = Arc::make_mut(&mut self.nodes[node.index()]);
            let mut types: BTreeSet<VnfIndex> = overview.vnf_types().collect();
            overview.refresh(&problem, node);
            types.extend(overview.vnf_types());
            for vnf in types {
                let count = overview.instance_count(vnf);
                if self.vnfs[vnf.index()].count(node) != count {
                    Arc::make_mut(&mut self.vnfs[vnf.index()]).set(node, count);
                }
            }
        }
        for link in touched.links {
            Arc::make_mut(&mut self.links[link.index()]).refresh(&problem, link);
        }
        self.evaluate();
    }
    fn evaluate(&mut self) {
        self.evaluation = evaluate(self);
        self.objective = (self.strategy.objective_vector)(&self.evaluation);
        self.unfeasible = (self.strategy.unfeasible_vector)(&self.evaluation);
        self.frontier = self.objective.clone();
        self.frontier.push(self.evaluation.get(Objective::Unfeasible));
    }

    pub fn problem(&self) -> &Arc<Problem> {
        &self.problem
    }
    pub fn strategy(&self) -> &Arc<Strategy> {
        &self.strategy
    }
    pub fn assignment(&self, request: RequestIndex) -> Option<&Arc<TrafficAssignment>> {
        self.assignments.get(request.index()).and_then(Option::as_ref)
    }
    /// Present assignments in request order.
    pub fn assignments(&self) -> impl Iterator<Item=&Arc<TrafficAssignment>> {
        self.assignments.iter().filter_map(Option::as_ref)
    }
    pub fn is_complete(&self) -> bool {
        self.assignments.iter().all(Option::is_some)
    }
    pub fn node(&self, node: NodeIndex) -> &NodeOverview {
        &self.nodes[node.index()]
    }
    pub fn nodes(&self) -> impl Iterator<Item=(NodeIndex, &NodeOverview)> {
        self.nodes.iter().enumerate().map(|(i, ov)| (i.into(), ov.as_ref()))
    }
    pub fn link(&self, link: LinkIndex) -> &LinkOverview {
        &self.links[link.index()]
    }
    pub fn links(&self) -> impl Iterator<Item=(LinkIndex, &LinkOverview)> {
        self.links.iter().enumerate().map(|(i, ov)| (i.into(), ov.as_ref()))
    }
    pub fn vnf_type(&self, vnf: VnfIndex) -> &VnfTypeOverview {
        &self.vnfs[vnf.index()]
    }
    pub fn vnf_types(&self) -> impl Iterator<Item=(VnfIndex, &VnfTypeOverview)> {
        self.vnfs.iter().enumerate().map(|(i, ov)| (i.into(), ov.as_ref()))
    }
    pub fn evaluation(&self) -> &Evaluation {
        &self.evaluation
    }
    pub fn is_feasible(&self) -> bool {
        !self.evaluation.is_unfeasible()
    }
    pub fn objective_vector(&self) -> &[f64] {
        &self.objective
    }
    pub fn unfeasible_vector(&self) -> &[f64] {
        &self.unfeasible
    }
    /// The objective vector followed by the unfeasible flag; what the Pareto
    /// frontier compares.
    pub fn frontier_vector(&self) -> &[f64] {
        &self.frontier
    }
    pub fn csv_header(problem: &Problem) -> String {
        Objective::all(problem.catalog().dimensions()).iter()
            .map(|obj| obj.name(problem.catalog()))
            .join(",")
    }
    pub fn csv_row(&self) -> String {
        Objective::all(self.problem.catalog().dimensions()).iter()
            .map(|&obj| self.evaluation.get(obj))
            .join(",")
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let network = self.problem.network();
        let catalog = self.problem.catalog();
        let outcome = if self.is_feasible() { "feasible" } else { "unfeasible" };
        writeln!(f, "{} solution, objectives {:.2?}", outcome, self.objective)?;
        writeln!(f, "nodes")?;
        for (node, overview) in self.nodes() {
            if overview.vnf_types().next().is_none() { continue; }
            let instances: Vec<_> = overview.all_instances()
                .map(|(vnf, inst)| format!("{} x{} {:.0?}", catalog.vnf(vnf).name, inst.count(), inst.loads()))
                .collect();
            writeln!(f, "- node {} left {:.1?}: {}",
                     network.node(node).name(), overview.remaining(), instances.join(", "))?;
        }
        writeln!(f, "links")?;
        for (link, overview) in self.links() {
            if overview.requests().next().is_none() { continue; }
            let (end0, end1) = network.link(link).ends();
            let congested = if overview.is_congested() { " congested" } else { "" };
            writeln!(f, "- link {} -- {} left {:.1}{}", network.node(end0).name(),
                     network.node(end1).name(), overview.remaining(), congested)?;
        }
        writeln!(f, "flows")?;
        for assignment in self.assignments() {
            let request = self.problem.request(assignment.request());
            let route: Vec<_> = assignment.path().iter()
                .map(|step| match step.vnf {
                    Some(vnf) => format!("[{}:{}]", network.node(step.node).name(), catalog.vnf(vnf).name),
                    None      => network.node(step.node).name().to_owned(),
                })
                .collect();
            let outcome = if assignment.delay() > request.max_delay { "failed" } else { "ok" };
            writeln!(f, "- request #{:02} {} delay {:.2}/{:.2}: {}", assignment.request().index(),
                     outcome, assignment.delay(), request.max_delay, route.join(" -> "))?;
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::base::Metric;
    use crate::network::samples;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaChaRng;

    fn strategy() -> Arc<Strategy> {
        Arc::new(Strategy::default())
    }

    fn random_assignments(problem: &Problem, seed: u64) -> Vec<TrafficAssignment> {
        let mut rng = ChaChaRng::seed_from_u64(seed);
        let hosts = problem.host_nodes();
        problem.request_indices()
            .map(|r| {
                let order: Vec<_> = problem.request(r).chain.iter()
                    .map(|_| hosts[rng.gen_range(0..hosts.len())])
                    .collect();
                TrafficAssignment::from_vnf_sequence(problem, r, &order, Metric::random(&mut rng))
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn it_evaluates_line_example() {
        let problem = Arc::new(samples::line());
        let assignment = TrafficAssignment::from_vnf_sequence(
            &problem, 0.into(), &[1.into()], Metric::Delay).unwrap();
        assert_eq!(assignment.delay(), 10.0 + 5.0 + 10.0);
        let solution = Solution::new(problem, strategy(), vec![assignment]).unwrap();
        let eval = solution.evaluation();
        assert!(solution.is_feasible());
        assert_eq!(eval.get(Objective::VnfInstances), 1.0);
        assert_eq!(eval.get(Objective::UsedResource(0)), 1.0);
        assert_eq!(eval.get(Objective::TotalDelay), 25.0);
        assert_eq!(eval.get(Objective::MeanInverseLoadIndex), 5.0);
        assert_eq!(solution.objective_vector(), &[1.0, 1.0, 1.0]);
        assert_eq!(solution.frontier_vector(), &[1.0, 1.0, 1.0, 0.0]);
        assert_eq!(solution.link(0.into()).remaining(), 900.0);
        assert_eq!(solution.vnf_type(0.into()).count(1.into()), 1);
        assert!(solution.to_string().contains("A -> [B:firewall] -> C"));
    }

    #[test]
    fn it_flags_delay_violation() {
        let problem = Arc::new(samples::ring());
        let assignments = random_assignments(&problem, 7);
        let solution = Solution::new(Arc::clone(&problem), strategy(), assignments).unwrap();
        let violations = solution.assignments()
            .filter(|a| a.delay() > problem.request(a.request()).max_delay)
            .count();
        assert_eq!(solution.evaluation().get(Objective::DelayViolations), violations as f64);
        if violations > 0 {
            assert!(!solution.is_feasible());
        }
    }

    #[test]
    fn it_rejects_incomplete_assignments() {
        let problem = Arc::new(samples::line());
        let result = Solution::new(Arc::clone(&problem), strategy(), vec![]);
        assert!(matches!(result, Err(Error::MissingAssignment(0))));
        let assignment = TrafficAssignment::from_vnf_sequence(
            &problem, 0.into(), &[1.into()], Metric::Hops).unwrap();
        let result = Solution::new(problem, strategy(), vec![assignment.clone(), assignment]);
        assert!(matches!(result, Err(Error::DuplicateAssignment(0))));
    }

    #[test]
    fn it_round_trips_add_and_remove() {
        let problem = Arc::new(samples::ring());
        for seed in 0..8 {
            let assignments = random_assignments(&problem, seed);
            let full = Solution::new(Arc::clone(&problem), strategy(), assignments.clone()).unwrap();
            let subset: BTreeSet<RequestIndex> = problem.request_indices()
                .filter(|r| (r.index() + seed as usize) % 3 == 0)
                .collect();
            let partial = full.remove_assignments(&subset).unwrap();
            assert!(!partial.is_complete());
            let added: Vec<_> = assignments.iter()
                .filter(|a| subset.contains(&a.request()))
                .cloned()
                .collect();
            let again = partial.add_assignments(added).unwrap();
            assert_eq!(again.evaluation(), full.evaluation());
            assert_eq!(again.frontier_vector(), full.frontier_vector());
            assert_eq!(again.unfeasible_vector(), full.unfeasible_vector());
            let back = again.remove_assignments(&subset).unwrap();
            assert_eq!(back.evaluation(), partial.evaluation());
            for (node, overview) in back.nodes() {
                assert_eq!(overview, partial.node(node));
            }
        }
    }

    #[test]
    fn it_shares_untouched_overviews() {
        let problem = Arc::new(samples::ring());
        let assignments = random_assignments(&problem, 3);
        let full = Solution::new(Arc::clone(&problem), strategy(), assignments).unwrap();
        let removed: BTreeSet<RequestIndex> = vec![4.into()].into_iter().collect();
        // request #04 has no vnfs, so no node overview is touched
        let child = full.remove_assignments(&removed).unwrap();
        for i in 0..problem.network().node_count() {
            assert!(Arc::ptr_eq(&child.nodes[i], &full.nodes[i]));
        }
        for i in 0..problem.catalog().len() {
            assert!(Arc::ptr_eq(&child.vnfs[i], &full.vnfs[i]));
        }
        assert!(child.assignment(4.into()).is_none());
        let result = child.remove_assignments(&removed);
        assert!(matches!(result, Err(Error::MissingAssignment(4))));
    }

    #[test]
    fn it_writes_csv() {
        let problem = Arc::new(samples::ring());
        let header = Solution::csv_header(&problem);
        assert!(header.contains("TOTAL_USED_CPU,TOTAL_USED_RAM"));
        let solution = Solution::new(Arc::clone(&problem), strategy(),
                                     random_assignments(&problem, 1)).unwrap();
        assert_eq!(solution.csv_row().split(',').count(), header.split(',').count());
    }
}

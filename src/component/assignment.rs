use crate::algorithm::base::Metric;
use crate::network::{LinkIndex, Network, NodeIndex, Problem, RequestIndex, VnfIndex};
use crate::utils::error::{Error, Result};

/// One step of a realized path.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeAssignment {
    pub node: NodeIndex,
    /// the vnf applied at this step, if any
    pub vnf: Option<VnfIndex>,
    /// the link used to arrive here; `None` for the first step and for
    /// consecutive vnfs on the same node
    pub prev: Option<LinkIndex>,
}

impl NodeAssignment {
    pub fn new(node: NodeIndex, vnf: Option<VnfIndex>, prev: Option<LinkIndex>) -> Self {
        NodeAssignment { node, vnf, prev }
    }
}

/// The realized path of one request, together with its delay and hop count
/// and both normalized by the theoretical optimum.
#[derive(Clone, Debug, PartialEq)]
pub struct TrafficAssignment {
    request: RequestIndex,
    path: Vec<NodeAssignment>,
    delay: f64,
    hops: usize,
    delay_index: f64,
    hops_index: f64,
}

impl TrafficAssignment {
    pub fn new(problem: &Problem, request: RequestIndex, path: Vec<NodeAssignment>)
        -> Result<Self> {
        let ix = request.index();
        if ix >= problem.requests().len() {
            return Err(Error::UnknownRequest(ix));
        }
        let network = problem.network();
        let catalog = problem.catalog();
        let req = problem.request(request);

        let (first, last) = match (path.first(), path.last()) {
            (Some(first), Some(last)) => (first.node, last.node),
            _ => return Err(Error::EmptyPath(ix)),
        };
        if first != req.ingress {
            return Err(Error::WrongEndpoint(ix, "starts", first.index(), req.ingress.index()));
        }
        if last != req.egress {
            return Err(Error::WrongEndpoint(ix, "ends", last.index(), req.egress.index()));
        }

        let mut delay = 0.0;
        let mut hops = 0;
        for (i, step) in path.iter().enumerate() {
            if let Some(vnf) = step.vnf {
                delay += catalog.vnf(vnf).delay;
            }
            if let Some(link) = step.prev {
                delay += network.link(link).delay();
                hops += 1;
            }
            if i == 0 { continue; }
            let from = path[i - 1].node;
            if from == step.node { continue; }
            let linked = matches!(step.prev, Some(link) if connects(network, link, from, step.node));
            if !linked {
                return Err(Error::Unlinked(ix, from.index(), step.node.index()));
            }
        }

        let applied: Vec<VnfIndex> = path.iter().filter_map(|s| s.vnf).collect();
        if applied != req.chain {
            return Err(Error::ChainMismatch(
                ix,
                applied.iter().map(|v| v.index()).collect(),
                req.chain.iter().map(|v| v.index()).collect(),
            ));
        }

        let processing: f64 = req.chain.iter().map(|&v| catalog.vnf(v).delay).sum();
        let delay_index = ratio(delay - processing, problem.shortest(request, Metric::Delay));
        let hops_index = ratio(hops as f64, problem.shortest(request, Metric::Hops));
        Ok(TrafficAssignment { request, path, delay, hops, delay_index, hops_index })
    }

    /// Concatenates shortest sub-paths ingress -> order[0] -> ... -> egress
    /// and applies the i-th chained vnf at `order[i]`.
    pub fn from_vnf_sequence(problem: &Problem, request: RequestIndex,
                             order: &[NodeIndex], metric: Metric) -> Result<Self> {
        let ix = request.index();
        if ix >= problem.requests().len() {
            return Err(Error::UnknownRequest(ix));
        }
        let req = problem.request(request);
        if order.len() != req.chain.len() {
            return Err(Error::OrderMismatch(order.len(), req.chain.len(), ix));
        }

        let mut path = vec![];
        let mut last = req.ingress;
        for (i, (&host, &vnf)) in order.iter().zip(req.chain.iter()).enumerate() {
            let part = problem.path(metric, last, host)?;
            // 第一段路徑需保留起點
            if i == 0 && part.len() > 1 {
                let (node, prev) = part[0];
                path.push(NodeAssignment::new(node, None, prev));
            }
            for &(node, prev) in part.iter().skip(1).take(part.len().saturating_sub(2)) {
                path.push(NodeAssignment::new(node, None, prev));
            }
            // part always ends at the host itself
            let (node, prev) = part[part.len() - 1];
            path.push(NodeAssignment::new(node, Some(vnf), prev));
            last = host;
        }
        if order.is_empty() {
            path.push(NodeAssignment::new(req.ingress, None, None));
        }
        if last != req.egress {
            let part = problem.path(metric, last, req.egress)?;
            for &(node, prev) in part.iter().skip(1) {
                path.push(NodeAssignment::new(node, None, prev));
            }
        }
        TrafficAssignment::new(problem, request, path)
    }

    pub fn request(&self) -> RequestIndex {
        self.request
    }
    pub fn path(&self) -> &[NodeAssignment] {
        &self.path
    }
    /// Sum of link and vnf delays.
    pub fn delay(&self) -> f64 {
        self.delay
    }
    pub fn hops(&self) -> usize {
        self.hops
    }
    pub fn delay_index(&self) -> f64 {
        self.delay_index
    }
    pub fn hops_index(&self) -> f64 {
        self.hops_index
    }
    /// (node, vnf) for every applied vnf, in chain order.
    pub fn placements(&self) -> impl Iterator<Item=(NodeIndex, VnfIndex)> + '_ {
        self.path.iter().filter_map(|s| s.vnf.map(|v| (s.node, v)))
    }
    /// The hosting node of every chained vnf, in chain order.
    pub fn hosts(&self) -> Vec<NodeIndex> {
        self.placements().map(|(node, _)| node).collect()
    }
    pub fn links(&self) -> impl Iterator<Item=LinkIndex> + '_ {
        self.path.iter().filter_map(|s| s.prev)
    }
    pub fn traverses(&self, link: LinkIndex) -> bool {
        self.links().any(|l| l == link)
    }
}

fn connects(network: &Network, link: LinkIndex, from: NodeIndex, to: NodeIndex) -> bool {
    let ends = network.link(link).ends();
    ends == (from, to) || (!network.is_directed() && ends == (to, from))
}

/// `value / optimum`, or `1 + value` when no positive finite optimum exists.
fn ratio(value: f64, optimum: f64) -> f64 {
    if optimum > 0.0 && optimum.is_finite() {
        value / optimum
    } else {
        1.0 + value
    }
}

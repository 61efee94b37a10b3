use std::collections::BTreeMap;
use std::f64::INFINITY as INF;

use once_cell::sync::OnceCell;

use super::{Network, NodeIndex, Request, RequestIndex, VnfCatalog, VnfIndex};
use crate::algorithm::base::{Metric, ShortestPaths, Step};
use crate::component::overview::pack;
use crate::utils::error::{Error, Result};

/// A placement the network currently runs. Solutions are compared against it
/// to count replaced instances and migrated flows.
#[derive(Clone, Debug, Default)]
pub struct Prior {
    hosts: Vec<Option<Vec<NodeIndex>>>,
    instances: BTreeMap<(NodeIndex, VnfIndex), usize>,
}

impl Prior {
    /// Hosting nodes of `request` in the prior placement, one per chained vnf.
    pub fn hosts(&self, request: RequestIndex) -> Option<&[NodeIndex]> {
        self.hosts.get(request.index())
            .and_then(|hosts| hosts.as_deref())
    }
    pub fn instances(&self) -> impl Iterator<Item=(NodeIndex, VnfIndex, usize)> + '_ {
        self.instances.iter().map(|(&(node, vnf), &count)| (node, vnf, count))
    }
}

/// Everything read-only during an optimization: topology, vnf catalog,
/// requests, an optional prior placement and the shortest-path index.
#[derive(Debug)]
pub struct Problem {
    network: Network,
    catalog: VnfCatalog,
    requests: Vec<Request>,
    prior: Option<Prior>,
    paths: ShortestPaths,
    hosts: Vec<NodeIndex>,
    shortest: Vec<[OnceCell<f64>; 2]>,
}

impl Problem {
    pub fn new(network: Network, catalog: VnfCatalog, requests: Vec<Request>) -> Result<Self> {
        for node in network.nodes() {
            let node = network.node(node);
            if node.resources().len() != catalog.dimensions() {
                return Err(Error::ResourceDimension {
                    what: format!("node {:?}", node.name()),
                    found: node.resources().len(),
                    expected: catalog.dimensions(),
                });
            }
        }
        for request in requests.iter() {
            for &end in &[request.ingress, request.egress] {
                if end.index() >= network.node_count() {
                    return Err(Error::UnknownNode(format!("#{}", end.index())));
                }
            }
            if let Some(vnf) = request.chain.iter().find(|v| v.index() >= catalog.len()) {
                return Err(Error::UnknownVnf(format!("#{}", vnf.index())));
            }
        }
        let paths = ShortestPaths::new(&network);
        let hosts = network.host_nodes();
        let shortest = requests.iter()
            .map(|_| [OnceCell::new(), OnceCell::new()])
            .collect();
        Ok(Problem { network, catalog, requests, prior: None, paths, hosts, shortest })
    }
    /// Attaches the currently running placement, given as the hosting nodes
    /// of every request (`None` for requests that are new).
    pub fn with_prior(mut self, hosts: Vec<Option<Vec<NodeIndex>>>) -> Result<Self> {
        let mut demands: BTreeMap<(NodeIndex, VnfIndex), Vec<(RequestIndex, f64)>> = BTreeMap::new();
        for (ix, order) in hosts.iter().enumerate() {
            let request = self.requests.get(ix)
                .ok_or(Error::UnknownRequest(ix))?;
            let order = match order {
                Some(order) => order,
                None        => continue,
            };
            if order.len() != request.chain.len() {
                return Err(Error::OrderMismatch(order.len(), request.chain.len(), ix));
            }
            for (&node, &vnf) in order.iter().zip(request.chain.iter()) {
                demands.entry((node, vnf))
                    .or_default()
                    .push((ix.into(), request.bandwidth));
            }
        }
        let instances = demands.into_iter()
            .map(|((node, vnf), demand)| {
                let (loads, _) = pack(self.catalog.vnf(vnf).capacity, demand);
                ((node, vnf), loads.len())
            })
            .collect();
        self.prior = Some(Prior { hosts, instances });
        Ok(self)
    }
    pub fn network(&self) -> &Network {
        &self.network
    }
    pub fn catalog(&self) -> &VnfCatalog {
        &self.catalog
    }
    pub fn requests(&self) -> &[Request] {
        &self.requests
    }
    pub fn request(&self, request: RequestIndex) -> &Request {
        debug_assert!(request.index() < self.requests.len());
        &self.requests[request.index()]
    }
    pub fn request_indices(&self) -> impl Iterator<Item=RequestIndex> {
        (0..self.requests.len()).map(RequestIndex::from)
    }
    pub fn prior(&self) -> Option<&Prior> {
        self.prior.as_ref()
    }
    /// Nodes with any positive resource.
    pub fn host_nodes(&self) -> &[NodeIndex] {
        &self.hosts
    }
    pub fn distance(&self, metric: Metric, from: NodeIndex, to: NodeIndex) -> f64 {
        self.paths.distance(&self.network, metric, from, to)
    }
    pub fn path(&self, metric: Metric, from: NodeIndex, to: NodeIndex) -> Result<Vec<Step>> {
        self.paths.path(&self.network, metric, from, to)
    }
    pub fn best_stop(&self, metric: Metric, from: NodeIndex, to: NodeIndex,
                     choices: &[NodeIndex]) -> Option<NodeIndex> {
        self.paths.best_stop(&self.network, metric, from, to, choices)
    }
    /// Theoretical optimum of `request` under `metric`, ignoring capacities:
    /// the direct distance for an empty chain, otherwise the best detour over
    /// a single host node.
    pub fn shortest(&self, request: RequestIndex, metric: Metric) -> f64 {
        let slot = match metric {
            Metric::Hops  => &self.shortest[request.index()][0],
            Metric::Delay => &self.shortest[request.index()][1],
        };
        *slot.get_or_init(|| {
            let req = self.request(request);
            if req.chain.is_empty() {
                return self.distance(metric, req.ingress, req.egress);
            }
            self.hosts.iter()
                .map(|&h| self.distance(metric, req.ingress, h)
                    + self.distance(metric, h, req.egress))
                .fold(INF, f64::min)
        })
    }
}

use std::cmp::Reverse;
use std::collections::BTreeMap;

use ordered_float::OrderedFloat;

use crate::network::{LinkIndex, NodeIndex, Problem, RequestIndex, VnfIndex};


/// First-fit-decreasing bin packing of flow bandwidths into vnf instances of
/// size `capacity`. Returns the load of every instance and the flows it
/// serves. A flow larger than `capacity` opens an overloaded instance of its
/// own.
pub fn pack(capacity: f64, mut demands: Vec<(RequestIndex, f64)>)
    -> (Vec<f64>, Vec<Vec<RequestIndex>>) {
    demands.sort_by_key(|&(request, bandwidth)| (Reverse(OrderedFloat(bandwidth)), request));
    let mut loads: Vec<f64> = vec![];
    let mut flows: Vec<Vec<RequestIndex>> = vec![];
    for (request, bandwidth) in demands {
        match loads.iter().position(|&load| load + bandwidth <= capacity) {
            Some(i) => {
                loads[i] += bandwidth;
                flows[i].push(request);
            },
            None => {
                loads.push(bandwidth);
                flows.push(vec![request]);
            },
        }
    }
    (loads, flows)
}


/// The instances of one vnf type on one node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VnfInstances {
    loads: Vec<f64>,
    flows: Vec<Vec<RequestIndex>>,
}

impl VnfInstances {
    pub fn count(&self) -> usize {
        self.loads.len()
    }
    pub fn loads(&self) -> &[f64] {
        &self.loads
    }
    pub fn flows(&self, instance: usize) -> &[RequestIndex] {
        &self.flows[instance]
    }
    /// 是否有任一實例還能容納 `bandwidth`
    pub fn has_room(&self, capacity: f64, bandwidth: f64) -> bool {
        self.loads.iter().any(|&load| load + bandwidth <= capacity)
    }
}


/// Usage bookkeeping of one node: which flows apply which vnf here, the
/// instances packed from them, and the resources left over.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeOverview {
    placements: BTreeMap<VnfIndex, Vec<(RequestIndex, f64)>>,
    instances: BTreeMap<VnfIndex, VnfInstances>,
    remaining: Vec<f64>,
}

impl NodeOverview {
    pub fn new(capacity: &[f64]) -> Self {
        NodeOverview { remaining: capacity.to_vec(), ..Default::default() }
    }
    pub fn add(&mut self, vnf: VnfIndex, request: RequestIndex, bandwidth: f64) {
        self.placements.entry(vnf).or_default().push((request, bandwidth));
    }
    /// Drops every placement of `request` on this node.
    pub fn remove_request(&mut self, request: RequestIndex) {
        for list in self.placements.values_mut() {
            list.retain(|&(r, _)| r != request);
        }
        self.placements.retain(|_, list| !list.is_empty());
    }
    /// Re-packs the instances from the placements and recomputes the
    /// remaining resources. Must follow every batch of `add`/`remove_request`.
    pub fn refresh(&mut self, problem: &Problem, node: NodeIndex) {
        let catalog = problem.catalog();
        self.instances = self.placements.iter()
            .map(|(&vnf, list)| {
                let (loads, flows) = pack(catalog.vnf(vnf).capacity, list.clone());
                (vnf, VnfInstances { loads, flows })
            })
            .collect();
        let mut remaining = problem.network().node(node).resources().to_vec();
        for (&vnf, instances) in self.instances.iter() {
            let count = instances.count() as f64;
            for (r, need) in remaining.iter_mut().zip(catalog.vnf(vnf).resources.iter()) {
                *r -= count * need;
            }
        }
        self.remaining = remaining;
    }
    pub fn placements(&self, vnf: VnfIndex) -> &[(RequestIndex, f64)] {
        self.placements.get(&vnf).map(|list| list.as_slice()).unwrap_or(&[])
    }
    pub fn instances(&self, vnf: VnfIndex) -> Option<&VnfInstances> {
        self.instances.get(&vnf)
    }
    pub fn instance_count(&self, vnf: VnfIndex) -> usize {
        self.instances.get(&vnf).map_or(0, |inst| inst.count())
    }
    pub fn vnf_types(&self) -> impl Iterator<Item=VnfIndex> + '_ {
        self.instances.keys().cloned()
    }
    pub fn all_instances(&self) -> impl Iterator<Item=(VnfIndex, &VnfInstances)> + '_ {
        self.instances.iter().map(|(&vnf, inst)| (vnf, inst))
    }
    pub fn remaining(&self) -> &[f64] {
        &self.remaining
    }
    pub fn violates_resources(&self) -> bool {
        self.remaining.iter().any(|&r| r < 0.0)
    }
}


/// The requests traversing one link, as a multiset, and the bandwidth left.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LinkOverview {
    requests: BTreeMap<RequestIndex, usize>,
    remaining: f64,
}

impl LinkOverview {
    pub fn new(bandwidth: f64) -> Self {
        LinkOverview { requests: BTreeMap::new(), remaining: bandwidth }
    }
    pub fn add(&mut self, request: RequestIndex) {
        *self.requests.entry(request).or_default() += 1;
    }
    pub fn remove(&mut self, request: RequestIndex) {
        if let Some(count) = self.requests.get_mut(&request) {
            *count -= 1;
            if *count == 0 {
                self.requests.remove(&request);
            }
        }
    }
    pub fn refresh(&mut self, problem: &Problem, link: LinkIndex) {
        let used: f64 = self.requests.iter()
            .map(|(&r, &count)| count as f64 * problem.request(r).bandwidth)
            .sum();
        self.remaining = problem.network().link(link).bandwidth() - used;
    }
    pub fn requests(&self) -> impl Iterator<Item=RequestIndex> + '_ {
        self.requests.keys().cloned()
    }
    pub fn remaining(&self) -> f64 {
        self.remaining
    }
    pub fn is_congested(&self) -> bool {
        self.remaining < 0.0
    }
}


/// Where the instances of one vnf type are located.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VnfTypeOverview {
    locations: BTreeMap<NodeIndex, usize>,
    total: usize,
}

impl VnfTypeOverview {
    pub fn set(&mut self, node: NodeIndex, count: usize) {
        let old = if count == 0 {
            self.locations.remove(&node)
        } else {
            self.locations.insert(node, count)
        };
        self.total = self.total + count - old.unwrap_or(0);
    }
    pub fn count(&self, node: NodeIndex) -> usize {
        self.locations.get(&node).cloned().unwrap_or(0)
    }
    pub fn total(&self) -> usize {
        self.total
    }
    pub fn locations(&self) -> impl Iterator<Item=(NodeIndex, usize)> + '_ {
        self.locations.iter().map(|(&node, &count)| (node, count))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{Network, Request, Vnf, VnfCatalog};

    #[test]
    fn it_packs_first_fit_decreasing() {
        let demands = vec![
            (0.into(), 200.0), (1.into(), 400.0), (2.into(), 300.0), (3.into(), 100.0),
        ];
        let (loads, flows) = pack(500.0, demands);
        assert_eq!(loads, vec![500.0, 500.0]);
        assert_eq!(flows[0], vec![1.into(), 3.into()]);
        assert_eq!(flows[1], vec![2.into(), 0.into()]);
        let (loads, _) = pack(100.0, vec![(0.into(), 150.0)]);
        assert_eq!(loads, vec![150.0]);
    }

    #[test]
    fn it_tracks_node_resources() {
        let mut network = Network::new(false);
        network.add_node("A", vec![2.0]).unwrap();
        let mut catalog = VnfCatalog::new(vec!["cpu".into()]);
        catalog.add_vnf(Vnf::new("fw", 1.0, 500.0, vec![1.0])).unwrap();
        let requests = vec![
            Request::new(0, 0, 400.0, 10.0, vec![0]),
            Request::new(0, 0, 400.0, 10.0, vec![0]),
            Request::new(0, 0, 400.0, 10.0, vec![0]),
        ];
        let problem = Problem::new(network, catalog, requests).unwrap();
        let node = NodeIndex::from(0);

        let mut overview = NodeOverview::new(&[2.0]);
        for r in 0..3 {
            overview.add(0.into(), r.into(), 400.0);
        }
        overview.refresh(&problem, node);
        assert_eq!(overview.instance_count(0.into()), 3);
        assert_eq!(overview.remaining(), &[-1.0]);
        assert!(overview.violates_resources());

        overview.remove_request(1.into());
        overview.refresh(&problem, node);
        assert_eq!(overview.instance_count(0.into()), 2);
        assert!(!overview.violates_resources());
        assert!(!overview.instances(0.into()).unwrap().has_room(500.0, 400.0));

        overview.remove_request(0.into());
        overview.remove_request(2.into());
        overview.refresh(&problem, node);
        assert_eq!(overview, NodeOverview::new(&[2.0]));
    }

    #[test]
    fn it_counts_type_locations() {
        let mut overview = VnfTypeOverview::default();
        overview.set(1.into(), 2);
        overview.set(3.into(), 1);
        overview.set(1.into(), 1);
        assert_eq!(overview.total(), 2);
        overview.set(3.into(), 0);
        assert_eq!(overview.total(), 1);
        assert_eq!(overview.locations().collect::<Vec<_>>(), vec![(1.into(), 1)]);
    }
}

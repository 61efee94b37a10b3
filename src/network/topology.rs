use hashbrown::HashMap;

use crate::utils::error::{Error, Result};

#[derive(Copy, Clone, Debug, Default, PartialEq, PartialOrd, Eq, Ord, Hash)]
pub struct NodeIndex(usize);

impl NodeIndex {
    fn new(ix: usize) -> Self {
        NodeIndex(ix)
    }
    pub fn index(self) -> usize {
        self.0
    }
}

impl From<usize> for NodeIndex {
    fn from(ix: usize) -> Self {
        NodeIndex::new(ix)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, PartialOrd, Eq, Ord, Hash)]
pub struct LinkIndex(usize);

impl LinkIndex {
    fn new(ix: usize) -> Self {
        LinkIndex(ix)
    }
    pub fn index(self) -> usize {
        self.0
    }
}

impl From<usize> for LinkIndex {
    fn from(ix: usize) -> Self {
        LinkIndex::new(ix)
    }
}

#[derive(Clone, Debug)]
pub struct Node {
    name: String,
    resources: Vec<f64>,
    links: Vec<LinkIndex>,
}

#[derive(Clone, Debug)]
pub struct Link {
    ends: (NodeIndex, NodeIndex),
    bandwidth: f64,
    delay: f64,
}

impl Node {
    pub fn new(name: &str, resources: Vec<f64>) -> Self {
        Node { name: name.to_owned(), resources, links: vec![] }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn resources(&self) -> &[f64] {
        &self.resources
    }
    /// 只要有任一維度的資源大於零，就能放置 VNF
    pub fn is_host(&self) -> bool {
        self.resources.iter().any(|&r| r > 0.0)
    }
}

impl Link {
    pub fn new(ends: (NodeIndex, NodeIndex), bandwidth: f64, delay: f64) -> Self {
        Link { ends, bandwidth, delay }
    }
    pub fn ends(&self) -> (NodeIndex, NodeIndex) {
        self.ends
    }
    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }
    pub fn delay(&self) -> f64 {
        self.delay
    }
}

/// Undirected links are stored once and listed under both ends, so that both
/// directions share one bandwidth budget.
#[derive(Clone, Debug, Default)]
pub struct Network {
    nodes: Vec<Node>,
    links: Vec<Link>,
    directed: bool,
    names: HashMap<String, NodeIndex>,
}

impl Network {
    pub fn new(directed: bool) -> Self {
        Network { directed, ..Default::default() }
    }
    pub fn is_directed(&self) -> bool {
        self.directed
    }
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
    pub fn link_count(&self) -> usize {
        self.links.len()
    }
    pub fn node(&self, node: NodeIndex) -> &Node {
        debug_assert!(node.index() < self.nodes.len());
        &self.nodes[node.index()]
    }
    pub fn link(&self, link: LinkIndex) -> &Link {
        debug_assert!(link.index() < self.links.len());
        &self.links[link.index()]
    }
    pub fn nodes(&self) -> impl Iterator<Item=NodeIndex> {
        (0..self.nodes.len()).map(NodeIndex::new)
    }
    pub fn links(&self) -> impl Iterator<Item=LinkIndex> {
        (0..self.links.len()).map(LinkIndex::new)
    }
    pub fn host_nodes(&self) -> Vec<NodeIndex> {
        self.nodes().filter(|&n| self.node(n).is_host()).collect()
    }
    pub fn lookup(&self, name: &str) -> Option<NodeIndex> {
        self.names.get(name).cloned()
    }
    /// 回傳經由 `link` 離開 `node` 後抵達的節點
    pub fn other(&self, link: LinkIndex, node: NodeIndex) -> NodeIndex {
        let (end0, end1) = self.link(link).ends;
        if end0 == node { end1 } else { end0 }
    }
    pub fn outgoings(&self, node: NodeIndex)
        -> impl Iterator<Item=(LinkIndex, NodeIndex)> + '_ {
        debug_assert!(node.index() < self.nodes.len());
        self.nodes[node.index()].links.iter()
            .map(move |&l| (l, self.other(l, node)))
    }
    pub fn neighbors(&self, node: NodeIndex)
        -> impl Iterator<Item=NodeIndex> + '_ {
        self.outgoings(node).map(|(_, n)| n)
    }
    pub fn find_link(&self, from: NodeIndex, to: NodeIndex) -> Option<LinkIndex> {
        self.outgoings(from)
            .find(|&(_, n)| n == to)
            .map(|(l, _)| l)
    }
    pub fn add_node(&mut self, name: &str, resources: Vec<f64>) -> Result<NodeIndex> {
        if self.names.contains_key(name) {
            return Err(Error::DuplicateNode(name.to_owned()));
        }
        let node = NodeIndex::new(self.nodes.len());
        self.nodes.push(Node::new(name, resources));
        self.names.insert(name.to_owned(), node);
        Ok(node)
    }
    pub fn add_link(&mut self, end0: NodeIndex, end1: NodeIndex,
                    bandwidth: f64, delay: f64) -> Result<LinkIndex> {
        let count = self.nodes.len();
        if end0.index() >= count || end1.index() >= count {
            let missing = if end0.index() >= count { end0 } else { end1 };
            return Err(Error::UnknownNode(format!("#{}", missing.index())));
        }
        if end0 == end1 {
            return Err(Error::SelfLoop(self.node(end0).name.clone()));
        }
        if self.find_link(end0, end1).is_some() {
            return Err(Error::DuplicateLink(
                self.node(end0).name.clone(), self.node(end1).name.clone()));
        }
        let link = LinkIndex::new(self.links.len());
        self.links.push(Link::new((end0, end1), bandwidth, delay));
        self.nodes[end0.index()].links.push(link);
        if !self.directed {
            self.nodes[end1.index()].links.push(link);
        }
        Ok(link)
    }
    pub fn add_links(&mut self, links: Vec<(usize, usize, f64, f64)>) -> Result<()> {
        for (end0, end1, bandwidth, delay) in links {
            self.add_link(end0.into(), end1.into(), bandwidth, delay)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle(directed: bool) -> Network {
        let mut network = Network::new(directed);
        for name in &["a", "b", "c"] {
            network.add_node(name, vec![1.0]).unwrap();
        }
        network.add_links(vec![
            (0, 1, 100.0, 10.0), (1, 2, 100.0, 20.0), (0, 2, 100.0, 02.0),
        ]).unwrap();
        network
    }

    #[test]
    fn it_lookups_link_ends() {
        let network = triangle(false);
        assert_eq!(network.link(0.into()).ends(), (0.into(), 1.into()));
        assert_eq!(network.other(0.into(), 1.into()), 0.into());
        assert_eq!(network.find_link(1.into(), 0.into()), Some(0.into()));
        assert_eq!(network.find_link(2.into(), 0.into()), Some(2.into()));
        assert_eq!(network.lookup("c"), Some(2.into()));
    }

    #[test]
    fn it_respects_link_direction() {
        let network = triangle(true);
        assert_eq!(network.find_link(0.into(), 1.into()), Some(0.into()));
        assert_eq!(network.find_link(1.into(), 0.into()), None);
        assert_eq!(network.neighbors(2.into()).count(), 0);
    }

    #[test]
    fn it_rejects_malformed_topology() {
        let mut network = triangle(false);
        assert!(matches!(network.add_node("a", vec![]), Err(Error::DuplicateNode(_))));
        assert!(matches!(network.add_link(1.into(), 0.into(), 1.0, 1.0),
                         Err(Error::DuplicateLink(..))));
        assert!(matches!(network.add_link(1.into(), 1.into(), 1.0, 1.0),
                         Err(Error::SelfLoop(_))));
        assert!(matches!(network.add_link(1.into(), 7.into(), 1.0, 1.0),
                         Err(Error::UnknownNode(_))));
    }
}

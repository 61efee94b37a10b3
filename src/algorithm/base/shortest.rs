use std::collections::VecDeque;
use std::f64::INFINITY as INF;

use once_cell::sync::OnceCell;
use rand::Rng;

use super::heap::{MyMinHeap, Priority};
use crate::network::{LinkIndex, Network, NodeIndex};
use crate::utils::error::{Error, Result};

/// One step of a path: the node and the link used to arrive there.
pub type Step = (NodeIndex, Option<LinkIndex>);


#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Breadth-first search, every link counts 1
    Hops,
    /// Dijkstra over link delays
    Delay,
}

impl Metric {
    /// Either metric with equal probability.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.gen_bool(0.5) { Metric::Hops } else { Metric::Delay }
    }
}

#[derive(Clone, Debug)]
pub struct Tree {
    dist: Vec<f64>,
    pred: Vec<Option<LinkIndex>>,
}

impl Tree {
    pub fn distance(&self, to: NodeIndex) -> f64 {
        self.dist[to.index()]
    }
    pub fn pred(&self, to: NodeIndex) -> Option<LinkIndex> {
        self.pred[to.index()]
    }
    pub fn reaches(&self, to: NodeIndex) -> bool {
        self.dist[to.index()] < INF
    }
}

/// Per-source shortest-path trees, computed on first use and kept for the
/// lifetime of the (immutable) topology.
///
/// Ties are broken deterministically: BFS keeps the first discovery in link
/// insertion order, Dijkstra settles nodes by (distance, node index) and only
/// relaxes on a strictly shorter distance.
#[derive(Debug, Default)]
pub struct ShortestPaths {
    hops: Vec<OnceCell<Tree>>,
    delay: Vec<OnceCell<Tree>>,
}


impl ShortestPaths {
    pub fn new(network: &Network) -> Self {
        let count = network.node_count();
        ShortestPaths {
            hops: (0..count).map(|_| OnceCell::new()).collect(),
            delay: (0..count).map(|_| OnceCell::new()).collect(),
        }
    }
    pub fn tree(&self, network: &Network, metric: Metric, source: NodeIndex) -> &Tree {
        match metric {
            Metric::Hops  => self.hops[source.index()]
                .get_or_init(|| bfs(network, source)),
            Metric::Delay => self.delay[source.index()]
                .get_or_init(|| dijkstra(network, source)),
        }
    }
    pub fn distance(&self, network: &Network, metric: Metric,
                    from: NodeIndex, to: NodeIndex) -> f64 {
        self.tree(network, metric, from).distance(to)
    }
    /// 由 `from` 走到 `to` 的最短路徑（包含兩端點）
    pub fn path(&self, network: &Network, metric: Metric,
                from: NodeIndex, to: NodeIndex) -> Result<Vec<Step>> {
        let tree = self.tree(network, metric, from);
        if !tree.reaches(to) {
            return Err(Error::Unreachable(from.index(), to.index()));
        }
        let mut path = vec![];
        let mut current = to;
        loop {
            let pred = tree.pred(current);
            path.push((current, pred));
            match pred {
                Some(link) => current = network.other(link, current),
                None       => break,
            }
        }
        path.reverse();
        Ok(path)
    }
    /// The choice minimizing `dist(from, mid) + dist(mid, to)`; the first one
    /// wins on ties.
    pub fn best_stop(&self, network: &Network, metric: Metric, from: NodeIndex,
                     to: NodeIndex, choices: &[NodeIndex]) -> Option<NodeIndex> {
        let mut best = None;
        let mut best_dist = INF;
        for &mid in choices {
            let dist = self.distance(network, metric, from, mid)
                + self.distance(network, metric, mid, to);
            if dist < best_dist {
                best = Some(mid);
                best_dist = dist;
            }
        }
        best
    }
}

fn bfs(network: &Network, source: NodeIndex) -> Tree {
    let count = network.node_count();
    let mut tree = Tree { dist: vec![INF; count], pred: vec![None; count] };
    let mut queue = VecDeque::new();
    tree.dist[source.index()] = 0.0;
    queue.push_back(source);
    while let Some(v) = queue.pop_front() {
        let next = tree.dist[v.index()] + 1.0;
        for (link, u) in network.outgoings(v) {
            if tree.reaches(u) { continue; }
            tree.dist[u.index()] = next;
            tree.pred[u.index()] = Some(link);
            queue.push_back(u);
        }
    }
    tree
}

fn dijkstra(network: &Network, source: NodeIndex) -> Tree {
    let count = network.node_count();
    let mut tree = Tree { dist: vec![INF; count], pred: vec![None; count] };
    let mut settled = vec![false; count];
    let mut heap = MyMinHeap::new();

    tree.dist[source.index()] = 0.0;
    heap.push(source, Priority::new(0.0, source.index()));

    // 從優先權佇列中取出的節點即為最終距離
    while let Some((v, priority)) = heap.pop() {
        settled[v.index()] = true;
        let sv_dist = priority.cost();
        for (link, u) in network.outgoings(v) {
            if settled[u.index()] { continue; }
            let su_dist = sv_dist + network.link(link).delay();
            if su_dist >= tree.dist[u.index()] { continue; }
            tree.dist[u.index()] = su_dist;
            tree.pred[u.index()] = Some(link);
            let priority = Priority::new(su_dist, u.index());
            match heap.get(&u) {
                Some(_) => { heap.change_priority(&u, priority); },
                None    => { heap.push(u, priority); },
            }
        }
    }
    tree
}


#[cfg(test)]
mod tests {
    use super::*;

    fn network(directed: bool, links: Vec<(usize, usize, f64)>, count: usize) -> Network {
        let mut network = Network::new(directed);
        for i in 0..count {
            network.add_node(&format!("n{}", i), vec![1.0]).unwrap();
        }
        network.add_links(links.into_iter()
            .map(|(a, b, delay)| (a, b, 1000.0, delay))
            .collect()).unwrap();
        network
    }

    fn nodes(path: &[Step]) -> Vec<usize> {
        path.iter().map(|(n, _)| n.index()).collect()
    }

    #[test]
    fn it_finds_least_delay_path() {
        let network = network(false, vec![
            (0, 1, 10.0), (1, 2, 20.0), (0, 2, 02.0), (2, 3, 01.0),
        ], 4);
        let paths = ShortestPaths::new(&network);
        let path = paths.path(&network, Metric::Delay, 1.into(), 3.into()).unwrap();
        assert_eq!(nodes(&path), vec![1, 0, 2, 3]);
        assert_eq!(path[0].1, None);
        assert_eq!(paths.distance(&network, Metric::Delay, 1.into(), 3.into()), 13.0);
        assert_eq!(paths.distance(&network, Metric::Hops, 1.into(), 3.into()), 2.0);
    }

    #[test]
    fn it_finds_fewest_hops_path() {
        let network = network(false, vec![
            (0, 1, 1.0), (1, 2, 1.0), (2, 3, 1.0), (0, 3, 50.0),
        ], 4);
        let paths = ShortestPaths::new(&network);
        let hops = paths.path(&network, Metric::Hops, 0.into(), 3.into()).unwrap();
        let delay = paths.path(&network, Metric::Delay, 0.into(), 3.into()).unwrap();
        assert_eq!(nodes(&hops), vec![0, 3]);
        assert_eq!(nodes(&delay), vec![0, 1, 2, 3]);
        assert_eq!(nodes(&paths.path(&network, Metric::Hops, 2.into(), 2.into()).unwrap()), vec![2]);
    }

    #[test]
    fn it_breaks_ties_by_lower_node() {
        // 0 -> 1 -> 3 and 0 -> 2 -> 3 are equally long
        let network = network(false, vec![
            (0, 2, 1.0), (0, 1, 1.0), (1, 3, 1.0), (2, 3, 1.0),
        ], 4);
        let paths = ShortestPaths::new(&network);
        let delay = paths.path(&network, Metric::Delay, 0.into(), 3.into()).unwrap();
        assert_eq!(nodes(&delay), vec![0, 1, 3]);
    }

    #[test]
    fn it_honors_directed_links() {
        let network = network(true, vec![(0, 1, 1.0), (1, 2, 1.0)], 3);
        let paths = ShortestPaths::new(&network);
        assert!(paths.path(&network, Metric::Hops, 0.into(), 2.into()).is_ok());
        assert!(matches!(paths.path(&network, Metric::Hops, 2.into(), 0.into()),
                         Err(Error::Unreachable(2, 0))));
    }

    #[test]
    fn it_picks_best_stop() {
        let network = network(false, vec![
            (0, 1, 1.0), (1, 2, 1.0), (0, 3, 5.0), (3, 2, 5.0),
        ], 4);
        let paths = ShortestPaths::new(&network);
        let choices = [3.into(), 1.into()];
        let best = paths.best_stop(&network, Metric::Delay, 0.into(), 2.into(), &choices);
        assert_eq!(best, Some(1.into()));
        assert_eq!(paths.best_stop(&network, Metric::Delay, 0.into(), 2.into(), &[]), None);
    }
}

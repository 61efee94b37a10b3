//! Small problems shared by the unit tests.

use super::{Network, Problem, Request, Vnf, VnfCatalog};

/// A -- B -- C with 10 ms and 1000 Mbps per link. Only B has resources, just
/// enough for one firewall; one request A -> C through a firewall.
pub fn line() -> Problem {
    let mut network = Network::new(false);
    network.add_node("A", vec![0.0]).unwrap();
    network.add_node("B", vec![1.0]).unwrap();
    network.add_node("C", vec![0.0]).unwrap();
    network.add_links(vec![(0, 1, 1000.0, 10.0), (1, 2, 1000.0, 10.0)]).unwrap();
    let mut catalog = VnfCatalog::new(vec!["cpu".into()]);
    catalog.add_vnf(Vnf::new("firewall", 5.0, 500.0, vec![1.0])).unwrap();
    let requests = vec![Request::new(0, 2, 100.0, 1000.0, vec![0])];
    Problem::new(network, catalog, requests).unwrap()
}

/// Six switches on a ring, every other one a host with 4 cpus.
pub fn ring() -> Problem {
    let mut network = Network::new(false);
    for (i, &cpu) in [0.0, 4.0, 0.0, 4.0, 0.0, 4.0].iter().enumerate() {
        network.add_node(&format!("s{}", i), vec![cpu, 8.0 * cpu]).unwrap();
    }
    network.add_links(vec![
        (0, 1, 1000.0, 2.0), (1, 2, 1000.0, 3.0), (2, 3, 1000.0, 2.0),
        (3, 4, 1000.0, 4.0), (4, 5, 1000.0, 2.0), (5, 0, 1000.0, 3.0),
    ]).unwrap();
    let mut catalog = VnfCatalog::new(vec!["cpu".into(), "ram".into()]);
    let fw = catalog.add_vnf(Vnf::new("firewall", 1.0, 500.0, vec![1.0, 2.0])).unwrap();
    let ids = catalog.add_vnf(Vnf::new("ids", 2.0, 300.0, vec![2.0, 4.0])
        .with_max_instances(4)
        .with_migration_penalty(3.0)).unwrap();
    catalog.add_pair(fw, ids, 30.0);
    let requests = vec![
        Request::new(0, 3, 100.0, 40.0, vec![0, 1]),
        Request::new(2, 4, 200.0, 40.0, vec![0]),
        Request::new(4, 0, 150.0, 40.0, vec![1]),
        Request::new(1, 5, 250.0, 30.0, vec![0, 1]),
        Request::new(3, 2, 100.0, 20.0, vec![]),
        Request::new(5, 2, 120.0, 60.0, vec![1, 0]),
        Request::new(0, 4, 180.0, 50.0, vec![0]),
        Request::new(2, 0, 90.0, 50.0, vec![0, 1, 0]),
    ];
    Problem::new(network, catalog, requests).unwrap()
}

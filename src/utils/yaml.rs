use std::fs;

use serde::Deserialize;

use super::config::Config;
use super::error::{Error, Result};
use crate::network::{Network, NodeIndex, Problem, Request, Vnf, VnfCatalog, VnfIndex};

#[derive(Deserialize)]
struct ProblemYaml {
    resources: Vec<String>,
    #[serde(default)]
    directed: bool,
    nodes: Vec<NodeYaml>,
    links: Vec<LinkYaml>,
    vnfs: Vec<VnfYaml>,
    #[serde(default)]
    pairs: Vec<PairYaml>,
    requests: Vec<RequestYaml>,
    prior: Option<Vec<PriorYaml>>,
}

#[derive(Deserialize)]
struct NodeYaml {
    name: String,
    resources: Vec<f64>,
}

#[derive(Deserialize)]
struct LinkYaml {
    ends: [String; 2],
    bandwidth: f64,
    delay: f64,
}

#[derive(Deserialize)]
struct VnfYaml {
    name: String,
    delay: f64,
    capacity: f64,
    resources: Vec<f64>,
    max_instances: Option<usize>,
    #[serde(default)]
    migration_penalty: f64,
}

#[derive(Deserialize)]
struct PairYaml {
    from: String,
    to: String,
    latency: f64,
}

#[derive(Deserialize)]
struct RequestYaml {
    ingress: String,
    egress: String,
    bandwidth: f64,
    max_delay: f64,
    chain: Vec<String>,
}

#[derive(Deserialize)]
struct PriorYaml {
    request: usize,
    hosts: Vec<String>,
}

pub fn load_problem(path: &str) -> Result<Problem> {
    let text = fs::read_to_string(path)?;
    parse_problem(&text)
}

pub fn load_config(path: &str) -> Result<Config> {
    let text = fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&text)?)
}

pub fn parse_problem(text: &str) -> Result<Problem> {
    let yaml: ProblemYaml = serde_yaml::from_str(text)?;

    let mut network = Network::new(yaml.directed);
    for node in yaml.nodes {
        network.add_node(&node.name, node.resources)?;
    }
    for link in yaml.links {
        let [end0, end1] = link.ends;
        let end0 = lookup_node(&network, &end0)?;
        let end1 = lookup_node(&network, &end1)?;
        network.add_link(end0, end1, link.bandwidth, link.delay)?;
    }

    let mut catalog = VnfCatalog::new(yaml.resources);
    for vnf in yaml.vnfs {
        let mut built = Vnf::new(&vnf.name, vnf.delay, vnf.capacity, vnf.resources)
            .with_migration_penalty(vnf.migration_penalty);
        if let Some(max) = vnf.max_instances {
            built = built.with_max_instances(max);
        }
        catalog.add_vnf(built)?;
    }
    for pair in yaml.pairs {
        let from = lookup_vnf(&catalog, &pair.from)?;
        let to = lookup_vnf(&catalog, &pair.to)?;
        catalog.add_pair(from, to, pair.latency);
    }

    let requests = yaml.requests.into_iter()
        .map(|r| -> Result<Request> {
            Ok(Request {
                ingress: lookup_node(&network, &r.ingress)?,
                egress: lookup_node(&network, &r.egress)?,
                bandwidth: r.bandwidth,
                max_delay: r.max_delay,
                chain: r.chain.iter()
                    .map(|name| lookup_vnf(&catalog, name))
                    .collect::<Result<_>>()?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let problem = Problem::new(network, catalog, requests)?;
    let prior = match yaml.prior {
        Some(prior) => prior,
        None        => return Ok(problem),
    };
    let mut hosts: Vec<Option<Vec<NodeIndex>>> = vec![None; problem.requests().len()];
    for entry in prior {
        let order = entry.hosts.iter()
            .map(|name| lookup_node(problem.network(), name))
            .collect::<Result<Vec<NodeIndex>>>()?;
        let slot = hosts.get_mut(entry.request)
            .ok_or(Error::UnknownRequest(entry.request))?;
        *slot = Some(order);
    }
    problem.with_prior(hosts)
}

fn lookup_node(network: &Network, name: &str) -> Result<NodeIndex> {
    network.lookup(name).ok_or_else(|| Error::UnknownNode(name.to_owned()))
}

fn lookup_vnf(catalog: &VnfCatalog, name: &str) -> Result<VnfIndex> {
    catalog.lookup(name).ok_or_else(|| Error::UnknownVnf(name.to_owned()))
}

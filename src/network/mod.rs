mod topology;
mod vnf;
mod request;
mod problem;
#[cfg(test)]
pub mod samples;

pub use topology::{Link, LinkIndex, Network, Node, NodeIndex};
pub use vnf::{Vnf, VnfCatalog, VnfIndex};
pub use request::{Request, RequestIndex};
pub use problem::{Prior, Problem};

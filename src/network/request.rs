use super::{NodeIndex, VnfIndex};

#[derive(Copy, Clone, Debug, Default, PartialEq, PartialOrd, Eq, Ord, Hash)]
pub struct RequestIndex(usize);

impl RequestIndex {
    pub fn index(self) -> usize {
        self.0
    }
}

impl From<usize> for RequestIndex {
    fn from(ix: usize) -> Self {
        RequestIndex(ix)
    }
}

/// A traffic demand that has to pass `chain` in order on its way from
/// `ingress` to `egress`. Its identity is its index in the problem.
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    pub ingress: NodeIndex,
    pub egress: NodeIndex,
    pub bandwidth: f64,
    pub max_delay: f64,
    pub chain: Vec<VnfIndex>,
}

impl Request {
    pub fn new(ingress: usize, egress: usize, bandwidth: f64, max_delay: f64,
               chain: Vec<usize>) -> Self {
        Request {
            ingress: ingress.into(),
            egress: egress.into(),
            bandwidth,
            max_delay,
            chain: chain.into_iter().map(VnfIndex::from).collect(),
        }
    }
}

use hashbrown::HashMap;

use crate::utils::error::{Error, Result};

#[derive(Copy, Clone, Debug, Default, PartialEq, PartialOrd, Eq, Ord, Hash)]
pub struct VnfIndex(usize);

impl VnfIndex {
    pub fn index(self) -> usize {
        self.0
    }
}

impl From<usize> for VnfIndex {
    fn from(ix: usize) -> Self {
        VnfIndex(ix)
    }
}

/// A network function type. Every deployed instance serves at most
/// `capacity` bandwidth and occupies `resources` on its node.
#[derive(Clone, Debug, PartialEq)]
pub struct Vnf {
    pub name: String,
    pub delay: f64,
    pub capacity: f64,
    pub resources: Vec<f64>,
    pub max_instances: Option<usize>,
    pub migration_penalty: f64,
}

impl Vnf {
    pub fn new(name: &str, delay: f64, capacity: f64, resources: Vec<f64>) -> Self {
        Vnf {
            name: name.to_owned(),
            delay,
            capacity,
            resources,
            max_instances: None,
            migration_penalty: 0.0,
        }
    }
    pub fn with_max_instances(mut self, max_instances: usize) -> Self {
        self.max_instances = Some(max_instances);
        self
    }
    pub fn with_migration_penalty(mut self, penalty: f64) -> Self {
        self.migration_penalty = penalty;
        self
    }
    /// 節點的資源 `available` 是否足以再多放一個實例
    pub fn fits(&self, available: &[f64]) -> bool {
        self.resources.iter()
            .zip(available)
            .all(|(need, have)| need <= have)
    }
}

#[derive(Clone, Debug, Default)]
pub struct VnfCatalog {
    resources: Vec<String>,
    vnfs: Vec<Vnf>,
    names: HashMap<String, VnfIndex>,
    pairs: HashMap<(VnfIndex, VnfIndex), f64>,
}

impl VnfCatalog {
    pub fn new(resources: Vec<String>) -> Self {
        VnfCatalog { resources, ..Default::default() }
    }
    /// Names of the resource dimensions, e.g. `["cpu", "ram"]`.
    pub fn resources(&self) -> &[String] {
        &self.resources
    }
    pub fn dimensions(&self) -> usize {
        self.resources.len()
    }
    pub fn len(&self) -> usize {
        self.vnfs.len()
    }
    pub fn is_empty(&self) -> bool {
        self.vnfs.is_empty()
    }
    pub fn vnf(&self, vnf: VnfIndex) -> &Vnf {
        debug_assert!(vnf.index() < self.vnfs.len());
        &self.vnfs[vnf.index()]
    }
    pub fn vnfs(&self) -> impl Iterator<Item=VnfIndex> {
        (0..self.vnfs.len()).map(VnfIndex)
    }
    pub fn lookup(&self, name: &str) -> Option<VnfIndex> {
        self.names.get(name).cloned()
    }
    pub fn add_vnf(&mut self, vnf: Vnf) -> Result<VnfIndex> {
        if self.names.contains_key(&vnf.name) {
            return Err(Error::DuplicateVnf(vnf.name));
        }
        if vnf.resources.len() != self.dimensions() {
            return Err(Error::ResourceDimension {
                what: format!("vnf {:?}", vnf.name),
                found: vnf.resources.len(),
                expected: self.dimensions(),
            });
        }
        let ix = VnfIndex(self.vnfs.len());
        self.names.insert(vnf.name.clone(), ix);
        self.vnfs.push(vnf);
        Ok(ix)
    }
    /// Limits the latency between an instance of `from` and the instance of
    /// `to` that directly follows it in a chain.
    pub fn add_pair(&mut self, from: VnfIndex, to: VnfIndex, latency: f64) {
        self.pairs.insert((from, to), latency);
    }
    pub fn pair_latency(&self, from: VnfIndex, to: VnfIndex) -> Option<f64> {
        self.pairs.get(&(from, to)).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_registers_vnfs_and_pairs() {
        let mut catalog = VnfCatalog::new(vec!["cpu".into(), "ram".into()]);
        let fw = catalog.add_vnf(Vnf::new("fw", 1.0, 500.0, vec![2.0, 1.0])).unwrap();
        let ids = catalog.add_vnf(Vnf::new("ids", 2.0, 300.0, vec![4.0, 2.0])).unwrap();
        catalog.add_pair(fw, ids, 5.0);
        assert_eq!(catalog.lookup("ids"), Some(ids));
        assert_eq!(catalog.pair_latency(fw, ids), Some(5.0));
        assert_eq!(catalog.pair_latency(ids, fw), None);
        assert!(catalog.vnf(fw).fits(&[2.0, 1.0]));
        assert!(!catalog.vnf(ids).fits(&[8.0, 1.0]));
    }

    #[test]
    fn it_rejects_wrong_dimensions() {
        let mut catalog = VnfCatalog::new(vec!["cpu".into()]);
        let result = catalog.add_vnf(Vnf::new("fw", 1.0, 500.0, vec![2.0, 1.0]));
        assert!(matches!(result, Err(Error::ResourceDimension { .. })));
        catalog.add_vnf(Vnf::new("fw", 1.0, 500.0, vec![2.0])).unwrap();
        let result = catalog.add_vnf(Vnf::new("fw", 1.0, 500.0, vec![2.0]));
        assert!(matches!(result, Err(Error::DuplicateVnf(_))));
    }
}

use crate::network::VnfCatalog;
use crate::utils::stats;
use super::Solution;


/// Every raw value a solution is judged by. All of them are minimized.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Objective {
    Unfeasible,
    VnfReplacements,
    FlowMigrationPenalty,
    MeanDelayIndex,
    MedianDelayIndex,
    MaxDelayIndex,
    TotalDelay,
    MeanHopsIndex,
    MedianHopsIndex,
    MaxHopsIndex,
    NumberOfHops,
    /// total usage of one resource dimension over all nodes
    UsedResource(usize),
    MeanInverseLoadIndex,
    MedianInverseLoadIndex,
    VnfInstances,
    RootedVnfLoads,
    DelayViolations,
    /// one per (node, dimension) with negative remaining resources
    ResourceViolations,
    ExcessiveVnfs,
    CongestedLinks,
    OverloadedVnfCapacity,
    RootedExcessiveVnfCapacity,
}

impl Objective {
    /// The complete table for `dimensions` resource dimensions.
    pub fn all(dimensions: usize) -> Vec<Objective> {
        use Objective::*;
        let mut all = vec![
            Unfeasible, VnfReplacements, FlowMigrationPenalty,
            MeanDelayIndex, MedianDelayIndex, MaxDelayIndex, TotalDelay,
            MeanHopsIndex, MedianHopsIndex, MaxHopsIndex, NumberOfHops,
        ];
        all.extend((0..dimensions).map(UsedResource));
        all.extend(vec![
            MeanInverseLoadIndex, MedianInverseLoadIndex, VnfInstances, RootedVnfLoads,
            DelayViolations, ResourceViolations, ExcessiveVnfs, CongestedLinks,
            OverloadedVnfCapacity, RootedExcessiveVnfCapacity,
        ]);
        all
    }
    pub fn name(&self, catalog: &VnfCatalog) -> String {
        use Objective::*;
        let name = match self {
            Unfeasible                 => "UNFEASIBLE",
            VnfReplacements            => "NUMBER_OF_VNF_REPLACEMENTS",
            FlowMigrationPenalty       => "TOTAL_FLOW_MIGRATION_PENALTY",
            MeanDelayIndex             => "MEAN_DELAY_INDEX",
            MedianDelayIndex           => "MEDIAN_DELAY_INDEX",
            MaxDelayIndex              => "MAX_DELAY_INDEX",
            TotalDelay                 => "TOTAL_DELAY",
            MeanHopsIndex              => "MEAN_HOPS_INDEX",
            MedianHopsIndex            => "MEDIAN_HOPS_INDEX",
            MaxHopsIndex               => "MAX_HOPS_INDEX",
            NumberOfHops               => "NUMBER_OF_HOPS",
            UsedResource(dim)          => {
                let resource = catalog.resources().get(*dim)
                    .map_or_else(|| dim.to_string(), |r| r.to_uppercase());
                return format!("TOTAL_USED_{}", resource);
            },
            MeanInverseLoadIndex       => "MEAN_INVERSE_LOAD_INDEX",
            MedianInverseLoadIndex     => "MEDIAN_INVERSE_LOAD_INDEX",
            VnfInstances               => "NUMBER_OF_VNF_INSTANCES",
            RootedVnfLoads             => "TOTAL_ROOTED_VNF_LOADS",
            DelayViolations            => "NUMBER_OF_DELAY_VIOLATIONS",
            ResourceViolations         => "NUMBER_OF_RESOURCE_VIOLATIONS",
            ExcessiveVnfs              => "NUMBER_OF_EXCESSIVE_VNFS",
            CongestedLinks             => "NUMBER_OF_CONGESTED_LINKS",
            OverloadedVnfCapacity      => "TOTAL_OVERLOADED_VNF_CAPACITY",
            RootedExcessiveVnfCapacity => "TOTAL_ROOTED_EXCESSIVE_VNF_CAPACITY",
        };
        name.to_owned()
    }
}


#[derive(Clone, Debug, Default, PartialEq)]
pub struct Evaluation {
    unfeasible: bool,
    vnf_replacements: f64,
    flow_migration_penalty: f64,
    /// mean, median, max
    delay_index: [f64; 3],
    total_delay: f64,
    /// mean, median, max
    hops_index: [f64; 3],
    number_of_hops: f64,
    used_resources: Vec<f64>,
    /// mean, median
    inverse_load_index: [f64; 2],
    vnf_instances: f64,
    rooted_vnf_loads: f64,
    delay_violations: f64,
    resource_violations: f64,
    excessive_vnfs: f64,
    congested_links: f64,
    overloaded_vnf_capacity: f64,
    rooted_excessive_vnf_capacity: f64,
}

impl Evaluation {
    pub fn get(&self, objective: Objective) -> f64 {
        use Objective::*;
        match objective {
            Unfeasible                 => self.unfeasible as usize as f64,
            VnfReplacements            => self.vnf_replacements,
            FlowMigrationPenalty       => self.flow_migration_penalty,
            MeanDelayIndex             => self.delay_index[0],
            MedianDelayIndex           => self.delay_index[1],
            MaxDelayIndex              => self.delay_index[2],
            TotalDelay                 => self.total_delay,
            MeanHopsIndex              => self.hops_index[0],
            MedianHopsIndex            => self.hops_index[1],
            MaxHopsIndex               => self.hops_index[2],
            NumberOfHops               => self.number_of_hops,
            UsedResource(dim)          => self.used_resources.get(dim).cloned().unwrap_or(0.0),
            MeanInverseLoadIndex       => self.inverse_load_index[0],
            MedianInverseLoadIndex     => self.inverse_load_index[1],
            VnfInstances               => self.vnf_instances,
            RootedVnfLoads             => self.rooted_vnf_loads,
            DelayViolations            => self.delay_violations,
            ResourceViolations         => self.resource_violations,
            ExcessiveVnfs              => self.excessive_vnfs,
            CongestedLinks             => self.congested_links,
            OverloadedVnfCapacity      => self.overloaded_vnf_capacity,
            RootedExcessiveVnfCapacity => self.rooted_excessive_vnf_capacity,
        }
    }
    pub fn is_unfeasible(&self) -> bool {
        self.unfeasible
    }
}


/// 依照目前的 overview 重新計算所有目標值
pub fn evaluate(solution: &Solution) -> Evaluation {
    let problem = solution.problem();
    let catalog = problem.catalog();
    let mut eval = Evaluation::default();

    let mut delay_indices = vec![];
    let mut hops_indices = vec![];
    for assignment in solution.assignments() {
        delay_indices.push(assignment.delay_index());
        hops_indices.push(assignment.hops_index());
        eval.total_delay += assignment.delay();
        eval.number_of_hops += assignment.hops() as f64;
        if assignment.delay() > problem.request(assignment.request()).max_delay {
            eval.delay_violations += 1.0;
        }
    }
    eval.delay_index = [
        stats::mean(&delay_indices), stats::median(&delay_indices), stats::max(&delay_indices),
    ];
    eval.hops_index = [
        stats::mean(&hops_indices), stats::median(&hops_indices), stats::max(&hops_indices),
    ];

    let mut inverse_loads = vec![];
    eval.used_resources = vec![0.0; catalog.dimensions()];
    for (node, overview) in solution.nodes() {
        let capacity = problem.network().node(node).resources();
        for (dim, (&cap, &left)) in capacity.iter().zip(overview.remaining()).enumerate() {
            eval.used_resources[dim] += cap - left;
            if left < 0.0 {
                eval.resource_violations += 1.0;
            }
        }
        let overloaded = overview.violates_resources();
        for (vnf, instances) in overview.all_instances() {
            let capacity = catalog.vnf(vnf).capacity;
            eval.vnf_instances += instances.count() as f64;
            for &load in instances.loads() {
                inverse_loads.push(capacity / load);
                eval.rooted_vnf_loads += load.sqrt();
                if overloaded {
                    eval.overloaded_vnf_capacity += load;
                }
            }
        }
    }
    eval.inverse_load_index = [stats::mean(&inverse_loads), stats::median(&inverse_loads)];

    for (vnf, overview) in solution.vnf_types() {
        let max = match catalog.vnf(vnf).max_instances {
            Some(max) if overview.total() > max => max,
            _ => continue,
        };
        eval.excessive_vnfs += (overview.total() - max) as f64;
        for (node, _) in overview.locations() {
            if let Some(instances) = solution.node(node).instances(vnf) {
                eval.rooted_excessive_vnf_capacity += instances.loads().iter()
                    .map(|load| load.sqrt())
                    .sum::<f64>();
            }
        }
    }

    eval.congested_links = solution.links()
        .filter(|(_, overview)| overview.is_congested())
        .count() as f64;

    if let Some(prior) = problem.prior() {
        for (node, vnf, count) in prior.instances() {
            let now = solution.node(node).instance_count(vnf);
            eval.vnf_replacements += count.saturating_sub(now) as f64;
        }
        for assignment in solution.assignments() {
            let before = match prior.hosts(assignment.request()) {
                Some(hosts) => hosts,
                None        => continue,
            };
            let chain = &problem.request(assignment.request()).chain;
            for ((old, new), &vnf) in before.iter().zip(assignment.hosts()).zip(chain) {
                if *old != new {
                    eval.flow_migration_penalty += catalog.vnf(vnf).migration_penalty;
                }
            }
        }
    }

    eval.unfeasible = eval.delay_violations + eval.resource_violations
        + eval.excessive_vnfs + eval.congested_links > 0.0;
    eval
}

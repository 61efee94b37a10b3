use std::sync::Arc;

use enum_dispatch::enum_dispatch;
use rand::Rng;

use super::greedy;
use super::neighbour::random_selection;
use super::psa::Psa;
use crate::component::Solution;
use crate::utils::config::{InitMode, Parameters};
use crate::utils::error::Result;


/// Builds the initial population, one solution per chain.
#[enum_dispatch]
pub enum SeedingEnum {
    RandomSeeding,
    ShortPsaSeeding,
    LeastDelaySeeding,
    LeastCpuSeeding,
}

#[enum_dispatch(SeedingEnum)]
pub trait Seeding {
    fn seed(&self, psa: &mut Psa) -> Result<Vec<Solution>>;
}

impl From<InitMode> for SeedingEnum {
    fn from(mode: InitMode) -> Self {
        match mode {
            InitMode::Random     => RandomSeeding.into(),
            InitMode::ShortPsa   => ShortPsaSeeding.into(),
            InitMode::LeastDelay => LeastDelaySeeding.into(),
            InitMode::LeastCpu   => LeastCpuSeeding.into(),
        }
    }
}


/// Every vnf of every request on a uniformly drawn node.
pub struct RandomSeeding;

impl Seeding for RandomSeeding {
    fn seed(&self, psa: &mut Psa) -> Result<Vec<Solution>> {
        let problem = Arc::clone(psa.problem());
        let strategy = Arc::clone(psa.strategy());
        let requests: Vec<_> = problem.request_indices().collect();
        let empty = Solution::empty(problem, strategy);
        (0..psa.parameters().s)
            .map(|_| random_selection(&empty, &requests, psa.rng()))
            .collect()
    }
}

/// The frontier of a quarter-length run from random solutions, dealt out
/// round robin over the chains.
pub struct ShortPsaSeeding;

impl Seeding for ShortPsaSeeding {
    fn seed(&self, psa: &mut Psa) -> Result<Vec<Solution>> {
        let parameters = *psa.parameters();
        let short = Parameters {
            s: (parameters.s / 4).max(1),
            m: parameters.m / 4,
            rho: parameters.rho * parameters.rho,
            runtime: parameters.runtime / 4.0,
            ..parameters
        };
        let seed = psa.rng().gen();
        let mut pre = Psa::new(psa.problem().clone(), psa.strategy().clone(), short, seed)?;
        let front = pre.run(&RandomSeeding)?.into_vec();
        log::debug!("short PSA left {} solutions to seed {} chains", front.len(), parameters.s);
        if front.is_empty() {
            return Ok(vec![]);
        }
        Ok((0..parameters.s).map(|i| front[i % front.len()].clone()).collect())
    }
}

/// Copies of the greedy least delay placement, each with its own tie breaks.
pub struct LeastDelaySeeding;

impl Seeding for LeastDelaySeeding {
    fn seed(&self, psa: &mut Psa) -> Result<Vec<Solution>> {
        let problem = psa.problem().clone();
        let strategy = psa.strategy().clone();
        (0..psa.parameters().s)
            .map(|_| greedy::least_delay(&problem, &strategy, psa.rng()))
            .collect()
    }
}

/// Copies of the greedy placement on the most central nodes.
pub struct LeastCpuSeeding;

impl Seeding for LeastCpuSeeding {
    fn seed(&self, psa: &mut Psa) -> Result<Vec<Solution>> {
        let s = psa.parameters().s;
        if s == 0 {
            return Ok(vec![]);
        }
        let solution = greedy::centrality(psa.problem(), psa.strategy())?;
        Ok(vec![solution; s])
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::samples;
    use crate::utils::strategy::Strategy;

    fn psa(s: usize) -> Psa {
        let parameters = Parameters { s, m: 40, tmax: 4.0, tmin: 1.0, rho: 0.5, runtime: 0.0 };
        Psa::new(Arc::new(samples::ring()), Arc::new(Strategy::default()), parameters, 11).unwrap()
    }

    #[test]
    fn it_seeds_one_solution_per_chain() {
        for mode in [InitMode::Random, InitMode::ShortPsa, InitMode::LeastDelay, InitMode::LeastCpu].iter() {
            let seeding = SeedingEnum::from(*mode);
            let solutions = seeding.seed(&mut psa(5)).unwrap();
            assert_eq!(solutions.len(), 5, "{:?}", mode);
            assert!(solutions.iter().all(|s| s.is_complete()), "{:?}", mode);
        }
    }

    #[test]
    fn it_seeds_nothing_without_chains() {
        assert!(RandomSeeding.seed(&mut psa(0)).unwrap().is_empty());
        assert!(LeastCpuSeeding.seed(&mut psa(0)).unwrap().is_empty());
        assert!(LeastDelaySeeding.seed(&mut psa(0)).unwrap().is_empty());
    }

    #[test]
    fn it_places_random_vnfs_on_hosts() {
        let mut psa = psa(3);
        let hosts = psa.problem().host_nodes().to_vec();
        for solution in RandomSeeding.seed(&mut psa).unwrap() {
            for assignment in solution.assignments() {
                assert!(assignment.hosts().iter().all(|node| hosts.contains(node)));
            }
        }
    }
}

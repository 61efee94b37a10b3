use log::{debug, info, trace};

use crate::component::{Frontier, Solution};
use crate::network::Problem;
use super::config::Parameters;
use super::strategy::Schedule;


/// What happened during one temperature level.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LevelReport {
    pub p_reassign_vnf: f64,
    pub p_new_instance: f64,
    /// accepted neighbours over all neighbours drawn in the level
    pub acceptance_ratio: f64,
    pub neighbours: usize,
}

/// Hooks into a running optimization. `run_start`, `level_start`,
/// `level_end` and `run_end` are called from the driving thread between
/// levels; `frontier_insertion` and `inner_iteration` are called from the
/// chain workers.
pub trait Observer: Send + Sync {
    fn run_start(&self, _problem: &Problem, _parameters: &Parameters) {}
    fn level_start(&self, _schedule: &Schedule) {}
    fn level_end(&self, _schedule: &Schedule, _report: &LevelReport, _frontier: &Frontier) {}
    fn frontier_insertion(&self, _schedule: &Schedule, _chain: usize, _solution: &Solution) {}
    fn inner_iteration(&self, _schedule: &Schedule, _chain: usize, _current: &Solution) {}
    fn run_end(&self, _frontier: &Frontier) {}
}


/// Writes the progress of a run to the `log` facade.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogObserver;

impl Observer for LogObserver {
    fn run_start(&self, problem: &Problem, parameters: &Parameters) {
        info!("start PSA on {} nodes, {} links and {} requests with {:?}",
              problem.network().node_count(), problem.network().link_count(),
              problem.requests().len(), parameters);
    }
    fn level_start(&self, schedule: &Schedule) {
        debug!("level {}/{} at temperature {:.3}",
               schedule.level + 1, schedule.levels, schedule.temperature);
    }
    fn level_end(&self, schedule: &Schedule, report: &LevelReport, frontier: &Frontier) {
        info!("level {}/{} done, frontier holds {} solutions ({} feasible)",
              schedule.level + 1, schedule.levels, frontier.len(),
              frontier.feasible_subfront().len());
        debug!("pReassignVnf={:.3} pNewInstance={:.3} acceptanceRatio={:.3} over {} neighbours",
               report.p_reassign_vnf, report.p_new_instance,
               report.acceptance_ratio, report.neighbours);
    }
    fn frontier_insertion(&self, schedule: &Schedule, chain: usize, solution: &Solution) {
        trace!("chain {} inserted {:?} into its frontier at level {}",
               chain, solution.objective_vector(), schedule.level);
    }
    fn inner_iteration(&self, _schedule: &Schedule, chain: usize, current: &Solution) {
        trace!("chain {} now at {:?}", chain, current.objective_vector());
    }
    fn run_end(&self, frontier: &Frontier) {
        info!("PSA finished with {} solutions", frontier.len());
    }
}

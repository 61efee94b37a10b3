use std::fmt::Write;
use std::sync::Arc;
use std::time::Instant;

use itertools::Itertools;
use ordered_float::OrderedFloat;

use crate::algorithm::{Psa, SeedingEnum};
use crate::component::{Frontier, Solution};
use crate::network::Problem;
use crate::utils::config::Config;
use crate::utils::error::Result;
use crate::utils::observer::Observer;
use crate::utils::strategy::Strategy;


/// Orchestrates one placement run: wires the problem, the configuration and
/// the strategy bundle into an optimizer and keeps the resulting frontier.
pub struct Nfvo {
    problem: Arc<Problem>,
    strategy: Arc<Strategy>,
    config: Config,
    observers: Vec<Arc<dyn Observer>>,
    frontier: Option<Frontier>,
}

impl Nfvo {
    pub fn new(problem: Problem, config: Config) -> Self {
        let strategy = Strategy::default().with_weights(config.weights);
        Nfvo {
            problem: Arc::new(problem),
            strategy: Arc::new(strategy),
            config,
            observers: vec![],
            frontier: None,
        }
    }
    /// Replaces the default strategy bundle, weights included.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = Arc::new(strategy);
        self
    }
    pub fn add_observer(&mut self, observer: Arc<dyn Observer>) {
        self.observers.push(observer);
    }
    pub fn problem(&self) -> &Problem {
        &self.problem
    }
    pub fn config(&self) -> &Config {
        &self.config
    }
    pub fn frontier(&self) -> Option<&Frontier> {
        self.frontier.as_ref()
    }
    /// Runs the optimizer and returns the computing time in microseconds.
    pub fn configure(&mut self) -> Result<u128> {
        let mut psa = Psa::new(Arc::clone(&self.problem), Arc::clone(&self.strategy),
                               self.config.parameters, self.config.seed)?;
        for observer in self.observers.iter() {
            psa.add_observer(Arc::clone(observer));
        }
        let seeding = SeedingEnum::from(self.config.init);

        let start = Instant::now();
        let frontier = psa.run(&seeding)?;
        let elapsed = start.elapsed().as_micros();

        log::info!("{} found {} solutions in {} μs", self.config.name, frontier.len(), elapsed);
        self.frontier = Some(frontier);
        Ok(elapsed)
    }
    /// Feasible solutions first, each group ordered by the first objective.
    pub fn report(&self) -> String {
        let mut msg = String::new();
        let frontier = match self.frontier.as_ref() {
            Some(frontier) => frontier,
            None => {
                writeln!(msg, "not configured yet").unwrap();
                return msg;
            },
        };
        writeln!(msg, "the frontier holds {} solutions, {} feasible",
                 frontier.len(), frontier.feasible_subfront().len()).unwrap();
        if frontier.is_empty() {
            return msg;
        }
        writeln!(msg, "objectives range from [{:.2}] to [{:.2}]",
                 frontier.get_min().iter().format(", "),
                 frontier.get_max().iter().format(", ")).unwrap();

        let ordered: Vec<&Solution> = frontier.iter()
            .sorted_by_key(|s| {
                let first = s.objective_vector().first().cloned().unwrap_or(0.0);
                (!s.is_feasible(), OrderedFloat(first))
            })
            .collect();
        for (i, solution) in ordered.iter().enumerate() {
            writeln!(msg, "--- solution #{} ---", i).unwrap();
            write!(msg, "{}", solution).unwrap();
            if let Some(next) = ordered.get(i + 1) {
                writeln!(msg, "distance to the next solution {:.3}",
                         Frontier::distance(solution, next)).unwrap();
            }
        }
        writeln!(msg, "{}", Solution::csv_header(&self.problem)).unwrap();
        for solution in ordered {
            writeln!(msg, "{}", solution.csv_row()).unwrap();
        }
        msg
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::samples;
    use crate::utils::config::{InitMode, Parameters};
    use crate::utils::error::Error;
    use crate::utils::strategy::Weights;

    fn config(init: InitMode) -> Config {
        Config {
            name: String::from("test"),
            seed: 42,
            init,
            parameters: Parameters { s: 2, m: 20, tmax: 4.0, tmin: 1.0, rho: 0.5, runtime: 0.0 },
            weights: Weights::default(),
        }
    }

    #[test]
    fn it_reports_the_frontier() {
        let mut nfvo = Nfvo::new(samples::line(), config(InitMode::LeastCpu));
        assert!(nfvo.report().contains("not configured"));
        nfvo.configure().unwrap();
        let report = nfvo.report();
        assert!(report.contains("solution #0"));
        assert!(report.starts_with("the frontier holds"));
        assert!(report.contains("MEAN_DELAY_INDEX"));
        assert!(!nfvo.frontier().unwrap().is_empty());
    }

    #[test]
    fn it_configures_with_custom_strategy() {
        let mut nfvo = Nfvo::new(samples::ring(), config(InitMode::Random));
        nfvo.configure().unwrap();
        nfvo.configure().unwrap();
        let strategy = Strategy { weights: Weights { use_weights: false, ..Weights::default() },
                                  ..Strategy::default() };
        let mut nfvo = Nfvo::new(samples::ring(), config(InitMode::LeastDelay))
            .with_strategy(strategy);
        nfvo.configure().unwrap();
        assert!(nfvo.frontier().unwrap().iter().all(|s| s.is_complete()));
    }

    #[test]
    fn it_rejects_bad_parameters() {
        let mut config = config(InitMode::Random);
        config.parameters.rho = 1.5;
        let mut nfvo = Nfvo::new(samples::line(), config);
        assert!(matches!(nfvo.configure(), Err(Error::InvalidParameter("rho", _))));
    }
}

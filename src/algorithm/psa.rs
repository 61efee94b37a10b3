use std::sync::mpsc::channel;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaChaRng;

use super::neighbour::{replace_one_flow, replace_one_instance};
use super::seeding::Seeding;
use crate::component::{dominance, Frontier, Solution};
use crate::network::Problem;
use crate::utils::config::Parameters;
use crate::utils::error::{Error, Result};
use crate::utils::observer::{LevelReport, Observer};
use crate::utils::strategy::{Counters, Schedule, Strategy};


/// How long one chain keeps drawing neighbours within a level.
#[derive(Clone, Copy, Debug)]
enum Budget {
    Iterations(usize),
    Until(Instant),
}

/// Everything a chain worker needs to know about the current level.
struct Level {
    strategy: Arc<Strategy>,
    schedule: Schedule,
    p_reassign_vnf: f64,
    p_new_instance: f64,
    budget: Budget,
    observers: Vec<Arc<dyn Observer>>,
}

/// One lineage of solutions with its own copy of the frontier.
struct Chain {
    current: Solution,
    frontier: Frontier,
    counters: Counters,
}

struct Task {
    index: usize,
    chain: Chain,
    rng: ChaChaRng,
}

struct Outcome {
    chain: Chain,
    accepted: usize,
}


/// Parallel Pareto simulated annealing. Every instance runs at most once.
pub struct Psa {
    problem: Arc<Problem>,
    strategy: Arc<Strategy>,
    parameters: Parameters,
    rng: ChaChaRng,
    observers: Vec<Arc<dyn Observer>>,
    /// neighbour statistics of every chain from the last level
    counters: Option<Vec<Counters>>,
    executed: bool,
}

impl Psa {
    pub fn new(problem: Arc<Problem>, strategy: Arc<Strategy>, parameters: Parameters,
               seed: u64) -> Result<Self> {
        let Parameters { tmax, tmin, rho, runtime, .. } = parameters;
        if !(tmin > 0.0 && tmin.is_finite()) {
            return Err(Error::InvalidParameter("tmin", tmin.to_string()));
        }
        if !(tmax >= tmin && tmax.is_finite()) {
            return Err(Error::InvalidParameter("tmax", tmax.to_string()));
        }
        if !(rho > 0.0 && rho < 1.0) {
            return Err(Error::InvalidParameter("rho", rho.to_string()));
        }
        if !runtime.is_finite() {
            return Err(Error::InvalidParameter("runtime", runtime.to_string()));
        }
        Ok(Psa {
            problem,
            strategy,
            parameters,
            rng: ChaChaRng::seed_from_u64(seed),
            observers: vec![],
            counters: None,
            executed: false,
        })
    }
    pub fn add_observer(&mut self, observer: Arc<dyn Observer>) {
        self.observers.push(observer);
    }
    pub fn problem(&self) -> &Arc<Problem> {
        &self.problem
    }
    pub fn strategy(&self) -> &Arc<Strategy> {
        &self.strategy
    }
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }
    pub(crate) fn rng(&mut self) -> &mut ChaChaRng {
        &mut self.rng
    }
    /// Number of temperature levels between `tmax` and `tmin`.
    pub fn levels(&self) -> usize {
        let Parameters { tmax, tmin, rho, .. } = self.parameters;
        let levels = ((tmin / tmax).ln() / rho.ln()).ceil();
        if levels.is_finite() && levels > 0.0 { levels as usize } else { 0 }
    }

    /// Seeds the population with `seeding`, then anneals it.
    pub fn run<S: Seeding>(&mut self, seeding: &S) -> Result<Frontier> {
        if self.executed {
            return Err(Error::AlreadyExecuted);
        }
        let solutions = seeding.seed(self)?;
        self.run_with(solutions)
    }

    /// Anneals the given population, one chain per solution, and returns the
    /// frontier of all solutions visited.
    pub fn run_with(&mut self, solutions: Vec<Solution>) -> Result<Frontier> {
        if self.executed {
            return Err(Error::AlreadyExecuted);
        }
        self.executed = true;
        for observer in self.observers.iter() {
            observer.run_start(&self.problem, &self.parameters);
        }
        if solutions.is_empty() {
            let frontier = Frontier::new();
            for observer in self.observers.iter() {
                observer.run_end(&frontier);
            }
            return Ok(frontier);
        }
        if self.counters.is_none() {
            self.calibrate(&solutions[0])?;
        }
        let counters = match self.counters.take() {
            Some(counters) if !counters.is_empty() => counters,
            _ => vec![Counters::default()],
        };

        let mut frontier = Frontier::brute_force(solutions.clone());
        let mut chains: Vec<Chain> = solutions.into_iter()
            .enumerate()
            .map(|(i, current)| Chain {
                current,
                frontier: frontier.clone(),
                counters: counters[i % counters.len()],
            })
            .collect();

        let Parameters { m, tmax, tmin, rho, runtime, .. } = self.parameters;
        let levels = self.levels().max(1);
        let start = Instant::now();
        let mut temperature = tmax;
        let mut level = 0;
        while temperature > tmin {
            let schedule = Schedule { temperature, level, levels, tmax };
            for observer in self.observers.iter() {
                observer.level_start(&schedule);
            }
            let budget = if runtime > 0.0 {
                let share = runtime * (level + 1) as f64 / levels as f64;
                Budget::Until(start + Duration::from_secs_f64(share))
            } else {
                Budget::Iterations(m)
            };
            let context = Arc::new(Level {
                strategy: Arc::clone(&self.strategy),
                schedule,
                p_reassign_vnf: (self.strategy.p_reassign_vnf)(&schedule),
                p_new_instance: (self.strategy.p_new_instance)(&schedule),
                budget,
                observers: self.observers.clone(),
            });
            let tasks: Vec<Task> = chains.into_iter()
                .enumerate()
                .map(|(index, chain)| Task {
                    index,
                    chain,
                    rng: ChaChaRng::seed_from_u64(self.rng.gen()),
                })
                .collect();

            let outcomes = run_level(tasks, &context)?;

            // 柵欄：合併所有鏈的前緣，再發回每條鏈
            let mut accepted = 0;
            let mut neighbours = 0;
            for outcome in outcomes.iter() {
                frontier.merge(&outcome.chain.frontier);
                accepted += outcome.accepted;
                neighbours += outcome.chain.counters.iterations;
            }
            chains = outcomes.into_iter()
                .map(|outcome| Chain { frontier: frontier.clone(), ..outcome.chain })
                .collect();

            let report = LevelReport {
                p_reassign_vnf: context.p_reassign_vnf,
                p_new_instance: context.p_new_instance,
                acceptance_ratio: if neighbours > 0 { accepted as f64 / neighbours as f64 } else { 0.0 },
                neighbours,
            };
            for observer in self.observers.iter() {
                observer.level_end(&schedule, &report, &frontier);
            }
            temperature *= rho;
            level += 1;
        }

        self.counters = Some(chains.iter().map(|chain| chain.counters).collect());
        for observer in self.observers.iter() {
            observer.run_end(&frontier);
        }
        Ok(frontier)
    }

    /// A short silent run of a single chain that yields the neighbour
    /// statistics the first level's acceptance probabilities are based on.
    fn calibrate(&mut self, solution: &Solution) -> Result<()> {
        let m = self.parameters.m.min(100);
        let preset = Counters {
            dominating: (m / 2).min(50),
            incomparable: (m / 2).min(50),
            iterations: m,
        };
        let mut calibration = Psa {
            problem: Arc::clone(&self.problem),
            strategy: Arc::clone(&self.strategy),
            parameters: Parameters { s: 1, m, rho: 0.0, runtime: 0.0, ..self.parameters },
            rng: ChaChaRng::seed_from_u64(self.rng.gen()),
            observers: vec![],
            counters: Some(vec![preset]),
            executed: false,
        };
        calibration.run_with(vec![solution.clone()])?;
        let measured = calibration.counters
            .and_then(|counters| counters.first().cloned())
            .unwrap_or(preset);
        log::debug!("calibrated acceptance feedback with {:?}", measured);
        self.counters = Some(vec![measured]);
        Ok(())
    }
}

/// Runs every chain task of one level on a fixed pool of worker threads and
/// waits for all of them. The outcomes are returned in chain order.
fn run_level(tasks: Vec<Task>, context: &Arc<Level>) -> Result<Vec<Outcome>> {
    let count = tasks.len();
    let n_threads = num_cpus::get().min(count).max(1);
    let queue = Arc::new(Mutex::new(tasks));
    let (sender, receiver) = channel();

    let workers: Vec<_> = (0..n_threads)
        .map(|_| {
            let queue = Arc::clone(&queue);
            let sender = sender.clone();
            let context = Arc::clone(context);
            thread::spawn(move || loop {
                let task = match queue.lock() {
                    Ok(mut queue) => queue.pop(),
                    Err(_)        => None,
                };
                let task = match task {
                    Some(task) => task,
                    None       => break,
                };
                let index = task.index;
                if sender.send((index, anneal(task, &context))).is_err() {
                    break;
                }
            })
        })
        .collect();
    drop(sender);

    let mut outcomes: Vec<Option<Outcome>> = (0..count).map(|_| None).collect();
    let mut failure = None;
    for (index, result) in receiver {
        match result {
            Ok(outcome) => outcomes[index] = Some(outcome),
            Err(err) => {
                log::warn!("chain {} failed: {}", index, err);
                failure.get_or_insert(Error::ChainFailed(index, err.to_string()));
            },
        }
    }
    for worker in workers {
        if worker.join().is_err() {
            failure.get_or_insert_with(|| {
                let index = outcomes.iter().position(Option::is_none).unwrap_or(0);
                Error::ChainFailed(index, String::from("worker thread panicked"))
            });
        }
    }
    if let Some(err) = failure {
        return Err(err);
    }
    outcomes.into_iter()
        .enumerate()
        .map(|(index, outcome)| outcome
            .ok_or_else(|| Error::ChainFailed(index, String::from("no result"))))
        .collect()
}

/// The inner loop of one chain over one level.
fn anneal(task: Task, level: &Level) -> Result<Outcome> {
    let Task { index, mut chain, mut rng } = task;
    let strategy = &level.strategy;
    let schedule = &level.schedule;
    let accept_worse = (strategy.accept_worse)(schedule, &chain.counters);
    let accept_incomparable = (strategy.accept_incomparable)(schedule, &chain.counters);
    chain.counters = Counters::default();

    let mut accepted = 0;
    loop {
        let exhausted = match level.budget {
            Budget::Iterations(m)   => chain.counters.iterations >= m,
            Budget::Until(deadline) => Instant::now() >= deadline,
        };
        if exhausted {
            break;
        }

        let neighbour = if rng.gen::<f64>() <= level.p_reassign_vnf {
            replace_one_instance(&chain.current, level.p_new_instance, &mut rng)?
        } else {
            replace_one_flow(&chain.current, level.p_new_instance, &mut rng)?
        };

        let (current, next) = (chain.current.frontier_vector(), neighbour.frontier_vector());
        if next == current || dominance(next, current) == 1 {
            chain.counters.dominating += 1;
        } else if dominance(current, next) == 0 {
            chain.counters.incomparable += 1;
        }
        chain.counters.iterations += 1;

        if dominance(current, next) != 1
            && chain.frontier.update(neighbour.clone()).is_some() {
            for observer in level.observers.iter() {
                observer.frontier_insertion(schedule, index, &neighbour);
            }
        }

        let p = acceptance(&chain.current, &neighbour, accept_worse, accept_incomparable);
        if rng.gen::<f64>() <= p {
            chain.current = neighbour;
            accepted += 1;
        }
        for observer in level.observers.iter() {
            observer.inner_iteration(schedule, index, &chain.current);
        }
    }
    Ok(Outcome { chain, accepted })
}

/// Probability of moving from `current` to `next`. Feasibility counts first;
/// two unfeasible solutions are compared by their unfeasible vectors.
fn acceptance(current: &Solution, next: &Solution, worse: f64, incomparable: f64) -> f64 {
    let (x, y) = match (current.is_feasible(), next.is_feasible()) {
        (false, true)  => return 1.0,
        (true, false)  => return worse,
        (false, false) => (current.unfeasible_vector(), next.unfeasible_vector()),
        (true, true)   => (current.objective_vector(), next.objective_vector()),
    };
    if x == y || dominance(y, x) == 1 {
        1.0
    } else if dominance(x, y) == 0 {
        incomparable
    } else {
        worse
    }
}

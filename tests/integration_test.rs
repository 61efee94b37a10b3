use std::sync::Arc;

use vnf_psa::nfvo::Nfvo;
use vnf_psa::utils::config::{Config, InitMode};
use vnf_psa::utils::observer::LogObserver;
use vnf_psa::utils::yaml;

fn quick_config(init: InitMode) -> Config {
    let mut config = yaml::load_config("data/config/quick.yaml").unwrap();
    config.init = init;
    config
}

fn run(problem: &str, init: InitMode) -> Nfvo {
    let problem = yaml::load_problem(problem).unwrap();
    let mut nfvo = Nfvo::new(problem, quick_config(init));
    nfvo.add_observer(Arc::new(LogObserver));
    nfvo.configure().unwrap();
    nfvo
}

#[test]
fn it_runs_random() {
    let nfvo = run("data/problem/ring.yaml", InitMode::Random);
    assert!(!nfvo.frontier().unwrap().is_empty());
}

#[test]
fn it_runs_short_psa() {
    let nfvo = run("data/problem/ring.yaml", InitMode::ShortPsa);
    assert!(!nfvo.frontier().unwrap().is_empty());
}

#[test]
fn it_runs_least_delay() {
    let nfvo = run("data/problem/ring.yaml", InitMode::LeastDelay);
    assert!(nfvo.frontier().unwrap().iter().all(|s| s.is_complete()));
}

#[test]
fn it_runs_least_cpu() {
    let nfvo = run("data/problem/ring.yaml", InitMode::LeastCpu);
    assert!(nfvo.report().contains("solution #0"));
}

#[test]
fn it_solves_line() {
    let nfvo = run("data/problem/line.yaml", InitMode::Random);
    let frontier = nfvo.frontier().unwrap();
    let feasible = frontier.feasible_subfront();
    assert_eq!(feasible.len(), 1);
    assert_eq!(feasible[0].objective_vector(), &[1.0, 1.0, 1.0]);
}

#[test]
fn it_is_reproducible() {
    let first = run("data/problem/ring.yaml", InitMode::Random).report();
    let second = run("data/problem/ring.yaml", InitMode::Random).report();
    assert_eq!(first, second);
}

use serde::Deserialize;
use argh::FromArgs;

use super::strategy::Weights;

/// Place virtual network functions with parallel Pareto simulated annealing
#[derive(FromArgs)]
pub struct Arguments {
    #[argh(positional)]
    pub problem: String,
    /// path to configuration file
    #[argh(option, short='c', default="String::from(\"data/config/default.yaml\")")]
    pub config: String,
    /// override random seed
    #[argh(option)]
    pub seed: Option<u64>,
    /// override number of parallel chains
    #[argh(option, short='s')]
    pub chains: Option<usize>,
    /// override iterations per temperature level
    #[argh(option, short='m')]
    pub iterations: Option<usize>,
    /// override runtime in seconds, 0 for iteration bounded levels
    #[argh(option, short='r')]
    pub runtime: Option<f64>,
    /// override initial population: RAND, SHORT_PSA, LEAST_DELAY or LEAST_CPU
    #[argh(option, short='i')]
    pub init: Option<String>,
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitMode {
    #[serde(rename = "RAND")]
    Random,
    #[serde(rename = "SHORT_PSA")]
    ShortPsa,
    #[serde(rename = "LEAST_DELAY")]
    LeastDelay,
    #[serde(rename = "LEAST_CPU")]
    LeastCpu,
}

impl InitMode {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_uppercase().as_str() {
            "RAND"        => Some(InitMode::Random),
            "SHORT_PSA"   => Some(InitMode::ShortPsa),
            "LEAST_DELAY" => Some(InitMode::LeastDelay),
            "LEAST_CPU"   => Some(InitMode::LeastCpu),
            _             => None,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct Config {
    pub name: String,
    pub seed: u64,
    pub init: InitMode,
    pub parameters: Parameters,
    #[serde(default)]
    pub weights: Weights,
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Parameters {
    /// number of parallel chains
    pub s: usize,
    /// iterations per temperature level, if not bounded by runtime
    pub m: usize,
    pub tmax: f64,
    pub tmin: f64,
    /// cooling factor
    pub rho: f64,
    /// seconds for the whole run; 0 bounds every level by `m` instead
    pub runtime: f64,
}

impl Default for Parameters {
    fn default() -> Self {
        Parameters { s: 8, m: 500, tmax: 50.0, tmin: 1.0, rho: 0.75, runtime: 10.0 }
    }
}

impl Config {
    pub fn override_from_args(&mut self, args: Arguments) {
        if let Some(seed) = args.seed {
            self.seed = seed;
        }
        if let Some(chains) = args.chains {
            self.parameters.s = num::clamp(chains, 1, 4096);
        }
        if let Some(iterations) = args.iterations {
            self.parameters.m = iterations;
        }
        if let Some(runtime) = args.runtime {
            self.parameters.runtime = num::clamp(runtime, 0.0, 86400.0);
        }
        if let Some(init) = args.init.as_deref().and_then(InitMode::parse) {
            self.init = init;
        }
    }
}

pub mod base;
mod greedy;
mod neighbour;
mod psa;
mod seeding;
mod viterbi;

pub use greedy::{centrality, least_delay};
pub use neighbour::{random_selection, replace_one_flow, replace_one_instance};
pub use psa::Psa;
pub use seeding::{LeastCpuSeeding, LeastDelaySeeding, RandomSeeding, Seeding, SeedingEnum, ShortPsaSeeding};
pub use viterbi::weighted_selection;

pub mod algorithm;
pub mod component;
pub mod network;
pub mod nfvo;
pub mod utils;

pub mod config;
pub mod error;
pub mod observer;
pub mod stats;
pub mod strategy;
pub mod yaml;

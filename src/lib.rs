pub mod aggregator;
pub mod backend;
pub mod config;
pub mod credentials;
pub mod demo;
pub mod errors;
pub mod event_log;
pub mod history;
pub mod models;
pub mod simulator;
pub mod weather;

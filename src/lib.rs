pub mod api;
pub mod config;
pub mod controller;
pub mod domain;
pub mod generator;
pub mod load;
pub mod telemetry;
pub mod workers;

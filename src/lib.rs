pub mod configuration;
pub mod domain;
pub mod persistence;
pub mod registration;
pub mod routes;
pub mod startup;
pub mod telemetry;
mod utils;
pub mod waitlist_repository;

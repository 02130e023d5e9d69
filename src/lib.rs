pub mod app;
pub mod cache;
pub mod canonical;
pub mod config;
pub mod domain;
pub mod ena;
pub mod error;
pub mod join;
pub mod registry;
pub mod site;
pub mod species;
pub mod tracking;

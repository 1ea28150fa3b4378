//! tasks-hex: hexagonal Tasks API library (core + inbound HTTP)

pub mod config;
pub mod errors;

pub mod application;

pub use tasks_types::{domain, ports};

pub mod inbound; // HTTP adapter (server + handlers)

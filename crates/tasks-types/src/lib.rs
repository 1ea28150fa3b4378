//! tasks-types: domain records, storage ports and the settings shared by
//! the HTTP core and the storage adapters.

pub mod config;
pub mod domain;
pub mod ports;

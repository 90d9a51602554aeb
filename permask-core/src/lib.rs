//! Per-actor, per-board permission masks
//!
//! Roles carry weighted `slug -> bool` values, globally or on one board. An
//! actor's roles are folded into a compiled mask per resolution route, cached
//! per (actor, board) and queried through [`service::PermissionService`].

pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod repository;
pub mod service;

#[cfg(test)]
pub mod test_helpers;

pub use config::Config;
pub use error::{Error, Result};

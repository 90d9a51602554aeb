//! Bootstrap module for wiring permask into a process
//!
//! This module handles:
//! - Configuration loading
//! - Database initialization and migrations
//! - Catalog and system role seeding
//! - Service construction

pub mod config;
pub mod database;
pub mod seed;
pub mod services;

pub use config::load_config;
pub use database::{init_database, run_migrations};
pub use seed::{seed_catalog, SeedReport};
pub use services::{generate_node_id, init_services, Services};

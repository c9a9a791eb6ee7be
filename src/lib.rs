//! orgview: org chart editing core
//!
//! Layers, innermost first:
//! - [`domain`]: chart snapshots, tree algorithms and mutations (no I/O)
//! - [`application`]: the tree store service, persistence and lazy loading
//! - [`infrastructure`]: storage and loader implementations, DI container
//! - [`cli`]: argument parsing, command dispatch and output

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;

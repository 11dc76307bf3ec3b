//! Core library for the `arbalest` CLI.
//!
//! This crate provides the internal building blocks used by the binary: CLI
//! argument types, the shared counter set, the archer worker pool, the
//! target serving loop, stats reporting, and the aggregation publisher. The
//! primary user-facing interface is the `arbalest` command-line
//! application; library APIs may evolve as the CLI grows.
pub mod archer;
pub mod args;
pub mod entry;
pub mod error;
pub mod reporter;
pub mod shutdown;
pub mod signals;
pub mod stats;
pub mod store;
pub mod target;

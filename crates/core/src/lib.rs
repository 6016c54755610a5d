//! Shared building blocks for the Satori audit sync: configuration, the
//! error taxonomy, the extraction window, the destination column schema and
//! trigger payload decoding.
//!
//! This crate does no I/O so both the fetcher and the loader can depend on it.

pub mod audit_schema;
pub mod config;
pub mod error;
pub mod trigger;
pub mod types;
pub mod window;

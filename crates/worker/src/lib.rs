//! Satori audit sync worker library.
//!
//! Exposes the trigger endpoint, pipeline orchestration and error mapping so
//! integration tests and the binary entrypoint can both access them.

pub mod error;
pub mod pipeline;
pub mod routes;
pub mod state;
pub mod telemetry;

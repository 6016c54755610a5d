//! Satori audit API access.
//!
//! [`api::SatoriApi`] wraps the two REST endpoints the sync needs, and
//! [`fetcher::LogFetcher`] combines them into a single CSV retrieval for an
//! extraction window.

pub mod api;
pub mod fetcher;

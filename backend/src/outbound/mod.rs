//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **routes_api**: reqwest client for the upstream routing API
//! - **cache**: in-memory and Redis-backed route/ETA caches
//! - **persistence**: PostgreSQL stop and vehicle position reads via Diesel
//!
//! Adapters are thin translators between domain types and infrastructure
//! representations. They contain no business logic.

pub mod cache;
pub mod persistence;
pub mod routes_api;

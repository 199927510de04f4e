//! PostgreSQL read adapters using Diesel with `diesel-async`.
//!
//! Stops and vehicle positions live in PostGIS geometry columns; queries
//! project them to plain latitude/longitude pairs. Schema ownership and
//! migrations belong to the service that writes these tables.

mod diesel_stop_lookup;
mod diesel_vehicle_position_source;
mod error_mapping;
mod pool;

pub use diesel_stop_lookup::DieselStopLookup;
pub use diesel_vehicle_position_source::DieselVehiclePositionSource;
pub use pool::{DbPool, PoolConfig, PoolError};

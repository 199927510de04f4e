//! PostgreSQL-backed latest vehicle positions for routes serving a stop.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::sql_types::{Double, Integer, Timestamptz};
use diesel::{QueryableByName, sql_query};
use diesel_async::RunQueryDsl;
use tracing::debug;

use super::error_mapping::{diesel_error_message, is_connection_error, pool_error_message};
use super::pool::DbPool;
use crate::domain::ports::{VehiclePosition, VehiclePositionSource, VehiclePositionSourceError};
use crate::domain::{Coordinate, StopId};

const POSITIONS_FOR_STOP_SQL: &str = r#"
SELECT DISTINCT ON (vp.vehicle_id)
    vp.vehicle_id,
    ST_Y(vp.geom) AS latitude,
    ST_X(vp.geom) AS longitude,
    vp.reported_at::timestamptz AS reported_at
FROM vehicle_positions vp
JOIN route_stops rs ON rs.route_id = vp.route_id
WHERE rs.stop_id = $1
ORDER BY vp.vehicle_id, vp.reported_at DESC
"#;

#[derive(Debug, QueryableByName)]
struct PositionRow {
    #[diesel(sql_type = Integer)]
    vehicle_id: i32,
    #[diesel(sql_type = Double)]
    latitude: f64,
    #[diesel(sql_type = Double)]
    longitude: f64,
    #[diesel(sql_type = Timestamptz)]
    reported_at: DateTime<Utc>,
}

impl PositionRow {
    fn into_domain(self) -> Option<VehiclePosition> {
        let coordinate = Coordinate::new(self.latitude, self.longitude).ok()?;
        Some(VehiclePosition {
            vehicle_id: self.vehicle_id,
            coordinate,
            reported_at: self.reported_at,
        })
    }
}

/// Diesel-backed implementation of the vehicle position port.
#[derive(Clone)]
pub struct DieselVehiclePositionSource {
    pool: DbPool,
    query_timeout: Duration,
}

impl DieselVehiclePositionSource {
    /// Create a source bounding each query by `query_timeout`.
    pub fn new(pool: DbPool, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }

    async fn fetch_rows(&self, stop_id: StopId) -> Result<Vec<PositionRow>, VehiclePositionSourceError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| VehiclePositionSourceError::connection(pool_error_message(err)))?;
        sql_query(POSITIONS_FOR_STOP_SQL)
            .bind::<Integer, _>(stop_id.get())
            .load::<PositionRow>(&mut conn)
            .await
            .map_err(|err| {
                let message = diesel_error_message(&err, "vehicle position query");
                if is_connection_error(&err) {
                    VehiclePositionSourceError::connection(message)
                } else {
                    VehiclePositionSourceError::query(message)
                }
            })
    }
}

#[async_trait]
impl VehiclePositionSource for DieselVehiclePositionSource {
    async fn positions_for_stop(
        &self,
        stop_id: StopId,
    ) -> Result<Vec<VehiclePosition>, VehiclePositionSourceError> {
        let rows = tokio::time::timeout(self.query_timeout, self.fetch_rows(stop_id))
            .await
            .map_err(|_| {
                VehiclePositionSourceError::connection(format!(
                    "vehicle position query for stop {stop_id} timed out"
                ))
            })??;
        let total = rows.len();
        let positions: Vec<_> = rows.into_iter().filter_map(PositionRow::into_domain).collect();
        if positions.len() < total {
            debug!(
                stop_id = stop_id.get(),
                skipped = total - positions.len(),
                "ignored vehicle positions with invalid coordinates"
            );
        }
        Ok(positions)
    }
}

//! PostgreSQL-backed stop lookup.

use std::time::Duration;

use async_trait::async_trait;
use diesel::sql_types::{Double, Integer, Text};
use diesel::{OptionalExtension, QueryableByName, sql_query};
use diesel_async::RunQueryDsl;

use super::error_mapping::{diesel_error_message, is_connection_error, pool_error_message};
use super::pool::DbPool;
use crate::domain::ports::{StopLookup, StopLookupError};
use crate::domain::{Coordinate, StopId, StopLocation};

const FIND_ACTIVE_STOP_SQL: &str = r#"
SELECT id, name, ST_Y(geom) AS latitude, ST_X(geom) AS longitude
FROM stops
WHERE id = $1 AND active
"#;

#[derive(Debug, QueryableByName)]
struct StopRow {
    #[diesel(sql_type = Integer)]
    id: i32,
    #[diesel(sql_type = Text)]
    name: String,
    #[diesel(sql_type = Double)]
    latitude: f64,
    #[diesel(sql_type = Double)]
    longitude: f64,
}

impl StopRow {
    fn into_domain(self) -> Result<StopLocation, StopLookupError> {
        let id = StopId::new(self.id)
            .map_err(|err| StopLookupError::query(format!("stored stop row is invalid: {err}")))?;
        let coordinate = Coordinate::new(self.latitude, self.longitude).map_err(|err| {
            StopLookupError::query(format!("stop {id} has invalid coordinates: {err}"))
        })?;
        Ok(StopLocation {
            id,
            name: self.name,
            coordinate,
        })
    }
}

/// Diesel-backed implementation of the stop lookup port.
#[derive(Clone)]
pub struct DieselStopLookup {
    pool: DbPool,
    query_timeout: Duration,
}

impl DieselStopLookup {
    /// Create a lookup bounding each query by `query_timeout`.
    pub fn new(pool: DbPool, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }

    async fn fetch_row(&self, stop_id: StopId) -> Result<Option<StopRow>, StopLookupError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| StopLookupError::connection(pool_error_message(err)))?;
        sql_query(FIND_ACTIVE_STOP_SQL)
            .bind::<Integer, _>(stop_id.get())
            .get_result::<StopRow>(&mut conn)
            .await
            .optional()
            .map_err(|err| {
                let message = diesel_error_message(&err, "stop lookup");
                if is_connection_error(&err) {
                    StopLookupError::connection(message)
                } else {
                    StopLookupError::query(message)
                }
            })
    }
}

#[async_trait]
impl StopLookup for DieselStopLookup {
    async fn find_stop(&self, stop_id: StopId) -> Result<Option<StopLocation>, StopLookupError> {
        let row = tokio::time::timeout(self.query_timeout, self.fetch_row(stop_id))
            .await
            .map_err(|_| {
                StopLookupError::connection(format!(
                    "stop lookup for {stop_id} timed out after {}ms",
                    self.query_timeout.as_millis()
                ))
            })??;
        row.map(StopRow::into_domain).transpose()
    }
}

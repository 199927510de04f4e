//! Diesel and pool error mapping shared by the read adapters.

use tracing::debug;

use super::pool::PoolError;

/// Message carried into a port's connection variant.
pub(super) fn pool_error_message(error: PoolError) -> String {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    }
}

/// Whether a Diesel error means the connection itself is unusable.
pub(super) fn is_connection_error(error: &diesel::result::Error) -> bool {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};
    matches!(
        error,
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _)
            | DieselError::BrokenTransactionManager
    )
}

/// Log the Diesel failure and render a message naming `operation`.
pub(super) fn diesel_error_message(error: &diesel::result::Error, operation: &str) -> String {
    use diesel::result::Error as DieselError;

    if let DieselError::DatabaseError(kind, info) = error {
        debug!(?kind, message = info.message(), operation, "diesel operation failed");
    } else {
        debug!(error = %error, operation, "diesel operation failed");
    }
    format!("{operation} failed: {error}")
}

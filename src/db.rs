use std::future::Future;
use std::time::Duration;

use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Schema,
};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::entities::{
    delivery_location, delivery_rider, order, order_assignment, order_item, payment,
};

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

/// Bounded retries for transient storage errors.
const MAX_ATTEMPTS: u32 = 3;
const BASE_BACKOFF: Duration = Duration::from_millis(50);

/// Establishes a connection pool to the database.
pub async fn establish_connection(database_url: &str) -> Result<DbPool, DbErr> {
    let mut options = ConnectOptions::new(database_url.to_string());
    options
        .max_connections(10)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(600))
        .sqlx_logging(false);

    let pool = Database::connect(options).await?;
    info!(url = %database_url, "database connection established");
    Ok(pool)
}

/// Establishes a connection pool using the application configuration.
pub async fn establish_connection_with_config(config: &AppConfig) -> Result<DbPool, DbErr> {
    let mut options = ConnectOptions::new(config.database_url.clone());
    options
        .max_connections(config.db_max_connections)
        .min_connections(config.db_min_connections)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(config.db_query_logging);

    let pool = Database::connect(options).await?;
    info!(environment = %config.environment, "database connection established");

    if config.auto_migrate {
        init_schema(&pool).await?;
    }

    Ok(pool)
}

/// Creates the core tables from the entity definitions if they do not exist.
/// Tables are created in dependency order so foreign keys resolve.
pub async fn init_schema<C: ConnectionTrait>(conn: &C) -> Result<(), DbErr> {
    let backend = conn.get_database_backend();
    let schema = Schema::new(backend);

    let mut statements = vec![
        schema.create_table_from_entity(delivery_location::Entity),
        schema.create_table_from_entity(delivery_rider::Entity),
        schema.create_table_from_entity(order::Entity),
        schema.create_table_from_entity(order_item::Entity),
        schema.create_table_from_entity(payment::Entity),
        schema.create_table_from_entity(order_assignment::Entity),
    ];

    for statement in statements.iter_mut() {
        statement.if_not_exists();
        conn.execute(backend.build(&*statement)).await?;
    }

    Ok(())
}

/// Whether a storage error is worth retrying: lock contention, serialization
/// failures, and pool acquisition timeouts clear on their own; everything
/// else surfaces immediately.
pub fn is_transient(err: &DbErr) -> bool {
    if matches!(err, DbErr::ConnectionAcquire(_)) {
        return true;
    }
    let message = err.to_string();
    message.contains("database is locked")
        || message.contains("deadlock")
        || message.contains("could not serialize")
}

/// Runs a storage operation, retrying transient failures a bounded number of
/// times with increasing backoff before surfacing the error.
pub async fn with_retry<T, F, Fut>(operation: &str, mut f: F) -> Result<T, DbErr>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DbErr>>,
{
    let mut attempt: u32 = 1;
    loop {
        match f().await {
            Err(err) if is_transient(&err) && attempt < MAX_ATTEMPTS => {
                let backoff = BASE_BACKOFF * 2u32.pow(attempt - 1);
                warn!(
                    operation = operation,
                    attempt = attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %err,
                    "transient storage error, retrying"
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Database connection pooling

use diesel::connection::SimpleConnection;
use diesel::r2d2::ConnectionManager;
use diesel::r2d2::CustomizeConnection;
use diesel::r2d2::PooledConnection;
use diesel::SqliteConnection;
use slog::info;
use slog::o;
use slog::Logger;

use super::Config as DbConfig;
use qinq_common::error::Error;

pub(super) type DbConnection =
    PooledConnection<ConnectionManager<SqliteConnection>>;

/// Wrapper around a database connection pool.
///
/// Expected to be used as the primary interface to the database.
#[derive(Debug)]
pub(super) struct Pool {
    pool: diesel::r2d2::Pool<ConnectionManager<SqliteConnection>>,
}

impl Pool {
    pub(super) fn new(log: &Logger, db_config: &DbConfig) -> Result<Pool, Error> {
        let log = log.new(o!(
            "database_path" => db_config.path.to_string(),
            "component" => "db::Pool"
        ));
        info!(&log, "database connection pool");
        let manager =
            ConnectionManager::<SqliteConnection>::new(db_config.path.as_str());
        let pool = diesel::r2d2::Pool::builder()
            .connection_customizer(Box::new(ConnectionCustomizer))
            .build(manager)
            .map_err(|e| {
                Error::unavailable(&format!(
                    "failed to open database {:?}: {e}",
                    db_config.path
                ))
            })?;
        Ok(Pool { pool })
    }

    /// Claim a connection from the pool.
    pub(super) fn claim(&self) -> Result<DbConnection, Error> {
        self.pool.get().map_err(|e| {
            Error::unavailable(&format!(
                "no database connection available: {e}"
            ))
        })
    }
}

/// Applies per-connection settings as connections enter the pool.
///
/// Writers queue on the database lock instead of failing immediately, and
/// write-ahead logging keeps readers from blocking the single writer.
#[derive(Debug)]
struct ConnectionCustomizer;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error>
    for ConnectionCustomizer
{
    fn on_acquire(
        &self,
        conn: &mut SqliteConnection,
    ) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute(
            "PRAGMA busy_timeout = 5000; \
             PRAGMA journal_mode = WAL; \
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

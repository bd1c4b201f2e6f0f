// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Primary interface to the allocation store.

mod allocation;

pub use allocation::ReleaseOutcome;

use diesel::connection::SimpleConnection;
use diesel::SqliteConnection;
use slog::o;
use slog::warn;
use slog::Logger;

use super::error::public_error_from_diesel;
use super::error::retryable;
use super::error::TransactionError;
use super::pool::Pool;
use super::Config;
use qinq_common::backoff;
use qinq_common::backoff::Backoff;
use qinq_common::error::Error;

/// DDL for the allocation table, applied idempotently at startup.
const DB_INIT_SQL: &str = include_str!("../schema.sql");

/// Access to the persistent table of segment allocations.
///
/// All operations run inside one immediate (write-locking) transaction, so
/// concurrent callers (including other processes sharing the same database
/// file) serialize on the store, not on in-process locks.
#[derive(Debug)]
pub struct DataStore {
    log: Logger,
    pool: Pool,
}

impl DataStore {
    /// Open the allocation store described by `config`, creating the
    /// database file and schema as needed.
    pub fn new(log: &Logger, config: &Config) -> Result<DataStore, Error> {
        let pool = Pool::new(log, config)?;
        let datastore = DataStore {
            log: log.new(o!("component" => "DataStore")),
            pool,
        };
        datastore.ensure_schema()?;
        Ok(datastore)
    }

    fn ensure_schema(&self) -> Result<(), Error> {
        let mut conn = self.pool.claim()?;
        conn.batch_execute(DB_INIT_SQL).map_err(|e| {
            Error::unavailable(&format!(
                "failed to initialize allocation table: {e}"
            ))
        })
    }

    /// Run `body` inside one immediate transaction, retrying with
    /// exponential backoff while the store reports transient failures.
    ///
    /// Domain errors returned by `body` pass through untouched; database
    /// errors that outlive the retry budget surface as
    /// [`Error::StoreUnavailable`].
    fn transaction_retry<T, F>(&self, name: &str, body: F) -> Result<T, Error>
    where
        F: Fn(&mut SqliteConnection) -> Result<T, TransactionError>,
    {
        let mut policy = backoff::store_access_policy();
        loop {
            let error = match self.pool.claim() {
                Ok(mut conn) => {
                    match conn.immediate_transaction(|conn| body(conn)) {
                        Ok(value) => return Ok(value),
                        Err(TransactionError::Custom(error)) => {
                            return Err(error);
                        }
                        Err(TransactionError::Database(error)) => {
                            if !retryable(&error) {
                                return Err(public_error_from_diesel(error));
                            }
                            public_error_from_diesel(error)
                        }
                    }
                }
                // The pool being briefly dry is transient by definition.
                Err(error) => error,
            };
            match policy.next_backoff() {
                Some(delay) => {
                    warn!(self.log, "transient database error; will retry";
                        "transaction" => name.to_owned(),
                        "retry_after_ms" => delay.as_millis() as u64,
                        "error" => error.to_string());
                    std::thread::sleep(delay);
                }
                None => return Err(error),
            }
        }
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error handling for database operations.

use diesel::result::DatabaseErrorKind;
use diesel::result::Error as DieselError;

use qinq_common::error::Error;

/// An error from a datastore transaction: either a domain error produced by
/// the transaction body, or an error from the database itself.
#[derive(Debug)]
pub(super) enum TransactionError {
    Custom(Error),
    Database(DieselError),
}

impl From<DieselError> for TransactionError {
    fn from(error: DieselError) -> Self {
        TransactionError::Database(error)
    }
}

impl From<Error> for TransactionError {
    fn from(error: Error) -> Self {
        TransactionError::Custom(error)
    }
}

/// Returns whether a database error is plausibly transient (the store was
/// locked or briefly unreachable) and so worth retrying.
pub(super) fn retryable(error: &DieselError) -> bool {
    match error {
        DieselError::DatabaseError(kind, info) => match kind {
            DatabaseErrorKind::ClosedConnection => true,
            DatabaseErrorKind::SerializationFailure => true,
            DatabaseErrorKind::Unknown => {
                let message = info.message();
                message.contains("database is locked")
                    || message.contains("database table is locked")
                    || message.contains("locking protocol")
            }
            _ => false,
        },
        _ => false,
    }
}

/// Convert a database error into the public error type.
pub(super) fn public_error_from_diesel(error: DieselError) -> Error {
    if retryable(&error) {
        Error::unavailable(&format!("database unavailable: {error}"))
    } else {
        Error::internal_error(&format!("unexpected database error: {error}"))
    }
}

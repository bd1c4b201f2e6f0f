// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Database layer: configuration, connection pooling, and the datastore.

pub mod datastore;
mod error;
mod pool;

use camino::Utf8PathBuf;
use serde::Deserialize;
use serde::Serialize;

/// Configuration for the allocation store.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Config {
    /// Path of the database file holding the allocation table. Created on
    /// first use.
    pub path: Utf8PathBuf,
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The allocation store for the QinQ segment allocator.
//!
//! [`db::datastore::DataStore`] owns the persistent table of
//! `(physical_network, tag, allocated)` tuples and exposes the atomic
//! reserve/release/query operations the allocator is built on.

pub mod db;

pub use db::datastore::DataStore;
pub use db::datastore::ReleaseOutcome;

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Describes the Diesel database schema.
//!
//! NOTE: Should be kept up-to-date with db-queries' schema.sql.

diesel::table! {
    qinq_allocation (physical_network, tag) {
        physical_network -> Text,
        tag -> Integer,
        allocated -> Bool,
    }
}

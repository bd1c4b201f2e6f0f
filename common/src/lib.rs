// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Types shared by every layer of the QinQ segment allocator.
//!
//! This crate holds the vocabulary of the system: the error taxonomy, the
//! segment request/response types, the parsed per-network tag ranges, and the
//! retry policies used when talking to the allocation store. It has no
//! dependency on the store itself.

pub mod backoff;
pub mod error;
pub mod ranges;
pub mod segment;

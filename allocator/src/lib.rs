// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Allocation of QinQ network segments.
//!
//! A [`SegmentAllocator`] hands out unused `(physical_network, tag)` pairs
//! from configured per-network tag pools, backed by a persistent
//! [`qinq_db_queries::DataStore`]. Callers describe the segment they want
//! with a [`SegmentSpec`] (naming both fields, just the physical network,
//! or neither) and get back a fully populated [`Segment`] on success.

mod config;
mod driver;
mod validate;

pub use config::AllocatorConfig;
pub use driver::SegmentAllocator;
pub use validate::validate_segment;

// The vocabulary callers need to drive the allocator.
pub use qinq_common::error::Error;
pub use qinq_common::ranges::TagRanges;
pub use qinq_common::segment::Segment;
pub use qinq_common::segment::SegmentSpec;
pub use qinq_common::segment::SegmentTag;
pub use qinq_common::segment::QINQ_NETWORK_TYPE;

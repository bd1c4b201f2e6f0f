// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error handling facilities for the segment allocator.

use serde::Deserialize;
use serde::Serialize;

use crate::segment::SegmentTag;

/// An error that can be generated while parsing range configuration or while
/// validating, reserving, or releasing network segments.
///
/// General best practices for error design apply here. Where possible, we
/// want to reuse existing variants rather than inventing new ones to
/// distinguish cases that no programmatic consumer needs to distinguish.
#[derive(Clone, Debug, Deserialize, thiserror::Error, PartialEq, Serialize)]
pub enum Error {
    /// A configured range entry could not be parsed. Fatal: a bad
    /// configuration never produces a partially-working allocator.
    #[error("invalid tag range {entry:?}: {message}")]
    InvalidTagRange { entry: String, message: String },
    /// The caller-supplied segment specification violates validation rules.
    #[error("invalid segment: {message}")]
    InvalidSegment { message: String },
    /// A fully-specified reservation collided with an existing allocation.
    #[error("tag {tag} already in use on physical network {physical_network:?}")]
    TagInUse { physical_network: String, tag: SegmentTag },
    /// The free portion of the pool is empty. Retrying will not help until
    /// capacity is released or configured.
    #[error("no segment available for allocation")]
    NoSegmentAvailable,
    /// The allocation store could not be reached, even after bounded retry.
    #[error("store unavailable: {internal_message}")]
    StoreUnavailable { internal_message: String },
    /// The system encountered an unhandled operational error.
    #[error("internal error: {internal_message}")]
    InternalError { internal_message: String },
}

impl Error {
    /// Returns whether the error is likely transient and could reasonably be
    /// retried
    pub fn retryable(&self) -> bool {
        match self {
            Error::StoreUnavailable { .. } => true,

            Error::InvalidTagRange { .. }
            | Error::InvalidSegment { .. }
            | Error::TagInUse { .. }
            | Error::NoSegmentAvailable
            | Error::InternalError { .. } => false,
        }
    }

    /// Generates an [`Error::InvalidTagRange`] error naming the offending
    /// configuration entry.
    pub fn invalid_tag_range(entry: &str, message: &str) -> Error {
        Error::InvalidTagRange {
            entry: entry.to_owned(),
            message: message.to_owned(),
        }
    }

    /// Generates an [`Error::InvalidSegment`] error with the specific message
    ///
    /// This should be used for failures due to invalid caller input.
    pub fn invalid_segment(message: &str) -> Error {
        Error::InvalidSegment { message: message.to_owned() }
    }

    /// Generates an [`Error::InternalError`] error with the specific message
    ///
    /// InternalError should be used for operational conditions that should
    /// not happen but that we cannot reasonably handle at runtime (e.g.,
    /// failing to decode a row that this library wrote).
    pub fn internal_error(internal_message: &str) -> Error {
        Error::InternalError { internal_message: internal_message.to_owned() }
    }

    /// Generates an [`Error::StoreUnavailable`] error with the specific
    /// message
    ///
    /// This should be used for transient failures where the caller might be
    /// expected to retry.
    pub fn unavailable(internal_message: &str) -> Error {
        Error::StoreUnavailable {
            internal_message: internal_message.to_owned(),
        }
    }
}

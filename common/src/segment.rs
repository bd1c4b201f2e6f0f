// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Types describing tagged network segments.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Network type identifier carried by every segment this allocator produces.
pub const QINQ_NETWORK_TYPE: &str = "qinq";

/// An 802.1Q-style tag discriminating segments that share a physical network.
///
/// Valid tags occupy `1..=4094`; 0 and 4095 are reserved by the standard.
/// Construction goes through `TryFrom`, so a held `SegmentTag` is always in
/// range.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[serde(try_from = "u16", into = "u16")]
pub struct SegmentTag(u16);

impl SegmentTag {
    /// Smallest valid tag.
    pub const MIN: u16 = 1;
    /// Largest valid tag.
    pub const MAX: u16 = 4094;
}

/// Errors related to parsing a [`SegmentTag`] from an untrusted integer.
#[derive(Clone, Debug, Eq, thiserror::Error, PartialEq)]
pub enum SegmentTagError {
    #[error("tag {0} outside the valid range 1..=4094")]
    OutOfRange(i64),
}

impl TryFrom<u16> for SegmentTag {
    type Error = SegmentTagError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(SegmentTag(value))
        } else {
            Err(SegmentTagError::OutOfRange(i64::from(value)))
        }
    }
}

impl TryFrom<i32> for SegmentTag {
    type Error = SegmentTagError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        let value = u16::try_from(value)
            .map_err(|_| SegmentTagError::OutOfRange(i64::from(value)))?;
        SegmentTag::try_from(value)
    }
}

impl From<SegmentTag> for u16 {
    fn from(tag: SegmentTag) -> Self {
        tag.0
    }
}

impl From<SegmentTag> for i32 {
    fn from(tag: SegmentTag) -> Self {
        i32::from(tag.0)
    }
}

impl fmt::Display for SegmentTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A caller-supplied description of the segment to reserve.
///
/// Either field may be left empty to delegate the choice to the allocator: a
/// spec with no tag is "partial", a spec with neither field is "fully
/// partial". A tag is only meaningful relative to a physical network's pool,
/// so a tag without a physical network fails validation.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct SegmentSpec {
    pub physical_network: Option<String>,
    pub tag: Option<SegmentTag>,
}

impl SegmentSpec {
    /// Returns whether tag selection is delegated to the allocator.
    pub fn is_partial(&self) -> bool {
        self.tag.is_none()
    }
}

/// A reserved segment, as handed back to the network-creation caller.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Segment {
    /// Always [`QINQ_NETWORK_TYPE`] for segments from this allocator.
    pub network_type: String,
    pub physical_network: String,
    pub segmentation_id: SegmentTag,
    /// Smallest configured MTU bound for the segment's network, or 0 when no
    /// bound is configured.
    pub mtu: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn tag_bounds() {
        assert_matches!(
            SegmentTag::try_from(0u16),
            Err(SegmentTagError::OutOfRange(0))
        );
        assert_matches!(
            SegmentTag::try_from(4095u16),
            Err(SegmentTagError::OutOfRange(4095))
        );
        assert_eq!(u16::from(SegmentTag::try_from(1u16).unwrap()), 1);
        assert_eq!(u16::from(SegmentTag::try_from(4094u16).unwrap()), 4094);
    }

    #[test]
    fn tag_from_row_value() {
        assert_matches!(
            SegmentTag::try_from(-5i32),
            Err(SegmentTagError::OutOfRange(-5))
        );
        assert_matches!(
            SegmentTag::try_from(70_000i32),
            Err(SegmentTagError::OutOfRange(70_000))
        );
        let tag = SegmentTag::try_from(4094i32).unwrap();
        assert_eq!(i32::from(tag), 4094);
    }

    #[test]
    fn partial_specs() {
        assert!(SegmentSpec::default().is_partial());
        let spec = SegmentSpec {
            physical_network: Some("physnet1".to_owned()),
            tag: None,
        };
        assert!(spec.is_partial());
        let spec = SegmentSpec {
            physical_network: Some("physnet1".to_owned()),
            tag: Some(SegmentTag::try_from(100u16).unwrap()),
        };
        assert!(!spec.is_partial());
    }
}

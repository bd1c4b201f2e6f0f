// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Validation of caller-supplied segment specifications.

use qinq_common::error::Error;
use qinq_common::ranges::TagRanges;
use qinq_common::segment::SegmentSpec;

/// Check `spec` against the configured ranges before any allocation work.
///
/// A spec may name both fields (fully specified), a physical network alone
/// (the allocator picks the tag), or neither (the allocator picks both). A
/// tag without a physical network is meaningless and rejected.
pub fn validate_segment(
    ranges: &TagRanges,
    spec: &SegmentSpec,
) -> Result<(), Error> {
    match (spec.physical_network.as_deref(), spec.tag) {
        (Some(physical_network), tag) => {
            if !ranges.contains_network(physical_network) {
                return Err(Error::invalid_segment(&format!(
                    "physical network {physical_network:?} unknown"
                )));
            }
            if let Some(tag) = tag {
                if !ranges.contains(physical_network, tag) {
                    return Err(Error::invalid_segment(&format!(
                        "tag {tag} out of range for physical network \
                         {physical_network:?}"
                    )));
                }
            }
            Ok(())
        }
        (None, Some(_)) => {
            Err(Error::invalid_segment("tag requires a physical network"))
        }
        (None, None) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use qinq_common::segment::SegmentTag;

    fn spec(network: Option<&str>, tag: Option<u16>) -> SegmentSpec {
        SegmentSpec {
            physical_network: network.map(str::to_owned),
            tag: tag.map(|t| SegmentTag::try_from(t).unwrap()),
        }
    }

    fn ranges() -> TagRanges {
        TagRanges::parse(["physnet1:100:103", "physnet2:200:203"]).unwrap()
    }

    #[test]
    fn accepts_fully_specified_in_range() {
        validate_segment(&ranges(), &spec(Some("physnet1"), Some(100)))
            .unwrap();
    }

    #[test]
    fn accepts_partial_and_fully_partial() {
        validate_segment(&ranges(), &spec(Some("physnet1"), None)).unwrap();
        validate_segment(&ranges(), &spec(None, None)).unwrap();
    }

    #[test]
    fn rejects_unknown_physical_network() {
        let error = validate_segment(&ranges(), &spec(Some("physnet9"), None))
            .unwrap_err();
        assert_matches!(error, Error::InvalidSegment { message } => {
            assert!(message.contains("unknown"), "message was {message:?}");
        });
    }

    #[test]
    fn rejects_tag_without_physical_network() {
        let error =
            validate_segment(&ranges(), &spec(None, Some(5))).unwrap_err();
        assert_matches!(error, Error::InvalidSegment { .. });
    }

    #[test]
    fn rejects_tag_outside_the_networks_pool() {
        let error = validate_segment(&ranges(), &spec(Some("physnet1"), Some(500)))
            .unwrap_err();
        assert_matches!(error, Error::InvalidSegment { .. });
        // Pools are per-network: physnet2's tags are not valid on physnet1.
        let error = validate_segment(&ranges(), &spec(Some("physnet1"), Some(200)))
            .unwrap_err();
        assert_matches!(error, Error::InvalidSegment { .. });
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parsing and lookup of the configured per-network tag ranges.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::error::Error;
use crate::segment::SegmentTag;

/// The set of tags offered for tenant allocation on each configured physical
/// network.
///
/// Built once at startup from configuration entries and immutable afterwards;
/// changing the offered ranges means rebuilding the allocator. Each physical
/// network carries its own independent pool: a tag configured for one network
/// says nothing about its validity on another.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TagRanges {
    pools: BTreeMap<String, BTreeSet<SegmentTag>>,
}

impl TagRanges {
    /// Parse configuration entries of the form `physical_network:min:max` or
    /// bare `physical_network`.
    ///
    /// Ranges are inclusive-exclusive: `physnet1:100:103` offers tags
    /// {100, 101, 102}. A bare network name declares a known network with no
    /// tenant pool (provider-only). Entries naming the same network union
    /// their pools. Any malformed entry fails the whole parse; there is no
    /// best-effort partial configuration.
    pub fn parse<I, S>(entries: I) -> Result<TagRanges, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut pools: BTreeMap<String, BTreeSet<SegmentTag>> = BTreeMap::new();
        for entry in entries {
            let entry = entry.as_ref();
            let fields = entry.split(':').collect::<Vec<_>>();
            match fields.as_slice() {
                [name] => {
                    let name = parse_network_name(entry, name)?;
                    pools.entry(name).or_default();
                }
                [name, min, max] => {
                    let name = parse_network_name(entry, name)?;
                    let min = parse_bound(entry, "minimum", min)?;
                    let max = parse_bound(entry, "maximum", max)?;
                    if min >= max {
                        return Err(Error::invalid_tag_range(
                            entry,
                            "empty or inverted range",
                        ));
                    }
                    let pool = pools.entry(name).or_default();
                    for value in min..max {
                        let tag = SegmentTag::try_from(value).map_err(|e| {
                            Error::invalid_tag_range(entry, &e.to_string())
                        })?;
                        pool.insert(tag);
                    }
                }
                _ => {
                    return Err(Error::invalid_tag_range(
                        entry,
                        "expected physical_network or \
                         physical_network:min:max",
                    ));
                }
            }
        }
        Ok(TagRanges { pools })
    }

    /// Returns whether any physical network is configured at all.
    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// The configured physical network names, in sorted order.
    pub fn physical_networks(&self) -> impl Iterator<Item = &str> {
        self.pools.keys().map(String::as_str)
    }

    /// Returns whether `physical_network` is a configured network (with or
    /// without a tenant pool).
    pub fn contains_network(&self, physical_network: &str) -> bool {
        self.pools.contains_key(physical_network)
    }

    /// The tenant tag pool for `physical_network`, if the network is
    /// configured.
    pub fn pool(
        &self,
        physical_network: &str,
    ) -> Option<&BTreeSet<SegmentTag>> {
        self.pools.get(physical_network)
    }

    /// Returns whether `tag` is inside `physical_network`'s configured pool.
    pub fn contains(&self, physical_network: &str, tag: SegmentTag) -> bool {
        self.pool(physical_network)
            .map(|pool| pool.contains(&tag))
            .unwrap_or(false)
    }
}

fn parse_network_name(entry: &str, name: &str) -> Result<String, Error> {
    if name.is_empty() {
        return Err(Error::invalid_tag_range(entry, "empty physical network"));
    }
    Ok(name.to_owned())
}

fn parse_bound(entry: &str, which: &str, bound: &str) -> Result<u16, Error> {
    bound.parse::<u16>().map_err(|_| {
        Error::invalid_tag_range(
            entry,
            &format!("{which} bound {bound:?} is not a valid tag"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn tag(value: u16) -> SegmentTag {
        SegmentTag::try_from(value).unwrap()
    }

    #[test]
    fn ranges_are_inclusive_exclusive() {
        let ranges = TagRanges::parse(["physnet1:100:103"]).unwrap();
        let pool = ranges.pool("physnet1").unwrap();
        let expected: Vec<u16> =
            pool.iter().map(|tag| u16::from(*tag)).collect();
        assert_eq!(expected, vec![100, 101, 102]);
        assert!(!ranges.contains("physnet1", tag(103)));
    }

    #[test]
    fn parsing_is_deterministic() {
        let entries = ["physnet1:1:100", "physnet2:200:300", "physnet1:50:150"];
        let first = TagRanges::parse(entries).unwrap();
        let second = TagRanges::parse(entries).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn duplicate_networks_union_their_pools() {
        let ranges =
            TagRanges::parse(["physnet1:10:12", "physnet1:20:22"]).unwrap();
        assert!(ranges.contains("physnet1", tag(10)));
        assert!(ranges.contains("physnet1", tag(21)));
        assert!(!ranges.contains("physnet1", tag(15)));
        assert_eq!(ranges.physical_networks().count(), 1);
    }

    #[test]
    fn bare_network_has_no_tenant_pool() {
        let ranges = TagRanges::parse(["physnet1"]).unwrap();
        assert!(ranges.contains_network("physnet1"));
        assert!(ranges.pool("physnet1").unwrap().is_empty());
        assert!(!ranges.contains("physnet1", tag(1)));
    }

    #[test]
    fn pools_are_per_network() {
        let ranges =
            TagRanges::parse(["physnet1:100:103", "physnet2:200:203"]).unwrap();
        assert!(ranges.contains("physnet1", tag(100)));
        assert!(!ranges.contains("physnet2", tag(100)));
        assert!(ranges.contains("physnet2", tag(200)));
        assert!(!ranges.contains("physnet1", tag(200)));
    }

    #[test]
    fn single_colon_entry_is_malformed() {
        let error = TagRanges::parse(["physnet1:100"]).unwrap_err();
        assert_matches!(error, Error::InvalidTagRange { entry, .. } => {
            assert_eq!(entry, "physnet1:100");
        });
    }

    #[test]
    fn extra_fields_are_malformed() {
        assert_matches!(
            TagRanges::parse(["physnet1:1:2:3"]),
            Err(Error::InvalidTagRange { .. })
        );
    }

    #[test]
    fn non_numeric_bounds_are_malformed() {
        assert_matches!(
            TagRanges::parse(["physnet1:ten:20"]),
            Err(Error::InvalidTagRange { .. })
        );
        assert_matches!(
            TagRanges::parse(["physnet1:10:"]),
            Err(Error::InvalidTagRange { .. })
        );
    }

    #[test]
    fn inverted_or_empty_ranges_are_malformed() {
        assert_matches!(
            TagRanges::parse(["physnet1:20:10"]),
            Err(Error::InvalidTagRange { .. })
        );
        assert_matches!(
            TagRanges::parse(["physnet1:10:10"]),
            Err(Error::InvalidTagRange { .. })
        );
    }

    #[test]
    fn bounds_outside_the_tag_domain_are_malformed() {
        // 0 is reserved.
        assert_matches!(
            TagRanges::parse(["physnet1:0:5"]),
            Err(Error::InvalidTagRange { .. })
        );
        // An exclusive maximum of 4095 still tops out at tag 4094.
        let ranges = TagRanges::parse(["physnet1:4000:4095"]).unwrap();
        assert!(ranges.contains("physnet1", tag(4094)));
        // 4095 itself can never be offered.
        assert_matches!(
            TagRanges::parse(["physnet1:4000:4096"]),
            Err(Error::InvalidTagRange { .. })
        );
    }

    #[test]
    fn empty_network_name_is_malformed() {
        assert_matches!(
            TagRanges::parse([":1:5"]),
            Err(Error::InvalidTagRange { .. })
        );
        assert_matches!(
            TagRanges::parse([""]),
            Err(Error::InvalidTagRange { .. })
        );
    }

    #[test]
    fn one_bad_entry_fails_the_whole_parse() {
        assert_matches!(
            TagRanges::parse(["physnet1:1:5", "physnet2:oops"]),
            Err(Error::InvalidTagRange { .. })
        );
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The segment allocator: reserve, release, and reconcile tagged segments.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::seq::SliceRandom;
use slog::debug;
use slog::info;
use slog::o;
use slog::warn;
use slog::Logger;

use crate::config::AllocatorConfig;
use crate::validate::validate_segment;
use qinq_common::error::Error;
use qinq_common::ranges::TagRanges;
use qinq_common::segment::Segment;
use qinq_common::segment::SegmentSpec;
use qinq_common::segment::SegmentTag;
use qinq_common::segment::QINQ_NETWORK_TYPE;
use qinq_db_queries::DataStore;
use qinq_db_queries::ReleaseOutcome;

/// How many times a partially-specified reservation re-samples after losing
/// a reservation race before reporting contention.
const MAX_RESERVE_ATTEMPTS: usize = 8;

/// Allocates QinQ segments out of the configured per-network tag pools.
///
/// The allocator is cheap to share across request-handling threads; all
/// mutable state lives in the [`DataStore`].
#[derive(Debug)]
pub struct SegmentAllocator {
    log: Logger,
    ranges: TagRanges,
    physical_network_mtus: BTreeMap<String, u32>,
    segment_mtu: Option<u32>,
    datastore: Arc<DataStore>,
}

impl SegmentAllocator {
    /// Build an allocator from `config`.
    ///
    /// Fails if any range entry is malformed: a bad configuration never
    /// produces a partially-working allocator.
    pub fn new(
        log: &Logger,
        config: &AllocatorConfig,
        datastore: Arc<DataStore>,
    ) -> Result<SegmentAllocator, Error> {
        let ranges = TagRanges::parse(&config.tag_ranges)?;
        let log = log.new(o!("component" => "SegmentAllocator"));
        for physical_network in ranges.physical_networks() {
            let pool_size =
                ranges.pool(physical_network).map(|p| p.len()).unwrap_or(0);
            info!(log, "configured physical network";
                "physical_network" => physical_network.to_owned(),
                "pool_size" => pool_size);
        }
        Ok(SegmentAllocator {
            log,
            ranges,
            physical_network_mtus: config.physical_network_mtus.clone(),
            segment_mtu: config.segment_mtu,
            datastore,
        })
    }

    /// The network type every segment from this allocator carries.
    pub fn network_type(&self) -> &'static str {
        QINQ_NETWORK_TYPE
    }

    /// Reconcile the store against the configured pools: free rows whose
    /// tag is no longer offered are purged. Call once at startup, before
    /// serving allocation requests.
    pub fn initialize(&self) -> Result<(), Error> {
        let removed = self.datastore.segment_reconcile(&self.ranges)?;
        if removed > 0 {
            info!(self.log, "purged stale pool entries"; "removed" => removed);
        }
        info!(self.log, "segment allocator initialization complete");
        Ok(())
    }

    /// Validate `spec` against the configured ranges without reserving
    /// anything.
    pub fn validate_segment(&self, spec: &SegmentSpec) -> Result<(), Error> {
        validate_segment(&self.ranges, spec)
    }

    /// Reserve the segment described by `spec`.
    ///
    /// Fully-specified requests reserve exactly the named pair and surface
    /// [`Error::TagInUse`] on collision. Requests without a tag draw
    /// uniformly at random from the free portion of the pool (uniform
    /// selection, not first-fit) and surface
    /// [`Error::NoSegmentAvailable`] when nothing is free.
    pub fn reserve_segment(
        &self,
        spec: &SegmentSpec,
    ) -> Result<Segment, Error> {
        self.validate_segment(spec)?;
        match (spec.physical_network.as_deref(), spec.tag) {
            (Some(physical_network), Some(tag)) => {
                self.datastore.segment_reserve(physical_network, tag)?;
                debug!(self.log, "reserved segment";
                    "physical_network" => physical_network.to_owned(),
                    "tag" => tag.to_string());
                Ok(self.segment(physical_network, tag))
            }
            (physical_network, _) => self.reserve_any(physical_network),
        }
    }

    /// Reserve a tenant segment with no constraints: a uniform draw of a
    /// physical network among those with free capacity, then a uniform draw
    /// from that network's free tags.
    pub fn allocate_tenant_segment(&self) -> Result<Segment, Error> {
        self.reserve_any(None)
    }

    /// Release the segment, returning its tag to the pool when the tag is
    /// still configured and dropping the row entirely otherwise. Releasing
    /// a segment with no allocation row is a warned no-op.
    pub fn release_segment(
        &self,
        physical_network: &str,
        tag: SegmentTag,
    ) -> Result<(), Error> {
        let keep_in_pool = self.ranges.contains(physical_network, tag);
        let outcome = self.datastore.segment_release(
            physical_network,
            tag,
            keep_in_pool,
        )?;
        match outcome {
            ReleaseOutcome::Freed => {
                debug!(self.log, "returned tag to pool";
                    "physical_network" => physical_network.to_owned(),
                    "tag" => tag.to_string());
            }
            ReleaseOutcome::Deleted => {
                debug!(self.log, "released tag outside configured pool";
                    "physical_network" => physical_network.to_owned(),
                    "tag" => tag.to_string());
            }
            ReleaseOutcome::NotFound => {
                warn!(self.log, "no allocation found to release";
                    "physical_network" => physical_network.to_owned(),
                    "tag" => tag.to_string());
            }
        }
        Ok(())
    }

    fn reserve_any(
        &self,
        physical_network: Option<&str>,
    ) -> Result<Segment, Error> {
        for attempt in 0..MAX_RESERVE_ATTEMPTS {
            // Materialize the free set fresh from store state on every
            // attempt; a cached candidate set could hand out a tag reserved
            // since the cache was built.
            let allocated =
                self.datastore.segment_list_allocated(physical_network)?;
            let Some((network, tag)) =
                self.pick_candidate(physical_network, &allocated)
            else {
                return Err(Error::NoSegmentAvailable);
            };
            match self.datastore.segment_reserve(&network, tag) {
                Ok(()) => {
                    debug!(self.log, "reserved segment";
                        "physical_network" => network.clone(),
                        "tag" => tag.to_string(),
                        "attempt" => attempt);
                    return Ok(self.segment(&network, tag));
                }
                // Lost the race for this candidate; re-sample from fresh
                // store state.
                Err(Error::TagInUse { .. }) => {
                    debug!(self.log, "candidate reserved concurrently";
                        "physical_network" => network,
                        "tag" => tag.to_string(),
                        "attempt" => attempt);
                }
                Err(error) => return Err(error),
            }
        }
        warn!(self.log, "giving up on segment reservation under contention";
            "attempts" => MAX_RESERVE_ATTEMPTS);
        Err(Error::unavailable(
            "segment reservation kept losing races to concurrent allocations",
        ))
    }

    /// Pick a free `(physical_network, tag)` pair: a uniform draw of a
    /// network among those with free capacity, then a uniform draw within
    /// that network's free tags.
    fn pick_candidate(
        &self,
        physical_network: Option<&str>,
        allocated: &[(String, SegmentTag)],
    ) -> Option<(String, SegmentTag)> {
        let candidates: Vec<(&str, Vec<SegmentTag>)> = self
            .ranges
            .physical_networks()
            .filter(|network| {
                physical_network.map_or(true, |wanted| wanted == *network)
            })
            .filter_map(|network| {
                let pool = self.ranges.pool(network)?;
                let free: Vec<SegmentTag> = pool
                    .iter()
                    .copied()
                    .filter(|tag| {
                        !allocated
                            .iter()
                            .any(|(n, t)| n == network && t == tag)
                    })
                    .collect();
                if free.is_empty() {
                    None
                } else {
                    Some((network, free))
                }
            })
            .collect();
        let mut rng = rand::thread_rng();
        let (network, free) = candidates.choose(&mut rng)?;
        let tag = *free.choose(&mut rng)?;
        Some(((*network).to_owned(), tag))
    }

    /// The MTU carried by segments on `physical_network`: the smaller of
    /// the global segment MTU cap and the network's own MTU, or 0 when
    /// neither is configured.
    fn segment_mtu(&self, physical_network: &str) -> u32 {
        self.segment_mtu
            .into_iter()
            .chain(
                self.physical_network_mtus.get(physical_network).copied(),
            )
            .min()
            .unwrap_or(0)
    }

    fn segment(&self, physical_network: &str, tag: SegmentTag) -> Segment {
        Segment {
            network_type: QINQ_NETWORK_TYPE.to_owned(),
            physical_network: physical_network.to_owned(),
            segmentation_id: tag,
            mtu: self.segment_mtu(physical_network),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::Utf8TempDir;

    fn test_allocator(
        dir: &Utf8TempDir,
        config: &AllocatorConfig,
    ) -> SegmentAllocator {
        let log = Logger::root(slog::Discard, o!());
        let db_config = qinq_db_queries::db::Config {
            path: dir.path().join("segments.db"),
        };
        let datastore =
            Arc::new(DataStore::new(&log, &db_config).expect("datastore"));
        SegmentAllocator::new(&log, config, datastore).expect("allocator")
    }

    #[test]
    fn mtu_is_the_smallest_configured_bound() {
        let dir = Utf8TempDir::new().unwrap();
        let config = AllocatorConfig {
            tag_ranges: vec![
                "physnet1:100:103".to_owned(),
                "physnet2:100:103".to_owned(),
            ],
            physical_network_mtus: BTreeMap::from([(
                "physnet1".to_owned(),
                1500,
            )]),
            segment_mtu: Some(9000),
        };
        let allocator = test_allocator(&dir, &config);
        assert_eq!(allocator.segment_mtu("physnet1"), 1500);
        assert_eq!(allocator.segment_mtu("physnet2"), 9000);

        let config = AllocatorConfig {
            tag_ranges: vec!["physnet1:100:103".to_owned()],
            ..Default::default()
        };
        let dir2 = Utf8TempDir::new().unwrap();
        let allocator = test_allocator(&dir2, &config);
        assert_eq!(allocator.segment_mtu("physnet1"), 0);
    }

    #[test]
    fn network_type_is_fixed() {
        let dir = Utf8TempDir::new().unwrap();
        let config = AllocatorConfig::default();
        let allocator = test_allocator(&dir, &config);
        assert_eq!(allocator.network_type(), "qinq");
    }
}

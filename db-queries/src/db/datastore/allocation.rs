// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! [`DataStore`] methods on segment tag allocations.

use diesel::prelude::*;

use super::DataStore;
use crate::db::error::TransactionError;
use qinq_common::error::Error;
use qinq_common::ranges::TagRanges;
use qinq_common::segment::SegmentTag;
use qinq_db_model::QinqAllocation;

/// What happened to the allocation row when a segment was released.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReleaseOutcome {
    /// The row was marked free for reuse (its tag is still in the pool).
    Freed,
    /// The row was removed (its tag is outside the configured pool).
    Deleted,
    /// No allocation row existed for the segment.
    NotFound,
}

impl DataStore {
    /// List the `(physical_network, tag)` pairs currently marked allocated,
    /// optionally restricted to one physical network.
    pub fn segment_list_allocated(
        &self,
        physical_network: Option<&str>,
    ) -> Result<Vec<(String, SegmentTag)>, Error> {
        self.transaction_retry("segment_list_allocated", |conn| {
            use qinq_db_model::schema::qinq_allocation::dsl;
            let rows = match physical_network {
                Some(physical_network) => dsl::qinq_allocation
                    .filter(dsl::allocated.eq(true))
                    .filter(
                        dsl::physical_network
                            .eq(physical_network.to_owned()),
                    )
                    .select(QinqAllocation::as_select())
                    .load::<QinqAllocation>(conn)?,
                None => dsl::qinq_allocation
                    .filter(dsl::allocated.eq(true))
                    .select(QinqAllocation::as_select())
                    .load::<QinqAllocation>(conn)?,
            };
            let mut allocated = Vec::with_capacity(rows.len());
            for row in rows {
                let tag = row.tag()?;
                allocated.push((row.physical_network().to_owned(), tag));
            }
            Ok(allocated)
        })
    }

    /// Atomically reserve `tag` on `physical_network`.
    ///
    /// Inserts the row if the pair has never been allocated, flips a free
    /// row to allocated, and fails with [`Error::TagInUse`] when the pair is
    /// already held. Exactly one of two concurrent calls for the same pair
    /// can succeed.
    pub fn segment_reserve(
        &self,
        physical_network: &str,
        tag: SegmentTag,
    ) -> Result<(), Error> {
        self.transaction_retry("segment_reserve", |conn| {
            use qinq_db_model::schema::qinq_allocation::dsl;
            let existing = dsl::qinq_allocation
                .filter(dsl::physical_network.eq(physical_network.to_owned()))
                .filter(dsl::tag.eq(i32::from(tag)))
                .select(QinqAllocation::as_select())
                .first::<QinqAllocation>(conn)
                .optional()?;
            match existing {
                None => {
                    diesel::insert_into(dsl::qinq_allocation)
                        .values(QinqAllocation::new(physical_network, tag))
                        .execute(conn)?;
                    Ok(())
                }
                Some(row) if !row.is_allocated() => {
                    diesel::update(
                        dsl::qinq_allocation
                            .filter(
                                dsl::physical_network
                                    .eq(physical_network.to_owned()),
                            )
                            .filter(dsl::tag.eq(i32::from(tag))),
                    )
                    .set(dsl::allocated.eq(true))
                    .execute(conn)?;
                    Ok(())
                }
                Some(_) => Err(TransactionError::Custom(Error::TagInUse {
                    physical_network: physical_network.to_owned(),
                    tag,
                })),
            }
        })
    }

    /// Release `tag` on `physical_network`.
    ///
    /// With `keep_in_pool` the row is marked free for reuse; without it the
    /// row is removed entirely. Releasing a pair with no row is reported as
    /// [`ReleaseOutcome::NotFound`], not an error: deleting something
    /// already gone is idempotent.
    pub fn segment_release(
        &self,
        physical_network: &str,
        tag: SegmentTag,
        keep_in_pool: bool,
    ) -> Result<ReleaseOutcome, Error> {
        self.transaction_retry("segment_release", |conn| {
            use qinq_db_model::schema::qinq_allocation::dsl;
            let target = dsl::qinq_allocation
                .filter(dsl::physical_network.eq(physical_network.to_owned()))
                .filter(dsl::tag.eq(i32::from(tag)));
            let existing = target
                .clone()
                .select(QinqAllocation::as_select())
                .first::<QinqAllocation>(conn)
                .optional()?;
            if existing.is_none() {
                return Ok(ReleaseOutcome::NotFound);
            }
            if keep_in_pool {
                diesel::update(target)
                    .set(dsl::allocated.eq(false))
                    .execute(conn)?;
                Ok(ReleaseOutcome::Freed)
            } else {
                diesel::delete(target).execute(conn)?;
                Ok(ReleaseOutcome::Deleted)
            }
        })
    }

    /// Remove free rows whose tag fell out of the configured pool (the pool
    /// shrank since the store was last used).
    ///
    /// Runs under the same write-locking transaction discipline as
    /// [`DataStore::segment_reserve`], so a concurrent allocation cannot
    /// race the purge. Returns the number of rows removed.
    pub fn segment_reconcile(
        &self,
        ranges: &TagRanges,
    ) -> Result<usize, Error> {
        self.transaction_retry("segment_reconcile", |conn| {
            use qinq_db_model::schema::qinq_allocation::dsl;
            let free_rows = dsl::qinq_allocation
                .filter(dsl::allocated.eq(false))
                .select(QinqAllocation::as_select())
                .load::<QinqAllocation>(conn)?;
            let mut removed = 0;
            for row in free_rows {
                let keep = match SegmentTag::try_from(row.raw_tag()) {
                    Ok(tag) => ranges.contains(row.physical_network(), tag),
                    // A free row that no longer decodes cannot be offered to
                    // anyone; purge it with the rest.
                    Err(_) => false,
                };
                if keep {
                    continue;
                }
                removed += diesel::delete(
                    dsl::qinq_allocation
                        .filter(
                            dsl::physical_network
                                .eq(row.physical_network().to_owned()),
                        )
                        .filter(dsl::tag.eq(row.raw_tag())),
                )
                .execute(conn)?;
            }
            Ok(removed)
        })
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use diesel::prelude::*;
use serde::Deserialize;
use serde::Serialize;

use crate::schema::qinq_allocation;
use qinq_common::error::Error;
use qinq_common::segment::SegmentTag;

/// Database representation of the allocation state of one tag on one
/// physical network.
///
/// If `allocated` is false, the tag on the physical network is available for
/// allocation to a tenant network. If `allocated` is true, the tag is in
/// use, either by a tenant or a provider network.
///
/// When an allocation is released, the row flips back to free if its tag is
/// still inside the configured pool, and is deleted if the pool no longer
/// offers it.
#[derive(
    Queryable,
    Insertable,
    Debug,
    Clone,
    Selectable,
    Serialize,
    Deserialize,
    PartialEq,
)]
#[diesel(table_name = qinq_allocation)]
pub struct QinqAllocation {
    physical_network: String,
    // i32 only so that the column derives a diesel table; tags are validated
    // into 1..=4094 before they are written.
    tag: i32,
    allocated: bool,
}

impl QinqAllocation {
    /// A freshly reserved allocation row.
    pub fn new(physical_network: &str, tag: SegmentTag) -> Self {
        Self {
            physical_network: physical_network.to_owned(),
            tag: i32::from(tag),
            allocated: true,
        }
    }

    pub fn physical_network(&self) -> &str {
        &self.physical_network
    }

    /// The row's tag, decoded back into the valid tag domain.
    ///
    /// Rows are only ever written from a [`SegmentTag`], so a decode failure
    /// means the store was modified behind our back.
    pub fn tag(&self) -> Result<SegmentTag, Error> {
        SegmentTag::try_from(self.tag).map_err(|e| {
            Error::internal_error(&format!(
                "corrupt allocation row for physical network {:?}: {e}",
                self.physical_network
            ))
        })
    }

    /// The raw stored tag column, for callers that must handle rows that no
    /// longer decode.
    pub fn raw_tag(&self) -> i32 {
        self.tag
    }

    pub fn is_allocated(&self) -> bool {
        self.allocated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rows_are_allocated() {
        let tag = SegmentTag::try_from(100u16).unwrap();
        let row = QinqAllocation::new("physnet1", tag);
        assert!(row.is_allocated());
        assert_eq!(row.physical_network(), "physnet1");
        assert_eq!(row.tag().unwrap(), tag);
        assert_eq!(row.raw_tag(), 100);
    }
}

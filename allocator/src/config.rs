// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Allocator configuration.

use std::collections::BTreeMap;

use camino::Utf8Path;
use serde::Deserialize;
use serde::Serialize;

use qinq_common::error::Error;

/// Configuration for a [`crate::SegmentAllocator`].
///
/// Constructed once at startup and passed by reference into the allocator's
/// constructor; there is no process-global configuration object.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct AllocatorConfig {
    /// Entries of the form `physical_network:min:max` or bare
    /// `physical_network`, naming the physical networks usable for provider
    /// and tenant segments and the ranges of tags on each available for
    /// allocation to tenant networks. Ranges are inclusive-exclusive.
    #[serde(default)]
    pub tag_ranges: Vec<String>,
    /// Per-physical-network MTU overrides.
    #[serde(default)]
    pub physical_network_mtus: BTreeMap<String, u32>,
    /// Upper bound applied to every segment MTU, if set.
    #[serde(default)]
    pub segment_mtu: Option<u32>,
}

impl AllocatorConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Utf8Path) -> Result<AllocatorConfig, Error> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::internal_error(&format!(
                "failed to read config file {path:?}: {e}"
            ))
        })?;
        toml::from_str(&contents).map_err(|e| {
            Error::internal_error(&format!(
                "failed to parse config file {path:?}: {e}"
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_round_trips_through_toml() {
        let raw = r#"
            tag_ranges = ["physnet1:100:200", "physnet2"]
            segment_mtu = 9000

            [physical_network_mtus]
            physnet1 = 1500
        "#;
        let config: AllocatorConfig = toml::from_str(raw).unwrap();
        assert_eq!(
            config.tag_ranges,
            vec!["physnet1:100:200".to_owned(), "physnet2".to_owned()]
        );
        assert_eq!(config.segment_mtu, Some(9000));
        assert_eq!(config.physical_network_mtus["physnet1"], 1500);
    }

    #[test]
    fn missing_fields_default() {
        let config: AllocatorConfig = toml::from_str("").unwrap();
        assert_eq!(config, AllocatorConfig::default());
    }
}

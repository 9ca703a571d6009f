//! Property tests for the versioned cache invariants.

use hotswap_store::core::{EMPTY_VERSION, VersionedCache};
use hotswap_store::error::{Result, StoreError};
use hotswap_store::storage::ConfigRow;
use proptest::prelude::*;

fn decode(bytes: &[u8]) -> Result<i64> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| StoreError::DeserializationError("not a number".to_string()))
}

/// A row that decodes to its own version, or garbage.
fn rows_strategy() -> impl Strategy<Value = Vec<Vec<(i64, bool)>>> {
    prop::collection::vec(prop::collection::vec((0i64..200, any::<bool>()), 0..8), 0..12)
}

fn to_rows(batch: &[(i64, bool)]) -> Vec<ConfigRow> {
    batch
        .iter()
        .map(|&(version, valid)| {
            let payload = if valid {
                version.to_string()
            } else {
                "garbage".to_string()
            };
            ConfigRow::new(version, payload.into_bytes())
        })
        .collect()
}

proptest! {
    #[test]
    fn latest_version_tracks_max_key(batches in rows_strategy()) {
        let cache = VersionedCache::new();
        let mut previous = EMPTY_VERSION;

        for batch in &batches {
            cache.merge(to_rows(batch), decode);

            let latest = cache.latest_version();
            let max_key = cache.versions().last().copied().unwrap_or(EMPTY_VERSION);
            prop_assert_eq!(latest, max_key);
            prop_assert!(latest >= previous);
            previous = latest;

            match cache.latest() {
                Ok(config) => prop_assert_eq!(*config, latest),
                Err(_) => prop_assert_eq!(latest, EMPTY_VERSION),
            }
        }
    }

    #[test]
    fn historical_configs_are_strictly_ascending(batches in rows_strategy()) {
        let cache = VersionedCache::new();
        for batch in &batches {
            cache.merge(to_rows(batch), decode);
        }

        let values: Vec<i64> = cache.list_all().iter().map(|c| **c).collect();
        prop_assert!(values.windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(values, cache.versions());
    }

    #[test]
    fn entries_are_never_replaced(first in 0i64..50, later in prop::collection::vec(0i64..50, 0..20)) {
        let cache = VersionedCache::new();
        cache.merge(vec![ConfigRow::new(first, first.to_string().into_bytes())], decode);

        for version in later {
            // Same version, different payload
            cache.merge(vec![ConfigRow::new(version, (version + 1000).to_string().into_bytes())], decode);
        }

        prop_assert_eq!(cache.get(first).map(|c| *c), Some(first));
    }
}

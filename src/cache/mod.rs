//! Cache manager — typed envelope with TTL over the raw key/value port.
//!
//! Values are stored as a JSON envelope recording whether the payload is a
//! map or a scalar, its entry count, and when it was written. Entries older
//! than the TTL read as absent; they stay physically stored until the next
//! write overwrites them.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::context::ServiceContext;

/// Maximum entry age before it reads as absent.
const TTL_HOURS: i64 = 24;

/// Map entry keys ending with this suffix are back-references; they are
/// skipped during serialization to keep cyclic payloads out of the store.
pub const BACK_REF_SUFFIX: &str = "Ref";

/// Stored envelope shape.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Envelope {
    Map {
        length: usize,
        data: BTreeMap<String, Value>,
        created: DateTime<Utc>,
    },
    Scalar {
        data: Value,
        created: DateTime<Utc>,
    },
}

impl Envelope {
    fn created(&self) -> DateTime<Utc> {
        match self {
            Envelope::Map { created, .. } | Envelope::Scalar { created, .. } => *created,
        }
    }
}

/// A cacheable payload: a keyed map or a single scalar value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachePayload {
    /// A map keyed by record id (or any string key).
    Map(BTreeMap<String, Value>),
    /// Any other JSON value.
    Scalar(Value),
}

/// Introspection summary of one stored entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntryDetails {
    /// The storage key.
    pub name: String,
    /// Whether the payload holds no data.
    pub is_empty: bool,
    /// Whether the payload is a map.
    pub is_map: bool,
    /// Map entry count (zero for scalars).
    pub length: usize,
    /// When the entry was written.
    pub created: DateTime<Utc>,
}

/// Typed cache over the context's key/value store.
pub struct CacheManager<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> CacheManager<'a> {
    /// Creates a cache manager over the given context's store and clock.
    #[must_use]
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Whether a live (non-expired) entry exists under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn has(&self, key: &str) -> Result<bool, String> {
        Ok(self.load(key)?.is_some())
    }

    /// Reads the payload under `key`, or `None` if absent or expired.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or the envelope cannot
    /// be parsed.
    pub fn get(&self, key: &str) -> Result<Option<CachePayload>, String> {
        Ok(self.load(key)?.map(|envelope| match envelope {
            Envelope::Map { data, .. } => CachePayload::Map(data),
            Envelope::Scalar { data, .. } => CachePayload::Scalar(data),
        }))
    }

    /// Writes a payload under `key`.
    ///
    /// Map payloads are stored with their entry count; entries whose key ends
    /// with [`BACK_REF_SUFFIX`] are dropped from the stored copy.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the store write fails.
    pub fn set(&self, key: &str, payload: &CachePayload) -> Result<(), String> {
        let created = self.ctx.clock.now();
        let envelope = match payload {
            CachePayload::Map(map) => {
                let data: BTreeMap<String, Value> = map
                    .iter()
                    .filter(|(k, _)| !k.ends_with(BACK_REF_SUFFIX))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                Envelope::Map { length: data.len(), data, created }
            }
            CachePayload::Scalar(value) => Envelope::Scalar { data: value.clone(), created },
        };
        let serialized = serde_json::to_string(&envelope)
            .map_err(|e| format!("Failed to serialize cache entry {key}: {e}"))?;
        self.ctx
            .store
            .write(key, &serialized)
            .map_err(|e| format!("Failed to write cache entry {key}: {e}"))
    }

    /// Removes the entry under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be modified.
    pub fn remove(&self, key: &str) -> Result<(), String> {
        self.ctx
            .store
            .remove(key)
            .map_err(|e| format!("Failed to remove cache entry {key}: {e}"))
    }

    /// Removes every stored entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be enumerated or modified.
    pub fn clear(&self) -> Result<(), String> {
        for key in self.keys()? {
            self.remove(&key)?;
        }
        Ok(())
    }

    /// Lists every stored key, live or expired.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be enumerated.
    pub fn keys(&self) -> Result<Vec<String>, String> {
        self.ctx.store.keys().map_err(|e| format!("Failed to list cache keys: {e}"))
    }

    /// Reports, for every stored entry, its shape and age metadata.
    ///
    /// Expired entries are included — details are an introspection surface,
    /// not a read path.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or an envelope is
    /// malformed.
    pub fn details(&self) -> Result<Vec<CacheEntryDetails>, String> {
        let mut details = Vec::new();
        for key in self.keys()? {
            let Some(raw) = self
                .ctx
                .store
                .read(&key)
                .map_err(|e| format!("Failed to read cache entry {key}: {e}"))?
            else {
                continue;
            };
            let envelope: Envelope = serde_json::from_str(&raw)
                .map_err(|e| format!("Malformed cache entry {key}: {e}"))?;
            let (is_map, length, is_empty) = match &envelope {
                Envelope::Map { length, .. } => (true, *length, *length == 0),
                Envelope::Scalar { data, .. } => (false, 0, data.is_null()),
            };
            details.push(CacheEntryDetails {
                name: key,
                is_empty,
                is_map,
                length,
                created: envelope.created(),
            });
        }
        Ok(details)
    }

    fn load(&self, key: &str) -> Result<Option<Envelope>, String> {
        let Some(raw) = self
            .ctx
            .store
            .read(key)
            .map_err(|e| format!("Failed to read cache entry {key}: {e}"))?
        else {
            return Ok(None);
        };
        let envelope: Envelope = serde_json::from_str(&raw)
            .map_err(|e| format!("Malformed cache entry {key}: {e}"))?;
        let age = self.ctx.clock.now() - envelope.created();
        if age > Duration::hours(TTL_HOURS) {
            return Ok(None);
        }
        Ok(Some(envelope))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::clock::FixedClock;
    use crate::adapters::memory::storage::MemoryStore;
    use crate::adapters::memory::transport::StaticTransport;
    use crate::context::ServiceContext;
    use serde_json::json;

    fn context() -> ServiceContext {
        ServiceContext::new(
            Box::new(StaticTransport::default()),
            Box::new(MemoryStore::default()),
            Box::new(FixedClock::at("2026-03-01T00:00:00Z")),
        )
    }

    #[test]
    fn scalar_round_trip() {
        let ctx = context();
        let cache = CacheManager::new(&ctx);
        let payload = CachePayload::Scalar(json!({ "orgId": "00D000000000001" }));

        cache.set("org-info", &payload).unwrap();
        assert!(cache.has("org-info").unwrap());
        assert_eq!(cache.get("org-info").unwrap(), Some(payload));
    }

    #[test]
    fn map_round_trip_preserves_entries() {
        let ctx = context();
        let cache = CacheManager::new(&ctx);
        let map: BTreeMap<String, Value> = [
            ("ApexClass-001".to_string(), json!({ "name": "A" })),
            ("ApexClass-002".to_string(), json!({ "name": "B" })),
        ]
        .into_iter()
        .collect();

        cache.set("apex-classes", &CachePayload::Map(map.clone())).unwrap();
        assert_eq!(cache.get("apex-classes").unwrap(), Some(CachePayload::Map(map)));
    }

    #[test]
    fn back_reference_keys_are_dropped_from_maps() {
        let ctx = context();
        let cache = CacheManager::new(&ctx);
        let map: BTreeMap<String, Value> = [
            ("Field-001".to_string(), json!({ "name": "Amount" })),
            ("objectRef".to_string(), json!({ "name": "Invoice" })),
        ]
        .into_iter()
        .collect();

        cache.set("fields", &CachePayload::Map(map)).unwrap();
        let Some(CachePayload::Map(stored)) = cache.get("fields").unwrap() else {
            panic!("expected a map payload");
        };
        assert!(stored.contains_key("Field-001"));
        assert!(!stored.contains_key("objectRef"));
        assert_eq!(stored.len(), 1);
    }

    #[test]
    fn expired_entries_read_as_absent() {
        let clock = FixedClock::at("2026-03-01T00:00:00Z");
        let ctx = ServiceContext::new(
            Box::new(StaticTransport::default()),
            Box::new(MemoryStore::default()),
            Box::new(clock.clone()),
        );
        let cache = CacheManager::new(&ctx);
        cache.set("org-info", &CachePayload::Scalar(json!(1))).unwrap();

        clock.advance_hours(23);
        assert!(cache.has("org-info").unwrap());

        clock.advance_hours(2);
        assert!(!cache.has("org-info").unwrap());
        assert_eq!(cache.get("org-info").unwrap(), None);
    }

    #[test]
    fn expired_entries_still_listed_in_details() {
        let clock = FixedClock::at("2026-03-01T00:00:00Z");
        let ctx = ServiceContext::new(
            Box::new(StaticTransport::default()),
            Box::new(MemoryStore::default()),
            Box::new(clock.clone()),
        );
        let cache = CacheManager::new(&ctx);
        cache.set("org-info", &CachePayload::Scalar(json!(1))).unwrap();
        clock.advance_hours(48);

        let details = cache.details().unwrap();
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].name, "org-info");
        assert!(!details[0].is_map);
    }

    #[test]
    fn details_report_shape_without_payload() {
        let ctx = context();
        let cache = CacheManager::new(&ctx);
        let map: BTreeMap<String, Value> =
            [("a".to_string(), json!(1)), ("b".to_string(), json!(2))].into_iter().collect();
        cache.set("two-entries", &CachePayload::Map(map)).unwrap();
        cache.set("empty-map", &CachePayload::Map(BTreeMap::new())).unwrap();

        let mut details = cache.details().unwrap();
        details.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(details[0].name, "empty-map");
        assert!(details[0].is_map && details[0].is_empty);
        assert_eq!(details[1].name, "two-entries");
        assert!(details[1].is_map && !details[1].is_empty);
        assert_eq!(details[1].length, 2);
    }

    #[test]
    fn remove_and_clear() {
        let ctx = context();
        let cache = CacheManager::new(&ctx);
        cache.set("a", &CachePayload::Scalar(json!(1))).unwrap();
        cache.set("b", &CachePayload::Scalar(json!(2))).unwrap();

        cache.remove("a").unwrap();
        assert!(!cache.has("a").unwrap());
        assert!(cache.has("b").unwrap());

        cache.clear().unwrap();
        assert!(cache.keys().unwrap().is_empty());
    }
}

//! Dataset manager — named retrieval units with caching and typed conversion.
//!
//! A dataset is one cacheable unit of remote retrieval: its queries, its
//! conversion into typed records, and its cache key. The manager resolves a
//! batch of datasets concurrently, checking the cache before the transport
//! and memoizing in-flight fetches so that at most one fetch per cache key is
//! ever running.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use futures::future::join_all;
use serde_json::Value;
use tokio::sync::{Mutex, OnceCell};

use crate::cache::{CacheManager, CachePayload};
use crate::context::ServiceContext;
use crate::ports::transport::{MetadataRequest, QuerySpec};
use crate::record::{RecordKind, ScoredRecord};
use crate::score::RecordFactory;

/// Query statement for the Apex class dataset.
pub const APEX_CLASSES_QUERY: &str =
    "SELECT Id, Name, ApiVersion, IsTest, Length, Description FROM ApexClass";
/// Query statement for per-class aggregated coverage rows.
pub const APEX_COVERAGE_QUERY: &str =
    "SELECT ClassId, Coverage FROM ApexCodeCoverageAggregate";
/// Query statement for the Apex trigger dataset.
pub const APEX_TRIGGERS_QUERY: &str =
    "SELECT Id, Name, ApiVersion, ObjectId, IsActive, Length FROM ApexTrigger";
/// Query statement for the custom field dataset.
pub const CUSTOM_FIELDS_QUERY: &str =
    "SELECT Id, Name, ObjectId, FieldType, Description FROM CustomField";
/// Query statement for the flow dataset.
pub const FLOWS_QUERY: &str =
    "SELECT Id, Name, ApiVersion, IsActive, VersionCount, Description FROM Flow";
/// Query statement for the custom label dataset.
pub const CUSTOM_LABELS_QUERY: &str =
    "SELECT Id, Name, Category, Value, Language FROM CustomLabel";
/// Query statement for the permission set dataset.
pub const PERMISSION_SETS_QUERY: &str =
    "SELECT Id, Name, Description, IsCustom, MemberCount FROM PermissionSet";
/// Query statement for the profile dataset.
pub const PROFILES_QUERY: &str =
    "SELECT Id, Name, Description, IsCustom, MemberCount FROM Profile";
/// Query statement for the object dataset.
pub const OBJECTS_QUERY: &str =
    "SELECT Id, Name, Label, IsCustom, Description FROM ObjectDef";
/// Query statement for the object permission dataset.
pub const OBJECT_PERMISSIONS_QUERY: &str =
    "SELECT ParentId, Object, Permissions FROM ObjectPermission";

/// The named datasets the engine can retrieve.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum DatasetKey {
    /// All Apex classes, with coverage merged in.
    ApexClasses,
    /// All Apex triggers.
    ApexTriggers,
    /// All custom fields.
    CustomFields,
    /// All flows.
    Flows,
    /// All custom labels.
    CustomLabels,
    /// All permission sets.
    PermissionSets,
    /// All profiles.
    Profiles,
    /// All object definitions.
    Objects,
    /// Object permission rows (plain lookup table, not typed records).
    ObjectPermissions,
    /// Describe of a single named object.
    ObjectDescribe(String),
}

impl DatasetKey {
    /// The cache key (and error-message alias) for this dataset.
    #[must_use]
    pub fn cache_key(&self) -> String {
        match self {
            DatasetKey::ApexClasses => "apex-classes".to_string(),
            DatasetKey::ApexTriggers => "apex-triggers".to_string(),
            DatasetKey::CustomFields => "custom-fields".to_string(),
            DatasetKey::Flows => "flows".to_string(),
            DatasetKey::CustomLabels => "custom-labels".to_string(),
            DatasetKey::PermissionSets => "permission-sets".to_string(),
            DatasetKey::Profiles => "profiles".to_string(),
            DatasetKey::Objects => "objects".to_string(),
            DatasetKey::ObjectPermissions => "object-permissions".to_string(),
            DatasetKey::ObjectDescribe(name) => format!("object-describe/{name}"),
        }
    }

    /// The record kind this dataset converts into, if it is a record dataset.
    #[must_use]
    pub fn record_kind(&self) -> Option<RecordKind> {
        match self {
            DatasetKey::ApexClasses => Some(RecordKind::ApexClass),
            DatasetKey::ApexTriggers => Some(RecordKind::ApexTrigger),
            DatasetKey::CustomFields => Some(RecordKind::CustomField),
            DatasetKey::Flows => Some(RecordKind::Flow),
            DatasetKey::CustomLabels => Some(RecordKind::CustomLabel),
            DatasetKey::PermissionSets => Some(RecordKind::PermissionSet),
            DatasetKey::Profiles => Some(RecordKind::Profile),
            DatasetKey::Objects | DatasetKey::ObjectDescribe(_) => Some(RecordKind::ObjectDef),
            DatasetKey::ObjectPermissions => None,
        }
    }

    /// The query statements this dataset executes, in result order.
    #[must_use]
    pub fn queries(&self) -> Vec<QuerySpec> {
        match self {
            DatasetKey::ApexClasses => {
                vec![QuerySpec::new(APEX_CLASSES_QUERY), QuerySpec::new(APEX_COVERAGE_QUERY)]
            }
            DatasetKey::ApexTriggers => vec![QuerySpec::new(APEX_TRIGGERS_QUERY)],
            DatasetKey::CustomFields => vec![QuerySpec::new(CUSTOM_FIELDS_QUERY)],
            DatasetKey::Flows => vec![QuerySpec::new(FLOWS_QUERY)],
            DatasetKey::CustomLabels => vec![QuerySpec::new(CUSTOM_LABELS_QUERY)],
            DatasetKey::PermissionSets => vec![QuerySpec::new(PERMISSION_SETS_QUERY)],
            DatasetKey::Profiles => vec![QuerySpec::new(PROFILES_QUERY)],
            DatasetKey::Objects => vec![QuerySpec::new(OBJECTS_QUERY)],
            DatasetKey::ObjectPermissions => vec![QuerySpec::new(OBJECT_PERMISSIONS_QUERY)],
            DatasetKey::ObjectDescribe(_) => Vec::new(),
        }
    }
}

/// A resolved dataset: a typed record map or a plain row table.
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetValue {
    /// Typed records keyed by component id.
    Records(BTreeMap<String, ScoredRecord>),
    /// Raw lookup rows (e.g. object permissions).
    Table(Vec<Value>),
}

impl DatasetValue {
    /// The record map, or an error naming the dataset when the value is a
    /// plain table.
    ///
    /// # Errors
    ///
    /// Returns an error if this value is not a record map.
    pub fn records(&self, alias: &str) -> Result<&BTreeMap<String, ScoredRecord>, String> {
        match self {
            DatasetValue::Records(map) => Ok(map),
            DatasetValue::Table(_) => Err(format!("Dataset {alias} is not a record map")),
        }
    }

    /// The raw row table, or an error naming the dataset.
    ///
    /// # Errors
    ///
    /// Returns an error if this value is not a table.
    pub fn table(&self, alias: &str) -> Result<&[Value], String> {
        match self {
            DatasetValue::Table(rows) => Ok(rows),
            DatasetValue::Records(_) => Err(format!("Dataset {alias} is not a row table")),
        }
    }

    /// Number of records or rows.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            DatasetValue::Records(map) => map.len(),
            DatasetValue::Table(rows) => rows.len(),
        }
    }

    /// Whether the dataset resolved to no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The datasets resolved by one `run` batch, keyed by cache key.
#[derive(Debug, Default)]
pub struct ResolvedDatasets {
    values: BTreeMap<String, DatasetValue>,
}

impl ResolvedDatasets {
    /// The resolved value for `key`.
    ///
    /// # Errors
    ///
    /// Returns an error naming the dataset when it was never resolved in
    /// this batch — the defensive check recipes rely on at transform time.
    pub fn get(&self, key: &DatasetKey) -> Result<&DatasetValue, String> {
        let alias = key.cache_key();
        self.values
            .get(&alias)
            .ok_or_else(|| format!("Dataset {alias} was not resolved before transform"))
    }

    fn insert(&mut self, key: &DatasetKey, value: DatasetValue) {
        self.values.insert(key.cache_key(), value);
    }
}

/// Resolves datasets against the cache and the transport.
pub struct DatasetManager<'a> {
    ctx: &'a ServiceContext,
    factory: RecordFactory,
    inflight: Mutex<HashMap<String, Arc<OnceCell<DatasetValue>>>>,
}

impl<'a> DatasetManager<'a> {
    /// Creates a manager over the given context and record factory.
    #[must_use]
    pub fn new(ctx: &'a ServiceContext, factory: RecordFactory) -> Self {
        Self { ctx, factory, inflight: Mutex::new(HashMap::new()) }
    }

    /// The factory backing record conversion.
    #[must_use]
    pub fn factory(&self) -> &RecordFactory {
        &self.factory
    }

    /// Resolves every requested dataset, fetching concurrently.
    ///
    /// Each dataset succeeds or fails on its own; nothing is rolled back
    /// when a sibling fails. The batch as a whole fails (after every fetch
    /// settles) if any dataset failed.
    ///
    /// # Errors
    ///
    /// Returns the first failing dataset's error, prefixed with its alias.
    pub async fn run(&self, requests: &[DatasetKey]) -> Result<ResolvedDatasets, String> {
        let mut unique: Vec<&DatasetKey> = Vec::new();
        for key in requests {
            if !unique.iter().any(|k| k.cache_key() == key.cache_key()) {
                unique.push(key);
            }
        }

        let fetches = unique.iter().map(|key| async move {
            let value = self.run_dataset(key).await;
            (*key, value)
        });
        let mut resolved = ResolvedDatasets::default();
        for (key, value) in join_all(fetches).await {
            let value = value.map_err(|e| format!("Dataset {}: {e}", key.cache_key()))?;
            resolved.insert(key, value);
        }
        Ok(resolved)
    }

    /// Resolves a single dataset: cache first, then the transport.
    ///
    /// Concurrent calls for the same cache key share one fetch; a failed
    /// fetch leaves nothing memoized, so the next call retries.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache is unreadable or the fetch fails.
    pub async fn run_dataset(&self, key: &DatasetKey) -> Result<DatasetValue, String> {
        let cache_key = key.cache_key();
        let cell = {
            let mut inflight = self.inflight.lock().await;
            Arc::clone(inflight.entry(cache_key).or_default())
        };
        let value = cell.get_or_try_init(|| self.fetch(key)).await?;
        Ok(value.clone())
    }

    /// Drops the cache entry and the in-flight memo for a dataset, forcing
    /// the next request to refetch.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache store cannot be modified.
    pub async fn invalidate(&self, key: &DatasetKey) -> Result<(), String> {
        let cache_key = key.cache_key();
        self.inflight.lock().await.remove(&cache_key);
        CacheManager::new(self.ctx).remove(&cache_key)
    }

    async fn fetch(&self, key: &DatasetKey) -> Result<DatasetValue, String> {
        let cache = CacheManager::new(self.ctx);
        let cache_key = key.cache_key();
        if let Some(payload) = cache.get(&cache_key)? {
            return decode_payload(&payload);
        }

        let value = self.fetch_remote(key).await?;
        // Cache only after a fully successful fetch; a failed fetch must
        // never leave a partial entry behind.
        cache.set(&cache_key, &encode_payload(&value)?)?;
        Ok(value)
    }

    async fn fetch_remote(&self, key: &DatasetKey) -> Result<DatasetValue, String> {
        match key {
            DatasetKey::ObjectDescribe(name) => self.describe_object(name).await,
            DatasetKey::ObjectPermissions => {
                let mut row_sets = self.execute(key).await?;
                Ok(DatasetValue::Table(take_row_set(&mut row_sets, 0)))
            }
            _ => {
                let kind = key
                    .record_kind()
                    .ok_or_else(|| format!("Dataset {} has no record kind", key.cache_key()))?;
                let mut row_sets = self.execute(key).await?;
                let mut rows = take_row_set(&mut row_sets, 0);
                if *key == DatasetKey::ApexClasses {
                    merge_coverage(&mut rows, &take_row_set(&mut row_sets, 1));
                }
                self.convert(key, kind, rows).await
            }
        }
    }

    async fn execute(&self, key: &DatasetKey) -> Result<Vec<Vec<Value>>, String> {
        self.ctx
            .transport
            .execute_queries(&key.queries())
            .await
            .map_err(|e| format!("Remote query failed: {e}"))
    }

    async fn convert(
        &self,
        key: &DatasetKey,
        kind: RecordKind,
        rows: Vec<Value>,
    ) -> Result<DatasetValue, String> {
        let edges = if self.factory.dependency_aware(kind) {
            let ids = row_ids(key, &rows)?;
            Some(
                self.ctx
                    .transport
                    .fetch_dependency_edges(&ids)
                    .await
                    .map_err(|e| format!("Dependency fetch failed: {e}"))?,
            )
        } else {
            None
        };

        let mut records = BTreeMap::new();
        for row in &rows {
            let record = self.factory.create_scored(kind, row, edges.as_deref())?;
            records.insert(record.record.id().to_string(), record);
        }
        Ok(DatasetValue::Records(records))
    }

    async fn describe_object(&self, name: &str) -> Result<DatasetValue, String> {
        let request = MetadataRequest { entity: "ObjectDef".to_string(), name: name.to_string() };
        let rows = self
            .ctx
            .transport
            .fetch_metadata(&[request])
            .await
            .map_err(|e| format!("Metadata fetch failed: {e}"))?;
        let row = rows
            .first()
            .ok_or_else(|| format!("Object {name} not found"))?;

        let record = self.factory.create_scored(RecordKind::ObjectDef, row, None)?;
        let mut records = BTreeMap::new();
        records.insert(record.record.id().to_string(), record);
        Ok(DatasetValue::Records(records))
    }
}

fn take_row_set(row_sets: &mut Vec<Vec<Value>>, index: usize) -> Vec<Value> {
    if index < row_sets.len() {
        std::mem::take(&mut row_sets[index])
    } else {
        Vec::new()
    }
}

/// Folds coverage rows (`classId` → `coverage`) into the class rows.
fn merge_coverage(class_rows: &mut [Value], coverage_rows: &[Value]) {
    let coverage: HashMap<&str, &Value> = coverage_rows
        .iter()
        .filter_map(|row| Some((row.get("classId")?.as_str()?, row.get("coverage")?)))
        .collect();
    for row in class_rows {
        let Some(id) = row.get("id").and_then(Value::as_str) else { continue };
        if let Some(value) = coverage.get(id) {
            let value = (*value).clone();
            if let Some(object) = row.as_object_mut() {
                object.insert("coverage".to_string(), value);
            }
        }
    }
}

fn row_ids(key: &DatasetKey, rows: &[Value]) -> Result<Vec<String>, String> {
    rows.iter()
        .map(|row| {
            row.get("id")
                .and_then(Value::as_str)
                .map(String::from)
                .ok_or_else(|| {
                    format!("Dataset {} returned a row without an id", key.cache_key())
                })
        })
        .collect()
}

fn encode_payload(value: &DatasetValue) -> Result<CachePayload, String> {
    match value {
        DatasetValue::Records(map) => {
            let mut data = BTreeMap::new();
            for (id, record) in map {
                let serialized = serde_json::to_value(record)
                    .map_err(|e| format!("Failed to serialize record {id}: {e}"))?;
                data.insert(id.clone(), serialized);
            }
            Ok(CachePayload::Map(data))
        }
        DatasetValue::Table(rows) => Ok(CachePayload::Scalar(Value::Array(rows.clone()))),
    }
}

fn decode_payload(payload: &CachePayload) -> Result<DatasetValue, String> {
    match payload {
        CachePayload::Map(data) => {
            let mut records = BTreeMap::new();
            for (id, value) in data {
                let record: ScoredRecord = serde_json::from_value(value.clone())
                    .map_err(|e| format!("Malformed cached record {id}: {e}"))?;
                records.insert(id.clone(), record);
            }
            Ok(DatasetValue::Records(records))
        }
        CachePayload::Scalar(Value::Array(rows)) => Ok(DatasetValue::Table(rows.clone())),
        CachePayload::Scalar(other) => {
            Err(format!("Cached dataset has unexpected shape: {other}"))
        }
    }
}

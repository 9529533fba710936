//! Canned transport serving pre-loaded rows, edges, and metadata.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::graph::Edge;
use crate::ports::transport::{MetadataRequest, QuerySpec, Transport, TransportFuture};

#[derive(Default)]
struct Inner {
    rows_by_statement: Mutex<BTreeMap<String, Vec<Value>>>,
    edges: Mutex<Vec<Edge>>,
    metadata: Mutex<BTreeMap<String, Value>>,
    failing_statements: Mutex<BTreeSet<String>>,
    query_calls: AtomicUsize,
    statement_calls: Mutex<BTreeMap<String, usize>>,
    edge_calls: AtomicUsize,
    metadata_calls: AtomicUsize,
}

/// Transport answering from canned data, counting every call.
///
/// Clones share state, so a test can keep a handle for assertions while the
/// context owns a boxed clone. Unknown statements answer with an empty row
/// set; statements registered as failing reject the whole batch, which is
/// how a remote query error reaches one dataset.
#[derive(Clone, Default)]
pub struct StaticTransport {
    inner: Arc<Inner>,
}

impl StaticTransport {
    /// Creates an empty canned transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the rows returned for a statement.
    ///
    /// # Panics
    ///
    /// Panics if the shared state lock is poisoned.
    #[must_use]
    pub fn with_rows(self, statement: &str, rows: Vec<Value>) -> Self {
        self.inner.rows_by_statement.lock().unwrap().insert(statement.to_string(), rows);
        self
    }

    /// Registers the dependency edges returned for every edge fetch.
    ///
    /// # Panics
    ///
    /// Panics if the shared state lock is poisoned.
    #[must_use]
    pub fn with_edges(self, edges: Vec<Edge>) -> Self {
        *self.inner.edges.lock().unwrap() = edges;
        self
    }

    /// Registers the metadata row returned for `entity:name` describes.
    ///
    /// # Panics
    ///
    /// Panics if the shared state lock is poisoned.
    #[must_use]
    pub fn with_metadata(self, entity: &str, name: &str, row: Value) -> Self {
        self.inner.metadata.lock().unwrap().insert(format!("{entity}:{name}"), row);
        self
    }

    /// Makes any batch containing `statement` fail.
    ///
    /// # Panics
    ///
    /// Panics if the shared state lock is poisoned.
    #[must_use]
    pub fn with_failing_statement(self, statement: &str) -> Self {
        self.inner.failing_statements.lock().unwrap().insert(statement.to_string());
        self
    }

    /// Number of `execute_queries` calls so far.
    #[must_use]
    pub fn query_calls(&self) -> usize {
        self.inner.query_calls.load(Ordering::SeqCst)
    }

    /// Number of times a given statement was executed.
    ///
    /// # Panics
    ///
    /// Panics if the shared state lock is poisoned.
    #[must_use]
    pub fn statement_calls(&self, statement: &str) -> usize {
        self.inner.statement_calls.lock().unwrap().get(statement).copied().unwrap_or(0)
    }

    /// Number of dependency-edge fetches so far.
    #[must_use]
    pub fn edge_calls(&self) -> usize {
        self.inner.edge_calls.load(Ordering::SeqCst)
    }

    /// Number of metadata describes so far.
    #[must_use]
    pub fn metadata_calls(&self) -> usize {
        self.inner.metadata_calls.load(Ordering::SeqCst)
    }
}

impl Transport for StaticTransport {
    fn execute_queries(&self, queries: &[QuerySpec]) -> TransportFuture<'_, Vec<Vec<Value>>> {
        let statements: Vec<String> = queries.iter().map(|q| q.statement.clone()).collect();
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            inner.query_calls.fetch_add(1, Ordering::SeqCst);
            {
                let mut counts = inner.statement_calls.lock().unwrap();
                for statement in &statements {
                    *counts.entry(statement.clone()).or_insert(0) += 1;
                }
            }
            let failing = inner.failing_statements.lock().unwrap();
            if let Some(statement) = statements.iter().find(|s| failing.contains(*s)) {
                return Err(format!("Remote query failed: {statement}").into());
            }
            drop(failing);
            let rows = inner.rows_by_statement.lock().unwrap();
            Ok(statements
                .iter()
                .map(|s| rows.get(s).cloned().unwrap_or_default())
                .collect())
        })
    }

    fn fetch_dependency_edges(&self, ids: &[String]) -> TransportFuture<'_, Vec<Edge>> {
        let ids: BTreeSet<String> = ids.iter().cloned().collect();
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            inner.edge_calls.fetch_add(1, Ordering::SeqCst);
            let edges = inner.edges.lock().unwrap();
            Ok(edges
                .iter()
                .filter(|e| ids.contains(&e.id) || ids.contains(&e.ref_id))
                .cloned()
                .collect())
        })
    }

    fn fetch_metadata(&self, requests: &[MetadataRequest]) -> TransportFuture<'_, Vec<Value>> {
        let keys: Vec<String> =
            requests.iter().map(|r| format!("{}:{}", r.entity, r.name)).collect();
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            inner.metadata_calls.fetch_add(1, Ordering::SeqCst);
            let metadata = inner.metadata.lock().unwrap();
            Ok(keys.iter().filter_map(|k| metadata.get(k).cloned()).collect())
        })
    }
}

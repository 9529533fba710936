//! Transport port for executing remote metadata queries.
//!
//! The core never sees HTTP, query batching, or pagination — the transport
//! adapter owns all of that and hands back already-materialized JSON rows.

use std::error::Error;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::graph::Edge;

/// Boxed future type alias used by [`Transport`] to keep the trait
/// dyn-compatible.
pub type TransportFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, Box<dyn Error + Send + Sync>>> + Send + 'a>>;

/// One remote query to execute.
///
/// The statement is opaque to the core; the transport decides how to run it
/// (and whether to split it into pages or batches).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySpec {
    /// The query statement to execute remotely.
    pub statement: String,
}

impl QuerySpec {
    /// Creates a query spec from a statement string.
    #[must_use]
    pub fn new(statement: impl Into<String>) -> Self {
        Self { statement: statement.into() }
    }
}

/// A describe-style request for one named metadata entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRequest {
    /// The metadata entity kind (e.g. `"ObjectDef"`).
    pub entity: String,
    /// The developer name of the entity to describe.
    pub name: String,
}

/// Executes remote queries against the platform APIs.
pub trait Transport: Send + Sync {
    /// Executes the given queries and returns one row set per query, in the
    /// same order as the request.
    ///
    /// # Errors
    ///
    /// Returns an error if any remote call fails (network, auth, malformed
    /// response, etc.).
    fn execute_queries(&self, queries: &[QuerySpec]) -> TransportFuture<'_, Vec<Vec<Value>>>;

    /// Fetches the dependency edges touching any of the given component ids.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote dependency API call fails.
    fn fetch_dependency_edges(&self, ids: &[String]) -> TransportFuture<'_, Vec<Edge>>;

    /// Fetches describe-style metadata for the requested entities, one row
    /// per entity found. Entities that do not exist are simply absent from
    /// the result; callers decide whether that is an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote metadata call fails.
    fn fetch_metadata(&self, requests: &[MetadataRequest]) -> TransportFuture<'_, Vec<Value>>;
}

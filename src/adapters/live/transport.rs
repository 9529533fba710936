//! Live transport adapter calling the platform inspection API over HTTP.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::graph::Edge;
use crate::ports::transport::{MetadataRequest, QuerySpec, Transport, TransportFuture};

/// Live transport posting query batches to the platform API.
///
/// Pagination and batching happen server-side; this adapter only ships
/// statements and deserializes the materialized rows.
pub struct HttpTransport {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpTransport {
    /// Creates a transport for the given API base URL and optional bearer
    /// token.
    #[must_use]
    pub fn new(base_url: String, token: Option<String>) -> Self {
        Self { client: Client::new(), base_url, token }
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{path}", self.base_url.trim_end_matches('/'));
        let request = self.client.post(url);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

/// Request body for the batched query endpoint.
#[derive(Serialize)]
struct QueryBatch<'a> {
    statements: Vec<&'a str>,
}

/// Response body from the batched query endpoint.
#[derive(Deserialize)]
struct QueryBatchResponse {
    results: Vec<Vec<Value>>,
}

/// Request body for the dependency endpoint.
#[derive(Serialize)]
struct DependencyRequest<'a> {
    ids: &'a [String],
}

/// Response body from the dependency endpoint.
#[derive(Deserialize)]
struct DependencyResponse {
    edges: Vec<Edge>,
}

/// Request body for the metadata describe endpoint.
#[derive(Serialize)]
struct MetadataBatch<'a> {
    requests: &'a [MetadataRequest],
}

/// Response body from the metadata describe endpoint.
#[derive(Deserialize)]
struct MetadataResponse {
    records: Vec<Value>,
}

impl Transport for HttpTransport {
    fn execute_queries(&self, queries: &[QuerySpec]) -> TransportFuture<'_, Vec<Vec<Value>>> {
        let statements: Vec<String> = queries.iter().map(|q| q.statement.clone()).collect();
        Box::pin(async move {
            let body = QueryBatch { statements: statements.iter().map(String::as_str).collect() };
            let response = self.post("query").json(&body).send().await?;
            let response = response.error_for_status()?;
            let parsed: QueryBatchResponse = response.json().await?;
            if parsed.results.len() != statements.len() {
                return Err(format!(
                    "Query API returned {} row sets for {} statements",
                    parsed.results.len(),
                    statements.len()
                )
                .into());
            }
            Ok(parsed.results)
        })
    }

    fn fetch_dependency_edges(&self, ids: &[String]) -> TransportFuture<'_, Vec<Edge>> {
        let ids = ids.to_vec();
        Box::pin(async move {
            let response =
                self.post("dependencies").json(&DependencyRequest { ids: &ids }).send().await?;
            let response = response.error_for_status()?;
            let parsed: DependencyResponse = response.json().await?;
            Ok(parsed.edges)
        })
    }

    fn fetch_metadata(&self, requests: &[MetadataRequest]) -> TransportFuture<'_, Vec<Value>> {
        let requests = requests.to_vec();
        Box::pin(async move {
            let response =
                self.post("metadata").json(&MetadataBatch { requests: &requests }).send().await?;
            let response = response.error_for_status()?;
            let parsed: MetadataResponse = response.json().await?;
            Ok(parsed.records)
        })
    }
}

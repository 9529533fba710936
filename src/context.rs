//! Service context bundling all port trait objects.

use std::env;
use std::path::PathBuf;

use crate::adapters::live::clock::LiveClock;
use crate::adapters::live::storage::FileStore;
use crate::adapters::live::transport::HttpTransport;
use crate::ports::clock::Clock;
use crate::ports::storage::KeyValueStore;
use crate::ports::transport::Transport;

/// Environment variable naming the remote query API base URL.
pub const API_URL_VAR: &str = "ORGSCOPE_API_URL";
/// Environment variable holding the bearer token for the query API.
pub const API_TOKEN_VAR: &str = "ORGSCOPE_API_TOKEN";
/// Environment variable overriding the on-disk cache directory.
pub const CACHE_DIR_VAR: &str = "ORGSCOPE_CACHE_DIR";

/// Bundles all port trait objects into a single context.
///
/// Each field provides access to one external boundary. Constructors wire up
/// different adapter implementations (live or in-memory).
pub struct ServiceContext {
    /// Remote query transport.
    pub transport: Box<dyn Transport>,
    /// Key/value storage backing the cache.
    pub store: Box<dyn KeyValueStore>,
    /// Clock for cache timestamps and TTL checks.
    pub clock: Box<dyn Clock>,
}

impl ServiceContext {
    /// Creates a context from explicit port implementations.
    #[must_use]
    pub fn new(
        transport: Box<dyn Transport>,
        store: Box<dyn KeyValueStore>,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self { transport, store, clock }
    }

    /// Creates a live context from environment configuration.
    ///
    /// Reads [`API_URL_VAR`] and [`API_TOKEN_VAR`] for the transport and
    /// [`CACHE_DIR_VAR`] (default `.orgscope-cache`) for the file store.
    ///
    /// # Errors
    ///
    /// Returns an error if the API URL is not configured.
    pub fn live() -> Result<Self, String> {
        let api_url = env::var(API_URL_VAR)
            .map_err(|_| format!("{API_URL_VAR} environment variable not set"))?;
        let token = env::var(API_TOKEN_VAR).ok();
        let cache_dir = env::var(CACHE_DIR_VAR)
            .map_or_else(|_| PathBuf::from(".orgscope-cache"), PathBuf::from);

        Ok(Self {
            transport: Box::new(HttpTransport::new(api_url, token)),
            store: Box::new(FileStore::new(cache_dir)),
            clock: Box::new(LiveClock),
        })
    }
}

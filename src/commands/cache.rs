//! `cache` command handlers.

use crate::cache::CacheManager;
use crate::cli::CacheAction;
use crate::context::ServiceContext;

/// Runs a cache subcommand.
///
/// # Errors
///
/// Returns an error if the cache store cannot be read or modified.
pub fn run(ctx: &ServiceContext, action: &CacheAction) -> Result<(), String> {
    let cache = CacheManager::new(ctx);
    match action {
        CacheAction::Details => {
            let details = cache.details()?;
            let rendered = serde_json::to_string_pretty(&details)
                .map_err(|e| format!("Failed to render cache details: {e}"))?;
            println!("{rendered}");
            Ok(())
        }
        CacheAction::Clear => {
            let count = cache.keys()?.len();
            cache.clear()?;
            println!("Removed {count} cache entries");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::clock::FixedClock;
    use crate::adapters::memory::storage::MemoryStore;
    use crate::adapters::memory::transport::StaticTransport;
    use crate::cache::CachePayload;
    use serde_json::json;

    fn context() -> ServiceContext {
        ServiceContext::new(
            Box::new(StaticTransport::new()),
            Box::new(MemoryStore::new()),
            Box::new(FixedClock::at("2026-03-01T00:00:00Z")),
        )
    }

    #[test]
    fn details_and_clear_run_against_memory_store() {
        let ctx = context();
        CacheManager::new(&ctx).set("probe", &CachePayload::Scalar(json!(1))).unwrap();

        assert!(run(&ctx, &CacheAction::Details).is_ok());
        assert!(run(&ctx, &CacheAction::Clear).is_ok());
        assert!(CacheManager::new(&ctx).keys().unwrap().is_empty());
    }
}

//! End-to-end dataset → recipe flows over the in-memory adapters.

use orgscope::adapters::memory::clock::FixedClock;
use orgscope::adapters::memory::storage::MemoryStore;
use orgscope::adapters::memory::transport::StaticTransport;
use orgscope::context::ServiceContext;
use orgscope::dataset::{
    DatasetKey, DatasetManager, APEX_CLASSES_QUERY, APEX_COVERAGE_QUERY, CUSTOM_LABELS_QUERY,
};
use orgscope::graph::Edge;
use orgscope::recipe::{RecipeKey, RecipeManager, RecipeResult};
use orgscope::record::Record;
use orgscope::score::RecordFactory;
use serde_json::json;

fn edge(id: &str, kind: &str, ref_id: &str, ref_kind: &str) -> Edge {
    Edge {
        id: id.to_string(),
        name: format!("{id}-name"),
        kind: kind.to_string(),
        url: format!("/components/{id}"),
        ref_id: ref_id.to_string(),
        ref_name: format!("{ref_id}-name"),
        ref_kind: ref_kind.to_string(),
        ref_url: format!("/components/{ref_id}"),
    }
}

fn apex_transport() -> StaticTransport {
    StaticTransport::new()
        .with_rows(
            APEX_CLASSES_QUERY,
            vec![
                json!({
                    "id": "ApexClass-001",
                    "name": "InvoiceService",
                    "url": "/c/1",
                    "apiVersion": 60.0,
                    "isTest": false,
                    "length": 900,
                    "description": "Builds invoices"
                }),
                json!({
                    "id": "ApexClass-002",
                    "name": "LegacyHelper",
                    "url": "/c/2",
                    "apiVersion": 31.0,
                    "isTest": false,
                    "length": 4000
                }),
            ],
        )
        .with_rows(
            APEX_COVERAGE_QUERY,
            vec![
                json!({ "classId": "ApexClass-001", "coverage": 0.91 }),
                json!({ "classId": "ApexClass-002", "coverage": 0.12 }),
            ],
        )
        .with_edges(vec![edge("ApexClass-002", "ApexClass", "ApexClass-001", "ApexClass")])
}

fn context(transport: StaticTransport, clock: FixedClock) -> ServiceContext {
    ServiceContext::new(
        Box::new(transport),
        Box::new(MemoryStore::new()),
        Box::new(clock),
    )
}

#[tokio::test]
async fn apex_recipe_scores_and_annotates_records() {
    let ctx = context(apex_transport(), FixedClock::at("2026-03-01T00:00:00Z"));
    let manager = RecipeManager::new(&ctx).unwrap();

    let result = manager.run(&RecipeKey::ApexClasses).await.unwrap();
    let RecipeResult::Records(records) = result else { panic!("expected a list") };
    assert_eq!(records.len(), 2);

    // Sorted by name: InvoiceService first.
    let healthy = &records[0];
    assert_eq!(healthy.record.name(), "InvoiceService");
    assert_eq!(healthy.score(), 0);
    assert_eq!(healthy.dependencies.as_ref().unwrap().referenced.len(), 1);

    // LegacyHelper: no description, stale API, unreferenced, low coverage.
    let legacy = &records[1];
    let scoring = legacy.scoring.as_ref().unwrap();
    assert_eq!(scoring.score, 4);
    assert_eq!(scoring.bad_reason_ids, vec![0, 1, 2, 3]);
    let Record::ApexClass(attrs) = &legacy.record else { panic!("wrong variant") };
    assert_eq!(attrs.coverage, Some(0.12));
}

#[tokio::test]
async fn second_run_within_ttl_issues_no_second_transport_call() {
    let transport = apex_transport();
    let ctx = context(transport.clone(), FixedClock::at("2026-03-01T00:00:00Z"));

    let manager = RecipeManager::new(&ctx).unwrap();
    manager.run(&RecipeKey::ApexClasses).await.unwrap();
    manager.run(&RecipeKey::ApexClasses).await.unwrap();
    assert_eq!(transport.statement_calls(APEX_CLASSES_QUERY), 1);

    // A fresh manager over the same store is served from cache, not remote.
    let fresh = RecipeManager::new(&ctx).unwrap();
    fresh.run(&RecipeKey::ApexClasses).await.unwrap();
    assert_eq!(transport.statement_calls(APEX_CLASSES_QUERY), 1);
    assert_eq!(transport.edge_calls(), 1);
}

#[tokio::test]
async fn cached_records_keep_scores_and_dependencies() {
    let transport = apex_transport();
    let ctx = context(transport.clone(), FixedClock::at("2026-03-01T00:00:00Z"));

    RecipeManager::new(&ctx).unwrap().run(&RecipeKey::ApexClasses).await.unwrap();

    let fresh = RecipeManager::new(&ctx).unwrap();
    let result = fresh.run(&RecipeKey::ApexClasses).await.unwrap();
    let RecipeResult::Records(records) = result else { panic!("expected a list") };
    let legacy = records.iter().find(|r| r.record.name() == "LegacyHelper").unwrap();

    assert_eq!(legacy.score(), 4);
    let deps = records
        .iter()
        .find(|r| r.record.name() == "InvoiceService")
        .and_then(|r| r.dependencies.as_ref())
        .unwrap();
    assert_eq!(deps.referenced_by_type.get("ApexClass"), Some(&1));
}

#[tokio::test]
async fn expired_cache_forces_a_refetch() {
    let transport = apex_transport();
    let clock = FixedClock::at("2026-03-01T00:00:00Z");
    let ctx = context(transport.clone(), clock.clone());

    RecipeManager::new(&ctx).unwrap().run(&RecipeKey::ApexClasses).await.unwrap();
    clock.advance_hours(25);

    RecipeManager::new(&ctx).unwrap().run(&RecipeKey::ApexClasses).await.unwrap();
    assert_eq!(transport.statement_calls(APEX_CLASSES_QUERY), 2);
}

#[tokio::test]
async fn clean_then_run_refetches() {
    let transport = apex_transport();
    let ctx = context(transport.clone(), FixedClock::at("2026-03-01T00:00:00Z"));
    let manager = RecipeManager::new(&ctx).unwrap();

    manager.run(&RecipeKey::ApexClasses).await.unwrap();
    manager.clean(&RecipeKey::ApexClasses).await.unwrap();
    manager.run(&RecipeKey::ApexClasses).await.unwrap();

    assert_eq!(transport.statement_calls(APEX_CLASSES_QUERY), 2);
}

#[tokio::test]
async fn concurrent_requests_share_one_fetch() {
    let transport = StaticTransport::new().with_rows(
        CUSTOM_LABELS_QUERY,
        vec![json!({ "id": "Label-001", "name": "Banner", "url": "/l/1" })],
    );
    let ctx = context(transport.clone(), FixedClock::at("2026-03-01T00:00:00Z"));
    let manager = DatasetManager::new(&ctx, RecordFactory::with_builtin_rules().unwrap());

    let (a, b) = tokio::join!(
        manager.run_dataset(&DatasetKey::CustomLabels),
        manager.run_dataset(&DatasetKey::CustomLabels),
    );
    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(transport.statement_calls(CUSTOM_LABELS_QUERY), 1);
}

//! Record factory — raw rows in, typed scored records out.
//!
//! The factory precomputes, per record kind, the applicable rule ids and
//! whether the kind carries a dependency view. That table is built once at
//! construction and never changes, so `create`/`compute_score` stay pure
//! lookups plus predicate evaluation.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::graph::{DependencyIndex, Edge};
use crate::record::{Record, RecordKind, ScoredRecord, Scoring};
use crate::score::rules::RuleSet;

/// The kinds whose records carry a dependency view.
pub const DEPENDENCY_AWARE_KINDS: &[RecordKind] = &[
    RecordKind::ApexClass,
    RecordKind::CustomField,
    RecordKind::Flow,
    RecordKind::CustomLabel,
];

/// Per-kind construction plan: applicable rules and dependency awareness.
#[derive(Debug, Clone)]
struct KindSpec {
    rule_ids: Vec<u32>,
    dependency_aware: bool,
}

/// Builds and scores typed records.
pub struct RecordFactory {
    rules: RuleSet,
    specs: BTreeMap<RecordKind, KindSpec>,
    index: DependencyIndex,
}

impl RecordFactory {
    /// Creates a factory over a rule set, with the given set of known-bad
    /// component ids short-circuited in dependency views.
    #[must_use]
    pub fn new(rules: RuleSet, error_ids: BTreeSet<String>) -> Self {
        let specs = RecordKind::ALL
            .iter()
            .map(|kind| {
                let spec = KindSpec {
                    rule_ids: rules.applicable_to(*kind).to_vec(),
                    dependency_aware: DEPENDENCY_AWARE_KINDS.contains(kind),
                };
                (*kind, spec)
            })
            .collect();

        Self { rules, specs, index: DependencyIndex::with_error_ids(error_ids) }
    }

    /// Creates a factory over the builtin rule table and no error ids.
    ///
    /// # Errors
    ///
    /// Returns an error if the builtin rule table fails its density check.
    pub fn with_builtin_rules() -> Result<Self, String> {
        Ok(Self::new(RuleSet::builtin()?, BTreeSet::new()))
    }

    /// The rule set backing this factory.
    #[must_use]
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Whether records of `kind` carry a dependency view.
    #[must_use]
    pub fn dependency_aware(&self, kind: RecordKind) -> bool {
        self.specs.get(&kind).is_some_and(|s| s.dependency_aware)
    }

    /// Builds a record of `kind` from a raw row.
    ///
    /// Scoring state is initialized (to zero) when at least one rule applies
    /// to the kind. When the kind is dependency-aware and `edges` is
    /// supplied, a dependency view is computed for the record's own id.
    ///
    /// # Errors
    ///
    /// Returns an error if the row cannot be converted (wrongly typed
    /// declared field).
    pub fn create(
        &self,
        kind: RecordKind,
        row: &Value,
        edges: Option<&[Edge]>,
    ) -> Result<ScoredRecord, String> {
        let record = Record::from_row(kind, row)?;
        let spec = self.spec(kind)?;

        let scoring = if spec.rule_ids.is_empty() { None } else { Some(Scoring::default()) };
        let dependencies = match (spec.dependency_aware, edges) {
            (true, Some(edges)) => Some(self.index.build(edges, record.id())),
            _ => None,
        };

        Ok(ScoredRecord { record, scoring, dependencies })
    }

    /// Runs the single scoring pass over a freshly created record.
    ///
    /// Applicable rules are evaluated in registration order; every violated
    /// rule bumps the score and appends its `bad_field`/`id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the record's kind has applicable rules but its
    /// scoring state was never initialized — that means the record did not
    /// come out of `create` and is a programming error.
    pub fn compute_score(&self, record: &mut ScoredRecord) -> Result<(), String> {
        let kind = record.record.kind();
        let spec = self.spec(kind)?;
        if spec.rule_ids.is_empty() {
            return Ok(());
        }
        if record.scoring.is_none() {
            return Err(format!(
                "Cannot score {kind} record {}: scoring state was never initialized",
                record.record.id()
            ));
        }

        // Evaluate against the immutable snapshot first, then apply, so the
        // predicates never observe a half-updated record.
        let violated: Vec<u32> = spec
            .rule_ids
            .iter()
            .copied()
            .filter(|id| self.rules.rule(*id).is_some_and(|rule| rule.evaluate(record)))
            .collect();

        let scoring =
            record.scoring.as_mut().ok_or_else(|| "Scoring state vanished mid-pass".to_string())?;
        for id in violated {
            let rule = self
                .rules
                .rule(id)
                .ok_or_else(|| format!("Rule {id} missing from registry"))?;
            scoring.score += 1;
            scoring.bad_fields.push(rule.bad_field.to_string());
            scoring.bad_reason_ids.push(id);
        }
        Ok(())
    }

    /// Convenience: `create` followed by the scoring pass.
    ///
    /// # Errors
    ///
    /// Returns an error if either step fails.
    pub fn create_scored(
        &self,
        kind: RecordKind,
        row: &Value,
        edges: Option<&[Edge]>,
    ) -> Result<ScoredRecord, String> {
        let mut record = self.create(kind, row, edges)?;
        self.compute_score(&mut record)?;
        Ok(record)
    }

    fn spec(&self, kind: RecordKind) -> Result<&KindSpec, String> {
        self.specs
            .get(&kind)
            .ok_or_else(|| format!("No construction plan registered for kind {kind}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn factory() -> RecordFactory {
        RecordFactory::with_builtin_rules().unwrap()
    }

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

    #[test]
    fn kind_without_rules_gets_no_scoring_state() {
        let row = json!({ "id": "Obj-001", "name": "Invoice", "url": "/obj" });
        let record = factory().create_scored(RecordKind::ObjectDef, &row, None).unwrap();

        assert!(record.scoring.is_none());
        assert_eq!(record.score(), 0);
    }

    #[test]
    fn clean_record_scores_zero_with_empty_lists() {
        let row = json!({
            "id": "ApexClass-001",
            "name": "InvoiceService",
            "url": "/c",
            "apiVersion": 60.0,
            "isTest": false,
            "coverage": 0.92,
            "description": "Builds invoices"
        });
        let edges =
            vec![edge("ApexClass-002", "ApexClass", "ApexClass-001", "ApexClass")];
        let record =
            factory().create_scored(RecordKind::ApexClass, &row, Some(&edges)).unwrap();

        let scoring = record.scoring.as_ref().unwrap();
        assert_eq!(scoring.score, 0);
        assert!(scoring.bad_fields.is_empty());
        assert!(scoring.bad_reason_ids.is_empty());
    }

    #[test]
    fn violations_accumulate_in_registration_order() {
        // No description, stale API version, unreferenced, low coverage.
        let row = json!({
            "id": "ApexClass-001",
            "name": "LegacyHelper",
            "url": "/c",
            "apiVersion": 32.0,
            "isTest": false,
            "coverage": 0.40
        });
        let record = factory().create_scored(RecordKind::ApexClass, &row, Some(&[])).unwrap();

        let scoring = record.scoring.as_ref().unwrap();
        assert_eq!(scoring.score, 4);
        assert_eq!(scoring.bad_reason_ids, vec![0, 1, 2, 3]);
        assert_eq!(
            scoring.bad_fields,
            vec!["description", "apiVersion", "dependencies.referenced", "coverage"]
        );
    }

    #[test]
    fn dependency_view_attached_only_when_edges_supplied() {
        let row = json!({ "id": "Label-001", "name": "Banner", "url": "/l" });
        let with_edges =
            factory().create_scored(RecordKind::CustomLabel, &row, Some(&[])).unwrap();
        let without_edges = factory().create_scored(RecordKind::CustomLabel, &row, None).unwrap();

        assert!(with_edges.dependencies.is_some());
        assert!(without_edges.dependencies.is_none());
    }

    #[test]
    fn non_dependency_aware_kind_never_gets_a_view() {
        let row = json!({ "id": "PermSet-001", "name": "Auditors", "url": "/p" });
        let edges = vec![edge("X", "ApexClass", "PermSet-001", "PermissionSet")];
        let record =
            factory().create_scored(RecordKind::PermissionSet, &row, Some(&edges)).unwrap();

        assert!(record.dependencies.is_none());
    }

    #[test]
    fn unreferenced_rule_uses_the_attached_view() {
        let row = json!({
            "id": "Label-001",
            "name": "Banner",
            "url": "/l"
        });
        let referenced = vec![edge("ApexClass-001", "ApexClass", "Label-001", "CustomLabel")];

        let used = factory().create_scored(RecordKind::CustomLabel, &row, Some(&referenced)).unwrap();
        assert_eq!(used.score(), 0);

        let orphaned = factory().create_scored(RecordKind::CustomLabel, &row, Some(&[])).unwrap();
        assert_eq!(orphaned.score(), 1);
        assert_eq!(orphaned.scoring.as_ref().unwrap().bad_reason_ids, vec![2]);
    }

    #[test]
    fn errored_dependency_view_does_not_trigger_unreferenced() {
        let error_ids: BTreeSet<String> = ["Label-001".to_string()].into_iter().collect();
        let factory = RecordFactory::new(RuleSet::builtin().unwrap(), error_ids);

        let row = json!({ "id": "Label-001", "name": "Banner", "url": "/l" });
        let record = factory.create_scored(RecordKind::CustomLabel, &row, Some(&[])).unwrap();

        assert!(record.dependencies.as_ref().unwrap().had_error);
        assert_eq!(record.score(), 0);
    }

    #[test]
    fn scoring_a_record_that_skipped_create_fails_loudly() {
        let factory = factory();
        let row = json!({ "id": "Flow-001", "name": "Onboarding", "url": "/f" });
        // Hand-assembled record without scoring state, as if create was skipped.
        let mut record = ScoredRecord {
            record: Record::from_row(RecordKind::Flow, &row).unwrap(),
            scoring: None,
            dependencies: None,
        };

        let result = factory.compute_score(&mut record);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("never initialized"));
    }

    #[test]
    fn test_classes_are_exempt_from_coverage() {
        let row = json!({
            "id": "ApexClass-009",
            "name": "InvoiceServiceTest",
            "url": "/c",
            "apiVersion": 60.0,
            "isTest": true,
            "coverage": 0.0,
            "description": "Tests"
        });
        let record = factory()
            .create_scored(RecordKind::ApexClass, &row, Some(&[edge("X", "ApexClass", "ApexClass-009", "ApexClass")]))
            .unwrap();

        assert_eq!(record.score(), 0);
    }
}

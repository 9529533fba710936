//! Validation rule registry.
//!
//! Rules are declarative: a predicate over a record, the attribute path it
//! flags, and the set of record kinds it applies to. The whole table is built
//! once at startup and shared read-only by every scoring pass; rule ids are
//! dense (0..N-1) so the UI can look a rule up by the ids stored in a
//! record's `bad_reason_ids`.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::record::{Record, RecordKind, ScoredRecord};

/// Classes and flows pinned below this API version are considered stale.
const MIN_API_VERSION: f64 = 50.0;

/// Test coverage below this ratio is flagged.
const MIN_COVERAGE: f64 = 0.75;

/// One best-practice validation rule.
#[derive(Debug)]
pub struct ScoreRule {
    /// Stable, dense rule id.
    pub id: u32,
    /// Short human-readable description of what the rule checks.
    pub description: &'static str,
    /// Message shown when the rule is violated.
    pub error_message: &'static str,
    /// Attribute path the violation points at.
    pub bad_field: &'static str,
    /// Record kinds this rule applies to.
    pub applicable: &'static [RecordKind],
    formula: fn(&ScoredRecord) -> bool,
}

impl ScoreRule {
    /// Evaluates the rule's predicate against a record.
    ///
    /// Returns `true` when the record violates the rule. Evaluation is pure;
    /// it reads record attributes and the dependency view only.
    #[must_use]
    pub fn evaluate(&self, record: &ScoredRecord) -> bool {
        (self.formula)(record)
    }

    /// Whether the rule applies to records of the given kind.
    #[must_use]
    pub fn applies_to(&self, kind: RecordKind) -> bool {
        self.applicable.contains(&kind)
    }
}

/// Explanation of one rule, served to the UI for score breakdowns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleExplanation {
    /// Short description of the check.
    pub description: &'static str,
    /// Message shown for a violation.
    pub error_message: &'static str,
    /// Attribute path the violation points at.
    pub bad_field: &'static str,
}

/// The immutable rule table plus a per-kind index.
#[derive(Debug)]
pub struct RuleSet {
    rules: Vec<ScoreRule>,
    by_kind: BTreeMap<RecordKind, Vec<u32>>,
}

impl RuleSet {
    /// Builds the builtin best-practice rule table.
    ///
    /// # Errors
    ///
    /// Returns an error if the table violates the dense-id invariant; that is
    /// a registration mistake, not a runtime condition.
    pub fn builtin() -> Result<Self, String> {
        Self::from_rules(builtin_rules())
    }

    /// Builds a rule set from an explicit rule list.
    ///
    /// # Errors
    ///
    /// Returns an error unless rule ids are exactly 0..N-1 in order.
    pub fn from_rules(rules: Vec<ScoreRule>) -> Result<Self, String> {
        for (position, rule) in rules.iter().enumerate() {
            let expected = u32::try_from(position).map_err(|_| "Too many rules".to_string())?;
            if rule.id != expected {
                return Err(format!(
                    "Rule ids must be dense and ordered: found id {} at position {position}",
                    rule.id
                ));
            }
        }

        let mut by_kind: BTreeMap<RecordKind, Vec<u32>> = BTreeMap::new();
        for kind in RecordKind::ALL {
            let ids = rules.iter().filter(|r| r.applies_to(*kind)).map(|r| r.id).collect();
            by_kind.insert(*kind, ids);
        }

        Ok(Self { rules, by_kind })
    }

    /// Looks up a rule by id.
    #[must_use]
    pub fn rule(&self, id: u32) -> Option<&ScoreRule> {
        self.rules.get(id as usize)
    }

    /// The explanation payload for a rule id, for the UI.
    #[must_use]
    pub fn explain(&self, id: u32) -> Option<RuleExplanation> {
        self.rule(id).map(|r| RuleExplanation {
            description: r.description,
            error_message: r.error_message,
            bad_field: r.bad_field,
        })
    }

    /// The ids of the rules applicable to a kind, in registration order.
    #[must_use]
    pub fn applicable_to(&self, kind: RecordKind) -> &[u32] {
        self.by_kind.get(&kind).map_or(&[], Vec::as_slice)
    }

    /// Number of registered rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn missing_description(record: &ScoredRecord) -> bool {
    record.record.description().is_none_or(|d| d.trim().is_empty())
}

fn stale_api_version(record: &ScoredRecord) -> bool {
    record.record.api_version().is_some_and(|v| v < MIN_API_VERSION)
}

fn never_referenced(record: &ScoredRecord) -> bool {
    // Only meaningful when a dependency view was attached and resolved.
    record
        .dependencies
        .as_ref()
        .is_some_and(|deps| !deps.had_error && deps.referenced.is_empty())
}

fn low_coverage(record: &ScoredRecord) -> bool {
    let Record::ApexClass(class) = &record.record else { return false };
    !class.is_test && class.coverage.is_some_and(|c| c < MIN_COVERAGE)
}

fn no_active_version(record: &ScoredRecord) -> bool {
    let Record::Flow(flow) = &record.record else { return false };
    !flow.is_active
}

fn permission_set_without_members(record: &ScoredRecord) -> bool {
    let Record::PermissionSet(set) = &record.record else { return false };
    set.member_count == 0
}

fn custom_profile_without_members(record: &ScoredRecord) -> bool {
    let Record::Profile(profile) = &record.record else { return false };
    profile.is_custom && profile.member_count == 0
}

fn builtin_rules() -> Vec<ScoreRule> {
    vec![
        ScoreRule {
            id: 0,
            description: "Component has no description",
            error_message: "Add a description so the next maintainer knows what this is for.",
            bad_field: "description",
            applicable: &[
                RecordKind::ApexClass,
                RecordKind::CustomField,
                RecordKind::Flow,
                RecordKind::PermissionSet,
                RecordKind::Profile,
            ],
            formula: missing_description,
        },
        ScoreRule {
            id: 1,
            description: "API version is stale",
            error_message: "Re-pin this component to a recent API version.",
            bad_field: "apiVersion",
            applicable: &[RecordKind::ApexClass, RecordKind::ApexTrigger, RecordKind::Flow],
            formula: stale_api_version,
        },
        ScoreRule {
            id: 2,
            description: "Component is not referenced anywhere",
            error_message: "Nothing references this component; consider deleting it.",
            bad_field: "dependencies.referenced",
            applicable: &[
                RecordKind::ApexClass,
                RecordKind::CustomField,
                RecordKind::Flow,
                RecordKind::CustomLabel,
            ],
            formula: never_referenced,
        },
        ScoreRule {
            id: 3,
            description: "Test coverage is below 75%",
            error_message: "Raise line coverage to at least 75% before shipping changes.",
            bad_field: "coverage",
            applicable: &[RecordKind::ApexClass],
            formula: low_coverage,
        },
        ScoreRule {
            id: 4,
            description: "Flow has no active version",
            error_message: "Activate a version or delete the flow.",
            bad_field: "isActive",
            applicable: &[RecordKind::Flow],
            formula: no_active_version,
        },
        ScoreRule {
            id: 5,
            description: "Permission set has no members",
            error_message: "No user is assigned this permission set; consider removing it.",
            bad_field: "memberCount",
            applicable: &[RecordKind::PermissionSet],
            formula: permission_set_without_members,
        },
        ScoreRule {
            id: 6,
            description: "Custom profile has no members",
            error_message: "No user is assigned this custom profile; consider removing it.",
            bad_field: "memberCount",
            applicable: &[RecordKind::Profile],
            formula: custom_profile_without_members,
        },
    ]
}

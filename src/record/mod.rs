//! Typed metadata records.
//!
//! Each component type is an explicit struct with a fixed field list; a raw
//! row is converted by deserializing only the declared fields (serde ignores
//! anything else), so the schema is sealed by the type system — no attribute
//! outside the declaration can ever appear on a record.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::graph::DependencyView;

/// The component types the engine understands.
///
/// Rules and datasets dispatch on this discriminant; the factory builds its
/// per-kind lookup table over [`RecordKind::ALL`] once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    /// An Apex class (code unit, possibly a test class).
    ApexClass,
    /// An Apex trigger attached to an object.
    ApexTrigger,
    /// A custom field on an object.
    CustomField,
    /// An automation flow.
    Flow,
    /// A translatable custom label.
    CustomLabel,
    /// A permission set.
    PermissionSet,
    /// A user profile.
    Profile,
    /// An object definition (standard or custom).
    ObjectDef,
}

impl RecordKind {
    /// Every known record kind, in declaration order.
    pub const ALL: &'static [RecordKind] = &[
        RecordKind::ApexClass,
        RecordKind::ApexTrigger,
        RecordKind::CustomField,
        RecordKind::Flow,
        RecordKind::CustomLabel,
        RecordKind::PermissionSet,
        RecordKind::Profile,
        RecordKind::ObjectDef,
    ];

    /// The platform type name for this kind, as it appears in edge data.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            RecordKind::ApexClass => "ApexClass",
            RecordKind::ApexTrigger => "ApexTrigger",
            RecordKind::CustomField => "CustomField",
            RecordKind::Flow => "Flow",
            RecordKind::CustomLabel => "CustomLabel",
            RecordKind::PermissionSet => "PermissionSet",
            RecordKind::Profile => "Profile",
            RecordKind::ObjectDef => "ObjectDef",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An Apex class.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApexClass {
    /// Component id.
    pub id: String,
    /// Class name.
    pub name: String,
    /// Link to the class in the platform UI.
    pub url: String,
    /// API version the class is pinned to.
    pub api_version: Option<f64>,
    /// Whether this is a test class.
    pub is_test: bool,
    /// Source length in characters.
    pub length: u64,
    /// Line coverage ratio (0.0–1.0), aggregated from coverage rows.
    pub coverage: Option<f64>,
    /// Developer-provided description.
    pub description: Option<String>,
}

/// An Apex trigger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApexTrigger {
    /// Component id.
    pub id: String,
    /// Trigger name.
    pub name: String,
    /// Link to the trigger in the platform UI.
    pub url: String,
    /// API version the trigger is pinned to.
    pub api_version: Option<f64>,
    /// Id of the object the trigger fires on.
    pub object_id: String,
    /// Whether the trigger is active.
    pub is_active: bool,
    /// Source length in characters.
    pub length: u64,
}

/// A custom field on an object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomField {
    /// Component id.
    pub id: String,
    /// Field developer name.
    pub name: String,
    /// Link to the field in the platform UI.
    pub url: String,
    /// Id of the owning object.
    pub object_id: String,
    /// Label of the owning object. Left empty at fetch time; recipes fill it
    /// in when they cross-link fields with the objects dataset.
    pub object_label: Option<String>,
    /// Field data type.
    pub field_type: Option<String>,
    /// Developer-provided description.
    pub description: Option<String>,
}

/// An automation flow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Flow {
    /// Component id.
    pub id: String,
    /// Flow developer name.
    pub name: String,
    /// Link to the flow in the platform UI.
    pub url: String,
    /// API version of the latest flow version.
    pub api_version: Option<f64>,
    /// Whether any version of the flow is active.
    pub is_active: bool,
    /// Number of versions saved for this flow.
    pub version_count: u64,
    /// Developer-provided description.
    pub description: Option<String>,
}

/// A custom label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomLabel {
    /// Component id.
    pub id: String,
    /// Label developer name.
    pub name: String,
    /// Link to the label in the platform UI.
    pub url: String,
    /// Label category.
    pub category: Option<String>,
    /// Label text value.
    pub value: Option<String>,
    /// Label language code.
    pub language: Option<String>,
}

/// A permission set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PermissionSet {
    /// Component id.
    pub id: String,
    /// Permission set name.
    pub name: String,
    /// Link to the permission set in the platform UI.
    pub url: String,
    /// Developer-provided description.
    pub description: Option<String>,
    /// Whether the permission set is custom (as opposed to managed/standard).
    pub is_custom: bool,
    /// Number of users assigned to the permission set.
    pub member_count: u64,
}

/// A user profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    /// Component id.
    pub id: String,
    /// Profile name.
    pub name: String,
    /// Link to the profile in the platform UI.
    pub url: String,
    /// Developer-provided description.
    pub description: Option<String>,
    /// Whether the profile is custom.
    pub is_custom: bool,
    /// Number of users assigned to the profile.
    pub member_count: u64,
}

/// An object definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectDef {
    /// Component id.
    pub id: String,
    /// Object developer name.
    pub name: String,
    /// Link to the object in the platform UI.
    pub url: String,
    /// Object label shown to end users.
    pub label: Option<String>,
    /// Whether the object is custom.
    pub is_custom: bool,
    /// Developer-provided description.
    pub description: Option<String>,
}

/// A typed record, one variant per [`RecordKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "attributes")]
pub enum Record {
    /// See [`ApexClass`].
    ApexClass(ApexClass),
    /// See [`ApexTrigger`].
    ApexTrigger(ApexTrigger),
    /// See [`CustomField`].
    CustomField(CustomField),
    /// See [`Flow`].
    Flow(Flow),
    /// See [`CustomLabel`].
    CustomLabel(CustomLabel),
    /// See [`PermissionSet`].
    PermissionSet(PermissionSet),
    /// See [`Profile`].
    Profile(Profile),
    /// See [`ObjectDef`].
    ObjectDef(ObjectDef),
}

impl Record {
    /// Builds a record of the given kind from a raw JSON row.
    ///
    /// Only declared fields are copied; extra row properties are silently
    /// dropped, missing ones take their default value.
    ///
    /// # Errors
    ///
    /// Returns an error if a declared field is present with the wrong JSON
    /// type.
    pub fn from_row(kind: RecordKind, row: &serde_json::Value) -> Result<Self, String> {
        let convert = |e: serde_json::Error| format!("Failed to convert {kind} row: {e}");
        Ok(match kind {
            RecordKind::ApexClass => {
                Record::ApexClass(serde_json::from_value(row.clone()).map_err(convert)?)
            }
            RecordKind::ApexTrigger => {
                Record::ApexTrigger(serde_json::from_value(row.clone()).map_err(convert)?)
            }
            RecordKind::CustomField => {
                Record::CustomField(serde_json::from_value(row.clone()).map_err(convert)?)
            }
            RecordKind::Flow => {
                Record::Flow(serde_json::from_value(row.clone()).map_err(convert)?)
            }
            RecordKind::CustomLabel => {
                Record::CustomLabel(serde_json::from_value(row.clone()).map_err(convert)?)
            }
            RecordKind::PermissionSet => {
                Record::PermissionSet(serde_json::from_value(row.clone()).map_err(convert)?)
            }
            RecordKind::Profile => {
                Record::Profile(serde_json::from_value(row.clone()).map_err(convert)?)
            }
            RecordKind::ObjectDef => {
                Record::ObjectDef(serde_json::from_value(row.clone()).map_err(convert)?)
            }
        })
    }

    /// The kind of this record.
    #[must_use]
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::ApexClass(_) => RecordKind::ApexClass,
            Record::ApexTrigger(_) => RecordKind::ApexTrigger,
            Record::CustomField(_) => RecordKind::CustomField,
            Record::Flow(_) => RecordKind::Flow,
            Record::CustomLabel(_) => RecordKind::CustomLabel,
            Record::PermissionSet(_) => RecordKind::PermissionSet,
            Record::Profile(_) => RecordKind::Profile,
            Record::ObjectDef(_) => RecordKind::ObjectDef,
        }
    }

    /// The component id.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Record::ApexClass(r) => &r.id,
            Record::ApexTrigger(r) => &r.id,
            Record::CustomField(r) => &r.id,
            Record::Flow(r) => &r.id,
            Record::CustomLabel(r) => &r.id,
            Record::PermissionSet(r) => &r.id,
            Record::Profile(r) => &r.id,
            Record::ObjectDef(r) => &r.id,
        }
    }

    /// The component name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Record::ApexClass(r) => &r.name,
            Record::ApexTrigger(r) => &r.name,
            Record::CustomField(r) => &r.name,
            Record::Flow(r) => &r.name,
            Record::CustomLabel(r) => &r.name,
            Record::PermissionSet(r) => &r.name,
            Record::Profile(r) => &r.name,
            Record::ObjectDef(r) => &r.name,
        }
    }

    /// The developer-provided description, for kinds that declare one.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        match self {
            Record::ApexClass(r) => r.description.as_deref(),
            Record::CustomField(r) => r.description.as_deref(),
            Record::Flow(r) => r.description.as_deref(),
            Record::PermissionSet(r) => r.description.as_deref(),
            Record::Profile(r) => r.description.as_deref(),
            Record::ObjectDef(r) => r.description.as_deref(),
            Record::ApexTrigger(_) | Record::CustomLabel(_) => None,
        }
    }

    /// The pinned API version, for kinds that declare one.
    #[must_use]
    pub fn api_version(&self) -> Option<f64> {
        match self {
            Record::ApexClass(r) => r.api_version,
            Record::ApexTrigger(r) => r.api_version,
            Record::Flow(r) => r.api_version,
            _ => None,
        }
    }
}

/// Scoring state attached to a record by a single scoring pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scoring {
    /// Number of rules the record violates.
    pub score: u32,
    /// Attribute paths flagged by violated rules, in registration order.
    pub bad_fields: Vec<String>,
    /// Ids of violated rules, parallel to `bad_fields`.
    pub bad_reason_ids: Vec<u32>,
}

/// A record plus its scoring state and dependency view.
///
/// `scoring` is `Some` exactly when at least one rule applies to the record's
/// kind; `dependencies` is `Some` exactly when the kind is dependency-aware
/// and the factory was handed an edge list. Both are set at construction and
/// not touched again, apart from the one scoring pass that follows `create`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredRecord {
    /// The sealed typed record.
    #[serde(flatten)]
    pub record: Record,
    /// Scoring state, absent for kinds with no applicable rules.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scoring: Option<Scoring>,
    /// Dependency view, absent for non-dependency-aware kinds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<DependencyView>,
}

impl ScoredRecord {
    /// The record's score, zero when no rule applies.
    #[must_use]
    pub fn score(&self) -> u32 {
        self.scoring.as_ref().map_or(0, |s| s.score)
    }
}

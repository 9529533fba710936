//! Dependency index — per-component views over a flat edge list.
//!
//! The platform's dependency API returns a flat list of directed edges
//! ("component A references component B"). [`DependencyIndex::build`] derives
//! the per-component view the UI needs: what a component uses, what uses it,
//! and incoming-reference counts grouped by component type.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// A directed reference between two components.
///
/// Reads as "component `id` (of `kind`) references component `ref_id`
/// (of `ref_kind`)". Edges are produced by the transport and consumed
/// read-only; de-duplication is the producer's responsibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    /// Id of the referencing component.
    pub id: String,
    /// Name of the referencing component.
    pub name: String,
    /// Type of the referencing component (e.g. `"ApexClass"`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Link to the referencing component in the platform UI.
    pub url: String,
    /// Id of the referenced component.
    pub ref_id: String,
    /// Name of the referenced component.
    pub ref_name: String,
    /// Type of the referenced component.
    #[serde(rename = "refType")]
    pub ref_kind: String,
    /// Link to the referenced component in the platform UI.
    pub ref_url: String,
}

/// One endpoint of an edge, as exposed in a [`DependencyView`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefSummary {
    /// Component id.
    pub id: String,
    /// Component name.
    pub name: String,
    /// Component type.
    #[serde(rename = "type")]
    pub kind: String,
    /// Link to the component in the platform UI.
    pub url: String,
}

/// Per-component dependency summary derived from the full edge list.
///
/// A view is a value object: computed fresh per focal id, never mutated
/// afterwards. When `had_error` is set the view carries no using/referenced
/// data and callers must not interpret the empty collections as "isolated".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyView {
    /// Set when the focal id is registered as erroneous upstream; the rest
    /// of the view is empty and meaningless in that case.
    pub had_error: bool,
    /// Components the focal component references, in edge-list order.
    pub using: Vec<RefSummary>,
    /// Components referencing the focal component, in edge-list order.
    pub referenced: Vec<RefSummary>,
    /// Count of `referenced` entries per component type. A type absent from
    /// the map has a count of zero; zero-count keys are never inserted.
    pub referenced_by_type: BTreeMap<String, usize>,
}

impl DependencyView {
    fn errored() -> Self {
        Self { had_error: true, ..Self::default() }
    }
}

/// Builds [`DependencyView`]s from a flat edge list.
///
/// Each `build` call is two stable passes over the full list, so a view costs
/// O(E). Building a view for every record of a dataset is O(N·E); that is
/// acceptable only because the transport caps the edge list per batch.
#[derive(Debug, Clone, Default)]
pub struct DependencyIndex {
    error_ids: BTreeSet<String>,
}

impl DependencyIndex {
    /// Creates an index with no registered error ids.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an index that short-circuits the given ids.
    ///
    /// The platform occasionally reports component ids whose dependency data
    /// is known to be unreadable; views for those ids carry only the error
    /// flag so the UI can render "unknown" instead of crashing.
    #[must_use]
    pub fn with_error_ids(error_ids: BTreeSet<String>) -> Self {
        Self { error_ids }
    }

    /// Derives the dependency view for `focal_id` from `edges`.
    ///
    /// The error-id check runs before any iteration. A focal id absent from
    /// the edge list yields an empty view, not an error. Matching edges keep
    /// their relative input order in `using` and `referenced`.
    #[must_use]
    pub fn build(&self, edges: &[Edge], focal_id: &str) -> DependencyView {
        if self.error_ids.contains(focal_id) {
            return DependencyView::errored();
        }

        let using = edges
            .iter()
            .filter(|e| e.id == focal_id)
            .map(|e| RefSummary {
                id: e.ref_id.clone(),
                name: e.ref_name.clone(),
                kind: e.ref_kind.clone(),
                url: e.ref_url.clone(),
            })
            .collect();

        let mut referenced = Vec::new();
        let mut referenced_by_type = BTreeMap::new();
        for e in edges.iter().filter(|e| e.ref_id == focal_id) {
            referenced.push(RefSummary {
                id: e.id.clone(),
                name: e.name.clone(),
                kind: e.kind.clone(),
                url: e.url.clone(),
            });
            *referenced_by_type.entry(e.kind.clone()).or_insert(0) += 1;
        }

        DependencyView { had_error: false, using, referenced, referenced_by_type }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    /// A class that uses two components and is used by two others.
    fn mixed_reference_edges() -> Vec<Edge> {
        vec![
            edge("ApexClass-001", "ApexClass", "ApexClass-002", "ApexClass"),
            edge("ApexClass-001", "ApexClass", "CustomField-001", "CustomField"),
            edge("ApexClass-003", "ApexClass", "ApexClass-001", "ApexClass"),
            edge("CustomField-002", "CustomField", "ApexClass-001", "ApexClass"),
        ]
    }

    /// A field used by four layouts and one class, using nothing itself.
    fn layout_heavy_edges() -> Vec<Edge> {
        vec![
            edge("Layout-001", "Layout", "CustomField-001", "CustomField"),
            edge("Layout-002", "Layout", "CustomField-001", "CustomField"),
            edge("Layout-003", "Layout", "CustomField-001", "CustomField"),
            edge("Layout-004", "Layout", "CustomField-001", "CustomField"),
            edge("ApexClass-001", "ApexClass", "CustomField-001", "CustomField"),
        ]
    }

    #[test]
    fn class_with_mixed_references() {
        let index = DependencyIndex::new();
        let view = index.build(&mixed_reference_edges(), "ApexClass-001");

        assert!(!view.had_error);
        assert_eq!(view.using.len(), 2);
        assert_eq!(view.referenced.len(), 2);
        assert_eq!(view.referenced_by_type.get("ApexClass"), Some(&1));
        assert_eq!(view.referenced_by_type.get("CustomField"), Some(&1));
        assert_eq!(view.referenced_by_type.len(), 2);
    }

    #[test]
    fn field_referenced_by_layouts_and_class() {
        let index = DependencyIndex::new();
        let view = index.build(&layout_heavy_edges(), "CustomField-001");

        assert_eq!(view.using.len(), 0);
        assert_eq!(view.referenced.len(), 5);
        assert_eq!(view.referenced_by_type.get("Layout"), Some(&4));
        assert_eq!(view.referenced_by_type.get("ApexClass"), Some(&1));
    }

    #[test]
    fn focal_id_absent_from_edges_yields_empty_view() {
        let index = DependencyIndex::new();
        let view = index.build(&mixed_reference_edges(), "Flow-999");

        assert!(!view.had_error);
        assert!(view.using.is_empty());
        assert!(view.referenced.is_empty());
        assert!(view.referenced_by_type.is_empty());
    }

    #[test]
    fn empty_edge_list_yields_empty_view() {
        let index = DependencyIndex::new();
        let view = index.build(&[], "ApexClass-001");

        assert!(view.using.is_empty());
        assert!(view.referenced.is_empty());
    }

    #[test]
    fn type_counts_sum_to_referenced_length() {
        let index = DependencyIndex::new();
        for focal in ["ApexClass-001", "CustomField-001", "ApexClass-002"] {
            let view = index.build(&mixed_reference_edges(), focal);
            let total: usize = view.referenced_by_type.values().sum();
            assert_eq!(total, view.referenced.len(), "focal {focal}");
        }
    }

    #[test]
    fn zero_count_types_are_absent_not_zero() {
        let index = DependencyIndex::new();
        let view = index.build(&layout_heavy_edges(), "CustomField-001");

        assert!(!view.referenced_by_type.contains_key("Flow"));
        assert!(!view.referenced_by_type.contains_key("CustomField"));
    }

    #[test]
    fn input_order_is_preserved() {
        let index = DependencyIndex::new();
        let view = index.build(&layout_heavy_edges(), "CustomField-001");

        let ids: Vec<&str> = view.referenced.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["Layout-001", "Layout-002", "Layout-003", "Layout-004", "ApexClass-001"]
        );
    }

    #[test]
    fn error_id_short_circuits_before_partition() {
        let error_ids: BTreeSet<String> = ["ApexClass-001".to_string()].into_iter().collect();
        let index = DependencyIndex::with_error_ids(error_ids);
        let view = index.build(&mixed_reference_edges(), "ApexClass-001");

        assert!(view.had_error);
        assert!(view.using.is_empty());
        assert!(view.referenced.is_empty());
        assert!(view.referenced_by_type.is_empty());
    }

    #[test]
    fn non_error_ids_are_unaffected_by_the_error_set() {
        let error_ids: BTreeSet<String> = ["ApexClass-001".to_string()].into_iter().collect();
        let index = DependencyIndex::with_error_ids(error_ids);
        let view = index.build(&mixed_reference_edges(), "ApexClass-003");

        assert!(!view.had_error);
        assert_eq!(view.using.len(), 1);
    }

    #[test]
    fn self_loop_appears_on_both_sides() {
        let edges = vec![edge("ApexClass-001", "ApexClass", "ApexClass-001", "ApexClass")];
        let index = DependencyIndex::new();
        let view = index.build(&edges, "ApexClass-001");

        assert_eq!(view.using.len(), 1);
        assert_eq!(view.referenced.len(), 1);
        assert_eq!(view.referenced_by_type.get("ApexClass"), Some(&1));
    }

    #[test]
    fn edge_round_trips_through_wire_shape() {
        let e = edge("ApexClass-001", "ApexClass", "CustomField-001", "CustomField");
        let json = serde_json::to_value(&e).unwrap();

        assert_eq!(json["type"], "ApexClass");
        assert_eq!(json["refType"], "CustomField");
        assert_eq!(json["refId"], "CustomField-001");

        let back: Edge = serde_json::from_value(json).unwrap();
        assert_eq!(back, e);
    }
}

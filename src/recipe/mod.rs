//! Recipe manager — composes datasets into UI-ready results.
//!
//! A recipe declares the datasets it needs (`extract`) and how to fold the
//! resolved values into one output shape (`transform`): a record list, a
//! single record, a tree, or a matrix. Cross-linking between datasets
//! happens only inside transform, on cloned records — the cached dataset
//! values are never touched.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::context::ServiceContext;
use crate::dataset::{DatasetKey, DatasetManager, ResolvedDatasets};
use crate::record::{Record, ScoredRecord};
use crate::score::RecordFactory;

/// The recipes the engine can serve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipeKey {
    /// All Apex classes, scored and dependency-annotated.
    ApexClasses,
    /// All custom fields, cross-linked with their owning object's label.
    CustomFields,
    /// All custom labels.
    CustomLabels,
    /// All flows.
    Flows,
    /// All permission sets.
    PermissionSets,
    /// All profiles.
    Profiles,
    /// One object with its fields and triggers, as a tree.
    ObjectExplorer(String),
    /// Permission parents × objects, as a matrix.
    PermissionMatrix,
}

impl RecipeKey {
    /// Parses a CLI recipe name, with the optional `--object` parameter.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown names, or for `object-explorer` without
    /// an object parameter.
    pub fn parse(name: &str, object: Option<&str>) -> Result<Self, String> {
        match name {
            "apex-classes" => Ok(RecipeKey::ApexClasses),
            "custom-fields" => Ok(RecipeKey::CustomFields),
            "custom-labels" => Ok(RecipeKey::CustomLabels),
            "flows" => Ok(RecipeKey::Flows),
            "permission-sets" => Ok(RecipeKey::PermissionSets),
            "profiles" => Ok(RecipeKey::Profiles),
            "object-explorer" => object
                .map(|o| RecipeKey::ObjectExplorer(o.to_string()))
                .ok_or_else(|| "Recipe object-explorer requires --object".to_string()),
            "permission-matrix" => Ok(RecipeKey::PermissionMatrix),
            other => Err(format!(
                "Unknown recipe {other}; expected one of apex-classes, custom-fields, \
                 custom-labels, flows, permission-sets, profiles, object-explorer, \
                 permission-matrix"
            )),
        }
    }

    /// The datasets this recipe needs resolved before transform.
    #[must_use]
    pub fn extract(&self) -> Vec<DatasetKey> {
        match self {
            RecipeKey::ApexClasses => vec![DatasetKey::ApexClasses],
            RecipeKey::CustomFields => vec![DatasetKey::CustomFields, DatasetKey::Objects],
            RecipeKey::CustomLabels => vec![DatasetKey::CustomLabels],
            RecipeKey::Flows => vec![DatasetKey::Flows],
            RecipeKey::PermissionSets => vec![DatasetKey::PermissionSets],
            RecipeKey::Profiles => vec![DatasetKey::Profiles],
            RecipeKey::ObjectExplorer(object) => vec![
                DatasetKey::ObjectDescribe(object.clone()),
                DatasetKey::CustomFields,
                DatasetKey::ApexTriggers,
            ],
            RecipeKey::PermissionMatrix => vec![
                DatasetKey::PermissionSets,
                DatasetKey::Profiles,
                DatasetKey::ObjectPermissions,
            ],
        }
    }
}

/// A node of a hierarchy result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    /// Node id, unique within the tree.
    pub id: String,
    /// The record at this node, if any (group nodes carry none).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<ScoredRecord>,
    /// Child nodes.
    pub children: Vec<TreeNode>,
}

/// A cross-tabulation of two dimensions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Matrix {
    /// Row header ids, in row order.
    pub row_header_ids: Vec<String>,
    /// Column header ids, in column order.
    pub column_header_ids: Vec<String>,
    /// Records backing the row headers, keyed by id.
    pub row_header_references: BTreeMap<String, ScoredRecord>,
    /// Records backing the column headers, keyed by id (empty when the
    /// columns are plain names).
    pub column_header_references: BTreeMap<String, ScoredRecord>,
    /// Cell values, one row per row header, one cell per column header.
    pub rows: Vec<Vec<String>>,
}

/// The output of one recipe run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RecipeResult {
    /// A list of records.
    Records(Vec<ScoredRecord>),
    /// A single record.
    Record(Box<ScoredRecord>),
    /// A hierarchy.
    Tree(TreeNode),
    /// A cross-tabulation.
    Matrix(Matrix),
}

/// Runs recipes over a dataset manager.
pub struct RecipeManager<'a> {
    datasets: DatasetManager<'a>,
}

impl<'a> RecipeManager<'a> {
    /// Creates a manager over the given context, with the builtin rule set.
    ///
    /// # Errors
    ///
    /// Returns an error if the builtin rule table fails its density check.
    pub fn new(ctx: &'a ServiceContext) -> Result<Self, String> {
        Ok(Self { datasets: DatasetManager::new(ctx, RecordFactory::with_builtin_rules()?) })
    }

    /// Creates a manager over an explicit dataset manager.
    #[must_use]
    pub fn with_datasets(datasets: DatasetManager<'a>) -> Self {
        Self { datasets }
    }

    /// The dataset manager backing this recipe manager.
    #[must_use]
    pub fn datasets(&self) -> &DatasetManager<'a> {
        &self.datasets
    }

    /// Runs a recipe: resolve every declared dataset, then transform.
    ///
    /// Dataset fetches run concurrently; the transform starts only after all
    /// of them settled, and fails if any of them failed.
    ///
    /// # Errors
    ///
    /// Returns an error if a dataset fetch or the transform fails.
    pub async fn run(&self, recipe: &RecipeKey) -> Result<RecipeResult, String> {
        let resolved = self.datasets.run(&recipe.extract()).await?;
        transform(recipe, &resolved)
    }

    /// Invalidates the cache entries of the recipe's declared datasets so
    /// the next run refetches them.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache store cannot be modified.
    pub async fn clean(&self, recipe: &RecipeKey) -> Result<(), String> {
        for key in recipe.extract() {
            self.datasets.invalidate(&key).await?;
        }
        Ok(())
    }
}

fn transform(recipe: &RecipeKey, resolved: &ResolvedDatasets) -> Result<RecipeResult, String> {
    match recipe {
        RecipeKey::ApexClasses => record_list(resolved, &DatasetKey::ApexClasses),
        RecipeKey::CustomLabels => record_list(resolved, &DatasetKey::CustomLabels),
        RecipeKey::Flows => record_list(resolved, &DatasetKey::Flows),
        RecipeKey::PermissionSets => record_list(resolved, &DatasetKey::PermissionSets),
        RecipeKey::Profiles => record_list(resolved, &DatasetKey::Profiles),
        RecipeKey::CustomFields => custom_fields(resolved),
        RecipeKey::ObjectExplorer(object) => object_explorer(resolved, object),
        RecipeKey::PermissionMatrix => permission_matrix(resolved),
    }
}

fn record_list(resolved: &ResolvedDatasets, key: &DatasetKey) -> Result<RecipeResult, String> {
    let alias = key.cache_key();
    let records = resolved.get(key)?.records(&alias)?;
    let mut list: Vec<ScoredRecord> = records.values().cloned().collect();
    list.sort_by(|a, b| a.record.name().cmp(b.record.name()));
    Ok(RecipeResult::Records(list))
}

/// Fields cross-linked with their owning object's label.
fn custom_fields(resolved: &ResolvedDatasets) -> Result<RecipeResult, String> {
    let fields = resolved.get(&DatasetKey::CustomFields)?.records("custom-fields")?;
    let objects = resolved.get(&DatasetKey::Objects)?.records("objects")?;

    let mut list = Vec::with_capacity(fields.len());
    for field in fields.values() {
        let mut field = field.clone();
        if let Record::CustomField(attrs) = &mut field.record {
            let label = objects.get(&attrs.object_id).map(|object| {
                match &object.record {
                    Record::ObjectDef(def) => {
                        def.label.clone().unwrap_or_else(|| def.name.clone())
                    }
                    _ => object.record.name().to_string(),
                }
            });
            attrs.object_label = label;
        }
        list.push(field);
    }
    list.sort_by(|a, b| a.record.name().cmp(b.record.name()));
    Ok(RecipeResult::Records(list))
}

/// One object with its fields and triggers as a two-level tree.
fn object_explorer(resolved: &ResolvedDatasets, object: &str) -> Result<RecipeResult, String> {
    let describe_key = DatasetKey::ObjectDescribe(object.to_string());
    let describe = resolved.get(&describe_key)?.records(&describe_key.cache_key())?;
    let object_record = describe
        .values()
        .next()
        .ok_or_else(|| format!("Object {object} not found"))?;
    let object_id = object_record.record.id().to_string();

    let fields = resolved.get(&DatasetKey::CustomFields)?.records("custom-fields")?;
    let field_nodes: Vec<TreeNode> = fields
        .values()
        .filter(|f| matches!(&f.record, Record::CustomField(attrs) if attrs.object_id == object_id))
        .map(|f| TreeNode {
            id: f.record.id().to_string(),
            record: Some(f.clone()),
            children: Vec::new(),
        })
        .collect();

    let triggers = resolved.get(&DatasetKey::ApexTriggers)?.records("apex-triggers")?;
    let trigger_nodes: Vec<TreeNode> = triggers
        .values()
        .filter(|t| matches!(&t.record, Record::ApexTrigger(attrs) if attrs.object_id == object_id))
        .map(|t| TreeNode {
            id: t.record.id().to_string(),
            record: Some(t.clone()),
            children: Vec::new(),
        })
        .collect();

    Ok(RecipeResult::Tree(TreeNode {
        id: object_id.clone(),
        record: Some(object_record.clone()),
        children: vec![
            TreeNode { id: format!("{object_id}/fields"), record: None, children: field_nodes },
            TreeNode {
                id: format!("{object_id}/triggers"),
                record: None,
                children: trigger_nodes,
            },
        ],
    }))
}

/// Permission parents (sets and profiles) × objects.
fn permission_matrix(resolved: &ResolvedDatasets) -> Result<RecipeResult, String> {
    let sets = resolved.get(&DatasetKey::PermissionSets)?.records("permission-sets")?;
    let profiles = resolved.get(&DatasetKey::Profiles)?.records("profiles")?;
    let grants = resolved.get(&DatasetKey::ObjectPermissions)?.table("object-permissions")?;

    let mut row_header_references: BTreeMap<String, ScoredRecord> = BTreeMap::new();
    for record in sets.values().chain(profiles.values()) {
        row_header_references.insert(record.record.id().to_string(), record.clone());
    }
    let row_header_ids: Vec<String> = row_header_references.keys().cloned().collect();

    let mut column_header_ids: Vec<String> = grants
        .iter()
        .filter_map(|row| row.get("object").and_then(Value::as_str))
        .map(String::from)
        .collect();
    column_header_ids.sort();
    column_header_ids.dedup();

    // (parent, object) -> permission string.
    let mut cells: BTreeMap<(String, String), String> = BTreeMap::new();
    for row in grants {
        let (Some(parent), Some(object)) = (
            row.get("parentId").and_then(Value::as_str),
            row.get("object").and_then(Value::as_str),
        ) else {
            continue;
        };
        let permissions =
            row.get("permissions").and_then(Value::as_str).unwrap_or_default();
        cells.insert((parent.to_string(), object.to_string()), permissions.to_string());
    }

    let rows = row_header_ids
        .iter()
        .map(|parent| {
            column_header_ids
                .iter()
                .map(|object| {
                    cells.get(&(parent.clone(), object.clone())).cloned().unwrap_or_default()
                })
                .collect()
        })
        .collect();

    Ok(RecipeResult::Matrix(Matrix {
        row_header_ids,
        column_header_ids,
        row_header_references,
        column_header_references: BTreeMap::new(),
        rows,
    }))
}

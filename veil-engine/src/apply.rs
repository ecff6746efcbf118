//! SQL builders over the resolver.
//!
//! Nothing here executes. The builders return statement text and the
//! embedder runs it against the host database, so every generated
//! fragment must be safe to splice: column names are quoted and rule
//! expressions have already been vetted by the grammar.

use tracing::{debug, warn};
use veil_core::{AttributeNumber, MaskingConfig, RelationDescriptor, RelationId};
use veil_store::{AnnotationStore, Catalog};

use crate::resolver;
use crate::sampling;
use crate::sql;

fn qualified_name(relation: &RelationDescriptor) -> String {
    sql::quoted_qualified_name(&relation.namespace, &relation.name)
}

/// Projection list over every live column, plus whether any of them is
/// masked.
fn projection<S>(
    store: &S,
    config: &MaskingConfig,
    relation: &RelationDescriptor,
    policy: &str,
) -> (String, bool)
where
    S: AnnotationStore + ?Sized,
{
    let mut expressions = Vec::new();
    let mut masked = false;
    for (decision, quoted) in resolver::decisions_for_relation(store, config, relation, policy) {
        if decision.is_masked() {
            masked = true;
        }
        expressions.push(format!("{} AS {}", decision.projection_expr(&quoted), quoted));
    }
    (expressions.join(", "), masked)
}

/// Assignments for every masked live column, or `None` when the table
/// carries no masking rule.
fn assignments<S>(
    store: &S,
    config: &MaskingConfig,
    relation: &RelationDescriptor,
    policy: &str,
) -> Option<String>
where
    S: AnnotationStore + ?Sized,
{
    let mut parts = Vec::new();
    for column in relation.active_columns() {
        let decision = resolver::decision_for_column(store, config, column, policy);
        if let Some(value) = decision.filter_value() {
            parts.push(format!("{} = {}", sql::double_quote(&column.name), value));
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join(", "))
}

/// `<expr> AS <quoted_column>` for every live column, comma-joined in
/// physical order. `None` for an unknown relation.
pub fn masking_expressions_for_table<S, C>(
    store: &S,
    catalog: &C,
    config: &MaskingConfig,
    relation_id: RelationId,
    policy: &str,
) -> Option<String>
where
    S: AnnotationStore + ?Sized,
    C: Catalog + ?Sized,
{
    let relation = catalog.describe_relation(relation_id)?;
    Some(projection(store, config, &relation, policy).0)
}

/// One column's substitution text at a 1-based ordinal. `None` when the
/// ordinal is out of range or the column is dropped.
pub fn masking_value_for_column<S, C>(
    store: &S,
    catalog: &C,
    config: &MaskingConfig,
    relation_id: RelationId,
    ordinal: AttributeNumber,
    policy: &str,
) -> Option<String>
where
    S: AnnotationStore + ?Sized,
    C: Catalog + ?Sized,
{
    let relation = catalog.describe_relation(relation_id)?;
    let column = relation.column_at(ordinal)?;
    if column.is_dropped {
        return None;
    }
    let decision = resolver::decision_for_column(store, config, column, policy);
    Some(decision.projection_expr(&sql::quote_identifier(&column.name)))
}

/// `"<column>" = <expr>` for one masked column. `None` when the column
/// is absent, dropped, or not masked.
pub fn column_assignment<S, C>(
    store: &S,
    catalog: &C,
    config: &MaskingConfig,
    relation_id: RelationId,
    column_name: &str,
    policy: &str,
) -> Option<String>
where
    S: AnnotationStore + ?Sized,
    C: Catalog + ?Sized,
{
    let relation = catalog.describe_relation(relation_id)?;
    if sampling::sampling_ratio(store, catalog, relation_id, policy).is_some() {
        warn!(
            table = %relation.name,
            "sampling rules apply to whole tables only, the TABLESAMPLE rule is ignored"
        );
    }
    let column = relation
        .columns
        .iter()
        .find(|c| !c.is_dropped && c.name == column_name)?;
    let decision = resolver::decision_for_column(store, config, column, policy);
    let value = decision.filter_value()?;
    Some(format!("{} = {}", sql::double_quote(&column.name), value))
}

/// Comma-joined assignments for every masked live column.
pub fn table_assignments<S, C>(
    store: &S,
    catalog: &C,
    config: &MaskingConfig,
    relation_id: RelationId,
    policy: &str,
) -> Option<String>
where
    S: AnnotationStore + ?Sized,
    C: Catalog + ?Sized,
{
    let relation = catalog.describe_relation(relation_id)?;
    assignments(store, config, &relation, policy)
}

/// `SELECT <projection> FROM <table>;` replacing the authentic relation.
/// `None` when no column is masked.
pub fn subquery<S, C>(
    store: &S,
    catalog: &C,
    config: &MaskingConfig,
    relation_id: RelationId,
    policy: &str,
) -> Option<String>
where
    S: AnnotationStore + ?Sized,
    C: Catalog + ?Sized,
{
    let relation = catalog.describe_relation(relation_id)?;
    let (projection, masked) = projection(store, config, &relation, policy);
    if !masked {
        return None;
    }
    Some(format!(
        "SELECT {} FROM {};",
        projection,
        qualified_name(&relation)
    ))
}

/// One statement that anonymizes the table in place.
///
/// A sampling rule cannot be expressed as an UPDATE, so its presence
/// turns the statement into a create-truncate-insert-drop rewrite of the
/// whole table. This will likely fail on tables referenced by foreign
/// keys; the embedder decides whether to defer constraints first.
pub fn update_statement<S, C>(
    store: &S,
    catalog: &C,
    config: &MaskingConfig,
    relation_id: RelationId,
    policy: &str,
) -> Option<String>
where
    S: AnnotationStore + ?Sized,
    C: Catalog + ?Sized,
{
    let relation = catalog.describe_relation(relation_id)?;
    let table = qualified_name(&relation);

    if let Some(ratio) = sampling::sampling_ratio(store, catalog, relation_id, policy) {
        let (projection, masked) = projection(store, config, &relation, policy);
        if !masked {
            return None;
        }
        let swap = format!("veil_swap_{relation_id}");
        debug!(table = %table, ratio = %ratio, "sampling rule present, rewriting the whole table");
        return Some(format!(
            "CREATE TEMPORARY TABLE {swap} AS SELECT {projection} FROM {table} TABLESAMPLE {ratio};\n\
             TRUNCATE TABLE {table};\n\
             INSERT INTO {table} SELECT * FROM {swap};\n\
             DROP TABLE {swap};"
        ));
    }

    let assignments = assignments(store, config, &relation, policy)?;
    Some(format!("UPDATE {table} SET {assignments}"))
}

// ============================================================================
// Tests
// ============================================================================

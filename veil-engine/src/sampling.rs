//! Sampling rules.
//!
//! A `TABLESAMPLE` label carries the ratio clause that thins a table
//! during anonymization. A rule on the table overrides one on the
//! database.

use veil_core::{DatabaseId, MaskingLabel, ObjectAddress, RelationId};
use veil_store::{AnnotationStore, Catalog};

use crate::label;

fn ratio_of(seclabel: &str) -> Option<String> {
    match label::parse_masking_label(seclabel) {
        MaskingLabel::Tablesample(ratio) => {
            let ratio = ratio.trim();
            if ratio.is_empty() {
                None
            } else {
                Some(ratio.to_string())
            }
        }
        _ => None,
    }
}

/// Ratio clause from the relation's own annotation.
pub fn table_ratio<S>(store: &S, relation_id: RelationId, policy: &str) -> Option<String>
where
    S: AnnotationStore + ?Sized,
{
    let seclabel = store.get(&ObjectAddress::table(relation_id), policy)?;
    ratio_of(&seclabel)
}

/// Ratio clause from a database's annotation.
pub fn database_ratio<S>(store: &S, database_id: DatabaseId, policy: &str) -> Option<String>
where
    S: AnnotationStore + ?Sized,
{
    let seclabel = store.get(&ObjectAddress::database(database_id), policy)?;
    ratio_of(&seclabel)
}

/// The ratio clause that applies to a relation: its own annotation
/// first, the current database's as a fallback.
pub fn sampling_ratio<S, C>(
    store: &S,
    catalog: &C,
    relation_id: RelationId,
    policy: &str,
) -> Option<String>
where
    S: AnnotationStore + ?Sized,
    C: Catalog + ?Sized,
{
    table_ratio(store, relation_id, policy)
        .or_else(|| database_ratio(store, catalog.current_database(), policy))
}

// ============================================================================
// Tests
// ============================================================================

//! Masking-rule resolution.
//!
//! Turns a column's annotation into the one expression that replaces its
//! authentic value. Resolution is deterministic and total: every input,
//! including "no rule found", yields a decision, never an unresolved
//! state.

use tracing::debug;
use veil_core::{
    ColumnDescriptor, MaskingConfig, MaskingDecision, MaskingLabel, ObjectAddress,
    RelationDescriptor, RoleId,
};
use veil_store::AnnotationStore;

use crate::label;
use crate::registry::PolicyRegistry;
use crate::sql;

/// Resolve the masking decision for one column under one policy.
///
/// Precedence, first match wins:
///   1. no annotation and privacy-by-default off: the authentic value
///   2. `MASKED WITH FUNCTION`: the stripped expression
///   3. `MASKED WITH VALUE`: the stripped expression
///   4. exactly `NOT MASKED`: the authentic value
///   5. privacy-by-default on: the column default, when one exists
///   6. `NULL`
///
/// An unrecognized label never exposes the authentic value. Under strict
/// mode the stripped expression is cast to the column's declared type.
pub fn decision_for_column<S>(
    store: &S,
    config: &MaskingConfig,
    column: &ColumnDescriptor,
    policy: &str,
) -> MaskingDecision
where
    S: AnnotationStore + ?Sized,
{
    let address = ObjectAddress::column(column.relation_id, column.attribute_number);
    let seclabel = store
        .get(&address, policy)
        .filter(|label| !label.is_empty());

    let decision = match seclabel {
        None if !config.privacy_by_default => MaskingDecision::Authentic,
        None => default_or_null(column),
        Some(text) => match label::parse_masking_label(&text) {
            MaskingLabel::WithFunction(expr) => {
                MaskingDecision::FunctionExpr(decorate(config, column, expr))
            }
            MaskingLabel::WithValue(expr) => {
                MaskingDecision::ValueExpr(decorate(config, column, expr))
            }
            MaskingLabel::NotMasked => MaskingDecision::Authentic,
            // anything else falls through: fail closed, never open
            _ if config.privacy_by_default => default_or_null(column),
            _ => MaskingDecision::Null,
        },
    };
    debug!(policy, column = %column.name, ?decision, "resolved masking rule");
    decision
}

/// Strict mode pins the expression to the declared type.
fn decorate(config: &MaskingConfig, column: &ColumnDescriptor, expr: String) -> String {
    if config.strict_mode {
        return format!("CAST({expr} AS {})", column.declared_type);
    }
    expr
}

fn default_or_null(column: &ColumnDescriptor) -> MaskingDecision {
    match &column.default_expr {
        Some(expr) if column.has_default => MaskingDecision::DefaultExpr(expr.clone()),
        _ => MaskingDecision::Null,
    }
}

/// Decisions for every live column, paired with the quoted column name,
/// in physical ordinal order.
pub fn decisions_for_relation<S>(
    store: &S,
    config: &MaskingConfig,
    relation: &RelationDescriptor,
    policy: &str,
) -> Vec<(MaskingDecision, String)>
where
    S: AnnotationStore + ?Sized,
{
    relation
        .active_columns()
        .map(|column| {
            (
                decision_for_column(store, config, column, policy),
                sql::quote_identifier(&column.name),
            )
        })
        .collect()
}

/// First policy, in declaration order, under which the role carries a
/// `MASKED` annotation. Policies are meant to be mutually exclusive per
/// session, so the first match wins. Group memberships are not
/// consulted: a role must be annotated directly.
pub fn policy_for_role<S>(store: &S, registry: &PolicyRegistry, role: RoleId) -> Option<String>
where
    S: AnnotationStore + ?Sized,
{
    let address = ObjectAddress::role(role);
    for policy in registry.masking_policies() {
        if let Some(seclabel) = store.get(&address, policy) {
            if label::is_masked_label(&seclabel) {
                debug!(role, policy, "role is masked");
                return Some(policy.to_string());
            }
        }
    }
    None
}

// ============================================================================
// Tests
// ============================================================================

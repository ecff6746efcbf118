//! Label grammar validation.
//!
//! Everything here answers one question: may this annotation text be
//! attached to this object under this policy? Verdicts are pure; nothing
//! is persisted. The host calls [`validate_masking_label`] or
//! [`validate_k_anonymity_label`] before writing a label through to its
//! annotation store.

use veil_core::{LabelError, MaskingConfig, ObjectAddress, ObjectClass, SchemaId};
use veil_store::{AnnotationStore, Catalog};

use crate::label;
use crate::sql;

/// Why a function failed the trust walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustReason {
    SchemaNotTrusted,
    FunctionUntrusted,
    FunctionUnqualified,
}

/// Validate masking-policy annotation text for an object.
///
/// `Ok` means the host may persist the label. Removal (`text == None`)
/// is always accepted, for every class. For schemas and functions the
/// privilege check strictly precedes the syntax check.
pub fn validate_masking_label<S, C>(
    store: &S,
    catalog: &C,
    config: &MaskingConfig,
    policy: &str,
    address: &ObjectAddress,
    text: Option<&str>,
) -> Result<(), LabelError>
where
    S: AnnotationStore + ?Sized,
    C: Catalog + ?Sized,
{
    let Some(text) = text else { return Ok(()) };

    match (address.class, address.sub_id) {
        (ObjectClass::Database, _) => check_sampling_rule(text, "a database"),
        // a column address with sub_id 0 designates the whole relation
        (ObjectClass::Table, _) | (ObjectClass::Column, 0) => {
            check_sampling_rule(text, "a table")
        }
        (ObjectClass::Column, _) => check_column_rule(store, catalog, config, policy, text),
        (ObjectClass::Role, _) => {
            if label::is_masked_label(text) {
                Ok(())
            } else {
                Err(LabelError::invalid("a role", text))
            }
        }
        (ObjectClass::Schema, _) => {
            require_elevated(catalog, "only a superuser can set a masking label on a schema")?;
            if label::is_trusted_label(text) {
                Ok(())
            } else {
                Err(LabelError::invalid("a schema", text))
            }
        }
        (ObjectClass::Function, _) => {
            require_elevated(catalog, "only a superuser can set a masking label on a function")?;
            if label::is_trusted_label(text) || label::is_untrusted_label(text) {
                Ok(())
            } else {
                Err(LabelError::invalid("a function", text))
            }
        }
        (class, _) => Err(LabelError::UnsupportedObjectClass { class }),
    }
}

/// Validate k-anonymity annotation text. Only columns take these labels.
pub fn validate_k_anonymity_label(
    address: &ObjectAddress,
    text: Option<&str>,
) -> Result<(), LabelError> {
    let Some(text) = text else { return Ok(()) };

    match (address.class, address.sub_id) {
        (ObjectClass::Column, sub) if sub != 0 => {
            if label::is_identifier_rule(text) {
                Ok(())
            } else {
                Err(LabelError::invalid("a column", text))
            }
        }
        (ObjectClass::Column, _) => Err(LabelError::UnsupportedObjectClass {
            class: ObjectClass::Table,
        }),
        (class, _) => Err(LabelError::UnsupportedObjectClass { class }),
    }
}

fn require_elevated<C>(catalog: &C, action: &str) -> Result<(), LabelError>
where
    C: Catalog + ?Sized,
{
    if catalog.has_elevated_privilege(catalog.current_role()) {
        return Ok(());
    }
    Err(LabelError::InsufficientPrivilege {
        action: action.to_string(),
    })
}

fn check_sampling_rule(text: &str, object: &'static str) -> Result<(), LabelError> {
    if !label::is_sampling_rule(text) {
        return Err(LabelError::invalid(object, text));
    }
    let ratio = label::expression_at(text, label::SAMPLING_RULE_OFFSET);
    if ratio.trim().is_empty() {
        return Err(LabelError::invalid_because(
            object,
            text,
            "the sampling clause is empty",
        ));
    }
    // the clause is spliced into generated statements verbatim
    if text.contains(';') {
        return Err(LabelError::invalid_because(
            object,
            text,
            "the sampling clause must be a single expression",
        ));
    }
    Ok(())
}

fn check_column_rule<S, C>(
    store: &S,
    catalog: &C,
    config: &MaskingConfig,
    policy: &str,
    text: &str,
) -> Result<(), LabelError>
where
    S: AnnotationStore + ?Sized,
    C: Catalog + ?Sized,
{
    if label::is_function_rule(text) {
        let expr = label::expression_at(text, label::FUNCTION_RULE_OFFSET);
        return check_function(store, catalog, config, policy, expr)
            .map_err(|detail| LabelError::invalid_because("a column", text, detail));
    }
    if label::is_value_rule(text) {
        let expr = label::expression_at(text, label::VALUE_RULE_OFFSET);
        return check_value(expr)
            .map_err(|detail| LabelError::invalid_because("a column", text, detail));
    }
    if label::is_not_masked_rule(text) {
        return Ok(());
    }
    if config.merged_identifier_grammar && label::is_identifier_rule(text) {
        return Ok(());
    }
    Err(LabelError::invalid("a column", text))
}

/// Check that an expression is a valid masking function.
///
/// The expression must be a single call. Under the trusted-schemas
/// restriction, every function it references must be schema-qualified
/// and trusted, which blocks escalation through nested calls such as
/// `pg_catalog.upper(public.elevate())`.
pub fn check_function<S, C>(
    store: &S,
    catalog: &C,
    config: &MaskingConfig,
    policy: &str,
    expr: &str,
) -> Result<(), String>
where
    S: AnnotationStore + ?Sized,
    C: Catalog + ?Sized,
{
    if !sql::is_function_call_shape(expr) {
        return Err(format!("{expr} is not a valid function call"));
    }
    if !config.restrict_to_trusted_schemas {
        return Ok(());
    }
    for site in sql::function_calls(expr) {
        let reason = match site.schema {
            None => TrustReason::FunctionUnqualified,
            Some(ref schema) => {
                match is_trusted_function(store, catalog, policy, schema, &site.name) {
                    Ok(()) => continue,
                    Err(reason) => reason,
                }
            }
        };
        return Err(match reason {
            TrustReason::SchemaNotTrusted => {
                format!("{expr} does not belong in a TRUSTED schema")
            }
            TrustReason::FunctionUntrusted => format!("{expr} is UNTRUSTED"),
            TrustReason::FunctionUnqualified => format!("{expr} is not qualified"),
        });
    }
    Ok(())
}

/// Check that an expression is a valid masking value: a constant or a
/// column reference, nothing else.
pub fn check_value(expr: &str) -> Result<(), String> {
    if expr.trim().is_empty() {
        return Err("the expression is empty".to_string());
    }
    if sql::is_value_shape(expr) {
        return Ok(());
    }
    Err(format!("{expr} is not a valid expression for a masking value"))
}

/// Check that a function is trusted under a policy.
///
/// A function may have several definitions, e.g. `mask(int)` and
/// `mask(text)`. It is trusted when no definition carries `UNTRUSTED`
/// and either one definition carries `TRUSTED` or its schema does.
pub fn is_trusted_function<S, C>(
    store: &S,
    catalog: &C,
    policy: &str,
    schema: &str,
    name: &str,
) -> Result<(), TrustReason>
where
    S: AnnotationStore + ?Sized,
    C: Catalog + ?Sized,
{
    let Some(schema_id) = catalog.schema_id(schema) else {
        return Err(TrustReason::SchemaNotTrusted);
    };

    let mut trusted: Option<bool> = None;
    for function_id in catalog.function_candidates(schema_id, name) {
        // an untrusted definition settles the matter
        if !trusted.unwrap_or(true) {
            break;
        }
        let Some(seclabel) = store.get(&ObjectAddress::function(function_id), policy) else {
            continue;
        };
        if label::is_trusted_label(&seclabel) {
            trusted = Some(true);
        }
        if label::is_untrusted_label(&seclabel) {
            trusted = Some(false);
        }
    }

    match trusted {
        Some(true) => Ok(()),
        Some(false) => Err(TrustReason::FunctionUntrusted),
        None => trusted_schema(store, policy, schema_id),
    }
}

fn trusted_schema<S>(store: &S, policy: &str, schema_id: SchemaId) -> Result<(), TrustReason>
where
    S: AnnotationStore + ?Sized,
{
    if let Some(seclabel) = store.get(&ObjectAddress::schema(schema_id), policy) {
        if label::is_trusted_label(&seclabel) {
            return Ok(());
        }
    }
    Err(TrustReason::SchemaNotTrusted)
}

// ============================================================================
// Tests
// ============================================================================

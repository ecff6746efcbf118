//! Security-label keyword matching.
//!
//! Annotation text is matched with byte-anchored, case-insensitive
//! keyword checks. Prefix rules strip their expression at a fixed byte
//! offset (keyword length plus one separator character), so the grammar
//! anchors at byte zero. Equality rules compare the whole text. Text is
//! classified into a [`MaskingLabel`] or [`KAnonymityLabel`] exactly
//! once, at the boundary; internal logic never re-reads raw label
//! strings.

use veil_core::{KAnonymityLabel, MaskingLabel};

/// `MASKED WITH FUNCTION`, 20 bytes.
pub const FUNCTION_RULE: &str = "MASKED WITH FUNCTION";

/// Where a function rule's expression starts: keyword plus separator.
/// Off-by-one here silently corrupts every generated expression, so the
/// tests pin this boundary with literal fixtures.
pub const FUNCTION_RULE_OFFSET: usize = 21;

/// `MASKED WITH VALUE`, 17 bytes.
pub const VALUE_RULE: &str = "MASKED WITH VALUE";

/// Where a value rule's expression starts.
pub const VALUE_RULE_OFFSET: usize = 18;

/// `TABLESAMPLE`, 11 bytes.
pub const SAMPLING_RULE: &str = "TABLESAMPLE";

/// Where a sampling rule's ratio clause starts.
pub const SAMPLING_RULE_OFFSET: usize = 12;

pub const NOT_MASKED_RULE: &str = "NOT MASKED";
pub const MASKED_RULE: &str = "MASKED";
pub const TRUSTED_RULE: &str = "TRUSTED";
pub const UNTRUSTED_RULE: &str = "UNTRUSTED";
pub const QUASI_IDENTIFIER_RULE: &str = "QUASI IDENTIFIER";
pub const INDIRECT_IDENTIFIER_RULE: &str = "INDIRECT IDENTIFIER";

/// Case-insensitive `keyword` at byte zero.
pub fn begins_with(label: &str, keyword: &str) -> bool {
    label
        .as_bytes()
        .get(..keyword.len())
        .map_or(false, |head| head.eq_ignore_ascii_case(keyword.as_bytes()))
}

/// The label text from `offset` on, empty when the label is shorter.
/// Stripping is total: short or multibyte-truncated input yields `""`,
/// never a panic.
pub fn expression_at(label: &str, offset: usize) -> &str {
    label.get(offset..).unwrap_or("")
}

pub fn is_function_rule(label: &str) -> bool {
    begins_with(label, FUNCTION_RULE)
}

pub fn is_value_rule(label: &str) -> bool {
    begins_with(label, VALUE_RULE)
}

pub fn is_sampling_rule(label: &str) -> bool {
    begins_with(label, SAMPLING_RULE)
}

/// Prefix form, used when validating a label.
pub fn is_not_masked_rule(label: &str) -> bool {
    begins_with(label, NOT_MASKED_RULE)
}

/// Exact form, used when resolving a decision.
pub fn is_not_masked_label(label: &str) -> bool {
    label.eq_ignore_ascii_case(NOT_MASKED_RULE)
}

pub fn is_masked_label(label: &str) -> bool {
    label.eq_ignore_ascii_case(MASKED_RULE)
}

pub fn is_trusted_label(label: &str) -> bool {
    label.eq_ignore_ascii_case(TRUSTED_RULE)
}

pub fn is_untrusted_label(label: &str) -> bool {
    label.eq_ignore_ascii_case(UNTRUSTED_RULE)
}

pub fn is_identifier_rule(label: &str) -> bool {
    begins_with(label, QUASI_IDENTIFIER_RULE) || begins_with(label, INDIRECT_IDENTIFIER_RULE)
}

/// Classify masking-policy annotation text.
pub fn parse_masking_label(label: &str) -> MaskingLabel {
    if is_function_rule(label) {
        return MaskingLabel::WithFunction(
            expression_at(label, FUNCTION_RULE_OFFSET).to_string(),
        );
    }
    if is_value_rule(label) {
        return MaskingLabel::WithValue(expression_at(label, VALUE_RULE_OFFSET).to_string());
    }
    if is_sampling_rule(label) {
        return MaskingLabel::Tablesample(
            expression_at(label, SAMPLING_RULE_OFFSET).to_string(),
        );
    }
    if is_not_masked_label(label) {
        return MaskingLabel::NotMasked;
    }
    if is_masked_label(label) {
        return MaskingLabel::Masked;
    }
    if is_trusted_label(label) {
        return MaskingLabel::Trusted;
    }
    if is_untrusted_label(label) {
        return MaskingLabel::Untrusted;
    }
    MaskingLabel::Other(label.to_string())
}

/// Classify k-anonymity annotation text.
pub fn parse_k_anonymity_label(label: &str) -> KAnonymityLabel {
    if begins_with(label, QUASI_IDENTIFIER_RULE) {
        return KAnonymityLabel::QuasiIdentifier;
    }
    if begins_with(label, INDIRECT_IDENTIFIER_RULE) {
        return KAnonymityLabel::IndirectIdentifier;
    }
    KAnonymityLabel::Other(label.to_string())
}

// ============================================================================
// Tests
// ============================================================================

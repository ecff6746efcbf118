//! Property-Based Tests for the Label Grammar
//!
//! Properties under test:
//! - Parsing is total: no input panics the parser
//! - Keyword matching is case-insensitive and anchored at byte zero
//! - Expressions are stripped at fixed offsets, verbatim
//! - Text no grammar accepts never resolves to the authentic value
//! - Identifier quoting only triggers on non-plain or reserved names

use proptest::prelude::*;
use veil_core::{
    ColumnDescriptor, MaskingConfig, MaskingLabel, ObjectAddress, DEFAULT_MASKING_POLICY,
};
use veil_engine::{grammar, label, resolver, sql};
use veil_test_utils::generators::*;
use veil_test_utils::{AnnotationStore, MemoryAnnotationStore, MemoryCatalog};

fn labeled_column(label_text: &str) -> (MemoryAnnotationStore, ColumnDescriptor) {
    let store = MemoryAnnotationStore::new();
    let column = ColumnDescriptor::new(1, 1, "secret", "text");
    store.set(ObjectAddress::column(1, 1), DEFAULT_MASKING_POLICY, label_text);
    (store, column)
}

// ============================================================================
// PARSING PROPERTIES
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Parsing never panics, whatever bytes come in.
    #[test]
    fn prop_parse_is_total(text in any::<String>()) {
        let _ = label::parse_masking_label(&text);
        let _ = label::parse_k_anonymity_label(&text);
    }

    /// Every generated column label parses as an actionable rule.
    #[test]
    fn prop_column_labels_parse_as_rules(label_text in arb_column_label()) {
        let parsed = label::parse_masking_label(&label_text);
        prop_assert!(
            !matches!(parsed, MaskingLabel::Other(_)),
            "{:?} should parse as a rule",
            label_text
        );
    }

    /// Keyword case never changes which rule a label parses to.
    #[test]
    fn prop_parse_ignores_keyword_case(label_text in arb_column_label()) {
        let parsed = label::parse_masking_label(&label_text);
        let lowered = label::parse_masking_label(&label_text.to_ascii_lowercase());
        prop_assert_eq!(
            std::mem::discriminant(&parsed),
            std::mem::discriminant(&lowered)
        );
    }

    /// The function expression is everything after the keyword and one
    /// separator, byte for byte.
    #[test]
    fn prop_function_expression_stripped_at_fixed_offset(
        keyword in arb_mixed_case("MASKED WITH FUNCTION"),
        schema in arb_identifier(),
        name in arb_identifier(),
    ) {
        let expr = format!("{schema}.{name}()");
        let parsed = label::parse_masking_label(&format!("{keyword} {expr}"));
        prop_assert_eq!(MaskingLabel::WithFunction(expr), parsed);
    }

    /// Same fixed-offset strip for value rules.
    #[test]
    fn prop_value_expression_stripped_at_fixed_offset(
        keyword in arb_mixed_case("MASKED WITH VALUE"),
    ) {
        let parsed = label::parse_masking_label(&format!("{keyword} NULL"));
        prop_assert_eq!(MaskingLabel::WithValue("NULL".to_string()), parsed);
    }

    /// Sampling labels keep the ratio clause verbatim.
    #[test]
    fn prop_sampling_label_keeps_clause(
        keyword in arb_mixed_case("TABLESAMPLE"),
        pct in 1u32..=100,
    ) {
        let clause = format!("BERNOULLI({pct})");
        let parsed = label::parse_masking_label(&format!("{keyword} {clause}"));
        prop_assert_eq!(MaskingLabel::Tablesample(clause), parsed);
    }

    /// Text matching no keyword lands in the catch-all variant.
    #[test]
    fn prop_garbage_parses_to_other(text in arb_garbage_label()) {
        prop_assert!(matches!(
            label::parse_masking_label(&text),
            MaskingLabel::Other(_)
        ));
    }
}

// ============================================================================
// VALIDATION PROPERTIES
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// With no trust restriction, every generated column label passes
    /// grammar validation, whatever its keyword case.
    #[test]
    fn prop_valid_column_labels_validate(label_text in arb_column_label()) {
        let store = MemoryAnnotationStore::new();
        let catalog = MemoryCatalog::new();
        let config = MaskingConfig::default();
        let address = ObjectAddress::column(1, 1);

        let outcome = grammar::validate_masking_label(
            &store,
            &catalog,
            &config,
            DEFAULT_MASKING_POLICY,
            &address,
            Some(&label_text),
        );
        prop_assert!(outcome.is_ok(), "{:?} should validate: {:?}", label_text, outcome);
    }

    /// A trailing statement after a function or value expression is
    /// always rejected.
    #[test]
    fn prop_injection_suffix_rejected(
        label_text in prop_oneof![arb_function_label(), arb_value_label()],
    ) {
        let store = MemoryAnnotationStore::new();
        let catalog = MemoryCatalog::new();
        let config = MaskingConfig::default();
        let address = ObjectAddress::column(1, 1);

        let hostile = format!("{label_text}; DROP TABLE person");
        let outcome = grammar::validate_masking_label(
            &store,
            &catalog,
            &config,
            DEFAULT_MASKING_POLICY,
            &address,
            Some(&hostile),
        );
        prop_assert!(outcome.is_err(), "{:?} should be rejected", hostile);
    }

    /// The same (address, text) pair always gets the same verdict.
    #[test]
    fn prop_validation_is_deterministic(
        label_text in prop_oneof![arb_column_label(), arb_garbage_label()],
    ) {
        let store = MemoryAnnotationStore::new();
        let catalog = MemoryCatalog::new();
        let config = MaskingConfig::default();
        let address = ObjectAddress::column(1, 1);

        let first = grammar::validate_masking_label(
            &store,
            &catalog,
            &config,
            DEFAULT_MASKING_POLICY,
            &address,
            Some(&label_text),
        );
        let second = grammar::validate_masking_label(
            &store,
            &catalog,
            &config,
            DEFAULT_MASKING_POLICY,
            &address,
            Some(&label_text),
        );
        prop_assert_eq!(first, second);
    }

    /// Identifier labels only attach to columns.
    #[test]
    fn prop_identifier_labels_are_column_only(label_text in arb_identifier_label()) {
        let column = ObjectAddress::column(1, 1);
        let table = ObjectAddress::table(1);

        prop_assert!(grammar::validate_k_anonymity_label(&column, Some(&label_text)).is_ok());
        prop_assert!(grammar::validate_k_anonymity_label(&table, Some(&label_text)).is_err());
    }

    /// Removal is valid for any address of any class.
    #[test]
    fn prop_removal_always_validates(address in arb_object_address()) {
        let store = MemoryAnnotationStore::new();
        let catalog = MemoryCatalog::new();
        let config = MaskingConfig::default();

        prop_assert!(grammar::validate_masking_label(
            &store,
            &catalog,
            &config,
            DEFAULT_MASKING_POLICY,
            &address,
            None,
        )
        .is_ok());
        prop_assert!(grammar::validate_k_anonymity_label(&address, None).is_ok());
    }
}

// ============================================================================
// RESOLUTION PROPERTIES
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// An unrecognized label never exposes the authentic value, with or
    /// without privacy by default.
    #[test]
    fn prop_garbage_never_resolves_authentic(
        text in arb_garbage_label(),
        privacy_by_default in any::<bool>(),
    ) {
        let (store, column) = labeled_column(&text);
        let config = MaskingConfig {
            privacy_by_default,
            ..MaskingConfig::default()
        };

        let decision =
            resolver::decision_for_column(&store, &config, &column, DEFAULT_MASKING_POLICY);
        prop_assert!(decision.is_masked(), "{:?} resolved to {:?}", text, decision);
    }

    /// Resolution is a pure function of its inputs.
    #[test]
    fn prop_resolution_is_deterministic(label_text in arb_column_label()) {
        let (store, column) = labeled_column(&label_text);
        let config = MaskingConfig::default();

        let first =
            resolver::decision_for_column(&store, &config, &column, DEFAULT_MASKING_POLICY);
        let second =
            resolver::decision_for_column(&store, &config, &column, DEFAULT_MASKING_POLICY);
        prop_assert_eq!(first, second);
    }
}

// ============================================================================
// QUOTING PROPERTIES
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Plain lowercase identifiers stay bare unless reserved.
    #[test]
    fn prop_plain_identifiers_stay_bare(name in arb_identifier()) {
        prop_assume!(!sql::is_reserved_word(&name));
        prop_assert_eq!(name.clone(), sql::quote_identifier(&name));
    }

    /// Forced quoting always wraps and never shrinks the name.
    #[test]
    fn prop_double_quote_always_wraps(name in any::<String>()) {
        let quoted = sql::double_quote(&name);
        prop_assert!(quoted.starts_with('"'));
        prop_assert!(quoted.ends_with('"'));
        prop_assert!(quoted.len() >= name.len() + 2);
    }

    /// Blanking literals preserves expression length and removes quoted
    /// content.
    #[test]
    fn prop_blank_literals_preserves_length(body in "[a-z ;(),']{0,40}") {
        let expr = format!("f('{body}')");
        prop_assert_eq!(expr.len(), sql::blank_literals(&expr).len());
    }
}

//! VEIL Test Utilities
//!
//! Centralized test infrastructure for the Veil workspace:
//! - A pre-populated directory fixture (tables, roles, schemas, functions)
//! - Granular fixture builders for single objects
//! - Proptest generators for labels, addresses and identifiers
//!
//! The fixture models one small database: a `person` table whose
//! `lastname` column is masked, an unmasked `location` table, a masked
//! and an unmasked role, a trusted and an untrusted schema, and a
//! schema of masking functions with mixed trust labels.

use std::sync::Arc;

// Re-export the in-memory collaborators for convenience
pub use veil_store::{AnnotationStore, Catalog, MemoryAnnotationStore, MemoryCatalog};

// Re-export core types test code reaches for constantly
pub use veil_core::{
    AttributeNumber, ColumnDescriptor, DatabaseId, FunctionId, LabelGrammar, MaskingConfig,
    ObjectAddress, ObjectClass, RelationDescriptor, RelationId, RoleId, SchemaId,
    DEFAULT_K_ANONYMITY_PROVIDER, DEFAULT_MASKING_POLICY,
};

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test objects mirroring the functional test database.

    use super::*;

    /// Database id the fixture session is connected to.
    pub const DATABASE: DatabaseId = 100;

    /// `public.person (firstname text, lastname text)`, lastname masked.
    pub const PERSON: RelationId = 1001;

    /// `public.location (city text)`, no masking rules.
    pub const LOCATION: RelationId = 1002;

    /// `public.roster (a, b, c)` where `b` has been dropped.
    pub const ROSTER: RelationId = 1003;

    /// Role labeled `MASKED` under the default policy.
    pub const BATMAN: RoleId = 50;

    /// Role carrying no label.
    pub const BRUCE: RoleId = 51;

    /// Schema labeled `TRUSTED`.
    pub const GOTHAM: SchemaId = 7001;

    /// Schema carrying no label.
    pub const ARKHAM: SchemaId = 7002;

    /// Schema holding the masking functions below, itself unlabeled.
    pub const OUTFIT: SchemaId = 7003;

    /// `outfit.mask()`, labeled `TRUSTED`.
    pub const MASK_FN: FunctionId = 9001;

    /// `outfit.belt()`, labeled `UNTRUSTED`.
    pub const BELT_FN: FunctionId = 9002;

    /// `outfit.cape()`, carrying no label.
    pub const CAPE_FN: FunctionId = 9003;

    /// `gotham.fake_city()`, unlabeled but in a trusted schema.
    pub const FAKE_CITY_FN: FunctionId = 9010;

    /// One session's worth of collaborators, shared the way an embedding
    /// host would share them.
    pub struct Directory {
        pub store: Arc<MemoryAnnotationStore>,
        pub catalog: Arc<MemoryCatalog>,
    }

    /// Create the `person` table and mask its `lastname` column.
    pub fn person_table(store: &MemoryAnnotationStore, catalog: &MemoryCatalog) -> RelationId {
        catalog.add_relation(
            RelationDescriptor::new(PERSON, "public", "person")
                .with_column(ColumnDescriptor::new(PERSON, 1, "firstname", "text"))
                .with_column(ColumnDescriptor::new(PERSON, 2, "lastname", "text")),
        );
        store.set(
            ObjectAddress::column(PERSON, 2),
            DEFAULT_MASKING_POLICY,
            "MASKED WITH VALUE NULL",
        );
        PERSON
    }

    /// Create the unmasked `location` table.
    pub fn location_table(catalog: &MemoryCatalog) -> RelationId {
        catalog.add_relation(
            RelationDescriptor::new(LOCATION, "public", "location")
                .with_column(ColumnDescriptor::new(LOCATION, 1, "city", "text")),
        );
        LOCATION
    }

    /// Create a three-column table whose middle column is dropped.
    pub fn roster_table(catalog: &MemoryCatalog) -> RelationId {
        catalog.add_relation(
            RelationDescriptor::new(ROSTER, "public", "roster")
                .with_column(ColumnDescriptor::new(ROSTER, 1, "a", "int4"))
                .with_column(ColumnDescriptor::new(ROSTER, 2, "b", "int4").dropped())
                .with_column(ColumnDescriptor::new(ROSTER, 3, "c", "int4")),
        );
        ROSTER
    }

    /// Label a role `MASKED` under the default policy.
    pub fn masked_role(store: &MemoryAnnotationStore) -> RoleId {
        store.set(ObjectAddress::role(BATMAN), DEFAULT_MASKING_POLICY, "MASKED");
        BATMAN
    }

    /// A role with no label. The in-memory catalog knows every role id,
    /// so nothing needs to be registered.
    pub fn unmasked_role() -> RoleId {
        BRUCE
    }

    /// Create a schema and mark it `TRUSTED`.
    pub fn trusted_schema(store: &MemoryAnnotationStore, catalog: &MemoryCatalog) -> SchemaId {
        catalog.add_schema("gotham", GOTHAM);
        store.set(ObjectAddress::schema(GOTHAM), DEFAULT_MASKING_POLICY, "TRUSTED");
        catalog.add_function(GOTHAM, "fake_city", FAKE_CITY_FN);
        GOTHAM
    }

    /// Create a schema with no trust label.
    pub fn untrusted_schema(catalog: &MemoryCatalog) -> SchemaId {
        catalog.add_schema("arkham", ARKHAM);
        ARKHAM
    }

    /// Create the `outfit` schema with one trusted, one untrusted and
    /// one unlabeled function.
    pub fn outfit_functions(store: &MemoryAnnotationStore, catalog: &MemoryCatalog) -> SchemaId {
        catalog.add_schema("outfit", OUTFIT);
        catalog.add_function(OUTFIT, "mask", MASK_FN);
        catalog.add_function(OUTFIT, "belt", BELT_FN);
        catalog.add_function(OUTFIT, "cape", CAPE_FN);
        store.set(
            ObjectAddress::function(MASK_FN),
            DEFAULT_MASKING_POLICY,
            "TRUSTED",
        );
        store.set(
            ObjectAddress::function(BELT_FN),
            DEFAULT_MASKING_POLICY,
            "UNTRUSTED",
        );
        OUTFIT
    }

    /// Label the `location` table with a sampling rule.
    pub fn sampled_table(store: &MemoryAnnotationStore) -> RelationId {
        store.set(
            ObjectAddress::table(LOCATION),
            DEFAULT_MASKING_POLICY,
            "TABLESAMPLE BERNOULLI(10)",
        );
        LOCATION
    }

    /// Build the whole directory. The session starts as the unmasked
    /// role, outside a transaction, connected to [`DATABASE`].
    pub fn directory() -> Directory {
        let store = MemoryAnnotationStore::new();
        let catalog = MemoryCatalog::new();

        person_table(&store, &catalog);
        location_table(&catalog);
        roster_table(&catalog);
        masked_role(&store);
        trusted_schema(&store, &catalog);
        untrusted_schema(&catalog);
        outfit_functions(&store, &catalog);

        catalog.set_current_database(DATABASE);
        catalog.set_current_role(unmasked_role());

        Directory {
            store: Arc::new(store),
            catalog: Arc::new(catalog),
        }
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for label and address generation.

    use super::*;
    use proptest::prelude::*;

    // === Identifiers and addresses ===

    /// A plain lowercase identifier, safe to splice unquoted.
    pub fn arb_identifier() -> impl Strategy<Value = String> {
        "[a-z_][a-z0-9_]{0,15}"
    }

    /// An object class, uniformly.
    pub fn arb_object_class() -> impl Strategy<Value = ObjectClass> {
        prop_oneof![
            Just(ObjectClass::Database),
            Just(ObjectClass::Table),
            Just(ObjectClass::Column),
            Just(ObjectClass::Role),
            Just(ObjectClass::Schema),
            Just(ObjectClass::Function),
            Just(ObjectClass::Type),
        ]
    }

    /// An address whose sub id is nonzero only for columns.
    pub fn arb_object_address() -> impl Strategy<Value = ObjectAddress> {
        (arb_object_class(), 1u32..1_000_000, 0i16..16).prop_map(|(class, oid, sub)| {
            let sub_id = if class == ObjectClass::Column { sub + 1 } else { 0 };
            ObjectAddress::new(class, oid, sub_id)
        })
    }

    // === Keyword casing ===

    /// The keyword with each letter's case flipped independently.
    pub fn arb_mixed_case(keyword: &'static str) -> impl Strategy<Value = String> {
        proptest::collection::vec(any::<bool>(), keyword.len()).prop_map(move |flips| {
            keyword
                .chars()
                .zip(flips)
                .map(|(c, upper)| {
                    if upper {
                        c.to_ascii_uppercase()
                    } else {
                        c.to_ascii_lowercase()
                    }
                })
                .collect()
        })
    }

    // === Label grammars ===

    /// `MASKED WITH FUNCTION schema.name()` with randomized keyword case.
    pub fn arb_function_label() -> impl Strategy<Value = String> {
        (arb_mixed_case("MASKED WITH FUNCTION"), arb_identifier(), arb_identifier())
            .prop_map(|(keyword, schema, name)| format!("{keyword} {schema}.{name}()"))
    }

    /// `MASKED WITH VALUE <constant>` with randomized keyword case.
    pub fn arb_value_label() -> impl Strategy<Value = String> {
        let constant = prop_oneof![
            Just("NULL".to_string()),
            (0u32..100_000).prop_map(|n| n.to_string()),
            "[a-z]{1,12}".prop_map(|s| format!("'{s}'")),
        ];
        (arb_mixed_case("MASKED WITH VALUE"), constant)
            .prop_map(|(keyword, constant)| format!("{keyword} {constant}"))
    }

    /// `NOT MASKED` with randomized case.
    pub fn arb_not_masked_label() -> impl Strategy<Value = String> {
        arb_mixed_case("NOT MASKED")
    }

    /// Any label a column accepts under a masking policy.
    pub fn arb_column_label() -> impl Strategy<Value = String> {
        prop_oneof![
            arb_function_label(),
            arb_value_label(),
            arb_not_masked_label(),
        ]
    }

    /// `TABLESAMPLE BERNOULLI(n)` or `TABLESAMPLE SYSTEM(n)`.
    pub fn arb_sampling_label() -> impl Strategy<Value = String> {
        let method = prop_oneof![Just("BERNOULLI"), Just("SYSTEM")];
        (arb_mixed_case("TABLESAMPLE"), method, 1u32..=100)
            .prop_map(|(keyword, method, pct)| format!("{keyword} {method}({pct})"))
    }

    /// A k-anonymity identifier label.
    pub fn arb_identifier_label() -> impl Strategy<Value = String> {
        prop_oneof![
            arb_mixed_case("QUASI IDENTIFIER"),
            arb_mixed_case("INDIRECT IDENTIFIER"),
        ]
    }

    /// Text no grammar accepts. Every keyword starts with a letter, so
    /// a leading digit can never match; the fixed strings are classic
    /// near-misses.
    pub fn arb_garbage_label() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("RANDOM TEXT".to_string()),
            Just("MASKED WITH NOTHING".to_string()),
            Just("NOT MASKED AT ALL".to_string()),
            "[0-9][a-zA-Z0-9 ]{0,20}",
        ]
    }
}

// ============================================================================
// TESTS
// ============================================================================

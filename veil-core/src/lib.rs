//! VEIL Core - Masking Domain Types
//!
//! Pure data structures with no behavior. All other crates depend on this.
//! This crate contains ONLY data types - no label parsing, no resolution
//! logic, no SQL generation.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Host-assigned numeric identifier for a database object.
/// The engine never allocates these; they come from the host catalog.
pub type ObjectId = u32;

/// Identifier of a relation (table, view).
pub type RelationId = ObjectId;

/// Identifier of a role (principal).
pub type RoleId = ObjectId;

/// Identifier of a schema (namespace).
pub type SchemaId = ObjectId;

/// Identifier of a database.
pub type DatabaseId = ObjectId;

/// Identifier of a function.
pub type FunctionId = ObjectId;

/// 1-based physical column ordinal. 0 means "not a column".
pub type AttributeNumber = i16;

/// The reserved invalid object id.
pub const INVALID_OBJECT_ID: ObjectId = 0;

// ============================================================================
// OBJECT MODEL
// ============================================================================

/// The kinds of database objects a label can be attached to.
///
/// `Function` and `Type` round out the host's labelable object kinds:
/// functions carry the trust grammar, types (and anything else without a
/// grammar) are refused outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectClass {
    Database,
    Table,
    Column,
    Role,
    Schema,
    Function,
    Type,
}

impl ObjectClass {
    /// Human-readable target for diagnostics ("a database", "a column", ...).
    pub fn describe(&self) -> &'static str {
        match self {
            ObjectClass::Database => "a database",
            ObjectClass::Table => "a table",
            ObjectClass::Column => "a column",
            ObjectClass::Role => "a role",
            ObjectClass::Schema => "a schema",
            ObjectClass::Function => "a function",
            ObjectClass::Type => "a type",
        }
    }
}

impl fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectClass::Database => "database",
            ObjectClass::Table => "table",
            ObjectClass::Column => "column",
            ObjectClass::Role => "role",
            ObjectClass::Schema => "schema",
            ObjectClass::Function => "function",
            ObjectClass::Type => "type",
        };
        write!(f, "{name}")
    }
}

/// Address of a labelable object: class, object id, and the column ordinal
/// when the object is a column (0 otherwise).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectAddress {
    pub class: ObjectClass,
    pub object_id: ObjectId,
    pub sub_id: AttributeNumber,
}

impl ObjectAddress {
    pub fn new(class: ObjectClass, object_id: ObjectId, sub_id: AttributeNumber) -> Self {
        Self {
            class,
            object_id,
            sub_id,
        }
    }

    pub fn database(database_id: DatabaseId) -> Self {
        Self::new(ObjectClass::Database, database_id, 0)
    }

    pub fn table(relation_id: RelationId) -> Self {
        Self::new(ObjectClass::Table, relation_id, 0)
    }

    pub fn column(relation_id: RelationId, attribute_number: AttributeNumber) -> Self {
        Self::new(ObjectClass::Column, relation_id, attribute_number)
    }

    pub fn role(role_id: RoleId) -> Self {
        Self::new(ObjectClass::Role, role_id, 0)
    }

    pub fn schema(schema_id: SchemaId) -> Self {
        Self::new(ObjectClass::Schema, schema_id, 0)
    }

    pub fn function(function_id: FunctionId) -> Self {
        Self::new(ObjectClass::Function, function_id, 0)
    }

    pub fn is_column(&self) -> bool {
        self.class == ObjectClass::Column && self.sub_id != 0
    }
}

/// The two independently-validated label vocabularies sharing the registry
/// mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LabelGrammar {
    /// TABLESAMPLE / MASKED WITH ... / NOT MASKED / MASKED / TRUSTED
    Masking,
    /// QUASI IDENTIFIER / INDIRECT IDENTIFIER, columns only
    KAnonymity,
}

// ============================================================================
// CATALOG DESCRIPTORS
// ============================================================================

/// One column of a relation, as described by the host catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub relation_id: RelationId,
    /// 1-based physical ordinal.
    pub attribute_number: AttributeNumber,
    pub name: String,
    /// Declared SQL type, as the host spells it (e.g. `text`, `int4`).
    pub declared_type: String,
    pub has_default: bool,
    pub default_expr: Option<String>,
    pub is_dropped: bool,
}

impl ColumnDescriptor {
    pub fn new(
        relation_id: RelationId,
        attribute_number: AttributeNumber,
        name: impl Into<String>,
        declared_type: impl Into<String>,
    ) -> Self {
        Self {
            relation_id,
            attribute_number,
            name: name.into(),
            declared_type: declared_type.into(),
            has_default: false,
            default_expr: None,
            is_dropped: false,
        }
    }

    /// Attach a catalog-declared default expression.
    pub fn with_default(mut self, default_expr: impl Into<String>) -> Self {
        self.has_default = true;
        self.default_expr = Some(default_expr.into());
        self
    }

    /// Mark the column as dropped. Dropped columns keep their ordinal.
    pub fn dropped(mut self) -> Self {
        self.is_dropped = true;
        self
    }
}

/// A relation and its columns in physical ordinal order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDescriptor {
    pub relation_id: RelationId,
    pub namespace: String,
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
}

impl RelationDescriptor {
    pub fn new(
        relation_id: RelationId,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            relation_id,
            namespace: namespace.into(),
            name: name.into(),
            columns: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: ColumnDescriptor) -> Self {
        self.columns.push(column);
        self
    }

    /// Columns that still exist, in physical order.
    pub fn active_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|c| !c.is_dropped)
    }

    /// 1-based ordinal of a named column, ignoring dropped columns.
    pub fn column_number(&self, name: &str) -> Option<AttributeNumber> {
        self.active_columns()
            .find(|c| c.name == name)
            .map(|c| c.attribute_number)
    }

    /// Column at a 1-based ordinal, dropped or not.
    pub fn column_at(&self, attribute_number: AttributeNumber) -> Option<&ColumnDescriptor> {
        self.columns
            .iter()
            .find(|c| c.attribute_number == attribute_number)
    }
}

// ============================================================================
// PARSED LABELS
// ============================================================================

/// A masking-policy label, parsed once at the boundary.
///
/// Raw annotation text is classified into these variants exactly once;
/// internal logic never re-parses label strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaskingLabel {
    /// `MASKED WITH FUNCTION <expr>` - the stripped expression.
    WithFunction(String),
    /// `MASKED WITH VALUE <expr>` - the stripped expression.
    WithValue(String),
    /// `NOT MASKED`
    NotMasked,
    /// `MASKED` (roles)
    Masked,
    /// `TABLESAMPLE <ratio>` - the ratio clause (databases, tables).
    Tablesample(String),
    /// `TRUSTED` (schemas, functions)
    Trusted,
    /// `UNTRUSTED` (functions)
    Untrusted,
    /// Anything else, kept verbatim for diagnostics.
    Other(String),
}

/// A k-anonymity label, parsed once at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KAnonymityLabel {
    /// `QUASI IDENTIFIER`
    QuasiIdentifier,
    /// `INDIRECT IDENTIFIER`
    IndirectIdentifier,
    /// Anything else, kept verbatim for diagnostics.
    Other(String),
}

impl KAnonymityLabel {
    pub fn is_identifier(&self) -> bool {
        matches!(
            self,
            KAnonymityLabel::QuasiIdentifier | KAnonymityLabel::IndirectIdentifier
        )
    }
}

// ============================================================================
// MASKING DECISIONS
// ============================================================================

/// The one expression that replaces a column's authentic value under a
/// policy. Computed per request, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaskingDecision {
    /// The role sees the authentic value.
    Authentic,
    /// Replace with a masking function call.
    FunctionExpr(String),
    /// Replace with a constant value.
    ValueExpr(String),
    /// Replace with the column's catalog-declared default, verbatim.
    DefaultExpr(String),
    /// Replace with NULL.
    Null,
}

impl MaskingDecision {
    /// False only for `Authentic`.
    pub fn is_masked(&self) -> bool {
        !matches!(self, MaskingDecision::Authentic)
    }

    /// The substitution text, or `None` when the authentic value stands.
    pub fn filter_value(&self) -> Option<String> {
        match self {
            MaskingDecision::Authentic => None,
            MaskingDecision::FunctionExpr(expr)
            | MaskingDecision::ValueExpr(expr)
            | MaskingDecision::DefaultExpr(expr) => Some(expr.clone()),
            MaskingDecision::Null => Some("NULL".to_string()),
        }
    }

    /// The expression to project for this column: the substitution text,
    /// or the quoted column itself when authentic.
    pub fn projection_expr(&self, quoted_column: &str) -> String {
        match self.filter_value() {
            Some(expr) => expr,
            None => quoted_column.to_string(),
        }
    }
}

// ============================================================================
// QUERY GATE STATES
// ============================================================================

/// States of the per-query analysis gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GateState {
    Idle,
    Evaluating,
    /// The query proceeds untouched.
    Passthrough,
    /// A policy applies; the rewrite engine must run.
    RewritePending,
}

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Label validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LabelError {
    #[error("`{label}` is not a valid label for {object}{}", .detail.as_ref().map(|d| format!(": {d}")).unwrap_or_default())]
    InvalidSyntax {
        object: &'static str,
        label: String,
        detail: Option<String>,
    },

    #[error("labeling {} is not supported", .class.describe())]
    UnsupportedObjectClass { class: ObjectClass },

    #[error("insufficient privilege: {action}")]
    InsufficientPrivilege { action: String },
}

impl LabelError {
    /// Shorthand used by every grammar check.
    pub fn invalid(object: &'static str, label: impl Into<String>) -> Self {
        LabelError::InvalidSyntax {
            object,
            label: label.into(),
            detail: None,
        }
    }

    /// Same, with a failure detail appended to the message.
    pub fn invalid_because(
        object: &'static str,
        label: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        LabelError::InvalidSyntax {
            object,
            label: label.into(),
            detail: Some(detail.into()),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Policy registry is frozen: cannot register `{policy}`")]
    FrozenRegistry { policy: String },
}

/// Engine-level errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("{feature} is not implemented yet")]
    NotImplemented { feature: String },

    #[error("relation {relation_id} does not exist")]
    UnknownRelation { relation_id: RelationId },

    #[error("`{policy}` is not a registered masking policy")]
    UnknownPolicy { policy: String },

    #[error("expression is empty")]
    EmptyExpression,

    #[error("`{expr}` is not a function call")]
    NotAFunctionCall { expr: String },
}

/// Master error type for all VEIL errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VeilError {
    #[error("Label error: {0}")]
    Label(#[from] LabelError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Result type alias for VEIL operations.
pub type VeilResult<T> = Result<T, VeilError>;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// The default masking policy. It always exists, cannot be renamed and
/// cannot be removed.
pub const DEFAULT_MASKING_POLICY: &str = "veil";

/// The default name of the k-anonymity label provider.
pub const DEFAULT_K_ANONYMITY_PROVIDER: &str = "k_anonymity";

/// Engine configuration, mirroring the host's parameter subsystem.
/// Write-once: validated at engine construction and frozen afterward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskingConfig {
    /// Comma-delimited list of administrator-declared policy names.
    /// The default policy always exists in addition to this list.
    pub masking_policies: String,

    /// Name under which the k-anonymity grammar is registered.
    pub k_anonymity_provider: String,

    /// When on, columns without a rule are masked (to NULL or their
    /// declared default) instead of shown authentically.
    pub privacy_by_default: bool,

    /// When on, masking expressions are cast back to the column's
    /// declared type, preventing type drift.
    pub strict_mode: bool,

    /// When on, masking functions must be trusted or live in a trusted
    /// schema.
    pub restrict_to_trusted_schemas: bool,

    /// When on, analyzed queries from masked roles are handed to the
    /// rewrite engine.
    pub transparent_dynamic_masking: bool,

    /// When on, quasi/indirect identifier labels are also accepted on
    /// columns under masking policies (historical merged grammar).
    pub merged_identifier_grammar: bool,
}

impl Default for MaskingConfig {
    fn default() -> Self {
        Self {
            masking_policies: String::new(),
            k_anonymity_provider: DEFAULT_K_ANONYMITY_PROVIDER.to_string(),
            privacy_by_default: false,
            strict_mode: true,
            restrict_to_trusted_schemas: false,
            transparent_dynamic_masking: false,
            merged_identifier_grammar: false,
        }
    }
}

impl MaskingConfig {
    /// Create from environment variables with fallback to defaults.
    ///
    /// Environment variables:
    /// - `VEIL_MASKING_POLICIES`: comma-delimited policy names (default: "")
    /// - `VEIL_K_ANONYMITY_PROVIDER`: provider name (default: "k_anonymity")
    /// - `VEIL_PRIVACY_BY_DEFAULT`: on/off (default: off)
    /// - `VEIL_STRICT_MODE`: on/off (default: on)
    /// - `VEIL_RESTRICT_TO_TRUSTED_SCHEMAS`: on/off (default: off)
    /// - `VEIL_TRANSPARENT_DYNAMIC_MASKING`: on/off (default: off)
    /// - `VEIL_MERGED_IDENTIFIER_GRAMMAR`: on/off (default: off)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            masking_policies: std::env::var("VEIL_MASKING_POLICIES")
                .unwrap_or(defaults.masking_policies),
            k_anonymity_provider: std::env::var("VEIL_K_ANONYMITY_PROVIDER")
                .unwrap_or(defaults.k_anonymity_provider),
            privacy_by_default: env_flag("VEIL_PRIVACY_BY_DEFAULT", defaults.privacy_by_default),
            strict_mode: env_flag("VEIL_STRICT_MODE", defaults.strict_mode),
            restrict_to_trusted_schemas: env_flag(
                "VEIL_RESTRICT_TO_TRUSTED_SCHEMAS",
                defaults.restrict_to_trusted_schemas,
            ),
            transparent_dynamic_masking: env_flag(
                "VEIL_TRANSPARENT_DYNAMIC_MASKING",
                defaults.transparent_dynamic_masking,
            ),
            merged_identifier_grammar: env_flag(
                "VEIL_MERGED_IDENTIFIER_GRAMMAR",
                defaults.merged_identifier_grammar,
            ),
        }
    }

    /// The administrator-declared policy names: comma-split, trimmed,
    /// empties skipped, duplicates dropped (first occurrence wins).
    pub fn policy_list(&self) -> Vec<String> {
        let mut list: Vec<String> = Vec::new();
        for entry in self.masking_policies.split(',') {
            let name = entry.trim();
            if name.is_empty() {
                continue;
            }
            if list.iter().any(|p| p == name) {
                continue;
            }
            list.push(name.to_string());
        }
        list
    }

    /// Every masking policy, the implicit default first, in declaration
    /// order.
    pub fn all_masking_policies(&self) -> Vec<String> {
        let mut list = vec![DEFAULT_MASKING_POLICY.to_string()];
        for name in self.policy_list() {
            if name != DEFAULT_MASKING_POLICY {
                list.push(name);
            }
        }
        list
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - k_anonymity_provider is a non-empty plain identifier
    /// - declared policy names are plain identifiers
    /// - no declared policy collides with the default policy or the
    ///   k-anonymity provider
    pub fn validate(&self) -> VeilResult<()> {
        if !is_plain_identifier(&self.k_anonymity_provider) {
            return Err(VeilError::Config(ConfigError::InvalidValue {
                field: "k_anonymity_provider".to_string(),
                value: self.k_anonymity_provider.clone(),
                reason: "provider name must be a plain identifier".to_string(),
            }));
        }

        for name in self.policy_list() {
            if !is_plain_identifier(&name) {
                return Err(VeilError::Config(ConfigError::InvalidValue {
                    field: "masking_policies".to_string(),
                    value: name,
                    reason: "policy names must be plain identifiers".to_string(),
                }));
            }
            if name == DEFAULT_MASKING_POLICY {
                return Err(VeilError::Config(ConfigError::InvalidValue {
                    field: "masking_policies".to_string(),
                    value: name,
                    reason: "the default policy is implicit and cannot be re-declared"
                        .to_string(),
                }));
            }
            if name == self.k_anonymity_provider {
                return Err(VeilError::Config(ConfigError::InvalidValue {
                    field: "masking_policies".to_string(),
                    value: name,
                    reason: "policy name collides with the k-anonymity provider".to_string(),
                }));
            }
        }

        Ok(())
    }
}

/// Lowercase ASCII identifier: letter or underscore, then letters,
/// digits, underscores.
fn is_plain_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Read an on/off flag from the environment, GUC-style.
fn env_flag(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "on" | "true" | "yes" | "1" => true,
            "off" | "false" | "no" | "0" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_address_constructors() {
        let col = ObjectAddress::column(16384, 3);
        assert_eq!(col.class, ObjectClass::Column);
        assert_eq!(col.object_id, 16384);
        assert_eq!(col.sub_id, 3);
        assert!(col.is_column());

        let table = ObjectAddress::table(16384);
        assert_eq!(table.sub_id, 0);
        assert!(!table.is_column());

        let role = ObjectAddress::role(10);
        assert_eq!(role.class, ObjectClass::Role);
    }

    #[test]
    fn test_object_address_serde_shape() {
        // hosts persist addresses next to their labels, so the field
        // names and class tags are a stable contract
        let col = ObjectAddress::column(16384, 2);
        let json = serde_json::to_string(&col).unwrap();
        assert_eq!(json, r#"{"class":"Column","object_id":16384,"sub_id":2}"#);

        let back: ObjectAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, col);
    }

    #[test]
    fn test_relation_descriptor_column_lookups() {
        let rel = RelationDescriptor::new(16384, "public", "person")
            .with_column(ColumnDescriptor::new(16384, 1, "id", "int4"))
            .with_column(ColumnDescriptor::new(16384, 2, "pronouns", "text").dropped())
            .with_column(ColumnDescriptor::new(16384, 3, "lastname", "text"));

        assert_eq!(rel.column_number("lastname"), Some(3));
        // dropped columns are invisible to name lookup
        assert_eq!(rel.column_number("pronouns"), None);
        assert_eq!(rel.column_number("does_not_exist"), None);

        // but ordinal lookup still reaches them
        assert!(rel.column_at(2).unwrap().is_dropped);
        assert_eq!(rel.active_columns().count(), 2);
    }

    #[test]
    fn test_decision_filter_value() {
        assert_eq!(MaskingDecision::Authentic.filter_value(), None);
        assert_eq!(
            MaskingDecision::Null.filter_value(),
            Some("NULL".to_string())
        );
        assert_eq!(
            MaskingDecision::ValueExpr("42".to_string()).filter_value(),
            Some("42".to_string())
        );
    }

    #[test]
    fn test_decision_projection_expr() {
        let authentic = MaskingDecision::Authentic;
        assert_eq!(authentic.projection_expr("firstname"), "firstname");

        let masked = MaskingDecision::FunctionExpr("CAST(NULL AS text)".to_string());
        assert_eq!(masked.projection_expr("lastname"), "CAST(NULL AS text)");
        assert!(masked.is_masked());
        assert!(!authentic.is_masked());
    }

    #[test]
    fn test_label_error_display() {
        let err = LabelError::invalid("a column", "RANDOM TEXT");
        assert_eq!(
            format!("{err}"),
            "`RANDOM TEXT` is not a valid label for a column"
        );

        let err = LabelError::invalid_because("a column", "MASKED WITH FUNCTION foo()", "foo() is not qualified");
        let msg = format!("{err}");
        assert!(msg.contains("`MASKED WITH FUNCTION foo()` is not a valid label for a column"));
        assert!(msg.ends_with(": foo() is not qualified"));
    }

    #[test]
    fn test_unsupported_class_display() {
        let err = LabelError::UnsupportedObjectClass {
            class: ObjectClass::Type,
        };
        assert_eq!(format!("{err}"), "labeling a type is not supported");
    }

    #[test]
    fn test_engine_error_display() {
        let err = EngineError::NotImplemented {
            feature: "transparent dynamic masking".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "transparent dynamic masking is not implemented yet"
        );
    }

    #[test]
    fn test_veil_error_from_variants() {
        let label = VeilError::from(LabelError::invalid("a role", "NOT MASKED"));
        assert!(matches!(label, VeilError::Label(_)));

        let config = VeilError::from(ConfigError::FrozenRegistry {
            policy: "hr".to_string(),
        });
        assert!(matches!(config, VeilError::Config(_)));

        let engine = VeilError::from(EngineError::EmptyExpression);
        assert!(matches!(engine, VeilError::Engine(_)));
    }

    #[test]
    fn test_config_defaults() {
        let config = MaskingConfig::default();
        assert!(!config.privacy_by_default);
        assert!(config.strict_mode);
        assert!(!config.restrict_to_trusted_schemas);
        assert!(!config.transparent_dynamic_masking);
        assert!(!config.merged_identifier_grammar);
        assert_eq!(config.k_anonymity_provider, "k_anonymity");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_policy_list_parsing() {
        let config = MaskingConfig {
            masking_policies: " hr , finance ,, hr ,".to_string(),
            ..MaskingConfig::default()
        };
        assert_eq!(config.policy_list(), vec!["hr", "finance"]);
        assert_eq!(
            config.all_masking_policies(),
            vec!["veil", "hr", "finance"]
        );
    }

    #[test]
    fn test_policy_list_empty() {
        let config = MaskingConfig::default();
        assert!(config.policy_list().is_empty());
        assert_eq!(config.all_masking_policies(), vec!["veil"]);
    }

    #[test]
    fn test_config_rejects_reserved_names() {
        let config = MaskingConfig {
            masking_policies: "veil".to_string(),
            ..MaskingConfig::default()
        };
        assert!(config.validate().is_err());

        let config = MaskingConfig {
            masking_policies: "k_anonymity".to_string(),
            ..MaskingConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_rejects_bad_identifiers() {
        let config = MaskingConfig {
            masking_policies: "hr;DROP TABLE x".to_string(),
            ..MaskingConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(VeilError::Config(ConfigError::InvalidValue { .. }))
        ));

        let config = MaskingConfig {
            k_anonymity_provider: String::new(),
            ..MaskingConfig::default()
        };
        assert!(config.validate().is_err());
    }
}

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================

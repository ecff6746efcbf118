//! VEIL ENGINE - Label grammars, policy resolution and SQL generation
//!
//! This crate binds the host's annotation store and catalog to the
//! masking machinery: label validation per object class, the frozen
//! policy registry, role and column resolution, sampling rules and the
//! SQL builders the embedder executes.
//!
//! Architecture:
//! ```text
//! annotation text (security labels)
//!     ↓
//! grammar validation (per object class, per policy grammar)
//!     ↓
//! annotation store (host-persisted labels)
//!     ↓
//! resolver (label → MaskingDecision, per column, per policy)
//!     ↓
//! SQL builders (projections, assignments, rewrite scripts)
//! ```

pub mod apply;
pub mod gate;
pub mod grammar;
pub mod label;
pub mod registry;
pub mod resolver;
pub mod sampling;
pub mod sql;

// Re-export the types embedders touch directly
pub use gate::{NullRewriteEngine, QueryDisposition, QueryGate, RewriteEngine};
pub use grammar::TrustReason;
pub use registry::PolicyRegistry;

use std::sync::Arc;

use tracing::debug;
use veil_core::{
    AttributeNumber, ColumnDescriptor, EngineError, GateState, LabelGrammar, MaskingConfig,
    MaskingDecision, ObjectAddress, RelationId, RoleId, VeilResult,
};
use veil_store::{AnnotationStore, Catalog};

/// The session-facing masking engine.
///
/// One instance serves one session. It owns the validated configuration
/// and the policy registry, and reaches the host through the
/// [`AnnotationStore`] and [`Catalog`] trait objects it was built over.
pub struct MaskingEngine {
    store: Arc<dyn AnnotationStore>,
    catalog: Arc<dyn Catalog>,
    config: MaskingConfig,
    registry: PolicyRegistry,
    rewriter: Box<dyn RewriteEngine>,
    gate: QueryGate,
}

impl std::fmt::Debug for MaskingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaskingEngine")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

impl MaskingEngine {
    /// Build an engine over the host collaborators. The configuration is
    /// validated and the registry populated from it.
    pub fn new(
        store: Arc<dyn AnnotationStore>,
        catalog: Arc<dyn Catalog>,
        config: MaskingConfig,
    ) -> VeilResult<Self> {
        config.validate()?;
        let registry = PolicyRegistry::from_config(&config)?;
        debug!(policies = registry.len(), "masking engine ready");
        Ok(Self {
            store,
            catalog,
            config,
            registry,
            rewriter: Box::new(NullRewriteEngine),
            gate: QueryGate::new(),
        })
    }

    /// Engine with the default configuration.
    pub fn with_defaults(
        store: Arc<dyn AnnotationStore>,
        catalog: Arc<dyn Catalog>,
    ) -> VeilResult<Self> {
        Self::new(store, catalog, MaskingConfig::default())
    }

    pub fn config(&self) -> &MaskingConfig {
        &self.config
    }

    pub fn registry(&self) -> &PolicyRegistry {
        &self.registry
    }

    pub fn gate_state(&self) -> GateState {
        self.gate.state()
    }

    /// Replace the rewrite engine the gate invokes.
    pub fn set_rewrite_engine(&mut self, rewriter: Box<dyn RewriteEngine>) {
        self.rewriter = rewriter;
    }

    /// Register an extra masking policy. After [`freeze_policies`] this
    /// is a no-op for known names and an error for new ones.
    ///
    /// [`freeze_policies`]: MaskingEngine::freeze_policies
    pub fn register_policy(&mut self, policy: &str) -> VeilResult<()> {
        self.registry.register(policy, LabelGrammar::Masking)
    }

    /// Stop accepting new policy names.
    pub fn freeze_policies(&mut self) {
        self.registry.freeze();
    }

    // ========================================================================
    // LABELS
    // ========================================================================

    /// Validate annotation text for an object under a policy, without
    /// persisting anything. `None` (removal) is always valid.
    pub fn check_label(
        &self,
        address: &ObjectAddress,
        policy: &str,
        text: Option<&str>,
    ) -> VeilResult<()> {
        let grammar =
            self.registry
                .lookup(policy)
                .ok_or_else(|| EngineError::UnknownPolicy {
                    policy: policy.to_string(),
                })?;
        match grammar {
            LabelGrammar::Masking => grammar::validate_masking_label(
                self.store.as_ref(),
                self.catalog.as_ref(),
                &self.config,
                policy,
                address,
                text,
            )?,
            LabelGrammar::KAnonymity => grammar::validate_k_anonymity_label(address, text)?,
        }
        Ok(())
    }

    /// Validate, then write the label through to the annotation store.
    /// `None` removes any existing label.
    pub fn apply_label(
        &self,
        address: &ObjectAddress,
        policy: &str,
        text: Option<&str>,
    ) -> VeilResult<()> {
        self.check_label(address, policy, text)?;
        match text {
            Some(text) => self.store.set(*address, policy, text),
            None => self.store.remove(address, policy),
        }
        Ok(())
    }

    // ========================================================================
    // RESOLUTION
    // ========================================================================

    /// The policy that applies to a role, if any.
    pub fn policy_for_role(&self, role: RoleId) -> Option<String> {
        resolver::policy_for_role(self.store.as_ref(), &self.registry, role)
    }

    /// The masking decision for one column under a policy.
    pub fn decision_for_column(
        &self,
        column: &ColumnDescriptor,
        policy: &str,
    ) -> MaskingDecision {
        resolver::decision_for_column(self.store.as_ref(), &self.config, column, policy)
    }

    /// Decisions for every live column of a relation, with quoted names.
    pub fn decisions_for_relation(
        &self,
        relation_id: RelationId,
        policy: &str,
    ) -> Option<Vec<(MaskingDecision, String)>> {
        let relation = self.catalog.describe_relation(relation_id)?;
        Some(resolver::decisions_for_relation(
            self.store.as_ref(),
            &self.config,
            &relation,
            policy,
        ))
    }

    // ========================================================================
    // SQL GENERATION
    // ========================================================================

    pub fn masking_expressions_for_table(
        &self,
        relation_id: RelationId,
        policy: &str,
    ) -> Option<String> {
        apply::masking_expressions_for_table(
            self.store.as_ref(),
            self.catalog.as_ref(),
            &self.config,
            relation_id,
            policy,
        )
    }

    pub fn masking_value_for_column(
        &self,
        relation_id: RelationId,
        ordinal: AttributeNumber,
        policy: &str,
    ) -> Option<String> {
        apply::masking_value_for_column(
            self.store.as_ref(),
            self.catalog.as_ref(),
            &self.config,
            relation_id,
            ordinal,
            policy,
        )
    }

    pub fn column_assignment(
        &self,
        relation_id: RelationId,
        column_name: &str,
        policy: &str,
    ) -> Option<String> {
        apply::column_assignment(
            self.store.as_ref(),
            self.catalog.as_ref(),
            &self.config,
            relation_id,
            column_name,
            policy,
        )
    }

    pub fn table_assignments(&self, relation_id: RelationId, policy: &str) -> Option<String> {
        apply::table_assignments(
            self.store.as_ref(),
            self.catalog.as_ref(),
            &self.config,
            relation_id,
            policy,
        )
    }

    pub fn subquery(&self, relation_id: RelationId, policy: &str) -> Option<String> {
        apply::subquery(
            self.store.as_ref(),
            self.catalog.as_ref(),
            &self.config,
            relation_id,
            policy,
        )
    }

    pub fn update_statement(&self, relation_id: RelationId, policy: &str) -> Option<String> {
        apply::update_statement(
            self.store.as_ref(),
            self.catalog.as_ref(),
            &self.config,
            relation_id,
            policy,
        )
    }

    /// The sampling ratio that applies to a relation, table rule first,
    /// database rule as fallback.
    pub fn sampling_ratio(&self, relation_id: RelationId, policy: &str) -> Option<String> {
        sampling::sampling_ratio(
            self.store.as_ref(),
            self.catalog.as_ref(),
            relation_id,
            policy,
        )
    }

    /// Schema qualifier of a function-call expression, `""` when the
    /// call is unqualified.
    pub fn get_function_schema(&self, expr: &str) -> VeilResult<String> {
        sql::get_function_schema(expr)
    }

    // ========================================================================
    // QUERY ANALYSIS
    // ========================================================================

    /// Run one query through the analysis gate.
    pub fn analyze_query(&mut self, query: &str) -> VeilResult<QueryDisposition> {
        self.gate.analyze(
            self.store.as_ref(),
            self.catalog.as_ref(),
            &self.registry,
            &self.config,
            self.rewriter.as_ref(),
            query,
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use veil_core::{ConfigError, VeilError, DEFAULT_MASKING_POLICY};
    use veil_store::{MemoryAnnotationStore, MemoryCatalog};

    fn engine() -> MaskingEngine {
        let store = Arc::new(MemoryAnnotationStore::new());
        let catalog = Arc::new(MemoryCatalog::new());
        catalog.add_relation(
            veil_core::RelationDescriptor::new(1001, "public", "person")
                .with_column(ColumnDescriptor::new(1001, 1, "firstname", "text"))
                .with_column(ColumnDescriptor::new(1001, 2, "lastname", "text")),
        );
        MaskingEngine::with_defaults(store, catalog).unwrap()
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let store = Arc::new(MemoryAnnotationStore::new());
        let catalog = Arc::new(MemoryCatalog::new());
        let config = MaskingConfig {
            masking_policies: "not a name".to_string(),
            ..MaskingConfig::default()
        };
        let err = MaskingEngine::new(store, catalog, config).unwrap_err();
        assert!(matches!(
            err,
            VeilError::Config(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_check_label_unknown_policy() {
        let engine = engine();
        let err = engine
            .check_label(&ObjectAddress::role(50), "nope", Some("MASKED"))
            .unwrap_err();
        assert!(matches!(
            err,
            VeilError::Engine(EngineError::UnknownPolicy { .. })
        ));
    }

    #[test]
    fn test_apply_label_roundtrip() {
        let engine = engine();
        let column = ObjectAddress::column(1001, 2);

        engine
            .apply_label(&column, DEFAULT_MASKING_POLICY, Some("MASKED WITH VALUE NULL"))
            .unwrap();
        assert_eq!(
            Some("CAST(NULL AS text)".to_string()),
            engine.masking_value_for_column(1001, 2, DEFAULT_MASKING_POLICY)
        );

        engine
            .apply_label(&column, DEFAULT_MASKING_POLICY, None)
            .unwrap();
        assert_eq!(
            Some("lastname".to_string()),
            engine.masking_value_for_column(1001, 2, DEFAULT_MASKING_POLICY)
        );
    }

    #[test]
    fn test_apply_label_rejects_bad_text() {
        let engine = engine();
        let column = ObjectAddress::column(1001, 2);
        assert!(engine
            .apply_label(&column, DEFAULT_MASKING_POLICY, Some("RANDOM TEXT"))
            .is_err());
        // nothing was persisted
        assert_eq!(
            Some("lastname".to_string()),
            engine.masking_value_for_column(1001, 2, DEFAULT_MASKING_POLICY)
        );
    }

    #[test]
    fn test_register_policy_then_freeze() {
        let mut engine = engine();
        engine.register_policy("hr").unwrap();
        engine.freeze_policies();

        // known name: no-op
        engine.register_policy("hr").unwrap();
        assert!(engine.register_policy("finance").is_err());

        assert!(engine.registry().is_registered("hr"));
        assert!(!engine.registry().is_registered("finance"));
    }

    #[test]
    fn test_analyze_query_default_passthrough() {
        let mut engine = engine();
        let disposition = engine.analyze_query("SELECT 1").unwrap();
        assert_eq!(QueryDisposition::Passthrough, disposition);
        assert_eq!(GateState::Passthrough, engine.gate_state());
    }

    #[test]
    fn test_get_function_schema_facade() {
        let engine = engine();
        assert_eq!("veil", engine.get_function_schema("veil.fake_city()").unwrap());
        assert_eq!("", engine.get_function_schema("fake_city()").unwrap());
        assert!(engine.get_function_schema("").is_err());
    }
}

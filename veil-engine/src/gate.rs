//! Query-analysis gate.
//!
//! The dynamic-masking entry point. Each analyzed query walks the gate's
//! state machine; when transparent dynamic masking applies, the
//! pluggable rewrite engine must produce the masked statement. The
//! bundled engine refuses with an explicit error: a masked role must
//! never silently receive authentic rows.

use tracing::debug;
use veil_core::{EngineError, GateState, MaskingConfig, VeilResult};
use veil_store::{AnnotationStore, Catalog};

use crate::registry::PolicyRegistry;
use crate::resolver;

/// What the gate decided about one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryDisposition {
    /// No masking applies; the query runs untouched.
    Passthrough,
    /// Masking applies; the rewritten statement to run instead.
    Rewritten(String),
}

/// A rewriter turning an authentic statement into its masked form under
/// a policy. The embedder supplies one; the bundled
/// [`NullRewriteEngine`] always refuses.
pub trait RewriteEngine: Send + Sync {
    fn rewrite(&self, query: &str, policy: &str) -> VeilResult<String>;
}

/// The fail-closed default. Rewriting is not implemented, and saying so
/// beats handing authentic rows to a masked role.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRewriteEngine;

impl RewriteEngine for NullRewriteEngine {
    fn rewrite(&self, _query: &str, _policy: &str) -> VeilResult<String> {
        Err(EngineError::NotImplemented {
            feature: "transparent dynamic masking".to_string(),
        }
        .into())
    }
}

/// Per-session analysis gate.
///
/// `Idle` until the first query, `Evaluating` while one is analyzed,
/// then `Passthrough` or `RewritePending`. A failed rewrite leaves the
/// gate in `RewritePending` so the refusal is observable.
#[derive(Debug, Clone)]
pub struct QueryGate {
    state: GateState,
}

impl Default for QueryGate {
    fn default() -> Self {
        Self {
            state: GateState::Idle,
        }
    }
}

impl QueryGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = GateState::Idle;
    }

    /// Analyze one query and decide its disposition.
    ///
    /// Passthrough when transparent dynamic masking is disabled, when no
    /// transaction is active, or when the current role is not masked
    /// under any policy. Otherwise the rewrite engine runs.
    pub fn analyze<S, C, R>(
        &mut self,
        store: &S,
        catalog: &C,
        registry: &PolicyRegistry,
        config: &MaskingConfig,
        rewriter: &R,
        query: &str,
    ) -> VeilResult<QueryDisposition>
    where
        S: AnnotationStore + ?Sized,
        C: Catalog + ?Sized,
        R: RewriteEngine + ?Sized,
    {
        self.state = GateState::Evaluating;

        if !config.transparent_dynamic_masking || !catalog.in_transaction() {
            self.state = GateState::Passthrough;
            return Ok(QueryDisposition::Passthrough);
        }

        let role = catalog.current_role();
        let Some(policy) = resolver::policy_for_role(store, registry, role) else {
            debug!(role, "role is not masked, query passes through");
            self.state = GateState::Passthrough;
            return Ok(QueryDisposition::Passthrough);
        };

        self.state = GateState::RewritePending;
        debug!(role, policy, "masked role, the query must be rewritten");
        let rewritten = rewriter.rewrite(query, &policy)?;
        Ok(QueryDisposition::Rewritten(rewritten))
    }
}

// ============================================================================
// Tests
// ============================================================================

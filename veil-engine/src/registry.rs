//! Policy registration.
//!
//! The registry is populated once at engine construction and then
//! frozen; lookups after the freeze are plain reads with nothing to
//! contend on.

use std::collections::HashMap;

use tracing::debug;
use veil_core::{ConfigError, LabelGrammar, MaskingConfig, VeilResult};

/// The set of policy names the engine answers for, each bound to the
/// grammar its labels are validated against. Declaration order is
/// preserved because role resolution is first-match over it.
#[derive(Debug, Clone, Default)]
pub struct PolicyRegistry {
    grammars: HashMap<String, LabelGrammar>,
    declaration_order: Vec<String>,
    frozen: bool,
}

impl PolicyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated from the configuration: the implicit
    /// default policy first, then the declared list, then the
    /// k-anonymity provider.
    pub fn from_config(config: &MaskingConfig) -> VeilResult<Self> {
        let mut registry = Self::new();
        for policy in config.all_masking_policies() {
            registry.register(&policy, LabelGrammar::Masking)?;
        }
        registry.register(&config.k_anonymity_provider, LabelGrammar::KAnonymity)?;
        Ok(registry)
    }

    /// Register a policy under a grammar.
    ///
    /// Re-registering a known name with the same grammar is a no-op, so
    /// duplicate declarations are harmless. A name can never change
    /// grammar, and new names are rejected once the registry is frozen.
    pub fn register(&mut self, policy: &str, grammar: LabelGrammar) -> VeilResult<()> {
        if let Some(existing) = self.grammars.get(policy) {
            if *existing == grammar {
                return Ok(());
            }
            return Err(ConfigError::InvalidValue {
                field: "policy".to_string(),
                value: policy.to_string(),
                reason: format!("already registered under the {existing:?} grammar"),
            }
            .into());
        }
        if self.frozen {
            return Err(ConfigError::FrozenRegistry {
                policy: policy.to_string(),
            }
            .into());
        }
        debug!(policy, ?grammar, "registering policy");
        self.grammars.insert(policy.to_string(), grammar);
        self.declaration_order.push(policy.to_string());
        Ok(())
    }

    /// Stop accepting new names.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Grammar bound to `policy`, `None` for unknown names.
    pub fn lookup(&self, policy: &str) -> Option<LabelGrammar> {
        self.grammars.get(policy).copied()
    }

    pub fn is_registered(&self, policy: &str) -> bool {
        self.grammars.contains_key(policy)
    }

    /// Masking-grammar policy names in declaration order, the implicit
    /// default first.
    pub fn masking_policies(&self) -> Vec<&str> {
        self.declaration_order
            .iter()
            .filter(|name| matches!(self.grammars.get(name.as_str()), Some(LabelGrammar::Masking)))
            .map(String::as_str)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.grammars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grammars.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

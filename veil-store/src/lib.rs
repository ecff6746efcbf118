//! VEIL Store - Collaborator Traits and In-Memory Implementations
//!
//! Defines the two seams the engine reads through: the annotation store
//! that persists labels, and the catalog that describes relations, roles
//! and schemas. A database host implements these against its own system
//! catalogs; the in-memory implementations here back embedded use and
//! tests.

use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::warn;
use veil_core::{
    DatabaseId, FunctionId, ObjectAddress, RelationDescriptor, RelationId, RoleId, SchemaId,
};

// ============================================================================
// ANNOTATION STORE TRAIT
// ============================================================================

/// Durable label storage, keyed by (object address, policy name).
/// At most one annotation exists per pair; `set` replaces.
///
/// Transactional semantics (visibility, rollback) belong to the host;
/// the engine never caches reads, so it always observes the latest
/// state the store exposes.
pub trait AnnotationStore: Send + Sync {
    /// The label text on an object under a policy, if any.
    fn get(&self, address: &ObjectAddress, policy: &str) -> Option<String>;

    /// Attach or replace a label. Grammar checks happen before this call.
    fn set(&self, address: ObjectAddress, policy: &str, label: &str);

    /// Remove a label. Removing an absent label is a no-op.
    fn remove(&self, address: &ObjectAddress, policy: &str);

    /// Remove every label on an object across all policies, for
    /// object-drop cleanup.
    fn remove_object(&self, address: &ObjectAddress);
}

// ============================================================================
// CATALOG TRAIT
// ============================================================================

/// Read-only view of the host catalog and session state.
pub trait Catalog: Send + Sync {
    /// The relation and its columns in physical order, or `None` for an
    /// unknown relation id.
    fn describe_relation(&self, relation_id: RelationId) -> Option<RelationDescriptor>;

    /// The role the current session runs as.
    fn current_role(&self) -> RoleId;

    /// Whether a role holds superuser-equivalent privilege.
    fn has_elevated_privilege(&self, role: RoleId) -> bool;

    /// The database the current session is connected to.
    fn current_database(&self) -> DatabaseId;

    /// Whether the session is inside an active transaction.
    fn in_transaction(&self) -> bool;

    /// Resolve a schema name to its id.
    fn schema_id(&self, name: &str) -> Option<SchemaId>;

    /// Every definition of a function name within a schema (a name may
    /// have several overloads).
    fn function_candidates(&self, schema_id: SchemaId, name: &str) -> Vec<FunctionId>;
}

// ============================================================================
// IN-MEMORY ANNOTATION STORE
// ============================================================================

/// Thread-safe in-memory annotation store.
#[derive(Debug, Default)]
pub struct MemoryAnnotationStore {
    labels: RwLock<HashMap<(ObjectAddress, String), String>>,
}

impl MemoryAnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn labels_read(&self) -> RwLockReadGuard<'_, HashMap<(ObjectAddress, String), String>> {
        match self.labels.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("annotation store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn labels_write(&self) -> RwLockWriteGuard<'_, HashMap<(ObjectAddress, String), String>> {
        match self.labels.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("annotation store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Number of stored annotations (test helper).
    pub fn count(&self) -> usize {
        self.labels_read().len()
    }

    /// Drop every annotation (test helper).
    pub fn clear(&self) {
        self.labels_write().clear();
    }
}

impl AnnotationStore for MemoryAnnotationStore {
    fn get(&self, address: &ObjectAddress, policy: &str) -> Option<String> {
        self.labels_read()
            .get(&(*address, policy.to_string()))
            .cloned()
    }

    fn set(&self, address: ObjectAddress, policy: &str, label: &str) {
        self.labels_write()
            .insert((address, policy.to_string()), label.to_string());
    }

    fn remove(&self, address: &ObjectAddress, policy: &str) {
        self.labels_write().remove(&(*address, policy.to_string()));
    }

    fn remove_object(&self, address: &ObjectAddress) {
        self.labels_write()
            .retain(|(labeled, _), _| labeled != address);
    }
}

// ============================================================================
// IN-MEMORY CATALOG
// ============================================================================

/// Session facts the catalog reports alongside the object directory.
#[derive(Debug, Clone)]
struct SessionState {
    current_role: RoleId,
    current_database: DatabaseId,
    in_transaction: bool,
}

/// Thread-safe in-memory catalog. One instance models one session's view:
/// a directory of relations, schemas and functions, plus the session
/// facts (current role, current database, transaction state).
#[derive(Debug)]
pub struct MemoryCatalog {
    relations: RwLock<HashMap<RelationId, RelationDescriptor>>,
    schemas: RwLock<HashMap<String, SchemaId>>,
    functions: RwLock<HashMap<(SchemaId, String), Vec<FunctionId>>>,
    superusers: RwLock<HashSet<RoleId>>,
    session: RwLock<SessionState>,
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self {
            relations: RwLock::new(HashMap::new()),
            schemas: RwLock::new(HashMap::new()),
            functions: RwLock::new(HashMap::new()),
            superusers: RwLock::new(HashSet::new()),
            session: RwLock::new(SessionState {
                current_role: 0,
                current_database: 1,
                in_transaction: false,
            }),
        }
    }
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn session_read(&self) -> RwLockReadGuard<'_, SessionState> {
        match self.session.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("catalog session lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn session_write(&self) -> RwLockWriteGuard<'_, SessionState> {
        match self.session.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("catalog session lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    // === Directory mutators ===

    /// Register a relation. Replaces an existing descriptor with the
    /// same id.
    pub fn add_relation(&self, relation: RelationDescriptor) {
        self.relations
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .insert(relation.relation_id, relation);
    }

    /// Register a schema name.
    pub fn add_schema(&self, name: impl Into<String>, schema_id: SchemaId) {
        self.schemas
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .insert(name.into(), schema_id);
    }

    /// Register one definition of a function within a schema.
    pub fn add_function(&self, schema_id: SchemaId, name: impl Into<String>, function_id: FunctionId) {
        self.functions
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .entry((schema_id, name.into()))
            .or_default()
            .push(function_id);
    }

    /// Grant superuser-equivalent privilege to a role.
    pub fn grant_superuser(&self, role: RoleId) {
        self.superusers
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .insert(role);
    }

    // === Session mutators ===

    pub fn set_current_role(&self, role: RoleId) {
        self.session_write().current_role = role;
    }

    pub fn set_current_database(&self, database_id: DatabaseId) {
        self.session_write().current_database = database_id;
    }

    pub fn set_in_transaction(&self, in_transaction: bool) {
        self.session_write().in_transaction = in_transaction;
    }

    /// Number of registered relations (test helper).
    pub fn relation_count(&self) -> usize {
        self.relations.read().unwrap_or_else(|p| p.into_inner()).len()
    }
}

impl Catalog for MemoryCatalog {
    fn describe_relation(&self, relation_id: RelationId) -> Option<RelationDescriptor> {
        self.relations
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(&relation_id)
            .cloned()
    }

    fn current_role(&self) -> RoleId {
        self.session_read().current_role
    }

    fn has_elevated_privilege(&self, role: RoleId) -> bool {
        self.superusers
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .contains(&role)
    }

    fn current_database(&self) -> DatabaseId {
        self.session_read().current_database
    }

    fn in_transaction(&self) -> bool {
        self.session_read().in_transaction
    }

    fn schema_id(&self, name: &str) -> Option<SchemaId> {
        self.schemas
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(name)
            .copied()
    }

    fn function_candidates(&self, schema_id: SchemaId, name: &str) -> Vec<FunctionId> {
        self.functions
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(&(schema_id, name.to_string()))
            .cloned()
            .unwrap_or_default()
    }
}

// ============================================================================
// TESTS
// ============================================================================

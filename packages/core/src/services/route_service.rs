//! Route Service - Mutation Engine and read API
//!
//! `RouteService` is the entry point for everything the serving layer does
//! with the route forest: materializing a role's navigation tree and the
//! administrative edits (create, move, delete, rename, payload patches,
//! seeding, visibility toggles).
//!
//! # Consistency
//!
//! Every mutation is one `BEGIN IMMEDIATE` transaction. Preconditions are
//! checked before the first pointer write and any error rolls the whole
//! transaction back, so no partially relinked chain is ever committed.
//! Structural mutations additionally hold the role's in-process lock, and a
//! transaction that fails with `SQLITE_BUSY` is replayed from scratch.
//!
//! Reads run in a deferred transaction so that one call sees one snapshot.
//!
//! # Events
//!
//! A [`RouteEvent`] is broadcast after each commit. No-op calls (moving a
//! node onto its own position, renaming to the same name) emit nothing.

use crate::config::RouteStoreConfig;
use crate::db::{DatabaseService, RouteEvent, RouteStore};
use crate::models::{
    normalize_payload, NewRouteNode, PayloadPatch, RouteNode, RouteSpec, RouteTree,
    ValidationError, NO_PREV_SIBLING, ROOT_PARENT,
};
use crate::operations::{MutationRetry, RoleLockTable};
use crate::services::error::RouteServiceError;
use crate::services::traversal::Traversal;
use libsql::Connection;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Broadcast channel capacity for route events
const ROUTE_EVENT_CHANNEL_CAPACITY: usize = 128;

type SeedFuture<'a> = Pin<Box<dyn Future<Output = Result<(), RouteServiceError>> + Send + 'a>>;

/// Where `move_node` puts a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MoveTarget {
    /// 1-based position among the node's current siblings
    Index(usize),

    /// Directly after the named node, under that node's parent
    After(String),

    /// First child of `parent` (`None` = root level)
    Head { parent: Option<String> },

    /// Last child of `parent` (`None` = root level)
    Tail { parent: Option<String> },
}

/// Outcome of an idempotent seed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedReport {
    pub inserted: usize,
    pub skipped: usize,
}

impl SeedReport {
    pub fn merge(&mut self, other: SeedReport) {
        self.inserted += other.inserted;
        self.skipped += other.skipped;
    }
}

/// Pointer rewrites over one connection
///
/// Every method assumes it runs inside a write transaction opened by the
/// caller; none of them commits.
#[derive(Clone, Copy)]
pub(crate) struct ChainEditor<'c> {
    store: RouteStore<'c>,
    traversal: Traversal<'c>,
    max_depth: usize,
}

impl<'c> ChainEditor<'c> {
    pub(crate) fn new(conn: &'c Connection, max_depth: usize) -> Self {
        let store = RouteStore::new(conn);
        Self {
            store,
            traversal: Traversal::new(store),
            max_depth,
        }
    }

    pub(crate) fn store(&self) -> RouteStore<'c> {
        self.store
    }

    pub(crate) async fn require(
        &self,
        role: &str,
        name: &str,
    ) -> Result<RouteNode, RouteServiceError> {
        self.store
            .find_by_name(role, name)
            .await?
            .ok_or_else(|| RouteServiceError::route_not_found(role, name))
    }

    async fn reload(&self, id: i64) -> Result<RouteNode, RouteServiceError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| RouteServiceError::not_found(format!("route id {}", id)))
    }

    async fn resolve_parent(
        &self,
        role: &str,
        parent: Option<&str>,
    ) -> Result<i64, RouteServiceError> {
        match parent {
            Some(name) => Ok(self.require(role, name).await?.id),
            None => Ok(ROOT_PARENT),
        }
    }

    /// The node currently following `prev` in the group, ignoring `excluding`
    async fn successor(
        &self,
        role: &str,
        parent: i64,
        prev: i64,
        excluding: Option<i64>,
    ) -> Result<Option<RouteNode>, RouteServiceError> {
        let mut claims = self
            .store
            .find_by_position(role, parent, prev, excluding)
            .await?;
        if claims.len() > 1 {
            let ids: Vec<i64> = claims.iter().map(|n| n.id).collect();
            tracing::error!(role, parent, prev, ?ids, "Duplicate sibling slot claim");
            return Err(RouteServiceError::integrity(format!(
                "nodes {:?} of role '{}' all claim slot (parent {}, prev_sibling {})",
                ids, role, parent, prev
            )));
        }
        Ok(claims.pop())
    }

    /// Last sibling of the `(role, parent)` group other than `excluding`
    async fn tail_of(
        &self,
        role: &str,
        parent: i64,
        excluding: Option<i64>,
    ) -> Result<i64, RouteServiceError> {
        let children = self.traversal.ordered_children(role, parent).await?;
        Ok(children
            .iter()
            .rev()
            .find(|child| Some(child.id) != excluding)
            .map(|child| child.id)
            .unwrap_or(NO_PREV_SIBLING))
    }

    /// Reject `parent` when it is `node` or one of its descendants
    async fn check_not_within(
        &self,
        node: &RouteNode,
        parent: i64,
    ) -> Result<(), RouteServiceError> {
        if parent != ROOT_PARENT
            && self
                .traversal
                .is_ancestor_or_self(node.id, parent, self.max_depth)
                .await?
        {
            return Err(RouteServiceError::conflict(format!(
                "cannot move '{}' into its own subtree",
                node.name
            )));
        }
        Ok(())
    }

    /// Insert a new node after `after` (0 = head) and relink its successor
    pub(crate) async fn insert(
        &self,
        role: &str,
        name: &str,
        parent: i64,
        after: i64,
        payload: &Value,
    ) -> Result<i64, RouteServiceError> {
        if self.store.find_by_name(role, name).await?.is_some() {
            return Err(RouteServiceError::conflict(format!(
                "route '{}' already exists in role '{}'",
                name, role
            )));
        }

        let successor = self.successor(role, parent, after, None).await?;

        let id = self
            .store
            .insert(NewRouteNode {
                name,
                role,
                parent,
                prev_sibling: after,
                payload,
            })
            .await
            .map_err(|e| {
                if e.is_unique_violation() {
                    RouteServiceError::conflict(format!(
                        "route '{}' already exists in role '{}'",
                        name, role
                    ))
                } else {
                    e.into()
                }
            })?;

        if let Some(successor) = successor {
            self.store.set_prev_sibling(successor.id, id).await?;
            tracing::debug!(
                "Relinked route {} after new route {} ('{}')",
                successor.id,
                id,
                name
            );
        }

        Ok(id)
    }

    /// Create a node addressed by names
    pub(crate) async fn create(
        &self,
        role: &str,
        name: &str,
        parent_name: Option<&str>,
        after_name: Option<&str>,
        payload: &Value,
    ) -> Result<RouteNode, RouteServiceError> {
        let parent = self.resolve_parent(role, parent_name).await?;

        let after = match after_name {
            Some(after_name) => {
                let anchor = self.require(role, after_name).await?;
                if anchor.parent != parent {
                    return Err(RouteServiceError::conflict(format!(
                        "'{}' is not a child of {}",
                        after_name,
                        parent_name.map_or("the root level".to_string(), |p| format!("'{}'", p))
                    )));
                }
                anchor.id
            }
            None => NO_PREV_SIBLING,
        };

        let id = self.insert(role, name, parent, after, payload).await?;
        self.reload(id).await
    }

    /// Detach `node` from its chain; its successor adopts its predecessor
    async fn unlink(&self, node: &RouteNode) -> Result<(), RouteServiceError> {
        if let Some(successor) = self
            .successor(&node.role, node.parent, node.id, None)
            .await?
        {
            self.store
                .set_prev_sibling(successor.id, node.prev_sibling)
                .await?;
            tracing::debug!(
                "Relinked route {} to {} after unlinking route {}",
                successor.id,
                node.prev_sibling,
                node.id
            );
        }
        Ok(())
    }

    /// Relocate `node` to follow `after` under `parent`
    ///
    /// Returns `None` when the node already sits there.
    async fn relocate(
        &self,
        node: &RouteNode,
        parent: i64,
        after: i64,
    ) -> Result<Option<RouteNode>, RouteServiceError> {
        if after == node.id || (node.parent == parent && node.prev_sibling == after) {
            return Ok(None);
        }

        self.unlink(node).await?;

        let successor = self
            .successor(&node.role, parent, after, Some(node.id))
            .await?;
        self.store.set_position(node.id, parent, after).await?;
        if let Some(successor) = successor {
            self.store.set_prev_sibling(successor.id, node.id).await?;
        }

        tracing::debug!(
            "Moved route {} ('{}') to parent {} after {}",
            node.id,
            node.name,
            parent,
            after
        );
        Ok(Some(self.reload(node.id).await?))
    }

    /// Resolve `target` to `(parent, after)` and relocate
    pub(crate) async fn move_to(
        &self,
        node: &RouteNode,
        target: &MoveTarget,
    ) -> Result<Option<RouteNode>, RouteServiceError> {
        let (parent, after) = match target {
            MoveTarget::Index(index) => {
                let count = self.traversal.sibling_count(node).await?;
                if *index < 1 || *index > count {
                    return Err(RouteServiceError::conflict(format!(
                        "index {} is outside 1..={} for '{}'",
                        index, count, node.name
                    )));
                }

                let current = self.traversal.node_index(node).await?;
                if *index == current {
                    return Ok(None);
                }

                let mut target = node.clone();
                if *index < current {
                    for _ in 0..(current - index) {
                        target = self.step_back(&target).await?;
                    }
                    (node.parent, target.prev_sibling)
                } else {
                    for _ in 0..(index - current) {
                        target = self.step_forward(&target).await?;
                    }
                    (node.parent, target.id)
                }
            }
            MoveTarget::After(name) => {
                let anchor = self.require(&node.role, name).await?;
                if anchor.id == node.id {
                    return Ok(None);
                }
                if self
                    .traversal
                    .is_ancestor_or_self(node.id, anchor.id, self.max_depth)
                    .await?
                {
                    return Err(RouteServiceError::conflict(format!(
                        "cannot move '{}' after its own descendant '{}'",
                        node.name, anchor.name
                    )));
                }
                (anchor.parent, anchor.id)
            }
            MoveTarget::Head { parent } => {
                let parent = self.resolve_parent(&node.role, parent.as_deref()).await?;
                self.check_not_within(node, parent).await?;
                (parent, NO_PREV_SIBLING)
            }
            MoveTarget::Tail { parent } => {
                let parent = self.resolve_parent(&node.role, parent.as_deref()).await?;
                self.check_not_within(node, parent).await?;
                let tail = self.tail_of(&node.role, parent, Some(node.id)).await?;
                (parent, tail)
            }
        };

        self.relocate(node, parent, after).await
    }

    async fn step_back(&self, node: &RouteNode) -> Result<RouteNode, RouteServiceError> {
        self.traversal
            .prev_sibling_node(node)
            .await?
            .ok_or_else(|| RouteServiceError::not_found(format!("sibling before '{}'", node.name)))
    }

    async fn step_forward(&self, node: &RouteNode) -> Result<RouteNode, RouteServiceError> {
        self.traversal
            .next_sibling(node)
            .await?
            .ok_or_else(|| RouteServiceError::not_found(format!("sibling after '{}'", node.name)))
    }

    /// Ids of `node` and every descendant, breadth first
    async fn subtree_ids(&self, node: &RouteNode) -> Result<Vec<i64>, RouteServiceError> {
        let mut ids = vec![node.id];
        let mut seen = HashSet::from([node.id]);
        let mut frontier = vec![node.id];
        let mut depth = 0usize;

        while !frontier.is_empty() {
            depth += 1;
            let mut next = Vec::new();
            for parent in frontier {
                for child in self.store.children_of(&node.role, parent).await? {
                    if depth > self.max_depth || !seen.insert(child.id) {
                        tracing::error!(route = node.id, "Malformed subtree below route");
                        return Err(RouteServiceError::integrity(format!(
                            "subtree of route {} ('{}') loops or is deeper than {} levels",
                            node.id, node.name, self.max_depth
                        )));
                    }
                    ids.push(child.id);
                    next.push(child.id);
                }
            }
            frontier = next;
        }

        Ok(ids)
    }

    /// Remove `node`, closing the gap it leaves in its chain
    pub(crate) async fn delete(
        &self,
        node: &RouteNode,
        cascade: bool,
    ) -> Result<Vec<i64>, RouteServiceError> {
        let children = self.store.count_children(&node.role, node.id).await?;
        if children > 0 && !cascade {
            return Err(RouteServiceError::conflict(format!(
                "route '{}' has {} children",
                node.name, children
            )));
        }

        let ids = self.subtree_ids(node).await?;
        self.unlink(node).await?;
        for id in &ids {
            self.store.delete(*id).await?;
        }

        tracing::debug!(
            "Deleted route {} ('{}') and {} descendants",
            node.id,
            node.name,
            ids.len() - 1
        );
        Ok(ids)
    }

    pub(crate) async fn rename(
        &self,
        node: &RouteNode,
        new_name: &str,
    ) -> Result<Option<RouteNode>, RouteServiceError> {
        if node.name == new_name {
            return Ok(None);
        }
        if new_name.is_empty() {
            return Err(
                ValidationError::InvalidRouteSpec("route name must not be empty".into()).into(),
            );
        }
        if self.store.find_by_name(&node.role, new_name).await?.is_some() {
            return Err(RouteServiceError::conflict(format!(
                "route '{}' already exists in role '{}'",
                new_name, node.role
            )));
        }

        let payload = normalize_payload(new_name, node.payload.clone()).ok_or_else(|| {
            ValidationError::NotAnObject(format!("stored payload of '{}'", node.name))
        })?;
        self.store.update_name(node.id, new_name, &payload).await?;
        Ok(Some(self.reload(node.id).await?))
    }

    pub(crate) async fn patch(
        &self,
        node: &RouteNode,
        patch: &PayloadPatch,
    ) -> Result<RouteNode, RouteServiceError> {
        let mut payload = node.payload.clone();
        patch.apply(&mut payload);
        self.store.update_payload(node.id, &payload).await?;
        self.reload(node.id).await
    }

    /// Set `payload.hidden` on every node called `name`, in every role
    pub(crate) async fn set_hidden(
        &self,
        name: &str,
        hidden: bool,
    ) -> Result<Vec<RouteNode>, RouteServiceError> {
        let patch = PayloadPatch::hidden(hidden);
        let mut updated = Vec::new();
        for node in self.store.find_all_by_name(name).await? {
            updated.push(self.patch(&node, &patch).await?);
        }
        Ok(updated)
    }

    /// Insert-if-absent seeding of `specs` under the roots of `role`
    pub(crate) async fn seed(
        &self,
        role: &str,
        specs: &[RouteSpec],
    ) -> Result<SeedReport, RouteServiceError> {
        let mut report = SeedReport::default();
        self.seed_level(role, ROOT_PARENT, specs, 1, &mut report)
            .await?;
        Ok(report)
    }

    fn seed_level<'a>(
        &'a self,
        role: &'a str,
        parent: i64,
        specs: &'a [RouteSpec],
        depth: usize,
        report: &'a mut SeedReport,
    ) -> SeedFuture<'a> {
        Box::pin(async move {
            if specs.is_empty() {
                return Ok(());
            }
            if depth > self.max_depth {
                return Err(ValidationError::InvalidRouteSpec(format!(
                    "route description is nested deeper than {} levels",
                    self.max_depth
                ))
                .into());
            }

            let mut tail = self.tail_of(role, parent, None).await?;
            for spec in specs {
                let id = match self.store.find_by_name(role, &spec.name).await? {
                    Some(existing) => {
                        report.skipped += 1;
                        existing.id
                    }
                    None => {
                        let payload = normalize_payload(&spec.name, spec.payload.clone())
                            .ok_or_else(|| ValidationError::NotAnObject(spec.name.clone()))?;
                        let id = self.insert(role, &spec.name, parent, tail, &payload).await?;
                        report.inserted += 1;
                        tail = id;
                        id
                    }
                };

                self.seed_level(role, id, &spec.children, depth + 1, &mut *report)
                    .await?;
            }
            Ok(())
        })
    }
}

/// Route forest service
///
/// Cheap to clone; clones share the database, the role locks and the event
/// channel.
///
/// # Examples
///
/// ```no_run
/// # use uiroute_core::{RouteService, RouteStoreConfig, MoveTarget};
/// # use serde_json::json;
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let service = RouteService::open(RouteStoreConfig::with_db_path("./routes.db")).await?;
///
/// service.create_node("admin", "Dashboard", None, None, json!({"path": "/dashboard"})).await?;
/// service.create_node("admin", "Profile", None, Some("Dashboard"), json!({})).await?;
/// service.move_node("admin", "Profile", MoveTarget::Index(1)).await?;
///
/// let tree = service.get_tree("admin").await?;
/// assert_eq!(tree.root_names(), vec!["Profile", "Dashboard"]);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RouteService {
    db: Arc<DatabaseService>,
    config: Arc<RouteStoreConfig>,
    locks: Arc<RoleLockTable>,
    retry: MutationRetry,
    event_tx: broadcast::Sender<RouteEvent>,
}

impl RouteService {
    pub fn new(db: Arc<DatabaseService>, config: RouteStoreConfig) -> Self {
        let (event_tx, _) = broadcast::channel(ROUTE_EVENT_CHANNEL_CAPACITY);
        Self {
            db,
            retry: MutationRetry::new(config.mutation_retries),
            config: Arc::new(config),
            locks: Arc::new(RoleLockTable::new()),
            event_tx,
        }
    }

    /// Open (creating if needed) the database named by `config`
    pub async fn open(config: RouteStoreConfig) -> Result<Self, RouteServiceError> {
        config.validate()?;
        let db = DatabaseService::new_with_timeout(config.db_path.clone(), config.busy_timeout_ms)
            .await?;
        Ok(Self::new(Arc::new(db), config))
    }

    pub fn config(&self) -> &RouteStoreConfig {
        &self.config
    }

    pub fn database(&self) -> &Arc<DatabaseService> {
        &self.db
    }

    pub(crate) fn locks(&self) -> &RoleLockTable {
        &self.locks
    }

    pub(crate) fn retry(&self) -> MutationRetry {
        self.retry
    }

    pub(crate) fn editor<'c>(&self, conn: &'c Connection) -> ChainEditor<'c> {
        ChainEditor::new(conn, self.config.max_depth)
    }

    /// Subscribe to route events
    ///
    /// ```no_run
    /// # use uiroute_core::{RouteService, RouteStoreConfig};
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// # let service = RouteService::open(RouteStoreConfig::default()).await?;
    /// let mut rx = service.subscribe_to_events();
    /// tokio::spawn(async move {
    ///     while let Ok(event) = rx.recv().await {
    ///         println!("Event: {}", event.event_type());
    ///     }
    /// });
    /// # Ok(())
    /// # }
    /// ```
    pub fn subscribe_to_events(&self) -> broadcast::Receiver<RouteEvent> {
        self.event_tx.subscribe()
    }

    /// Ignores send errors; having no subscribers is normal.
    pub(crate) fn emit_event(&self, event: RouteEvent) {
        let _ = self.event_tx.send(event);
    }

    pub(crate) async fn write_conn(&self) -> Result<Connection, RouteServiceError> {
        let conn = self.db.connect_with_timeout().await?;
        self.db.begin_immediate(&conn).await?;
        Ok(conn)
    }

    async fn read_conn(&self) -> Result<Connection, RouteServiceError> {
        let conn = self.db.connect_with_timeout().await?;
        self.db.begin_read(&conn).await?;
        Ok(conn)
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    /// Materialize the nested route tree of `role`
    pub async fn get_tree(&self, role: &str) -> Result<RouteTree, RouteServiceError> {
        let conn = self.read_conn().await?;
        let result = Traversal::new(RouteStore::new(&conn))
            .materialize(role, self.config.max_depth)
            .await;
        self.db.finish(&conn, result).await
    }

    /// Navigation routes of `role` in the UI's JSON format
    ///
    /// The root routes of the fallback role are appended after the role's own
    /// routes, unless `role` is the fallback role.
    pub async fn navigation_for(&self, role: &str) -> Result<Vec<Value>, RouteServiceError> {
        let conn = self.read_conn().await?;
        let result = async {
            let traversal = Traversal::new(RouteStore::new(&conn));
            let mut routes = traversal
                .materialize(role, self.config.max_depth)
                .await?
                .to_ui_routes();

            let fallback = self.config.fallback_role.as_str();
            if role != fallback {
                let fallback_tree = traversal.materialize(fallback, self.config.max_depth).await?;
                routes.extend(fallback_tree.to_ui_routes());
            }
            Ok::<_, RouteServiceError>(routes)
        }
        .await;
        self.db.finish(&conn, result).await
    }

    pub async fn get_node(
        &self,
        role: &str,
        name: &str,
    ) -> Result<Option<RouteNode>, RouteServiceError> {
        let conn = self.db.connect_with_timeout().await?;
        Ok(RouteStore::new(&conn).find_by_name(role, name).await?)
    }

    /// First child of `parent` (`None` = first root)
    pub async fn first_child(
        &self,
        role: &str,
        parent: Option<&str>,
    ) -> Result<Option<RouteNode>, RouteServiceError> {
        let conn = self.read_conn().await?;
        let result = async {
            let editor = self.editor(&conn);
            let parent = editor.resolve_parent(role, parent).await?;
            editor.traversal.first_child(role, parent).await
        }
        .await;
        self.db.finish(&conn, result).await
    }

    pub async fn next_sibling(
        &self,
        role: &str,
        name: &str,
    ) -> Result<Option<RouteNode>, RouteServiceError> {
        let conn = self.read_conn().await?;
        let result = async {
            let editor = self.editor(&conn);
            let node = editor.require(role, name).await?;
            editor.traversal.next_sibling(&node).await
        }
        .await;
        self.db.finish(&conn, result).await
    }

    pub async fn prev_sibling(
        &self,
        role: &str,
        name: &str,
    ) -> Result<Option<RouteNode>, RouteServiceError> {
        let conn = self.read_conn().await?;
        let result = async {
            let editor = self.editor(&conn);
            let node = editor.require(role, name).await?;
            editor.traversal.prev_sibling_node(&node).await
        }
        .await;
        self.db.finish(&conn, result).await
    }

    pub async fn last_sibling(&self, role: &str, name: &str) -> Result<RouteNode, RouteServiceError> {
        let conn = self.read_conn().await?;
        let result = async {
            let editor = self.editor(&conn);
            let node = editor.require(role, name).await?;
            editor.traversal.last_sibling(&node).await
        }
        .await;
        self.db.finish(&conn, result).await
    }

    /// 1-based position of `name` among its siblings
    pub async fn node_index(&self, role: &str, name: &str) -> Result<usize, RouteServiceError> {
        let conn = self.read_conn().await?;
        let result = async {
            let editor = self.editor(&conn);
            let node = editor.require(role, name).await?;
            editor.traversal.node_index(&node).await
        }
        .await;
        self.db.finish(&conn, result).await
    }

    /// Names of the children of `parent` (`None` = roots) in sibling order
    pub async fn sibling_names(
        &self,
        role: &str,
        parent: Option<&str>,
    ) -> Result<Vec<String>, RouteServiceError> {
        let conn = self.read_conn().await?;
        let result = async {
            let editor = self.editor(&conn);
            let parent = editor.resolve_parent(role, parent).await?;
            let children = editor.traversal.ordered_children(role, parent).await?;
            Ok::<_, RouteServiceError>(children.into_iter().map(|node| node.name).collect())
        }
        .await;
        self.db.finish(&conn, result).await
    }

    // ---------------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------------

    /// Create a route and return its id
    ///
    /// `after_name = None` inserts at the head of `parent_name`'s children;
    /// otherwise the new route directly follows `after_name`, which must be
    /// a child of the same parent.
    ///
    /// # Errors
    ///
    /// - `Conflict` if `(role, name)` is taken or `after_name` has another parent
    /// - `NotFound` if `parent_name` or `after_name` does not exist
    /// - `Validation` if `payload` is neither an object nor null
    pub async fn create_node(
        &self,
        role: &str,
        name: &str,
        parent_name: Option<&str>,
        after_name: Option<&str>,
        payload: Value,
    ) -> Result<i64, RouteServiceError> {
        if name.is_empty() {
            return Err(
                ValidationError::InvalidRouteSpec("route name must not be empty".into()).into(),
            );
        }
        let payload = normalize_payload(name, payload)
            .ok_or_else(|| ValidationError::NotAnObject(format!("payload of '{}'", name)))?;
        let payload = &payload;

        let _guard = self.locks.lock(role).await;
        let node = self
            .retry
            .run("create", move || async move {
                let conn = self.write_conn().await?;
                let result = self
                    .editor(&conn)
                    .create(role, name, parent_name, after_name, payload)
                    .await;
                self.db.finish(&conn, result).await
            })
            .await?;

        tracing::debug!("Created route {} ('{}') in role '{}'", node.id, name, role);
        let id = node.id;
        self.emit_event(RouteEvent::NodeCreated { node });
        Ok(id)
    }

    /// Move a route, keeping its id and payload
    pub async fn move_node(
        &self,
        role: &str,
        name: &str,
        target: MoveTarget,
    ) -> Result<(), RouteServiceError> {
        let target = &target;

        let _guard = self.locks.lock(role).await;
        let moved = self
            .retry
            .run("move", move || async move {
                let conn = self.write_conn().await?;
                let result = async {
                    let editor = self.editor(&conn);
                    let node = editor.require(role, name).await?;
                    editor.move_to(&node, target).await
                }
                .await;
                self.db.finish(&conn, result).await
            })
            .await?;

        if let Some(node) = moved {
            self.emit_event(RouteEvent::NodeMoved { node });
        }
        Ok(())
    }

    /// Delete a route
    ///
    /// With `cascade` its descendants are deleted too; without it a route
    /// that still has children is a `Conflict`.
    pub async fn delete_node(
        &self,
        role: &str,
        name: &str,
        cascade: bool,
    ) -> Result<(), RouteServiceError> {
        let _guard = self.locks.lock(role).await;
        let ids = self
            .retry
            .run("delete", move || async move {
                let conn = self.write_conn().await?;
                let result = async {
                    let editor = self.editor(&conn);
                    let node = editor.require(role, name).await?;
                    editor.delete(&node, cascade).await
                }
                .await;
                self.db.finish(&conn, result).await
            })
            .await?;

        self.emit_event(RouteEvent::NodesDeleted {
            role: role.to_string(),
            ids,
        });
        Ok(())
    }

    /// Rename a route; `payload.name` follows
    pub async fn rename_node(
        &self,
        role: &str,
        old_name: &str,
        new_name: &str,
    ) -> Result<(), RouteServiceError> {
        let renamed = self
            .retry
            .run("rename", move || async move {
                let conn = self.write_conn().await?;
                let result = async {
                    let editor = self.editor(&conn);
                    let node = editor.require(role, old_name).await?;
                    editor.rename(&node, new_name).await
                }
                .await;
                self.db.finish(&conn, result).await
            })
            .await?;

        if let Some(node) = renamed {
            self.emit_event(RouteEvent::NodeUpdated { node });
        }
        Ok(())
    }

    /// Merge recognized payload fields into a route
    ///
    /// `fields` is validated by [`PayloadPatch::from_value`]; pointers are
    /// never touched.
    pub async fn patch_payload(
        &self,
        role: &str,
        name: &str,
        fields: Value,
    ) -> Result<(), RouteServiceError> {
        let patch = PayloadPatch::from_value(&fields)?;
        let patch = &patch;

        let node = self
            .retry
            .run("patch", move || async move {
                let conn = self.write_conn().await?;
                let result = async {
                    let editor = self.editor(&conn);
                    let node = editor.require(role, name).await?;
                    editor.patch(&node, patch).await
                }
                .await;
                self.db.finish(&conn, result).await
            })
            .await?;

        self.emit_event(RouteEvent::NodeUpdated { node });
        Ok(())
    }

    /// Insert every missing route of `specs` at the tail of its parent
    ///
    /// Existing routes are left untouched, so this is safe to run on every
    /// start.
    pub async fn seed_defaults(
        &self,
        role: &str,
        specs: &[RouteSpec],
    ) -> Result<SeedReport, RouteServiceError> {
        let _guard = self.locks.lock(role).await;
        let report = self
            .retry
            .run("seed", move || async move {
                let conn = self.write_conn().await?;
                let result = self.editor(&conn).seed(role, specs).await;
                self.db.finish(&conn, result).await
            })
            .await?;

        tracing::info!(
            "Seeded role '{}': {} inserted, {} already present",
            role,
            report.inserted,
            report.skipped
        );
        if report.inserted > 0 {
            self.emit_event(RouteEvent::Seeded {
                role: role.to_string(),
                inserted: report.inserted,
            });
        }
        Ok(report)
    }

    /// Set `payload.hidden` on every route called `name` across all roles
    ///
    /// Returns the number of routes touched; unknown names are a no-op.
    pub async fn set_visibility(&self, name: &str, hidden: bool) -> Result<usize, RouteServiceError> {
        let updated = self
            .retry
            .run("visibility", move || async move {
                let conn = self.write_conn().await?;
                let result = self.editor(&conn).set_hidden(name, hidden).await;
                self.db.finish(&conn, result).await
            })
            .await?;

        let count = updated.len();
        if count > 0 {
            tracing::debug!("Set hidden={} on {} route(s) named '{}'", hidden, count, name);
        }
        for node in updated {
            self.emit_event(RouteEvent::NodeUpdated { node });
        }
        Ok(count)
    }
}

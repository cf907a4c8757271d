//! Traversal Engine
//!
//! Read-side navigation of sibling chains. This is the only place that
//! interprets `prev_sibling`: everything else asks for "first child", "next
//! sibling" or "ordered children" and gets a checked answer.
//!
//! Every walk verifies the chain while it reads it. A duplicate claim on a
//! slot, a revisited node, a dangling pointer or a chain that does not cover
//! every row of its group is reported as
//! [`RouteServiceError::IntegrityViolation`] instead of being truncated.
//!
//! Nothing is cached between calls; each lookup re-queries through the
//! borrowed connection, so callers control snapshot scope with the
//! transaction they run on that connection.

use crate::db::RouteStore;
use crate::models::{RouteNode, RouteTree, RouteTreeNode, NO_PREV_SIBLING, ROOT_PARENT};
use crate::services::error::RouteServiceError;
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;

/// Default recursion cap for materialization
pub const DEFAULT_MAX_DEPTH: usize = 50;

type LevelFuture<'a> =
    Pin<Box<dyn Future<Output = Result<(Vec<RouteTreeNode>, usize), RouteServiceError>> + Send + 'a>>;

/// Sibling-chain navigation over one connection
#[derive(Clone, Copy)]
pub struct Traversal<'c> {
    store: RouteStore<'c>,
}

fn integrity(msg: String) -> RouteServiceError {
    tracing::error!("{}", msg);
    RouteServiceError::integrity(msg)
}

impl<'c> Traversal<'c> {
    pub fn new(store: RouteStore<'c>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> RouteStore<'c> {
        self.store
    }

    /// The node occupying `(role, parent, prev_sibling)`, rejecting duplicate claims
    async fn slot(
        &self,
        role: &str,
        parent: i64,
        prev_sibling: i64,
    ) -> Result<Option<RouteNode>, RouteServiceError> {
        let mut claims = self
            .store
            .find_by_position(role, parent, prev_sibling, None)
            .await?;

        if claims.len() > 1 {
            let ids: Vec<i64> = claims.iter().map(|n| n.id).collect();
            return Err(integrity(format!(
                "nodes {:?} of role '{}' all claim slot (parent {}, prev_sibling {})",
                ids, role, parent, prev_sibling
            )));
        }
        Ok(claims.pop())
    }

    /// The unique child of `parent` with `prev_sibling = 0`
    pub async fn first_child(
        &self,
        role: &str,
        parent: i64,
    ) -> Result<Option<RouteNode>, RouteServiceError> {
        self.slot(role, parent, NO_PREV_SIBLING).await
    }

    /// The unique sibling whose `prev_sibling` is `node.id`
    pub async fn next_sibling(
        &self,
        node: &RouteNode,
    ) -> Result<Option<RouteNode>, RouteServiceError> {
        self.slot(&node.role, node.parent, node.id).await
    }

    /// The sibling `node.prev_sibling` points at
    pub async fn prev_sibling_node(
        &self,
        node: &RouteNode,
    ) -> Result<Option<RouteNode>, RouteServiceError> {
        if node.is_first() {
            return Ok(None);
        }

        match self.store.find_by_id(node.prev_sibling).await? {
            Some(prev) if prev.role == node.role && prev.parent == node.parent => Ok(Some(prev)),
            Some(prev) => Err(integrity(format!(
                "route {} points at {} which belongs to (role '{}', parent {}), not its own group",
                node.id, prev.id, prev.role, prev.parent
            ))),
            None => Err(integrity(format!(
                "route {} points at missing previous sibling {}",
                node.id, node.prev_sibling
            ))),
        }
    }

    /// Number of siblings in `node`'s group, `node` included
    pub async fn sibling_count(&self, node: &RouteNode) -> Result<usize, RouteServiceError> {
        Ok(self.store.count_children(&node.role, node.parent).await? as usize)
    }

    /// Last node of `node`'s chain; O(siblings)
    pub async fn last_sibling(&self, node: &RouteNode) -> Result<RouteNode, RouteServiceError> {
        let limit = self.sibling_count(node).await?;
        let mut current = node.clone();
        let mut steps = 0usize;

        while let Some(next) = self.next_sibling(&current).await? {
            steps += 1;
            if steps > limit {
                return Err(integrity(format!(
                    "sibling chain of (role '{}', parent {}) loops after route {}",
                    node.role, node.parent, node.id
                )));
            }
            current = next;
        }

        Ok(current)
    }

    /// 1-based rank of `node` among its siblings; O(siblings)
    pub async fn node_index(&self, node: &RouteNode) -> Result<usize, RouteServiceError> {
        let limit = self.sibling_count(node).await?;
        let mut checker = self.first_child(&node.role, node.parent).await?;
        let mut index = 1usize;

        while let Some(current) = checker {
            if current.id == node.id {
                return Ok(index);
            }
            index += 1;
            if index > limit {
                break;
            }
            checker = self.next_sibling(&current).await?;
        }

        Err(integrity(format!(
            "route {} ('{}') is not reachable from the head of its sibling chain",
            node.id, node.name
        )))
    }

    /// Children of `parent` in sibling order, verifying the whole chain
    pub async fn ordered_children(
        &self,
        role: &str,
        parent: i64,
    ) -> Result<Vec<RouteNode>, RouteServiceError> {
        let expected = self.store.count_children(role, parent).await? as usize;
        if expected == 0 {
            return Ok(Vec::new());
        }

        let Some(head) = self.first_child(role, parent).await? else {
            return Err(integrity(format!(
                "sibling group (role '{}', parent {}) has {} nodes but no head",
                role, parent, expected
            )));
        };

        let mut visited = HashSet::with_capacity(expected);
        let mut ordered = Vec::with_capacity(expected);
        let mut current = Some(head);

        while let Some(node) = current {
            if !visited.insert(node.id) || ordered.len() >= expected {
                return Err(integrity(format!(
                    "sibling chain of (role '{}', parent {}) revisits route {}",
                    role, parent, node.id
                )));
            }
            current = self.next_sibling(&node).await?;
            ordered.push(node);
        }

        if ordered.len() != expected {
            return Err(integrity(format!(
                "sibling chain of (role '{}', parent {}) reaches {} of {} nodes",
                role,
                parent,
                ordered.len(),
                expected
            )));
        }

        Ok(ordered)
    }

    /// Whether `ancestor` is `node_id` itself or lies on its parent path
    pub async fn is_ancestor_or_self(
        &self,
        ancestor: i64,
        node_id: i64,
        max_depth: usize,
    ) -> Result<bool, RouteServiceError> {
        let mut current = node_id;
        for _ in 0..=max_depth {
            if current == ancestor {
                return Ok(true);
            }
            if current == ROOT_PARENT {
                return Ok(false);
            }
            current = match self.store.find_by_id(current).await? {
                Some(node) => node.parent,
                None => {
                    return Err(integrity(format!(
                        "parent path of route {} reaches missing route {}",
                        node_id, current
                    )))
                }
            };
        }

        Err(integrity(format!(
            "parent path of route {} is deeper than {} levels",
            node_id, max_depth
        )))
    }

    /// Build the nested tree of `role`
    ///
    /// Fails with an integrity violation when the nesting exceeds `max_depth`
    /// or when some rows of the role are not reachable from its roots.
    pub async fn materialize(
        &self,
        role: &str,
        max_depth: usize,
    ) -> Result<RouteTree, RouteServiceError> {
        let (routes, visited) = self.materialize_level(role, ROOT_PARENT, 1, max_depth).await?;

        let stored = self.store.count_in_role(role).await? as usize;
        if visited != stored {
            return Err(integrity(format!(
                "role '{}' has {} routes but only {} are reachable from its roots",
                role, stored, visited
            )));
        }

        tracing::debug!(role, routes = visited, "Materialized route tree");
        Ok(RouteTree {
            role: role.to_string(),
            routes,
        })
    }

    fn materialize_level<'a>(
        &'a self,
        role: &'a str,
        parent: i64,
        depth: usize,
        max_depth: usize,
    ) -> LevelFuture<'a> {
        Box::pin(async move {
            let siblings = self.ordered_children(role, parent).await?;
            if siblings.is_empty() {
                return Ok((Vec::new(), 0));
            }
            if depth > max_depth {
                return Err(integrity(format!(
                    "route tree of role '{}' is nested deeper than {} levels below route {}",
                    role, max_depth, parent
                )));
            }

            let mut level = Vec::with_capacity(siblings.len());
            let mut visited = 0usize;
            for node in siblings {
                let (children, below) = self
                    .materialize_level(role, node.id, depth + 1, max_depth)
                    .await?;
                visited += 1 + below;
                level.push(RouteTreeNode::from_node(node, children));
            }
            Ok((level, visited))
        })
    }
}

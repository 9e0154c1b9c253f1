//! Organizational hierarchy.
//!
//! Members form a strict reporting tree kept in an arena keyed by member id;
//! parent/child references are ids, never live pointers. Each node carries a
//! materialized `path` (`/r1/r2/.../self/`) so subtree and ancestor questions
//! are string-prefix tests instead of recursive walks — the permission layer
//! asks them on nearly every request.
//!
//! Structural mutations return the full list of [`PathUpdate`]s they produced
//! so the storage layer can apply them inside one transaction; a reader must
//! never observe a half-rewritten subtree.

use std::collections::{HashMap, VecDeque};

use crate::errors::AppError;
use crate::permissions::AccessLevel;

/// Path segment separator. Root path is `/<id>/`, a child appends `<id>/`.
pub const PATH_SEP: char = '/';

/// A member's position in the reporting tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgNode {
    pub id: String,
    pub display_name: String,
    pub access_level: AccessLevel,
    pub parent: Option<String>,
    pub path: String,
    pub depth: i64,
}

/// One row rewrite produced by a structural mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathUpdate {
    pub id: String,
    pub parent: Option<String>,
    pub path: String,
    pub depth: i64,
}

fn root_path(id: &str) -> String {
    format!("{PATH_SEP}{id}{PATH_SEP}")
}

fn child_path(parent_path: &str, id: &str) -> String {
    format!("{parent_path}{id}{PATH_SEP}")
}

/// Arena of org nodes with subtree/ancestor queries and structural mutation.
#[derive(Debug, Default)]
pub struct OrgTree {
    nodes: HashMap<String, OrgNode>,
}

impl OrgTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_nodes(nodes: impl IntoIterator<Item = OrgNode>) -> Self {
        Self {
            nodes: nodes.into_iter().map(|n| (n.id.clone(), n)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OrgNode> {
        self.nodes.values()
    }

    pub fn get(&self, id: &str) -> Result<&OrgNode, AppError> {
        self.nodes
            .get(id)
            .ok_or_else(|| AppError::NotFound(format!("Member {} not found", id)))
    }

    /// Add a new member under `parent` (or as a root). Path and depth are
    /// computed here; the returned update is what the caller persists.
    pub fn insert(
        &mut self,
        id: String,
        display_name: String,
        access_level: AccessLevel,
        parent: Option<&str>,
    ) -> Result<PathUpdate, AppError> {
        if self.nodes.contains_key(&id) {
            return Err(AppError::Validation(format!("Member {} already exists", id)));
        }
        let (path, depth, parent_id) = match parent {
            Some(pid) => {
                let parent_node = self.get(pid)?;
                (
                    child_path(&parent_node.path, &id),
                    parent_node.depth + 1,
                    Some(pid.to_string()),
                )
            }
            None => (root_path(&id), 0, None),
        };
        let node = OrgNode {
            id: id.clone(),
            display_name,
            access_level,
            parent: parent_id.clone(),
            path: path.clone(),
            depth,
        };
        self.nodes.insert(id.clone(), node);
        Ok(PathUpdate {
            id,
            parent: parent_id,
            path,
            depth,
        })
    }

    /// Reparent `id` under `new_parent` (or make it a root).
    ///
    /// Rejects with `CycleError` when the new parent is the member itself or
    /// lies inside the member's own subtree. Recomputes path/depth for the
    /// member **and every descendant** — descendant paths textually embed the
    /// ancestor chain and would otherwise go stale.
    pub fn attach(&mut self, id: &str, new_parent: Option<&str>) -> Result<Vec<PathUpdate>, AppError> {
        let member_path = self.get(id)?.path.clone();
        let (path, depth, parent_id) = match new_parent {
            Some(pid) => {
                let parent_node = self.get(pid)?;
                if parent_node.path.starts_with(&member_path) {
                    return Err(AppError::Cycle(format!(
                        "Member {} cannot report to {}: it is in their own subtree",
                        id, pid
                    )));
                }
                (
                    child_path(&parent_node.path, id),
                    parent_node.depth + 1,
                    Some(pid.to_string()),
                )
            }
            None => (root_path(id), 0, None),
        };

        let mut updates = Vec::new();
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent = parent_id.clone();
            node.path = path.clone();
            node.depth = depth;
            updates.push(PathUpdate {
                id: id.to_string(),
                parent: parent_id,
                path,
                depth,
            });
        }
        self.recompute_descendants(id, &mut updates);
        Ok(updates)
    }

    /// Remove `id`, reattaching its direct children to its former parent and
    /// recomputing every reattached descendant. Used only by deletion.
    pub fn remove_and_reconnect(&mut self, id: &str) -> Result<Vec<PathUpdate>, AppError> {
        let grandparent = self.get(id)?.parent.clone();
        let children: Vec<String> = self.children_of(id).iter().map(|n| n.id.clone()).collect();

        let mut updates = Vec::new();
        for child in children {
            let (path, depth) = match grandparent.as_deref() {
                Some(gid) => {
                    let g = self.get(gid)?;
                    (child_path(&g.path, &child), g.depth + 1)
                }
                None => (root_path(&child), 0),
            };
            if let Some(node) = self.nodes.get_mut(&child) {
                node.parent = grandparent.clone();
                node.path = path.clone();
                node.depth = depth;
                updates.push(PathUpdate {
                    id: child.clone(),
                    parent: grandparent.clone(),
                    path,
                    depth,
                });
            }
            self.recompute_descendants(&child, &mut updates);
        }
        self.nodes.remove(id);
        Ok(updates)
    }

    /// Iterative breadth-first rewrite of every descendant of `root_id`,
    /// reading each parent's already-updated path. Iterative on purpose:
    /// deep trees must not hit the call stack.
    fn recompute_descendants(&mut self, root_id: &str, updates: &mut Vec<PathUpdate>) {
        let mut queue = VecDeque::from([root_id.to_string()]);
        while let Some(pid) = queue.pop_front() {
            let (parent_path, parent_depth) = match self.nodes.get(&pid) {
                Some(p) => (p.path.clone(), p.depth),
                None => continue,
            };
            let child_ids: Vec<String> = self
                .nodes
                .values()
                .filter(|n| n.parent.as_deref() == Some(pid.as_str()))
                .map(|n| n.id.clone())
                .collect();
            for cid in child_ids {
                if let Some(node) = self.nodes.get_mut(&cid) {
                    node.path = child_path(&parent_path, &cid);
                    node.depth = parent_depth + 1;
                    updates.push(PathUpdate {
                        id: cid.clone(),
                        parent: Some(pid.clone()),
                        path: node.path.clone(),
                        depth: node.depth,
                    });
                }
                queue.push_back(cid);
            }
        }
    }

    /// Direct reports of `id`.
    pub fn children_of(&self, id: &str) -> Vec<&OrgNode> {
        self.nodes
            .values()
            .filter(|n| n.parent.as_deref() == Some(id))
            .collect()
    }

    /// The member and all descendants, by path-prefix match.
    pub fn subtree_of(&self, id: &str) -> Result<Vec<&OrgNode>, AppError> {
        let prefix = &self.get(id)?.path;
        Ok(self
            .nodes
            .values()
            .filter(|n| n.path.starts_with(prefix.as_str()))
            .collect())
    }

    /// All descendants, self excluded.
    pub fn descendants_of(&self, id: &str) -> Result<Vec<&OrgNode>, AppError> {
        let mut nodes = self.subtree_of(id)?;
        nodes.retain(|n| n.id != id);
        Ok(nodes)
    }

    /// Ancestors of `id`, nearest first (parent, grandparent, ..., root).
    /// Empty for a root member.
    pub fn ancestors_of(&self, id: &str) -> Result<Vec<&OrgNode>, AppError> {
        let node = self.get(id)?;
        let mut ancestors = Vec::new();
        for segment in node.path.split(PATH_SEP).rev() {
            if segment.is_empty() || segment == id {
                continue;
            }
            ancestors.push(self.get(segment)?);
        }
        Ok(ancestors)
    }

    /// True if `candidate` is `target` itself or an ancestor of it.
    pub fn is_ancestor_of(&self, candidate: &str, target: &str) -> Result<bool, AppError> {
        let candidate_node = self.get(candidate)?;
        let target_node = self.get(target)?;
        Ok(candidate == target || target_node.path.starts_with(candidate_node.path.as_str()))
    }

    /// Debug check of the path/depth invariants; used by tests.
    #[cfg(test)]
    pub fn check_invariants(&self) {
        let mut seen = std::collections::HashSet::new();
        for node in self.nodes.values() {
            match node.parent.as_deref() {
                Some(pid) => {
                    let parent = self.nodes.get(pid).expect("dangling parent");
                    assert_eq!(node.path, child_path(&parent.path, &node.id), "{}", node.id);
                    assert_eq!(node.depth, parent.depth + 1, "{}", node.id);
                }
                None => {
                    assert_eq!(node.path, root_path(&node.id), "{}", node.id);
                    assert_eq!(node.depth, 0, "{}", node.id);
                }
            }
            // Acyclicity: a member's id appears in its own path exactly once.
            let occurrences = node
                .path
                .split(PATH_SEP)
                .filter(|s| *s == node.id)
                .count();
            assert_eq!(occurrences, 1, "{} appears {} times in its path", node.id, occurrences);
            assert!(seen.insert(node.id.clone()));
        }
    }
}

//! Role-based access resolution.
//!
//! `PermissionResolver` is a pure decision layer over the org tree and the
//! membership index. What each access level may see or touch is data, not
//! code: a declarative [`PolicyTable`] maps level to scope rule per
//! operation, and one generic resolver function per operation interprets
//! the rule. Adding a level or an operation is a table edit.
//!
//! Denial is `Ok(false)`, never an error; only unknown ids produce errors.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::hierarchy::OrgTree;
use crate::membership::MembershipIndex;

/// Ordered privilege tier. Lower tier number = more privileged.
///
/// The same vocabulary doubles as the role label on team and pocket
/// memberships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessLevel {
    Admin = 1,
    Regional = 2,
    LocalLeader = 3,
    ShiftLeader = 4,
    General = 5,
    Base = 6,
}

impl AccessLevel {
    /// Numeric tier as stored in the database.
    pub fn tier(self) -> i64 {
        self as i64
    }

    pub fn from_tier(tier: i64) -> Option<Self> {
        match tier {
            1 => Some(AccessLevel::Admin),
            2 => Some(AccessLevel::Regional),
            3 => Some(AccessLevel::LocalLeader),
            4 => Some(AccessLevel::ShiftLeader),
            5 => Some(AccessLevel::General),
            6 => Some(AccessLevel::Base),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AccessLevel::Admin => "ADMIN",
            AccessLevel::Regional => "REGIONAL",
            AccessLevel::LocalLeader => "LOCAL_LEADER",
            AccessLevel::ShiftLeader => "SHIFT_LEADER",
            AccessLevel::General => "GENERAL",
            AccessLevel::Base => "BASE",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "ADMIN" => Some(AccessLevel::Admin),
            "REGIONAL" => Some(AccessLevel::Regional),
            "LOCAL_LEADER" => Some(AccessLevel::LocalLeader),
            "SHIFT_LEADER" => Some(AccessLevel::ShiftLeader),
            "GENERAL" => Some(AccessLevel::General),
            "BASE" => Some(AccessLevel::Base),
            _ => None,
        }
    }

    /// Team creation is open to Admin, Regional and LocalLeader.
    pub fn can_create_team(self) -> bool {
        self <= AccessLevel::LocalLeader
    }
}

/// Scope rule for viewing another member's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewScope {
    Everyone,
    Subtree,
    SharedTeam,
    SelfOnly,
}

/// Scope rule for editing / adding data for another member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditScope {
    Everyone,
    Subtree,
    OwnedTeamMembers,
    SharedTeam,
    SelfOnly,
}

/// Scope rule for mutating a team (membership, rename, pockets).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamEditScope {
    All,
    SubtreeOwned,
    OwnedOrLeaderRole,
    Denied,
}

/// Scope rule for viewing a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamViewScope {
    All,
    SubtreeOwned,
    OwnedOrMember,
    MemberTeams,
    Denied,
}

/// Per-level scope rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelPolicy {
    pub view: ViewScope,
    pub edit: EditScope,
    pub team_view: TeamViewScope,
    pub team_edit: TeamEditScope,
}

/// The full AccessLevel policy table. Loaded from config when a policy
/// file is given; otherwise the built-in default applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyTable {
    pub admin: LevelPolicy,
    pub regional: LevelPolicy,
    pub local_leader: LevelPolicy,
    pub shift_leader: LevelPolicy,
    pub general: LevelPolicy,
    pub base: LevelPolicy,
}

impl PolicyTable {
    pub fn level(&self, level: AccessLevel) -> LevelPolicy {
        match level {
            AccessLevel::Admin => self.admin,
            AccessLevel::Regional => self.regional,
            AccessLevel::LocalLeader => self.local_leader,
            AccessLevel::ShiftLeader => self.shift_leader,
            AccessLevel::General => self.general,
            AccessLevel::Base => self.base,
        }
    }

    /// Parse a policy table from a JSON document.
    pub fn from_json(raw: &str) -> Result<Self, AppError> {
        serde_json::from_str(raw)
            .map_err(|e| AppError::Validation(format!("Invalid policy table: {}", e)))
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        let self_only = LevelPolicy {
            view: ViewScope::SelfOnly,
            edit: EditScope::SelfOnly,
            team_view: TeamViewScope::Denied,
            team_edit: TeamEditScope::Denied,
        };
        Self {
            admin: LevelPolicy {
                view: ViewScope::Everyone,
                edit: EditScope::Everyone,
                team_view: TeamViewScope::All,
                team_edit: TeamEditScope::All,
            },
            regional: LevelPolicy {
                view: ViewScope::Subtree,
                edit: EditScope::Subtree,
                team_view: TeamViewScope::SubtreeOwned,
                team_edit: TeamEditScope::SubtreeOwned,
            },
            local_leader: LevelPolicy {
                view: ViewScope::Subtree,
                edit: EditScope::OwnedTeamMembers,
                team_view: TeamViewScope::OwnedOrMember,
                team_edit: TeamEditScope::OwnedOrLeaderRole,
            },
            shift_leader: LevelPolicy {
                view: ViewScope::SharedTeam,
                edit: EditScope::SharedTeam,
                team_view: TeamViewScope::MemberTeams,
                team_edit: TeamEditScope::Denied,
            },
            general: self_only,
            base: self_only,
        }
    }
}

/// Pure permission decisions over a consistent snapshot of the org tree
/// and the membership index.
pub struct PermissionResolver<'a> {
    tree: &'a OrgTree,
    memberships: &'a MembershipIndex,
    policy: &'a PolicyTable,
}

impl<'a> PermissionResolver<'a> {
    pub fn new(
        tree: &'a OrgTree,
        memberships: &'a MembershipIndex,
        policy: &'a PolicyTable,
    ) -> Self {
        Self {
            tree,
            memberships,
            policy,
        }
    }

    pub fn tree(&self) -> &'a OrgTree {
        self.tree
    }

    pub fn memberships(&self) -> &'a MembershipIndex {
        self.memberships
    }

    /// May `actor` view `target`'s data?
    pub fn can_view(&self, actor: &str, target: &str) -> Result<bool, AppError> {
        let actor_node = self.tree.get(actor)?;
        self.tree.get(target)?;
        if actor == target {
            return Ok(true);
        }
        let allowed = match self.policy.level(actor_node.access_level).view {
            ViewScope::Everyone => true,
            ViewScope::Subtree => self.tree.is_ancestor_of(actor, target)?,
            ViewScope::SharedTeam => self.memberships.shares_team(actor, target),
            ViewScope::SelfOnly => false,
        };
        Ok(allowed)
    }

    /// May `actor` edit `target`'s profile or add activity data for them?
    pub fn can_edit(&self, actor: &str, target: &str) -> Result<bool, AppError> {
        let actor_node = self.tree.get(actor)?;
        self.tree.get(target)?;
        if actor == target {
            return Ok(true);
        }
        let allowed = match self.policy.level(actor_node.access_level).edit {
            EditScope::Everyone => true,
            EditScope::Subtree => self.tree.is_ancestor_of(actor, target)?,
            EditScope::OwnedTeamMembers => self
                .memberships
                .teams_owned_by(actor)
                .iter()
                .any(|team_id| self.memberships.is_member_of_team(target, team_id)),
            EditScope::SharedTeam => self.memberships.shares_team(actor, target),
            EditScope::SelfOnly => false,
        };
        Ok(allowed)
    }

    /// May `actor` view a team's data, members and pockets?
    pub fn can_view_team(&self, actor: &str, team_id: &str) -> Result<bool, AppError> {
        let actor_node = self.tree.get(actor)?;
        let team = self.memberships.team(team_id)?;
        let allowed = match self.policy.level(actor_node.access_level).team_view {
            TeamViewScope::All => true,
            TeamViewScope::SubtreeOwned => self.owner_in_subtree(actor, team.owner.as_deref())?,
            TeamViewScope::OwnedOrMember => {
                team.owner.as_deref() == Some(actor)
                    || self.memberships.is_member_of_team(actor, team_id)
            }
            TeamViewScope::MemberTeams => self.memberships.is_member_of_team(actor, team_id),
            TeamViewScope::Denied => false,
        };
        Ok(allowed)
    }

    /// May `actor` mutate a team: rename, transfer, membership, pockets?
    pub fn can_edit_team(&self, actor: &str, team_id: &str) -> Result<bool, AppError> {
        let actor_node = self.tree.get(actor)?;
        let team = self.memberships.team(team_id)?;
        let allowed = match self.policy.level(actor_node.access_level).team_edit {
            TeamEditScope::All => true,
            TeamEditScope::SubtreeOwned => self.owner_in_subtree(actor, team.owner.as_deref())?,
            TeamEditScope::OwnedOrLeaderRole => {
                team.owner.as_deref() == Some(actor)
                    || self.memberships.role_of(actor, team_id) == Some(AccessLevel::LocalLeader)
            }
            TeamEditScope::Denied => false,
        };
        Ok(allowed)
    }

    /// May `actor` create a new team?
    pub fn can_create_team(&self, actor: &str) -> Result<bool, AppError> {
        Ok(self.tree.get(actor)?.access_level.can_create_team())
    }

    /// Members `actor` may view. Consistent with [`Self::can_view`]:
    /// `target ∈ viewable_members(actor) ⇔ can_view(actor, target)`.
    pub fn viewable_members(&self, actor: &str) -> Result<HashSet<String>, AppError> {
        let actor_node = self.tree.get(actor)?;
        let set = match self.policy.level(actor_node.access_level).view {
            ViewScope::Everyone => self.tree.iter().map(|n| n.id.clone()).collect(),
            ViewScope::Subtree => self
                .tree
                .subtree_of(actor)?
                .into_iter()
                .map(|n| n.id.clone())
                .collect(),
            ViewScope::SharedTeam => self.teammates_and_self(actor),
            ViewScope::SelfOnly => HashSet::from([actor.to_string()]),
        };
        Ok(set)
    }

    /// Members `actor` may edit / add data for.
    pub fn editable_members(&self, actor: &str) -> Result<HashSet<String>, AppError> {
        let actor_node = self.tree.get(actor)?;
        let set = match self.policy.level(actor_node.access_level).edit {
            EditScope::Everyone => self.tree.iter().map(|n| n.id.clone()).collect(),
            EditScope::Subtree => self
                .tree
                .subtree_of(actor)?
                .into_iter()
                .map(|n| n.id.clone())
                .collect(),
            EditScope::OwnedTeamMembers => {
                let mut set = HashSet::from([actor.to_string()]);
                for team_id in self.memberships.teams_owned_by(actor) {
                    for member in self.memberships.members_of_team(&team_id) {
                        set.insert(member.clone());
                    }
                }
                set
            }
            EditScope::SharedTeam => self.teammates_and_self(actor),
            EditScope::SelfOnly => HashSet::from([actor.to_string()]),
        };
        Ok(set)
    }

    /// Teams `actor` may view.
    pub fn viewable_teams(&self, actor: &str) -> Result<HashSet<String>, AppError> {
        let actor_node = self.tree.get(actor)?;
        let set = match self.policy.level(actor_node.access_level).team_view {
            TeamViewScope::All => self.memberships.team_ids().collect(),
            TeamViewScope::SubtreeOwned => self.subtree_owned_teams(actor)?,
            TeamViewScope::OwnedOrMember => {
                let mut set: HashSet<String> =
                    self.memberships.teams_owned_by(actor).into_iter().collect();
                set.extend(self.memberships.teams_of(actor).into_iter());
                set
            }
            TeamViewScope::MemberTeams => self.memberships.teams_of(actor).into_iter().collect(),
            TeamViewScope::Denied => HashSet::new(),
        };
        Ok(set)
    }

    /// Teams `actor` may mutate.
    pub fn editable_teams(&self, actor: &str) -> Result<HashSet<String>, AppError> {
        let actor_node = self.tree.get(actor)?;
        let set = match self.policy.level(actor_node.access_level).team_edit {
            TeamEditScope::All => self.memberships.team_ids().collect(),
            TeamEditScope::SubtreeOwned => self.subtree_owned_teams(actor)?,
            TeamEditScope::OwnedOrLeaderRole => {
                let mut set: HashSet<String> =
                    self.memberships.teams_owned_by(actor).into_iter().collect();
                for team_id in self.memberships.teams_of(actor) {
                    if self.memberships.role_of(actor, &team_id) == Some(AccessLevel::LocalLeader) {
                        set.insert(team_id);
                    }
                }
                set
            }
            TeamEditScope::Denied => HashSet::new(),
        };
        Ok(set)
    }

    fn owner_in_subtree(&self, actor: &str, owner: Option<&str>) -> Result<bool, AppError> {
        match owner {
            // Owner may have been deleted since the team was created.
            Some(owner_id) if self.tree.contains(owner_id) => {
                self.tree.is_ancestor_of(actor, owner_id)
            }
            _ => Ok(false),
        }
    }

    fn subtree_owned_teams(&self, actor: &str) -> Result<HashSet<String>, AppError> {
        let mut set = HashSet::new();
        for team_id in self.memberships.team_ids() {
            let team = self.memberships.team(&team_id)?;
            if self.owner_in_subtree(actor, team.owner.as_deref())? {
                set.insert(team_id);
            }
        }
        Ok(set)
    }

    fn teammates_and_self(&self, actor: &str) -> HashSet<String> {
        let mut set = HashSet::from([actor.to_string()]);
        for team_id in self.memberships.teams_of(actor) {
            for member in self.memberships.members_of_team(&team_id) {
                set.insert(member.clone());
            }
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::OrgTree;
    use crate::membership::{MembershipIndex, PocketRow, PocketMembershipRow, TeamMembershipRow, TeamRow};

    fn member(tree: &mut OrgTree, id: &str, level: AccessLevel, parent: Option<&str>) {
        tree.insert(id.to_string(), id.to_string(), level, parent)
            .expect("insert");
    }

    /// Root R (Admin); A (Regional) under R; B (LocalLeader) under A;
    /// S (ShiftLeader) and X (Base) under B; Y (Base) under A.
    /// Team T owned by B with members S and X; Y has no team.
    fn fixture() -> (OrgTree, MembershipIndex) {
        let mut tree = OrgTree::new();
        member(&mut tree, "R", AccessLevel::Admin, None);
        member(&mut tree, "A", AccessLevel::Regional, Some("R"));
        member(&mut tree, "B", AccessLevel::LocalLeader, Some("A"));
        member(&mut tree, "S", AccessLevel::ShiftLeader, Some("B"));
        member(&mut tree, "X", AccessLevel::Base, Some("B"));
        member(&mut tree, "Y", AccessLevel::Base, Some("A"));

        let teams = vec![TeamRow {
            id: "T".into(),
            name: "Team T".into(),
            owner: Some("B".into()),
        }];
        let team_rows = vec![
            TeamMembershipRow {
                team_id: "T".into(),
                member_id: "S".into(),
                role: AccessLevel::ShiftLeader,
            },
            TeamMembershipRow {
                team_id: "T".into(),
                member_id: "X".into(),
                role: AccessLevel::Base,
            },
        ];
        let index = MembershipIndex::new(teams, Vec::<PocketRow>::new(), team_rows, Vec::<PocketMembershipRow>::new());
        (tree, index)
    }

    #[test]
    fn reflexivity_for_every_level() {
        let (tree, index) = fixture();
        let policy = PolicyTable::default();
        let resolver = PermissionResolver::new(&tree, &index, &policy);
        for id in ["R", "A", "B", "S", "X", "Y"] {
            assert!(resolver.can_view(id, id).unwrap(), "{id} must view self");
            assert!(resolver.can_edit(id, id).unwrap(), "{id} must edit self");
        }
    }

    #[test]
    fn admin_views_everyone_subordinate_does_not_view_up() {
        let (tree, index) = fixture();
        let policy = PolicyTable::default();
        let resolver = PermissionResolver::new(&tree, &index, &policy);
        assert!(resolver.can_view("R", "B").unwrap());
        assert!(!resolver.can_view("B", "R").unwrap());
    }

    #[test]
    fn shift_leader_sees_teammates_only() {
        let (tree, index) = fixture();
        let policy = PolicyTable::default();
        let resolver = PermissionResolver::new(&tree, &index, &policy);
        // Shared team with X, no team overlap with Y.
        assert!(resolver.can_view("S", "X").unwrap());
        assert!(!resolver.can_view("S", "Y").unwrap());
        assert!(resolver.can_edit("S", "X").unwrap());
    }

    #[test]
    fn local_leader_edits_own_team_members_not_whole_subtree() {
        let (tree, index) = fixture();
        let policy = PolicyTable::default();
        let resolver = PermissionResolver::new(&tree, &index, &policy);
        // X is in B's team; S too. Both editable. Y is not under any team B owns.
        assert!(resolver.can_edit("B", "X").unwrap());
        assert!(!resolver.can_edit("B", "Y").unwrap());
        // But B can still view its whole subtree.
        assert!(resolver.can_view("B", "X").unwrap());
    }

    #[test]
    fn team_predicates() {
        let (tree, index) = fixture();
        let policy = PolicyTable::default();
        let resolver = PermissionResolver::new(&tree, &index, &policy);
        assert!(resolver.can_edit_team("R", "T").unwrap());
        // Owner B is in A's subtree.
        assert!(resolver.can_edit_team("A", "T").unwrap());
        assert!(resolver.can_edit_team("B", "T").unwrap());
        assert!(!resolver.can_edit_team("S", "T").unwrap());
        assert!(resolver.can_view_team("S", "T").unwrap());
        // Base members never see teams, even their own.
        assert!(!resolver.can_view_team("X", "T").unwrap());
        assert!(!resolver.can_view_team("Y", "T").unwrap());
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let (tree, index) = fixture();
        let policy = PolicyTable::default();
        let resolver = PermissionResolver::new(&tree, &index, &policy);
        assert!(matches!(
            resolver.can_view("nope", "R"),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            resolver.can_view("R", "nope"),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            resolver.can_view_team("R", "nope"),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn sets_agree_with_pairwise_predicates() {
        let (tree, index) = fixture();
        let policy = PolicyTable::default();
        let resolver = PermissionResolver::new(&tree, &index, &policy);
        let ids = ["R", "A", "B", "S", "X", "Y"];
        for actor in ids {
            let viewable = resolver.viewable_members(actor).unwrap();
            let editable = resolver.editable_members(actor).unwrap();
            for target in ids {
                assert_eq!(
                    viewable.contains(target),
                    resolver.can_view(actor, target).unwrap(),
                    "view set mismatch for ({actor}, {target})"
                );
                assert_eq!(
                    editable.contains(target),
                    resolver.can_edit(actor, target).unwrap(),
                    "edit set mismatch for ({actor}, {target})"
                );
            }
            let viewable_teams = resolver.viewable_teams(actor).unwrap();
            let editable_teams = resolver.editable_teams(actor).unwrap();
            assert_eq!(
                viewable_teams.contains("T"),
                resolver.can_view_team(actor, "T").unwrap(),
                "team view set mismatch for {actor}"
            );
            assert_eq!(
                editable_teams.contains("T"),
                resolver.can_edit_team(actor, "T").unwrap(),
                "team edit set mismatch for {actor}"
            );
        }
    }

    #[test]
    fn policy_table_round_trips_from_json() {
        let default = PolicyTable::default();
        let raw = serde_json::to_string(&default).unwrap();
        assert_eq!(PolicyTable::from_json(&raw).unwrap(), default);
    }

    #[test]
    fn create_team_threshold() {
        let (tree, index) = fixture();
        let policy = PolicyTable::default();
        let resolver = PermissionResolver::new(&tree, &index, &policy);
        assert!(resolver.can_create_team("R").unwrap());
        assert!(resolver.can_create_team("B").unwrap());
        assert!(!resolver.can_create_team("S").unwrap());
        assert!(!resolver.can_create_team("X").unwrap());
    }
}

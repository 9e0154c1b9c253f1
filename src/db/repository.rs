//! Database repository for CRUD operations.
//!
//! Uses prepared statements and transactions for data integrity. Structural
//! hierarchy mutations take the [`PathUpdate`] list computed by the in-memory
//! tree and apply every row rewrite inside one transaction, so no reader ever
//! sees a half-moved subtree.

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::hierarchy::{OrgNode, OrgTree, PathUpdate};
use crate::membership::{
    MembershipIndex, PocketMembershipRow, PocketRow, TeamMembershipRow, TeamRow,
};
use crate::models::{
    Activity, ActivityKind, Member, Notification, Pocket, PocketMembership, Team, TeamMembership,
    WeeklyTarget,
};
use crate::permissions::{AccessLevel, PermissionResolver, PolicyTable};

/// Consistent point-in-time view of the org tree and all memberships,
/// loaded once per request.
pub struct OrgSnapshot {
    pub org: OrgTree,
    pub memberships: MembershipIndex,
}

impl OrgSnapshot {
    pub fn resolver<'a>(&'a self, policy: &'a PolicyTable) -> PermissionResolver<'a> {
        PermissionResolver::new(&self.org, &self.memberships, policy)
    }
}

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== SNAPSHOT LOADING ====================

    /// Load the full org tree into memory.
    pub async fn load_org_tree(&self) -> Result<OrgTree, AppError> {
        let rows = sqlx::query(
            "SELECT id, display_name, access_level, parent_id, path, depth FROM members",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut nodes = Vec::with_capacity(rows.len());
        for row in &rows {
            nodes.push(OrgNode {
                id: row.get("id"),
                display_name: row.get("display_name"),
                access_level: access_level_from_tier(row.get("access_level"))?,
                parent: row.get("parent_id"),
                path: row.get("path"),
                depth: row.get("depth"),
            });
        }
        Ok(OrgTree::from_nodes(nodes))
    }

    /// Load team and pocket membership facts into memory.
    pub async fn load_membership_index(&self) -> Result<MembershipIndex, AppError> {
        let team_rows = sqlx::query("SELECT id, name, owner_id FROM teams")
            .fetch_all(&self.pool)
            .await?;
        let teams: Vec<TeamRow> = team_rows
            .into_iter()
            .map(|row| TeamRow {
                id: row.get("id"),
                name: row.get("name"),
                owner: row.get("owner_id"),
            })
            .collect();

        let pocket_rows = sqlx::query("SELECT id, team_id, name, active FROM pockets")
            .fetch_all(&self.pool)
            .await?;
        let pockets: Vec<PocketRow> = pocket_rows
            .into_iter()
            .map(|row| PocketRow {
                id: row.get("id"),
                team_id: row.get("team_id"),
                name: row.get("name"),
                active: row.get::<i64, _>("active") != 0,
            })
            .collect();

        let membership_rows =
            sqlx::query("SELECT team_id, member_id, role FROM team_members")
                .fetch_all(&self.pool)
                .await?;
        let mut team_memberships = Vec::with_capacity(membership_rows.len());
        for row in &membership_rows {
            team_memberships.push(TeamMembershipRow {
                team_id: row.get("team_id"),
                member_id: row.get("member_id"),
                role: role_from_label(row.get("role"))?,
            });
        }

        let pm_rows = sqlx::query(
            "SELECT pocket_id, team_id, member_id, role, is_lead FROM pocket_members",
        )
        .fetch_all(&self.pool)
        .await?;
        let mut pocket_memberships = Vec::with_capacity(pm_rows.len());
        for row in &pm_rows {
            pocket_memberships.push(PocketMembershipRow {
                pocket_id: row.get("pocket_id"),
                team_id: row.get("team_id"),
                member_id: row.get("member_id"),
                role: role_from_label(row.get("role"))?,
                is_lead: row.get::<i64, _>("is_lead") != 0,
            });
        }

        Ok(MembershipIndex::new(
            teams,
            pockets,
            team_memberships,
            pocket_memberships,
        ))
    }

    pub async fn snapshot(&self) -> Result<OrgSnapshot, AppError> {
        Ok(OrgSnapshot {
            org: self.load_org_tree().await?,
            memberships: self.load_membership_index().await?,
        })
    }

    // ==================== MEMBER OPERATIONS ====================

    /// List all members.
    pub async fn list_members(&self) -> Result<Vec<Member>, AppError> {
        let rows = sqlx::query(
            "SELECT id, display_name, email, access_level, active, parent_id, path, depth, created_at FROM members ORDER BY path",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(member_from_row).collect()
    }

    /// Get a member by ID.
    pub async fn get_member(&self, id: &str) -> Result<Option<Member>, AppError> {
        let row = sqlx::query(
            "SELECT id, display_name, email, access_level, active, parent_id, path, depth, created_at FROM members WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(member_from_row).transpose()
    }

    /// Insert a newly registered member. The caller has already placed the
    /// member in the tree; `placement` carries the computed path and depth.
    pub async fn create_member(
        &self,
        placement: &PathUpdate,
        display_name: &str,
        email: Option<&str>,
        access_level: AccessLevel,
    ) -> Result<Member, AppError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO members (id, display_name, email, access_level, active, parent_id, path, depth, created_at) VALUES (?, ?, ?, ?, 1, ?, ?, ?, ?)",
        )
        .bind(&placement.id)
        .bind(display_name)
        .bind(email)
        .bind(access_level.tier())
        .bind(&placement.parent)
        .bind(&placement.path)
        .bind(placement.depth)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Member {
            id: placement.id.clone(),
            display_name: display_name.to_string(),
            email: email.map(str::to_string),
            access_level,
            active: true,
            parent_id: placement.parent.clone(),
            path: placement.path.clone(),
            depth: placement.depth,
            created_at: now,
        })
    }

    /// Update a member's profile fields. Hierarchy placement is not touched
    /// here; that goes through [`Self::apply_reparent`].
    pub async fn update_member(
        &self,
        id: &str,
        display_name: Option<&str>,
        email: Option<&str>,
        access_level: Option<AccessLevel>,
        active: Option<bool>,
    ) -> Result<Member, AppError> {
        let existing = self
            .get_member(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Member {} not found", id)))?;

        let display_name = display_name.unwrap_or(&existing.display_name);
        let email = email.map(str::to_string).or(existing.email.clone());
        let access_level = access_level.unwrap_or(existing.access_level);
        let active = active.unwrap_or(existing.active);

        sqlx::query(
            "UPDATE members SET display_name = ?, email = ?, access_level = ?, active = ? WHERE id = ?",
        )
        .bind(display_name)
        .bind(&email)
        .bind(access_level.tier())
        .bind(active as i32)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(Member {
            display_name: display_name.to_string(),
            email,
            access_level,
            active,
            ..existing
        })
    }

    /// Apply the row rewrites of a reparent in one transaction.
    pub async fn apply_reparent(&self, updates: &[PathUpdate]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        for update in updates {
            sqlx::query("UPDATE members SET parent_id = ?, path = ?, depth = ? WHERE id = ?")
                .bind(&update.parent)
                .bind(&update.path)
                .bind(update.depth)
                .bind(&update.id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Delete a member, reattaching their reports per `updates`, in one
    /// transaction. Memberships, activities, targets and notifications of the
    /// member go with them through foreign key cascades.
    pub async fn delete_member(&self, id: &str, updates: &[PathUpdate]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        for update in updates {
            sqlx::query("UPDATE members SET parent_id = ?, path = ?, depth = ? WHERE id = ?")
                .bind(&update.parent)
                .bind(&update.path)
                .bind(update.depth)
                .bind(&update.id)
                .execute(&mut *tx)
                .await?;
        }
        let result = sqlx::query("DELETE FROM members WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Member {} not found", id)));
        }
        tx.commit().await?;
        Ok(())
    }

    // ==================== TEAM OPERATIONS ====================

    pub async fn list_teams(&self) -> Result<Vec<Team>, AppError> {
        let rows = sqlx::query("SELECT id, name, owner_id, created_at FROM teams ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(team_from_row).collect())
    }

    pub async fn get_team(&self, id: &str) -> Result<Option<Team>, AppError> {
        let row = sqlx::query("SELECT id, name, owner_id, created_at FROM teams WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(team_from_row))
    }

    pub async fn create_team(&self, name: &str, owner_id: &str) -> Result<Team, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query("INSERT INTO teams (id, name, owner_id, created_at) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(name)
            .bind(owner_id)
            .bind(&now)
            .execute(&self.pool)
            .await?;
        Ok(Team {
            id,
            name: name.to_string(),
            owner_id: Some(owner_id.to_string()),
            created_at: now,
        })
    }

    pub async fn update_team(
        &self,
        id: &str,
        name: Option<&str>,
        owner_id: Option<&str>,
    ) -> Result<Team, AppError> {
        let existing = self
            .get_team(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Team {} not found", id)))?;

        let name = name.unwrap_or(&existing.name);
        let owner_id = owner_id.map(str::to_string).or(existing.owner_id.clone());

        sqlx::query("UPDATE teams SET name = ?, owner_id = ? WHERE id = ?")
            .bind(name)
            .bind(&owner_id)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(Team {
            name: name.to_string(),
            owner_id,
            ..existing
        })
    }

    pub async fn delete_team(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM teams WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Team {} not found", id)));
        }
        Ok(())
    }

    pub async fn team_memberships(&self, team_id: &str) -> Result<Vec<TeamMembership>, AppError> {
        let rows = sqlx::query(
            "SELECT team_id, member_id, role, joined_at FROM team_members WHERE team_id = ? ORDER BY joined_at",
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(team_membership_from_row).collect()
    }

    pub async fn add_team_member(
        &self,
        team_id: &str,
        member_id: &str,
        role: AccessLevel,
    ) -> Result<TeamMembership, AppError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO team_members (team_id, member_id, role, joined_at) VALUES (?, ?, ?, ?)",
        )
        .bind(team_id)
        .bind(member_id)
        .bind(role.as_str())
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(TeamMembership {
            team_id: team_id.to_string(),
            member_id: member_id.to_string(),
            role,
            joined_at: now,
        })
    }

    pub async fn remove_team_member(&self, team_id: &str, member_id: &str) -> Result<(), AppError> {
        let result =
            sqlx::query("DELETE FROM team_members WHERE team_id = ? AND member_id = ?")
                .bind(team_id)
                .bind(member_id)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Member {} is not in team {}",
                member_id, team_id
            )));
        }
        Ok(())
    }

    /// Move a member between teams: the removal and the insertion either
    /// both happen or neither does.
    pub async fn move_team_member(
        &self,
        member_id: &str,
        from_team_id: &str,
        to_team_id: &str,
        role: AccessLevel,
    ) -> Result<TeamMembership, AppError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM team_members WHERE team_id = ? AND member_id = ?")
            .bind(from_team_id)
            .bind(member_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::InvalidMove(format!(
                "Member {} is not in team {}",
                member_id, from_team_id
            )));
        }
        sqlx::query(
            "INSERT INTO team_members (team_id, member_id, role, joined_at) VALUES (?, ?, ?, ?)",
        )
        .bind(to_team_id)
        .bind(member_id)
        .bind(role.as_str())
        .bind(&now)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(TeamMembership {
            team_id: to_team_id.to_string(),
            member_id: member_id.to_string(),
            role,
            joined_at: now,
        })
    }

    // ==================== POCKET OPERATIONS ====================

    pub async fn list_pockets(&self, team_id: &str) -> Result<Vec<Pocket>, AppError> {
        let rows = sqlx::query(
            "SELECT id, team_id, name, active, created_at FROM pockets WHERE team_id = ? ORDER BY name",
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(pocket_from_row).collect())
    }

    pub async fn get_pocket(&self, id: &str) -> Result<Option<Pocket>, AppError> {
        let row =
            sqlx::query("SELECT id, team_id, name, active, created_at FROM pockets WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.as_ref().map(pocket_from_row))
    }

    pub async fn create_pocket(&self, team_id: &str, name: &str) -> Result<Pocket, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO pockets (id, team_id, name, active, created_at) VALUES (?, ?, ?, 1, ?)",
        )
        .bind(&id)
        .bind(team_id)
        .bind(name)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(Pocket {
            id,
            team_id: team_id.to_string(),
            name: name.to_string(),
            active: true,
            created_at: now,
        })
    }

    pub async fn update_pocket(
        &self,
        id: &str,
        name: Option<&str>,
        active: Option<bool>,
    ) -> Result<Pocket, AppError> {
        let existing = self
            .get_pocket(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Pocket {} not found", id)))?;

        let name = name.unwrap_or(&existing.name);
        let active = active.unwrap_or(existing.active);

        sqlx::query("UPDATE pockets SET name = ?, active = ? WHERE id = ?")
            .bind(name)
            .bind(active as i32)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(Pocket {
            name: name.to_string(),
            active,
            ..existing
        })
    }

    pub async fn delete_pocket(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM pockets WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Pocket {} not found", id)));
        }
        Ok(())
    }

    pub async fn pocket_memberships(
        &self,
        pocket_id: &str,
    ) -> Result<Vec<PocketMembership>, AppError> {
        let rows = sqlx::query(
            "SELECT pocket_id, team_id, member_id, role, is_lead, joined_at FROM pocket_members WHERE pocket_id = ? ORDER BY joined_at",
        )
        .bind(pocket_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(pocket_membership_from_row).collect()
    }

    pub async fn add_pocket_member(
        &self,
        pocket_id: &str,
        team_id: &str,
        member_id: &str,
        role: AccessLevel,
    ) -> Result<PocketMembership, AppError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO pocket_members (pocket_id, team_id, member_id, role, is_lead, joined_at) VALUES (?, ?, ?, ?, 0, ?)",
        )
        .bind(pocket_id)
        .bind(team_id)
        .bind(member_id)
        .bind(role.as_str())
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(PocketMembership {
            pocket_id: pocket_id.to_string(),
            team_id: team_id.to_string(),
            member_id: member_id.to_string(),
            role,
            is_lead: false,
            joined_at: now,
        })
    }

    pub async fn remove_pocket_member(
        &self,
        pocket_id: &str,
        member_id: &str,
    ) -> Result<(), AppError> {
        let result =
            sqlx::query("DELETE FROM pocket_members WHERE pocket_id = ? AND member_id = ?")
                .bind(pocket_id)
                .bind(member_id)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Member {} is not in pocket {}",
                member_id, pocket_id
            )));
        }
        Ok(())
    }

    /// Move a member between two pockets of the same team in one transaction.
    /// Lead status never survives a move.
    pub async fn move_pocket_member(
        &self,
        member_id: &str,
        from_pocket_id: &str,
        to_pocket_id: &str,
        to_team_id: &str,
        role: AccessLevel,
    ) -> Result<PocketMembership, AppError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;
        let result =
            sqlx::query("DELETE FROM pocket_members WHERE pocket_id = ? AND member_id = ?")
                .bind(from_pocket_id)
                .bind(member_id)
                .execute(&mut *tx)
                .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::InvalidMove(format!(
                "Member {} is not in pocket {}",
                member_id, from_pocket_id
            )));
        }
        sqlx::query(
            "INSERT INTO pocket_members (pocket_id, team_id, member_id, role, is_lead, joined_at) VALUES (?, ?, ?, ?, 0, ?)",
        )
        .bind(to_pocket_id)
        .bind(to_team_id)
        .bind(member_id)
        .bind(role.as_str())
        .bind(&now)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(PocketMembership {
            pocket_id: to_pocket_id.to_string(),
            team_id: to_team_id.to_string(),
            member_id: member_id.to_string(),
            role,
            is_lead: false,
            joined_at: now,
        })
    }

    /// Mark a pocket member as lead. The conditional update re-checks inside
    /// the statement that no other lead exists.
    pub async fn set_pocket_lead(&self, pocket_id: &str, member_id: &str) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE pocket_members SET is_lead = 1 WHERE pocket_id = ? AND member_id = ? \
             AND NOT EXISTS (SELECT 1 FROM pocket_members WHERE pocket_id = ? AND is_lead = 1)",
        )
        .bind(pocket_id)
        .bind(member_id)
        .bind(pocket_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::Validation(format!(
                "Cannot assign lead of pocket {}: membership missing or lead already set",
                pocket_id
            )));
        }
        Ok(())
    }

    // ==================== ACTIVITY OPERATIONS ====================

    pub async fn create_activity(
        &self,
        member_id: &str,
        kind: ActivityKind,
        count: i64,
        week_start: &str,
        note: Option<&str>,
        recorded_by: &str,
    ) -> Result<Activity, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO activities (id, member_id, kind, count, week_start, note, recorded_by, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(member_id)
        .bind(kind.as_str())
        .bind(count)
        .bind(week_start)
        .bind(note)
        .bind(recorded_by)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(Activity {
            id,
            member_id: member_id.to_string(),
            kind,
            count,
            week_start: week_start.to_string(),
            note: note.map(str::to_string),
            recorded_by: recorded_by.to_string(),
            created_at: now,
        })
    }

    pub async fn get_activity(&self, id: &str) -> Result<Option<Activity>, AppError> {
        let row = sqlx::query(
            "SELECT id, member_id, kind, count, week_start, note, recorded_by, created_at FROM activities WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(activity_from_row).transpose()
    }

    pub async fn delete_activity(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM activities WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Activity {} not found", id)));
        }
        Ok(())
    }

    /// All activities, newest week first. The caller filters by visibility.
    pub async fn list_activities(&self) -> Result<Vec<Activity>, AppError> {
        let rows = sqlx::query(
            "SELECT id, member_id, kind, count, week_start, note, recorded_by, created_at FROM activities ORDER BY week_start DESC, created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(activity_from_row).collect()
    }

    pub async fn list_activities_for_member(
        &self,
        member_id: &str,
    ) -> Result<Vec<Activity>, AppError> {
        let rows = sqlx::query(
            "SELECT id, member_id, kind, count, week_start, note, recorded_by, created_at FROM activities WHERE member_id = ? ORDER BY week_start DESC, created_at DESC",
        )
        .bind(member_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(activity_from_row).collect()
    }

    // ==================== TARGET OPERATIONS ====================

    /// Set or overwrite the target for one (member, kind, week).
    pub async fn set_target(
        &self,
        member_id: &str,
        kind: ActivityKind,
        week_start: &str,
        target: i64,
    ) -> Result<WeeklyTarget, AppError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO weekly_targets (member_id, kind, week_start, target, updated_at) VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(member_id, kind, week_start) DO UPDATE SET target = excluded.target, updated_at = excluded.updated_at",
        )
        .bind(member_id)
        .bind(kind.as_str())
        .bind(week_start)
        .bind(target)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(WeeklyTarget {
            member_id: member_id.to_string(),
            kind,
            week_start: week_start.to_string(),
            target,
            updated_at: now,
        })
    }

    pub async fn list_targets_for_member(
        &self,
        member_id: &str,
    ) -> Result<Vec<WeeklyTarget>, AppError> {
        let rows = sqlx::query(
            "SELECT member_id, kind, week_start, target, updated_at FROM weekly_targets WHERE member_id = ? ORDER BY week_start DESC",
        )
        .bind(member_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(target_from_row).collect()
    }

    // ==================== NOTIFICATION OPERATIONS ====================

    /// Persist one fan-out batch atomically.
    pub async fn create_notifications(
        &self,
        notifications: &[Notification],
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        for n in notifications {
            sqlx::query(
                "INSERT INTO notifications (id, recipient_id, kind, subject_id, message, read, created_at) VALUES (?, ?, ?, ?, ?, 0, ?)",
            )
            .bind(&n.id)
            .bind(&n.recipient_id)
            .bind(&n.kind)
            .bind(&n.subject_id)
            .bind(&n.message)
            .bind(&n.created_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn list_notifications(
        &self,
        recipient_id: &str,
    ) -> Result<Vec<Notification>, AppError> {
        let rows = sqlx::query(
            "SELECT id, recipient_id, kind, subject_id, message, read, created_at FROM notifications WHERE recipient_id = ? ORDER BY created_at DESC",
        )
        .bind(recipient_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(notification_from_row).collect())
    }

    pub async fn unread_count(&self, recipient_id: &str) -> Result<i64, AppError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM notifications WHERE recipient_id = ? AND read = 0",
        )
        .bind(recipient_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("count"))
    }

    /// Mark one notification read; only its recipient may do so.
    pub async fn mark_read(&self, recipient_id: &str, id: &str) -> Result<(), AppError> {
        let result =
            sqlx::query("UPDATE notifications SET read = 1 WHERE id = ? AND recipient_id = ?")
                .bind(id)
                .bind(recipient_id)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Notification {} not found", id)));
        }
        Ok(())
    }

    /// Mark everything read; returns how many were flipped.
    pub async fn mark_all_read(&self, recipient_id: &str) -> Result<i64, AppError> {
        let result =
            sqlx::query("UPDATE notifications SET read = 1 WHERE recipient_id = ? AND read = 0")
                .bind(recipient_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() as i64)
    }
}

// ==================== ROW MAPPERS ====================

fn access_level_from_tier(tier: i64) -> Result<AccessLevel, AppError> {
    AccessLevel::from_tier(tier)
        .ok_or_else(|| AppError::Database(format!("Unknown access level tier {}", tier)))
}

fn role_from_label(label: String) -> Result<AccessLevel, AppError> {
    AccessLevel::from_label(&label)
        .ok_or_else(|| AppError::Database(format!("Unknown role label {}", label)))
}

fn kind_from_label(label: String) -> Result<ActivityKind, AppError> {
    ActivityKind::from_label(&label)
        .ok_or_else(|| AppError::Database(format!("Unknown activity kind {}", label)))
}

fn member_from_row(row: &SqliteRow) -> Result<Member, AppError> {
    Ok(Member {
        id: row.get("id"),
        display_name: row.get("display_name"),
        email: row.get("email"),
        access_level: access_level_from_tier(row.get("access_level"))?,
        active: row.get::<i64, _>("active") != 0,
        parent_id: row.get("parent_id"),
        path: row.get("path"),
        depth: row.get("depth"),
        created_at: row.get("created_at"),
    })
}

fn team_from_row(row: &SqliteRow) -> Team {
    Team {
        id: row.get("id"),
        name: row.get("name"),
        owner_id: row.get("owner_id"),
        created_at: row.get("created_at"),
    }
}

fn team_membership_from_row(row: &SqliteRow) -> Result<TeamMembership, AppError> {
    Ok(TeamMembership {
        team_id: row.get("team_id"),
        member_id: row.get("member_id"),
        role: role_from_label(row.get("role"))?,
        joined_at: row.get("joined_at"),
    })
}

fn pocket_from_row(row: &SqliteRow) -> Pocket {
    Pocket {
        id: row.get("id"),
        team_id: row.get("team_id"),
        name: row.get("name"),
        active: row.get::<i64, _>("active") != 0,
        created_at: row.get("created_at"),
    }
}

fn pocket_membership_from_row(row: &SqliteRow) -> Result<PocketMembership, AppError> {
    Ok(PocketMembership {
        pocket_id: row.get("pocket_id"),
        team_id: row.get("team_id"),
        member_id: row.get("member_id"),
        role: role_from_label(row.get("role"))?,
        is_lead: row.get::<i64, _>("is_lead") != 0,
        joined_at: row.get("joined_at"),
    })
}

fn activity_from_row(row: &SqliteRow) -> Result<Activity, AppError> {
    Ok(Activity {
        id: row.get("id"),
        member_id: row.get("member_id"),
        kind: kind_from_label(row.get("kind"))?,
        count: row.get("count"),
        week_start: row.get("week_start"),
        note: row.get("note"),
        recorded_by: row.get("recorded_by"),
        created_at: row.get("created_at"),
    })
}

fn target_from_row(row: &SqliteRow) -> Result<WeeklyTarget, AppError> {
    Ok(WeeklyTarget {
        member_id: row.get("member_id"),
        kind: kind_from_label(row.get("kind"))?,
        week_start: row.get("week_start"),
        target: row.get("target"),
        updated_at: row.get("updated_at"),
    })
}

fn notification_from_row(row: &SqliteRow) -> Notification {
    Notification {
        id: row.get("id"),
        recipient_id: row.get("recipient_id"),
        kind: row.get("kind"),
        subject_id: row.get("subject_id"),
        message: row.get("message"),
        read: row.get::<i64, _>("read") != 0,
        created_at: row.get("created_at"),
    }
}

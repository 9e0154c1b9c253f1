//! Team and pocket membership facts.
//!
//! `MembershipIndex` is a pure read model built from membership rows once per
//! request snapshot. It answers who belongs where (and with what role) for
//! the permission layer, and validates membership mutations; the actual row
//! writes happen in the repository inside one transaction.

use std::collections::HashMap;

use crate::errors::AppError;
use crate::permissions::AccessLevel;

/// Team facts relevant to access resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamRow {
    pub id: String,
    pub name: String,
    /// Weak reference used for visibility scoping; may point at a deleted member.
    pub owner: Option<String>,
}

/// Pocket facts relevant to access resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PocketRow {
    pub id: String,
    pub team_id: String,
    pub name: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamMembershipRow {
    pub team_id: String,
    pub member_id: String,
    pub role: AccessLevel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PocketMembershipRow {
    pub pocket_id: String,
    pub member_id: String,
    pub role: AccessLevel,
    pub is_lead: bool,
    /// Denormalized copy of the pocket's team, kept equal to it.
    pub team_id: String,
}

#[derive(Debug, Default)]
pub struct MembershipIndex {
    teams: HashMap<String, TeamRow>,
    pockets: HashMap<String, PocketRow>,
    /// (team, member) -> role
    team_roles: HashMap<(String, String), AccessLevel>,
    teams_by_member: HashMap<String, Vec<String>>,
    members_by_team: HashMap<String, Vec<String>>,
    teams_by_owner: HashMap<String, Vec<String>>,
    pockets_by_team: HashMap<String, Vec<String>>,
    pocket_members: HashMap<String, Vec<PocketMembershipRow>>,
}

impl MembershipIndex {
    pub fn new(
        teams: impl IntoIterator<Item = TeamRow>,
        pockets: impl IntoIterator<Item = PocketRow>,
        team_memberships: impl IntoIterator<Item = TeamMembershipRow>,
        pocket_memberships: impl IntoIterator<Item = PocketMembershipRow>,
    ) -> Self {
        let mut index = Self::default();
        for team in teams {
            if let Some(owner) = &team.owner {
                index
                    .teams_by_owner
                    .entry(owner.clone())
                    .or_default()
                    .push(team.id.clone());
            }
            index.teams.insert(team.id.clone(), team);
        }
        for pocket in pockets {
            index
                .pockets_by_team
                .entry(pocket.team_id.clone())
                .or_default()
                .push(pocket.id.clone());
            index.pockets.insert(pocket.id.clone(), pocket);
        }
        for row in team_memberships {
            index
                .teams_by_member
                .entry(row.member_id.clone())
                .or_default()
                .push(row.team_id.clone());
            index
                .members_by_team
                .entry(row.team_id.clone())
                .or_default()
                .push(row.member_id.clone());
            index
                .team_roles
                .insert((row.team_id, row.member_id), row.role);
        }
        for mut row in pocket_memberships {
            // The denormalized team field follows the pocket, always.
            if let Some(pocket) = index.pockets.get(&row.pocket_id) {
                row.team_id = pocket.team_id.clone();
            }
            index
                .pocket_members
                .entry(row.pocket_id.clone())
                .or_default()
                .push(row);
        }
        index
    }

    pub fn team(&self, team_id: &str) -> Result<&TeamRow, AppError> {
        self.teams
            .get(team_id)
            .ok_or_else(|| AppError::NotFound(format!("Team {} not found", team_id)))
    }

    pub fn pocket(&self, pocket_id: &str) -> Result<&PocketRow, AppError> {
        self.pockets
            .get(pocket_id)
            .ok_or_else(|| AppError::NotFound(format!("Pocket {} not found", pocket_id)))
    }

    pub fn team_ids(&self) -> impl Iterator<Item = String> + '_ {
        self.teams.keys().cloned()
    }

    /// Teams the member belongs to.
    pub fn teams_of(&self, member_id: &str) -> Vec<String> {
        self.teams_by_member
            .get(member_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Members of a team, in row order.
    pub fn members_of_team(&self, team_id: &str) -> &[String] {
        self.members_by_team
            .get(team_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn role_of(&self, member_id: &str, team_id: &str) -> Option<AccessLevel> {
        self.team_roles
            .get(&(team_id.to_string(), member_id.to_string()))
            .copied()
    }

    pub fn is_member_of_team(&self, member_id: &str, team_id: &str) -> bool {
        self.role_of(member_id, team_id).is_some()
    }

    /// Do two members share at least one team?
    pub fn shares_team(&self, a: &str, b: &str) -> bool {
        let teams_b = match self.teams_by_member.get(b) {
            Some(t) => t,
            None => return false,
        };
        self.teams_by_member
            .get(a)
            .map(|teams_a| teams_a.iter().any(|t| teams_b.contains(t)))
            .unwrap_or(false)
    }

    /// Ids of teams owned by `member_id`.
    pub fn teams_owned_by(&self, member_id: &str) -> Vec<String> {
        self.teams_by_owner
            .get(member_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn pockets_of_team(&self, team_id: &str) -> Vec<&PocketRow> {
        self.pockets_by_team
            .get(team_id)
            .map(|ids| ids.iter().filter_map(|id| self.pockets.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn members_of_pocket(&self, pocket_id: &str) -> &[PocketMembershipRow] {
        self.pocket_members
            .get(pocket_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_member_of_pocket(&self, member_id: &str, pocket_id: &str) -> bool {
        self.members_of_pocket(pocket_id)
            .iter()
            .any(|m| m.member_id == member_id)
    }

    /// The pocket's designated lead, if one has been assigned.
    pub fn lead_of(&self, pocket_id: &str) -> Option<&str> {
        self.members_of_pocket(pocket_id)
            .iter()
            .find(|m| m.is_lead)
            .map(|m| m.member_id.as_str())
    }

    /// Joining a team twice is a conflict, never an upsert.
    pub fn validate_join_team(&self, member_id: &str, team_id: &str) -> Result<(), AppError> {
        self.team(team_id)?;
        if self.is_member_of_team(member_id, team_id) {
            return Err(AppError::AlreadyMember(format!(
                "Member {} is already in team {}",
                member_id, team_id
            )));
        }
        Ok(())
    }

    pub fn validate_join_pocket(&self, member_id: &str, pocket_id: &str) -> Result<(), AppError> {
        self.pocket(pocket_id)?;
        if self.is_member_of_pocket(member_id, pocket_id) {
            return Err(AppError::AlreadyMember(format!(
                "Member {} is already in pocket {}",
                member_id, pocket_id
            )));
        }
        Ok(())
    }

    /// A pocket move is legal only within one team, from a pocket the member
    /// is in, to a pocket they are not in.
    pub fn validate_pocket_move(
        &self,
        member_id: &str,
        from_pocket_id: &str,
        to_pocket_id: &str,
    ) -> Result<(), AppError> {
        let from = self.pocket(from_pocket_id)?;
        let to = self.pocket(to_pocket_id)?;
        if from.team_id != to.team_id {
            return Err(AppError::InvalidMove(
                "Cannot move members between pockets in different teams".to_string(),
            ));
        }
        if !self.is_member_of_pocket(member_id, from_pocket_id) {
            return Err(AppError::InvalidMove(format!(
                "Member {} is not in pocket {}",
                member_id, from_pocket_id
            )));
        }
        if self.is_member_of_pocket(member_id, to_pocket_id) {
            return Err(AppError::InvalidMove(format!(
                "Member {} is already in pocket {}",
                member_id, to_pocket_id
            )));
        }
        Ok(())
    }

    /// A team move requires membership in the source and absence from the target.
    pub fn validate_team_move(
        &self,
        member_id: &str,
        from_team_id: &str,
        to_team_id: &str,
    ) -> Result<(), AppError> {
        self.team(from_team_id)?;
        self.team(to_team_id)?;
        if from_team_id == to_team_id {
            return Err(AppError::InvalidMove(
                "Current team and new team cannot be the same".to_string(),
            ));
        }
        if !self.is_member_of_team(member_id, from_team_id) {
            return Err(AppError::InvalidMove(format!(
                "Member {} is not in team {}",
                member_id, from_team_id
            )));
        }
        if self.is_member_of_team(member_id, to_team_id) {
            return Err(AppError::InvalidMove(format!(
                "Member {} is already in team {}",
                member_id, to_team_id
            )));
        }
        Ok(())
    }

    /// Lead assignment is explicit and requires that no lead exists yet.
    pub fn validate_set_lead(&self, member_id: &str, pocket_id: &str) -> Result<(), AppError> {
        self.pocket(pocket_id)?;
        if !self.is_member_of_pocket(member_id, pocket_id) {
            return Err(AppError::Validation(format!(
                "Member {} is not in pocket {}",
                member_id, pocket_id
            )));
        }
        if let Some(lead) = self.lead_of(pocket_id) {
            return Err(AppError::Validation(format!(
                "Pocket {} already has a lead ({})",
                pocket_id, lead
            )));
        }
        Ok(())
    }
}

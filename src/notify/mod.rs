//! Notification fan-out.
//!
//! `RecipientResolver` computes who gets told when something happens to a
//! member: the admins, the member's Regional ancestors, and the leaders of
//! every team the member belongs to. Candidates who could not view the
//! member anyway are filtered out, so a notification never leaks a name the
//! recipient has no right to see. The acting member is always excluded from
//! their own fan-out.

use std::collections::HashSet;

use crate::errors::AppError;
use crate::permissions::{AccessLevel, PermissionResolver};

/// What kind of event is being announced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    ActivityAdded,
    MemberRegistered,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::ActivityAdded => "activity_added",
            NotificationKind::MemberRegistered => "member_registered",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "activity_added" => Some(NotificationKind::ActivityAdded),
            "member_registered" => Some(NotificationKind::MemberRegistered),
            _ => None,
        }
    }
}

pub struct RecipientResolver<'a> {
    resolver: &'a PermissionResolver<'a>,
}

impl<'a> RecipientResolver<'a> {
    pub fn new(resolver: &'a PermissionResolver<'a>) -> Self {
        Self { resolver }
    }

    /// Recipients for an event concerning `target`, triggered by `actor`.
    ///
    /// Candidates: every Admin, every Regional ancestor of the target, and
    /// for each of the target's teams the LocalLeader-role members and the
    /// LocalLeader owner. The target themselves is never a candidate, and
    /// non-Admin candidates must pass `can_view(candidate, target)`. The
    /// actor is removed last.
    pub fn recipients_for(
        &self,
        actor: &str,
        target: &str,
    ) -> Result<HashSet<String>, AppError> {
        let tree = self.resolver.tree();
        let memberships = self.resolver.memberships();
        tree.get(target)?;

        let mut candidates = HashSet::new();
        for node in tree.iter() {
            if node.access_level == AccessLevel::Admin {
                candidates.insert(node.id.clone());
            }
        }
        for ancestor in tree.ancestors_of(target)? {
            if ancestor.access_level == AccessLevel::Regional {
                candidates.insert(ancestor.id.clone());
            }
        }
        for team_id in memberships.teams_of(target) {
            for member in memberships.members_of_team(&team_id) {
                if member != target
                    && memberships.role_of(member, &team_id) == Some(AccessLevel::LocalLeader)
                {
                    candidates.insert(member.clone());
                }
            }
            if let Some(owner) = memberships.team(&team_id)?.owner.as_deref() {
                if owner != target
                    && tree.contains(owner)
                    && tree.get(owner)?.access_level == AccessLevel::LocalLeader
                {
                    candidates.insert(owner.to_string());
                }
            }
        }
        candidates.remove(target);

        let mut recipients = HashSet::new();
        for candidate in candidates {
            let node = tree.get(&candidate)?;
            if node.access_level == AccessLevel::Admin
                || self.resolver.can_view(&candidate, target)?
            {
                recipients.insert(candidate);
            }
        }
        recipients.remove(actor);
        Ok(recipients)
    }
}

pub mod repo;

use crate::error::{AppResult, Error};
use crate::profile::repo::ProfileRepo;
use crate::profile::{Profile, ProfileId};
use crate::timestamp::Timestamp;
use crate::viewer::Viewer;
use crate::System;
use repo::RelationshipRepo;

use entrait::entrait;
use std::collections::HashMap;

/// State of a relationship row. A missing row means the profiles are unrelated.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Invitation sent, not yet answered.
    Pending,
    Accepted,
}

impl Status {
    /// The status after the receiver accepts, or `None` when accepting changes nothing.
    pub fn accept(self) -> Option<Status> {
        match self {
            Self::Pending => Some(Self::Accepted),
            Self::Accepted => None,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Relationship {
    pub sender: ProfileId,
    pub receiver: ProfileId,
    pub status: Status,
    pub created: Timestamp,
    pub updated: Timestamp,
}

impl Relationship {
    pub fn involves(&self, profile_id: ProfileId) -> bool {
        self.sender == profile_id || self.receiver == profile_id
    }

    /// The profile on the other end, seen from `profile_id`.
    pub fn counterpart(&self, profile_id: ProfileId) -> ProfileId {
        if self.sender == profile_id {
            self.receiver
        } else {
            self.sender
        }
    }
}

/// Who the viewer has invited and who has invited the viewer, whatever the outcome.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, Default, Eq, PartialEq)]
pub struct Involvement {
    pub invited_by_me: Vec<ProfileId>,
    pub invited_me: Vec<ProfileId>,
}

impl Involvement {
    pub fn of(viewer: ProfileId, relationships: &[Relationship]) -> Self {
        let mut involvement = Self::default();
        for rel in relationships {
            if rel.sender == viewer {
                involvement.invited_by_me.push(rel.receiver);
            } else if rel.receiver == viewer {
                involvement.invited_me.push(rel.sender);
            }
        }
        involvement
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug)]
pub struct Invitations {
    pub senders: Vec<Profile>,
    pub is_empty: bool,
}

#[entrait(pub Api, mock_api=RelationshipApiMock)]
pub mod api {
    use super::*;

    pub async fn send_invitation(
        deps: &(impl ProfileRepo + RelationshipRepo + System),
        viewer: &Viewer,
        receiver: ProfileId,
    ) -> AppResult<Relationship> {
        if receiver == viewer.id() {
            return Err(Error::CannotInviteSelf);
        }

        let receiver = find_counterpart(deps, receiver).await?;
        let relationship = deps
            .insert_relationship(viewer.id(), receiver.id, deps.get_current_time())
            .await?;

        tracing::info!(
            sender = viewer.id().0,
            receiver = receiver.id.0,
            "invitation sent"
        );

        Ok(relationship)
    }

    pub async fn accept_invitation(
        deps: &(impl ProfileRepo + RelationshipRepo + System),
        viewer: &Viewer,
        sender: ProfileId,
    ) -> AppResult<Relationship> {
        let sender = find_counterpart(deps, sender).await?;
        let relationship = deps
            .accept_pending(sender.id, viewer.id(), deps.get_current_time())
            .await?
            .ok_or(Error::RelationshipNotFound)?;

        tracing::info!(
            sender = sender.id.0,
            receiver = viewer.id().0,
            "invitation accepted"
        );

        Ok(relationship)
    }

    pub async fn reject_invitation(
        deps: &(impl ProfileRepo + RelationshipRepo),
        viewer: &Viewer,
        sender: ProfileId,
    ) -> AppResult<()> {
        let sender = find_counterpart(deps, sender).await?;
        if !deps.delete_relationship(sender.id, viewer.id()).await? {
            return Err(Error::RelationshipNotFound);
        }

        tracing::info!(
            sender = sender.id.0,
            receiver = viewer.id().0,
            "invitation rejected"
        );

        Ok(())
    }

    pub async fn remove_from_friends(
        deps: &(impl ProfileRepo + RelationshipRepo),
        viewer: &Viewer,
        other: ProfileId,
    ) -> AppResult<()> {
        let other = find_counterpart(deps, other).await?;
        if !deps.delete_relationship_between(viewer.id(), other.id).await? {
            return Err(Error::RelationshipNotFound);
        }

        tracing::info!(
            profile = viewer.id().0,
            other = other.id.0,
            "relationship removed"
        );

        Ok(())
    }

    /// Profiles with an unanswered invitation to the viewer, oldest first.
    pub async fn invitations_received(
        deps: &(impl ProfileRepo + RelationshipRepo),
        viewer: &Viewer,
    ) -> AppResult<Invitations> {
        let relationships = deps.select_invitations_received(viewer.id()).await?;
        let senders = profiles_in_order(
            deps,
            relationships.iter().map(|rel| rel.sender).collect(),
        )
        .await?;

        Ok(Invitations {
            is_empty: senders.is_empty(),
            senders,
        })
    }

    /// Profiles linked to the viewer by an accepted relationship.
    pub async fn list_friends(
        deps: &(impl ProfileRepo + RelationshipRepo),
        viewer: &Viewer,
    ) -> AppResult<Vec<Profile>> {
        let friend_ids = deps
            .select_relationships_of(viewer.id())
            .await?
            .into_iter()
            .filter(|rel| rel.status == Status::Accepted)
            .map(|rel| rel.counterpart(viewer.id()))
            .collect();

        profiles_in_order(deps, friend_ids).await
    }

    async fn find_counterpart(deps: &impl ProfileRepo, profile_id: ProfileId) -> AppResult<Profile> {
        deps.find_profile_by_id(profile_id)
            .await?
            .ok_or(Error::ProfileNotFound)
    }

    async fn profiles_in_order(
        deps: &impl ProfileRepo,
        profile_ids: Vec<ProfileId>,
    ) -> AppResult<Vec<Profile>> {
        if profile_ids.is_empty() {
            return Ok(vec![]);
        }

        let mut by_id: HashMap<ProfileId, Profile> = deps
            .find_profiles_by_ids(&profile_ids)
            .await?
            .into_iter()
            .map(|profile| (profile.id, profile))
            .collect();

        Ok(profile_ids
            .iter()
            .filter_map(|profile_id| by_id.remove(profile_id))
            .collect())
    }
}

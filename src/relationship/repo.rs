use entrait::entrait;
use time::OffsetDateTime;

use super::Relationship;
use crate::error::AppResult;
use crate::profile::ProfileId;

/// Every write here is atomic: a single statement or a single transaction.
#[entrait(RelationshipRepoImpl, delegate_by = DelegateRelationshipRepo, mock_api=RelationshipRepoMock)]
pub trait RelationshipRepo {
    /// Store a new pending invitation from `sender` to `receiver`.
    ///
    /// Fails with `RelationshipExists` when the pair is already related in any direction.
    async fn insert_relationship(
        &self,
        sender: ProfileId,
        receiver: ProfileId,
        now: OffsetDateTime,
    ) -> AppResult<Relationship>;

    /// Accept the invitation from `sender` to `receiver` if it is still pending.
    ///
    /// Returns `None` when there is no such relationship.
    async fn accept_pending(
        &self,
        sender: ProfileId,
        receiver: ProfileId,
        now: OffsetDateTime,
    ) -> AppResult<Option<Relationship>>;

    /// Returns whether a row was deleted.
    async fn delete_relationship(&self, sender: ProfileId, receiver: ProfileId) -> AppResult<bool>;

    /// Like `delete_relationship`, ignoring which side sent the invitation.
    async fn delete_relationship_between(&self, a: ProfileId, b: ProfileId) -> AppResult<bool>;

    async fn select_invitations_received(&self, receiver: ProfileId)
        -> AppResult<Vec<Relationship>>;

    async fn select_relationships_of(&self, profile_id: ProfileId) -> AppResult<Vec<Relationship>>;

    async fn count_invitations_received(&self, receiver: ProfileId) -> AppResult<i64>;
}

use super::{DbResultExt, GetDb};
use crate::error::{AppResult, Error};
use crate::profile::ProfileId;
use crate::relationship::{Relationship, Status};
use crate::timestamp::Timestamp;

use anyhow::anyhow;
use entrait::entrait;
use time::OffsetDateTime;

const RELATIONSHIP_COLUMNS: &str = "sender_id, receiver_id, status, created, updated";

// Stored status values
const SEND: &str = "send";
const ACCEPTED: &str = "accepted";

fn status_column(status: Status) -> &'static str {
    match status {
        Status::Pending => SEND,
        Status::Accepted => ACCEPTED,
    }
}

#[derive(sqlx::FromRow)]
struct RelationshipRow {
    sender_id: i64,
    receiver_id: i64,
    status: String,
    created: OffsetDateTime,
    updated: OffsetDateTime,
}

impl TryFrom<RelationshipRow> for Relationship {
    type Error = Error;

    fn try_from(row: RelationshipRow) -> AppResult<Self> {
        let status = match row.status.as_str() {
            SEND => Status::Pending,
            ACCEPTED => Status::Accepted,
            other => return Err(anyhow!("unknown relationship status {other:?}").into()),
        };

        Ok(Relationship {
            sender: ProfileId(row.sender_id),
            receiver: ProfileId(row.receiver_id),
            status,
            created: Timestamp(row.created),
            updated: Timestamp(row.updated),
        })
    }
}

fn into_relationships(rows: Vec<RelationshipRow>) -> AppResult<Vec<Relationship>> {
    rows.into_iter().map(Relationship::try_from).collect()
}

pub struct SqliteRelationshipRepo;

#[entrait]
impl crate::relationship::repo::RelationshipRepoImpl for SqliteRelationshipRepo {
    pub async fn insert_relationship(
        deps: &impl GetDb,
        sender: ProfileId,
        receiver: ProfileId,
        now: OffsetDateTime,
    ) -> AppResult<Relationship> {
        let row = sqlx::query_as::<_, RelationshipRow>(&format!(
            r#"
            INSERT INTO relationship (sender_id, receiver_id, status, created, updated)
            VALUES (?, ?, ?, ?, ?)
            RETURNING {RELATIONSHIP_COLUMNS}
            "#
        ))
        .bind(sender.0)
        .bind(receiver.0)
        .bind(SEND)
        .bind(now)
        .bind(now)
        .fetch_one(&deps.get_db().pool)
        .await
        .on_constraint("relationship_pair", |_| Error::RelationshipExists)
        .on_constraint("FOREIGN KEY", |_| Error::ProfileNotFound)?;

        row.try_into()
    }

    pub async fn accept_pending(
        deps: &impl GetDb,
        sender: ProfileId,
        receiver: ProfileId,
        now: OffsetDateTime,
    ) -> AppResult<Option<Relationship>> {
        let mut tx = deps.get_db().pool.begin().await?;

        let row = sqlx::query_as::<_, RelationshipRow>(&format!(
            "SELECT {RELATIONSHIP_COLUMNS} FROM relationship WHERE sender_id = ? AND receiver_id = ?"
        ))
        .bind(sender.0)
        .bind(receiver.0)
        .fetch_optional(&mut *tx)
        .await?;

        let relationship = match row {
            Some(row) => Relationship::try_from(row)?,
            None => return Ok(None),
        };

        let relationship = match relationship.status.accept() {
            Some(status) => {
                let row = sqlx::query_as::<_, RelationshipRow>(&format!(
                    r#"
                    UPDATE relationship SET status = ?, updated = ?
                    WHERE sender_id = ? AND receiver_id = ?
                    RETURNING {RELATIONSHIP_COLUMNS}
                    "#
                ))
                .bind(status_column(status))
                .bind(now)
                .bind(sender.0)
                .bind(receiver.0)
                .fetch_one(&mut *tx)
                .await?;

                Relationship::try_from(row)?
            }
            // Already accepted
            None => relationship,
        };

        tx.commit().await?;

        Ok(Some(relationship))
    }

    pub async fn delete_relationship(
        deps: &impl GetDb,
        sender: ProfileId,
        receiver: ProfileId,
    ) -> AppResult<bool> {
        let result =
            sqlx::query("DELETE FROM relationship WHERE sender_id = ? AND receiver_id = ?")
                .bind(sender.0)
                .bind(receiver.0)
                .execute(&deps.get_db().pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_relationship_between(
        deps: &impl GetDb,
        a: ProfileId,
        b: ProfileId,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM relationship
            WHERE (sender_id = ?1 AND receiver_id = ?2) OR (sender_id = ?2 AND receiver_id = ?1)
            "#,
        )
        .bind(a.0)
        .bind(b.0)
        .execute(&deps.get_db().pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn select_invitations_received(
        deps: &impl GetDb,
        receiver: ProfileId,
    ) -> AppResult<Vec<Relationship>> {
        let rows = sqlx::query_as::<_, RelationshipRow>(&format!(
            r#"
            SELECT {RELATIONSHIP_COLUMNS} FROM relationship
            WHERE receiver_id = ? AND status = ?
            ORDER BY relationship_id
            "#
        ))
        .bind(receiver.0)
        .bind(SEND)
        .fetch_all(&deps.get_db().pool)
        .await?;

        into_relationships(rows)
    }

    pub async fn select_relationships_of(
        deps: &impl GetDb,
        profile_id: ProfileId,
    ) -> AppResult<Vec<Relationship>> {
        let rows = sqlx::query_as::<_, RelationshipRow>(&format!(
            r#"
            SELECT {RELATIONSHIP_COLUMNS} FROM relationship
            WHERE sender_id = ?1 OR receiver_id = ?1
            ORDER BY relationship_id
            "#
        ))
        .bind(profile_id.0)
        .fetch_all(&deps.get_db().pool)
        .await?;

        into_relationships(rows)
    }

    pub async fn count_invitations_received(
        deps: &impl GetDb,
        receiver: ProfileId,
    ) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM relationship WHERE receiver_id = ? AND status = ?",
        )
        .bind(receiver.0)
        .bind(SEND)
        .fetch_one(&deps.get_db().pool)
        .await?;

        Ok(count)
    }
}

use super::{DbResultExt, GetDb};
use crate::auth::UserId;
use crate::error::{AppResult, Error};
use crate::profile::repo::{NewProfile, ProfileUpdate};
use crate::profile::{Profile, ProfileId};
use crate::timestamp::Timestamp;

use entrait::entrait;
use sqlx::Sqlite;
use time::OffsetDateTime;
use uuid::Uuid;

const PROFILE_COLUMNS: &str = "profile_id, user_id, username, first_name, last_name, bio, email, country, avatar, slug, created, updated";

#[derive(sqlx::FromRow)]
struct ProfileRow {
    profile_id: i64,
    user_id: Uuid,
    username: String,
    first_name: String,
    last_name: String,
    bio: String,
    email: String,
    country: String,
    avatar: String,
    slug: String,
    created: OffsetDateTime,
    updated: OffsetDateTime,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Profile {
            id: ProfileId(row.profile_id),
            user_id: UserId(row.user_id),
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            bio: row.bio,
            email: row.email,
            country: row.country,
            avatar: row.avatar,
            slug: row.slug,
            created: Timestamp(row.created),
            updated: Timestamp(row.updated),
        }
    }
}

pub struct SqliteProfileRepo;

#[entrait]
impl crate::profile::repo::ProfileRepoImpl for SqliteProfileRepo {
    pub async fn insert_profile(
        deps: &impl GetDb,
        new_profile: NewProfile<'_>,
        now: OffsetDateTime,
    ) -> AppResult<Profile> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            r#"
            INSERT INTO profile (user_id, username, slug, created, updated)
            VALUES (?, ?, ?, ?, ?)
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(new_profile.user_id.0)
        .bind(new_profile.username)
        .bind(new_profile.slug)
        .bind(now)
        .bind(now)
        .fetch_one(&deps.get_db().pool)
        .await
        .on_constraint("profile.user_id", |_| Error::ProfileExists)
        .on_constraint("profile.slug", |_| slug_taken_error())?;

        Ok(row.into())
    }

    pub async fn find_profile_by_id(
        deps: &impl GetDb,
        profile_id: ProfileId,
    ) -> AppResult<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profile WHERE profile_id = ?"
        ))
        .bind(profile_id.0)
        .fetch_optional(&deps.get_db().pool)
        .await?;

        Ok(row.map(Profile::from))
    }

    pub async fn find_profile_by_user(
        deps: &impl GetDb,
        user_id: UserId,
    ) -> AppResult<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profile WHERE user_id = ?"
        ))
        .bind(user_id.0)
        .fetch_optional(&deps.get_db().pool)
        .await?;

        Ok(row.map(Profile::from))
    }

    pub async fn find_profile_by_slug(deps: &impl GetDb, slug: &str) -> AppResult<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profile WHERE slug = ?"
        ))
        .bind(slug)
        .fetch_optional(&deps.get_db().pool)
        .await?;

        Ok(row.map(Profile::from))
    }

    pub async fn find_profiles_by_ids(
        deps: &impl GetDb,
        profile_ids: &[ProfileId],
    ) -> AppResult<Vec<Profile>> {
        if profile_ids.is_empty() {
            return Ok(vec![]);
        }

        let mut builder = sqlx::QueryBuilder::<Sqlite>::new(format!(
            "SELECT {PROFILE_COLUMNS} FROM profile WHERE profile_id IN ("
        ));
        let mut separated = builder.separated(", ");
        for profile_id in profile_ids {
            separated.push_bind(profile_id.0);
        }
        separated.push_unseparated(") ORDER BY profile_id");

        let rows = builder
            .build_query_as::<ProfileRow>()
            .fetch_all(&deps.get_db().pool)
            .await?;

        Ok(rows.into_iter().map(Profile::from).collect())
    }

    pub async fn select_profiles_except(
        deps: &impl GetDb,
        profile_id: ProfileId,
    ) -> AppResult<Vec<Profile>> {
        let rows = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profile WHERE profile_id <> ? ORDER BY profile_id"
        ))
        .bind(profile_id.0)
        .fetch_all(&deps.get_db().pool)
        .await?;

        Ok(rows.into_iter().map(Profile::from).collect())
    }

    pub async fn slug_taken(
        deps: &impl GetDb,
        slug: &str,
        owner: Option<ProfileId>,
    ) -> AppResult<bool> {
        let taken = sqlx::query_scalar::<_, i64>(
            "SELECT EXISTS(SELECT 1 FROM profile WHERE slug = ? AND profile_id IS NOT ?)",
        )
        .bind(slug)
        .bind(owner.map(|owner| owner.0))
        .fetch_one(&deps.get_db().pool)
        .await?;

        Ok(taken > 0)
    }

    pub async fn update_profile(
        deps: &impl GetDb,
        profile_id: ProfileId,
        update: ProfileUpdate<'_>,
        now: OffsetDateTime,
    ) -> AppResult<Profile> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            r#"
            UPDATE profile SET
                first_name = ?,
                last_name = ?,
                bio = ?,
                email = ?,
                country = ?,
                slug = COALESCE(?, slug),
                avatar = COALESCE(?, avatar),
                updated = ?
            WHERE profile_id = ?
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(update.first_name)
        .bind(update.last_name)
        .bind(update.bio)
        .bind(update.email)
        .bind(update.country)
        .bind(update.slug)
        .bind(update.avatar)
        .bind(now)
        .bind(profile_id.0)
        .fetch_optional(&deps.get_db().pool)
        .await
        .on_constraint("profile.slug", |_| slug_taken_error())?;

        row.map(Profile::from).ok_or(Error::ProfileNotFound)
    }

    pub async fn count_posts(deps: &impl GetDb, profile_id: ProfileId) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM post WHERE author_id = ?")
            .bind(profile_id.0)
            .fetch_one(&deps.get_db().pool)
            .await?;

        Ok(count)
    }
}

// Only reachable when two writers race for the same slug
fn slug_taken_error() -> Error {
    Error::unprocessable_entity([("slug", "slug is taken")])
}

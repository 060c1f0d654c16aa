use crate::error::Error;

use anyhow::Context;
use entrait::entrait;
use sqlx::error::DatabaseError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

pub mod profile_db;
pub mod relationship_db;

#[derive(Clone)]
pub struct Db {
    pub pool: SqlitePool,
}

impl Db {
    pub async fn init(url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .context("malformed database_url")?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(16)
            .connect_with(options)
            .await
            .context("could not connect to database_url")?;

        sqlx::migrate!().run(&pool).await?;

        Ok(Db { pool })
    }
}

#[entrait]
pub trait GetDb {
    fn get_db(&self) -> &Db;
}

impl GetDb for Db {
    fn get_db(&self) -> &Db {
        self
    }
}

impl crate::profile::repo::DelegateProfileRepo<Self> for Db {
    type Target = profile_db::SqliteProfileRepo;
}

impl crate::relationship::repo::DelegateRelationshipRepo<Self> for Db {
    type Target = relationship_db::SqliteRelationshipRepo;
}

trait DbResultExt<T> {
    /// Map a constraint violation to a domain error.
    ///
    /// SQLite doesn't report constraint names separately, so `name` is matched
    /// against the error message, e.g. `profile.user_id` or `relationship_pair`.
    fn on_constraint(
        self,
        name: &str,
        f: impl FnOnce(Box<dyn DatabaseError>) -> Error,
    ) -> Result<T, Error>;
}

impl<T, E> DbResultExt<T> for Result<T, E>
where
    E: Into<Error>,
{
    fn on_constraint(
        self,
        name: &str,
        map_err: impl FnOnce(Box<dyn DatabaseError>) -> Error,
    ) -> Result<T, Error> {
        self.map_err(|e| match e.into() {
            Error::Sqlx(sqlx::Error::Database(dbe)) if dbe.message().contains(name) => {
                map_err(dbe)
            }
            e => e,
        })
    }
}

/// A fresh migrated in-memory database.
///
/// The pool holds on to its single connection, since an in-memory SQLite
/// database disappears with the connection that created it.
#[cfg(test)]
pub async fn open_test_db() -> Db {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to migrate");

    Db { pool }
}

#[cfg(test)]
pub async fn create_test_db() -> entrait::Impl<Db> {
    entrait::Impl::new(open_test_db().await)
}

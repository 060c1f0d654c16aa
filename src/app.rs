use crate::config::Config;
use crate::db::{Db, GetDb};
use crate::profile::repo::DelegateProfileRepo;
use crate::relationship::repo::DelegateRelationshipRepo;

use std::path::PathBuf;
use std::sync::Arc;
use time::OffsetDateTime;

const RANDOM_CODE_LEN: usize = 8;

#[derive(Clone)]
pub struct App {
    pub config: Arc<Config>,
    pub(crate) db: Db,
}

impl App {
    pub async fn init(config: Config) -> anyhow::Result<Self> {
        let db = Db::init(&config.database_url).await?;

        Ok(Self {
            config: Arc::new(config),
            db,
        })
    }
}

impl crate::System for App {
    fn get_current_time(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }

    fn random_code(&self) -> String {
        let mut code = uuid::Uuid::new_v4().simple().to_string();
        code.truncate(RANDOM_CODE_LEN);
        code
    }
}

impl crate::GetConfig for App {
    fn get_jwt_signing_key(&self) -> &hmac::Hmac<sha2::Sha384> {
        &self.config.jwt_signing_key.0
    }

    fn media_root(&self) -> &PathBuf {
        &self.config.media_root
    }

    fn invite_list_excludes_pending(&self) -> bool {
        self.config.invite_list_excludes_pending
    }
}

impl GetDb for App {
    fn get_db(&self) -> &Db {
        &self.db
    }
}

impl DelegateProfileRepo<Self> for App {
    type Target = crate::db::profile_db::SqliteProfileRepo;
}

impl DelegateRelationshipRepo<Self> for App {
    type Target = crate::db::relationship_db::SqliteRelationshipRepo;
}

use crate::auth::{Token, Tokens, UserId};
use crate::error::{AppResult, Error};
use crate::profile::repo::ProfileRepo;
use crate::profile::{Profile, ProfileId};
use crate::relationship::repo::RelationshipRepo;

use entrait::entrait;

/// The authenticated caller of a request, together with its profile.
#[derive(Clone, Debug)]
pub struct Viewer {
    pub user_id: UserId,
    pub profile: Profile,
}

impl Viewer {
    pub fn new(profile: Profile) -> Self {
        Self {
            user_id: profile.user_id,
            profile,
        }
    }

    pub fn id(&self) -> ProfileId {
        self.profile.id
    }
}

/// Values every page of the site needs about the viewer.
#[derive(serde::Serialize, serde::Deserialize, Debug, Eq, PartialEq)]
pub struct PageContext {
    pub avatar: String,
    pub pending_invitations: i64,
    pub profile: Profile,
}

#[entrait(pub Api, mock_api=ViewerApiMock)]
pub mod api {
    use super::*;

    pub async fn resolve_viewer(deps: &(impl Tokens + ProfileRepo), token: Token) -> AppResult<Viewer> {
        let user_id = deps.authenticate(token)?;
        let profile = deps
            .find_profile_by_user(user_id)
            .await?
            .ok_or(Error::CurrentProfileDoesNotExist)?;

        Ok(Viewer::new(profile))
    }

    pub async fn page_context(deps: &impl RelationshipRepo, viewer: &Viewer) -> AppResult<PageContext> {
        Ok(PageContext {
            avatar: viewer.profile.avatar.clone(),
            pending_invitations: deps.count_invitations_received(viewer.id()).await?,
            profile: viewer.profile.clone(),
        })
    }
}

use entrait::entrait;
use time::OffsetDateTime;

use super::{Profile, ProfileId};
use crate::auth::UserId;
use crate::error::AppResult;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NewProfile<'a> {
    pub user_id: UserId,
    pub username: &'a str,
    pub slug: &'a str,
}

/// Replacement of the editable profile fields. `None` keeps the stored value.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ProfileUpdate<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub bio: &'a str,
    pub email: &'a str,
    pub country: &'a str,
    pub slug: Option<&'a str>,
    pub avatar: Option<&'a str>,
}

#[entrait(ProfileRepoImpl, delegate_by = DelegateProfileRepo, mock_api=ProfileRepoMock)]
pub trait ProfileRepo {
    async fn insert_profile(
        &self,
        new_profile: NewProfile<'_>,
        now: OffsetDateTime,
    ) -> AppResult<Profile>;

    async fn find_profile_by_id(&self, profile_id: ProfileId) -> AppResult<Option<Profile>>;

    async fn find_profile_by_user(&self, user_id: UserId) -> AppResult<Option<Profile>>;

    async fn find_profile_by_slug(&self, slug: &str) -> AppResult<Option<Profile>>;

    /// Profiles with the given ids, ordered by id. Unknown ids are skipped.
    async fn find_profiles_by_ids(&self, profile_ids: &[ProfileId]) -> AppResult<Vec<Profile>>;

    /// Every profile except the given one, ordered by id.
    async fn select_profiles_except(&self, profile_id: ProfileId) -> AppResult<Vec<Profile>>;

    /// Whether a profile other than `owner` already uses `slug`.
    async fn slug_taken(&self, slug: &str, owner: Option<ProfileId>) -> AppResult<bool>;

    async fn update_profile(
        &self,
        profile_id: ProfileId,
        update: ProfileUpdate<'_>,
        now: OffsetDateTime,
    ) -> AppResult<Profile>;

    async fn count_posts(&self, profile_id: ProfileId) -> AppResult<i64>;
}

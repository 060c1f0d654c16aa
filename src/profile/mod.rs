pub mod repo;

use crate::auth::UserId;
use crate::avatar::{AvatarUpload, DiscardAvatar, StoreAvatar};
use crate::error::{AppResult, Error};
use crate::relationship::repo::RelationshipRepo;
use crate::relationship::{Involvement, Relationship, Status};
use crate::slug;
use crate::timestamp::Timestamp;
use crate::viewer::Viewer;
use crate::{GetConfig, System};
use repo::{NewProfile, ProfileRepo, ProfileUpdate};

use entrait::entrait;
use std::collections::HashSet;

const FIELD_MAX_CHARS: usize = 200;
const BIO_MAX_CHARS: usize = 300;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ProfileId(pub i64);

#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub user_id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub email: String,
    pub country: String,
    /// Path of the avatar image relative to the media root.
    pub avatar: String,
    pub slug: String,
    pub created: Timestamp,
    pub updated: Timestamp,
}

/// The editable part of a profile, as submitted by its owner.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ProfileForm {
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub email: String,
    pub country: String,
}

impl ProfileForm {
    pub fn validate(&self) -> AppResult<()> {
        let mut errors: Vec<(&'static str, String)> = vec![];

        for (field, value) in [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("email", &self.email),
            ("country", &self.country),
        ] {
            if value.chars().count() > FIELD_MAX_CHARS {
                errors.push((
                    field,
                    format!("ensure this value has at most {FIELD_MAX_CHARS} characters"),
                ));
            }
        }

        if self.bio.trim().is_empty() {
            errors.push(("bio", "this field is required".to_string()));
        } else if self.bio.chars().count() > BIO_MAX_CHARS {
            errors.push((
                "bio",
                format!("ensure this value has at most {BIO_MAX_CHARS} characters"),
            ));
        }

        if !self.email.is_empty() && !looks_like_email(&self.email) {
            errors.push(("email", "enter a valid email address".to_string()));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::unprocessable_entity(errors))
        }
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && domain.contains('.')
                && !email.chars().any(char::is_whitespace)
                && !domain.contains('@')
        }
        None => false,
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug)]
pub struct ProfileListPage {
    pub profiles: Vec<Profile>,
    #[serde(flatten)]
    pub involvement: Involvement,
    pub is_empty: bool,
}

#[derive(serde::Serialize, serde::Deserialize, Debug)]
pub struct ProfileDetailPage {
    pub profile: Profile,
    #[serde(flatten)]
    pub involvement: Involvement,
    pub friends_count: usize,
    pub posts_count: i64,
    pub has_posts: bool,
}

/// Profiles `viewer` may invite: everyone except the viewer and the profiles
/// already connected to it by an accepted relationship, in either direction.
pub fn invitable(
    viewer: ProfileId,
    others: Vec<Profile>,
    relationships: &[Relationship],
    exclude_pending: bool,
) -> Vec<Profile> {
    let connected: HashSet<ProfileId> = relationships
        .iter()
        .filter(|rel| rel.involves(viewer))
        .filter(|rel| match rel.status {
            Status::Accepted => true,
            Status::Pending => exclude_pending,
        })
        .map(|rel| rel.counterpart(viewer))
        .collect();

    others
        .into_iter()
        .filter(|profile| profile.id != viewer && !connected.contains(&profile.id))
        .collect()
}

#[entrait(pub Api, mock_api=ProfileApiMock)]
pub mod api {
    use super::*;

    /// Create the profile belonging to a freshly registered account.
    pub async fn create_profile(
        deps: &(impl ProfileRepo + System),
        user_id: UserId,
        username: &str,
    ) -> AppResult<Profile> {
        if username.trim().is_empty() {
            return Err(Error::unprocessable_entity([(
                "username",
                "this field is required",
            )]));
        }

        if deps.find_profile_by_user(user_id).await?.is_some() {
            return Err(Error::ProfileExists);
        }

        let slug = slug::unique_slug(deps, "", "", username, None).await?;
        let profile = deps
            .insert_profile(
                NewProfile {
                    user_id,
                    username,
                    slug: &slug,
                },
                deps.get_current_time(),
            )
            .await?;

        tracing::info!(profile_id = profile.id.0, slug = %profile.slug, "created profile");

        Ok(profile)
    }

    pub async fn update_my_profile(
        deps: &(impl ProfileRepo + System + StoreAvatar + DiscardAvatar),
        viewer: &Viewer,
        form: ProfileForm,
        avatar: Option<AvatarUpload>,
    ) -> AppResult<Profile> {
        form.validate()?;

        let current = &viewer.profile;
        let names_changed =
            form.first_name != current.first_name || form.last_name != current.last_name;

        let slug = if names_changed || current.slug.is_empty() {
            Some(
                slug::unique_slug(
                    deps,
                    &form.first_name,
                    &form.last_name,
                    &current.username,
                    Some(current.id),
                )
                .await?,
            )
        } else {
            None
        };

        let avatar = match avatar {
            Some(upload) => Some(deps.store_avatar(upload).await?),
            None => None,
        };

        let result = deps
            .update_profile(
                current.id,
                ProfileUpdate {
                    first_name: &form.first_name,
                    last_name: &form.last_name,
                    bio: &form.bio,
                    email: &form.email,
                    country: &form.country,
                    slug: slug.as_deref(),
                    avatar: avatar.as_deref(),
                },
                deps.get_current_time(),
            )
            .await;

        // Nothing refers to the new file unless the row was saved
        if let (Err(_), Some(avatar)) = (&result, &avatar) {
            deps.discard_avatar(avatar).await;
        }

        result
    }

    pub async fn list_invitable(
        deps: &(impl ProfileRepo + RelationshipRepo + GetConfig),
        viewer: &Viewer,
    ) -> AppResult<Vec<Profile>> {
        let viewer_id = viewer.id();
        let others = deps.select_profiles_except(viewer_id).await?;
        let relationships = deps.select_relationships_of(viewer_id).await?;

        Ok(invitable(
            viewer_id,
            others,
            &relationships,
            deps.invite_list_excludes_pending(),
        ))
    }

    pub async fn list_others(deps: &impl ProfileRepo, viewer: &Viewer) -> AppResult<Vec<Profile>> {
        deps.select_profiles_except(viewer.id()).await
    }

    pub async fn profile_list_page(
        deps: &(impl ProfileRepo + RelationshipRepo),
        viewer: &Viewer,
    ) -> AppResult<ProfileListPage> {
        let profiles = list_others(deps, viewer).await?;
        let relationships = deps.select_relationships_of(viewer.id()).await?;

        Ok(ProfileListPage {
            is_empty: profiles.is_empty(),
            profiles,
            involvement: Involvement::of(viewer.id(), &relationships),
        })
    }

    pub async fn profile_detail_page(
        deps: &(impl ProfileRepo + RelationshipRepo),
        viewer: &Viewer,
        slug: &str,
    ) -> AppResult<ProfileDetailPage> {
        let profile = deps
            .find_profile_by_slug(slug)
            .await?
            .ok_or(Error::ProfileNotFound)?;

        let viewer_relationships = deps.select_relationships_of(viewer.id()).await?;
        let friends_count = deps
            .select_relationships_of(profile.id)
            .await?
            .iter()
            .filter(|rel| rel.status == Status::Accepted)
            .count();
        let posts_count = deps.count_posts(profile.id).await?;

        Ok(ProfileDetailPage {
            profile,
            involvement: Involvement::of(viewer.id(), &viewer_relationships),
            friends_count,
            posts_count,
            has_posts: posts_count > 0,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::repo::ProfileRepoMock;
    use super::test::*;
    use super::*;
    use crate::app::test::test_app;
    use crate::relationship::repo::RelationshipRepoMock;
    use crate::relationship::test::test_relationship;
    use crate::relationship::Api as _;
    use crate::avatar::{DiscardAvatarMock, StoreAvatarMock};
    use crate::{GetConfigMock, SystemMock};

    use assert_matches::*;
    use unimock::*;

    fn ids(profiles: &[Profile]) -> Vec<i64> {
        profiles.iter().map(|profile| profile.id.0).collect()
    }

    #[test]
    fn invitable_should_exclude_viewer_and_friends_in_both_directions() {
        let others = vec![
            test_profile(1, "me"),
            test_profile(2, "friend_i_invited"),
            test_profile(3, "friend_who_invited_me"),
            test_profile(4, "stranger"),
        ];
        let relationships = vec![
            test_relationship(1, 2, Status::Accepted),
            test_relationship(3, 1, Status::Accepted),
            // Friendship between others doesn't concern the viewer
            test_relationship(4, 2, Status::Accepted),
        ];

        assert_eq!(
            vec![4],
            ids(&invitable(ProfileId(1), others, &relationships, false))
        );
    }

    #[test]
    fn invitable_should_keep_pending_unless_configured() {
        let others = || vec![test_profile(2, "invited"), test_profile(3, "inviter")];
        let relationships = vec![
            test_relationship(1, 2, Status::Pending),
            test_relationship(3, 1, Status::Pending),
        ];

        assert_eq!(
            vec![2, 3],
            ids(&invitable(ProfileId(1), others(), &relationships, false))
        );
        assert!(invitable(ProfileId(1), others(), &relationships, true).is_empty());
    }

    #[test]
    fn form_validation_should_require_bio() {
        let form = ProfileForm {
            bio: "  ".to_string(),
            ..test_form("Jane", "Doe")
        };

        assert_matches!(
            form.validate(),
            Err(Error::UnprocessableEntity { errors }) if errors.contains_key("bio")
        );
    }

    #[test]
    fn form_validation_should_check_lengths_and_email() {
        let form = ProfileForm {
            first_name: "x".repeat(201),
            email: "not-an-email".to_string(),
            bio: "b".repeat(301),
            ..Default::default()
        };

        match form.validate() {
            Err(Error::UnprocessableEntity { errors }) => {
                assert!(errors.contains_key("first_name"));
                assert!(errors.contains_key("email"));
                assert!(errors.contains_key("bio"));
                assert!(!errors.contains_key("last_name"));
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn form_validation_should_accept_reasonable_input() {
        let form = ProfileForm {
            email: "jane@example.com".to_string(),
            country: "Norway".to_string(),
            ..test_form("Jane", "Doe")
        };

        assert!(form.validate().is_ok());
        assert!(!looks_like_email("jane@localhost"));
        assert!(!looks_like_email("jane doe@example.com"));
    }

    #[tokio::test]
    async fn list_invitable_should_apply_configured_policy() {
        let deps = Unimock::new((
            ProfileRepoMock::select_profiles_except
                .next_call(matching!(ProfileId(1)))
                .returns(Ok(vec![test_profile(2, "invited"), test_profile(3, "other")])),
            RelationshipRepoMock::select_relationships_of
                .next_call(matching!(ProfileId(1)))
                .returns(Ok(vec![test_relationship(1, 2, Status::Pending)])),
            GetConfigMock::invite_list_excludes_pending
                .each_call(matching!())
                .returns(true),
        ));

        let profiles = api::list_invitable(&deps, &Viewer::new(test_profile(1, "me")))
            .await
            .unwrap();

        assert_eq!(vec![3], ids(&profiles));
    }

    #[tokio::test]
    async fn create_profile_twice_should_fail() {
        let deps = Unimock::new(
            ProfileRepoMock::find_profile_by_user
                .next_call(matching!(_))
                .returns(Ok(Some(test_profile(1, "jane")))),
        );

        assert_matches!(
            api::create_profile(&deps, UserId(uuid::Uuid::new_v4()), "jane").await,
            Err(Error::ProfileExists)
        );
    }

    #[tokio::test]
    async fn profile_detail_for_unknown_slug_should_be_not_found() {
        let deps = Unimock::new(
            ProfileRepoMock::find_profile_by_slug
                .next_call(matching!("nobody"))
                .returns(Ok(None)),
        );

        assert_matches!(
            api::profile_detail_page(&deps, &Viewer::new(test_profile(1, "me")), "nobody").await,
            Err(Error::ProfileNotFound)
        );
    }

    #[tokio::test]
    async fn invalid_form_should_not_touch_the_repository() {
        // Any repository call would panic
        let deps = Unimock::new(());

        assert_matches!(
            api::update_my_profile(
                &deps,
                &Viewer::new(test_profile(1, "me")),
                ProfileForm::default(),
                None
            )
            .await,
            Err(Error::UnprocessableEntity { .. })
        );
    }

    #[tokio::test]
    async fn failed_update_should_discard_new_avatar() {
        let deps = Unimock::new((
            StoreAvatarMock
                .next_call(matching!(_))
                .returns(Ok("avatars/new.png".to_string())),
            SystemMock::get_current_time
                .next_call(matching!())
                .returns(time::OffsetDateTime::UNIX_EPOCH),
            ProfileRepoMock::update_profile
                .next_call(matching!(ProfileId(1), _, _))
                .returns(Err(Error::ProfileNotFound)),
            DiscardAvatarMock
                .next_call(matching!("avatars/new.png"))
                .returns(()),
        ));

        assert_matches!(
            api::update_my_profile(
                &deps,
                &Viewer::new(test_profile(1, "me")),
                test_form("", ""),
                Some(AvatarUpload {
                    file_name: "me.png".to_string(),
                    bytes: bytes::Bytes::from_static(b"\x89PNG"),
                })
            )
            .await,
            Err(Error::ProfileNotFound)
        );
    }

    #[tokio::test]
    async fn update_of_missing_profile_should_leave_no_avatar_file() {
        let app = test_app().await;
        let ghost = Viewer::new(test_profile(999, "ghost"));

        assert_matches!(
            app.update_my_profile(
                &ghost,
                test_form("", ""),
                Some(AvatarUpload {
                    file_name: "ghost.png".to_string(),
                    bytes: bytes::Bytes::from_static(b"\x89PNG"),
                })
            )
            .await,
            Err(Error::ProfileNotFound)
        );

        let mut entries = tokio::fs::read_dir(app.media_root().join("avatars"))
            .await
            .unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn profile_list_page_should_list_everyone_but_the_viewer() -> AppResult<()> {
        let app = test_app().await;
        let me = app
            .create_profile(UserId(uuid::Uuid::new_v4()), "me")
            .await
            .map(Viewer::new)?;
        let other = app.create_profile(UserId(uuid::Uuid::new_v4()), "other").await?;

        let page = app.profile_list_page(&me).await?;

        assert_eq!(vec![other.id.0], ids(&page.profiles));
        assert!(!page.is_empty);

        Ok(())
    }

    #[tokio::test]
    async fn slug_should_follow_names_and_stay_unique() -> AppResult<()> {
        let app = test_app().await;
        let jane = app
            .create_profile(UserId(uuid::Uuid::new_v4()), "jane")
            .await?;
        let other_jane = app
            .create_profile(UserId(uuid::Uuid::new_v4()), "jane2")
            .await?;
        assert_eq!("jane", jane.slug);

        let jane = app
            .update_my_profile(&Viewer::new(jane), test_form("Jane", "Doe"), None)
            .await?;
        assert_eq!("janedoe", jane.slug);

        let other_jane = app
            .update_my_profile(&Viewer::new(other_jane), test_form("Jane", "Doe"), None)
            .await?;
        assert_ne!(jane.slug, other_jane.slug);
        assert!(other_jane.slug.starts_with("janedoe"));
        assert!(other_jane.slug.len() > "janedoe".len());

        Ok(())
    }

    #[tokio::test]
    async fn unchanged_names_should_keep_slug() -> AppResult<()> {
        let app = test_app().await;
        let jane = app
            .create_profile(UserId(uuid::Uuid::new_v4()), "jane")
            .await?;
        let jane = app
            .update_my_profile(&Viewer::new(jane), test_form("Jane", "Doe"), None)
            .await?;

        let jane = app
            .update_my_profile(
                &Viewer::new(jane),
                ProfileForm {
                    bio: "Updated bio".to_string(),
                    country: "Norway".to_string(),
                    ..test_form("Jane", "Doe")
                },
                None,
            )
            .await?;

        assert_eq!("janedoe", jane.slug);
        assert_eq!("Updated bio", jane.bio);
        assert_eq!("Norway", jane.country);

        Ok(())
    }

    #[tokio::test]
    async fn first_name_only_should_fall_back_to_username_slug() -> AppResult<()> {
        let app = test_app().await;
        let jane = app
            .create_profile(UserId(uuid::Uuid::new_v4()), "Jane_99")
            .await?;

        let jane = app
            .update_my_profile(&Viewer::new(jane), test_form("Jane", ""), None)
            .await?;

        assert_eq!("jane_99", jane.slug);

        Ok(())
    }

    #[tokio::test]
    async fn invite_list_should_follow_relationship_state() -> AppResult<()> {
        let app = test_app().await;
        let me = Viewer::new(app.create_profile(UserId(uuid::Uuid::new_v4()), "me").await?);
        let friend =
            Viewer::new(app.create_profile(UserId(uuid::Uuid::new_v4()), "friend").await?);
        let invited = app
            .create_profile(UserId(uuid::Uuid::new_v4()), "invited")
            .await?;
        let stranger = app
            .create_profile(UserId(uuid::Uuid::new_v4()), "stranger")
            .await?;

        app.send_invitation(&friend, me.id()).await?;
        app.accept_invitation(&me, friend.id()).await?;
        app.send_invitation(&me, invited.id).await?;

        let invitable = app.list_invitable(&me).await?;
        assert_eq!(vec![invited.id.0, stranger.id.0], ids(&invitable));
        assert!(!invitable.iter().any(|profile| profile.id == me.id()));

        let friends_view = app.list_invitable(&friend).await?;
        assert!(!friends_view.iter().any(|profile| profile.id == me.id()));

        let others = app.list_others(&me).await?;
        assert_eq!(3, others.len());

        Ok(())
    }

    #[tokio::test]
    async fn profile_pages_should_expose_involvement() -> AppResult<()> {
        let app = test_app().await;
        let me = Viewer::new(app.create_profile(UserId(uuid::Uuid::new_v4()), "me").await?);
        let inviter =
            Viewer::new(app.create_profile(UserId(uuid::Uuid::new_v4()), "inviter").await?);
        let invited = app
            .create_profile(UserId(uuid::Uuid::new_v4()), "invited")
            .await?;

        app.send_invitation(&inviter, me.id()).await?;
        app.send_invitation(&me, invited.id).await?;

        let list = app.profile_list_page(&me).await?;
        assert!(!list.is_empty);
        assert_eq!(2, list.profiles.len());
        assert_eq!(vec![invited.id], list.involvement.invited_by_me);
        assert_eq!(vec![inviter.id()], list.involvement.invited_me);

        app.accept_invitation(&me, inviter.id()).await?;

        let detail = app.profile_detail_page(&me, "inviter").await?;
        assert_eq!(inviter.id(), detail.profile.id);
        assert_eq!(1, detail.friends_count);
        assert_eq!(0, detail.posts_count);
        assert!(!detail.has_posts);

        Ok(())
    }

    #[tokio::test]
    async fn lonely_profile_list_should_be_empty() -> AppResult<()> {
        let app = test_app().await;
        let me = Viewer::new(app.create_profile(UserId(uuid::Uuid::new_v4()), "me").await?);

        let list = app.profile_list_page(&me).await?;

        assert!(list.is_empty);
        assert!(list.profiles.is_empty());

        Ok(())
    }
}

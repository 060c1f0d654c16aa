use crate::auth::Token;
use crate::avatar::AvatarUpload;
use crate::error::AppResult;
use crate::profile::{Profile, ProfileDetailPage, ProfileForm, ProfileListPage};
use crate::viewer::PageContext;

use axum::extract::{Extension, Multipart, Path};
use axum::routing::{get, post};
use axum::Json;

#[derive(serde::Serialize, serde::Deserialize, Debug)]
struct ProfileBody {
    profile: Profile,
}

#[derive(serde::Serialize, serde::Deserialize, Debug)]
struct SavedProfileBody {
    profile: Profile,
    confirm: bool,
}

#[derive(serde::Serialize, serde::Deserialize, Debug)]
struct ProfilesBody {
    profiles: Vec<Profile>,
}

#[derive(serde::Serialize, serde::Deserialize, Debug)]
struct NewProfileBody {
    username: String,
}

pub struct ProfileRoutes<D>(std::marker::PhantomData<D>);

impl<D> ProfileRoutes<D>
where
    D: crate::profile::Api
        + crate::viewer::Api
        + crate::auth::Tokens
        + Sized
        + Clone
        + Send
        + Sync
        + 'static,
{
    pub fn router() -> axum::Router {
        axum::Router::new()
            .route(
                "/my-profile",
                get(Self::my_profile).post(Self::update_my_profile),
            )
            .route("/profiles", post(Self::create_profile))
            .route("/invite-list", get(Self::invite_list))
            .route("/profile-list", get(Self::profile_list))
            .route("/profile-detail/:slug", get(Self::profile_detail))
            .route("/context", get(Self::context))
    }

    async fn my_profile(Extension(deps): Extension<D>, token: Token) -> AppResult<Json<ProfileBody>> {
        let viewer = deps.resolve_viewer(token).await?;

        Ok(Json(ProfileBody {
            profile: viewer.profile,
        }))
    }

    async fn update_my_profile(
        Extension(deps): Extension<D>,
        token: Token,
        mut multipart: Multipart,
    ) -> AppResult<Json<SavedProfileBody>> {
        let viewer = deps.resolve_viewer(token).await?;

        let mut form = ProfileForm::default();
        let mut avatar = None;

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "first_name" => form.first_name = field.text().await?,
                "last_name" => form.last_name = field.text().await?,
                "bio" => form.bio = field.text().await?,
                "email" => form.email = field.text().await?,
                "country" => form.country = field.text().await?,
                "avatar" => {
                    let file_name = field.file_name().unwrap_or_default().to_string();
                    let bytes = field.bytes().await?;

                    // Browsers submit an empty part when no file was chosen
                    if !(file_name.is_empty() && bytes.is_empty()) {
                        avatar = Some(AvatarUpload { file_name, bytes });
                    }
                }
                _ => {}
            }
        }

        Ok(Json(SavedProfileBody {
            profile: deps.update_my_profile(&viewer, form, avatar).await?,
            confirm: true,
        }))
    }

    async fn create_profile(
        Extension(deps): Extension<D>,
        token: Token,
        Json(body): Json<NewProfileBody>,
    ) -> AppResult<Json<ProfileBody>> {
        let user_id = deps.authenticate(token)?;

        Ok(Json(ProfileBody {
            profile: deps.create_profile(user_id, &body.username).await?,
        }))
    }

    async fn invite_list(
        Extension(deps): Extension<D>,
        token: Token,
    ) -> AppResult<Json<ProfilesBody>> {
        let viewer = deps.resolve_viewer(token).await?;

        Ok(Json(ProfilesBody {
            profiles: deps.list_invitable(&viewer).await?,
        }))
    }

    async fn profile_list(
        Extension(deps): Extension<D>,
        token: Token,
    ) -> AppResult<Json<ProfileListPage>> {
        let viewer = deps.resolve_viewer(token).await?;

        Ok(Json(deps.profile_list_page(&viewer).await?))
    }

    async fn profile_detail(
        Extension(deps): Extension<D>,
        token: Token,
        Path(slug): Path<String>,
    ) -> AppResult<Json<ProfileDetailPage>> {
        let viewer = deps.resolve_viewer(token).await?;

        Ok(Json(deps.profile_detail_page(&viewer, &slug).await?))
    }

    async fn context(Extension(deps): Extension<D>, token: Token) -> AppResult<Json<PageContext>> {
        let viewer = deps.resolve_viewer(token).await?;

        Ok(Json(deps.page_context(&viewer).await?))
    }
}

use axum::http::header::WWW_AUTHENTICATE;
use axum::http::StatusCode;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::borrow::Cow;
use std::collections::HashMap;

pub type AppResult<T, E = Error> = std::result::Result<T, E>;

type FieldErrors = HashMap<Cow<'static, str>, Vec<Cow<'static, str>>>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("authentication required")]
    Unauthorized,

    #[error("the current account has no profile")]
    CurrentProfileDoesNotExist,

    #[error("profile not found")]
    ProfileNotFound,

    #[error("relationship not found")]
    RelationshipNotFound,

    #[error("the current account already has a profile")]
    ProfileExists,

    #[error("a profile can not invite itself")]
    CannotInviteSelf,

    #[error("the profiles already have a relationship")]
    RelationshipExists,

    #[error("error in the request body")]
    UnprocessableEntity { errors: FieldErrors },

    #[error("malformed multipart body")]
    Multipart(#[from] axum::extract::multipart::MultipartError),

    #[error("an error occurred with the database")]
    Sqlx(#[from] sqlx::Error),

    #[error("an internal server error occurred")]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Convenient constructor for `Error::UnprocessableEntity`.
    ///
    /// Multiple values for the same key are collected into a list for that key.
    pub fn unprocessable_entity<K, V>(errors: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<Cow<'static, str>>,
        V: Into<Cow<'static, str>>,
    {
        let mut error_map = HashMap::new();

        for (key, val) in errors {
            error_map
                .entry(key.into())
                .or_insert_with(Vec::new)
                .push(val.into());
        }

        Self::UnprocessableEntity { errors: error_map }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::CurrentProfileDoesNotExist => StatusCode::NOT_FOUND,
            Self::ProfileNotFound => StatusCode::NOT_FOUND,
            Self::RelationshipNotFound => StatusCode::NOT_FOUND,
            Self::ProfileExists => StatusCode::UNPROCESSABLE_ENTITY,
            Self::CannotInviteSelf => StatusCode::UNPROCESSABLE_ENTITY,
            Self::RelationshipExists => StatusCode::UNPROCESSABLE_ENTITY,
            Self::UnprocessableEntity { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Multipart(_) => StatusCode::BAD_REQUEST,
            Self::Sqlx(_) | Self::Anyhow(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized => (
                self.status_code(),
                [(WWW_AUTHENTICATE, HeaderValue::from_static("Token"))]
                    .into_iter()
                    .collect::<HeaderMap>(),
                self.to_string(),
            )
                .into_response(),
            Self::CurrentProfileDoesNotExist
            | Self::ProfileNotFound
            | Self::RelationshipNotFound => (self.status_code(), ()).into_response(),
            Self::ProfileExists => unprocessable_entity_with_errors([(
                "profile".into(),
                vec!["the current account already has a profile".into()],
            )]),
            Self::CannotInviteSelf => unprocessable_entity_with_errors([(
                "profile_pk".into(),
                vec!["can not invite yourself".into()],
            )]),
            Self::RelationshipExists => unprocessable_entity_with_errors([(
                "profile_pk".into(),
                vec!["a relationship with this profile already exists".into()],
            )]),
            Self::UnprocessableEntity { errors } => unprocessable_entity_with_errors(errors),
            Self::Multipart(ref e) => (self.status_code(), e.body_text()).into_response(),
            Self::Sqlx(ref e) => {
                tracing::error!("SQLx error: {:?}", e);
                (self.status_code(), self.to_string()).into_response()
            }
            Self::Anyhow(ref e) => {
                tracing::error!("Generic error: {:?}", e);
                (self.status_code(), self.to_string()).into_response()
            }
        }
    }
}

#[derive(serde::Serialize)]
struct JsonErrors {
    errors: FieldErrors,
}

fn unprocessable_entity_with_errors(errors: impl Into<FieldErrors>) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(JsonErrors {
            errors: errors.into(),
        }),
    )
        .into_response()
}

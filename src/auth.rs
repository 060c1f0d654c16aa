use crate::error::{AppResult, Error};
use crate::{GetConfig, System};

use axum_extra::TypedHeader;
use entrait::entrait;
use headers::authorization::Credentials;
use headers::Authorization;
use http::HeaderValue;
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use uuid::Uuid;

const DEFAULT_SESSION_LENGTH: time::Duration = time::Duration::weeks(2);

/// Identifier of an account in the external account service.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

#[derive(serde::Serialize, serde::Deserialize)]
struct AuthUserClaims {
    user_id: Uuid,
    /// Standard JWT `exp` claim.
    exp: i64,
}

#[entrait(pub Tokens, mock_api=TokensMock)]
pub mod tokens {
    use super::*;

    /// Issue a session token for an account.
    pub fn sign_user_id(deps: &(impl System + GetConfig), user_id: UserId) -> String {
        AuthUserClaims {
            user_id: user_id.0,
            exp: (deps.get_current_time() + DEFAULT_SESSION_LENGTH).unix_timestamp(),
        }
        .sign_with_key(deps.get_jwt_signing_key())
        .expect("HMAC signing should be infallible")
    }

    pub fn authenticate(deps: &(impl System + GetConfig), token: Token) -> AppResult<UserId> {
        let jwt = jwt::Token::<jwt::Header, AuthUserClaims, _>::parse_unverified(token.token())
            .map_err(|_| Error::Unauthorized)?;

        let jwt = jwt
            .verify_with_key(deps.get_jwt_signing_key())
            .map_err(|_| Error::Unauthorized)?;
        let (_header, claims) = jwt.into();

        if claims.exp < deps.get_current_time().unix_timestamp() {
            return Err(Error::Unauthorized);
        }

        Ok(UserId(claims.user_id))
    }
}

///
/// Data for `Token` authorization scheme.
///
#[derive(Debug)]
pub struct Token(String);

impl Token {
    pub fn from_token(token: &str) -> Self {
        Self(format!("Token {token}"))
    }

    pub fn token(&self) -> &str {
        self.0.get("Token ".len()..).unwrap_or_default()
    }
}

impl Credentials for Token {
    const SCHEME: &'static str = "Token";

    fn decode(value: &HeaderValue) -> Option<Self> {
        let auth_header = value.to_str().ok()?;

        Some(Token(auth_header.to_string()))
    }

    fn encode(&self) -> HeaderValue {
        HeaderValue::from_str(&self.0).expect("token was decoded from a valid header value")
    }
}

#[async_trait::async_trait]
impl<S> axum::extract::FromRequestParts<S> for Token
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(token)) =
            TypedHeader::<Authorization<Token>>::from_request_parts(parts, state)
                .await
                .map_err(|_| Error::Unauthorized)?;

        Ok(token)
    }
}

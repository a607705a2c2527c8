use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::db::{self, models::User, DbPool};
use crate::error::{Error, Result};

/// Header carrying the caller identity, set once the upstream identity
/// provider has verified the client's token
pub const USER_ID_HEADER: &str = "x-user-id";

const MAX_USER_ID_LEN: usize = 128;

fn user_id_from_parts(parts: &Parts) -> Result<Option<String>> {
    let Some(value) = parts.headers.get(USER_ID_HEADER) else {
        return Ok(None);
    };

    let user_id = value
        .to_str()
        .map_err(|_| Error::Unauthorized("Malformed user identity".to_string()))?
        .trim();

    if user_id.is_empty() {
        return Ok(None);
    }

    if user_id.len() > MAX_USER_ID_LEN {
        return Err(Error::Unauthorized("Malformed user identity".to_string()));
    }

    Ok(Some(user_id.to_string()))
}

/// Identity of an authenticated caller. Rejects the request with 401 when absent.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub String);

impl CurrentUser {
    /// Load the caller's account; callers that never registered get 401
    pub async fn registered(&self, pool: &DbPool) -> Result<User> {
        db::users::find_user(pool, &self.0).await?.ok_or_else(|| {
            Error::Unauthorized("Register before using this endpoint".to_string())
        })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        user_id_from_parts(parts)?
            .map(CurrentUser)
            .ok_or_else(|| Error::Unauthorized("Authentication required".to_string()))
    }
}

/// Identity of the caller when one was supplied
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        Ok(MaybeUser(user_id_from_parts(parts)?))
    }
}

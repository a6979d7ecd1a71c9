//! Per-request context.
//!
//! The acting user is named on every request by the `X-User-Id` header and
//! resolved against the ledger before the handler runs.  Nothing about the
//! caller is kept between requests.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use chunkfund_shared::constants::ACTING_USER_HEADER;
use chunkfund_shared::types::UserId;
use chunkfund_store::{StoreError, User};

use crate::api::AppState;
use crate::error::ServerError;

/// Who is acting on this request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user: User,
}

impl RequestContext {
    pub fn user_id(&self) -> UserId {
        self.user.id
    }
}

#[async_trait]
impl FromRequestParts<AppState> for RequestContext {
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(ACTING_USER_HEADER)
            .ok_or_else(|| ServerError::Unauthorized(format!("missing {ACTING_USER_HEADER} header")))?
            .to_str()
            .map_err(|_| ServerError::Unauthorized("header is not valid text".into()))?;

        let user_id: UserId = raw
            .parse()
            .map_err(|_| ServerError::Unauthorized(format!("invalid user id {raw:?}")))?;

        let user = {
            let db = state.lock_db()?;
            match db.get_user(user_id) {
                Ok(user) => user,
                Err(StoreError::UserNotFound(id)) => {
                    return Err(ServerError::Unauthorized(format!("unknown user {id}")))
                }
                Err(e) => return Err(e.into()),
            }
        };

        Ok(Self { user })
    }
}

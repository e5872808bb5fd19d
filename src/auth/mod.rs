pub mod jwt;
pub mod password;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::Role,
    state::AppState,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Admins pass every role check.
    pub fn require_role(&self, allowed: &[Role]) -> AppResult<()> {
        if self.is_admin() || allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::forbidden())
        }
    }

    /// Workers may only read their own records; admins may read anyone's.
    pub fn require_self_or_admin(&self, worker_id: Uuid) -> AppResult<()> {
        if self.is_admin() || self.user_id == worker_id {
            Ok(())
        } else {
            Err(AppError::forbidden())
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::unauthorized())?;

        let claims = state
            .jwt
            .verify_token(bearer.token())
            .map_err(|_| AppError::unauthorized())?;

        let role = claims.role.parse().map_err(|_| AppError::unauthorized())?;

        Ok(AuthenticatedUser {
            user_id: claims.sub,
            email: claims.email,
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: Uuid::new_v4(),
            email: "someone@example.com".into(),
            role,
        }
    }

    #[test]
    fn admin_passes_every_role_check() {
        let admin = user(Role::Admin);
        assert!(admin.require_role(&[Role::Maid]).is_ok());
        assert!(admin.require_self_or_admin(Uuid::new_v4()).is_ok());
    }

    #[test]
    fn maid_cannot_act_as_senior_cleaner() {
        let maid = user(Role::Maid);
        assert!(maid.require_role(&[Role::Maid]).is_ok());
        let err = maid.require_role(&[Role::SeniorCleaner]).unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::FORBIDDEN);
    }

    #[test]
    fn workers_only_see_their_own_records() {
        let maid = user(Role::Maid);
        assert!(maid.require_self_or_admin(maid.user_id).is_ok());
        assert!(maid.require_self_or_admin(Uuid::new_v4()).is_err());
    }
}

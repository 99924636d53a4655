use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use crate::auth::claims::TokenKind;
use crate::auth::dto::JwtKeys;
use crate::auth::repo_types::UserRole;
use crate::error::ApiError;

/// Caller identity taken from the access token and handed to handlers explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: UserRole,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Passes for admins and for the user owning `owner_id`.
    pub fn require_self_or_admin(&self, owner_id: Uuid) -> Result<(), ApiError> {
        if self.is_admin() || self.id == owner_id {
            Ok(())
        } else {
            Err(ApiError::forbidden("Access denied"))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?;

        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or_else(|| ApiError::unauthorized("Invalid Authorization header"))?;

        let claims = keys.verify(token).map_err(|_| {
            warn!("invalid or expired token");
            ApiError::unauthorized("Invalid or expired token")
        })?;

        if claims.kind != TokenKind::Access {
            return Err(ApiError::unauthorized("Access token required"));
        }

        Ok(AuthUser {
            id: claims.sub,
            role: claims.role,
        })
    }
}

/// An [`AuthUser`] whose role is admin; anyone else gets 403.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser(pub AuthUser);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            warn!(user_id = %user.id, role = %user.role, "admin route refused");
            return Err(ApiError::forbidden("Admin access required"));
        }
        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::services::test_support::bearer;
    use crate::state::AppState;
    use axum::http::Request;

    async fn extract<T>(state: &AppState, header: Option<&str>) -> Result<T, ApiError>
    where
        T: FromRequestParts<AppState, Rejection = ApiError>,
    {
        let mut builder = Request::builder().uri("/x");
        if let Some(h) = header {
            builder = builder.header(axum::http::header::AUTHORIZATION, h);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        T::from_request_parts(&mut parts, state).await
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let state = AppState::fake();
        let err = extract::<AuthUser>(&state, None).await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn valid_token_yields_identity() {
        let state = AppState::fake();
        let (id, header) = bearer(&state, UserRole::Candidate);
        let user = extract::<AuthUser>(&state, Some(&header)).await.unwrap();
        assert_eq!(user, AuthUser { id, role: UserRole::Candidate });
    }

    #[tokio::test]
    async fn refresh_token_is_not_an_access_token() {
        let state = AppState::fake();
        let token = JwtKeys::from_ref(&state)
            .sign_refresh(Uuid::new_v4(), UserRole::Admin)
            .unwrap();
        let err = extract::<AuthUser>(&state, Some(&format!("Bearer {token}")))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Access token required");
    }

    #[tokio::test]
    async fn admin_extractor_checks_role() {
        let state = AppState::fake();
        let (_, candidate) = bearer(&state, UserRole::Candidate);
        let err = extract::<AdminUser>(&state, Some(&candidate)).await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN);

        let (id, admin) = bearer(&state, UserRole::Admin);
        let AdminUser(user) = extract::<AdminUser>(&state, Some(&admin)).await.unwrap();
        assert_eq!(user.id, id);
    }

    #[test]
    fn self_or_admin() {
        let me = Uuid::new_v4();
        let candidate = AuthUser { id: me, role: UserRole::Candidate };
        assert!(candidate.require_self_or_admin(me).is_ok());
        assert!(candidate.require_self_or_admin(Uuid::new_v4()).is_err());
        let admin = AuthUser { id: Uuid::new_v4(), role: UserRole::Admin };
        assert!(admin.require_self_or_admin(me).is_ok());
    }
}

use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::{AdminUser, User, UserRole},
    error::{ApiError, ApiResult},
    pagination::{resolve_sort, PageRequest, PageResponse},
    state::AppState,
    users::{
        dto::{AccountStatus, StatusQuery, UserListQuery, UserResponse},
        repo::{UserFilter, DEFAULT_SORT, SORT_COLUMNS},
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id", get(get_user))
        .route("/users/:id/status", put(update_status))
}

/// `None` for absent, blank or `all`.
fn meaningful(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("all"))
}

fn user_filter(q: &UserListQuery) -> ApiResult<UserFilter> {
    let role = meaningful(q.role.as_deref())
        .map(str::parse::<UserRole>)
        .transpose()?;
    let is_active = meaningful(q.status.as_deref())
        .map(str::parse::<AccountStatus>)
        .transpose()?
        .map(AccountStatus::is_active);
    Ok(UserFilter {
        role,
        is_active,
        search: meaningful(q.search.as_deref()).map(str::to_string),
    })
}

#[instrument(skip(state, q))]
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(q): Query<UserListQuery>,
) -> ApiResult<Json<PageResponse<UserResponse>>> {
    let filter = user_filter(&q)?;
    let page = PageRequest::new(q.page, q.size);
    let sort = resolve_sort(q.sort.as_deref(), SORT_COLUMNS, DEFAULT_SORT);
    let (rows, total) = User::list(&state.db, &filter, page, sort).await?;
    let content = rows.into_iter().map(UserResponse::from).collect();
    Ok(Json(PageResponse::new(content, page, total)))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserResponse>> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(UserResponse::from(user)))
}

#[instrument(skip(state, q), fields(status = %q.status))]
pub async fn update_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Query(q): Query<StatusQuery>,
) -> ApiResult<Json<UserResponse>> {
    let status: AccountStatus = q.status.parse()?;
    let user = User::set_active(&state.db, id, status.is_active())
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    info!(user_id = %id, admin_id = %admin.id, active = status.is_active(), "account status changed");
    Ok(Json(UserResponse::from(user)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::services::test_support::bearer;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    fn query(role: Option<&str>, status: Option<&str>, search: Option<&str>) -> UserListQuery {
        UserListQuery {
            role: role.map(str::to_string),
            status: status.map(str::to_string),
            search: search.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn all_means_no_filter() {
        let f = user_filter(&query(Some("all"), Some("ALL"), Some("  "))).unwrap();
        assert!(f.role.is_none());
        assert!(f.is_active.is_none());
        assert!(f.search.is_none());
    }

    #[test]
    fn filters_parse_strictly() {
        let f = user_filter(&query(Some("EMPLOYER"), Some("suspended"), Some(" asha "))).unwrap();
        assert_eq!(f.role, Some(UserRole::Employer));
        assert_eq!(f.is_active, Some(false));
        assert_eq!(f.search.as_deref(), Some("asha"));
        assert!(user_filter(&query(Some("recruiter"), None, None)).is_err());
        assert!(user_filter(&query(None, Some("banned"), None)).is_err());
    }

    #[tokio::test]
    async fn status_update_is_admin_only() {
        let state = AppState::fake();
        let (_, token) = bearer(&state, UserRole::Employer);
        let res = user_routes()
            .with_state(state)
            .oneshot(
                Request::put(format!("/users/{}/status?status=active", Uuid::new_v4()))
                    .header(header::AUTHORIZATION, token)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn unknown_account_status_is_bad_request() {
        let state = AppState::fake();
        let (_, token) = bearer(&state, UserRole::Admin);
        let res = user_routes()
            .with_state(state)
            .oneshot(
                Request::put(format!("/users/{}/status?status=banned", Uuid::new_v4()))
                    .header(header::AUTHORIZATION, token)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}

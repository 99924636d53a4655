use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::Response,
    routing::{delete, get, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    applications::{
        dto::{
            ApplicationListQuery, ApplicationResponse, SubmitApplicationForm, SubmittedResponse,
            UpdateStatusRequest,
        },
        repo::{ApplicationFilter, DEFAULT_SORT, SORT_COLUMNS},
        repo_types::{Application, ApplicationStatus},
        services,
    },
    auth::{AdminUser, AuthUser, User},
    error::{ApiError, ApiResult},
    pagination::{resolve_sort, PageParams, PageRequest, PageResponse},
    state::AppState,
    uploads::{attachment, remove_upload, UploadArea},
};

const RESUME_LIMIT: usize = 10 * 1024 * 1024;

pub fn application_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/applications",
            get(list_applications)
                .post(submit_application)
                .layer(DefaultBodyLimit::max(RESUME_LIMIT)),
        )
        .route("/applications/my", get(my_applications))
        .route("/applications/:id/status", put(update_status))
        .route("/applications/:id", delete(delete_application))
}

/// Served outside `/api`, where stored resume URLs point.
pub fn resume_routes() -> Router<AppState> {
    Router::new().route("/uploads/:file_name", get(download_resume))
}

#[instrument(skip(state, mp))]
pub async fn submit_application(
    State(state): State<AppState>,
    auth: AuthUser,
    mp: Multipart,
) -> ApiResult<Json<SubmittedResponse>> {
    let form = SubmitApplicationForm::from_multipart(mp).await?;
    let application = services::submit(&state, &auth, form).await?;
    Ok(Json(SubmittedResponse {
        id: application.id,
        message: "Application submitted successfully!",
        status: "success",
    }))
}

#[instrument(skip(state, q))]
pub async fn list_applications(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(q): Query<ApplicationListQuery>,
) -> ApiResult<Json<PageResponse<ApplicationResponse>>> {
    let status = q
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::parse::<ApplicationStatus>)
        .transpose()?;
    let filter = ApplicationFilter {
        job_id: q.job_id,
        candidate_id: q.candidate_id,
        candidate_email: q.candidate_email.clone().filter(|s| !s.trim().is_empty()),
        status,
        search: q.search.clone().filter(|s| !s.trim().is_empty()),
    };
    let page = PageRequest::new(q.page, q.size);
    let sort = resolve_sort(q.sort.as_deref(), SORT_COLUMNS, DEFAULT_SORT);
    let (rows, total) = Application::list(&state.db, &filter, page, sort).await?;
    let content = rows.into_iter().map(ApplicationResponse::from).collect();
    Ok(Json(PageResponse::new(content, page, total)))
}

#[instrument(skip(state, p))]
pub async fn my_applications(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(p): Query<PageParams>,
) -> ApiResult<Json<PageResponse<ApplicationResponse>>> {
    let user = User::find_by_id(&state.db, auth.id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User not found"))?;
    let filter = ApplicationFilter {
        candidate_email: Some(user.email),
        ..Default::default()
    };
    let page = p.page_request();
    let sort = resolve_sort(p.sort.as_deref(), SORT_COLUMNS, DEFAULT_SORT);
    let (rows, total) = Application::list(&state.db, &filter, page, sort).await?;
    let content = rows.into_iter().map(ApplicationResponse::from).collect();
    Ok(Json(PageResponse::new(content, page, total)))
}

#[instrument(skip(state, payload))]
pub async fn update_status(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> ApiResult<Json<ApplicationResponse>> {
    let details = services::update_status(&state, id, payload).await?;
    Ok(Json(ApplicationResponse::from(details)))
}

#[instrument(skip(state))]
pub async fn delete_application(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let resume_url = Application::delete(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Application not found"))?;
    if let Some(url) = resume_url {
        remove_upload(&state, UploadArea::Resumes, &url).await;
    }
    info!(application_id = %id, admin_id = %admin.id, "application deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn download_resume(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(file_name): Path<String>,
) -> ApiResult<Response> {
    let body = services::download_resume(&state, &auth, &file_name).await?;
    Ok(attachment(&file_name, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::services::test_support::bearer;
    use crate::auth::UserRole;
    use axum::body::Body;
    use axum::http::{header, Request};
    use tower::ServiceExt;

    fn app(state: AppState) -> Router {
        application_routes().merge(resume_routes()).with_state(state)
    }

    async fn send(state: AppState, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let res = app(state).oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or_default())
    }

    fn multipart(fields: &[(&str, &str)]) -> (String, String) {
        let boundary = "APPBOUNDARY";
        let mut body = String::new();
        for (name, value) in fields {
            body.push_str(&format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        body.push_str(&format!("--{boundary}--\r\n"));
        (format!("multipart/form-data; boundary={boundary}"), body)
    }

    #[tokio::test]
    async fn listing_is_admin_only() {
        let state = AppState::fake();
        let (_, token) = bearer(&state, UserRole::Candidate);
        let req = Request::get("/applications")
            .header(header::AUTHORIZATION, token)
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(state, req).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn status_update_rejects_unknown_status() {
        let state = AppState::fake();
        let (_, token) = bearer(&state, UserRole::Admin);
        let req = Request::put(format!("/applications/{}/status", Uuid::new_v4()))
            .header(header::AUTHORIZATION, token)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"status":"hired"}"#))
            .unwrap();
        let (status, body) = send(state, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "unknown application status: 'hired'");
    }

    #[tokio::test]
    async fn submission_without_candidate_id_is_bad_request() {
        let state = AppState::fake();
        let (_, token) = bearer(&state, UserRole::Candidate);
        let job_id = Uuid::new_v4().to_string();
        let (ct, body) = multipart(&[
            ("jobId", job_id.as_str()),
            ("candidateName", "Ravi"),
            ("candidateEmail", "ravi@example.com"),
            ("candidatePhone", "9876543210"),
        ]);
        let req = Request::post("/applications")
            .header(header::AUTHORIZATION, token)
            .header(header::CONTENT_TYPE, ct)
            .body(Body::from(body))
            .unwrap();
        let (status, body) = send(state, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "candidateId is a required parameter.");
    }

    #[tokio::test]
    async fn candidates_cannot_apply_for_others() {
        let state = AppState::fake();
        let (_, token) = bearer(&state, UserRole::Candidate);
        let job_id = Uuid::new_v4().to_string();
        let other = Uuid::new_v4().to_string();
        let (ct, body) = multipart(&[
            ("jobId", job_id.as_str()),
            ("candidateId", other.as_str()),
            ("candidateName", "Ravi"),
            ("candidateEmail", "ravi@example.com"),
            ("candidatePhone", "9876543210"),
        ]);
        let req = Request::post("/applications")
            .header(header::AUTHORIZATION, token)
            .header(header::CONTENT_TYPE, ct)
            .body(Body::from(body))
            .unwrap();
        let (status, _) = send(state, req).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn resume_download_requires_a_token() {
        let state = AppState::fake();
        let req = Request::get("/uploads/abc_cv.pdf").body(Body::empty()).unwrap();
        let (status, _) = send(state, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{AdminUser, AuthUser},
    employers::{
        dto::{
            DocumentUploadResponse, EmployerListQuery, EmployerListResponse, EmployerResponse,
            KycRequest, KycSubmissionRequest, KycSubmittedResponse, PendingCount,
            VerificationQuery, VerificationRequestList,
        },
        repo::{EmployerFilter, DEFAULT_SORT, SORT_COLUMNS},
        repo_types::{DocumentType, Employer, VerificationStatus},
        services,
    },
    error::{ApiError, ApiResult},
    pagination::{resolve_sort, PageParams, PageRequest},
    state::AppState,
    uploads::{attachment, UploadItem},
};

const DOCUMENT_LIMIT: usize = 10 * 1024 * 1024;

pub fn employer_routes() -> Router<AppState> {
    Router::new()
        .route("/employers", get(list_employers))
        .route("/employers/verification-requests", get(list_verification_requests))
        .route(
            "/employers/verification-requests/pending-count",
            get(pending_count),
        )
        .route("/employers/kyc-submission", post(submit_kyc_without_session))
        .route("/employers/documents/:file_name", get(download_document))
        .route("/employers/:id", get(get_employer))
        .route("/employers/:id/verification", put(update_verification))
        .route("/employers/:id/kyc", post(submit_kyc))
}

pub fn document_routes() -> Router<AppState> {
    Router::new()
        .route("/employers/:id/documents", post(upload_document))
        .layer(DefaultBodyLimit::max(DOCUMENT_LIMIT))
}

#[instrument(skip(state, q))]
pub async fn list_employers(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(q): Query<EmployerListQuery>,
) -> ApiResult<Json<EmployerListResponse>> {
    let verification_status = q
        .verification_status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::parse::<VerificationStatus>)
        .transpose()?;
    let filter = EmployerFilter {
        verification_status,
        search: q.search.clone().filter(|s| !s.trim().is_empty()),
    };
    let page = PageRequest::new(q.page, q.size);
    let sort = resolve_sort(q.sort.as_deref(), SORT_COLUMNS, DEFAULT_SORT);

    let (rows, total) = Employer::list(&state.db, &filter, page, sort).await?;
    Ok(Json(EmployerListResponse::new(rows, page, total)))
}

#[instrument(skip(state))]
pub async fn get_employer(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<EmployerResponse>> {
    let row = Employer::find_with_user(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Employer not found"))?;
    auth.require_self_or_admin(row.employer.user_id)?;
    Ok(Json(EmployerResponse::from(row)))
}

#[instrument(skip(state, p))]
pub async fn list_verification_requests(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(p): Query<PageParams>,
) -> ApiResult<Json<VerificationRequestList>> {
    let page = p.page_request();
    let (rows, total) = Employer::list_verification_requests(&state.db, page).await?;
    Ok(Json(VerificationRequestList::new(rows, page, total)))
}

#[instrument(skip(state))]
pub async fn pending_count(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ApiResult<Json<PendingCount>> {
    let count = Employer::count_verification_requests(&state.db).await?;
    Ok(Json(PendingCount { count }))
}

#[instrument(skip(state, q), fields(status = %q.status))]
pub async fn update_verification(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Query(q): Query<VerificationQuery>,
) -> ApiResult<Json<EmployerResponse>> {
    let status: VerificationStatus = q.status.parse().map_err(|e| {
        warn!(admin_id = %admin.id, status = %q.status, "unknown verification status");
        ApiError::from(e)
    })?;
    let row = services::update_verification(&state, id, status, q.notes.as_deref()).await?;
    Ok(Json(EmployerResponse::from(row)))
}

#[instrument(skip(state, payload))]
pub async fn submit_kyc(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<KycRequest>,
) -> ApiResult<Json<KycSubmittedResponse>> {
    let employer =
        services::submit_kyc(&state, &auth, id, &payload.aadhaar_number, &payload.pan_number)
            .await?;
    Ok(Json(KycSubmittedResponse::for_employer(
        &employer,
        "KYC submitted successfully",
    )))
}

#[instrument(skip(state, payload))]
pub async fn submit_kyc_without_session(
    State(state): State<AppState>,
    Json(payload): Json<KycSubmissionRequest>,
) -> ApiResult<Json<KycSubmittedResponse>> {
    let (employer, email) = services::submit_kyc_by_email(&state, &payload).await?;
    let mut res = KycSubmittedResponse::for_employer(
        &employer,
        "KYC details submitted successfully! Admin will verify within 24 hours.",
    );
    res.employer_email = Some(email);
    res.submitted_at = Some(OffsetDateTime::now_utc());
    Ok(Json(res))
}

/// Multipart fields: `document` (file) and `type` (`aadhaar` | `pan`).
#[instrument(skip(state, mp))]
pub async fn upload_document(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    mut mp: Multipart,
) -> ApiResult<Json<DocumentUploadResponse>> {
    let mut document = None;
    let mut doc_type = None;
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {e}")))?
    {
        match field.name() {
            Some("document") => document = UploadItem::from_field(field).await?,
            Some("type") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("invalid type field: {e}")))?;
                doc_type = Some(raw.parse::<DocumentType>()?);
            }
            _ => {}
        }
    }
    let doc_type = doc_type.ok_or_else(|| ApiError::bad_request("Document type is required"))?;
    let document = document.ok_or_else(|| ApiError::bad_request("Document file is required"))?;

    let (file_name, document_url) =
        services::upload_document(&state, &auth, id, doc_type, document).await?;
    Ok(Json(DocumentUploadResponse {
        message: "Document uploaded successfully".into(),
        file_name,
        document_url,
        doc_type,
    }))
}

#[instrument(skip(state))]
pub async fn download_document(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(file_name): Path<String>,
) -> ApiResult<Response> {
    let body = services::download_document(&state, &auth, &file_name).await?;
    Ok(attachment(&file_name, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::services::test_support::bearer;
    use crate::auth::UserRole;
    use crate::storage::StorageClient;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    fn app(state: AppState) -> Router {
        employer_routes().merge(document_routes()).with_state(state)
    }

    async fn send(state: AppState, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let res = app(state).oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or_default())
    }

    #[tokio::test]
    async fn listing_requires_a_token() {
        let state = AppState::fake();
        let (status, _) = send(state, Request::get("/employers").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn listing_is_admin_only() {
        let state = AppState::fake();
        let (_, token) = bearer(&state, UserRole::Employer);
        let req = Request::get("/employers/verification-requests/pending-count")
            .header(header::AUTHORIZATION, token)
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(state, req).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Admin access required");
    }

    #[tokio::test]
    async fn unknown_verification_status_is_rejected() {
        let state = AppState::fake();
        let (_, token) = bearer(&state, UserRole::Admin);
        let req = Request::put(format!("/employers/{}/verification?status=approve", Uuid::new_v4()))
            .header(header::AUTHORIZATION, token)
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(state, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "unknown verification status: 'approve'");
    }

    #[tokio::test]
    async fn unknown_status_filter_is_rejected() {
        let state = AppState::fake();
        let (_, token) = bearer(&state, UserRole::Admin);
        let req = Request::get("/employers?verificationStatus=maybe")
            .header(header::AUTHORIZATION, token)
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(state, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn kyc_with_malformed_pan_is_bad_request() {
        let state = AppState::fake();
        let (_, token) = bearer(&state, UserRole::Admin);
        let req = Request::post(format!("/employers/{}/kyc", Uuid::new_v4()))
            .header(header::AUTHORIZATION, token)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                serde_json::json!({ "aadhaarNumber": "123456789012", "panNumber": "12345" })
                    .to_string(),
            ))
            .unwrap();
        let (status, body) = send(state, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid PAN number format");
    }

    #[tokio::test]
    async fn public_kyc_submission_needs_all_fields() {
        let state = AppState::fake();
        let req = Request::post("/employers/kyc-submission")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::json!({ "email": "a@b.co" }).to_string()))
            .unwrap();
        let (status, body) = send(state, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"],
            "Email, Aadhaar number, and PAN number are required"
        );
    }

    #[tokio::test]
    async fn document_upload_rejects_unknown_type() {
        let state = AppState::fake();
        let (_, token) = bearer(&state, UserRole::Admin);
        let boundary = "XBOUNDARY";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"type\"\r\n\r\npassport\r\n--{b}--\r\n",
            b = boundary
        );
        let req = Request::post(format!("/employers/{}/documents", Uuid::new_v4()))
            .header(header::AUTHORIZATION, token)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();
        let (status, body) = send(state, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "unknown document type: 'passport'");
    }

    #[tokio::test]
    async fn admin_downloads_stored_document() {
        let state = AppState::fake();
        state
            .storage
            .put_object(
                "verification/e1_aadhaar_1_card.pdf",
                bytes::Bytes::from_static(b"%PDF"),
                "application/pdf",
            )
            .await
            .unwrap();
        let (_, token) = bearer(&state, UserRole::Admin);
        let req = Request::get("/employers/documents/e1_aadhaar_1_card.pdf")
            .header(header::AUTHORIZATION, token)
            .body(Body::empty())
            .unwrap();
        let res = app(state).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            res.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"e1_aadhaar_1_card.pdf\""
        );
    }
}

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{
            AadhaarVerifyRequest, AuthResponse, ForgotPasswordRequest, ForgotPasswordResponse,
            LoginRequest, MessageResponse, PublicUser, RefreshRequest, RegisterRequest,
            ResetPasswordRequest, VerifyEmailQuery,
        },
        extractors::AuthUser,
        repo_types::User,
        services,
    },
    error::{ApiError, ApiResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/me", get(get_me))
        .route("/auth/verify-aadhaar", post(verify_aadhaar))
        .route("/auth/verify-email", get(verify_email))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
}

#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<Json<PublicUser>> {
    let user = services::register(&state, payload).await?;
    Ok(Json(PublicUser::from(user)))
}

#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let res = services::login(&state, &payload.email, payload.password).await?;
    Ok(Json(res))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> ApiResult<Json<AuthResponse>> {
    Ok(Json(services::refresh(&state, &payload.refresh_token).await?))
}

#[instrument(skip(state))]
pub async fn get_me(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<PublicUser>> {
    let user = User::find_by_id(&state.db, auth.id)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| ApiError::unauthorized("User not found"))?;
    Ok(Json(PublicUser::from(user)))
}

#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn verify_aadhaar(
    State(state): State<AppState>,
    Json(payload): Json<AadhaarVerifyRequest>,
) -> ApiResult<Json<MessageResponse>> {
    services::verify_aadhaar(&state, &payload.email, &payload.aadhaar_number, &payload.otp).await?;
    Ok(Json(MessageResponse::new(
        "Aadhaar verified successfully. Account activated.",
    )))
}

#[instrument(skip(state, q))]
pub async fn verify_email(
    State(state): State<AppState>,
    Query(q): Query<VerifyEmailQuery>,
) -> ApiResult<Json<MessageResponse>> {
    services::verify_email(&state, &q.token).await?;
    Ok(Json(MessageResponse::new("Email verified successfully.")))
}

#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> ApiResult<Json<ForgotPasswordResponse>> {
    let token = services::request_password_reset(&state, &payload.email).await?;
    Ok(Json(ForgotPasswordResponse {
        message: "Password reset requested.".into(),
        reset_token: (!state.config.production).then_some(token),
    }))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    services::reset_password(&state, &payload.token, payload.new_password).await?;
    Ok(Json(MessageResponse::new("Password has been reset.")))
}

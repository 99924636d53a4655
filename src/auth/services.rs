pub(crate) use crate::auth::claims::{Claims, TokenKind};
pub(crate) use crate::auth::dto::JwtKeys;
use crate::auth::dto::{AuthResponse, PublicUser, RegisterRequest};
use crate::auth::error::AuthError;
use crate::auth::password;
use crate::auth::repo_types::{NewUser, User, UserRole};
use crate::config::JwtConfig;
use crate::employers::repo_types::Employer;
use crate::state::AppState;
use crate::validators::{is_valid_aadhaar, is_valid_email, is_valid_otp, normalize_email};
use anyhow::Context;
use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use std::time::Duration;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Development stand-in for a real Aadhaar OTP round-trip.
pub const MOCK_AADHAAR_OTP: &str = "4567";

pub const RESET_TOKEN_TTL: TimeDuration = TimeDuration::hours(1);

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig {
            secret,
            issuer,
            audience,
            ttl_minutes,
            refresh_ttl_minutes,
        } = state.config.jwt.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            audience,
            access_ttl: Duration::from_secs((ttl_minutes as u64) * 60),
            refresh_ttl: Duration::from_secs((refresh_ttl_minutes as u64) * 60),
        }
    }
}

impl JwtKeys {
    fn sign_with_kind(&self, user_id: Uuid, role: UserRole, kind: TokenKind) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            role,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, kind = ?kind, "jwt signed");
        Ok(token)
    }

    pub fn sign_access(&self, user_id: Uuid, role: UserRole) -> anyhow::Result<String> {
        self.sign_with_kind(user_id, role, TokenKind::Access)
    }

    pub fn sign_refresh(&self, user_id: Uuid, role: UserRole) -> anyhow::Result<String> {
        self.sign_with_kind(user_id, role, TokenKind::Refresh)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, kind = ?data.claims.kind, "jwt verified");
        Ok(data.claims)
    }

    pub fn verify_refresh(&self, token: &str) -> anyhow::Result<Claims> {
        let claims = self.verify(token)?;
        if claims.kind != TokenKind::Refresh {
            anyhow::bail!("not a refresh token");
        }
        Ok(claims)
    }

    fn issue_pair(&self, user: User) -> anyhow::Result<AuthResponse> {
        let token = self.sign_access(user.id, user.role)?;
        let refresh_token = self.sign_refresh(user.id, user.role)?;
        Ok(AuthResponse {
            token,
            refresh_token,
            user: PublicUser::from(user),
        })
    }
}

/// `(is_active, is_verified)` for a freshly registered account.
///
/// Employers wait for KYC approval; everyone else is usable immediately.
pub fn initial_account_flags(role: UserRole) -> (bool, bool) {
    match role {
        UserRole::Employer => (false, false),
        UserRole::Candidate | UserRole::Admin => (true, true),
    }
}

/// Post-credential checks. Only employers are held back by verification.
pub fn check_login_allowed(user: &User) -> Result<(), AuthError> {
    if !user.is_verified && user.role == UserRole::Employer {
        return Err(AuthError::VerificationPending);
    }
    if !user.is_active {
        return Err(AuthError::AccountInactive);
    }
    Ok(())
}

pub fn check_reset_token_fresh(
    expires: Option<OffsetDateTime>,
    now: OffsetDateTime,
) -> Result<(), AuthError> {
    match expires {
        Some(exp) if exp > now => Ok(()),
        _ => Err(AuthError::ResetTokenExpired),
    }
}

fn is_unique_violation(e: &anyhow::Error) -> bool {
    e.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

pub async fn register(state: &AppState, req: RegisterRequest) -> Result<User, AuthError> {
    let role: UserRole = match req.role.as_deref().map(str::trim) {
        None | Some("") => return Err(AuthError::RoleRequired),
        Some(raw) => raw.parse()?,
    };
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AuthError::NameRequired);
    }
    let email = normalize_email(&req.email);
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AuthError::InvalidEmail);
    }
    password::check_policy(&req.password).map_err(AuthError::WeakPassword)?;

    if User::find_by_email(&state.db, &email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AuthError::EmailTaken);
    }

    let hash = password::hash_password(req.password).await?;
    let (is_active, is_verified) = initial_account_flags(role);
    let verification_token = Uuid::new_v4().to_string();
    let phone = req.phone.as_deref().map(str::trim).filter(|p| !p.is_empty());

    let mut tx = state.db.begin().await.context("begin tx")?;
    let user = User::create_tx(
        &mut tx,
        &NewUser {
            name,
            email: &email,
            phone,
            password_hash: &hash,
            role,
            is_active,
            is_verified,
            email_verification_token: &verification_token,
        },
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AuthError::EmailTaken
        } else {
            AuthError::Internal(e)
        }
    })?;

    if role == UserRole::Employer {
        Employer::create_shell_tx(&mut tx, user.id, &format!("{}'s Company", user.name)).await?;
    }
    tx.commit().await.context("commit tx")?;

    info!(user_id = %user.id, role = %user.role, "user registered");
    Ok(user)
}

pub async fn login(state: &AppState, email: &str, plain: String) -> Result<AuthResponse, AuthError> {
    let email = normalize_email(email);
    let Some(user) = User::find_by_email(&state.db, &email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AuthError::InvalidCredentials);
    };

    if !password::verify_password(plain, user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AuthError::InvalidCredentials);
    }

    check_login_allowed(&user).map_err(|e| {
        warn!(user_id = %user.id, reason = %e, "login refused");
        e
    })?;

    let keys = JwtKeys::from_ref(state);
    let user_id = user.id;
    let response = keys.issue_pair(user)?;
    info!(user_id = %user_id, "user logged in");
    Ok(response)
}

pub async fn refresh(state: &AppState, refresh_token: &str) -> Result<AuthResponse, AuthError> {
    let keys = JwtKeys::from_ref(state);
    let claims = keys
        .verify_refresh(refresh_token)
        .map_err(|_| AuthError::InvalidToken)?;

    // Re-read so a deactivated account cannot keep refreshing.
    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or(AuthError::InvalidToken)?;
    check_login_allowed(&user)?;
    Ok(keys.issue_pair(user)?)
}

pub async fn verify_aadhaar(
    state: &AppState,
    email: &str,
    aadhaar_number: &str,
    otp: &str,
) -> Result<(), AuthError> {
    if !is_valid_aadhaar(aadhaar_number.trim()) {
        return Err(AuthError::InvalidAadhaar);
    }
    if !is_valid_otp(otp) || otp != MOCK_AADHAAR_OTP {
        warn!(email = %email, "aadhaar otp mismatch");
        return Err(AuthError::InvalidOtp);
    }
    let user = User::find_by_email(&state.db, &normalize_email(email))
        .await?
        .ok_or(AuthError::UserNotFound)?;
    User::activate(&state.db, user.id).await?;
    info!(user_id = %user.id, "aadhaar verified, account activated");
    Ok(())
}

pub async fn verify_email(state: &AppState, token: &str) -> Result<(), AuthError> {
    let user = User::find_by_email_verification_token(&state.db, token)
        .await?
        .ok_or(AuthError::InvalidVerificationToken)?;
    User::mark_email_verified(&state.db, user.id).await?;
    info!(user_id = %user.id, "email verified");
    Ok(())
}

/// Issues a one-hour reset token for an active account and returns it.
pub async fn request_password_reset(state: &AppState, email: &str) -> Result<String, AuthError> {
    let user = User::find_by_email(&state.db, &normalize_email(email))
        .await?
        .filter(|u| u.is_active)
        .ok_or(AuthError::UserNotFound)?;
    let token = Uuid::new_v4().to_string();
    let expires = OffsetDateTime::now_utc() + RESET_TOKEN_TTL;
    User::set_password_reset(&state.db, user.id, &token, expires).await?;
    info!(user_id = %user.id, "password reset requested");
    Ok(token)
}

pub async fn reset_password(
    state: &AppState,
    token: &str,
    new_password: String,
) -> Result<(), AuthError> {
    let user = User::find_by_password_reset_token(&state.db, token)
        .await?
        .ok_or(AuthError::InvalidResetToken)?;
    check_reset_token_fresh(user.password_reset_expires, OffsetDateTime::now_utc())?;
    password::check_policy(&new_password).map_err(AuthError::WeakPassword)?;

    let hash = password::hash_password(new_password).await?;
    User::update_password(&state.db, user.id, &hash).await?;
    info!(user_id = %user.id, "password reset");
    Ok(())
}

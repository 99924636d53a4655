use anyhow::Context;
use bytes::Bytes;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::repo_types::{User, UserRole};
use crate::auth::AuthUser;
use crate::employers::dto::KycSubmissionRequest;
use crate::employers::repo_types::{DocumentType, Employer, EmployerWithUser, VerificationStatus};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::uploads::{load_upload, store_upload, UploadArea, UploadItem};
use crate::validators::{is_safe_file_name, is_valid_aadhaar, is_valid_email, is_valid_pan, normalize_email};

/// What a verification decision does to the employer row and its owning account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationEffect {
    pub is_verified: bool,
    pub verified_at: Option<OffsetDateTime>,
    /// `(is_verified, is_active)` for the linked user; `None` leaves it alone.
    pub account_flags: Option<(bool, bool)>,
}

pub fn verification_effect(
    current: &Employer,
    status: VerificationStatus,
    now: OffsetDateTime,
) -> VerificationEffect {
    match status {
        VerificationStatus::Approved => VerificationEffect {
            is_verified: true,
            verified_at: Some(now),
            account_flags: Some((true, true)),
        },
        VerificationStatus::Rejected => VerificationEffect {
            is_verified: false,
            verified_at: None,
            account_flags: Some((false, false)),
        },
        VerificationStatus::Pending => VerificationEffect {
            is_verified: current.is_verified,
            verified_at: current.verified_at,
            account_flags: None,
        },
    }
}

/// Trimmed, validated `(aadhaar, pan)`; PAN is upper-cased.
pub fn normalize_kyc(aadhaar: &str, pan: &str) -> ApiResult<(String, String)> {
    let aadhaar = aadhaar.trim();
    if !is_valid_aadhaar(aadhaar) {
        return Err(ApiError::bad_request("Aadhaar number must be 12 digits"));
    }
    let pan = pan.trim().to_ascii_uppercase();
    if !is_valid_pan(&pan) {
        return Err(ApiError::bad_request("Invalid PAN number format"));
    }
    Ok((aadhaar.to_string(), pan))
}

/// The employer, provided the caller owns it or is an admin.
pub async fn load_for(state: &AppState, auth: &AuthUser, id: Uuid) -> ApiResult<Employer> {
    let employer = Employer::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Employer not found"))?;
    auth.require_self_or_admin(employer.user_id)?;
    Ok(employer)
}

pub async fn update_verification(
    state: &AppState,
    id: Uuid,
    status: VerificationStatus,
    notes: Option<&str>,
) -> ApiResult<EmployerWithUser> {
    let mut tx = state.db.begin().await.context("begin tx")?;
    let current = Employer::lock_tx(&mut tx, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Employer not found"))?;

    let effect = verification_effect(&current, status, OffsetDateTime::now_utc());
    let notes = notes.or(current.verification_notes.as_deref());
    Employer::save_verification_tx(&mut tx, id, status, effect.is_verified, effect.verified_at, notes)
        .await?;
    if let Some((is_verified, is_active)) = effect.account_flags {
        User::set_account_flags_tx(&mut tx, current.user_id, is_verified, is_active).await?;
    }
    tx.commit().await.context("commit tx")?;

    info!(employer_id = %id, status = ?status, "employer verification updated");
    Employer::find_with_user(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Employer not found"))
}

pub async fn submit_kyc(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
    aadhaar: &str,
    pan: &str,
) -> ApiResult<Employer> {
    let (aadhaar, pan) = normalize_kyc(aadhaar, pan)?;
    let current = load_for(state, auth, id).await?;
    if current.verification_status == VerificationStatus::Approved {
        return Err(approved_kyc_conflict(id));
    }
    let employer = Employer::submit_kyc(&state.db, id, &aadhaar, &pan)
        .await?
        .ok_or_else(|| approved_kyc_conflict(id))?;
    info!(employer_id = %id, "kyc submitted");
    Ok(employer)
}

fn approved_kyc_conflict(id: Uuid) -> ApiError {
    warn!(employer_id = %id, "kyc resubmission for approved employer");
    ApiError::conflict("Employer is already verified; KYC cannot be resubmitted")
}

/// KYC filed by an employer that cannot log in yet. The email must belong to
/// an existing employer account whose profile is still pending with no KYC
/// on file; later changes need a signed-in session.
pub async fn submit_kyc_by_email(
    state: &AppState,
    req: &KycSubmissionRequest,
) -> ApiResult<(Employer, String)> {
    let (Some(email), Some(aadhaar), Some(pan)) = (
        req.email.as_deref(),
        req.aadhaar_number.as_deref(),
        req.pan_number.as_deref(),
    ) else {
        return Err(ApiError::bad_request(
            "Email, Aadhaar number, and PAN number are required",
        ));
    };
    let email = normalize_email(email);
    if !is_valid_email(&email) {
        return Err(ApiError::bad_request("Invalid email format"));
    }
    let (aadhaar, pan) = normalize_kyc(aadhaar, pan)?;

    let user = User::find_by_email(&state.db, &email)
        .await?
        .filter(|u| u.role == UserRole::Employer)
        .ok_or_else(|| {
            warn!(email = %email, "kyc submission for unknown employer");
            ApiError::not_found("No employer account registered with this email")
        })?;

    let name = req
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(user.name.as_str());
    let company_name = req
        .company_name
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());
    let notes = format!("Submitted by: {} ({})", email, name);

    let employer = Employer::upsert_kyc_for_user(
        &state.db,
        user.id,
        company_name,
        &format!("{}'s Company", user.name),
        &aadhaar,
        &pan,
        &notes,
    )
    .await?
    .ok_or_else(|| {
        warn!(user_id = %user.id, "kyc submission without session for reviewed employer");
        ApiError::conflict("KYC already submitted for this employer; sign in to update it")
    })?;
    info!(employer_id = %employer.id, user_id = %user.id, "kyc submitted without session");
    Ok((employer, email))
}

/// Stores a KYC document and links it on the employer. Returns `(file name, url)`.
pub async fn upload_document(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
    doc: DocumentType,
    item: UploadItem,
) -> ApiResult<(String, String)> {
    load_for(state, auth, id).await?;
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    let prefix = format!("{}_{}_{}", id, doc.as_str(), millis);
    let file_name = store_upload(state, UploadArea::Verification, &prefix, item).await?;
    let url = UploadArea::Verification.url(&file_name);
    if !Employer::set_document_url(&state.db, id, doc, &url).await? {
        return Err(ApiError::not_found("Employer not found"));
    }
    info!(employer_id = %id, doc = doc.as_str(), file = %file_name, "kyc document stored");
    Ok((file_name, url))
}

pub async fn download_document(
    state: &AppState,
    auth: &AuthUser,
    file_name: &str,
) -> ApiResult<Bytes> {
    if !is_safe_file_name(file_name) {
        return Err(ApiError::bad_request("Invalid file name"));
    }
    if !auth.is_admin() {
        let url = UploadArea::Verification.url(file_name);
        let owner = Employer::owner_of_document(&state.db, &url)
            .await?
            .ok_or_else(|| ApiError::not_found("Document not found"))?;
        auth.require_self_or_admin(owner)?;
    }
    load_upload(state, UploadArea::Verification, file_name)
        .await?
        .ok_or_else(|| ApiError::not_found("Document not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::services::test_support::register_as;
    use crate::employers::repo_types::CompanyType;
    use crate::storage::StorageClient;
    use sqlx::PgPool;

    fn employer(status: VerificationStatus, is_verified: bool) -> Employer {
        let now = OffsetDateTime::now_utc();
        Employer {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            company_name: "Asha's Company".into(),
            company_type: CompanyType::Hr,
            company_description: None,
            website: None,
            address: None,
            city: None,
            state: None,
            pincode: None,
            aadhaar_number: None,
            pan_number: None,
            aadhaar_document_url: None,
            pan_document_url: None,
            verification_status: status,
            is_verified,
            verified_at: is_verified.then_some(now),
            verification_notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn approval_verifies_employer_and_account() {
        let now = OffsetDateTime::now_utc();
        let e = employer(VerificationStatus::Pending, false);
        let effect = verification_effect(&e, VerificationStatus::Approved, now);
        assert!(effect.is_verified);
        assert_eq!(effect.verified_at, Some(now));
        assert_eq!(effect.account_flags, Some((true, true)));
    }

    #[test]
    fn rejection_is_the_inverse() {
        let now = OffsetDateTime::now_utc();
        let e = employer(VerificationStatus::Approved, true);
        let effect = verification_effect(&e, VerificationStatus::Rejected, now);
        assert!(!effect.is_verified);
        assert_eq!(effect.verified_at, None);
        assert_eq!(effect.account_flags, Some((false, false)));
    }

    #[test]
    fn pending_leaves_flags_untouched() {
        let now = OffsetDateTime::now_utc();
        let e = employer(VerificationStatus::Approved, true);
        let effect = verification_effect(&e, VerificationStatus::Pending, now);
        assert!(effect.is_verified);
        assert_eq!(effect.verified_at, e.verified_at);
        assert_eq!(effect.account_flags, None);
    }

    #[test]
    fn kyc_numbers_are_normalized() {
        let (a, p) = normalize_kyc(" 123456789012 ", "abcde1234f").unwrap();
        assert_eq!(a, "123456789012");
        assert_eq!(p, "ABCDE1234F");
        assert!(normalize_kyc("12345", "ABCDE1234F").is_err());
        assert!(normalize_kyc("123456789012", "ABCD1234F").is_err());
    }

    #[tokio::test]
    async fn kyc_by_email_requires_all_fields() {
        let state = AppState::fake();
        let req = KycSubmissionRequest {
            email: Some("a@b.co".into()),
            name: None,
            company_name: None,
            aadhaar_number: None,
            pan_number: Some("ABCDE1234F".into()),
        };
        let err = submit_kyc_by_email(&state, &req).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn document_download_rejects_traversal() {
        let state = AppState::fake();
        let admin = AuthUser {
            id: Uuid::new_v4(),
            role: UserRole::Admin,
        };
        let err = download_document(&state, &admin, "../secret").await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn admins_read_documents_without_owner_lookup() {
        let state = AppState::fake();
        state
            .storage
            .put_object("verification/e1_pan_1_card.pdf", Bytes::from_static(b"pdf"), "application/pdf")
            .await
            .unwrap();
        let admin = AuthUser {
            id: Uuid::new_v4(),
            role: UserRole::Admin,
        };
        let body = download_document(&state, &admin, "e1_pan_1_card.pdf").await.unwrap();
        assert_eq!(&body[..], b"pdf");
    }

    fn kyc_request(email: &str, company: Option<&str>, aadhaar: &str) -> KycSubmissionRequest {
        KycSubmissionRequest {
            email: Some(email.into()),
            name: None,
            company_name: company.map(str::to_string),
            aadhaar_number: Some(aadhaar.into()),
            pan_number: Some("abcde1234f".into()),
        }
    }

    async fn registered_employer(state: &AppState, email: &str) -> (User, Employer) {
        let user = register_as(state, "Meera", email, "EMPLOYER").await;
        let employer = Employer::find_by_user_id(&state.db, user.id)
            .await
            .unwrap()
            .expect("shell employer");
        (user, employer)
    }

    async fn account(state: &AppState, id: Uuid) -> User {
        User::find_by_id(&state.db, id).await.unwrap().expect("user")
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn approval_and_rejection_sync_the_account(pool: PgPool) {
        let state = AppState::with_pool(pool);
        let (user, employer) = registered_employer(&state, "meera@clinic.in").await;

        let approved =
            update_verification(&state, employer.id, VerificationStatus::Approved, Some("docs ok"))
                .await
                .unwrap();
        assert_eq!(approved.employer.verification_status, VerificationStatus::Approved);
        assert!(approved.employer.is_verified);
        assert!(approved.employer.verified_at.is_some());
        let u = account(&state, user.id).await;
        assert!(u.is_verified && u.is_active);

        let rejected = update_verification(&state, employer.id, VerificationStatus::Rejected, None)
            .await
            .unwrap();
        assert!(!rejected.employer.is_verified);
        assert_eq!(rejected.employer.verified_at, None);
        assert_eq!(rejected.employer.verification_notes.as_deref(), Some("docs ok"));
        let u = account(&state, user.id).await;
        assert!(!u.is_verified && !u.is_active);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn kyc_without_session_fills_a_fresh_profile_once(pool: PgPool) {
        let state = AppState::with_pool(pool);
        let (_, employer) = registered_employer(&state, "meera@clinic.in").await;

        let (filed, email) = submit_kyc_by_email(
            &state,
            &kyc_request("Meera@Clinic.in", Some("Sunrise Clinic"), "123456789012"),
        )
        .await
        .unwrap();
        assert_eq!(email, "meera@clinic.in");
        assert_eq!(filed.id, employer.id);
        assert_eq!(filed.company_name, "Sunrise Clinic");
        assert_eq!(filed.aadhaar_number.as_deref(), Some("123456789012"));
        assert_eq!(filed.pan_number.as_deref(), Some("ABCDE1234F"));
        assert_eq!(filed.verification_status, VerificationStatus::Pending);

        let err = submit_kyc_by_email(
            &state,
            &kyc_request("meera@clinic.in", Some("Evil Corp"), "000000000000"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
        let kept = Employer::find_by_id(&state.db, employer.id).await.unwrap().unwrap();
        assert_eq!(kept.company_name, "Sunrise Clinic");
        assert_eq!(kept.aadhaar_number.as_deref(), Some("123456789012"));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn kyc_without_session_cannot_reopen_an_approved_employer(pool: PgPool) {
        let state = AppState::with_pool(pool);
        let (user, employer) = registered_employer(&state, "meera@clinic.in").await;
        update_verification(&state, employer.id, VerificationStatus::Approved, None)
            .await
            .unwrap();

        let err = submit_kyc_by_email(
            &state,
            &kyc_request("meera@clinic.in", Some("Evil Corp"), "000000000000"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        let kept = Employer::find_by_id(&state.db, employer.id).await.unwrap().unwrap();
        assert_eq!(kept.verification_status, VerificationStatus::Approved);
        assert!(kept.is_verified);
        assert_eq!(kept.company_name, "Meera's Company");
        assert_eq!(kept.aadhaar_number, None);
        let u = account(&state, user.id).await;
        assert!(u.is_verified && u.is_active);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn kyc_by_email_needs_an_employer_account(pool: PgPool) {
        let state = AppState::with_pool(pool);
        register_as(&state, "Ravi", "ravi@example.com", "CANDIDATE").await;
        let err = submit_kyc_by_email(&state, &kyc_request("ravi@example.com", None, "123456789012"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn signed_in_kyc_is_refused_once_approved(pool: PgPool) {
        let state = AppState::with_pool(pool);
        let (user, employer) = registered_employer(&state, "meera@clinic.in").await;
        let owner = AuthUser {
            id: user.id,
            role: UserRole::Employer,
        };

        let filed = submit_kyc(&state, &owner, employer.id, "123456789012", "ABCDE1234F")
            .await
            .unwrap();
        assert_eq!(filed.verification_status, VerificationStatus::Pending);

        update_verification(&state, employer.id, VerificationStatus::Approved, None)
            .await
            .unwrap();
        let err = submit_kyc(&state, &owner, employer.id, "999999999999", "ZZZZZ9999Z")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        let kept = Employer::find_by_id(&state.db, employer.id).await.unwrap().unwrap();
        assert_eq!(kept.verification_status, VerificationStatus::Approved);
        assert_eq!(kept.aadhaar_number.as_deref(), Some("123456789012"));
    }
}

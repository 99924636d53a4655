use anyhow::Context;
use bytes::Bytes;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use crate::applications::dto::{SubmitApplicationForm, UpdateStatusRequest};
use crate::applications::repo_types::{
    Application, ApplicationDetails, ApplicationStatus, NewApplication,
};
use crate::auth::{AuthUser, User};
use crate::error::{ApiError, ApiResult};
use crate::jobs::Job;
use crate::state::AppState;
use crate::uploads::{load_upload, remove_upload, store_upload, UploadArea, UploadItem};
use crate::validators::{is_safe_file_name, is_valid_email, normalize_email};

/// A submission whose required fields are present and well-formed.
#[derive(Debug)]
pub struct ValidSubmission {
    pub job_id: Uuid,
    pub candidate_id: Uuid,
    pub candidate_name: String,
    pub candidate_email: String,
    pub candidate_phone: String,
    pub notes: Option<String>,
}

fn required_uuid(raw: Option<&str>, field: &str) -> ApiResult<Uuid> {
    let raw = raw.ok_or_else(|| ApiError::bad_request(format!("{field} is a required parameter.")))?;
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request(format!("{field} must be a UUID")))
}

fn required_text(raw: Option<String>, field: &str) -> ApiResult<String> {
    raw.ok_or_else(|| ApiError::bad_request(format!("{field} is a required parameter.")))
}

pub fn validate_submission(
    form: &mut SubmitApplicationForm,
    auth: &AuthUser,
) -> ApiResult<ValidSubmission> {
    let job_id = required_uuid(form.job_id.as_deref(), "jobId")?;
    let candidate_id = required_uuid(form.candidate_id.as_deref(), "candidateId")?;
    auth.require_self_or_admin(candidate_id)?;

    let candidate_name = required_text(form.candidate_name.take(), "candidateName")?;
    let candidate_email = normalize_email(&required_text(form.candidate_email.take(), "candidateEmail")?);
    if !is_valid_email(&candidate_email) {
        return Err(ApiError::bad_request("Invalid email format"));
    }
    let candidate_phone = required_text(form.candidate_phone.take(), "candidatePhone")?;

    Ok(ValidSubmission {
        job_id,
        candidate_id,
        candidate_name,
        candidate_email,
        candidate_phone,
        notes: form.notes.take(),
    })
}

/// Accepts RFC 3339 or a zone-less ISO timestamp, read as UTC.
pub fn parse_interview_date(raw: &str) -> ApiResult<OffsetDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(dt);
    }
    let with_seconds = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    let without_seconds = format_description!("[year]-[month]-[day]T[hour]:[minute]");
    PrimitiveDateTime::parse(raw, with_seconds)
        .or_else(|_| PrimitiveDateTime::parse(raw, without_seconds))
        .map(PrimitiveDateTime::assume_utc)
        .map_err(|_| ApiError::bad_request(format!("Invalid interviewDate: '{raw}'")))
}

/// Validated changes for a status update.
#[derive(Debug, PartialEq, Eq)]
pub struct StatusChange {
    pub status: Option<ApplicationStatus>,
    pub notes: Option<String>,
    pub interview_date: Option<OffsetDateTime>,
}

pub fn status_change(req: UpdateStatusRequest) -> ApiResult<StatusChange> {
    let status = req
        .status
        .as_deref()
        .map(str::parse::<ApplicationStatus>)
        .transpose()?;
    let interview_date = match (status, req.interview_date.as_deref()) {
        (Some(ApplicationStatus::Interview), Some(raw)) if !raw.trim().is_empty() => {
            Some(parse_interview_date(raw)?)
        }
        _ => None,
    };
    Ok(StatusChange {
        status,
        notes: req.notes,
        interview_date,
    })
}

pub async fn submit(
    state: &AppState,
    auth: &AuthUser,
    mut form: SubmitApplicationForm,
) -> ApiResult<Application> {
    let valid = validate_submission(&mut form, auth)?;

    if Job::find_by_id(&state.db, valid.job_id).await?.is_none() {
        return Err(ApiError::not_found("Job not found"));
    }
    if User::find_by_id(&state.db, valid.candidate_id).await?.is_none() {
        return Err(ApiError::not_found(format!(
            "Candidate not found with ID: {}",
            valid.candidate_id
        )));
    }

    let resume_url = match form.resume.take() {
        Some(item) => Some(store_resume(state, item).await?),
        None => None,
    };

    let recorded = record_submission(state, &valid, resume_url.as_deref()).await;
    if recorded.is_err() {
        if let Some(url) = &resume_url {
            remove_upload(state, UploadArea::Resumes, url).await;
        }
    }
    let application = recorded?;

    info!(
        application_id = %application.id,
        job_id = %valid.job_id,
        candidate_id = %valid.candidate_id,
        "application submitted"
    );
    Ok(application)
}

/// Inserts the application and bumps the job's counter in one transaction.
async fn record_submission(
    state: &AppState,
    valid: &ValidSubmission,
    resume_url: Option<&str>,
) -> ApiResult<Application> {
    let mut tx = state.db.begin().await.context("begin tx")?;
    let application = Application::create_tx(
        &mut tx,
        &NewApplication {
            job_id: valid.job_id,
            candidate_id: valid.candidate_id,
            candidate_name: &valid.candidate_name,
            candidate_email: &valid.candidate_email,
            candidate_phone: &valid.candidate_phone,
            resume_url,
            notes: valid.notes.as_deref(),
        },
    )
    .await?;
    if !Job::increment_applications_tx(&mut tx, valid.job_id).await? {
        return Err(ApiError::not_found("Job not found"));
    }
    tx.commit().await.context("commit tx")?;
    Ok(application)
}

async fn store_resume(state: &AppState, item: UploadItem) -> ApiResult<String> {
    let prefix = Uuid::new_v4().to_string();
    let file_name = store_upload(state, UploadArea::Resumes, &prefix, item).await?;
    Ok(UploadArea::Resumes.url(&file_name))
}

pub async fn update_status(
    state: &AppState,
    id: Uuid,
    req: UpdateStatusRequest,
) -> ApiResult<ApplicationDetails> {
    let change = status_change(req).map_err(|e| {
        warn!(application_id = %id, error = %e, "status update rejected");
        e
    })?;
    let updated = Application::update_status(
        &state.db,
        id,
        change.status,
        change.notes.as_deref(),
        change.interview_date,
    )
    .await?;
    if !updated {
        return Err(ApiError::not_found("Application not found"));
    }
    info!(application_id = %id, status = ?change.status, "application status updated");
    Application::find_details(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Application not found"))
}

pub async fn download_resume(state: &AppState, auth: &AuthUser, file_name: &str) -> ApiResult<Bytes> {
    if !is_safe_file_name(file_name) {
        return Err(ApiError::bad_request("Invalid file name"));
    }
    if !auth.is_admin() {
        let owners = Application::resume_owners(&state.db, &UploadArea::Resumes.url(file_name))
            .await?
            .ok_or_else(|| ApiError::not_found("Resume not found"))?;
        if !owners.allows(auth.id) {
            warn!(user_id = %auth.id, file = %file_name, "resume access refused");
            return Err(ApiError::forbidden("Access denied"));
        }
    }
    load_upload(state, UploadArea::Resumes, file_name)
        .await?
        .ok_or_else(|| ApiError::not_found("Resume not found"))
}

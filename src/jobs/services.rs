use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{AuthUser, UserRole};
use crate::employers::{Employer, VerificationStatus};
use crate::error::{ApiError, ApiResult};
use crate::jobs::dto::CreateJobRequest;
use crate::jobs::repo_types::{Job, JobStatus, NewJob};
use crate::state::AppState;

fn required<'a>(value: &'a str, field: &str) -> ApiResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::bad_request(format!("{field} is required")));
    }
    Ok(value)
}

/// Owning employer and default organization name for a new posting.
async fn posting_identity(
    state: &AppState,
    auth: &AuthUser,
    requested_employer: Option<Uuid>,
) -> ApiResult<(Option<Uuid>, Option<String>)> {
    match auth.role {
        UserRole::Admin => match requested_employer {
            Some(id) => {
                let employer = Employer::find_by_id(&state.db, id)
                    .await?
                    .ok_or_else(|| ApiError::not_found("Employer not found"))?;
                Ok((Some(employer.id), Some(employer.company_name)))
            }
            None => Ok((None, None)),
        },
        UserRole::Employer => {
            let employer = Employer::find_by_user_id(&state.db, auth.id)
                .await?
                .filter(|e| e.verification_status == VerificationStatus::Approved)
                .ok_or_else(|| {
                    warn!(user_id = %auth.id, "job posting by unapproved employer");
                    ApiError::forbidden("Employer verification required to post jobs")
                })?;
            Ok((Some(employer.id), Some(employer.company_name)))
        }
        UserRole::Candidate => Err(ApiError::forbidden("Only employers can post jobs")),
    }
}

pub async fn create_job(state: &AppState, auth: &AuthUser, req: CreateJobRequest) -> ApiResult<Job> {
    if auth.role == UserRole::Candidate {
        return Err(ApiError::forbidden("Only employers can post jobs"));
    }
    let title = required(&req.title, "Title")?;
    let location = required(&req.location, "Location")?;
    let description = required(&req.description, "Description")?;
    let status = match req.status.as_deref() {
        Some(raw) if !raw.trim().is_empty() => raw.parse::<JobStatus>()?,
        _ => JobStatus::Active,
    };

    let (employer_id, company_name) = posting_identity(state, auth, req.employer_id).await?;
    let organization = req
        .organization
        .as_deref()
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .or(company_name.as_deref())
        .ok_or_else(|| ApiError::bad_request("Organization is required"))?;

    let job = Job::create(
        &state.db,
        &NewJob {
            employer_id,
            title,
            organization,
            location,
            description,
            salary: req.salary.as_deref().map(str::trim).filter(|s| !s.is_empty()),
            last_date: req.last_date,
            status,
        },
    )
    .await?;
    info!(job_id = %job.id, employer_id = ?employer_id, "job posted");
    Ok(job)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(title: &str) -> CreateJobRequest {
        CreateJobRequest {
            title: title.into(),
            organization: Some("City Hospital".into()),
            location: "Pune".into(),
            description: "ICU nurse".into(),
            salary: None,
            last_date: None,
            status: None,
            employer_id: None,
        }
    }

    #[tokio::test]
    async fn candidates_cannot_post() {
        let state = AppState::fake();
        let auth = AuthUser {
            id: Uuid::new_v4(),
            role: UserRole::Candidate,
        };
        let err = create_job(&state, &auth, request("Nurse")).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn blank_title_is_rejected() {
        let state = AppState::fake();
        let auth = AuthUser {
            id: Uuid::new_v4(),
            role: UserRole::Admin,
        };
        let err = create_job(&state, &auth, request("   ")).await.unwrap_err();
        assert_eq!(err.to_string(), "Title is required");
    }

    #[tokio::test]
    async fn unknown_status_is_rejected() {
        let state = AppState::fake();
        let auth = AuthUser {
            id: Uuid::new_v4(),
            role: UserRole::Admin,
        };
        let mut req = request("Nurse");
        req.status = Some("archived".into());
        let err = create_job(&state, &auth, req).await.unwrap_err();
        assert!(matches!(err, ApiError::UnknownVariant(_)));
    }
}

use axum::extract::Multipart;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::applications::repo_types::{ApplicationDetails, ApplicationStatus};
use crate::error::ApiError;
use crate::uploads::UploadItem;

/// Multipart submission as received; validated by the service.
#[derive(Default)]
pub struct SubmitApplicationForm {
    pub job_id: Option<String>,
    pub candidate_id: Option<String>,
    pub candidate_name: Option<String>,
    pub candidate_email: Option<String>,
    pub candidate_phone: Option<String>,
    pub notes: Option<String>,
    pub resume: Option<UploadItem>,
}

impl SubmitApplicationForm {
    pub async fn from_multipart(mut mp: Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();
        while let Some(field) = mp
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {e}")))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == "resume" {
                form.resume = UploadItem::from_field(field).await?;
                continue;
            }
            let slot = match name.as_str() {
                "jobId" => &mut form.job_id,
                "candidateId" => &mut form.candidate_id,
                "candidateName" => &mut form.candidate_name,
                "candidateEmail" => &mut form.candidate_email,
                "candidatePhone" => &mut form.candidate_phone,
                "notes" => &mut form.notes,
                _ => continue,
            };
            let text = field
                .text()
                .await
                .map_err(|e| ApiError::bad_request(format!("invalid field {name}: {e}")))?;
            *slot = Some(text.trim().to_string()).filter(|t| !t.is_empty());
        }
        Ok(form)
    }
}

#[derive(Debug, Serialize)]
pub struct SubmittedResponse {
    pub id: Uuid,
    pub message: &'static str,
    pub status: &'static str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationListQuery {
    pub job_id: Option<Uuid>,
    pub candidate_id: Option<Uuid>,
    pub candidate_email: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub sort: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub interview_date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationResponse {
    pub id: Uuid,
    pub job_id: Uuid,
    pub job_title: String,
    pub job_organization: String,
    pub candidate_id: Uuid,
    pub candidate_name: String,
    pub candidate_email: String,
    pub candidate_phone: String,
    pub resume_url: Option<String>,
    pub status: ApplicationStatus,
    pub notes: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub interview_date: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub applied_date: OffsetDateTime,
}

impl From<ApplicationDetails> for ApplicationResponse {
    fn from(d: ApplicationDetails) -> Self {
        let a = d.application;
        Self {
            id: a.id,
            job_id: a.job_id,
            job_title: d.job_title,
            job_organization: d.job_organization,
            candidate_id: a.candidate_id,
            candidate_name: a.candidate_name,
            candidate_email: a.candidate_email,
            candidate_phone: a.candidate_phone,
            resume_url: a.resume_url,
            status: a.status,
            notes: a.notes,
            interview_date: a.interview_date,
            applied_date: a.applied_date,
        }
    }
}

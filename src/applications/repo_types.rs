use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::UnknownVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "application_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Applied,
    Shortlisted,
    Interview,
    Selected,
    Rejected,
}

impl FromStr for ApplicationStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "applied" => Ok(Self::Applied),
            "shortlisted" => Ok(Self::Shortlisted),
            "interview" => Ok(Self::Interview),
            "selected" => Ok(Self::Selected),
            "rejected" => Ok(Self::Rejected),
            _ => Err(UnknownVariant::new("application status", s)),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Application {
    pub id: Uuid,
    pub job_id: Uuid,
    pub candidate_id: Uuid,
    pub candidate_name: String,
    pub candidate_email: String,
    pub candidate_phone: String,
    pub resume_url: Option<String>,
    pub status: ApplicationStatus,
    pub notes: Option<String>,
    pub interview_date: Option<OffsetDateTime>,
    pub applied_date: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Application joined with the job it targets.
#[derive(Debug, Clone, FromRow)]
pub struct ApplicationDetails {
    #[sqlx(flatten)]
    pub application: Application,
    pub job_title: String,
    pub job_organization: String,
}

pub struct NewApplication<'a> {
    pub job_id: Uuid,
    pub candidate_id: Uuid,
    pub candidate_name: &'a str,
    pub candidate_email: &'a str,
    pub candidate_phone: &'a str,
    pub resume_url: Option<&'a str>,
    pub notes: Option<&'a str>,
}

/// Who may read a stored resume besides admins.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct ResumeOwners {
    pub candidate_id: Uuid,
    pub employer_user_id: Option<Uuid>,
}

impl ResumeOwners {
    pub fn allows(&self, user_id: Uuid) -> bool {
        self.candidate_id == user_id || self.employer_user_id == Some(user_id)
    }
}

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::jobs::repo_types::{Job, JobStatus};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    pub title: String,
    #[serde(default)]
    pub organization: Option<String>,
    pub location: String,
    pub description: String,
    #[serde(default)]
    pub salary: Option<String>,
    #[serde(default, with = "iso_date::option")]
    pub last_date: Option<Date>,
    #[serde(default)]
    pub status: Option<String>,
    /// Only honoured for admins; employers always post as themselves.
    #[serde(default)]
    pub employer_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct JobListQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub sort: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResponse {
    pub id: Uuid,
    pub employer_id: Option<Uuid>,
    pub title: String,
    pub organization: String,
    pub location: String,
    pub description: String,
    pub salary: Option<String>,
    #[serde(with = "iso_date::option")]
    pub last_date: Option<Date>,
    pub status: JobStatus,
    pub applications_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Job> for JobResponse {
    fn from(j: Job) -> Self {
        Self {
            id: j.id,
            employer_id: j.employer_id,
            title: j.title,
            organization: j.organization,
            location: j.location,
            description: j.description,
            salary: j.salary,
            last_date: j.last_date,
            status: j.status,
            applications_count: j.applications_count,
            created_at: j.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn last_date_is_a_plain_iso_date() {
        let req: CreateJobRequest = serde_json::from_value(serde_json::json!({
            "title": "Staff Nurse",
            "location": "Pune",
            "description": "Night shifts",
            "lastDate": "2026-12-31"
        }))
        .unwrap();
        assert_eq!(req.last_date, Some(date!(2026 - 12 - 31)));
        assert!(req.organization.is_none());
    }
}

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::error::UnknownVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Active,
    Closed,
    Pending,
    Draft,
}

impl FromStr for JobStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "closed" => Ok(Self::Closed),
            "pending" => Ok(Self::Pending),
            "draft" => Ok(Self::Draft),
            _ => Err(UnknownVariant::new("job status", s)),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Job {
    pub id: Uuid,
    pub employer_id: Option<Uuid>,
    pub title: String,
    pub organization: String,
    pub location: String,
    pub description: String,
    pub salary: Option<String>,
    pub last_date: Option<Date>,
    pub status: JobStatus,
    pub applications_count: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

pub struct NewJob<'a> {
    pub employer_id: Option<Uuid>,
    pub title: &'a str,
    pub organization: &'a str,
    pub location: &'a str,
    pub description: &'a str,
    pub salary: Option<&'a str>,
    pub last_date: Option<Date>,
    pub status: JobStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_status_parse() {
        assert_eq!("Closed".parse::<JobStatus>().unwrap(), JobStatus::Closed);
        assert!("archived".parse::<JobStatus>().is_err());
    }
}

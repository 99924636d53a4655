use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::applications::repo_types::{
    Application, ApplicationDetails, ApplicationStatus, NewApplication, ResumeOwners,
};
use crate::pagination::{like_pattern, PageRequest, SortDir, LIKE_ESCAPE};

macro_rules! application_columns {
    () => {
        "a.id, a.job_id, a.candidate_id, a.candidate_name, a.candidate_email, \
         a.candidate_phone, a.resume_url, a.status, a.notes, a.interview_date, \
         a.applied_date, a.updated_at"
    };
}

macro_rules! select_details {
    () => {
        concat!(
            "SELECT ",
            application_columns!(),
            ", j.title AS job_title, COALESCE(e.company_name, j.organization) AS job_organization \
             FROM applications a \
             JOIN jobs j ON j.id = a.job_id \
             LEFT JOIN employers e ON e.id = j.employer_id"
        )
    };
}

pub const SORT_COLUMNS: &[(&str, &str)] = &[
    ("appliedDate", "a.applied_date"),
    ("status", "a.status"),
    ("candidateName", "a.candidate_name"),
];
pub const DEFAULT_SORT: &str = "a.applied_date";

#[derive(Debug, Default, Clone)]
pub struct ApplicationFilter {
    pub job_id: Option<Uuid>,
    pub candidate_id: Option<Uuid>,
    pub candidate_email: Option<String>,
    pub status: Option<ApplicationStatus>,
    pub search: Option<String>,
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, f: &ApplicationFilter) {
    if let Some(job_id) = f.job_id {
        qb.push(" AND a.job_id = ").push_bind(job_id);
    }
    if let Some(candidate_id) = f.candidate_id {
        qb.push(" AND a.candidate_id = ").push_bind(candidate_id);
    }
    if let Some(email) = &f.candidate_email {
        qb.push(" AND LOWER(a.candidate_email) = ")
            .push_bind(email.to_lowercase());
    }
    if let Some(status) = f.status {
        qb.push(" AND a.status = ").push_bind(status);
    }
    if let Some(search) = &f.search {
        let pattern = like_pattern(search);
        qb.push(" AND (LOWER(a.candidate_name) LIKE ")
            .push_bind(pattern.clone())
            .push(LIKE_ESCAPE)
            .push(" OR LOWER(a.candidate_email) LIKE ")
            .push_bind(pattern)
            .push(LIKE_ESCAPE)
            .push(")");
    }
}

impl Application {
    pub async fn create_tx(
        tx: &mut Transaction<'_, Postgres>,
        new: &NewApplication<'_>,
    ) -> anyhow::Result<Application> {
        let app = sqlx::query_as::<_, Application>(concat!(
            "INSERT INTO applications AS a (job_id, candidate_id, candidate_name, \
             candidate_email, candidate_phone, resume_url, notes, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, 'applied') RETURNING ",
            application_columns!()
        ))
        .bind(new.job_id)
        .bind(new.candidate_id)
        .bind(new.candidate_name)
        .bind(new.candidate_email)
        .bind(new.candidate_phone)
        .bind(new.resume_url)
        .bind(new.notes)
        .fetch_one(&mut **tx)
        .await?;
        Ok(app)
    }

    pub async fn find_details(db: &PgPool, id: Uuid) -> anyhow::Result<Option<ApplicationDetails>> {
        let row = sqlx::query_as::<_, ApplicationDetails>(concat!(
            select_details!(),
            " WHERE a.id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    pub async fn list(
        db: &PgPool,
        filter: &ApplicationFilter,
        page: PageRequest,
        sort: (&'static str, SortDir),
    ) -> anyhow::Result<(Vec<ApplicationDetails>, i64)> {
        let mut qb = QueryBuilder::<Postgres>::new(concat!(select_details!(), " WHERE TRUE"));
        push_filters(&mut qb, filter);
        qb.push(format!(" ORDER BY {} {}", sort.0, sort.1.as_sql()))
            .push(" LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let rows = qb.build_query_as::<ApplicationDetails>().fetch_all(db).await?;

        let mut count =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM applications a WHERE TRUE");
        push_filters(&mut count, filter);
        let total = count.build_query_scalar::<i64>().fetch_one(db).await?;
        Ok((rows, total))
    }

    /// `None` arguments keep the stored value. Returns `false` if no such application.
    pub async fn update_status(
        db: &PgPool,
        id: Uuid,
        status: Option<ApplicationStatus>,
        notes: Option<&str>,
        interview_date: Option<OffsetDateTime>,
    ) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE applications
               SET status = COALESCE($2, status),
                   notes = COALESCE($3, notes),
                   interview_date = COALESCE($4, interview_date),
                   updated_at = now()
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(notes)
        .bind(interview_date)
        .execute(db)
        .await?;
        Ok(res.rows_affected() == 1)
    }

    /// Removes the application and hands back its resume URL. `None` if absent.
    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Option<String>>> {
        let resume_url = sqlx::query_scalar::<_, Option<String>>(
            "DELETE FROM applications WHERE id = $1 RETURNING resume_url",
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(resume_url)
    }

    pub async fn resume_owners(db: &PgPool, resume_url: &str) -> anyhow::Result<Option<ResumeOwners>> {
        let row = sqlx::query_as::<_, ResumeOwners>(
            r#"
            SELECT a.candidate_id, e.user_id AS employer_user_id
              FROM applications a
              JOIN jobs j ON j.id = a.job_id
              LEFT JOIN employers e ON e.id = j.employer_id
             WHERE a.resume_url = $1
             LIMIT 1
            "#,
        )
        .bind(resume_url)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }
}

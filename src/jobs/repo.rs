use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use crate::jobs::repo_types::{Job, JobStatus, NewJob};
use crate::pagination::{like_pattern, PageRequest, SortDir, LIKE_ESCAPE};

macro_rules! job_columns {
    () => {
        "id, employer_id, title, organization, location, description, salary, last_date, \
         status, applications_count, created_at, updated_at"
    };
}

pub const SORT_COLUMNS: &[(&str, &str)] = &[
    ("createdAt", "created_at"),
    ("title", "title"),
    ("lastDate", "last_date"),
    ("applicationsCount", "applications_count"),
];
pub const DEFAULT_SORT: &str = "created_at";

#[derive(Debug, Default, Clone)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    pub search: Option<String>,
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, f: &JobFilter) {
    if let Some(status) = f.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(search) = &f.search {
        let pattern = like_pattern(search);
        qb.push(" AND (LOWER(title) LIKE ")
            .push_bind(pattern.clone())
            .push(LIKE_ESCAPE)
            .push(" OR LOWER(organization) LIKE ")
            .push_bind(pattern.clone())
            .push(LIKE_ESCAPE)
            .push(" OR LOWER(location) LIKE ")
            .push_bind(pattern)
            .push(LIKE_ESCAPE)
            .push(")");
    }
}

impl Job {
    pub async fn create(db: &PgPool, new: &NewJob<'_>) -> anyhow::Result<Job> {
        let job = sqlx::query_as::<_, Job>(concat!(
            "INSERT INTO jobs (employer_id, title, organization, location, description, salary, \
             last_date, status) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING ",
            job_columns!()
        ))
        .bind(new.employer_id)
        .bind(new.title)
        .bind(new.organization)
        .bind(new.location)
        .bind(new.description)
        .bind(new.salary)
        .bind(new.last_date)
        .bind(new.status)
        .fetch_one(db)
        .await?;
        Ok(job)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Job>> {
        let job = sqlx::query_as::<_, Job>(concat!(
            "SELECT ",
            job_columns!(),
            " FROM jobs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(job)
    }

    /// Bumps the counter; `false` when the job does not exist.
    pub async fn increment_applications_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> anyhow::Result<bool> {
        let res = sqlx::query(
            "UPDATE jobs SET applications_count = applications_count + 1, updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .execute(&mut **tx)
        .await?;
        Ok(res.rows_affected() == 1)
    }

    pub async fn list(
        db: &PgPool,
        filter: &JobFilter,
        page: PageRequest,
        sort: (&'static str, SortDir),
    ) -> anyhow::Result<(Vec<Job>, i64)> {
        let mut qb =
            QueryBuilder::<Postgres>::new(concat!("SELECT ", job_columns!(), " FROM jobs WHERE TRUE"));
        push_filters(&mut qb, filter);
        qb.push(format!(" ORDER BY {} {}", sort.0, sort.1.as_sql()))
            .push(" LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let rows = qb.build_query_as::<Job>().fetch_all(db).await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM jobs WHERE TRUE");
        push_filters(&mut count, filter);
        let total = count.build_query_scalar::<i64>().fetch_one(db).await?;
        Ok((rows, total))
    }
}
